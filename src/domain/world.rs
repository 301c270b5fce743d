// A single map: tile grid, NPCs, named spawn points and the battles fought in it.

use crate::domain::battle::{AiCombatant, Battle, BattleNotice, Combatant};
use crate::domain::entity::{Entity, EntityId};
use crate::domain::errors::{BattleError, LookupError};
use crate::domain::geometry::{BoundingBox, Vec2};
use crate::domain::tile::{EMPTY_TILE, Tile, TileCoord};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct World {
    id: String,
    /// Row-major: `tiles[block_y][block_x]`. Never resized after load.
    tiles: Arc<Vec<Vec<Tile>>>,
    pub entities: Vec<Entity>,
    spawn_points: BTreeMap<String, TileCoord>,
    battles: Vec<Battle>,
}

impl World {
    pub fn new(
        id: impl Into<String>,
        tiles: Vec<Vec<Tile>>,
        entities: Vec<Entity>,
        spawn_points: BTreeMap<String, TileCoord>,
    ) -> Self {
        Self {
            id: id.into(),
            tiles: Arc::new(tiles),
            entities,
            spawn_points,
            battles: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rows(&self) -> &[Vec<Tile>] {
        self.tiles.as_slice()
    }

    /// Shared handle to the grid, for building client views without copying it.
    pub fn shared_tiles(&self) -> Arc<Vec<Vec<Tile>>> {
        Arc::clone(&self.tiles)
    }

    pub fn spawn_points(&self) -> &BTreeMap<String, TileCoord> {
        &self.spawn_points
    }

    /// Tile at `coord`, or the shared empty sentinel outside the grid.
    pub fn tile(&self, coord: TileCoord) -> &Tile {
        let (Ok(x), Ok(y)) = (
            usize::try_from(coord.block_x),
            usize::try_from(coord.block_y),
        ) else {
            return &EMPTY_TILE;
        };
        self.tiles
            .get(y)
            .and_then(|row| row.get(x))
            .unwrap_or(&EMPTY_TILE)
    }

    /// Coords (and their tiles) covered by `bbox`, including out-of-grid sentinels.
    pub fn tiles_touched(&self, bbox: &BoundingBox) -> Vec<(TileCoord, &Tile)> {
        TileCoord::covered_by(bbox)
            .into_iter()
            .map(|coord| (coord, self.tile(coord)))
            .collect()
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, LookupError> {
        self.entities
            .iter()
            .find(|e| e.id() == id)
            .ok_or(LookupError::UnknownEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, LookupError> {
        self.entities
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(LookupError::UnknownEntity(id))
    }

    pub fn spawn_point(&self, spawn_id: &str) -> Result<TileCoord, LookupError> {
        self.spawn_points
            .get(spawn_id)
            .copied()
            .ok_or_else(|| LookupError::UnknownSpawn {
                world_id: self.id.clone(),
                spawn_id: spawn_id.to_string(),
            })
    }

    /// Player position centred on the named spawn point.
    pub fn spawn_pos(&self, spawn_id: &str) -> Result<Vec2, LookupError> {
        self.spawn_point(spawn_id).map(TileCoord::to_spawn_pos)
    }

    pub fn update_entities(&mut self, dt: f64) {
        for entity in &mut self.entities {
            entity.update(dt);
        }
    }

    /// Starts a battle and returns the messages that open it for the player.
    pub fn create_battle(
        &mut self,
        username: &str,
        player: &Combatant,
        ai: AiCombatant,
    ) -> Result<Vec<BattleNotice>, BattleError> {
        if self.battle(username).is_some() {
            return Err(BattleError::AlreadyInBattle(username.to_string()));
        }
        let battle = Battle::new(username, ai);
        let opening = battle.opening(player);
        self.battles.push(battle);
        Ok(opening)
    }

    pub fn battle(&self, username: &str) -> Option<&Battle> {
        self.battles.iter().find(|b| b.username() == username)
    }

    pub fn battle_mut(&mut self, username: &str) -> Option<&mut Battle> {
        self.battles.iter_mut().find(|b| b.username() == username)
    }

    pub fn end_battle(&mut self, username: &str) -> Option<Battle> {
        let index = self.battles.iter().position(|b| b.username() == username)?;
        Some(self.battles.swap_remove(index))
    }

    pub fn battle_count(&self) -> usize {
        self.battles.len()
    }
}
