// Per-user avatar and session state.

use crate::domain::battle::Combatant;
use crate::domain::entity::EntityId;
use crate::domain::geometry::{BoundingBox, Direction, Vec2};
use crate::domain::tile::TileCoord;
use crate::domain::tuning::PLAYER_WIDTH;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub username: String,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub facing: Direction,
    pub world_id: String,
    pub combatant: Combatant,
    pub online: bool,
    /// Monotonic seconds of the last accepted move; 0 means "never moved".
    pub last_move_at: f64,
    /// Entity currently in conversation with this player. A lookup key, not an owner.
    pub talking_to: Option<EntityId>,
}

impl Player {
    pub fn new(username: impl Into<String>, world_id: impl Into<String>, pos: Vec2) -> Self {
        Self {
            username: username.into(),
            pos,
            velocity: Vec2::ZERO,
            facing: Direction::Down,
            world_id: world_id.into(),
            combatant: Combatant::default(),
            online: true,
            last_move_at: 0.0,
            talking_to: None,
        }
    }

    pub fn size() -> Vec2 {
        Vec2::new(PLAYER_WIDTH, PLAYER_WIDTH)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::square(self.pos, PLAYER_WIDTH)
    }

    pub fn is_touching(&self, other: &BoundingBox) -> bool {
        self.bounding_box().touching(other)
    }

    /// Every grid cell the player's box covers, edges included.
    pub fn tiles_touched(&self) -> Vec<TileCoord> {
        TileCoord::covered_by(&self.bounding_box())
    }

    /// Puts the player back at a spawn point with a fresh avatar.
    pub fn respawn(&mut self, world_id: &str, pos: Vec2) {
        let username = std::mem::take(&mut self.username);
        *self = Player::new(username, world_id, pos);
    }
}
