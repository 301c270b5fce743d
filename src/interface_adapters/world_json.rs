// JSON shapes for worlds: the view sent to clients and the form saved to disk.
//
// Both share tile and entity DTOs. They differ in how much tile metadata is
// written and in how spawn information is carried.

use crate::domain::entity::{Entity, EntityId, EntitySnapshot, Motion};
use crate::domain::errors::RegistryError;
use crate::domain::geometry::{Direction, Vec2};
use crate::domain::tile::{Portal, Sign, Tile, TileCoord, TileKind};
use crate::domain::{Registries, World};
use crate::use_cases::WorldView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const WORLD_FORMAT_VERSION: &str = "0.1.0";

#[derive(Debug, Error)]
pub enum WorldDecodeError {
    #[error("invalid world json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported world version `{0}`")]
    Version(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("tile `{tile_id}` requires tile data")]
    MissingTileData { tile_id: String },
    #[error("invalid tile data for `{tile_id}`: {source}")]
    TileData {
        tile_id: String,
        source: serde_json::Error,
    },
    #[error("invalid entity id `{0}`")]
    EntityId(String),
    #[error("invalid facing `{0}`")]
    Facing(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to serialize: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who a tile is being written for. Clients only see metadata they need to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Client,
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2Dto {
    pub x: f64,
    pub y: f64,
}

impl From<Vec2> for Vec2Dto {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2Dto> for Vec2 {
    fn from(v: Vec2Dto) -> Self {
        Vec2::new(v.x, v.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDto {
    pub tile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalData {
    world_id: String,
    spawn_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignData {
    // Withheld from clients; they receive it through `signtext` on interaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    ground_tile: TileDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDto {
    pub id: String,
    pub entity_id: String,
    pub pos: Vec2Dto,
    pub velocity: Vec2Dto,
    pub facing: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPointDto {
    pub block_x: i64,
    pub block_y: i64,
}

/// `world|<json>` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientWorldDto {
    pub version: String,
    pub tiles: Vec<Vec<TileDto>>,
    pub entities: Vec<EntityDto>,
    pub spawn_pos: Vec2Dto,
}

/// On-disk world file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWorldDto {
    pub version: String,
    pub tiles: Vec<Vec<TileDto>>,
    pub entities: Vec<EntityDto>,
    pub spawn_points: BTreeMap<String, SpawnPointDto>,
}

pub fn encode_tile(
    tile: &Tile,
    registries: &Registries,
    audience: Audience,
) -> Result<TileDto, EncodeError> {
    let tile_id = registries.tiles.lookup_id(tile.kind())?.to_string();
    let tile_data = match (tile, audience) {
        (Tile::Portal(_), Audience::Client) => Some(serde_json::Value::Object(Default::default())),
        (Tile::Portal(portal), Audience::Save) => Some(serde_json::to_value(PortalData {
            world_id: portal.world_id.clone(),
            spawn_id: portal.spawn_id.clone(),
        })?),
        (Tile::Sign(sign), _) => Some(serde_json::to_value(SignData {
            text: (audience == Audience::Save).then(|| sign.text.clone()),
            ground_tile: encode_tile(&sign.ground_tile, registries, audience)?,
        })?),
        _ => None,
    };
    Ok(TileDto { tile_id, tile_data })
}

pub fn decode_tile(dto: TileDto, registries: &Registries) -> Result<Tile, WorldDecodeError> {
    let kind = registries.tiles.lookup_by_id(&dto.tile_id)?;
    if let Some(tile) = Tile::plain(kind) {
        return Ok(tile);
    }

    let Some(data) = dto.tile_data else {
        return Err(WorldDecodeError::MissingTileData {
            tile_id: dto.tile_id,
        });
    };
    let tile_id = dto.tile_id;
    let bad_data = |source| WorldDecodeError::TileData {
        tile_id: tile_id.clone(),
        source,
    };
    match kind {
        TileKind::Portal => {
            let data: PortalData = serde_json::from_value(data).map_err(bad_data)?;
            Ok(Tile::Portal(Portal {
                world_id: data.world_id,
                spawn_id: data.spawn_id,
            }))
        }
        TileKind::Sign => {
            let data: SignData = serde_json::from_value(data).map_err(bad_data)?;
            let Some(text) = data.text else {
                return Err(WorldDecodeError::MissingTileData { tile_id });
            };
            Ok(Tile::Sign(Sign {
                text,
                ground_tile: Box::new(decode_tile(data.ground_tile, registries)?),
            }))
        }
        TileKind::Empty | TileKind::Grass | TileKind::WildGrass | TileKind::Wall => {
            Err(WorldDecodeError::MissingTileData { tile_id })
        }
    }
}

pub fn encode_entity(
    entity: &EntitySnapshot,
    registries: &Registries,
) -> Result<EntityDto, EncodeError> {
    Ok(EntityDto {
        id: entity.id.to_string(),
        entity_id: registries.entities.lookup_id(entity.kind)?.to_string(),
        pos: entity.pos.into(),
        velocity: entity.velocity.into(),
        facing: entity.facing.as_char().to_string(),
    })
}

pub fn decode_entity(dto: EntityDto, registries: &Registries) -> Result<Entity, WorldDecodeError> {
    let kind = registries.entities.lookup_by_id(&dto.entity_id)?;
    let id: EntityId = dto
        .id
        .parse()
        .map_err(|_| WorldDecodeError::EntityId(dto.id.clone()))?;
    let mut chars = dto.facing.chars();
    let facing = match (chars.next().and_then(Direction::from_char), chars.next()) {
        (Some(facing), None) => facing,
        _ => return Err(WorldDecodeError::Facing(dto.facing)),
    };
    Ok(Entity::new(
        id,
        kind,
        Motion::new(dto.pos.into(), dto.velocity.into(), facing),
    ))
}

fn encode_rows(
    rows: &[Vec<Tile>],
    registries: &Registries,
    audience: Audience,
) -> Result<Vec<Vec<TileDto>>, EncodeError> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|tile| encode_tile(tile, registries, audience))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Serializes the `world|` payload for one player.
pub fn client_world_json(view: &WorldView, registries: &Registries) -> Result<String, EncodeError> {
    let dto = ClientWorldDto {
        version: WORLD_FORMAT_VERSION.to_string(),
        tiles: encode_rows(&view.tiles, registries, Audience::Client)?,
        entities: view
            .entities
            .iter()
            .map(|e| encode_entity(e, registries))
            .collect::<Result<_, _>>()?,
        spawn_pos: view.spawn_pos.into(),
    };
    Ok(serde_json::to_string(&dto)?)
}

pub fn entity_json(entity: &EntitySnapshot, registries: &Registries) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(&encode_entity(entity, registries)?)?)
}

/// Serializes a world in its on-disk form, including live entity positions.
pub fn encode_world_save(world: &World, registries: &Registries) -> Result<String, EncodeError> {
    let dto = SavedWorldDto {
        version: WORLD_FORMAT_VERSION.to_string(),
        tiles: encode_rows(world.rows(), registries, Audience::Save)?,
        entities: world
            .entities
            .iter()
            .map(|e| encode_entity(&EntitySnapshot::from(e), registries))
            .collect::<Result<_, _>>()?,
        spawn_points: world
            .spawn_points()
            .iter()
            .map(|(name, coord)| {
                (
                    name.clone(),
                    SpawnPointDto {
                        block_x: coord.block_x,
                        block_y: coord.block_y,
                    },
                )
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&dto)?)
}

/// Parses a world file. Unknown ids and other versions are rejected.
pub fn decode_world(
    world_id: &str,
    json: &str,
    registries: &Registries,
) -> Result<World, WorldDecodeError> {
    let dto: SavedWorldDto = serde_json::from_str(json)?;
    if dto.version != WORLD_FORMAT_VERSION {
        return Err(WorldDecodeError::Version(dto.version));
    }

    let tiles = dto
        .tiles
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|tile| decode_tile(tile, registries))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    let entities = dto
        .entities
        .into_iter()
        .map(|e| decode_entity(e, registries))
        .collect::<Result<Vec<_>, _>>()?;
    let spawn_points = dto
        .spawn_points
        .into_iter()
        .map(|(name, p)| (name, TileCoord::new(p.block_x, p.block_y)))
        .collect();

    Ok(World::new(world_id, tiles, entities, spawn_points))
}
