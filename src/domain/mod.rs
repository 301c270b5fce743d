// Domain layer: core simulation types and rules.

pub mod battle;
pub mod collision;
pub mod dialogue;
pub mod entity;
pub mod errors;
pub mod geometry;
pub mod player;
pub mod ports;
pub mod registry;
pub mod tile;
pub mod tuning;
pub mod world;

pub use battle::{AiCombatant, Battle, BattleNotice, BattleState, Combatant, Move, Strategy};
pub use dialogue::{DialogueLine, DialogueMessage, Progress};
pub use entity::{Entity, EntityId, EntityKind, EntitySnapshot, Motion};
pub use errors::{BattleError, GameSetupError, LookupError, RegistryError};
pub use geometry::{BoundingBox, Direction, Vec2};
pub use player::Player;
pub use ports::Clock;
pub use registry::Registries;
pub use tile::{Tile, TileCoord, TileEffect, TileKind};
pub use world::World;
