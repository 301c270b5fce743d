// Domain-level errors for registries, lookups and battle bookkeeping.

use crate::domain::entity::EntityId;
use thiserror::Error;

/// Failures of the id <-> kind tables. `DuplicateId` only happens during startup wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate {category} id `{id}`")]
    DuplicateId { category: &'static str, id: String },
    #[error("unknown {category} id `{id}`")]
    UnknownId { category: &'static str, id: String },
    #[error("{category} kind {kind} is not registered")]
    UnregisteredClass { category: &'static str, kind: String },
}

/// Missing worlds, spawn points, entities or players. Recovered locally by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown world `{0}`")]
    UnknownWorld(String),
    #[error("world `{world_id}` has no spawn point `{spawn_id}`")]
    UnknownSpawn { world_id: String, spawn_id: String },
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("unknown player `{0}`")]
    UnknownPlayer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("player `{0}` is already in a battle")]
    AlreadyInBattle(String),
}

/// Startup wiring problems. Fatal: the server refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameSetupError {
    #[error("world `{0}` is defined twice")]
    DuplicateWorld(String),
    #[error("invalid start point: {0}")]
    StartPoint(#[source] LookupError),
    #[error("portal at ({block_x}, {block_y}) in `{world_id}` leads nowhere")]
    DanglingPortal {
        world_id: String,
        block_x: i64,
        block_y: i64,
        source: LookupError,
    },
}
