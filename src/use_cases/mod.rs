// Use cases layer: command dispatch and the single-writer world task.

pub mod combat;
pub mod game;
pub mod interaction;
pub mod movement;
pub mod types;

pub use game::{Game, GameConfig, world_task};
pub use types::{ClientCommand, ConnId, GameEvent, Outbound, Outbox, PlayerSnapshot, WorldView};
