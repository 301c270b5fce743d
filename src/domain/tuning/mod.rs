// Gameplay tuning. Runtime/server knobs live in `frameworks::config`.

pub mod encounter;
pub mod player;

/// Width and height of one grid block, in pixels.
pub const BLOCK_WIDTH: f64 = 32.0;

/// Width and height of a player's bounding box, in pixels.
pub const PLAYER_WIDTH: f64 = 28.0;
