/// Gameplay tuning for player-controlled avatars.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Walking speed in pixels per second.
    pub speed: f64,

    /// Speed factor applied to `fastmove` commands.
    pub fast_multiplier: f64,

    /// Longest gap (seconds) between move commands still treated as one continuous move.
    pub max_move_dt: f64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: super::BLOCK_WIDTH * 3.0,
            fast_multiplier: 2.0,
            max_move_dt: 0.1,
        }
    }
}
