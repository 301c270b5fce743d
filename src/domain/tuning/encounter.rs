/// Tuning for random battles started from encounter tiles.
#[derive(Debug, Clone, Copy)]
pub struct EncounterTuning {
    /// Probability that stepping onto an encounter tile starts a battle.
    pub chance: f64,
}

impl Default for EncounterTuning {
    fn default() -> Self {
        Self { chance: 0.1 }
    }
}
