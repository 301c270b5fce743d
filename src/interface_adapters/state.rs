use crate::domain::{Clock, Registries};
use crate::use_cases::{ConnId, GameEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

pub struct AppState {
    // Events flowing from connections into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Id tables used to render world and entity JSON.
    pub registries: Arc<Registries>,
    // Per-connection queue size for messages routed by the world task.
    pub outbound_capacity: usize,
    next_conn_id: AtomicU64,
}

impl AppState {
    pub fn new(
        input_tx: mpsc::Sender<GameEvent>,
        registries: Arc<Registries>,
        outbound_capacity: usize,
    ) -> Self {
        Self {
            input_tx,
            registries,
            outbound_capacity,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Process-unique id for a new connection.
    pub fn next_conn_id(&self) -> ConnId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }
}

// Monotonic clock adapter used by the simulation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_connections_are_numbered_then_ids_never_repeat() {
        let (input_tx, _input_rx) = mpsc::channel(1);
        let registries = Arc::new(Registries::standard().expect("registries"));
        let state = AppState::new(input_tx, registries, 8);
        let first = state.next_conn_id();
        assert_eq!(state.next_conn_id(), first + 1);
    }

    #[test]
    fn when_clock_is_read_twice_then_time_does_not_go_back() {
        let clock = MonotonicClock::new();
        let a = clock.now_seconds();
        let b = clock.now_seconds();
        assert!(b >= a);
    }
}
