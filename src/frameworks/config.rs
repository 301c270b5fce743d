use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn worlds_dir() -> PathBuf {
    env::var("WORLDS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("worlds"))
}

pub fn world_ids() -> Vec<String> {
    let raw = env::var("WORLD_IDS").unwrap_or_else(|_| "starting_world,second_world".to_string());
    parse_world_ids(&raw)
}

pub fn start_world() -> String {
    env::var("START_WORLD").unwrap_or_else(|_| "starting_world".to_string())
}

pub fn start_spawn() -> String {
    env::var("START_SPAWN").unwrap_or_else(|_| "center_spawn".to_string())
}

// Fixed seed for reproducible encounters; entropy when unset.
pub fn rng_seed() -> Option<u64> {
    env::var("RNG_SEED").ok().and_then(|v| v.parse().ok())
}

fn parse_world_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
