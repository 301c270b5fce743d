// Framework bootstrap for the realm server runtime.

use crate::domain::Registries;
use crate::frameworks::{config, worlds};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::{AppState, MonotonicClock};
use crate::use_cases::{Game, GameConfig, GameEvent, world_task};

use axum::{Router, routing::get};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::mpsc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state().await?;
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let registries = Arc::new(
        Registries::standard()
            .map_err(|e| std::io::Error::other(format!("failed to build registries: {e}")))?,
    );

    let worlds_dir = config::worlds_dir();
    let world_ids = config::world_ids();
    let loaded = worlds::load_worlds(&worlds_dir, &world_ids, &registries)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to load worlds: {e}")))?;
    tracing::info!(
        worlds_dir = %worlds_dir.display(),
        worlds = ?world_ids,
        "worlds loaded"
    );

    let rng = match config::rng_seed() {
        Some(seed) => {
            tracing::debug!(seed, "seeded encounter rng");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };
    let game_config = GameConfig::new(config::start_world(), config::start_spawn());
    let game = Game::new(loaded, game_config, Arc::new(MonotonicClock::new()), rng)
        .map_err(|e| std::io::Error::other(format!("invalid world setup: {e}")))?;

    // Setup Channels
    // input_tx/rx: every connection's events go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);

    // Spawn the Game Loop (World Task)
    tokio::spawn(world_task(game, input_rx, config::TICK_INTERVAL));

    Ok(Arc::new(AppState::new(
        input_tx,
        registries,
        config::OUTBOUND_CHANNEL_CAPACITY,
    )))
}
