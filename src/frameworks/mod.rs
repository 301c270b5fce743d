// Frameworks: runtime configuration, world loading, and server bootstrap.

pub mod config;
pub mod server;
pub mod worlds;
