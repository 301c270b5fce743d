// Network adapter for client websocket connections.

pub mod client;

pub use client::ws_handler;
