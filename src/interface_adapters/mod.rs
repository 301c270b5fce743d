// Interface adapters: wire protocol, world JSON, and network handling.

pub mod net;
pub mod protocol;
pub mod state;
pub mod world_json;
