// Use-case level inputs/outputs for the world task.

use crate::domain::{BattleNotice, DialogueMessage, Direction, EntityId, EntitySnapshot, Tile, Vec2};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one websocket connection. A username may be served by several over time.
pub type ConnId = u64;

#[derive(Debug)]
pub enum GameEvent {
    Join {
        username: String,
        conn_id: ConnId,
        outbound_tx: mpsc::Sender<Outbound>,
    },
    Leave {
        username: String,
        conn_id: ConnId,
    },
    Command {
        username: String,
        conn_id: ConnId,
        command: ClientCommand,
    },
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Move { dirs: Vec<Direction>, fast: bool },
    Interact,
    GetUpdates,
    DialogueChoose { entity_id: EntityId, choice: usize },
    BattleMove { index: usize },
}

/// Everything a client needs to draw the world it is standing in.
#[derive(Debug, Clone)]
pub struct WorldView {
    pub world_id: String,
    pub tiles: Arc<Vec<Vec<Tile>>>,
    pub entities: Vec<EntitySnapshot>,
    pub spawn_pos: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub username: String,
    pub pos: Vec2,
}

/// A server-to-client message, before wire encoding.
#[derive(Debug, Clone)]
pub enum Outbound {
    World(WorldView),
    MovedTo(Vec2),
    Players(Vec<PlayerSnapshot>),
    Entities(Vec<EntitySnapshot>),
    Dialogue {
        entity_id: EntityId,
        message: DialogueMessage,
    },
    Tag {
        tagger: String,
        tagged: String,
    },
    Battle(BattleNotice),
    SignText(String),
}

/// Messages produced while handling one event, addressed by username.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(String, Outbound)>,
}

impl Outbox {
    pub fn push(&mut self, to: &str, message: Outbound) {
        self.messages.push((to.to_string(), message));
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (String, Outbound)> {
        self.messages.drain(..)
    }

    /// Messages queued for one user, in send order.
    pub fn for_user<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a Outbound> + 'a {
        self.messages
            .iter()
            .filter(move |(to, _)| to == username)
            .map(|(_, message)| message)
    }
}
