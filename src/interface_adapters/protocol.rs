// Pipe-delimited text protocol spoken over the websocket.
// Commands are parsed into use-case types; outbound messages are rendered to frames here.

use crate::domain::{BattleNotice, DialogueMessage, Direction, EntityId, Registries};
use crate::interface_adapters::world_json::{EncodeError, client_world_json, entity_json};
use crate::use_cases::{ClientCommand, Outbound};
use thiserror::Error;

pub const SEPARATOR: char = '|';
/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` is missing its {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("invalid directions `{0}`")]
    InvalidDirections(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid entity id `{0}`")]
    InvalidEntityId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,
    #[error("username contains `|`")]
    Separator,
    #[error("username is longer than {MAX_USERNAME_LEN} characters")]
    TooLong,
}

/// Validates the handshake frame and returns the trimmed username.
pub fn parse_username(frame: &str) -> Result<&str, UsernameError> {
    let username = frame.trim();
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }
    if username.contains(SEPARATOR) {
        return Err(UsernameError::Separator);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong);
    }
    Ok(username)
}

pub fn parse_command(frame: &str) -> Result<ClientCommand, ProtocolError> {
    let mut parts = frame.split(SEPARATOR);
    let name = parts.next().unwrap_or_default();
    match name {
        "" => Err(ProtocolError::Empty),
        "move" | "fastmove" => {
            let token = parts.next().ok_or(ProtocolError::MissingArgument {
                command: "move",
                argument: "directions",
            })?;
            Ok(ClientCommand::Move {
                dirs: parse_directions(token)?,
                fast: name == "fastmove",
            })
        }
        "interact" => Ok(ClientCommand::Interact),
        "getupdates" => Ok(ClientCommand::GetUpdates),
        "dialoguechoose" => {
            let id = parts.next().ok_or(ProtocolError::MissingArgument {
                command: "dialoguechoose",
                argument: "entity id",
            })?;
            let choice = parts.next().ok_or(ProtocolError::MissingArgument {
                command: "dialoguechoose",
                argument: "choice",
            })?;
            Ok(ClientCommand::DialogueChoose {
                entity_id: id
                    .parse::<EntityId>()
                    .map_err(|_| ProtocolError::InvalidEntityId(id.to_string()))?,
                choice: parse_index(choice)?,
            })
        }
        "battlemove" => {
            let index = parts.next().ok_or(ProtocolError::MissingArgument {
                command: "battlemove",
                argument: "move index",
            })?;
            Ok(ClientCommand::BattleMove {
                index: parse_index(index)?,
            })
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn parse_directions(token: &str) -> Result<Vec<Direction>, ProtocolError> {
    if token.is_empty() {
        return Err(ProtocolError::InvalidDirections(token.to_string()));
    }
    token
        .chars()
        .map(|c| Direction::from_char(c).ok_or_else(|| ProtocolError::InvalidDirections(token.to_string())))
        .collect()
}

fn parse_index(token: &str) -> Result<usize, ProtocolError> {
    token
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(token.to_string()))
}

/// Renders one outbound message as a text frame.
pub fn encode(message: &Outbound, registries: &Registries) -> Result<String, EncodeError> {
    let frame = match message {
        Outbound::World(view) => format!("world|{}", client_world_json(view, registries)?),
        Outbound::MovedTo(pos) => format!("movedto|{}|{}", pos.x, pos.y),
        Outbound::Players(players) => {
            let mut frame = String::from("players");
            for player in players {
                frame.push_str(&format!("|{}|{}|{}", player.username, player.pos.x, player.pos.y));
            }
            frame
        }
        Outbound::Entities(entities) => {
            let mut frame = String::from("entities");
            for entity in entities {
                frame.push(SEPARATOR);
                frame.push_str(&entity_json(entity, registries)?);
            }
            frame
        }
        Outbound::Dialogue { entity_id, message } => match message {
            DialogueMessage::Line(text) => format!("dialogue|{entity_id}|{text}"),
            DialogueMessage::Choices(options) => {
                format!("dialoguechoice|{entity_id}|{}", options.join("|"))
            }
            DialogueMessage::End => format!("dialogueend|{entity_id}"),
        },
        Outbound::Tag { tagger, tagged } => format!("tag|{tagger}|{tagged}"),
        Outbound::Battle(notice) => match notice {
            BattleNotice::Start => "battlestart".to_string(),
            BattleNotice::Status { player_hp, ai_hp } => {
                format!("battlestatus|{player_hp}|{ai_hp}")
            }
            BattleNotice::MoveRequest(names) => format!("battlemovereq|{}", names.join("|")),
            BattleNotice::End => "battleend".to_string(),
        },
        Outbound::SignText(text) => format!("signtext|{text}"),
    };
    Ok(frame)
}
