// The `interact` and `dialoguechoose` commands: dialogue routing, tile and entity hooks.

use crate::domain::dialogue::{DialogueMessage, Progress};
use crate::domain::entity::{Entity, EntityEventContext, EntityId};
use crate::domain::geometry::normalize_angle;
use crate::domain::tile::{TileEffect, TileEventContext};
use crate::domain::tuning::BLOCK_WIDTH;
use crate::domain::{Player, World};
use crate::use_cases::types::{Outbound, Outbox};
use std::f64::consts::FRAC_PI_4;
use tracing::debug;

/// How far in front of the player an entity can be talked to.
pub const INTERACT_RANGE: f64 = BLOCK_WIDTH * 2.0;

/// Whether `entity` sits inside the player's interaction cone.
pub fn in_cone(player: &Player, entity: &Entity) -> bool {
    let target = entity.pos();
    if player.pos.dist_to(target) >= INTERACT_RANGE {
        return false;
    }
    let offset = normalize_angle(player.pos.angle_to(target) - player.facing.angle());
    offset.abs() < FRAC_PI_4
}

/// Handles `interact` for a player outside battle. Returns effects requested by touched tiles.
///
/// A player in conversation only advances it. Otherwise touched tiles fire first, then
/// every entity in the cone, nearest first.
pub fn interact(world: &mut World, player: &mut Player, out: &mut Outbox) -> Vec<TileEffect> {
    if let Some(id) = player.talking_to {
        match world.entity_mut(id) {
            Ok(entity) => {
                let progress = talk(entity, player, out, |entity, ctx| entity.on_interact(ctx));
                if progress == Progress::Closed {
                    player.talking_to = None;
                }
                return Vec::new();
            }
            Err(err) => {
                debug!(username = %player.username, error = %err, "clearing stale dialogue partner");
                player.talking_to = None;
            }
        }
    }

    let mut effects = Vec::new();
    for coord in player.tiles_touched() {
        let mut ctx = TileEventContext::new(&player.username, coord, &mut effects);
        world.tile(coord).behavior().on_interact(&mut ctx);
    }

    let mut nearby: Vec<(f64, EntityId)> = world
        .entities
        .iter()
        .filter(|e| in_cone(player, e))
        .map(|e| (player.pos.dist_to(e.pos()), e.id()))
        .collect();
    nearby.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    // Every entity in the cone hears the interact; the nearest one that opens becomes the partner.
    for (_, id) in nearby {
        let Ok(entity) = world.entity_mut(id) else {
            continue;
        };
        let progress = talk(entity, player, out, |entity, ctx| entity.on_interact(ctx));
        if progress == Progress::Opened && player.talking_to.is_none() {
            player.talking_to = Some(id);
        }
    }

    effects
}

/// Handles `dialoguechoose`. Choices the entity does not expect change nothing.
pub fn choose(world: &mut World, player: &mut Player, entity_id: EntityId, choice: usize, out: &mut Outbox) {
    let entity = match world.entity_mut(entity_id) {
        Ok(entity) => entity,
        Err(err) => {
            debug!(username = %player.username, error = %err, "dialogue choice for unknown entity");
            return;
        }
    };
    let progress = talk(entity, player, out, |entity, ctx| {
        entity.on_dialogue_choose(ctx, choice)
    });
    if progress == Progress::Closed && player.talking_to == Some(entity_id) {
        player.talking_to = None;
    }
}

// Runs one dialogue hook and forwards what it said to the player.
fn talk<F>(entity: &mut Entity, player: &Player, out: &mut Outbox, hook: F) -> Progress
where
    F: FnOnce(&mut Entity, &mut EntityEventContext<'_>) -> Progress,
{
    let mut messages: Vec<DialogueMessage> = Vec::new();
    let mut ctx = EntityEventContext {
        username: &player.username,
        messages: &mut messages,
    };
    let progress = hook(entity, &mut ctx);
    let entity_id = entity.id();
    for message in messages {
        out.push(
            &player.username,
            Outbound::Dialogue { entity_id, message },
        );
    }
    progress
}
