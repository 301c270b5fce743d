// Player movement: displacement, collision against tiles then entities, and move-on hooks.

use crate::domain::collision::resolve_all;
use crate::domain::geometry::{BoundingBox, Direction, Vec2};
use crate::domain::tile::{TileCoord, TileEffect, TileEventContext};
use crate::domain::tuning::player::PlayerTuning;
use crate::domain::{Player, World};
use std::collections::HashSet;

/// Sum of the unit vectors of each distinct direction. Opposites cancel out.
pub fn direction_vector(dirs: &[Direction]) -> Vec2 {
    let mut seen = HashSet::new();
    dirs.iter()
        .filter(|d| seen.insert(**d))
        .fold(Vec2::ZERO, |acc, d| acc + d.unit())
}

/// Seconds of movement granted to a command arriving at `now`.
pub fn move_dt(player: &Player, now: f64, tuning: &PlayerTuning) -> f64 {
    (now - player.last_move_at).clamp(0.0, tuning.max_move_dt)
}

/// Moves `player` through `world` and returns the effects requested by newly touched tiles.
///
/// The last direction becomes the new facing. Directions that cancel out leave the player
/// untouched and return `None`.
pub fn move_player(
    world: &World,
    player: &mut Player,
    dirs: &[Direction],
    fast: bool,
    now: f64,
    tuning: &PlayerTuning,
) -> Option<Vec<TileEffect>> {
    let heading = direction_vector(dirs);
    if heading == Vec2::ZERO {
        return None;
    }
    if let Some(last) = dirs.last() {
        player.facing = *last;
    }

    let dt = move_dt(player, now, tuning);
    player.last_move_at = now;

    let multiplier = if fast { tuning.fast_multiplier } else { 1.0 };
    player.velocity = heading * (tuning.speed * multiplier);

    let before: HashSet<TileCoord> = player.tiles_touched().into_iter().collect();
    let start = player.pos;
    let attempted = start + player.velocity * dt;
    player.pos = resolve_step(world, start, attempted);

    let mut effects = Vec::new();
    for coord in player.tiles_touched() {
        if before.contains(&coord) {
            continue;
        }
        let mut ctx = TileEventContext::new(&player.username, coord, &mut effects);
        world.tile(coord).behavior().on_move_on(&mut ctx);
    }
    Some(effects)
}

/// Resolves a step against blocking tiles, then blocking entities, each nearest first.
///
/// Only obstacles touched at the moved position take part: tiles under the attempted box,
/// then entities under the box left after tile resolution.
pub fn resolve_step(world: &World, start: Vec2, attempted: Vec2) -> Vec2 {
    let size = Player::size();
    let actor_box = |pos: Vec2| BoundingBox::new(pos, pos + size);

    let mut tiles: Vec<(Vec2, BoundingBox)> = world
        .tiles_touched(&actor_box(attempted))
        .into_iter()
        .filter(|(_, tile)| tile.blocks_movement())
        .map(|(coord, _)| (coord.to_pos(), coord.bounding_box()))
        .collect();
    let pos = resolve_all(&mut tiles, start, attempted, size);

    let moved = actor_box(pos);
    let mut entities: Vec<(Vec2, BoundingBox)> = world
        .entities
        .iter()
        .filter(|e| e.blocks_movement())
        .map(|e| (e.pos(), e.bounding_box()))
        .filter(|(_, bbox)| bbox.touching(&moved))
        .collect();
    resolve_all(&mut entities, start, pos, size)
}
