// Encounters and battle rounds.

use crate::domain::battle::{AiCombatant, BattleNotice, BattleState, Combatant, Strategy};
use crate::domain::tuning::encounter::EncounterTuning;
use crate::domain::{Player, World};
use crate::use_cases::types::{Outbound, Outbox};
use rand::Rng;
use tracing::{debug, info};

/// Rolls for a wild encounter and, on success, opens a battle in the player's world.
///
/// Callers must make sure the player is not battling in any other world.
pub fn roll_encounter<R: Rng + ?Sized>(
    world: &mut World,
    player: &Player,
    tuning: &EncounterTuning,
    rng: &mut R,
    out: &mut Outbox,
) -> bool {
    if !rng.gen_bool(tuning.chance.clamp(0.0, 1.0)) {
        return false;
    }
    let ai = AiCombatant::new(Combatant::default(), Strategy::RandomMove);
    match world.create_battle(&player.username, &player.combatant, ai) {
        Ok(opening) => {
            info!(username = %player.username, world_id = world.id(), "battle started");
            send_notices(&player.username, opening, out);
            true
        }
        Err(err) => {
            debug!(error = %err, "encounter ignored");
            false
        }
    }
}

/// Plays the player's `index`-th move for one round. `None` when the move was ignored.
///
/// Terminal states remove the battle; respawning after a loss is up to the caller.
pub fn battle_move<R: Rng + ?Sized>(
    world: &mut World,
    player: &mut Player,
    index: usize,
    rng: &mut R,
    out: &mut Outbox,
) -> Option<BattleState> {
    let Some(battle) = world.battle_mut(&player.username) else {
        debug!(username = %player.username, "battle move outside battle");
        return None;
    };
    let Some(chosen) = player.combatant.moves.get(index).cloned() else {
        debug!(username = %player.username, index, "unknown battle move");
        return None;
    };

    let state = battle.process_player_move(&mut player.combatant, &chosen, rng);
    match state {
        BattleState::Ongoing => {
            let status = battle.status(&player.combatant);
            send_notices(
                &player.username,
                vec![BattleNotice::MoveRequest(player.combatant.move_names()), status],
                out,
            );
        }
        BattleState::PlayerWin | BattleState::AiWin => {
            world.end_battle(&player.username);
            info!(username = %player.username, outcome = ?state, "battle ended");
            out.push(&player.username, Outbound::Battle(BattleNotice::End));
        }
    }
    Some(state)
}

/// Re-sends the battle screen to a player who reconnected mid-battle.
pub fn resend_battle(world: &World, player: &Player, out: &mut Outbox) {
    if let Some(battle) = world.battle(&player.username) {
        send_notices(&player.username, battle.opening(&player.combatant), out);
    }
}

fn send_notices(username: &str, notices: Vec<BattleNotice>, out: &mut Outbox) {
    for notice in notices {
        out.push(username, Outbound::Battle(notice));
    }
}
