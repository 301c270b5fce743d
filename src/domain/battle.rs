// Turn-based battles between a player and an AI combatant.

use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub name: String,
    pub damage: i32,
}

impl Move {
    pub fn new(name: impl Into<String>, damage: i32) -> Self {
        Self {
            name: name.into(),
            damage,
        }
    }
}

/// Anything that can take part in a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub hp: i32,
    pub moves: Vec<Move>,
    pub speed: i32,
}

impl Default for Combatant {
    fn default() -> Self {
        Self {
            hp: 20,
            moves: vec![
                Move::new("Hit", 1),
                Move::new("Hithit", 2),
                Move::new("Hithithit", 3),
            ],
            speed: 20,
        }
    }
}

impl Combatant {
    pub fn is_faster_than(&self, other: &Combatant) -> bool {
        self.speed > other.speed
    }

    pub fn move_names(&self) -> Vec<String> {
        self.moves.iter().map(|m| m.name.clone()).collect()
    }
}

/// How a computer-controlled combatant picks its next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RandomMove,
    StrongestMove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCombatant {
    pub combatant: Combatant,
    pub strategy: Strategy,
}

impl AiCombatant {
    pub fn new(combatant: Combatant, strategy: Strategy) -> Self {
        Self {
            combatant,
            strategy,
        }
    }

    /// Picks a move without knowledge of the player's pending choice.
    pub fn next_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Move> {
        match self.strategy {
            Strategy::RandomMove => self.combatant.moves.choose(rng).cloned(),
            Strategy::StrongestMove => self
                .combatant
                .moves
                .iter()
                .max_by_key(|m| m.damage)
                .cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleState {
    Ongoing,
    PlayerWin,
    AiWin,
}

/// Battle messages addressed to the battling player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleNotice {
    Start,
    Status { player_hp: i32, ai_hp: i32 },
    MoveRequest(Vec<String>),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Player,
    Ai,
}

/// A battle pairs one player (by username) with one AI combatant.
///
/// The player's combatant lives on the `Player` and is passed in per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    username: String,
    pub ai: AiCombatant,
}

impl Battle {
    pub fn new(username: impl Into<String>, ai: AiCombatant) -> Self {
        Self {
            username: username.into(),
            ai,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Runs one round: the AI chooses simultaneously, then both moves resolve in speed order.
    pub fn process_player_move<R: Rng + ?Sized>(
        &mut self,
        player: &mut Combatant,
        player_move: &Move,
        rng: &mut R,
    ) -> BattleState {
        match self.ai.next_move(rng) {
            Some(ai_move) => self.process_moves(player, player_move, &ai_move, rng),
            // An AI with no moves can only take hits.
            None => self.apply(player, Side::Player, player_move),
        }
    }

    pub fn process_moves<R: Rng + ?Sized>(
        &mut self,
        player: &mut Combatant,
        player_move: &Move,
        ai_move: &Move,
        rng: &mut R,
    ) -> BattleState {
        let player_first = player.is_faster_than(&self.ai.combatant)
            || (player.speed == self.ai.combatant.speed && rng.gen_bool(0.5));
        let order = if player_first {
            [(Side::Player, player_move), (Side::Ai, ai_move)]
        } else {
            [(Side::Ai, ai_move), (Side::Player, player_move)]
        };

        let [(first, first_move), (second, second_move)] = order;
        let state = self.apply(player, first, first_move);
        if state != BattleState::Ongoing {
            // The slower combatant's queued move is discarded.
            return state;
        }
        self.apply(player, second, second_move)
    }

    fn apply(&mut self, player: &mut Combatant, attacker: Side, mv: &Move) -> BattleState {
        match attacker {
            Side::Player => self.ai.combatant.hp -= mv.damage,
            Side::Ai => player.hp -= mv.damage,
        }
        self.state(player)
    }

    pub fn status(&self, player: &Combatant) -> BattleNotice {
        BattleNotice::Status {
            player_hp: player.hp,
            ai_hp: self.ai.combatant.hp,
        }
    }

    /// What a player (re)entering this battle needs to see.
    pub fn opening(&self, player: &Combatant) -> Vec<BattleNotice> {
        vec![
            BattleNotice::Start,
            self.status(player),
            BattleNotice::MoveRequest(player.move_names()),
        ]
    }

    pub fn state(&self, player: &Combatant) -> BattleState {
        if player.hp <= 0 {
            BattleState::AiWin
        } else if self.ai.combatant.hp <= 0 {
            BattleState::PlayerWin
        } else {
            BattleState::Ongoing
        }
    }
}
