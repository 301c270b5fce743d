use super::types::{ClientCommand, ConnId, GameEvent, Outbound, Outbox, PlayerSnapshot, WorldView};
use super::{combat, interaction, movement};
use crate::domain::battle::BattleState;
use crate::domain::tile::{Tile, TileCoord, TileEffect};
use crate::domain::tuning::encounter::EncounterTuning;
use crate::domain::tuning::player::PlayerTuning;
use crate::domain::{Clock, EntitySnapshot, GameSetupError, LookupError, Player, Vec2, World};
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Where new and defeated players are placed, plus gameplay tuning.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub start_world: String,
    pub start_spawn: String,
    pub player: PlayerTuning,
    pub encounter: EncounterTuning,
}

impl GameConfig {
    pub fn new(start_world: impl Into<String>, start_spawn: impl Into<String>) -> Self {
        Self {
            start_world: start_world.into(),
            start_spawn: start_spawn.into(),
            player: PlayerTuning::default(),
            encounter: EncounterTuning::default(),
        }
    }
}

/// All simulation state. Owned by exactly one task; every mutation goes through `&mut self`.
pub struct Game {
    worlds: BTreeMap<String, World>,
    players: BTreeMap<String, Player>,
    config: GameConfig,
    start_pos: Vec2,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    last_tick_at: f64,
}

impl Game {
    /// Checks the world wiring (start point, portals) and builds the simulation.
    pub fn new(
        worlds: Vec<World>,
        config: GameConfig,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Result<Self, GameSetupError> {
        let mut by_id = BTreeMap::new();
        for world in worlds {
            let id = world.id().to_string();
            if by_id.insert(id.clone(), world).is_some() {
                return Err(GameSetupError::DuplicateWorld(id));
            }
        }

        let start_pos = by_id
            .get(&config.start_world)
            .ok_or_else(|| LookupError::UnknownWorld(config.start_world.clone()))
            .and_then(|w| w.spawn_pos(&config.start_spawn))
            .map_err(GameSetupError::StartPoint)?;

        for world in by_id.values() {
            check_portals(world, &by_id)?;
        }

        let last_tick_at = clock.now_seconds();
        Ok(Self {
            worlds: by_id,
            players: BTreeMap::new(),
            config,
            start_pos,
            clock,
            rng,
            last_tick_at,
        })
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.get(username)
    }

    pub fn world(&self, world_id: &str) -> Option<&World> {
        self.worlds.get(world_id)
    }

    pub fn in_battle(&self, username: &str) -> bool {
        self.worlds.values().any(|w| w.battle(username).is_some())
    }

    /// Brings a user online, creating their avatar on first contact.
    pub fn connect(&mut self, username: &str, out: &mut Outbox) {
        match self.players.get_mut(username) {
            Some(player) => {
                player.online = true;
                info!(username, world_id = %player.world_id, "player reconnected");
            }
            None => {
                let player = Player::new(username, &self.config.start_world, self.start_pos);
                self.players.insert(username.to_string(), player);
                info!(username, "player created");
            }
        }

        self.send_world(username, out);
        if let Some(player) = self.players.get(username) {
            if let Some(world) = self.worlds.get(&player.world_id) {
                combat::resend_battle(world, player, out);
            }
        }
    }

    /// Marks a user offline. Their avatar, dialogue and battle state are kept.
    pub fn disconnect(&mut self, username: &str) {
        if let Some(player) = self.players.get_mut(username) {
            player.online = false;
            info!(username, "player went offline");
        }
    }

    pub fn handle(&mut self, username: &str, command: ClientCommand, out: &mut Outbox) {
        let Some(player) = self.players.get_mut(username) else {
            debug!(error = %LookupError::UnknownPlayer(username.to_string()), "command dropped");
            return;
        };
        let Some(world) = self.worlds.get_mut(&player.world_id) else {
            debug!(error = %LookupError::UnknownWorld(player.world_id.clone()), "command dropped");
            return;
        };
        let in_battle = world.battle(username).is_some();

        match command {
            ClientCommand::Move { dirs, fast } => {
                if in_battle || player.talking_to.is_some() {
                    debug!(username, in_battle, "move rejected");
                    return;
                }
                let now = self.clock.now_seconds();
                let Some(effects) =
                    movement::move_player(world, player, &dirs, fast, now, &self.config.player)
                else {
                    return;
                };
                self.apply_effects(username, effects, out);
                if let Some(player) = self.players.get(username) {
                    out.push(username, Outbound::MovedTo(player.pos));
                }
            }
            ClientCommand::Interact => {
                if in_battle {
                    debug!(username, "interact ignored during battle");
                    return;
                }
                let effects = interaction::interact(world, player, out);
                self.tag_touching(username, out);
                self.apply_effects(username, effects, out);
            }
            ClientCommand::DialogueChoose { entity_id, choice } => {
                if in_battle {
                    debug!(username, "dialogue choice ignored during battle");
                    return;
                }
                interaction::choose(world, player, entity_id, choice, out);
            }
            ClientCommand::BattleMove { index } => {
                if !in_battle {
                    debug!(username, "battle move outside battle");
                    return;
                }
                let state = combat::battle_move(world, player, index, &mut self.rng, out);
                if state == Some(BattleState::AiWin) {
                    self.respawn(username, out);
                }
            }
            ClientCommand::GetUpdates => {
                if in_battle {
                    debug!(username, "update request ignored during battle");
                    return;
                }
                let entities = world.entities.iter().map(EntitySnapshot::from).collect();
                let world_id = player.world_id.clone();
                out.push(
                    username,
                    Outbound::Players(self.players_in(&world_id, username)),
                );
                out.push(username, Outbound::Entities(entities));
            }
        }
    }

    /// Advances entities in every world someone is online in, by the time since the last tick.
    pub fn tick(&mut self) {
        let now = self.clock.now_seconds();
        let dt = (now - self.last_tick_at).max(0.0);
        self.last_tick_at = now;

        for world in self.worlds.values_mut() {
            let occupied = self
                .players
                .values()
                .any(|p| p.online && p.world_id == world.id());
            if occupied {
                world.update_entities(dt);
            }
        }
    }

    fn apply_effects(&mut self, username: &str, effects: Vec<TileEffect>, out: &mut Outbox) {
        for effect in effects {
            match effect {
                TileEffect::Teleport { world_id, spawn_id } => {
                    if self.teleport(username, &world_id, &spawn_id, out) {
                        // The player has left the world the remaining effects came from.
                        break;
                    }
                }
                TileEffect::ShowSign { text } => out.push(username, Outbound::SignText(text)),
                TileEffect::Encounter => self.roll_encounter(username, out),
            }
        }
    }

    fn teleport(&mut self, username: &str, world_id: &str, spawn_id: &str, out: &mut Outbox) -> bool {
        let pos = match self
            .worlds
            .get(world_id)
            .ok_or_else(|| LookupError::UnknownWorld(world_id.to_string()))
            .and_then(|w| w.spawn_pos(spawn_id))
        {
            Ok(pos) => pos,
            Err(err) => {
                warn!(username, error = %err, "teleport failed");
                return false;
            }
        };
        let Some(player) = self.players.get_mut(username) else {
            return false;
        };
        player.world_id = world_id.to_string();
        player.pos = pos;
        player.velocity = Vec2::ZERO;
        info!(username, world_id, spawn_id, "player teleported");

        self.send_world(username, out);
        let others = self.players_in(world_id, username);
        out.push(username, Outbound::Players(others));
        true
    }

    fn roll_encounter(&mut self, username: &str, out: &mut Outbox) {
        if self.in_battle(username) {
            return;
        }
        let Some(player) = self.players.get(username) else {
            return;
        };
        let Some(world) = self.worlds.get_mut(&player.world_id) else {
            return;
        };
        combat::roll_encounter(world, player, &self.config.encounter, &mut self.rng, out);
    }

    fn respawn(&mut self, username: &str, out: &mut Outbox) {
        let Some(player) = self.players.get_mut(username) else {
            return;
        };
        player.respawn(&self.config.start_world, self.start_pos);
        info!(username, world_id = %self.config.start_world, "player respawned");
        self.send_world(username, out);
    }

    // Sends `tag|me|other` to both parties for every other avatar touching mine.
    fn tag_touching(&self, username: &str, out: &mut Outbox) {
        let Some(me) = self.players.get(username) else {
            return;
        };
        let my_box = me.bounding_box();
        for other in self.players.values() {
            if other.username == me.username
                || other.world_id != me.world_id
                || !other.is_touching(&my_box)
            {
                continue;
            }
            for recipient in [username, other.username.as_str()] {
                out.push(
                    recipient,
                    Outbound::Tag {
                        tagger: username.to_string(),
                        tagged: other.username.clone(),
                    },
                );
            }
        }
    }

    /// Everyone else whose avatar is in `world_id`, online or not.
    fn players_in(&self, world_id: &str, except: &str) -> Vec<PlayerSnapshot> {
        self.players
            .values()
            .filter(|p| p.world_id == world_id && p.username != except)
            .map(|p| PlayerSnapshot {
                username: p.username.clone(),
                pos: p.pos,
            })
            .collect()
    }

    fn send_world(&self, username: &str, out: &mut Outbox) {
        let Some(player) = self.players.get(username) else {
            return;
        };
        let Some(world) = self.worlds.get(&player.world_id) else {
            warn!(username, world_id = %player.world_id, "player is in an unknown world");
            return;
        };
        out.push(
            username,
            Outbound::World(WorldView {
                world_id: world.id().to_string(),
                tiles: world.shared_tiles(),
                entities: world.entities.iter().map(EntitySnapshot::from).collect(),
                spawn_pos: player.pos,
            }),
        );
    }
}

fn check_portals(world: &World, worlds: &BTreeMap<String, World>) -> Result<(), GameSetupError> {
    for (block_y, row) in world.rows().iter().enumerate() {
        for (block_x, tile) in row.iter().enumerate() {
            let Tile::Portal(portal) = tile else {
                continue;
            };
            let coord = TileCoord::new(block_x as i64, block_y as i64);
            worlds
                .get(&portal.world_id)
                .ok_or_else(|| LookupError::UnknownWorld(portal.world_id.clone()))
                .and_then(|dest| dest.spawn_point(&portal.spawn_id))
                .map_err(|source| GameSetupError::DanglingPortal {
                    world_id: world.id().to_string(),
                    block_x: coord.block_x,
                    block_y: coord.block_y,
                    source,
                })?;
        }
    }
    Ok(())
}

/// Outbound route for one live connection.
struct Session {
    conn_id: ConnId,
    outbound_tx: mpsc::Sender<Outbound>,
    last_full_log: Instant,
}

/// The single writer: applies client events and ticks, then flushes outbound messages.
pub async fn world_task(
    mut game: Game,
    mut input_rx: mpsc::Receiver<GameEvent>,
    tick_interval: Duration,
) {
    let mut sessions: HashMap<String, Session> = HashMap::new();
    let mut outbox = Outbox::default();

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_event = input_rx.recv() => {
                let Some(event) = maybe_event else {
                    info!("input channel closed; world task exiting");
                    break;
                };
                apply_event(&mut game, &mut sessions, event, &mut outbox);
            }
            _ = interval.tick() => {
                game.tick();
            }
        }

        deliver(&mut sessions, &mut outbox);
    }
}

fn apply_event(
    game: &mut Game,
    sessions: &mut HashMap<String, Session>,
    event: GameEvent,
    outbox: &mut Outbox,
) {
    match event {
        GameEvent::Join {
            username,
            conn_id,
            outbound_tx,
        } => {
            let session = Session {
                conn_id,
                outbound_tx,
                last_full_log: Instant::now() - LOG_THROTTLE,
            };
            // Dropping the old sender ends the replaced connection's outbound stream.
            if let Some(old) = sessions.insert(username.clone(), session) {
                info!(username = %username, old_conn_id = old.conn_id, conn_id, "session replaced");
            }
            game.connect(&username, outbox);
        }
        GameEvent::Leave { username, conn_id } => {
            if !owns_session(sessions, &username, conn_id) {
                debug!(username = %username, conn_id, "stale leave ignored");
                return;
            }
            sessions.remove(&username);
            game.disconnect(&username);
        }
        GameEvent::Command {
            username,
            conn_id,
            command,
        } => {
            if !owns_session(sessions, &username, conn_id) {
                debug!(username = %username, conn_id, "command from replaced connection ignored");
                return;
            }
            game.handle(&username, command, outbox);
        }
    }
}

fn owns_session(sessions: &HashMap<String, Session>, username: &str, conn_id: ConnId) -> bool {
    sessions
        .get(username)
        .is_some_and(|session| session.conn_id == conn_id)
}

fn deliver(sessions: &mut HashMap<String, Session>, outbox: &mut Outbox) {
    for (username, message) in outbox.drain() {
        // Offline avatars still receive tags; there is nobody to deliver them to.
        let Some(session) = sessions.get_mut(&username) else {
            continue;
        };
        match session.outbound_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if should_log(&mut session.last_full_log) {
                    warn!(username = %username, "outbound channel full; dropping message");
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(username = %username, "outbound channel closed; dropping message");
            }
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::battle::{BattleNotice, Move};
    use crate::domain::dialogue::DialogueMessage;
    use crate::domain::entity::{Entity, EntityKind, Motion};
    use crate::domain::geometry::Direction;
    use crate::domain::tile::{Grass, Portal, WildGrass};
    use rand::SeedableRng;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ManualClock {
        now: Mutex<f64>,
    }

    impl ManualClock {
        fn advance(&self, seconds: f64) {
            if let Ok(mut now) = self.now.lock() {
                *now += seconds;
            }
        }
    }

    impl Clock for ManualClock {
        fn now_seconds(&self) -> f64 {
            self.now.lock().map(|now| *now).unwrap_or_default()
        }
    }

    fn spawns(points: &[(&str, i64, i64)]) -> BTreeMap<String, TileCoord> {
        points
            .iter()
            .map(|(name, x, y)| (name.to_string(), TileCoord::new(*x, *y)))
            .collect()
    }

    // starting_world: spawn at (0,0), a portal at (2,0) to second_world/east, wild grass
    // at (0,2) and a guide just off the left edge of the grid.
    fn worlds() -> Vec<World> {
        let grass = || Tile::Grass(Grass);
        let portal = Tile::Portal(Portal {
            world_id: "second_world".to_string(),
            spawn_id: "east".to_string(),
        });
        let starting = World::new(
            "starting_world",
            vec![
                vec![grass(), grass(), portal, grass()],
                vec![grass(), grass(), grass(), grass()],
                vec![Tile::WildGrass(WildGrass), grass(), grass(), grass()],
            ],
            vec![Entity::spawn(
                EntityKind::Guide,
                Motion::new(Vec2::new(-40.0, 2.0), Vec2::ZERO, Direction::Down),
            )],
            spawns(&[("center_spawn", 0, 0)]),
        );
        let second = World::new(
            "second_world",
            vec![vec![grass(); 4]; 4],
            vec![Entity::spawn(
                EntityKind::Walker,
                Motion::new(Vec2::new(64.0, 64.0), Vec2::new(48.0, 0.0), Direction::Right),
            )],
            spawns(&[("east", 3, 1)]),
        );
        vec![starting, second]
    }

    fn game_with(config: GameConfig) -> (Game, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        clock.advance(100.0);
        let game = Game::new(worlds(), config, clock.clone(), StdRng::seed_from_u64(11))
            .expect("valid worlds");
        (game, clock)
    }

    fn game() -> (Game, Arc<ManualClock>) {
        game_with(GameConfig::new("starting_world", "center_spawn"))
    }

    fn step(game: &mut Game, clock: &ManualClock, username: &str, dirs: &[Direction]) -> Outbox {
        clock.advance(0.1);
        let mut out = Outbox::default();
        game.handle(
            username,
            ClientCommand::Move {
                dirs: dirs.to_vec(),
                fast: false,
            },
            &mut out,
        );
        out
    }

    fn kinds(out: &Outbox, username: &str) -> Vec<&'static str> {
        out.for_user(username)
            .map(|m| match m {
                Outbound::World(_) => "world",
                Outbound::MovedTo(_) => "movedto",
                Outbound::Players(_) => "players",
                Outbound::Entities(_) => "entities",
                Outbound::Dialogue { .. } => "dialogue",
                Outbound::Tag { .. } => "tag",
                Outbound::Battle(_) => "battle",
                Outbound::SignText(_) => "signtext",
            })
            .collect()
    }

    #[test]
    fn when_new_user_connects_then_they_spawn_at_the_start_point() {
        let (mut game, _) = game();
        let mut out = Outbox::default();
        game.connect("ada", &mut out);

        let player = game.player("ada").expect("created");
        assert_eq!(player.pos, Vec2::new(2.0, 2.0));
        assert_eq!(player.world_id, "starting_world");
        let Some(Outbound::World(view)) = out.for_user("ada").next() else {
            panic!("expected a world message");
        };
        assert_eq!(view.spawn_pos, Vec2::new(2.0, 2.0));
        assert_eq!(view.entities.len(), 1);
    }

    #[test]
    fn when_start_spawn_is_missing_then_setup_fails() {
        let result = Game::new(
            worlds(),
            GameConfig::new("starting_world", "nowhere"),
            Arc::new(ManualClock::default()),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(GameSetupError::StartPoint(_))));
    }

    #[test]
    fn when_portal_leads_to_missing_world_then_setup_fails() {
        let mut only_start = worlds();
        only_start.truncate(1);
        let result = Game::new(
            only_start,
            GameConfig::new("starting_world", "center_spawn"),
            Arc::new(ManualClock::default()),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(
            result,
            Err(GameSetupError::DanglingPortal { block_x: 2, block_y: 0, .. })
        ));
    }

    #[test]
    fn when_player_steps_onto_portal_then_teleport_fires_once() {
        let (mut game, clock) = game();
        game.connect("ada", &mut Outbox::default());

        // x: 2 -> 11.6 -> 21.2 -> 30.8 -> 40.4; the box reaches the portal cell (x >= 64) on step 4.
        let mut teleports = 0;
        for _ in 0..4 {
            let out = step(&mut game, &clock, "ada", &[Direction::Right]);
            if kinds(&out, "ada").contains(&"world") {
                teleports += 1;
                assert_eq!(kinds(&out, "ada"), vec!["world", "players", "movedto"]);
            }
        }
        assert_eq!(teleports, 1);

        let player = game.player("ada").expect("player");
        assert_eq!(player.world_id, "second_world");
        assert_eq!(player.pos, Vec2::new(98.0, 34.0));

        // Standing still through ticks never re-triggers it.
        for _ in 0..5 {
            clock.advance(0.1);
            game.tick();
        }
        assert_eq!(game.player("ada").expect("player").world_id, "second_world");
    }

    #[test]
    fn when_nobody_is_online_in_a_world_then_its_entities_stay_put() {
        let (mut game, clock) = game();
        game.connect("ada", &mut Outbox::default());
        let walker_before = game.world("second_world").expect("world").entities[0].pos();

        clock.advance(1.0);
        game.tick();

        let walker_after = game.world("second_world").expect("world").entities[0].pos();
        assert_eq!(walker_before, walker_after);
    }

    #[test]
    fn when_someone_is_online_in_a_world_then_its_entities_advance_by_elapsed_time() {
        let (mut game, clock) = game_with(GameConfig::new("second_world", "east"));
        game.connect("ada", &mut Outbox::default());
        let walker = &game.world("second_world").expect("world").entities[0];
        assert_eq!(walker.pos(), Vec2::new(64.0, 64.0));

        clock.advance(1.0);
        game.tick();

        // 48 px/s for the one measured second, still inside the patrol bounds.
        let walker = &game.world("second_world").expect("world").entities[0];
        assert_eq!(walker.pos(), Vec2::new(112.0, 64.0));
    }

    #[test]
    fn when_player_is_talking_then_moves_are_rejected() {
        let (mut game, clock) = game();
        game.connect("ada", &mut Outbox::default());
        // One step left faces the guide and stays clear of its box.
        step(&mut game, &clock, "ada", &[Direction::Left]);
        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::Interact, &mut out);
        assert!(kinds(&out, "ada").contains(&"dialogue"));
        let talking_to = game.player("ada").expect("player").talking_to;
        assert!(talking_to.is_some());

        let before = game.player("ada").expect("player").pos;
        let out = step(&mut game, &clock, "ada", &[Direction::Left]);
        assert!(out.is_empty());
        assert_eq!(game.player("ada").expect("player").pos, before);
    }

    #[test]
    fn when_user_reconnects_then_state_is_kept_and_battle_is_resent() {
        let mut config = GameConfig::new("starting_world", "center_spawn");
        config.encounter.chance = 1.0;
        let (mut game, clock) = game_with(config);
        game.connect("ada", &mut Outbox::default());

        // Down onto the wild grass at (0,2): y 2 -> ... reaches 64 - 28 = 36 on step 4.
        let mut started = false;
        for _ in 0..4 {
            let out = step(&mut game, &clock, "ada", &[Direction::Down]);
            started |= kinds(&out, "ada").contains(&"battle");
        }
        assert!(started);
        assert!(game.in_battle("ada"));

        game.disconnect("ada");
        assert!(!game.player("ada").expect("player").online);

        let mut out = Outbox::default();
        game.connect("ada", &mut out);
        assert_eq!(
            kinds(&out, "ada"),
            vec!["world", "battle", "battle", "battle"]
        );
        assert!(game.in_battle("ada"));

        // Requests for updates are ignored mid-battle.
        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::GetUpdates, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn when_ai_wins_then_player_respawns_at_the_start() {
        let mut config = GameConfig::new("starting_world", "center_spawn");
        config.encounter.chance = 1.0;
        let (mut game, clock) = game_with(config);
        game.connect("ada", &mut Outbox::default());
        for _ in 0..4 {
            step(&mut game, &clock, "ada", &[Direction::Down]);
        }
        assert!(game.in_battle("ada"));

        if let Some(player) = game.players.get_mut("ada") {
            player.combatant.hp = 1;
            player.combatant.speed = 1;
            player.combatant.moves = vec![Move::new("Tickle", 0)];
        }
        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::BattleMove { index: 0 }, &mut out);

        assert_eq!(kinds(&out, "ada"), vec!["battle", "world"]);
        assert!(matches!(
            out.for_user("ada").next(),
            Some(Outbound::Battle(BattleNotice::End))
        ));
        assert!(!game.in_battle("ada"));
        let player = game.player("ada").expect("player");
        assert_eq!(player.pos, Vec2::new(2.0, 2.0));
        assert_eq!(player.facing, Direction::Down);
        assert_eq!(player.combatant.hp, 20);
    }

    #[test]
    fn when_updates_are_requested_then_other_players_are_listed() {
        let (mut game, _) = game();
        game.connect("ada", &mut Outbox::default());
        game.connect("bob", &mut Outbox::default());
        game.disconnect("bob");

        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::GetUpdates, &mut out);

        let messages: Vec<_> = out.for_user("ada").collect();
        let Outbound::Players(players) = messages[0] else {
            panic!("expected players first");
        };
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "bob");
        assert!(matches!(messages[1], Outbound::Entities(e) if e.len() == 1));
    }

    #[test]
    fn when_players_overlap_then_both_are_told_about_the_tag() {
        let (mut game, _) = game();
        game.connect("ada", &mut Outbox::default());
        game.connect("bob", &mut Outbox::default());

        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::Interact, &mut out);

        for user in ["ada", "bob"] {
            let tags: Vec<_> = out
                .for_user(user)
                .filter_map(|m| match m {
                    Outbound::Tag { tagger, tagged } => Some((tagger.as_str(), tagged.as_str())),
                    _ => None,
                })
                .collect();
            assert_eq!(tags, vec![("ada", "bob")]);
        }
    }

    #[test]
    fn when_interacting_with_nothing_nearby_then_nothing_is_sent() {
        let (mut game, _) = game();
        game.connect("ada", &mut Outbox::default());
        let mut out = Outbox::default();
        game.handle("ada", ClientCommand::Interact, &mut out);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn when_stale_connection_leaves_then_newer_session_stays_online() {
        let (game, _) = game();
        let (input_tx, input_rx) = mpsc::channel(16);
        let task = tokio::spawn(world_task(game, input_rx, Duration::from_millis(5)));

        let (old_tx, mut old_rx) = mpsc::channel(16);
        let (new_tx, mut new_rx) = mpsc::channel(16);
        for (conn_id, outbound_tx) in [(1, old_tx), (2, new_tx)] {
            input_tx
                .send(GameEvent::Join {
                    username: "ada".to_string(),
                    conn_id,
                    outbound_tx,
                })
                .await
                .expect("world task alive");
        }
        assert!(matches!(old_rx.recv().await, Some(Outbound::World(_))));
        // The replaced route was dropped.
        assert!(old_rx.recv().await.is_none());
        assert!(matches!(new_rx.recv().await, Some(Outbound::World(_))));

        input_tx
            .send(GameEvent::Leave {
                username: "ada".to_string(),
                conn_id: 1,
            })
            .await
            .expect("world task alive");
        input_tx
            .send(GameEvent::Command {
                username: "ada".to_string(),
                conn_id: 2,
                command: ClientCommand::GetUpdates,
            })
            .await
            .expect("world task alive");
        assert!(matches!(new_rx.recv().await, Some(Outbound::Players(_))));
        assert!(matches!(new_rx.recv().await, Some(Outbound::Entities(_))));

        drop(input_tx);
        task.await.expect("world task exits cleanly");
    }

    #[test]
    fn when_dialogue_is_answered_then_the_answer_is_routed_to_the_player() {
        let (mut game, clock) = game();
        game.connect("ada", &mut Outbox::default());
        step(&mut game, &clock, "ada", &[Direction::Left]);
        game.handle("ada", ClientCommand::Interact, &mut Outbox::default());
        let entity_id = game
            .player("ada")
            .and_then(|p| p.talking_to)
            .expect("talking to the guide");

        let mut out = Outbox::default();
        game.handle(
            "ada",
            ClientCommand::DialogueChoose {
                entity_id,
                choice: 0,
            },
            &mut out,
        );
        assert!(matches!(
            out.for_user("ada").next(),
            Some(Outbound::Dialogue { message: DialogueMessage::Line(text), .. }) if text == "Glad to hear it!"
        ));
    }
}
