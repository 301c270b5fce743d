// Mobile, independently updating world objects (NPCs).

use crate::domain::dialogue::{Conversation, DialogueLine, DialogueMessage, Progress};
use crate::domain::geometry::{BoundingBox, Direction, Vec2};
use crate::domain::tuning::{BLOCK_WIDTH, PLAYER_WIDTH};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable opaque entity identity, rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Walker,
    Guide,
}

/// Kinematic state shared by every entity variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub facing: Direction,
}

impl Motion {
    pub fn new(pos: Vec2, velocity: Vec2, facing: Direction) -> Self {
        Self {
            pos,
            velocity,
            facing,
        }
    }

    fn integrate(&mut self, dt: f64) {
        self.pos = self.pos + self.velocity * dt;
    }
}

pub struct EntityEventContext<'a> {
    pub username: &'a str,
    pub messages: &'a mut Vec<DialogueMessage>,
}

/// Hooks every entity variant exposes.
pub trait EntityHooks {
    fn blocks_movement(&self) -> bool {
        false
    }

    fn box_width(&self) -> f64 {
        BLOCK_WIDTH
    }

    /// Called once per world tick.
    fn update(&mut self, motion: &mut Motion, dt: f64) {
        motion.integrate(dt);
    }

    fn on_interact(&mut self, _motion: &mut Motion, _ctx: &mut EntityEventContext<'_>) -> Progress {
        Progress::Unchanged
    }

    fn on_dialogue_choose(
        &mut self,
        _motion: &mut Motion,
        _ctx: &mut EntityEventContext<'_>,
        _choice: usize,
    ) -> Progress {
        Progress::Unchanged
    }
}

/// Paces three blocks either side of where it was placed and chats in a straight line.
#[derive(Debug, Clone, PartialEq)]
pub struct Walker {
    speed: f64,
    min_x: f64,
    max_x: f64,
    conversation: Conversation,
}

impl Walker {
    /// Builds the walker and turns its velocity into a horizontal patrol at the same speed.
    ///
    /// A walker already heading left keeps going left; anything else starts rightward.
    pub fn new(motion: &mut Motion) -> Self {
        let speed = motion.velocity.norm();
        let heading = if motion.velocity.x < 0.0 { -1.0 } else { 1.0 };
        motion.velocity = Vec2::new(heading * speed, 0.0);
        Self {
            speed,
            min_x: motion.pos.x - BLOCK_WIDTH * 3.0,
            max_x: motion.pos.x + BLOCK_WIDTH * 3.0,
            conversation: Conversation::new(vec![
                DialogueLine::Say("Hi!".to_string()),
                DialogueLine::Say("This is dialogue.".to_string()),
                DialogueLine::Say(format!("And this is {}long dialogue.", "really ".repeat(42))),
            ]),
        }
    }

    fn resume(&self, motion: &mut Motion) {
        match motion.facing {
            Direction::Left => motion.velocity = Vec2::new(-self.speed, 0.0),
            Direction::Right => motion.velocity = Vec2::new(self.speed, 0.0),
            Direction::Up | Direction::Down => {}
        }
    }
}

impl EntityHooks for Walker {
    fn box_width(&self) -> f64 {
        PLAYER_WIDTH
    }

    fn update(&mut self, motion: &mut Motion, dt: f64) {
        motion.integrate(dt);
        if motion.pos.x > self.max_x {
            motion.facing = Direction::Left;
            motion.pos = motion.pos.with_x(self.max_x - (motion.pos.x - self.max_x));
            motion.velocity = Vec2::new(-self.speed, 0.0);
        } else if motion.pos.x < self.min_x {
            motion.facing = Direction::Right;
            motion.pos = motion.pos.with_x(self.min_x + (self.min_x - motion.pos.x));
            motion.velocity = Vec2::new(self.speed, 0.0);
        }
    }

    fn on_interact(&mut self, motion: &mut Motion, ctx: &mut EntityEventContext<'_>) -> Progress {
        motion.velocity = Vec2::ZERO;
        let progress = self.conversation.interact(ctx.username, ctx.messages);
        if progress == Progress::Closed {
            self.resume(motion);
        }
        progress
    }
}

/// Stands in place and asks visitors a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Guide {
    conversation: Conversation,
}

impl Guide {
    pub fn new() -> Self {
        Self::with_script(vec![
            DialogueLine::Say("Do you like it here?".to_string()),
            DialogueLine::Choice(vec!["Yes".to_string(), "No".to_string()]),
            DialogueLine::Branch(BTreeMap::from([
                (0, "Glad to hear it!".to_string()),
                (1, "It grows on you.".to_string()),
            ])),
        ])
    }

    pub fn with_script(script: Vec<DialogueLine>) -> Self {
        Self {
            conversation: Conversation::new(script),
        }
    }
}

impl Default for Guide {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityHooks for Guide {
    fn blocks_movement(&self) -> bool {
        true
    }

    fn on_interact(&mut self, _motion: &mut Motion, ctx: &mut EntityEventContext<'_>) -> Progress {
        self.conversation.interact(ctx.username, ctx.messages)
    }

    fn on_dialogue_choose(
        &mut self,
        _motion: &mut Motion,
        ctx: &mut EntityEventContext<'_>,
        choice: usize,
    ) -> Progress {
        self.conversation.choose(ctx.username, choice, ctx.messages)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityBehavior {
    Walker(Walker),
    Guide(Guide),
}

impl EntityBehavior {
    fn hooks(&self) -> &dyn EntityHooks {
        match self {
            EntityBehavior::Walker(b) => b,
            EntityBehavior::Guide(b) => b,
        }
    }

    fn hooks_mut(&mut self) -> &mut dyn EntityHooks {
        match self {
            EntityBehavior::Walker(b) => b,
            EntityBehavior::Guide(b) => b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    pub motion: Motion,
    behavior: EntityBehavior,
}

impl Entity {
    /// Recreates an entity of `kind` with a known id (e.g. from a world file).
    pub fn new(id: EntityId, kind: EntityKind, mut motion: Motion) -> Self {
        let behavior = match kind {
            EntityKind::Walker => EntityBehavior::Walker(Walker::new(&mut motion)),
            EntityKind::Guide => EntityBehavior::Guide(Guide::new()),
        };
        Self {
            id,
            motion,
            behavior,
        }
    }

    /// Places a new entity with a fresh random id.
    pub fn spawn(kind: EntityKind, motion: Motion) -> Self {
        Self::new(EntityId::random(), kind, motion)
    }

    pub fn with_behavior(id: EntityId, motion: Motion, behavior: EntityBehavior) -> Self {
        Self {
            id,
            motion,
            behavior,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        match self.behavior {
            EntityBehavior::Walker(_) => EntityKind::Walker,
            EntityBehavior::Guide(_) => EntityKind::Guide,
        }
    }

    pub fn pos(&self) -> Vec2 {
        self.motion.pos
    }

    pub fn blocks_movement(&self) -> bool {
        self.behavior.hooks().blocks_movement()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::square(self.motion.pos, self.behavior.hooks().box_width())
    }

    pub fn update(&mut self, dt: f64) {
        self.behavior.hooks_mut().update(&mut self.motion, dt);
    }

    pub fn on_interact(&mut self, ctx: &mut EntityEventContext<'_>) -> Progress {
        self.behavior.hooks_mut().on_interact(&mut self.motion, ctx)
    }

    pub fn on_dialogue_choose(&mut self, ctx: &mut EntityEventContext<'_>, choice: usize) -> Progress {
        self.behavior
            .hooks_mut()
            .on_dialogue_choose(&mut self.motion, ctx, choice)
    }
}

/// Read-only view of an entity for outbound messages.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub facing: Direction,
}

impl From<&Entity> for EntitySnapshot {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id,
            kind: e.kind(),
            pos: e.motion.pos,
            velocity: e.motion.velocity,
            facing: e.motion.facing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker_at(x: f64) -> Entity {
        Entity::spawn(
            EntityKind::Walker,
            Motion::new(Vec2::new(x, 64.0), Vec2::new(0.0, 48.0), Direction::Down),
        )
    }

    #[test]
    fn when_walker_is_created_then_it_patrols_rightward_at_its_speed() {
        let walker = walker_at(200.0);
        assert_eq!(walker.motion.velocity, Vec2::new(48.0, 0.0));
        assert!(!walker.blocks_movement());
        assert_eq!(walker.bounding_box().width(), PLAYER_WIDTH);
    }

    #[test]
    fn when_walker_passes_its_limit_then_it_bounces_back() {
        let mut walker = walker_at(200.0);
        // max_x = 296; after 2.5s at 48px/s the walker would be at 320.
        walker.update(2.5);
        assert_eq!(walker.motion.pos.x, 272.0);
        assert_eq!(walker.motion.facing, Direction::Left);
        assert_eq!(walker.motion.velocity, Vec2::new(-48.0, 0.0));
    }

    #[test]
    fn when_walker_is_spoken_to_then_it_stops_until_the_end() {
        let mut walker = walker_at(200.0);
        let mut messages = Vec::new();
        let mut ctx = EntityEventContext {
            username: "ada",
            messages: &mut messages,
        };

        assert_eq!(walker.on_interact(&mut ctx), Progress::Opened);
        assert_eq!(walker.motion.velocity, Vec2::ZERO);
        walker.on_interact(&mut ctx);
        walker.on_interact(&mut ctx);
        assert_eq!(walker.on_interact(&mut ctx), Progress::Closed);
        // Facing was Down, so there is no horizontal heading to resume.
        assert_eq!(walker.motion.velocity, Vec2::ZERO);

        walker.motion.facing = Direction::Left;
        walker.on_interact(&mut EntityEventContext {
            username: "ada",
            messages: &mut Vec::new(),
        });
        for _ in 0..3 {
            walker.on_interact(&mut EntityEventContext {
                username: "ada",
                messages: &mut Vec::new(),
            });
        }
        assert_eq!(walker.motion.velocity, Vec2::new(-48.0, 0.0));
    }

    #[test]
    fn when_guide_is_asked_then_it_presents_a_choice() {
        let mut guide = Entity::spawn(
            EntityKind::Guide,
            Motion::new(Vec2::new(0.0, 0.0), Vec2::ZERO, Direction::Down),
        );
        let mut messages = Vec::new();
        let mut ctx = EntityEventContext {
            username: "ada",
            messages: &mut messages,
        };
        guide.on_interact(&mut ctx);
        assert_eq!(guide.on_dialogue_choose(&mut ctx, 1), Progress::Advanced);
        assert!(guide.blocks_movement());
        assert_eq!(
            messages.last(),
            Some(&DialogueMessage::Line("It grows on you.".to_string()))
        );
    }

    #[test]
    fn when_id_is_printed_then_it_parses_back() {
        let id = EntityId::random();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<EntityId>().expect("hex id"), id);
    }
}
