// Grid-locked tiles: the closed set of tile variants and their behavior hooks.

use crate::domain::geometry::{BoundingBox, Vec2};
use crate::domain::tuning::{BLOCK_WIDTH, PLAYER_WIDTH};

/// Position of a cell in a world's tile grid. May lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub block_x: i64,
    pub block_y: i64,
}

impl TileCoord {
    pub const fn new(block_x: i64, block_y: i64) -> Self {
        Self { block_x, block_y }
    }

    /// The cell containing `pos`.
    pub fn containing(pos: Vec2) -> Self {
        Self {
            block_x: (pos.x / BLOCK_WIDTH).floor() as i64,
            block_y: (pos.y / BLOCK_WIDTH).floor() as i64,
        }
    }

    /// Top-left corner of the cell.
    pub fn to_pos(self) -> Vec2 {
        Vec2::new(
            self.block_x as f64 * BLOCK_WIDTH,
            self.block_y as f64 * BLOCK_WIDTH,
        )
    }

    /// Position that centres a player inside the cell.
    pub fn to_spawn_pos(self) -> Vec2 {
        let inset = (BLOCK_WIDTH - PLAYER_WIDTH) / 2.0;
        self.to_pos() + Vec2::new(inset, inset)
    }

    pub fn bounding_box(self) -> BoundingBox {
        BoundingBox::square(self.to_pos(), BLOCK_WIDTH)
    }

    /// Every cell `bbox` covers, row by row. The max edge is inclusive.
    pub fn covered_by(bbox: &BoundingBox) -> Vec<TileCoord> {
        let start = TileCoord::containing(bbox.min);
        let end = TileCoord::containing(bbox.max);
        (start.block_y..=end.block_y)
            .flat_map(|y| (start.block_x..=end.block_x).map(move |x| TileCoord::new(x, y)))
            .collect()
    }
}

/// Discriminant of a tile variant; the unit of registration in `Registries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Empty,
    Grass,
    WildGrass,
    Wall,
    Portal,
    Sign,
}

/// Side effects requested by tile hooks, applied by the dispatcher afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum TileEffect {
    Teleport { world_id: String, spawn_id: String },
    ShowSign { text: String },
    Encounter,
}

pub struct TileEventContext<'a> {
    pub username: &'a str,
    pub coord: TileCoord,
    effects: &'a mut Vec<TileEffect>,
}

impl<'a> TileEventContext<'a> {
    pub fn new(username: &'a str, coord: TileCoord, effects: &'a mut Vec<TileEffect>) -> Self {
        Self {
            username,
            coord,
            effects,
        }
    }

    pub fn emit(&mut self, effect: TileEffect) {
        self.effects.push(effect);
    }
}

/// Hooks every tile variant exposes. Defaults describe an inert, walkable tile.
pub trait TileBehavior {
    fn blocks_movement(&self) -> bool {
        false
    }

    /// Fired when a player newly touches the tile during a move.
    fn on_move_on(&self, _ctx: &mut TileEventContext<'_>) {}

    /// Fired when a player interacts while touching the tile.
    fn on_interact(&self, _ctx: &mut TileEventContext<'_>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grass;

/// Tall grass that can start a random battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildGrass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wall;

/// Teleports players to a named spawn point in another world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    pub world_id: String,
    pub spawn_id: String,
}

/// Readable sign drawn on top of a ground tile. Only the ground tile is shown to clients up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Sign {
    pub text: String,
    pub ground_tile: Box<Tile>,
}

impl TileBehavior for Empty {}

impl TileBehavior for Grass {}

impl TileBehavior for WildGrass {
    fn on_move_on(&self, ctx: &mut TileEventContext<'_>) {
        ctx.emit(TileEffect::Encounter);
    }
}

impl TileBehavior for Wall {
    fn blocks_movement(&self) -> bool {
        true
    }
}

impl TileBehavior for Portal {
    fn on_move_on(&self, ctx: &mut TileEventContext<'_>) {
        ctx.emit(TileEffect::Teleport {
            world_id: self.world_id.clone(),
            spawn_id: self.spawn_id.clone(),
        });
    }
}

impl TileBehavior for Sign {
    fn on_interact(&self, ctx: &mut TileEventContext<'_>) {
        ctx.emit(TileEffect::ShowSign {
            text: self.text.clone(),
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tile {
    Empty(Empty),
    Grass(Grass),
    WildGrass(WildGrass),
    Wall(Wall),
    Portal(Portal),
    Sign(Sign),
}

/// Returned for coordinates outside a world's grid: world edges are open.
pub static EMPTY_TILE: Tile = Tile::Empty(Empty);

impl Tile {
    pub fn kind(&self) -> TileKind {
        match self {
            Tile::Empty(_) => TileKind::Empty,
            Tile::Grass(_) => TileKind::Grass,
            Tile::WildGrass(_) => TileKind::WildGrass,
            Tile::Wall(_) => TileKind::Wall,
            Tile::Portal(_) => TileKind::Portal,
            Tile::Sign(_) => TileKind::Sign,
        }
    }

    /// Plain constructor for kinds that carry no metadata.
    pub fn plain(kind: TileKind) -> Option<Tile> {
        match kind {
            TileKind::Empty => Some(Tile::Empty(Empty)),
            TileKind::Grass => Some(Tile::Grass(Grass)),
            TileKind::WildGrass => Some(Tile::WildGrass(WildGrass)),
            TileKind::Wall => Some(Tile::Wall(Wall)),
            TileKind::Portal | TileKind::Sign => None,
        }
    }

    pub fn behavior(&self) -> &dyn TileBehavior {
        match self {
            Tile::Empty(t) => t,
            Tile::Grass(t) => t,
            Tile::WildGrass(t) => t,
            Tile::Wall(t) => t,
            Tile::Portal(t) => t,
            Tile::Sign(t) => t,
        }
    }

    pub fn blocks_movement(&self) -> bool {
        self.behavior().blocks_movement()
    }
}
