//! Board grid: coordinates, tiles, cells, gravity and text layouts.

use std::fmt;
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Index into the plain symbol palette (0..symbol_count).
pub type SymbolId = u8;

/// Orthogonal neighbour offsets in lookup order: up, down, left, right.
pub const ORTHOGONAL: [(isize, isize); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];

/// Glyph for an empty cell in text layouts.
const EMPTY_GLYPH: char = '.';

/// Bonus tiles. Declaration order is the order of the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialKind {
    AreaBomb,
    CrossBomb,
    Clock,
    ScoreMultiplier,
    Freeze,
}

impl SpecialKind {
    pub const ALL: [Self; 5] = [
        Self::AreaBomb,
        Self::CrossBomb,
        Self::Clock,
        Self::ScoreMultiplier,
        Self::Freeze,
    ];

    /// Position in [`SpecialKind::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn glyph(self) -> char {
        match self {
            Self::AreaBomb => '*',
            Self::CrossBomb => '+',
            Self::Clock => '@',
            Self::ScoreMultiplier => 'x',
            Self::Freeze => '#',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.glyph() == c)
    }
}

/// What a cell holds: a plain matchable symbol or a special bonus tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Plain(SymbolId),
    Special(SpecialKind),
}

impl Tile {
    pub fn symbol(self) -> Option<SymbolId> {
        match self {
            Self::Plain(s) => Some(s),
            Self::Special(_) => None,
        }
    }

    pub fn special(self) -> Option<SpecialKind> {
        match self {
            Self::Plain(_) => None,
            Self::Special(k) => Some(k),
        }
    }

    /// Plain symbols print as `A`, `B`, ...; specials use their own glyph.
    pub fn glyph(self) -> char {
        match self {
            Self::Plain(s) => char::from(b'A' + s),
            Self::Special(k) => k.glyph(),
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            return Some(Self::Plain(c as u8 - b'A'));
        }
        SpecialKind::from_glyph(c).map(Self::Special)
    }
}

/// Board position. `x` counts columns from the left, `y` rows from the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// True if `other` is directly up, down, left or right of `self`.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub tile: Option<Tile>,
    /// Frozen cells cannot be swapped or cleared.
    pub frozen: bool,
}

impl Cell {
    pub const EMPTY: Self = Self {
        tile: None,
        frozen: false,
    };

    pub fn with_tile(tile: Tile) -> Self {
        Self {
            tile: Some(tile),
            frozen: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tile.is_none()
    }

    /// Occupied and frozen: stays put during compaction.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.frozen && self.tile.is_some()
    }
}

/// One tile falling from `from` to `to` during compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    pub from: Coord,
    pub to: Coord,
    pub tile: Tile,
}

/// Result of collapsing one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnCompaction {
    pub moves: Vec<TileMove>,
    /// Empty slots left at the top of the column, bottom-most first.
    pub vacated: Vec<Coord>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridParseError {
    #[error("layout has no rows")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at row {row}, column {col}")]
    UnknownGlyph { glyph: char, row: usize, col: usize },
}

/// Board: `width × height` cells. rows[0] is the bottom row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    /// Empty board.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![Cell::EMPTY; width]; height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn contains(&self, at: Coord) -> bool {
        at.x < self.width && at.y < self.height
    }

    #[inline]
    pub fn get(&self, at: Coord) -> Option<&Cell> {
        self.rows.get(at.y).and_then(|row| row.get(at.x))
    }

    /// Tile at `at`; `None` when empty or outside the board.
    #[inline]
    pub fn tile(&self, at: Coord) -> Option<Tile> {
        self.get(at).and_then(|c| c.tile)
    }

    pub fn set_tile(&mut self, at: Coord, tile: Option<Tile>) {
        self[at].tile = tile;
    }

    /// Empties the cell and returns what it held.
    pub fn take(&mut self, at: Coord) -> Option<Tile> {
        self[at].tile.take()
    }

    pub fn set_frozen(&mut self, at: Coord, frozen: bool) {
        self[at].frozen = frozen;
    }

    /// `at` shifted by `(dx, dy)`, if still on the board. No wrapping.
    pub fn offset(&self, at: Coord, dx: isize, dy: isize) -> Option<Coord> {
        let x = at.x.checked_add_signed(dx)?;
        let y = at.y.checked_add_signed(dy)?;
        let c = Coord::new(x, y);
        self.contains(c).then_some(c)
    }

    /// In-bounds orthogonal neighbours of `at` (up, down, left, right).
    pub fn neighbours(&self, at: Coord) -> impl Iterator<Item = Coord> + '_ {
        ORTHOGONAL
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(at, dx, dy))
    }

    /// All coordinates, row by row from the bottom, left to right.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |y| (0..w).map(move |x| Coord::new(x, y)))
    }

    /// Exchanges the tiles of two cells. The frozen flag belongs to the position and stays.
    pub fn swap(&mut self, a: Coord, b: Coord) {
        let ta = self[a].tile;
        self[a].tile = self[b].tile;
        self[b].tile = ta;
    }

    /// Gravity for one column: tiles fall toward y = 0 keeping their order.
    /// Pinned (frozen, occupied) cells hold their place and other tiles fall past them.
    pub fn compact_column(&mut self, x: usize) -> ColumnCompaction {
        let slots: Vec<usize> = (0..self.height)
            .filter(|&y| !self.rows[y][x].is_pinned())
            .collect();
        let falling: Vec<(usize, Tile)> = slots
            .iter()
            .filter_map(|&y| self.rows[y][x].tile.map(|t| (y, t)))
            .collect();

        let mut out = ColumnCompaction::default();
        for (i, &y) in slots.iter().enumerate() {
            let to = Coord::new(x, y);
            match falling.get(i) {
                Some(&(from_y, tile)) => {
                    if from_y != y {
                        out.moves.push(TileMove {
                            from: Coord::new(x, from_y),
                            to,
                            tile,
                        });
                    }
                    self.rows[y][x].tile = Some(tile);
                }
                None => {
                    self.rows[y][x].tile = None;
                    out.vacated.push(to);
                }
            }
        }
        out
    }

    /// Parses a text layout: one line per row, top row first. Plain symbols are
    /// `A`..`Z`, specials `* + @ x #`, empty `.`. Whitespace inside a row is
    /// ignored; blank lines and lines starting with `;` are skipped.
    pub fn parse(s: &str) -> Result<Self, GridParseError> {
        let mut lines: Vec<Vec<Option<Tile>>> = Vec::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let row = lines.len();
            let cells = line
                .chars()
                .filter(|c| !c.is_whitespace())
                .enumerate()
                .map(|(col, glyph)| match glyph {
                    EMPTY_GLYPH => Ok(None),
                    _ => Tile::from_glyph(glyph)
                        .map(Some)
                        .ok_or(GridParseError::UnknownGlyph { glyph, row, col }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(cells);
        }

        let width = lines.first().map(Vec::len).ok_or(GridParseError::Empty)?;
        if width == 0 {
            return Err(GridParseError::Empty);
        }
        if let Some((row, found)) = lines
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != width)
        {
            return Err(GridParseError::Ragged {
                row,
                expected: width,
                found,
            });
        }

        let height = lines.len();
        let mut grid = Self::new(width, height);
        for (row, tiles) in lines.into_iter().enumerate() {
            let y = height - 1 - row;
            for (x, tile) in tiles.into_iter().enumerate() {
                grid.rows[y][x].tile = tile;
            }
        }
        Ok(grid)
    }
}

impl Index<Coord> for Grid {
    type Output = Cell;

    /// Panics when `at` is off the board.
    fn index(&self, at: Coord) -> &Cell {
        &self.rows[at.y][at.x]
    }
}

impl IndexMut<Coord> for Grid {
    fn index_mut(&mut self, at: Coord) -> &mut Cell {
        &mut self.rows[at.y][at.x]
    }
}

impl fmt::Display for Grid {
    /// Same layout [`Grid::parse`] reads, top row first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter().rev() {
            let line: String = row
                .iter()
                .map(|c| c.tile.map_or(EMPTY_GLYPH, Tile::glyph))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
