//! Match detection: runs of three or more in a row or column, and cross-shaped triples.

use crate::grid::{Coord, Grid, ORTHOGONAL, SymbolId, Tile};

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

/// Read access the scanner needs. Lets the hint scanner look at a board with
/// one swap applied without touching the real grid.
pub trait TileView {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn tile_at(&self, at: Coord) -> Option<Tile>;
    fn is_frozen(&self, at: Coord) -> bool;

    /// Plain symbol at `at` if that cell can take part in a match.
    fn matchable(&self, at: Coord) -> Option<SymbolId> {
        match self.tile_at(at) {
            Some(Tile::Plain(s)) if !self.is_frozen(at) => Some(s),
            _ => None,
        }
    }
}

impl TileView for Grid {
    fn width(&self) -> usize {
        Grid::width(self)
    }

    fn height(&self) -> usize {
        Grid::height(self)
    }

    fn tile_at(&self, at: Coord) -> Option<Tile> {
        self.tile(at)
    }

    fn is_frozen(&self, at: Coord) -> bool {
        self.get(at).is_some_and(|c| c.frozen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchShape {
    Run(Axis),
    /// Centre plus two orthogonal neighbours.
    Cross,
}

/// Cells sharing one symbol that clear together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub symbol: SymbolId,
    pub shape: MatchShape,
    pub coords: Vec<Coord>,
}

impl MatchGroup {
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn contains(&self, at: Coord) -> bool {
        self.coords.contains(&at)
    }

    /// Every cell of `self` is also in `other`.
    pub fn is_within(&self, other: &Self) -> bool {
        self.coords.iter().all(|c| other.contains(*c))
    }

    pub fn same_cells(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_within(other)
    }
}

/// Everything one scan found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    /// Runs in scan order (rows bottom to top, then columns), then crosses.
    pub groups: Vec<MatchGroup>,
    /// Special cells sitting just past the end of a matched run.
    pub triggered: Vec<Coord>,
}

impl Scan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.triggered.is_empty()
    }

    /// Union of all group cells and triggered specials, first occurrence order.
    pub fn cells(&self) -> Vec<Coord> {
        let mut out: Vec<Coord> = Vec::new();
        for &c in self
            .groups
            .iter()
            .flat_map(|g| g.coords.iter())
            .chain(&self.triggered)
        {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }
}

/// Finds every match on a settled board.
pub fn scan<V: TileView + ?Sized>(view: &V) -> Scan {
    let (w, h) = (view.width(), view.height());
    let mut out = Scan::default();
    for y in 0..h {
        scan_line(view, w, |i| Coord::new(i, y), Axis::Horizontal, &mut out);
    }
    for x in 0..w {
        scan_line(view, h, |i| Coord::new(x, i), Axis::Vertical, &mut out);
    }
    find_crosses(view, &mut out);
    out
}

fn scan_line<V, F>(view: &V, len: usize, at: F, axis: Axis, out: &mut Scan)
where
    V: TileView + ?Sized,
    F: Fn(usize) -> Coord,
{
    let mut start = 0;
    while start < len {
        let Some(symbol) = view.matchable(at(start)) else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while end < len && view.matchable(at(end)) == Some(symbol) {
            end += 1;
        }
        if end - start >= MIN_RUN {
            out.groups.push(MatchGroup {
                symbol,
                shape: MatchShape::Run(axis),
                coords: (start..end).map(&at).collect(),
            });
            let before = start.checked_sub(1).map(&at);
            let after = (end < len).then(|| at(end));
            for edge in before.into_iter().chain(after) {
                trigger_special(view, edge, out);
            }
        }
        start = end;
    }
}

fn trigger_special<V: TileView + ?Sized>(view: &V, at: Coord, out: &mut Scan) {
    let special = matches!(view.tile_at(at), Some(Tile::Special(_)));
    if special && !view.is_frozen(at) && !out.triggered.contains(&at) {
        out.triggered.push(at);
    }
}

fn find_crosses<V: TileView + ?Sized>(view: &V, out: &mut Scan) {
    let (w, h) = (view.width(), view.height());
    for y in 0..h {
        for x in 0..w {
            let centre = Coord::new(x, y);
            let Some(symbol) = view.matchable(centre) else {
                continue;
            };
            let arms: Vec<Coord> = ORTHOGONAL
                .into_iter()
                .filter_map(|(dx, dy)| {
                    let c = Coord::new(x.checked_add_signed(dx)?, y.checked_add_signed(dy)?);
                    (c.x < w && c.y < h).then_some(c)
                })
                .filter(|&c| view.matchable(c) == Some(symbol))
                .collect();

            for (i, &a) in arms.iter().enumerate() {
                for &b in &arms[i + 1..] {
                    let mut coords = vec![centre, a, b];
                    coords.sort_unstable();
                    let group = MatchGroup {
                        symbol,
                        shape: MatchShape::Cross,
                        coords,
                    };
                    // drop triples already covered by a run or an earlier cross
                    if !out.groups.iter().any(|g| group.is_within(g)) {
                        out.groups.push(group);
                    }
                }
            }
        }
    }
}
