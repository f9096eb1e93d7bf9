//! Board generation and refill tile choice.
//!
//! Generation walks the board column by column, bottom to top, and never
//! places a tile equal to the one on its left or the one below, so a fresh
//! board holds no two equal neighbours.

use crate::config::GameConfig;
use crate::effects::SpecialTable;
use crate::grid::{Coord, Grid, SymbolId, Tile};
use rand::Rng;

/// Builds a level's starting board.
pub fn generate<R: Rng>(config: &GameConfig, specials: &SpecialTable, rng: &mut R) -> Grid {
    let (w, h) = (config.width, config.height);
    let mut grid = Grid::new(w, h);
    // special candidates: every `stride`-th column, one random row each
    let stride = if w > 1 { rng.random_range(1..w) } else { 1 };

    for x in 0..w {
        let special_row = rng.random_range(0..h);
        for y in 0..h {
            let at = Coord::new(x, y);
            let left = x.checked_sub(1).and_then(|lx| grid.tile(Coord::new(lx, y)));
            let below = y.checked_sub(1).and_then(|by| grid.tile(Coord::new(x, by)));

            let seeded = x % stride == 0
                && y == special_row
                && rng.random_bool(config.seed_special_chance);
            let special = if seeded {
                specials
                    .draw(rng)
                    .map(Tile::Special)
                    .filter(|t| Some(*t) != left && Some(*t) != below)
            } else {
                None
            };

            let tile = match special {
                Some(t) => t,
                None => Tile::Plain(
                    pick_symbol(config.symbol_count, &[left, below], rng)
                        .unwrap_or_else(|| rng.random_range(0..config.symbol_count)),
                ),
            };
            grid.set_tile(at, Some(tile));
        }
    }
    grid
}

/// Tile for an empty slot being refilled after a cascade: occasionally a special,
/// otherwise a plain symbol different from the current left, right, below and above
/// tiles. A tile above an empty slot can only be a frozen one that did not fall.
pub fn refill_tile<R: Rng>(
    grid: &Grid,
    at: Coord,
    config: &GameConfig,
    specials: &SpecialTable,
    rng: &mut R,
) -> Tile {
    if rng.random::<f64>() + config.refill_special_chance > 1.0 {
        if let Some(kind) = specials.draw(rng) {
            return Tile::Special(kind);
        }
    }

    let left = grid.offset(at, -1, 0).and_then(|c| grid.tile(c));
    let right = grid.offset(at, 1, 0).and_then(|c| grid.tile(c));
    let below = grid.offset(at, 0, -1).and_then(|c| grid.tile(c));
    let above = grid.offset(at, 0, 1).and_then(|c| grid.tile(c));
    let n = config.symbol_count;

    let symbol = pick_symbol(n, &[left, right, below, above], rng)
        .or_else(|| pick_symbol(n, &[below, above], rng))
        .or_else(|| pick_symbol(n, &[below], rng))
        .unwrap_or_else(|| rng.random_range(0..n));
    Tile::Plain(symbol)
}

/// Uniform choice among `0..count` excluding the plain symbols in `excluded`.
fn pick_symbol<R: Rng>(
    count: SymbolId,
    excluded: &[Option<Tile>],
    rng: &mut R,
) -> Option<SymbolId> {
    let candidates: Vec<SymbolId> = (0..count)
        .filter(|&s| !excluded.contains(&Some(Tile::Plain(s))))
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}
