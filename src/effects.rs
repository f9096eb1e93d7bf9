//! Special tiles: effect dispatch table and the weighted spawn draw.

use crate::config::GameConfig;
use crate::grid::{Coord, Grid, SpecialKind};
use crate::timers::TimedKind;
use rand::Rng;

/// A candidate kind is accepted once `roll + weight` reaches this.
pub const SPAWN_THRESHOLD: f32 = 3.0;
/// Rejection draws before falling back to the heaviest kind.
const MAX_SPAWN_DRAWS: usize = 64;

/// What a cleared special tile does to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectOutcome {
    pub kind: SpecialKind,
    pub at: Coord,
    /// Extra cells to clear. May include `at`, which is already empty by then.
    pub clears: Vec<Coord>,
    /// Wall-clock effect to (re)start.
    pub timed: Option<TimedKind>,
    /// Cells to freeze.
    pub freeze: Vec<Coord>,
}

impl EffectOutcome {
    fn new(kind: SpecialKind, at: Coord) -> Self {
        Self {
            kind,
            at,
            clears: Vec::new(),
            timed: None,
            freeze: Vec::new(),
        }
    }
}

pub type EffectHandler = fn(&Grid, Coord) -> EffectOutcome;

/// Dispatch table from special kind to its handler, indexed by [`SpecialKind::index`].
#[derive(Debug, Clone)]
pub struct EffectTable {
    handlers: [EffectHandler; 5],
}

impl Default for EffectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectTable {
    pub fn new() -> Self {
        Self {
            handlers: [area_bomb, cross_bomb, clock, score_multiplier, snowflake],
        }
    }

    pub fn resolve(&self, kind: SpecialKind, grid: &Grid, at: Coord) -> EffectOutcome {
        (self.handlers[kind.index()])(grid, at)
    }
}

/// Itself plus the four orthogonal neighbours that exist.
fn area_bomb(grid: &Grid, at: Coord) -> EffectOutcome {
    let mut out = EffectOutcome::new(SpecialKind::AreaBomb, at);
    out.clears.push(at);
    out.clears.extend(grid.neighbours(at));
    out
}

/// Whole row, then whole column.
fn cross_bomb(grid: &Grid, at: Coord) -> EffectOutcome {
    let mut out = EffectOutcome::new(SpecialKind::CrossBomb, at);
    out.clears.extend((0..grid.width()).map(|x| Coord::new(x, at.y)));
    out.clears.extend(
        (0..grid.height())
            .filter(|&y| y != at.y)
            .map(|y| Coord::new(at.x, y)),
    );
    out
}

fn clock(_grid: &Grid, at: Coord) -> EffectOutcome {
    let mut out = EffectOutcome::new(SpecialKind::Clock, at);
    out.timed = Some(TimedKind::MoveFreeze);
    out
}

fn score_multiplier(_grid: &Grid, at: Coord) -> EffectOutcome {
    let mut out = EffectOutcome::new(SpecialKind::ScoreMultiplier, at);
    out.timed = Some(TimedKind::ScoreMultiplier);
    out
}

/// Neighbours of the cell and of its left and right neighbours.
fn snowflake(grid: &Grid, at: Coord) -> EffectOutcome {
    let mut out = EffectOutcome::new(SpecialKind::Freeze, at);
    let centres = std::iter::once(at)
        .chain(grid.offset(at, -1, 0))
        .chain(grid.offset(at, 1, 0));
    for centre in centres {
        for c in grid.neighbours(centre) {
            if !out.freeze.contains(&c) {
                out.freeze.push(c);
            }
        }
    }
    out
}

/// Spawn weights per special kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialTable {
    entries: Vec<(SpecialKind, f32)>,
}

impl SpecialTable {
    /// Pairs kinds with weights; extra weights are ignored.
    pub fn new(kinds: &[SpecialKind], weights: &[f32]) -> Self {
        Self {
            entries: kinds.iter().copied().zip(weights.iter().copied()).collect(),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(&config.special_kinds, &config.special_weights)
    }

    /// Rejection draw: pick a kind uniformly, roll `[0, 3)`, accept when
    /// `roll + weight >= 3`, otherwise try again. Heavier kinds pass more often,
    /// but this is not a normalised distribution. `None` when no kind is enabled.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<SpecialKind> {
        if self.entries.is_empty() {
            return None;
        }
        for _ in 0..MAX_SPAWN_DRAWS {
            let (kind, weight) = self.entries[rng.random_range(0..self.entries.len())];
            let roll: f32 = rng.random_range(0.0..SPAWN_THRESHOLD);
            if roll + weight >= SPAWN_THRESHOLD {
                return Some(kind);
            }
        }
        self.entries
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|&(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sorted(mut v: Vec<Coord>) -> Vec<Coord> {
        v.sort();
        v
    }

    #[test]
    fn test_area_bomb_centre() {
        let g = Grid::new(5, 5);
        let out = EffectTable::new().resolve(SpecialKind::AreaBomb, &g, Coord::new(2, 2));
        assert_eq!(
            sorted(out.clears),
            vec![
                Coord::new(1, 2),
                Coord::new(2, 1),
                Coord::new(2, 2),
                Coord::new(2, 3),
                Coord::new(3, 2),
            ]
        );
        assert_eq!(out.timed, None);
    }

    #[test]
    fn test_area_bomb_corner_does_not_wrap() {
        let g = Grid::new(4, 4);
        let out = EffectTable::new().resolve(SpecialKind::AreaBomb, &g, Coord::new(3, 0));
        assert_eq!(
            sorted(out.clears),
            vec![Coord::new(2, 0), Coord::new(3, 0), Coord::new(3, 1)]
        );
    }

    #[test]
    fn test_cross_bomb_row_and_column() {
        let g = Grid::new(4, 3);
        let out = EffectTable::new().resolve(SpecialKind::CrossBomb, &g, Coord::new(1, 1));
        assert_eq!(out.clears.len(), 4 + 3 - 1);
        assert!(out.clears.iter().all(|c| c.x == 1 || c.y == 1));
    }

    #[test]
    fn test_timed_handlers() {
        let g = Grid::new(3, 3);
        let t = EffectTable::new();
        let at = Coord::new(1, 1);
        assert_eq!(
            t.resolve(SpecialKind::Clock, &g, at).timed,
            Some(TimedKind::MoveFreeze)
        );
        let x2 = t.resolve(SpecialKind::ScoreMultiplier, &g, at);
        assert_eq!(x2.timed, Some(TimedKind::ScoreMultiplier));
        assert!(x2.clears.is_empty());
    }

    #[test]
    fn test_snowflake_neighbourhood() {
        let g = Grid::new(5, 5);
        let out = EffectTable::new().resolve(SpecialKind::Freeze, &g, Coord::new(2, 2));
        // own 4 neighbours, plus up/down/outer side of the left and right neighbours, plus itself
        assert_eq!(out.freeze.len(), 4 + 3 + 3 + 1);
        assert!(out.freeze.contains(&Coord::new(0, 2)));
        assert!(out.freeze.contains(&Coord::new(1, 3)));
        assert!(out.freeze.contains(&Coord::new(3, 1)));
        assert!(!out.freeze.contains(&Coord::new(2, 4)));
    }

    #[test]
    fn test_draw_favours_heavier_kinds() {
        let table = SpecialTable::new(
            &[SpecialKind::AreaBomb, SpecialKind::CrossBomb],
            &[2.5, 0.1],
        );
        let mut rng = StdRng::seed_from_u64(7);
        let bombs = (0..2000)
            .filter(|_| table.draw(&mut rng) == Some(SpecialKind::AreaBomb))
            .count();
        assert!(bombs > 1500, "area bombs drawn: {bombs}");
    }

    #[test]
    fn test_draw_is_bounded() {
        let table = SpecialTable::new(&[SpecialKind::Clock, SpecialKind::Freeze], &[0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(table.draw(&mut rng).is_some());
        assert_eq!(SpecialTable::new(&[], &[]).draw(&mut rng), None);
    }
}
