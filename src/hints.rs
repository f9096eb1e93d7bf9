//! Idle hints: matches one swap away, and the idle timer that arms them.

use crate::grid::{Coord, Grid, Tile};
use crate::scanner::{self, MatchGroup, TileView};
use std::time::Duration;

/// A swap the player could make and the tiles it would line up, in their current cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub swap: (Coord, Coord),
    pub group: MatchGroup,
}

/// The grid as it would look after swapping `a` and `b`.
struct SwappedView<'a> {
    grid: &'a Grid,
    a: Coord,
    b: Coord,
}

impl SwappedView<'_> {
    fn source(&self, at: Coord) -> Coord {
        if at == self.a {
            self.b
        } else if at == self.b {
            self.a
        } else {
            at
        }
    }
}

impl TileView for SwappedView<'_> {
    fn width(&self) -> usize {
        self.grid.width()
    }

    fn height(&self) -> usize {
        self.grid.height()
    }

    fn tile_at(&self, at: Coord) -> Option<Tile> {
        self.grid.tile(self.source(at))
    }

    fn is_frozen(&self, at: Coord) -> bool {
        TileView::is_frozen(self.grid, at)
    }
}

/// Whether the player may swap `a` and `b`: neighbours, both occupied, neither
/// frozen, and holding different tiles.
pub fn is_legal_swap(grid: &Grid, a: Coord, b: Coord) -> bool {
    let (Some(ca), Some(cb)) = (grid.get(a), grid.get(b)) else {
        return false;
    };
    a.is_adjacent(b)
        && !ca.frozen
        && !cb.frozen
        && ca.tile.is_some()
        && cb.tile.is_some()
        && ca.tile != cb.tile
}

/// Every match reachable with one legal swap. Read-only.
pub fn find_hints(grid: &Grid) -> Vec<Hint> {
    let mut hints: Vec<Hint> = Vec::new();
    for a in grid.coords() {
        for b in [grid.offset(a, 1, 0), grid.offset(a, 0, 1)].into_iter().flatten() {
            if !is_legal_swap(grid, a, b) {
                continue;
            }
            let view = SwappedView { grid, a, b };
            for group in scanner::scan(&view).groups {
                if !group.contains(a) && !group.contains(b) {
                    continue;
                }
                let mut coords: Vec<Coord> = group.coords.iter().map(|&c| view.source(c)).collect();
                coords.sort_unstable();
                let group = MatchGroup { coords, ..group };
                if hints.iter().any(|h| h.group.same_cells(&group)) {
                    continue;
                }
                hints.push(Hint { swap: (a, b), group });
            }
        }
    }
    hints
}

/// Counts idle time; fires once when the wait has passed without a swap or shift.
#[derive(Debug, Clone)]
pub struct HintTimer {
    wait: Duration,
    idle: Duration,
    fired: bool,
}

impl HintTimer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            idle: Duration::ZERO,
            fired: false,
        }
    }

    /// Cancels any pending hint and starts waiting again.
    pub fn reset(&mut self) {
        self.idle = Duration::ZERO;
        self.fired = false;
    }

    /// True exactly once per idle period, when the wait elapses.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.fired {
            return false;
        }
        self.idle += delta;
        if self.idle >= self.wait {
            self.fired = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_swap_into_row() {
        // swapping (2,0) C with (2,1) A completes the bottom row
        let grid = Grid::parse("BCA\nAAC\n").unwrap();
        let hints = find_hints(&grid);
        let hint = hints
            .iter()
            .find(|h| h.swap == (Coord::new(2, 0), Coord::new(2, 1)))
            .expect("row hint");
        assert_eq!(
            hint.group.coords,
            vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 1)]
        );
    }

    #[test]
    fn test_hints_do_not_mutate() {
        let grid = Grid::parse("BCA\nAAC\nCBB\n").unwrap();
        let before = grid.clone();
        let _ = find_hints(&grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_each_hint_swap_really_matches() {
        let grid = Grid::parse("ABCA\nBCAB\nCAAC\nABBA\n").unwrap();
        let hints = find_hints(&grid);
        assert!(!hints.is_empty());
        for hint in &hints {
            let (a, b) = hint.swap;
            let mut after = grid.clone();
            after.swap(a, b);
            let scan = scanner::scan(&after);
            assert!(
                scan.groups.iter().any(|g| g.contains(a) || g.contains(b)),
                "{hint:?}"
            );
            assert!(hint.group.len() >= 3);
        }
    }

    #[test]
    fn test_frozen_and_identical_swaps_are_not_hints() {
        let mut grid = Grid::parse("BCA\nAAC\n").unwrap();
        grid.set_frozen(Coord::new(2, 1), true);
        grid.set_frozen(Coord::new(2, 0), true);
        assert!(find_hints(&grid).iter().all(|h| h.swap.0.x != 2 && h.swap.1.x != 2));
        assert!(!is_legal_swap(&grid, Coord::new(0, 0), Coord::new(1, 0)));
        assert!(!is_legal_swap(&grid, Coord::new(0, 0), Coord::new(2, 0)));
    }

    #[test]
    fn test_no_hints_on_dead_board() {
        let grid = Grid::parse("AB\nCD\n").unwrap();
        assert!(find_hints(&grid).is_empty());
    }

    #[test]
    fn test_timer_fires_once_and_resets() {
        let mut t = HintTimer::new(Duration::from_secs(1));
        assert!(!t.tick(Duration::from_millis(600)));
        assert!(t.tick(Duration::from_millis(600)));
        assert!(!t.tick(Duration::from_secs(5)));
        t.reset();
        assert!(!t.tick(Duration::from_millis(900)));
        assert!(t.tick(Duration::from_millis(100)));
    }
}
