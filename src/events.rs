//! Events for presentation, audio and score displays. The core only queues them.

use crate::game::Outcome;
use crate::grid::{Coord, Tile};
use crate::scanner::MatchGroup;
use crate::timers::TimedKind;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Tile cleared from a cell.
    Removed { at: Coord, tile: Tile },
    /// Tile placed into an empty cell by a refill.
    Added { at: Coord, tile: Tile },
    /// Tile moved by a swap or by gravity.
    Moved { from: Coord, to: Coord, tile: Tile },
    Explosion { at: Coord },
    /// Cells worth pointing out to an idle player.
    Highlight { group: MatchGroup },
    Frozen { cells: Vec<Coord> },
    Thawed { cells: Vec<Coord> },
    ScoreChanged { delta: i64, total: u32 },
    MovesChanged { delta: i32, remaining: u32 },
    /// Timed effect started at game-clock time `at`.
    EffectStarted {
        kind: TimedKind,
        at: Duration,
        duration: Duration,
    },
    EffectEnded { kind: TimedKind },
    GameOver { outcome: Outcome },
}
