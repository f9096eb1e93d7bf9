//! match3: engine-neutral match-3 board core.
//!
//! A [`GameState`] owns the board and drives everything else: swaps go in,
//! the [`CascadeEngine`] clears, resolves special tiles, compacts and refills
//! until the board is stable, and [`BoardEvent`]s come out for whatever
//! presents the game.

pub mod cascade;
pub mod config;
pub mod effects;
pub mod events;
pub mod game;
pub mod generate;
pub mod grid;
pub mod hints;
pub mod scanner;
pub mod timers;

pub use cascade::{CascadeEngine, CascadeStep, Phase};
pub use config::{ConfigError, GameConfig};
pub use events::BoardEvent;
pub use game::{GameState, Outcome, SwapRejected, SwapReport};
pub use grid::{Cell, Coord, Grid, GridParseError, SpecialKind, SymbolId, Tile};
pub use hints::Hint;
pub use scanner::{MatchGroup, MatchShape, Scan};
