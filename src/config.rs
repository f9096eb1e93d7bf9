//! Game configuration: board size, palette, special-tile weights, scoring, timings, level plan.

use crate::grid::SpecialKind;
use std::time::Duration;
use thiserror::Error;

pub const MIN_SYMBOLS: u8 = 3;
/// Plain symbols print as `A`..`Z`.
pub const MAX_SYMBOLS: u8 = 26;
/// Each level starts with this many fewer moves than the last.
pub const MOVES_PENALTY_PER_LEVEL: u32 = 5;

/// Spawn weights in [`SpecialKind::ALL`] order: area bomb, cross bomb, clock, x2 score, snowflake.
pub const DEFAULT_SPECIAL_WEIGHTS: [f32; 5] = [1.8, 0.3, 0.6, 1.3, 0.9];

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Number of distinct plain symbols.
    pub symbol_count: u8,
    /// Special kinds that may spawn; `special_weights[i]` belongs to `special_kinds[i]`.
    pub special_kinds: Vec<SpecialKind>,
    pub special_weights: Vec<f32>,
    /// Chance that a generation-time special candidate really becomes special.
    pub seed_special_chance: f64,
    /// Chance that a refilled slot receives a special tile.
    pub refill_special_chance: f64,
    /// Points per refilled cell (before the multiplier).
    pub points_per_cell: u32,
    /// Score cost of an on-demand hint.
    pub hint_penalty: u32,
    pub base_moves: u32,
    /// Goal for level 1; later levels scale it linearly. 0 disables winning.
    pub start_goal: u32,
    pub level: u32,
    /// Time between cascade steps when driven by `tick`.
    pub step_delay: Duration,
    /// Idle time before hints are computed.
    pub hint_wait: Duration,
    /// Clock tile: how long moves are free.
    pub move_freeze: Duration,
    /// x2 tile: how long refills score double.
    pub multiplier_duration: Duration,
    /// Snowflake tile: moves until frozen cells thaw.
    pub freeze_tile_steps: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            symbol_count: 5,
            special_kinds: SpecialKind::ALL.to_vec(),
            special_weights: DEFAULT_SPECIAL_WEIGHTS.to_vec(),
            seed_special_chance: 1.0,
            refill_special_chance: 0.05,
            points_per_cell: 10,
            hint_penalty: 300,
            base_moves: 35,
            start_goal: 1000,
            level: 1,
            step_delay: Duration::from_millis(200),
            hint_wait: Duration::from_secs(1),
            move_freeze: Duration::from_secs(7),
            multiplier_duration: Duration::from_secs(6),
            freeze_tile_steps: 5,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("board must be at least 1x1, got {width}x{height}")]
    EmptyBoard { width: usize, height: usize },
    #[error("need at least {min} distinct symbols, got {0}", min = MIN_SYMBOLS)]
    TooFewSymbols(u8),
    #[error("at most {max} distinct symbols are supported, got {0}", max = MAX_SYMBOLS)]
    TooManySymbols(u8),
    #[error("special weight table has {weights} entries for {kinds} special kinds")]
    WeightTableTooShort { kinds: usize, weights: usize },
    #[error("spawn weight for {kind:?} must be finite and non-negative, got {weight}")]
    InvalidWeight { kind: SpecialKind, weight: f32 },
    #[error("{name} must be within 0..=1, got {value}")]
    ChanceOutOfRange { name: &'static str, value: f64 },
}

impl GameConfig {
    /// Rejects configurations the board core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyBoard {
                width: self.width,
                height: self.height,
            });
        }
        if self.symbol_count < MIN_SYMBOLS {
            return Err(ConfigError::TooFewSymbols(self.symbol_count));
        }
        if self.symbol_count > MAX_SYMBOLS {
            return Err(ConfigError::TooManySymbols(self.symbol_count));
        }
        if self.special_weights.len() < self.special_kinds.len() {
            return Err(ConfigError::WeightTableTooShort {
                kinds: self.special_kinds.len(),
                weights: self.special_weights.len(),
            });
        }
        for (&kind, &weight) in self.special_kinds.iter().zip(&self.special_weights) {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { kind, weight });
            }
        }
        for (name, value) in [
            ("seed_special_chance", self.seed_special_chance),
            ("refill_special_chance", self.refill_special_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ChanceOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Score needed to win the configured level.
    pub fn goal(&self) -> u32 {
        self.start_goal.saturating_mul(self.level)
    }

    /// Moves available in the configured level (never fewer than one).
    pub fn moves(&self) -> u32 {
        self.base_moves
            .saturating_sub(MOVES_PENALTY_PER_LEVEL.saturating_mul(self.level))
            .max(1)
    }
}
