//! Game session: board, cascade, timed effects, hints, score, moves and outcome.

use crate::cascade::{CascadeContext, CascadeEngine, CascadeStep};
use crate::config::{ConfigError, GameConfig};
use crate::effects::SpecialTable;
use crate::events::BoardEvent;
use crate::generate;
use crate::grid::{Coord, Grid, SpecialKind};
use crate::hints::{self, Hint, HintTimer};
use crate::timers::{TimedEffects, TimedKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Won => "won",
            Self::Lost => "lost",
        })
    }
}

/// Why a swap request was refused. The board is untouched in every case.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SwapRejected {
    #[error("board is still cascading")]
    Busy,
    #[error("game is over")]
    GameOver,
    #[error("{0} is off the board")]
    OutOfBounds(Coord),
    #[error("{a} and {b} are not neighbours")]
    NotAdjacent { a: Coord, b: Coord },
    #[error("{0} is empty")]
    Empty(Coord),
    #[error("{0} is frozen")]
    Frozen(Coord),
    #[error("{a} and {b} hold the same tile")]
    Identical { a: Coord, b: Coord },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapReport {
    /// False while the clock tile's move freeze runs.
    pub move_consumed: bool,
    pub moves_left: u32,
}

/// One level in progress. Owns everything; callers drive it with `swap` and `tick`.
#[derive(Debug)]
pub struct GameState {
    config: GameConfig,
    specials: SpecialTable,
    grid: Grid,
    rng: StdRng,
    engine: CascadeEngine,
    timers: TimedEffects,
    hint_timer: HintTimer,
    /// Hints for the current idle board, highlighted once the idle wait passes.
    hints: Vec<Hint>,
    events: Vec<BoardEvent>,
    score: u32,
    moves_left: u32,
    goal: u32,
    /// Game clock, advanced only by `tick`.
    clock: Duration,
    /// Time banked toward the next cascade step.
    since_step: Duration,
    outcome: Option<Outcome>,
}

impl GameState {
    /// Validates `config` and generates the level's board from `seed`.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let specials = SpecialTable::from_config(&config);
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = generate::generate(&config, &specials, &mut rng);
        let mut game = Self::assemble(config, specials, grid, rng);
        game.hints = hints::find_hints(&game.grid);
        Ok(game)
    }

    /// Starts from a given board; its size overrides the configured one. Matches
    /// already on the board resolve on the first `tick` or `settle`.
    pub fn with_grid(mut config: GameConfig, grid: Grid, seed: u64) -> Result<Self, ConfigError> {
        config.width = grid.width();
        config.height = grid.height();
        config.validate()?;
        let specials = SpecialTable::from_config(&config);
        let rng = StdRng::seed_from_u64(seed);
        let mut game = Self::assemble(config, specials, grid, rng);
        game.engine.start();
        Ok(game)
    }

    fn assemble(config: GameConfig, specials: SpecialTable, grid: Grid, rng: StdRng) -> Self {
        let moves_left = config.moves();
        let goal = config.goal();
        info!(
            level = config.level,
            goal,
            moves = moves_left,
            width = grid.width(),
            height = grid.height(),
            "level started"
        );
        Self {
            hint_timer: HintTimer::new(config.hint_wait),
            specials,
            grid,
            rng,
            engine: CascadeEngine::new(),
            timers: TimedEffects::new(),
            hints: Vec::new(),
            events: Vec::new(),
            score: 0,
            moves_left,
            goal,
            clock: Duration::ZERO,
            since_step: Duration::ZERO,
            outcome: None,
            config,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn goal(&self) -> u32 {
        self.goal
    }

    pub fn level(&self) -> u32 {
        self.config.level
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn timers(&self) -> &TimedEffects {
        &self.timers
    }

    /// True while a cascade runs; swaps are refused until it settles.
    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    /// Hints computed when the board last went idle.
    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    /// Fresh hint scan of the current board.
    pub fn find_hints(&self) -> Vec<Hint> {
        hints::find_hints(&self.grid)
    }

    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Swaps two neighbouring tiles and starts the cascade. A swap that lines
    /// nothing up still stands and still costs a move.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<SwapReport, SwapRejected> {
        self.check_swap(a, b)?;
        self.grid.swap(a, b);
        for (from, to) in [(a, b), (b, a)] {
            if let Some(tile) = self.grid.tile(to) {
                self.events.push(BoardEvent::Moved { from, to, tile });
            }
        }

        let move_consumed = !self.timers.is_active(TimedKind::MoveFreeze, self.clock);
        if move_consumed {
            self.moves_left = self.moves_left.saturating_sub(1);
            self.events.push(BoardEvent::MovesChanged {
                delta: -1,
                remaining: self.moves_left,
            });
        }
        if let Some(zone) = self.timers.thaw_due(self.moves_left) {
            for &c in &zone.cells {
                self.grid.set_frozen(c, false);
            }
            debug!(cells = zone.cells.len(), "frozen zone thawed");
            self.events.push(BoardEvent::Thawed { cells: zone.cells });
        }

        self.hint_timer.reset();
        self.hints.clear();
        self.since_step = Duration::ZERO;
        self.engine.start();
        debug!(%a, %b, move_consumed, moves_left = self.moves_left, "swap");
        Ok(SwapReport {
            move_consumed,
            moves_left: self.moves_left,
        })
    }

    fn check_swap(&self, a: Coord, b: Coord) -> Result<(), SwapRejected> {
        if self.outcome.is_some() {
            return Err(SwapRejected::GameOver);
        }
        if self.engine.is_busy() {
            return Err(SwapRejected::Busy);
        }
        let (Some(ca), Some(cb)) = (self.grid.get(a), self.grid.get(b)) else {
            let off = if self.grid.contains(a) { b } else { a };
            return Err(SwapRejected::OutOfBounds(off));
        };
        if !a.is_adjacent(b) {
            return Err(SwapRejected::NotAdjacent { a, b });
        }
        for (at, cell) in [(a, ca), (b, cb)] {
            if cell.is_empty() {
                return Err(SwapRejected::Empty(at));
            }
            if cell.frozen {
                return Err(SwapRejected::Frozen(at));
            }
        }
        if ca.tile == cb.tile {
            return Err(SwapRejected::Identical { a, b });
        }
        Ok(())
    }

    /// Advances the game clock: ends expired effects, runs one cascade step per
    /// `step_delay`, and highlights hints after the idle wait.
    pub fn tick(&mut self, delta: Duration) {
        if self.outcome.is_some() {
            return;
        }
        self.clock += delta;
        for kind in self.timers.expire(self.clock) {
            debug!(?kind, "timed effect ended");
            self.events.push(BoardEvent::EffectEnded { kind });
        }

        if self.engine.is_busy() {
            self.since_step += delta;
            while self.engine.is_busy() && self.since_step >= self.config.step_delay {
                self.since_step -= self.config.step_delay;
                self.run_step();
            }
            return;
        }

        if self.hint_timer.tick(delta) {
            for hint in &self.hints {
                self.events.push(BoardEvent::Highlight {
                    group: hint.group.clone(),
                });
            }
        }
    }

    /// Runs the cascade to completion without waiting. Returns the steps that matched.
    pub fn settle(&mut self) -> Vec<CascadeStep> {
        let mut steps = Vec::new();
        while self.engine.is_busy() {
            if let Some(step) = self.run_step() {
                steps.push(step);
            }
        }
        steps
    }

    /// Shows the player a move at a score cost. `None` (and no charge) when the
    /// board is busy, the game is over, or no move exists.
    pub fn request_hint(&mut self) -> Option<Hint> {
        if self.outcome.is_some() || self.engine.is_busy() {
            return None;
        }
        let hint = hints::find_hints(&self.grid).into_iter().next()?;
        let charged = self.config.hint_penalty.min(self.score);
        if charged > 0 {
            self.score -= charged;
            self.events.push(BoardEvent::ScoreChanged {
                delta: -i64::from(charged),
                total: self.score,
            });
        }
        self.events.push(BoardEvent::Highlight {
            group: hint.group.clone(),
        });
        Some(hint)
    }

    /// One cascade iteration. Returns it if it matched.
    fn run_step(&mut self) -> Option<CascadeStep> {
        let mut ctx = CascadeContext {
            grid: &mut self.grid,
            rng: &mut self.rng,
            config: &self.config,
            specials: &self.specials,
            timers: &mut self.timers,
            now: self.clock,
            moves_left: self.moves_left,
        };
        let step = self.engine.step(&mut ctx).filter(|s| s.matched);
        if let Some(step) = &step {
            self.apply_step(step);
        }
        if !self.engine.is_busy() {
            self.on_idle();
        }
        step
    }

    fn apply_step(&mut self, step: &CascadeStep) {
        for &(at, tile) in &step.cleared {
            self.events.push(BoardEvent::Removed { at, tile });
        }
        for effect in &step.effects {
            if matches!(effect.kind, SpecialKind::AreaBomb | SpecialKind::CrossBomb) {
                self.events.push(BoardEvent::Explosion { at: effect.at });
            }
            if let Some(kind) = effect.timed {
                self.events.push(BoardEvent::EffectStarted {
                    kind,
                    at: self.clock,
                    duration: self.timers.remaining(kind, self.clock).unwrap_or_default(),
                });
            }
            if !effect.freeze.is_empty() {
                self.events.push(BoardEvent::Frozen {
                    cells: effect.freeze.clone(),
                });
            }
        }
        if !step.thawed.is_empty() {
            self.events.push(BoardEvent::Thawed {
                cells: step.thawed.clone(),
            });
        }
        for m in &step.moved {
            self.events.push(BoardEvent::Moved {
                from: m.from,
                to: m.to,
                tile: m.tile,
            });
        }
        for &(at, tile) in &step.added {
            self.events.push(BoardEvent::Added { at, tile });
        }
        if step.score_delta > 0 {
            self.score = self.score.saturating_add(step.score_delta);
            self.events.push(BoardEvent::ScoreChanged {
                delta: i64::from(step.score_delta),
                total: self.score,
            });
        }
        // tiles shifted: any pending hint is stale
        self.hint_timer.reset();
    }

    fn on_idle(&mut self) {
        self.since_step = Duration::ZERO;
        self.hints = hints::find_hints(&self.grid);
        self.hint_timer.reset();
        if self.hints.is_empty() {
            debug!("no moves left on the board");
        }
        self.check_outcome();
    }

    fn check_outcome(&mut self) {
        let outcome = if self.goal > 0 && self.score >= self.goal {
            Outcome::Won
        } else if self.moves_left == 0 {
            Outcome::Lost
        } else {
            return;
        };
        info!(
            %outcome,
            score = self.score,
            goal = self.goal,
            level = self.config.level,
            "game over"
        );
        self.outcome = Some(outcome);
        self.events.push(BoardEvent::GameOver { outcome });
    }
}
