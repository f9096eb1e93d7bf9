//! Cascade state machine: scan, clear, resolve specials, compact, refill, scan again.
//!
//! `Idle → Scanning → Clearing → EffectResolving → Compacting → Refilling → Scanning …`
//! until a scan finds nothing, which returns the engine to `Idle`. Each call to
//! [`CascadeEngine::advance`] performs one transition so a caller can space the
//! phases out over time; [`CascadeEngine::step`] runs a whole iteration.

use crate::config::GameConfig;
use crate::effects::{EffectOutcome, EffectTable, SpecialTable};
use crate::generate;
use crate::grid::{Coord, Grid, SpecialKind, Tile, TileMove};
use crate::scanner::{self, MatchGroup};
use crate::timers::{FreezeZone, TimedEffects, TimedKind};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Scanning,
    Clearing,
    EffectResolving,
    Compacting,
    Refilling,
}

/// Everything one iteration of the cascade did, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeStep {
    pub groups: Vec<MatchGroup>,
    pub cleared: Vec<(Coord, Tile)>,
    pub effects: Vec<EffectOutcome>,
    /// Cells released because a new frozen zone replaced an older one.
    pub thawed: Vec<Coord>,
    pub moved: Vec<TileMove>,
    pub added: Vec<(Coord, Tile)>,
    pub score_delta: u32,
    /// False for the final scan that found nothing.
    pub matched: bool,
}

/// Board state the engine works on for one transition.
pub struct CascadeContext<'a, R: Rng> {
    pub grid: &'a mut Grid,
    pub rng: &'a mut R,
    pub config: &'a GameConfig,
    pub specials: &'a SpecialTable,
    pub timers: &'a mut TimedEffects,
    /// Game clock.
    pub now: Duration,
    pub moves_left: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CascadeEngine {
    phase: Phase,
    effects: EffectTable,
    pending: Vec<Coord>,
    specials: VecDeque<(Coord, SpecialKind)>,
    vacated: Vec<Coord>,
    step: CascadeStep,
    steps_taken: usize,
}

impl CascadeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Anything but `Idle`: the board is changing and must not take input.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Matched iterations since the last `start`.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Schedules a scan. No-op while a cascade is already running.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Scanning;
            self.steps_taken = 0;
        }
    }

    /// Performs one phase transition. Returns the finished step after `Refilling`,
    /// or an unmatched step when the scan finds nothing and the engine goes idle.
    pub fn advance<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) -> Option<CascadeStep> {
        match self.phase {
            Phase::Idle => None,
            Phase::Scanning => self.scan(ctx),
            Phase::Clearing => {
                for at in std::mem::take(&mut self.pending) {
                    self.clear_cell(ctx.grid, at);
                }
                self.phase = Phase::EffectResolving;
                None
            }
            Phase::EffectResolving => {
                self.resolve_specials(ctx);
                self.phase = Phase::Compacting;
                None
            }
            Phase::Compacting => {
                for x in 0..ctx.grid.width() {
                    let column = ctx.grid.compact_column(x);
                    self.step.moved.extend(column.moves);
                    self.vacated.extend(column.vacated);
                }
                self.phase = Phase::Refilling;
                None
            }
            Phase::Refilling => Some(self.refill(ctx)),
        }
    }

    /// Runs transitions until the current iteration finishes.
    pub fn step<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) -> Option<CascadeStep> {
        while self.is_busy() {
            if let Some(step) = self.advance(ctx) {
                return Some(step);
            }
        }
        None
    }

    /// Starts (if idle) and runs the cascade to completion, returning the matched steps.
    pub fn run_to_idle<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) -> Vec<CascadeStep> {
        self.start();
        let mut steps = Vec::new();
        while let Some(step) = self.step(ctx) {
            if step.matched {
                steps.push(step);
            }
        }
        steps
    }

    fn scan<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) -> Option<CascadeStep> {
        let scan = scanner::scan(&*ctx.grid);
        if scan.is_empty() {
            self.phase = Phase::Idle;
            return Some(CascadeStep::default());
        }
        if self.steps_taken >= ctx.grid.area() {
            warn!(
                steps = self.steps_taken,
                "cascade did not settle, stopping"
            );
            self.phase = Phase::Idle;
            return Some(CascadeStep::default());
        }
        self.pending = scan.cells();
        self.step = CascadeStep {
            groups: scan.groups,
            matched: true,
            ..CascadeStep::default()
        };
        self.phase = Phase::Clearing;
        None
    }

    /// Empties one cell unless it is frozen; queues its effect if it was special.
    fn clear_cell(&mut self, grid: &mut Grid, at: Coord) {
        if grid[at].frozen {
            return;
        }
        if let Some(tile) = grid.take(at) {
            self.step.cleared.push((at, tile));
            if let Tile::Special(kind) = tile {
                self.specials.push_back((at, kind));
            }
        }
    }

    /// Applies special effects; cells they clear may hold more specials, which resolve too.
    fn resolve_specials<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) {
        while let Some((at, kind)) = self.specials.pop_front() {
            let outcome = self.effects.resolve(kind, ctx.grid, at);
            for &c in &outcome.clears {
                self.clear_cell(ctx.grid, c);
            }
            if let Some(timed) = outcome.timed {
                let duration = match timed {
                    TimedKind::MoveFreeze => ctx.config.move_freeze,
                    TimedKind::ScoreMultiplier => ctx.config.multiplier_duration,
                };
                ctx.timers.start(timed, ctx.now, duration);
            }
            if !outcome.freeze.is_empty() {
                self.freeze(ctx, &outcome.freeze);
            }
            debug!(?kind, %at, cleared = outcome.clears.len(), "special resolved");
            self.step.effects.push(outcome);
        }
    }

    fn freeze<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>, cells: &[Coord]) {
        let zone = FreezeZone {
            cells: cells.to_vec(),
            thaw_at_moves: ctx.moves_left.saturating_sub(ctx.config.freeze_tile_steps),
        };
        if let Some(old) = ctx.timers.freeze(zone) {
            for c in old.cells.into_iter().filter(|c| !cells.contains(c)) {
                ctx.grid.set_frozen(c, false);
                self.step.thawed.push(c);
            }
        }
        for &c in cells {
            ctx.grid.set_frozen(c, true);
        }
    }

    fn refill<R: Rng>(&mut self, ctx: &mut CascadeContext<'_, R>) -> CascadeStep {
        let mut vacated = std::mem::take(&mut self.vacated);
        // bottom row first so each new tile sees the ones placed below and beside it
        vacated.sort_unstable_by_key(|c| (c.y, c.x));
        for at in vacated {
            let tile = generate::refill_tile(ctx.grid, at, ctx.config, ctx.specials, ctx.rng);
            ctx.grid.set_tile(at, Some(tile));
            self.step.added.push((at, tile));
        }

        let refilled = self.step.added.len() as u32;
        let multiplier = ctx.timers.score_multiplier(ctx.now);
        self.step.score_delta = refilled
            .saturating_mul(ctx.config.points_per_cell)
            .saturating_mul(multiplier);
        self.steps_taken += 1;
        self.phase = Phase::Scanning;

        let step = std::mem::take(&mut self.step);
        debug!(
            iteration = self.steps_taken,
            groups = step.groups.len(),
            cleared = step.cleared.len(),
            refilled,
            score = step.score_delta,
            "cascade step"
        );
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        grid: Grid,
        rng: StdRng,
        config: GameConfig,
        specials: SpecialTable,
        timers: TimedEffects,
        now: Duration,
        moves_left: u32,
    }

    impl Fixture {
        fn new(layout: &str) -> Self {
            let grid = Grid::parse(layout).unwrap();
            let config = GameConfig {
                width: grid.width(),
                height: grid.height(),
                symbol_count: 6,
                refill_special_chance: 0.0,
                ..GameConfig::default()
            };
            Self {
                specials: SpecialTable::from_config(&config),
                grid,
                rng: StdRng::seed_from_u64(42),
                config,
                timers: TimedEffects::new(),
                now: Duration::ZERO,
                moves_left: 20,
            }
        }

        fn ctx(&mut self) -> CascadeContext<'_, StdRng> {
            CascadeContext {
                grid: &mut self.grid,
                rng: &mut self.rng,
                config: &self.config,
                specials: &self.specials,
                timers: &mut self.timers,
                now: self.now,
                moves_left: self.moves_left,
            }
        }
    }

    #[test]
    fn test_phases_in_order() {
        let mut f = Fixture::new("BCD\nAAA\n");
        let mut engine = CascadeEngine::new();
        engine.start();
        let mut seen = vec![engine.phase()];
        let mut ctx = f.ctx();
        while engine.advance(&mut ctx).is_none() {
            seen.push(engine.phase());
        }
        assert_eq!(
            seen,
            vec![
                Phase::Scanning,
                Phase::Clearing,
                Phase::EffectResolving,
                Phase::Compacting,
                Phase::Refilling,
            ]
        );
        assert_eq!(engine.phase(), Phase::Scanning);
    }

    #[test]
    fn test_idle_board_stays_idle() {
        let mut f = Fixture::new("AB\nBA\n");
        let mut engine = CascadeEngine::new();
        let steps = engine.run_to_idle(&mut f.ctx());
        assert!(steps.is_empty());
        assert!(!engine.is_busy());
    }

    #[test]
    fn test_clear_compact_refill() {
        // bottom row clears, the row above falls, the top row refills
        let mut f = Fixture::new("BCD\nAAA\n");
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert!(step.matched);
        assert_eq!(step.cleared.len(), 3);
        assert_eq!(step.moved.len(), 3);
        assert_eq!(step.added.len(), 3);
        assert!(step.added.iter().all(|(c, _)| c.y == 1));
        assert_eq!(f.grid.tile(Coord::new(0, 0)), Some(Tile::Plain(1)));
        assert!(f.grid.coords().all(|c| f.grid.tile(c).is_some()));
    }

    #[test]
    fn test_score_is_refilled_cells_times_points() {
        let mut f = Fixture::new("BCDB\nAAAA\n");
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert_eq!(step.score_delta, 4 * f.config.points_per_cell);
    }

    #[test]
    fn test_multiplier_doubles_refill_score() {
        let mut f = Fixture::new("BCD\nAAA\n");
        f.timers.start(TimedKind::ScoreMultiplier, Duration::ZERO, Duration::from_secs(6));
        f.now = Duration::from_secs(1);
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert_eq!(step.score_delta, 3 * f.config.points_per_cell * 2);
    }

    #[test]
    fn test_area_bomb_at_run_edge() {
        // run of A at y=2 with the bomb just past its right end
        let layout = "\
            CDEFG\n\
            DEFGC\n\
            AAA*D\n\
            EFGCD\n\
            FGCDE\n";
        let mut f = Fixture::new(layout);
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        let cleared: Vec<Coord> = step.cleared.iter().map(|&(c, _)| c).collect();
        // run (3) + bomb + its up/down/right neighbours; the left neighbour was in the run
        assert_eq!(cleared.len(), 7);
        for c in [Coord::new(3, 3), Coord::new(3, 1), Coord::new(4, 2)] {
            assert!(cleared.contains(&c), "{c} not cleared");
        }
        assert_eq!(step.effects.len(), 1);
        assert_eq!(step.effects[0].kind, SpecialKind::AreaBomb);
    }

    #[test]
    fn test_special_below_run_is_not_triggered() {
        let layout = "\
            DEF\n\
            EFD\n\
            AAA\n\
            +@D\n";
        let mut f = Fixture::new(layout);
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert!(step.effects.is_empty());
        assert_eq!(step.cleared.len(), 3);
    }

    #[test]
    fn test_chained_specials_resolve_once_each() {
        // the cross bomb ends the run; its column sweep reaches the clock above it
        let layout = "\
            @EFD\n\
            +AAA\n";
        let mut f = Fixture::new(layout);
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        let kinds: Vec<SpecialKind> = step.effects.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SpecialKind::CrossBomb, SpecialKind::Clock]);
        assert!(f.timers.is_active(TimedKind::MoveFreeze, Duration::ZERO));
    }

    #[test]
    fn test_frozen_cells_survive_bombs() {
        let layout = "\
            DEFD\n\
            +AAA\n";
        let mut f = Fixture::new(layout);
        f.grid.set_frozen(Coord::new(0, 1), true);
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert!(!step.cleared.iter().any(|&(c, _)| c == Coord::new(0, 1)));
        assert_eq!(f.grid.tile(Coord::new(0, 1)), Some(Tile::Plain(3)));
    }

    #[test]
    fn test_refill_under_frozen_tile_differs_from_it() {
        // bottom row clears; (1,1) empties under the frozen A at (1,2)
        let layout = "\
            DAE\n\
            CBD\n\
            FFF\n";
        for seed in 0..200 {
            let mut f = Fixture::new(layout);
            f.rng = StdRng::seed_from_u64(seed);
            f.grid.set_frozen(Coord::new(1, 2), true);
            let mut engine = CascadeEngine::new();
            engine.start();
            let step = engine.step(&mut f.ctx()).unwrap();
            let added = step
                .added
                .iter()
                .find(|&&(c, _)| c == Coord::new(1, 1))
                .map(|&(_, t)| t);
            assert!(added.is_some(), "seed {seed}");
            assert_ne!(added, Some(Tile::Plain(0)), "seed {seed}");
        }
    }

    #[test]
    fn test_snowflake_freezes_zone_with_move_budget() {
        let layout = "\
            DEFDE\n\
            EFDEF\n\
            AAA#D\n";
        let mut f = Fixture::new(layout);
        f.moves_left = 12;
        let mut engine = CascadeEngine::new();
        engine.start();
        let step = engine.step(&mut f.ctx()).unwrap();
        assert_eq!(step.effects[0].kind, SpecialKind::Freeze);
        let zone = f.timers.zone().expect("zone installed");
        assert_eq!(zone.thaw_at_moves, 12 - f.config.freeze_tile_steps);
        assert!(zone.cells.iter().all(|&c| f.grid[c].frozen));
    }

    #[test]
    fn test_every_legal_swap_settles_within_area() {
        for seed in 0..40 {
            let config = GameConfig {
                width: 6,
                height: 6,
                symbol_count: 4,
                refill_special_chance: 0.1,
                ..GameConfig::default()
            };
            let specials = SpecialTable::from_config(&config);
            let mut rng = StdRng::seed_from_u64(seed);
            let start = generate::generate(&config, &specials, &mut rng);
            for hint in hints::find_hints(&start).into_iter().take(5) {
                let mut grid = start.clone();
                let (a, b) = hint.swap;
                grid.swap(a, b);
                let mut timers = TimedEffects::new();
                let mut engine = CascadeEngine::new();
                let mut ctx = CascadeContext {
                    grid: &mut grid,
                    rng: &mut rng,
                    config: &config,
                    specials: &specials,
                    timers: &mut timers,
                    now: Duration::ZERO,
                    moves_left: 30,
                };
                let steps = engine.run_to_idle(&mut ctx);
                assert!(!steps.is_empty());
                assert!(steps.len() <= config.width * config.height);
                assert!(!engine.is_busy());
                assert!(scanner::scan(&grid).is_empty() || engine.steps_taken() >= grid.area());
            }
        }
    }
}
