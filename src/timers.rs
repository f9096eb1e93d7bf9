//! Timed effects: move freeze (clock tile), score multiplier, and the frozen tile zone.
//!
//! Wall-clock effects live in a kind → expiry map checked on every tick. The
//! frozen zone counts player moves instead of time. Starting an effect that is
//! already running replaces it.

use crate::grid::Coord;
use std::collections::HashMap;
use std::time::Duration;

/// Score factor while the multiplier runs.
pub const SCORE_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimedKind {
    /// Swaps do not use up moves.
    MoveFreeze,
    /// Refills score [`SCORE_MULTIPLIER`] times the usual points.
    ScoreMultiplier,
}

/// Cells frozen by a snowflake, released once the move counter drops to `thaw_at_moves`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeZone {
    pub cells: Vec<Coord>,
    pub thaw_at_moves: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TimedEffects {
    expiry: HashMap<TimedKind, Duration>,
    zone: Option<FreezeZone>,
}

impl TimedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `kind` at `now` for `duration`. Returns true if a running instance was replaced.
    pub fn start(&mut self, kind: TimedKind, now: Duration, duration: Duration) -> bool {
        let replaced = self.is_active(kind, now);
        self.expiry.insert(kind, now + duration);
        replaced
    }

    pub fn is_active(&self, kind: TimedKind, now: Duration) -> bool {
        self.expiry.get(&kind).is_some_and(|&end| now < end)
    }

    pub fn remaining(&self, kind: TimedKind, now: Duration) -> Option<Duration> {
        self.expiry
            .get(&kind)
            .and_then(|&end| end.checked_sub(now))
            .filter(|d| !d.is_zero())
    }

    /// Drops every effect whose expiry has passed and returns their kinds in a stable order.
    pub fn expire(&mut self, now: Duration) -> Vec<TimedKind> {
        let mut ended: Vec<TimedKind> = self
            .expiry
            .iter()
            .filter(|&(_, &end)| end <= now)
            .map(|(&kind, _)| kind)
            .collect();
        ended.sort_unstable();
        for kind in &ended {
            self.expiry.remove(kind);
        }
        ended
    }

    pub fn score_multiplier(&self, now: Duration) -> u32 {
        if self.is_active(TimedKind::ScoreMultiplier, now) {
            SCORE_MULTIPLIER
        } else {
            1
        }
    }

    /// Installs a new frozen zone, handing back the one it replaces.
    pub fn freeze(&mut self, zone: FreezeZone) -> Option<FreezeZone> {
        self.zone.replace(zone)
    }

    pub fn zone(&self) -> Option<&FreezeZone> {
        self.zone.as_ref()
    }

    /// Takes the frozen zone once the move counter has come down to its thaw point.
    pub fn thaw_due(&mut self, moves_left: u32) -> Option<FreezeZone> {
        if self.zone.as_ref()?.thaw_at_moves >= moves_left {
            self.zone.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_effect_runs_for_its_duration() {
        let mut t = TimedEffects::new();
        assert!(!t.start(TimedKind::ScoreMultiplier, secs(10), secs(6)));
        assert_eq!(t.score_multiplier(secs(10)), 2);
        assert_eq!(t.remaining(TimedKind::ScoreMultiplier, secs(12)), Some(secs(4)));
        assert_eq!(t.score_multiplier(secs(16)), 1);
        assert!(t.expire(secs(15)).is_empty());
        assert_eq!(t.expire(secs(16)), vec![TimedKind::ScoreMultiplier]);
        assert_eq!(t.remaining(TimedKind::ScoreMultiplier, secs(16)), None);
    }

    #[test]
    fn test_restart_replaces_running_instance() {
        let mut t = TimedEffects::new();
        t.start(TimedKind::MoveFreeze, secs(0), secs(7));
        assert!(t.start(TimedKind::MoveFreeze, secs(5), secs(7)));
        // the first instance would have ended at 7
        assert!(t.is_active(TimedKind::MoveFreeze, secs(8)));
        assert!(!t.is_active(TimedKind::MoveFreeze, secs(12)));
    }

    #[test]
    fn test_expire_order_is_stable() {
        let mut t = TimedEffects::new();
        t.start(TimedKind::ScoreMultiplier, secs(0), secs(1));
        t.start(TimedKind::MoveFreeze, secs(0), secs(1));
        assert_eq!(
            t.expire(secs(2)),
            vec![TimedKind::MoveFreeze, TimedKind::ScoreMultiplier]
        );
    }

    #[test]
    fn test_zone_thaws_at_move_count() {
        let mut t = TimedEffects::new();
        let zone = FreezeZone {
            cells: vec![Coord::new(1, 1)],
            thaw_at_moves: 15,
        };
        assert!(t.freeze(zone.clone()).is_none());
        assert!(t.thaw_due(16).is_none());
        assert_eq!(t.thaw_due(15), Some(zone));
        assert!(t.zone().is_none());
    }
}
