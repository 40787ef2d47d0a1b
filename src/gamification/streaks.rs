//! Streak tracking
//!
//! A streak is the consecutive period with no logged junk-food incident,
//! measured in elapsed whole days since the last log. Every new log breaks
//! the streak by definition.

use serde::Serialize;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Derived streak standing for a user's log history.
///
/// "No logs yet" is distinguished from "0-day streak after a slip" so the
/// client can render them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStanding {
    /// User has never logged an incident
    NoLogs,
    /// Elapsed whole days since the most recent log
    Days(u32),
}

impl StreakStanding {
    pub fn days(&self) -> u32 {
        match self {
            Self::NoLogs => 0,
            Self::Days(n) => *n,
        }
    }
}

/// Compute the current streak from the most recent log timestamp.
///
/// Elapsed-time division, not calendar-day counting: a log 47 hours ago is a
/// 1-day streak. Fractional days truncate toward zero; a clock skew that puts
/// the last log in the future also truncates to zero.
pub fn current_streak(last_log_ms: Option<i64>, now_ms: i64) -> StreakStanding {
    match last_log_ms {
        None => StreakStanding::NoLogs,
        Some(last) => {
            let elapsed = (now_ms - last).max(0);
            StreakStanding::Days((elapsed / MS_PER_DAY) as u32)
        }
    }
}

/// Stored streak counters for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakCounters {
    pub current: u32,
    pub best: u32,
}

impl StreakCounters {
    /// Apply a new log event: the streak in flight is banked into `best`
    /// (if it is a record) and `current` resets to zero.
    pub fn record_log(self) -> StreakCounters {
        StreakCounters {
            current: 0,
            best: self.best.max(self.current),
        }
    }

    /// Explicit user check-in, independent of logging. Returns the updated
    /// counters and whether this set a new personal record.
    pub fn increment(self) -> (StreakCounters, bool) {
        let current = self.current + 1;
        let is_new_record = current > self.best;
        (
            StreakCounters {
                current,
                best: self.best.max(current),
            },
            is_new_record,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_logs_is_distinguished() {
        assert_eq!(current_streak(None, 1_000_000), StreakStanding::NoLogs);
        assert_eq!(current_streak(Some(1_000_000), 1_000_000), StreakStanding::Days(0));
    }

    #[test]
    fn test_elapsed_whole_days() {
        let last = 0i64;
        assert_eq!(current_streak(Some(last), MS_PER_DAY - 1), StreakStanding::Days(0));
        assert_eq!(current_streak(Some(last), MS_PER_DAY), StreakStanding::Days(1));
        assert_eq!(
            current_streak(Some(last), 7 * MS_PER_DAY + 12 * 60 * 60 * 1000),
            StreakStanding::Days(7)
        );
    }

    #[test]
    fn test_future_last_log_clamps_to_zero() {
        assert_eq!(current_streak(Some(MS_PER_DAY * 2), 0), StreakStanding::Days(0));
    }

    #[test]
    fn test_record_log_banks_best_and_resets() {
        // Scenario: current=7, best=7; a new log arrives
        let after = StreakCounters { current: 7, best: 7 }.record_log();
        assert_eq!(after, StreakCounters { current: 0, best: 7 });

        // A streak longer than best raises best when broken
        let after = StreakCounters { current: 9, best: 7 }.record_log();
        assert_eq!(after, StreakCounters { current: 0, best: 9 });
    }

    #[test]
    fn test_increment_reports_record() {
        let (s, record) = StreakCounters { current: 4, best: 4 }.increment();
        assert_eq!(s, StreakCounters { current: 5, best: 5 });
        assert!(record);

        let (s, record) = s.record_log().increment();
        assert_eq!(s, StreakCounters { current: 1, best: 5 });
        assert!(!record);
    }

    #[test]
    fn test_best_never_decreases() {
        let mut s = StreakCounters::default();
        let mut best_seen = 0;
        for step in 0..50 {
            s = if step % 7 == 0 {
                s.record_log()
            } else {
                s.increment().0
            };
            assert!(s.best >= best_seen);
            best_seen = s.best;
        }
    }
}
