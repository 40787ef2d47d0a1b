//! XP and level system
//!
//! Maps the sum of unlocked-achievement XP onto a level ladder.

use serde::Serialize;

/// Level information computed from total XP. Never stored; recomputed from
/// the unlocked-achievement set whenever it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub current_xp: u32,
    pub xp_to_next_level: u32,
    pub total_xp: u32,
}

/// XP threshold for entering a given level.
///
/// `threshold(1)` is the entry value 100 used for the first comparison;
/// beyond that each level's threshold is the isolated value
/// `floor(100 * 1.2^(level-1))`, not a running total of per-level costs.
/// Levels therefore come faster than a cumulative ladder would give.
fn xp_for_level(level: u32) -> u32 {
    (100.0 * 1.2f64.powi(level as i32 - 1)).floor() as u32
}

impl LevelInfo {
    /// Compute level info for a total XP amount.
    ///
    /// Negative input cannot occur with unsigned XP, but callers holding raw
    /// sums should clamp with [`LevelInfo::from_raw_xp`]. Terminates in
    /// O(level) steps for any finite total.
    pub fn for_xp(total_xp: u32) -> LevelInfo {
        let mut level = 1u32;
        let mut floor = 0u32;
        let mut next = 100u32;

        while total_xp >= next {
            // The float-to-int cast saturates at u32::MAX; once the
            // threshold stops growing the ladder has run out of rungs.
            let after = xp_for_level(level + 1);
            if after <= next {
                break;
            }
            floor = next;
            level += 1;
            next = after;
        }

        LevelInfo {
            level,
            current_xp: total_xp - floor,
            xp_to_next_level: next - floor,
            total_xp,
        }
    }

    /// Compute level info from a raw (possibly negative) XP sum.
    /// Out-of-range totals are clamped to zero before the ladder walk.
    pub fn from_raw_xp(total_xp: i64) -> LevelInfo {
        Self::for_xp(total_xp.max(0).min(u32::MAX as i64) as u32)
    }

    /// Progress toward the next level as a fraction in 0.0..=1.0
    pub fn progress_to_next(&self) -> f32 {
        if self.xp_to_next_level == 0 {
            1.0
        } else {
            self.current_xp as f32 / self.xp_to_next_level as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_xp_is_level_one() {
        let info = LevelInfo::for_xp(0);
        assert_eq!(info.level, 1);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.xp_to_next_level, 100);
        assert_eq!(info.total_xp, 0);
    }

    #[test]
    fn test_ladder_walk_for_250_xp() {
        // Thresholds: 100, 120, 144, 172, 207, 248, 298
        let info = LevelInfo::for_xp(250);
        assert_eq!(info.level, 7);
        assert_eq!(info.current_xp, 2);
        assert_eq!(info.xp_to_next_level, 50);
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(xp_for_level(2), 120);
        assert_eq!(xp_for_level(3), 144);
        assert_eq!(xp_for_level(4), 172);
        assert_eq!(xp_for_level(5), 207);
        assert_eq!(xp_for_level(6), 248);
        assert_eq!(xp_for_level(7), 298);
    }

    #[test]
    fn test_level_monotonic_in_xp() {
        let mut last_level = 0;
        for xp in (0..5000).step_by(7) {
            let info = LevelInfo::for_xp(xp);
            assert!(info.level >= last_level);
            assert!(info.current_xp < info.xp_to_next_level);
            last_level = info.level;
        }
    }

    #[test]
    fn test_exact_threshold_advances() {
        // Reaching the entry value moves to level 2 with 0 XP into it
        let info = LevelInfo::for_xp(100);
        assert_eq!(info.level, 2);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.xp_to_next_level, 20); // 120 - 100
    }

    #[test]
    fn test_negative_xp_clamped() {
        let info = LevelInfo::from_raw_xp(-500);
        assert_eq!(info.level, 1);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.xp_to_next_level, 100);
    }

    #[test]
    fn test_ladder_terminates_at_saturated_threshold() {
        // Past ~level 97 the threshold cast saturates at u32::MAX, so the
        // walk must stop on the last real rung instead of spinning
        let info = LevelInfo::from_raw_xp(i64::MAX);
        assert_eq!(info.total_xp, u32::MAX);
        assert!(info.level > 90);
        assert!(info.xp_to_next_level > 0);
        assert_eq!(LevelInfo::for_xp(u32::MAX - 1).level, info.level);
    }

    #[test]
    fn test_progress_fraction() {
        let info = LevelInfo::for_xp(50);
        assert!((info.progress_to_next() - 0.5).abs() < 0.001);
    }
}
