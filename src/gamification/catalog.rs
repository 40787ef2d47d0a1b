//! Achievement catalog
//!
//! All badges are defined here with their metadata and XP rewards. The catalog
//! is immutable static data; per-user unlock state lives in the store and is
//! joined with these entries at read time.

use serde::Serialize;

/// Unique identifier for each achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementId {
    // Streak achievements
    FirstDay,
    ThreeDayStreak,
    WeekWarrior,
    MonthMaster,
    CenturyClub,

    // Milestone achievements
    FirstLog,
    TenLogs,
    HundredLogs,
    MoneySaver,
    CalorieConscious,

    // Social achievements
    FirstPost,
    SupportiveFriend,
    Inspiration,

    // Special achievements
    EarlyBird,
    NightOwl,
    WeekendWarrior,
    HolidayHero,

    // Challenge achievements
    NoSweetsWeek,
    NoFastFoodMonth,
    GuiltFreeWeek,
}

impl AchievementId {
    /// Get the string ID for database storage and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstDay => "first_day",
            Self::ThreeDayStreak => "three_day_streak",
            Self::WeekWarrior => "week_warrior",
            Self::MonthMaster => "month_master",
            Self::CenturyClub => "century_club",
            Self::FirstLog => "first_log",
            Self::TenLogs => "ten_logs",
            Self::HundredLogs => "hundred_logs",
            Self::MoneySaver => "money_saver",
            Self::CalorieConscious => "calorie_conscious",
            Self::FirstPost => "first_post",
            Self::SupportiveFriend => "supportive_friend",
            Self::Inspiration => "inspiration",
            Self::EarlyBird => "early_bird",
            Self::NightOwl => "night_owl",
            Self::WeekendWarrior => "weekend_warrior",
            Self::HolidayHero => "holiday_hero",
            Self::NoSweetsWeek => "no_sweets_week",
            Self::NoFastFoodMonth => "no_fast_food_month",
            Self::GuiltFreeWeek => "guilt_free_week",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "first_day" => Some(Self::FirstDay),
            "three_day_streak" => Some(Self::ThreeDayStreak),
            "week_warrior" => Some(Self::WeekWarrior),
            "month_master" => Some(Self::MonthMaster),
            "century_club" => Some(Self::CenturyClub),
            "first_log" => Some(Self::FirstLog),
            "ten_logs" => Some(Self::TenLogs),
            "hundred_logs" => Some(Self::HundredLogs),
            "money_saver" => Some(Self::MoneySaver),
            "calorie_conscious" => Some(Self::CalorieConscious),
            "first_post" => Some(Self::FirstPost),
            "supportive_friend" => Some(Self::SupportiveFriend),
            "inspiration" => Some(Self::Inspiration),
            "early_bird" => Some(Self::EarlyBird),
            "night_owl" => Some(Self::NightOwl),
            "weekend_warrior" => Some(Self::WeekendWarrior),
            "holiday_hero" => Some(Self::HolidayHero),
            "no_sweets_week" => Some(Self::NoSweetsWeek),
            "no_fast_food_month" => Some(Self::NoFastFoodMonth),
            "guilt_free_week" => Some(Self::GuiltFreeWeek),
            _ => None,
        }
    }

    /// Get all achievement IDs
    pub fn all() -> &'static [AchievementId] {
        &[
            Self::FirstDay,
            Self::ThreeDayStreak,
            Self::WeekWarrior,
            Self::MonthMaster,
            Self::CenturyClub,
            Self::FirstLog,
            Self::TenLogs,
            Self::HundredLogs,
            Self::MoneySaver,
            Self::CalorieConscious,
            Self::FirstPost,
            Self::SupportiveFriend,
            Self::Inspiration,
            Self::EarlyBird,
            Self::NightOwl,
            Self::WeekendWarrior,
            Self::HolidayHero,
            Self::NoSweetsWeek,
            Self::NoFastFoodMonth,
            Self::GuiltFreeWeek,
        ]
    }
}

/// Achievement category for grouping in the client UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    Streak,
    Milestone,
    Social,
    Special,
    Challenge,
}

impl AchievementKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Streak => "Streaks",
            Self::Milestone => "Milestones",
            Self::Social => "Community",
            Self::Special => "Special",
            Self::Challenge => "Challenges",
        }
    }
}

/// Badge rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Achievement definition with all metadata
#[derive(Debug, Clone)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub kind: AchievementKind,
    pub rarity: Rarity,
    pub xp_reward: u32,
    /// For progressive achievements, the target count shown in the UI
    pub max_progress: Option<u32>,
}

/// All achievement definitions
pub static ACHIEVEMENTS: &[Achievement] = &[
    // === STREAK ===
    Achievement {
        id: AchievementId::FirstDay,
        title: "First Step",
        description: "Complete your first day without junk food",
        icon: "footsteps",
        kind: AchievementKind::Streak,
        rarity: Rarity::Common,
        xp_reward: 10,
        max_progress: Some(1),
    },
    Achievement {
        id: AchievementId::ThreeDayStreak,
        title: "Getting Started",
        description: "Maintain a 3-day clean eating streak",
        icon: "trending-up",
        kind: AchievementKind::Streak,
        rarity: Rarity::Common,
        xp_reward: 25,
        max_progress: Some(3),
    },
    Achievement {
        id: AchievementId::WeekWarrior,
        title: "Week Warrior",
        description: "Complete a full week without junk food",
        icon: "calendar",
        kind: AchievementKind::Streak,
        rarity: Rarity::Rare,
        xp_reward: 50,
        max_progress: Some(7),
    },
    Achievement {
        id: AchievementId::MonthMaster,
        title: "Month Master",
        description: "Achieve a 30-day clean eating streak",
        icon: "trophy",
        kind: AchievementKind::Streak,
        rarity: Rarity::Epic,
        xp_reward: 200,
        max_progress: Some(30),
    },
    Achievement {
        id: AchievementId::CenturyClub,
        title: "Century Club",
        description: "Reach 100 days without junk food",
        icon: "diamond",
        kind: AchievementKind::Streak,
        rarity: Rarity::Legendary,
        xp_reward: 500,
        max_progress: Some(100),
    },
    // === MILESTONE ===
    Achievement {
        id: AchievementId::FirstLog,
        title: "Honest Logger",
        description: "Log your first junk food item",
        icon: "camera",
        kind: AchievementKind::Milestone,
        rarity: Rarity::Common,
        xp_reward: 5,
        max_progress: Some(1),
    },
    Achievement {
        id: AchievementId::TenLogs,
        title: "Transparency",
        description: "Log 10 junk food items",
        icon: "list",
        kind: AchievementKind::Milestone,
        rarity: Rarity::Common,
        xp_reward: 20,
        max_progress: Some(10),
    },
    Achievement {
        id: AchievementId::HundredLogs,
        title: "Self-Awareness",
        description: "Log 100 junk food items",
        icon: "analytics",
        kind: AchievementKind::Milestone,
        rarity: Rarity::Rare,
        xp_reward: 100,
        max_progress: Some(100),
    },
    Achievement {
        id: AchievementId::MoneySaver,
        title: "Money Saver",
        description: "Save $100 by avoiding junk food",
        icon: "wallet",
        kind: AchievementKind::Milestone,
        rarity: Rarity::Rare,
        xp_reward: 75,
        max_progress: Some(100),
    },
    Achievement {
        id: AchievementId::CalorieConscious,
        title: "Calorie Conscious",
        description: "Avoid 10,000 calories of junk food",
        icon: "fitness",
        kind: AchievementKind::Milestone,
        rarity: Rarity::Epic,
        xp_reward: 150,
        max_progress: Some(10000),
    },
    // === SOCIAL ===
    Achievement {
        id: AchievementId::FirstPost,
        title: "Community Member",
        description: "Share your first post in the community",
        icon: "people",
        kind: AchievementKind::Social,
        rarity: Rarity::Common,
        xp_reward: 15,
        max_progress: Some(1),
    },
    Achievement {
        id: AchievementId::SupportiveFriend,
        title: "Supportive Friend",
        description: "Like 10 community posts",
        icon: "heart",
        kind: AchievementKind::Social,
        rarity: Rarity::Common,
        xp_reward: 20,
        max_progress: Some(10),
    },
    Achievement {
        id: AchievementId::Inspiration,
        title: "Inspiration",
        description: "Get 10 likes on your community posts",
        icon: "star",
        kind: AchievementKind::Social,
        rarity: Rarity::Rare,
        xp_reward: 50,
        max_progress: Some(10),
    },
    // === SPECIAL ===
    Achievement {
        id: AchievementId::EarlyBird,
        title: "Early Bird",
        description: "Log junk food before 9 AM",
        icon: "sunny",
        kind: AchievementKind::Special,
        rarity: Rarity::Rare,
        xp_reward: 30,
        max_progress: None,
    },
    Achievement {
        id: AchievementId::NightOwl,
        title: "Night Owl",
        description: "Log junk food after 10 PM",
        icon: "moon",
        kind: AchievementKind::Special,
        rarity: Rarity::Rare,
        xp_reward: 30,
        max_progress: None,
    },
    Achievement {
        id: AchievementId::WeekendWarrior,
        title: "Weekend Warrior",
        description: "Maintain a streak through the weekend",
        icon: "calendar-outline",
        kind: AchievementKind::Special,
        rarity: Rarity::Epic,
        xp_reward: 75,
        max_progress: Some(1),
    },
    Achievement {
        id: AchievementId::HolidayHero,
        title: "Holiday Hero",
        description: "Stay clean during a major holiday",
        icon: "gift",
        kind: AchievementKind::Special,
        rarity: Rarity::Legendary,
        xp_reward: 200,
        max_progress: None,
    },
    // === CHALLENGE ===
    Achievement {
        id: AchievementId::NoSweetsWeek,
        title: "Sweet Freedom",
        description: "Go a week without any sweets",
        icon: "ice-cream",
        kind: AchievementKind::Challenge,
        rarity: Rarity::Rare,
        xp_reward: 100,
        max_progress: Some(7),
    },
    Achievement {
        id: AchievementId::NoFastFoodMonth,
        title: "Fast Food Free",
        description: "Avoid fast food for a month",
        icon: "restaurant",
        kind: AchievementKind::Challenge,
        rarity: Rarity::Epic,
        xp_reward: 150,
        max_progress: Some(30),
    },
    Achievement {
        id: AchievementId::GuiltFreeWeek,
        title: "Guilt Free",
        description: "Have a week with average guilt rating under 3",
        icon: "happy",
        kind: AchievementKind::Challenge,
        rarity: Rarity::Epic,
        xp_reward: 125,
        max_progress: Some(7),
    },
];

impl Achievement {
    /// Get achievement definition by ID
    pub fn get(id: AchievementId) -> &'static Achievement {
        ACHIEVEMENTS
            .iter()
            .find(|a| a.id == id)
            .expect("All achievements should be defined")
    }

    /// Get total number of achievements
    pub fn total_count() -> usize {
        ACHIEVEMENTS.len()
    }

    /// Get total possible XP from all achievements
    pub fn total_xp() -> u32 {
        ACHIEVEMENTS.iter().map(|a| a.xp_reward).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_all_ids() {
        for id in AchievementId::all() {
            let entry = Achievement::get(*id);
            assert_eq!(entry.id, *id);
        }
        assert_eq!(Achievement::total_count(), AchievementId::all().len());
    }

    #[test]
    fn test_id_string_roundtrip() {
        for id in AchievementId::all() {
            assert_eq!(AchievementId::from_str(id.as_str()), Some(*id));
        }
        assert_eq!(AchievementId::from_str("not_a_badge"), None);
    }
}
