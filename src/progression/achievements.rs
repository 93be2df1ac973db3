//! Achievement unlock rules.
//!
//! A fixed-order rule table evaluated against the post-update ledger state.
//! Evaluation is pure and deterministic: rules fire independently (several
//! can unlock on one event), an id already unlocked never fires again, and
//! simultaneous unlocks append in table order.

use std::collections::HashSet;

use crate::types::{Achievement, AchievementCategory};

/// Ledger state after the triggering event, as the rules see it.
pub struct RuleInput {
    pub total_points: i64,
    pub current_level: i64,
    /// Streak credited to the completion that triggered evaluation.
    pub latest_streak: i64,
}

struct AchievementRule {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    category: AchievementCategory,
    qualifies: fn(&RuleInput) -> bool,
}

// Streak rules use equality on purpose: a 7-day streak unlocks on the day it
// becomes 7; by day 8 the unlock already exists, so nothing re-fires.
const RULES: &[AchievementRule] = &[
    AchievementRule {
        id: "week_warrior",
        title: "Week Warrior",
        description: "Completed the same item seven days in a row.",
        icon: "flame",
        category: AchievementCategory::Streak,
        qualifies: |input| input.latest_streak == 7,
    },
    AchievementRule {
        id: "month_master",
        title: "Month Master",
        description: "Completed the same item thirty days in a row.",
        icon: "calendar",
        category: AchievementCategory::Streak,
        qualifies: |input| input.latest_streak == 30,
    },
    AchievementRule {
        id: "point_collector",
        title: "Point Collector",
        description: "Earned 500 lifetime points.",
        icon: "gem",
        category: AchievementCategory::Points,
        qualifies: |input| input.total_points >= 500,
    },
    AchievementRule {
        id: "ladder_climber",
        title: "Ladder Climber",
        description: "Reached level 5 on the ladder.",
        icon: "ladder",
        category: AchievementCategory::Milestone,
        qualifies: |input| input.current_level >= 5,
    },
];

/// Decide which achievements newly unlock for this event. `already_unlocked`
/// is the ledger's current set; `now` stamps the unlock time.
pub fn evaluate(
    already_unlocked: &HashSet<String>,
    input: &RuleInput,
    now: &str,
) -> Vec<Achievement> {
    RULES
        .iter()
        .filter(|rule| !already_unlocked.contains(rule.id))
        .filter(|rule| (rule.qualifies)(input))
        .map(|rule| Achievement {
            id: rule.id.to_string(),
            title: rule.title.to_string(),
            description: rule.description.to_string(),
            icon: rule.icon.to_string(),
            category: rule.category,
            unlocked_at: now.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-08-06T08:00:00Z";

    fn input(total: i64, level: i64, streak: i64) -> RuleInput {
        RuleInput {
            total_points: total,
            current_level: level,
            latest_streak: streak,
        }
    }

    #[test]
    fn test_nothing_unlocks_early() {
        let unlocked = evaluate(&HashSet::new(), &input(100, 1, 2), NOW);
        assert!(unlocked.is_empty());
    }

    #[test]
    fn test_week_warrior_exact_streak() {
        let unlocked = evaluate(&HashSet::new(), &input(100, 1, 7), NOW);
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "week_warrior");
        assert_eq!(unlocked[0].category, AchievementCategory::Streak);

        // Day 8 of the same run fires nothing new
        let already: HashSet<String> = ["week_warrior".to_string()].into_iter().collect();
        assert!(evaluate(&already, &input(115, 1, 8), NOW).is_empty());
    }

    #[test]
    fn test_point_collector_fires_once_at_crossing() {
        let first = evaluate(&HashSet::new(), &input(510, 4, 2), NOW);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "point_collector");

        let already: HashSet<String> = first.iter().map(|a| a.id.clone()).collect();
        let second = evaluate(&already, &input(530, 4, 3), NOW);
        assert!(second.is_empty(), "crossing 500 unlocks exactly once");
    }

    #[test]
    fn test_simultaneous_unlocks_in_table_order() {
        // 30-day streak and level 5 on the same event
        let unlocked = evaluate(&HashSet::new(), &input(800, 5, 30), NOW);
        let ids: Vec<&str> = unlocked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["month_master", "point_collector", "ladder_climber"]);
    }

    #[test]
    fn test_already_unlocked_are_filtered() {
        let already: HashSet<String> =
            ["point_collector".to_string(), "ladder_climber".to_string()]
                .into_iter()
                .collect();
        let unlocked = evaluate(&already, &input(1200, 6, 1), NOW);
        assert!(unlocked.is_empty());
    }

    #[test]
    fn test_unlock_carries_timestamp_and_metadata() {
        let unlocked = evaluate(&HashSet::new(), &input(0, 0, 7), NOW);
        let a = &unlocked[0];
        assert_eq!(a.unlocked_at, NOW);
        assert!(!a.title.is_empty());
        assert!(!a.description.is_empty());
        assert!(!a.icon.is_empty());
    }
}
