//! The progression engine.
//!
//! Turns a completion event into point awards, streak accounting, level
//! transitions, and achievement unlocks, while holding two invariants:
//! at most one completion per recurring item per local calendar day (one
//! ever for goals), and `current_level == level_for(total_points)` after
//! every operation.
//!
//! Writes for a user are serialized through a per-user lock and applied
//! inside one SQLite transaction, with point mutations expressed as atomic
//! increments. Undo is a point correction, not time travel: it returns the
//! event's points and deletes the row, but never rewinds streaks or
//! achievements.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::db::{DbCompletion, TrackerDb};
use crate::error::EngineError;
use crate::types::{Config, CompletionOutcome, LedgerSnapshot, UndoOutcome};
use crate::util::{day_bounds, fmt_ts, local_date};

pub mod achievements;
pub mod points;
pub mod streak;

pub struct ProgressionEngine {
    db: TrackerDb,
    timezone: Tz,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProgressionEngine {
    /// Engine over a store, bucketing days in UTC.
    pub fn new(db: TrackerDb) -> Self {
        Self::with_timezone(db, chrono_tz::Tz::UTC)
    }

    /// Engine bucketing calendar days in the given zone.
    pub fn with_timezone(db: TrackerDb, timezone: Tz) -> Self {
        Self {
            db,
            timezone,
            user_locks: DashMap::new(),
        }
    }

    pub fn from_config(db: TrackerDb, config: &Config) -> Self {
        Self::with_timezone(db, config.resolved_timezone())
    }

    /// Borrow the underlying store (item lifecycle services, ad-hoc reads).
    pub fn db(&self) -> &TrackerDb {
        &self.db
    }

    fn lock_user(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load_snapshot(db: &TrackerDb, user_id: &str) -> Result<LedgerSnapshot, EngineError> {
        let ledger = db
            .get_ledger(user_id)?
            .ok_or_else(|| EngineError::NotFound(format!("ledger for user {}", user_id)))?;
        let achievements = db.achievements_for_user(user_id)?;
        Ok(LedgerSnapshot::from_row(ledger, achievements))
    }

    /// Record a completion for now.
    pub fn complete_item(
        &self,
        user_id: &str,
        item_id: &str,
        notes: Option<&str>,
    ) -> Result<CompletionOutcome, EngineError> {
        self.complete_item_at(user_id, item_id, Utc::now(), notes)
    }

    /// Record a completion at an explicit instant. Used by tests and by
    /// backdated imports; `complete_item` is the everyday entry point.
    ///
    /// Checks precede every mutation: item existence, ownership, visibility,
    /// then the idempotence guard. Only then does the write transaction run.
    pub fn complete_item_at(
        &self,
        user_id: &str,
        item_id: &str,
        when: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<CompletionOutcome, EngineError> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        let item = self
            .db
            .get_item(item_id)?
            .ok_or_else(|| EngineError::NotFound(format!("item {}", item_id)))?;
        if item.user_id != user_id {
            return Err(EngineError::Forbidden {
                resource: format!("item {}", item_id),
                user_id: user_id.to_string(),
            });
        }
        // Soft-disabled items are hidden from every view; completing one is
        // indistinguishable from completing a missing item at this boundary.
        if item.archived || !item.is_active {
            return Err(EngineError::NotFound(format!("item {}", item_id)));
        }

        let day = local_date(when, self.timezone);
        let (day_start, day_end) = day_bounds(day, self.timezone);

        if item.is_recurring {
            if self
                .db
                .completion_exists_in_window(user_id, item_id, &day_start, &day_end)?
            {
                return Err(EngineError::AlreadyCompletedToday(item_id.to_string()));
            }
        } else if self.db.any_completion_exists(user_id, item_id)? {
            return Err(EngineError::AlreadyCompleted(item_id.to_string()));
        }

        let streak_len = streak::compute_streak(&self.db, user_id, item_id, day, self.timezone)?;
        let award = points::compute_award(item.point_value, streak_len);
        let now = fmt_ts(when);

        let completion = DbCompletion {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            completed_at: now.clone(),
            points_awarded: award,
            streak_at_completion: streak_len,
            notes: notes.map(|n| n.to_string()),
        };

        let (ledger, new_achievements) = self.db.with_transaction(|db| {
            db.insert_completion(&completion)?;

            db.get_or_create_ledger(user_id, &now)?;
            db.apply_award(user_id, award, &now)?;
            db.fold_streak(user_id, streak_len, &now)?;

            let total = db.total_points(user_id)?;
            let level = points::level_for(total);
            db.set_level(user_id, level, &now)?;

            if item.is_recurring {
                let reset = db.reset_repetitive_subtasks(item_id, &now)?;
                if reset > 0 {
                    log::debug!("reset {} repetitive subtasks of {}", reset, item_id);
                }
            }

            let already = db.achievement_ids(user_id)?;
            let input = achievements::RuleInput {
                total_points: total,
                current_level: level,
                latest_streak: streak_len,
            };
            let unlocks = achievements::evaluate(&already, &input, &now);
            if !unlocks.is_empty() {
                db.insert_achievements(user_id, &unlocks)?;
            }

            let ledger = Self::load_snapshot(db, user_id)?;
            Ok::<_, EngineError>((ledger, unlocks))
        })?;

        log::info!(
            "completion: user={} item={} streak={} award={} level={}",
            user_id,
            item_id,
            streak_len,
            award,
            ledger.current_level,
        );

        Ok(CompletionOutcome {
            completion,
            ledger,
            new_achievements,
        })
    }

    /// Undo the completion on the given local calendar day (default today):
    /// return its points (floored at zero), recompute the level, delete the
    /// event. Streaks and achievements keep their post-complete values.
    pub fn undo_completion(
        &self,
        user_id: &str,
        item_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<UndoOutcome, EngineError> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        let item = self
            .db
            .get_item(item_id)?
            .ok_or_else(|| EngineError::NotFound(format!("item {}", item_id)))?;
        if item.user_id != user_id {
            return Err(EngineError::Forbidden {
                resource: format!("item {}", item_id),
                user_id: user_id.to_string(),
            });
        }

        let day = date.unwrap_or_else(|| local_date(Utc::now(), self.timezone));
        let (day_start, day_end) = day_bounds(day, self.timezone);

        let completion = self
            .db
            .latest_completion_in_window(user_id, item_id, &day_start, &day_end)?
            .ok_or_else(|| EngineError::NothingToUndo(item_id.to_string()))?;

        let now = fmt_ts(Utc::now());

        let ledger = self.db.with_transaction(|db| {
            db.get_or_create_ledger(user_id, &now)?;
            db.deduct_points(user_id, completion.points_awarded, &now)?;

            let total = db.total_points(user_id)?;
            db.set_level(user_id, points::level_for(total), &now)?;

            db.delete_completion(&completion.id)?;

            Self::load_snapshot(db, user_id)
        })?;

        log::info!(
            "undo: user={} item={} returned {} points",
            user_id,
            item_id,
            completion.points_awarded,
        );

        Ok(UndoOutcome { ledger })
    }

    /// Read view of a user's ledger.
    pub fn get_ledger(&self, user_id: &str) -> Result<LedgerSnapshot, EngineError> {
        Self::load_snapshot(&self.db, user_id)
    }

    /// Weekly boundary hook for one user. The boundary job itself lives
    /// outside the engine.
    pub fn reset_weekly_points(&self, user_id: &str) -> Result<(), EngineError> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        self.db.reset_weekly_points(user_id, &fmt_ts(Utc::now()))?;
        Ok(())
    }

    /// Weekly boundary hook for every ledger at once.
    pub fn reset_all_weekly_points(&self) -> Result<usize, EngineError> {
        let touched = self.db.reset_all_weekly_points(&fmt_ts(Utc::now()))?;
        if touched > 0 {
            log::info!("weekly reset: cleared {} ledgers", touched);
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::DbItem;

    fn test_engine() -> ProgressionEngine {
        ProgressionEngine::new(test_db())
    }

    fn seed_item(engine: &ProgressionEngine, id: &str, user_id: &str, recurring: bool) {
        engine
            .db()
            .insert_item(&DbItem {
                id: id.to_string(),
                user_id: user_id.to_string(),
                title: "Morning run".to_string(),
                intensity: "hard".to_string(),
                point_value: 20,
                is_recurring: recurring,
                is_active: true,
                archived: false,
                created_at: "2026-02-01T12:00:00Z".to_string(),
                updated_at: "2026-02-01T12:00:00Z".to_string(),
            })
            .unwrap();
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_five_day_scenario_hard_item() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        let expected = [
            // (streak, award, total, level)
            (1, 20, 20, 0),
            (2, 20, 40, 0),
            (3, 24, 64, 1),
            (4, 24, 88, 1),
            (5, 24, 112, 1),
        ];

        for (day, (streak, award, total, level)) in (1..=5).zip(expected) {
            let outcome = engine.complete_item_at("u1", "i1", at(day), None).unwrap();
            assert_eq!(outcome.completion.streak_at_completion, streak, "day {}", day);
            assert_eq!(outcome.completion.points_awarded, award, "day {}", day);
            assert_eq!(outcome.ledger.total_points, total, "day {}", day);
            assert_eq!(outcome.ledger.current_level, level, "day {}", day);
            assert!(outcome.new_achievements.is_empty());
        }

        let ledger = engine.get_ledger("u1").unwrap();
        assert_eq!(ledger.current_streak, 5);
        assert_eq!(ledger.longest_streak, 5);
        assert_eq!(ledger.level_title, "Starter");
    }

    #[test]
    fn test_same_day_completion_is_rejected_without_mutation() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        engine.complete_item_at("u1", "i1", at(1), None).unwrap();
        let before = engine.get_ledger("u1").unwrap();

        let second = engine.complete_item_at("u1", "i1", at(1), None);
        assert!(matches!(
            second,
            Err(EngineError::AlreadyCompletedToday(_))
        ));

        let after = engine.get_ledger("u1").unwrap();
        assert_eq!(after.total_points, before.total_points);
        assert_eq!(after.weekly_points, before.weekly_points);
        assert_eq!(after.current_streak, before.current_streak);
    }

    #[test]
    fn test_goal_completes_once_ever() {
        let engine = test_engine();
        seed_item(&engine, "g1", "u1", false);

        let outcome = engine.complete_item_at("u1", "g1", at(1), None).unwrap();
        // A goal's per-item streak is 1, so the award is the raw point value
        assert_eq!(outcome.completion.points_awarded, 20);

        let next_day = engine.complete_item_at("u1", "g1", at(2), None);
        assert!(matches!(next_day, Err(EngineError::AlreadyCompleted(_))));
    }

    #[test]
    fn test_ownership_is_enforced() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        let result = engine.complete_item_at("u2", "i1", at(1), None);
        assert!(matches!(result, Err(EngineError::Forbidden { .. })));
    }

    #[test]
    fn test_missing_and_inactive_items_are_not_found() {
        let engine = test_engine();
        assert!(matches!(
            engine.complete_item_at("u1", "ghost", at(1), None),
            Err(EngineError::NotFound(_))
        ));

        seed_item(&engine, "i1", "u1", true);
        engine
            .db()
            .set_item_active("i1", false, "2026-03-01T00:00:00Z")
            .unwrap();
        assert!(matches!(
            engine.complete_item_at("u1", "i1", at(1), None),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_undo_is_exact_point_inverse_but_keeps_streaks() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        engine.complete_item_at("u1", "i1", at(1), None).unwrap();
        engine.complete_item_at("u1", "i1", at(2), None).unwrap();
        let day3 = engine.complete_item_at("u1", "i1", at(3), None).unwrap();
        assert_eq!(day3.ledger.total_points, 64);

        let undone = engine
            .undo_completion("u1", "i1", Some(at(3).date_naive()))
            .unwrap();
        assert_eq!(undone.ledger.total_points, 40, "day-3 award returned");
        assert_eq!(undone.ledger.weekly_points, 40);
        assert_eq!(undone.ledger.current_level, 0, "level recomputed from 40");
        assert_eq!(
            undone.ledger.current_streak, 3,
            "undo never rewinds streaks"
        );

        // The event row is gone, so a second undo has nothing to target
        let again = engine.undo_completion("u1", "i1", Some(at(3).date_naive()));
        assert!(matches!(again, Err(EngineError::NothingToUndo(_))));

        // And the day is completable again
        let redo = engine.complete_item_at("u1", "i1", at(3), None).unwrap();
        assert_eq!(redo.completion.streak_at_completion, 3);
        assert_eq!(redo.ledger.total_points, 64);
    }

    #[test]
    fn test_week_warrior_unlocks_exactly_on_day_seven() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        for day in 1..=6 {
            let outcome = engine.complete_item_at("u1", "i1", at(day), None).unwrap();
            assert!(outcome.new_achievements.is_empty(), "day {}", day);
        }

        let day7 = engine.complete_item_at("u1", "i1", at(7), None).unwrap();
        let ids: Vec<&str> = day7
            .new_achievements
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["week_warrior"]);

        let day8 = engine.complete_item_at("u1", "i1", at(8), None).unwrap();
        assert!(day8.new_achievements.is_empty(), "no re-unlock on day 8");

        let ledger = engine.get_ledger("u1").unwrap();
        assert_eq!(ledger.achievements.len(), 1);

        // Undoing the unlocking day gives back its points but the unlock stays
        let undone = engine
            .undo_completion("u1", "i1", Some(at(7).date_naive()))
            .unwrap();
        assert_eq!(undone.ledger.achievements.len(), 1);
        assert_eq!(undone.ledger.achievements[0].id, "week_warrior");
    }

    #[test]
    fn test_point_collector_fires_once_at_crossing() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        // Ledger already near the threshold from earlier activity
        engine
            .db()
            .get_or_create_ledger("u1", "2026-02-01T12:00:00Z")
            .unwrap();
        engine
            .db()
            .apply_award("u1", 490, "2026-02-01T12:00:00Z")
            .unwrap();

        let crossing = engine.complete_item_at("u1", "i1", at(1), None).unwrap();
        assert_eq!(crossing.ledger.total_points, 510);
        let ids: Vec<&str> = crossing
            .new_achievements
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert!(ids.contains(&"point_collector"));

        let after = engine.complete_item_at("u1", "i1", at(2), None).unwrap();
        assert!(
            !after
                .new_achievements
                .iter()
                .any(|a| a.id == "point_collector"),
            "crossing 500 unlocks exactly once"
        );
    }

    #[test]
    fn test_completion_resets_repetitive_subtasks() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);
        engine
            .db()
            .insert_subtask(&crate::db::DbSubtask {
                id: "s1".to_string(),
                item_id: "i1".to_string(),
                title: "Stretch".to_string(),
                is_repetitive: true,
                is_completed: true,
                last_shown_at: None,
                created_at: "2026-02-01T12:00:00Z".to_string(),
            })
            .unwrap();

        engine.complete_item_at("u1", "i1", at(1), None).unwrap();

        let s1 = engine.db().get_subtask("s1").unwrap().unwrap();
        assert!(!s1.is_completed);
        assert!(s1.last_shown_at.is_some());
    }

    #[test]
    fn test_weekly_reset_hook() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);
        engine.complete_item_at("u1", "i1", at(1), None).unwrap();

        engine.reset_weekly_points("u1").unwrap();
        let ledger = engine.get_ledger("u1").unwrap();
        assert_eq!(ledger.weekly_points, 0);
        assert_eq!(ledger.total_points, 20);
    }

    #[test]
    fn test_ledger_for_unknown_user_is_not_found() {
        let engine = test_engine();
        assert!(matches!(
            engine.get_ledger("ghost"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_notes_are_stored_on_the_event() {
        let engine = test_engine();
        seed_item(&engine, "i1", "u1", true);

        let outcome = engine
            .complete_item_at("u1", "i1", at(1), Some("felt great"))
            .unwrap();
        assert_eq!(outcome.completion.notes.as_deref(), Some("felt great"));
    }
}
