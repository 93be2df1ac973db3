//! Consecutive-day streak computation.
//!
//! Walks backward through the completion ledger one local calendar day at a
//! time. Each day is a single indexed point query, so the cost is
//! O(streak length); the walk stops at the first gap day and is uncapped.

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::db::{DbError, TrackerDb};
use crate::util::day_bounds;

/// Length of the consecutive-day run for (user, item) ending at
/// `reference_date`, inclusive. The day being completed counts, so the
/// result is always ≥ 1; any gap the day before resets the run regardless
/// of older history.
pub fn compute_streak(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
    reference_date: NaiveDate,
    tz: Tz,
) -> Result<i64, DbError> {
    let mut streak: i64 = 1;
    let mut day = reference_date.pred_opt();

    while let Some(current) = day {
        let (start, end) = day_bounds(current, tz);
        if !db.completion_exists_in_window(user_id, item_id, &start, &end)? {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }

    Ok(streak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::DbCompletion;

    const TZ: Tz = chrono_tz::Tz::UTC;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_completion(db: &TrackerDb, id: &str, day: &str) {
        db.insert_completion(&DbCompletion {
            id: id.to_string(),
            user_id: "u1".to_string(),
            item_id: "i1".to_string(),
            completed_at: format!("{}T09:00:00Z", day),
            points_awarded: 10,
            streak_at_completion: 1,
            notes: None,
        })
        .unwrap();
    }

    #[test]
    fn test_no_history_is_streak_of_one() {
        let db = test_db();
        let streak = compute_streak(&db, "u1", "i1", date(2026, 8, 6), TZ).unwrap();
        assert_eq!(streak, 1);
    }

    #[test]
    fn test_n_consecutive_days_is_n() {
        let db = test_db();
        seed_completion(&db, "c1", "2026-08-02");
        seed_completion(&db, "c2", "2026-08-03");
        seed_completion(&db, "c3", "2026-08-04");
        seed_completion(&db, "c4", "2026-08-05");

        let streak = compute_streak(&db, "u1", "i1", date(2026, 8, 6), TZ).unwrap();
        assert_eq!(streak, 5);
    }

    #[test]
    fn test_gap_resets_run_regardless_of_older_history() {
        let db = test_db();
        // A long run that ended two days before the reference date
        seed_completion(&db, "c1", "2026-07-30");
        seed_completion(&db, "c2", "2026-07-31");
        seed_completion(&db, "c3", "2026-08-01");
        seed_completion(&db, "c4", "2026-08-02");
        seed_completion(&db, "c5", "2026-08-03");
        // Gap on 2026-08-04, then one completion yesterday
        seed_completion(&db, "c6", "2026-08-05");

        let streak = compute_streak(&db, "u1", "i1", date(2026, 8, 6), TZ).unwrap();
        assert_eq!(streak, 2, "run is yesterday + today; the gap hides the rest");
    }

    #[test]
    fn test_streak_is_per_item() {
        let db = test_db();
        seed_completion(&db, "c1", "2026-08-05");
        db.insert_completion(&DbCompletion {
            id: "other".to_string(),
            user_id: "u1".to_string(),
            item_id: "i2".to_string(),
            completed_at: "2026-08-04T09:00:00Z".to_string(),
            points_awarded: 10,
            streak_at_completion: 1,
            notes: None,
        })
        .unwrap();

        // i1's run is not extended by i2's completion
        let streak = compute_streak(&db, "u1", "i1", date(2026, 8, 6), TZ).unwrap();
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_local_days_bucket_in_configured_zone() {
        let db = test_db();
        // 03:30 UTC on Aug 6 is the evening of Aug 5 in Toronto
        db.insert_completion(&DbCompletion {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            item_id: "i1".to_string(),
            completed_at: "2026-08-06T03:30:00Z".to_string(),
            points_awarded: 10,
            streak_at_completion: 1,
            notes: None,
        })
        .unwrap();

        let toronto = chrono_tz::Tz::America__Toronto;
        let streak = compute_streak(&db, "u1", "i1", date(2026, 8, 6), toronto).unwrap();
        assert_eq!(streak, 2, "late-night UTC row counts as yesterday locally");

        let utc_streak = compute_streak(&db, "u1", "i1", date(2026, 8, 7), TZ).unwrap();
        assert_eq!(utc_streak, 2, "same row is Aug 6 in UTC bucketing");
    }
}
