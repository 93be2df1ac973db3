// Item lifecycle service.
// Ownership checks live here so the db layer stays a plain row store.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::db::{DbItem, DbSubtask, TodayItem, TrackerDb};
use crate::error::EngineError;
use crate::types::Intensity;
use crate::util::{day_bounds, fmt_ts, local_date};

/// Load an item and verify the acting user owns it.
fn owned_item(db: &TrackerDb, user_id: &str, item_id: &str) -> Result<DbItem, EngineError> {
    let item = db
        .get_item(item_id)?
        .ok_or_else(|| EngineError::NotFound(format!("item {}", item_id)))?;
    if item.user_id != user_id {
        return Err(EngineError::Forbidden {
            resource: format!("item {}", item_id),
            user_id: user_id.to_string(),
        });
    }
    Ok(item)
}

/// Create a trackable item. The point value is derived from intensity here
/// and on every intensity change; callers never set it.
pub fn create_item(
    db: &TrackerDb,
    user_id: &str,
    title: &str,
    intensity: Intensity,
    is_recurring: bool,
) -> Result<DbItem, EngineError> {
    let now = fmt_ts(Utc::now());
    let item = DbItem {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        intensity: intensity.as_str().to_string(),
        point_value: intensity.point_value(),
        is_recurring,
        is_active: true,
        archived: false,
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    db.insert_item(&item)?;

    // First item materializes the user's ledger
    db.get_or_create_ledger(user_id, &now)?;

    log::info!(
        "created {} '{}' for {} ({} pts)",
        if is_recurring { "habit" } else { "goal" },
        title,
        user_id,
        item.point_value,
    );
    Ok(item)
}

pub fn rename_item(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
    title: &str,
) -> Result<(), EngineError> {
    owned_item(db, user_id, item_id)?;
    db.update_item_title(item_id, title, &fmt_ts(Utc::now()))?;
    Ok(())
}

/// Change intensity and re-derive the point value. Past completions keep
/// their stored snapshots; only future awards see the new value.
pub fn change_intensity(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
    intensity: Intensity,
) -> Result<DbItem, EngineError> {
    owned_item(db, user_id, item_id)?;
    db.update_item_intensity(
        item_id,
        intensity.as_str(),
        intensity.point_value(),
        &fmt_ts(Utc::now()),
    )?;
    owned_item(db, user_id, item_id)
}

pub fn set_active(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
    active: bool,
) -> Result<(), EngineError> {
    owned_item(db, user_id, item_id)?;
    db.set_item_active(item_id, active, &fmt_ts(Utc::now()))?;
    Ok(())
}

/// What `delete_item` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDisposition {
    Deleted,
    Archived,
}

/// Delete an item. Items with completion history are archived instead of
/// hard-deleted so the ledger's past stays explainable.
pub fn delete_item(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
) -> Result<DeleteDisposition, EngineError> {
    owned_item(db, user_id, item_id)?;

    if db.count_completions_for_item(item_id)? > 0 {
        db.archive_item(item_id, &fmt_ts(Utc::now()))?;
        log::info!("archived {} (has completion history)", item_id);
        return Ok(DeleteDisposition::Archived);
    }

    db.delete_item(item_id)?;
    Ok(DeleteDisposition::Deleted)
}

pub fn add_subtask(
    db: &TrackerDb,
    user_id: &str,
    item_id: &str,
    title: &str,
    is_repetitive: bool,
) -> Result<DbSubtask, EngineError> {
    owned_item(db, user_id, item_id)?;

    let subtask = DbSubtask {
        id: Uuid::new_v4().to_string(),
        item_id: item_id.to_string(),
        title: title.to_string(),
        is_repetitive,
        is_completed: false,
        last_shown_at: None,
        created_at: fmt_ts(Utc::now()),
    };
    db.insert_subtask(&subtask)?;
    Ok(subtask)
}

pub fn set_subtask_completed(
    db: &TrackerDb,
    user_id: &str,
    subtask_id: &str,
    completed: bool,
) -> Result<(), EngineError> {
    let subtask = db
        .get_subtask(subtask_id)?
        .ok_or_else(|| EngineError::NotFound(format!("subtask {}", subtask_id)))?;
    owned_item(db, user_id, &subtask.item_id)?;

    db.set_subtask_completed(subtask_id, completed)?;
    Ok(())
}

/// The today view: active items with their completed-today flags, bucketed
/// on the local calendar day of `when`.
pub fn today_view(
    db: &TrackerDb,
    user_id: &str,
    when: DateTime<Utc>,
    tz: Tz,
) -> Result<Vec<TodayItem>, EngineError> {
    let (day_start, day_end) = day_bounds(local_date(when, tz), tz);
    Ok(db.today_items(user_id, &day_start, &day_end)?)
}
