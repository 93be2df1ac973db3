// Administrative operations.
//
// Admin rights are a capability checked through `AdminAccess`, backed by the
// role claim on the users table. There is no privileged literal identity.

use chrono::Utc;

use crate::db::TrackerDb;
use crate::error::EngineError;
use crate::util::fmt_ts;

/// Capability seam for admin checks. Production uses `DbRoles`; tests and
/// embedders can substitute their own policy.
pub trait AdminAccess {
    fn is_admin(&self, user_id: &str) -> bool;
}

/// Role-claim lookup backed by the users table.
pub struct DbRoles<'a> {
    db: &'a TrackerDb,
}

impl<'a> DbRoles<'a> {
    pub fn new(db: &'a TrackerDb) -> Self {
        Self { db }
    }
}

impl AdminAccess for DbRoles<'_> {
    fn is_admin(&self, user_id: &str) -> bool {
        matches!(
            self.db.get_user_role(user_id).ok().flatten().as_deref(),
            Some("admin")
        )
    }
}

fn require_admin(access: &dyn AdminAccess, actor_id: &str) -> Result<(), EngineError> {
    if access.is_admin(actor_id) {
        return Ok(());
    }
    Err(EngineError::Forbidden {
        resource: "admin operations".to_string(),
        user_id: actor_id.to_string(),
    })
}

/// Administrative streak reset — the only path on which `longest_streak`
/// decreases.
pub fn reset_user_streaks(
    db: &TrackerDb,
    access: &dyn AdminAccess,
    actor_id: &str,
    target_user_id: &str,
) -> Result<(), EngineError> {
    require_admin(access, actor_id)?;

    db.reset_streaks(target_user_id, &fmt_ts(Utc::now()))?;
    log::info!(
        "admin {} reset streaks for user {}",
        actor_id,
        target_user_id
    );
    Ok(())
}

/// Change another user's role claim.
pub fn set_user_role(
    db: &TrackerDb,
    access: &dyn AdminAccess,
    actor_id: &str,
    target_user_id: &str,
    role: &str,
) -> Result<(), EngineError> {
    require_admin(access, actor_id)?;

    db.upsert_user(target_user_id, None, role, &fmt_ts(Utc::now()))?;
    log::info!(
        "admin {} set role '{}' for user {}",
        actor_id,
        role,
        target_user_id
    );
    Ok(())
}
