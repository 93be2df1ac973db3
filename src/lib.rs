//! Stride progression engine.
//!
//! A completion request flows: idempotence guard → streak walk → point
//! award → ledger update (accumulate, recompute level) → achievement
//! evaluation. Undo reverses the ledger's point delta and removes the
//! event, and deliberately nothing else. The HTTP layer, auth, and UI live
//! elsewhere; this crate is the engine and its store.

pub mod db;
pub mod error;
pub mod migrations;
pub mod progression;
pub mod reducer;
pub mod services;
pub mod types;
pub mod util;

pub use db::TrackerDb;
pub use error::{ApiError, EngineError};
pub use progression::ProgressionEngine;
pub use types::{
    Achievement, AchievementCategory, CompletionOutcome, Config, Intensity, LedgerSnapshot,
    UndoOutcome,
};

/// Initialize env_logger for binaries and integration harnesses. Safe to
/// call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
