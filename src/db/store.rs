use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Action, Interaction, PreferenceVector, StoredPreference},
};

/// Data store backing personalization
///
/// Implementations own interaction history, place attributes and the
/// per-user preference rows. The scorer never talks to a store directly;
/// the personalization service reads from and writes to it around each
/// computation.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    /// When the user's preference vector was last computed, if ever
    async fn last_computed_at(&self, user_id: &str) -> AppResult<Option<DateTime<Utc>>>;

    /// Most recent interactions for a user, newest first, joined with the
    /// price and ambiance of their place
    ///
    /// Interactions whose place no longer exists are left out.
    async fn recent_interactions(&self, user_id: &str, limit: u32)
        -> AppResult<Vec<Interaction>>;

    /// Inserts or overwrites the user's preference vector
    async fn upsert_preference(
        &self,
        user_id: &str,
        vector: &PreferenceVector,
        computed_at: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn fetch_preference(&self, user_id: &str) -> AppResult<Option<StoredPreference>>;

    /// Increments the aggregated count for (user, place, action)
    ///
    /// Fails with `AppError::NotFound` when the place does not exist.
    async fn record_interaction(
        &self,
        user_id: &str,
        place_id: Uuid,
        action: Action,
    ) -> AppResult<()>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
