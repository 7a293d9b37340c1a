use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Action, Interaction, Place, PreferenceVector, StoredPreference},
};

use super::PreferenceStore;

/// Aggregated interaction row
struct InteractionEntry {
    count: i64,
    /// Monotonic sequence number of the last touch, used for recency ordering
    touched: u64,
}

#[derive(Default)]
struct MemoryStoreInner {
    places: HashMap<Uuid, Place>,
    interactions: HashMap<(String, Uuid, Action), InteractionEntry>,
    preferences: HashMap<String, StoredPreference>,
    sequence: u64,
}

/// Preference store held entirely in process memory
///
/// Used by tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_place(&self, place: Place) {
        let mut inner = self.inner.write().await;
        inner.places.insert(place.id, place);
    }

    /// Removes a place. Its interactions stay behind but no longer join.
    pub async fn remove_place(&self, place_id: Uuid) -> Option<Place> {
        let mut inner = self.inner.write().await;
        inner.places.remove(&place_id)
    }

    /// Sets an aggregated interaction count directly
    pub async fn set_interaction_count(
        &self,
        user_id: &str,
        place_id: Uuid,
        action: Action,
        count: i64,
    ) {
        let mut inner = self.inner.write().await;
        inner.sequence += 1;
        let touched = inner.sequence;
        inner
            .interactions
            .insert((user_id.to_string(), place_id, action), InteractionEntry { count, touched });
    }
}

#[async_trait::async_trait]
impl PreferenceStore for InMemoryStore {
    async fn last_computed_at(&self, user_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner.preferences.get(user_id).map(|p| p.updated_at))
    }

    async fn recent_interactions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> AppResult<Vec<Interaction>> {
        let inner = self.inner.read().await;

        let mut rows: Vec<(u64, Interaction)> = inner
            .interactions
            .iter()
            .filter(|((user, _, _), _)| user == user_id)
            .filter_map(|((_, place_id, action), entry)| {
                inner.places.get(place_id).map(|place| {
                    (
                        entry.touched,
                        Interaction {
                            action: *action,
                            count: entry.count,
                            price: place.price_tier(),
                            ambiance: place.ambiance.clone(),
                        },
                    )
                })
            })
            .collect();

        rows.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|(_, interaction)| interaction)
            .collect())
    }

    async fn upsert_preference(
        &self,
        user_id: &str,
        vector: &PreferenceVector,
        computed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.preferences.insert(
            user_id.to_string(),
            StoredPreference {
                user_id: user_id.to_string(),
                vector: *vector,
                updated_at: computed_at,
            },
        );
        Ok(())
    }

    async fn fetch_preference(&self, user_id: &str) -> AppResult<Option<StoredPreference>> {
        let inner = self.inner.read().await;
        Ok(inner.preferences.get(user_id).cloned())
    }

    async fn record_interaction(
        &self,
        user_id: &str,
        place_id: Uuid,
        action: Action,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.places.contains_key(&place_id) {
            return Err(AppError::NotFound(format!("Place {} does not exist", place_id)));
        }

        inner.sequence += 1;
        let touched = inner.sequence;
        let entry = inner
            .interactions
            .entry((user_id.to_string(), place_id, action))
            .or_insert(InteractionEntry { count: 0, touched });
        entry.count += 1;
        entry.touched = touched;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
