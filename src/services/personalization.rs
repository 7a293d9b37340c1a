use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    db::{Cache, CacheKey, PreferenceStore},
    error::{AppError, AppResult},
    models::{PreferenceVector, StoredPreference},
    services::scorer::compute_preference_vector,
};

/// Tunables for preference recomputation
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationSettings {
    /// Recomputations for the same user closer together than this are skipped
    pub min_recompute_interval: Duration,
    /// Number of most recent interactions fed to the scorer
    pub interaction_limit: u32,
    pub cache_ttl_secs: u64,
}

impl Default for PersonalizationSettings {
    fn default() -> Self {
        Self {
            min_recompute_interval: Duration::seconds(60),
            interaction_limit: 50,
            cache_ttl_secs: 300,
        }
    }
}

/// Why a recomputation did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RecentlyUpdated,
    NoInteractions,
}

/// Result of a recomputation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecomputeOutcome {
    Skipped { reason: SkipReason },
    Updated { vector: PreferenceVector },
}

/// Keeps each user's stored preference vector in step with their interactions
#[derive(Clone)]
pub struct Personalizer {
    store: Arc<dyn PreferenceStore>,
    cache: Option<Cache>,
    settings: PersonalizationSettings,
}

impl Personalizer {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        cache: Option<Cache>,
        settings: PersonalizationSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Recomputes and stores a user's preference vector as of `now`
    ///
    /// Skips without touching the store's preference row when the last
    /// computation is more recent than the configured interval, or when the
    /// user has no interactions with existing places. Store failures are
    /// logged and returned; nothing is retried.
    pub async fn recompute(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RecomputeOutcome> {
        let user_id = validate_user_id(user_id)?;

        let last_computed = self.store.last_computed_at(user_id).await.map_err(|e| {
            tracing::error!(user_id = %user_id, store = self.store.name(), error = %e, "Failed to read preference timestamp");
            e
        })?;

        if let Some(last) = last_computed {
            if now.signed_duration_since(last) < self.settings.min_recompute_interval {
                tracing::debug!(user_id = %user_id, last_computed = %last, "Skipping recompute, recently updated");
                return Ok(RecomputeOutcome::Skipped {
                    reason: SkipReason::RecentlyUpdated,
                });
            }
        }

        let interactions = self
            .store
            .recent_interactions(user_id, self.settings.interaction_limit)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, store = self.store.name(), error = %e, "Failed to load interactions");
                e
            })?;

        if interactions.is_empty() {
            tracing::debug!(user_id = %user_id, "Skipping recompute, no interactions");
            return Ok(RecomputeOutcome::Skipped {
                reason: SkipReason::NoInteractions,
            });
        }

        let vector = compute_preference_vector(&interactions);

        self.store
            .upsert_preference(user_id, &vector, now)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, store = self.store.name(), error = %e, "Failed to store preference vector");
                e
            })?;

        if let Some(cache) = &self.cache {
            let stored = StoredPreference {
                user_id: user_id.to_string(),
                vector,
                updated_at: now,
            };
            self.refresh_cache(cache, &stored).await;
        }

        tracing::info!(
            user_id = %user_id,
            interactions = interactions.len(),
            "Preference vector updated"
        );

        Ok(RecomputeOutcome::Updated { vector })
    }

    /// Returns the stored preference vector for a user
    ///
    /// Reads through the cache when one is configured. Cache failures fall
    /// back to the store.
    pub async fn preference(&self, user_id: &str) -> AppResult<StoredPreference> {
        let user_id = validate_user_id(user_id)?;
        let key = CacheKey::Preference(user_id.to_string());

        if let Some(cache) = &self.cache {
            match cache.get_from_cache::<StoredPreference>(&key).await {
                Ok(Some(cached)) => {
                    tracing::debug!(user_id = %user_id, "Cache hit");
                    return Ok(cached);
                }
                Ok(None) => tracing::debug!(user_id = %user_id, "Cache miss"),
                Err(e) => tracing::warn!(error = %e, "Preference cache read failed"),
            }
        }

        let stored = self
            .store
            .fetch_preference(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No preferences computed for user {}", user_id))
            })?;

        if let Some(cache) = &self.cache {
            // A recompute racing this read owns the key; never replace its entry
            cache.fill_in_background(&key, &stored, self.settings.cache_ttl_secs);
        }

        Ok(stored)
    }

    /// Overwrites the cached entry with a freshly computed vector
    ///
    /// If the write fails the entry is dropped instead, so readers fall back
    /// to the store rather than serving the previous vector until expiry.
    async fn refresh_cache(&self, cache: &Cache, stored: &StoredPreference) {
        let key = CacheKey::Preference(stored.user_id.clone());
        let Err(e) = cache
            .set(&key, stored, self.settings.cache_ttl_secs)
            .await
        else {
            return;
        };

        tracing::warn!(user_id = %stored.user_id, error = %e, "Preference cache write failed");
        if let Err(e) = cache.invalidate(&key).await {
            tracing::warn!(
                user_id = %stored.user_id,
                error = %e,
                "Preference cache invalidation failed"
            );
        }
    }
}

fn validate_user_id(user_id: &str) -> AppResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_redis_client, MockPreferenceStore};
    use crate::models::{Action, Interaction};

    fn personalizer(store: MockPreferenceStore) -> Personalizer {
        Personalizer::new(Arc::new(store), None, PersonalizationSettings::default())
    }

    #[tokio::test]
    async fn test_recompute_skips_when_recently_updated() {
        let now = Utc::now();
        let mut store = MockPreferenceStore::new();
        store
            .expect_last_computed_at()
            .withf(|user_id| user_id == "u1")
            .returning(move |_| Ok(Some(now - Duration::seconds(30))));
        store.expect_recent_interactions().never();
        store.expect_upsert_preference().never();
        store.expect_name().return_const("mock");

        let outcome = personalizer(store).recompute("u1", now).await.unwrap();
        assert_eq!(
            outcome,
            RecomputeOutcome::Skipped {
                reason: SkipReason::RecentlyUpdated
            }
        );
    }

    #[tokio::test]
    async fn test_recompute_skips_without_interactions() {
        let mut store = MockPreferenceStore::new();
        store.expect_last_computed_at().returning(|_| Ok(None));
        store
            .expect_recent_interactions()
            .withf(|user_id, limit| user_id == "u1" && *limit == 50)
            .returning(|_, _| Ok(Vec::new()));
        store.expect_upsert_preference().never();
        store.expect_name().return_const("mock");

        let outcome = personalizer(store).recompute("u1", Utc::now()).await.unwrap();
        assert_eq!(
            outcome,
            RecomputeOutcome::Skipped {
                reason: SkipReason::NoInteractions
            }
        );
    }

    #[tokio::test]
    async fn test_recompute_upserts_scored_vector() {
        let now = Utc::now();
        let mut store = MockPreferenceStore::new();
        // Last computation is older than the interval
        store
            .expect_last_computed_at()
            .returning(move |_| Ok(Some(now - Duration::seconds(61))));
        store.expect_recent_interactions().returning(|_, _| {
            Ok(vec![Interaction::new(Action::Try, 1, 2.0, &["cozy"])])
        });
        store
            .expect_upsert_preference()
            .withf(move |user_id, vector, computed_at| {
                user_id == "u1"
                    && (vector.cozy - 0.2).abs() < 1e-9
                    && vector.price == 1.0
                    && *computed_at == now
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        store.expect_name().return_const("mock");

        let outcome = personalizer(store).recompute("u1", now).await.unwrap();
        match outcome {
            RecomputeOutcome::Updated { vector } => {
                assert!((vector.cozy - 0.2).abs() < 1e-9);
                assert_eq!(vector.lively, 0.0);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recompute_rejects_blank_user() {
        let store = MockPreferenceStore::new();
        let result = personalizer(store).recompute("   ", Utc::now()).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_recompute_surfaces_read_failure() {
        let mut store = MockPreferenceStore::new();
        store.expect_last_computed_at().returning(|_| Ok(None));
        store
            .expect_recent_interactions()
            .times(1)
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        store.expect_upsert_preference().never();
        store.expect_name().return_const("mock");

        let result = personalizer(store).recompute("u1", Utc::now()).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_recompute_surfaces_write_failure() {
        let mut store = MockPreferenceStore::new();
        store.expect_last_computed_at().returning(|_| Ok(None));
        store
            .expect_recent_interactions()
            .returning(|_, _| Ok(vec![Interaction::new(Action::View, 1, 1.0, &[])]));
        store
            .expect_upsert_preference()
            .times(1)
            .returning(|_, _, _| Err(AppError::Database(sqlx::Error::PoolClosed)));
        store.expect_name().return_const("mock");

        let result = personalizer(store).recompute("u1", Utc::now()).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_preference_not_found() {
        let mut store = MockPreferenceStore::new();
        store.expect_fetch_preference().returning(|_| Ok(None));

        let result = personalizer(store).preference("u1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_preference_found() {
        let now = Utc::now();
        let mut store = MockPreferenceStore::new();
        store
            .expect_fetch_preference()
            .withf(|user_id| user_id == "u1")
            .returning(move |_| {
                Ok(Some(StoredPreference {
                    user_id: "u1".to_string(),
                    vector: PreferenceVector::neutral(),
                    updated_at: now,
                }))
            });

        let stored = personalizer(store).preference("u1").await.unwrap();
        assert_eq!(stored.vector, PreferenceVector::neutral());
        assert_eq!(stored.updated_at, now);
    }

    async fn unreachable_cache() -> Cache {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client).await;
        cache
    }

    #[tokio::test]
    async fn test_preference_falls_back_to_store_when_cache_is_down() {
        let now = Utc::now();
        let mut store = MockPreferenceStore::new();
        store
            .expect_fetch_preference()
            .withf(|user_id| user_id == "u1")
            .times(1)
            .returning(move |_| {
                Ok(Some(StoredPreference {
                    user_id: "u1".to_string(),
                    vector: PreferenceVector::zeroed(),
                    updated_at: now,
                }))
            });

        let personalizer = Personalizer::new(
            Arc::new(store),
            Some(unreachable_cache().await),
            PersonalizationSettings::default(),
        );

        let stored = personalizer.preference("u1").await.unwrap();
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.vector, PreferenceVector::zeroed());
        assert_eq!(stored.updated_at, now);
    }

    #[tokio::test]
    async fn test_recompute_succeeds_when_cache_is_down() {
        let now = Utc::now();
        let mut store = MockPreferenceStore::new();
        store.expect_last_computed_at().returning(|_| Ok(None));
        store
            .expect_recent_interactions()
            .returning(|_, _| Ok(vec![Interaction::new(Action::View, 2, 1.0, &["lively"])]));
        store
            .expect_upsert_preference()
            .times(1)
            .returning(|_, _, _| Ok(()));
        store.expect_name().return_const("mock");

        let personalizer = Personalizer::new(
            Arc::new(store),
            Some(unreachable_cache().await),
            PersonalizationSettings::default(),
        );

        let outcome = personalizer.recompute("u1", now).await.unwrap();
        match outcome {
            RecomputeOutcome::Updated { vector } => assert_eq!(vector.lively, 1.0),
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        let skipped = serde_json::to_value(RecomputeOutcome::Skipped {
            reason: SkipReason::RecentlyUpdated,
        })
        .unwrap();
        assert_eq!(skipped["status"], "skipped");
        assert_eq!(skipped["reason"], "recently_updated");

        let updated = serde_json::to_value(RecomputeOutcome::Updated {
            vector: PreferenceVector::neutral(),
        })
        .unwrap();
        assert_eq!(updated["status"], "updated");
        assert_eq!(updated["vector"]["work_friendly"], 0.5);
    }
}
