use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Action, Interaction, PreferenceVector, StoredPreference},
};

use super::PreferenceStore;

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const RECENT_INTERACTIONS_SQL: &str = r#"
    SELECT i.action,
           i.count,
           COALESCE(p.price, 0)::float8 AS price,
           COALESCE(p.ambiance, '{}'::text[]) AS ambiance
    FROM user_interactions i
    INNER JOIN places p ON p.id = i.place_id
    WHERE i.user_id = $1
    ORDER BY i.updated_at DESC
    LIMIT $2
"#;

const UPSERT_PREFERENCE_SQL: &str = r#"
    INSERT INTO user_preferences
        (user_id, cozy, lively, work_friendly, trendy, traditional, romantic, price, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    ON CONFLICT (user_id) DO UPDATE SET
        cozy = EXCLUDED.cozy,
        lively = EXCLUDED.lively,
        work_friendly = EXCLUDED.work_friendly,
        trendy = EXCLUDED.trendy,
        traditional = EXCLUDED.traditional,
        romantic = EXCLUDED.romantic,
        price = EXCLUDED.price,
        updated_at = EXCLUDED.updated_at
"#;

const RECORD_INTERACTION_SQL: &str = r#"
    INSERT INTO user_interactions (user_id, place_id, action, count, updated_at)
    VALUES ($1, $2, $3, 1, now())
    ON CONFLICT (user_id, place_id, action) DO UPDATE SET
        count = user_interactions.count + 1,
        updated_at = now()
"#;

#[derive(Debug, FromRow)]
struct InteractionRow {
    action: String,
    count: i32,
    price: f64,
    ambiance: Vec<String>,
}

impl From<InteractionRow> for Interaction {
    fn from(row: InteractionRow) -> Self {
        Self {
            action: Action::from(row.action.as_str()),
            count: i64::from(row.count),
            price: row.price,
            ambiance: row.ambiance,
        }
    }
}

#[derive(Debug, FromRow)]
struct PreferenceRow {
    user_id: String,
    cozy: f64,
    lively: f64,
    work_friendly: f64,
    trendy: f64,
    traditional: f64,
    romantic: f64,
    price: f64,
    updated_at: DateTime<Utc>,
}

impl From<PreferenceRow> for StoredPreference {
    fn from(row: PreferenceRow) -> Self {
        Self {
            user_id: row.user_id,
            vector: PreferenceVector {
                cozy: row.cozy,
                lively: row.lively,
                work_friendly: row.work_friendly,
                trendy: row.trendy,
                traditional: row.traditional,
                romantic: row.romantic,
                price: row.price,
            },
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed preference store
#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn last_computed_at(&self, user_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        let updated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT updated_at FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated_at)
    }

    async fn recent_interactions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(RECENT_INTERACTIONS_SQL)
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(user_id = %user_id, rows = rows.len(), "Loaded recent interactions");

        Ok(rows.into_iter().map(Interaction::from).collect())
    }

    async fn upsert_preference(
        &self,
        user_id: &str,
        vector: &PreferenceVector,
        computed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(UPSERT_PREFERENCE_SQL)
            .bind(user_id)
            .bind(vector.cozy)
            .bind(vector.lively)
            .bind(vector.work_friendly)
            .bind(vector.trendy)
            .bind(vector.traditional)
            .bind(vector.romantic)
            .bind(vector.price)
            .bind(computed_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_preference(&self, user_id: &str) -> AppResult<Option<StoredPreference>> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT user_id, cozy, lively, work_friendly, trendy, traditional, romantic, price, updated_at \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredPreference::from))
    }

    async fn record_interaction(
        &self,
        user_id: &str,
        place_id: Uuid,
        action: Action,
    ) -> AppResult<()> {
        let result = sqlx::query(RECORD_INTERACTION_SQL)
            .bind(user_id)
            .bind(place_id)
            .bind(action.as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
                AppError::NotFound(format!("Place {} does not exist", place_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_row_conversion() {
        let row = InteractionRow {
            action: "share".to_string(),
            count: 4,
            price: 2.0,
            ambiance: vec!["cozy".to_string()],
        };

        let interaction = Interaction::from(row);
        assert_eq!(interaction.action, Action::Share);
        assert_eq!(interaction.count, 4);
        assert_eq!(interaction.price, 2.0);
        assert_eq!(interaction.ambiance, vec!["cozy".to_string()]);
    }

    #[test]
    fn test_interaction_row_unknown_action() {
        let row = InteractionRow {
            action: "bookmark".to_string(),
            count: 1,
            price: 0.0,
            ambiance: Vec::new(),
        };

        assert_eq!(Interaction::from(row).action, Action::Unknown);
    }

    #[test]
    fn test_preference_row_conversion() {
        let now = Utc::now();
        let row = PreferenceRow {
            user_id: "user-1".to_string(),
            cozy: 0.1,
            lively: 0.2,
            work_friendly: 0.3,
            trendy: 0.4,
            traditional: 0.5,
            romantic: 0.6,
            price: 0.7,
            updated_at: now,
        };

        let stored = StoredPreference::from(row);
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.vector.work_friendly, 0.3);
        assert_eq!(stored.vector.price, 0.7);
        assert_eq!(stored.updated_at, now);
    }
}
