pub mod memory;
pub mod postgres;
pub mod redis;
mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgPreferenceStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use store::PreferenceStore;

#[cfg(test)]
pub use store::MockPreferenceStore;
