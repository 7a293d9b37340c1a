pub mod personalization;
pub mod scorer;

pub use personalization::{PersonalizationSettings, Personalizer, RecomputeOutcome, SkipReason};
pub use scorer::compute_preference_vector;
