mod interaction;
mod place;
mod preference;

pub use interaction::{Action, Interaction};
pub use place::Place;
pub use preference::{AmbianceCategory, PreferenceVector, StoredPreference, NEUTRAL_SCORE};
