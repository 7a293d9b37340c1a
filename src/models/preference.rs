use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Neutral score used for every field when there is no interaction data
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Ambiance categories the scorer recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbianceCategory {
    Cozy,
    Lively,
    WorkFriendly,
    Trendy,
    Traditional,
    Romantic,
}

impl AmbianceCategory {
    pub const ALL: [AmbianceCategory; 6] = [
        AmbianceCategory::Cozy,
        AmbianceCategory::Lively,
        AmbianceCategory::WorkFriendly,
        AmbianceCategory::Trendy,
        AmbianceCategory::Traditional,
        AmbianceCategory::Romantic,
    ];

    /// Output key of this category in a preference vector
    pub fn key(self) -> &'static str {
        match self {
            AmbianceCategory::Cozy => "cozy",
            AmbianceCategory::Lively => "lively",
            AmbianceCategory::WorkFriendly => "work_friendly",
            AmbianceCategory::Trendy => "trendy",
            AmbianceCategory::Traditional => "traditional",
            AmbianceCategory::Romantic => "romantic",
        }
    }

    /// Matches a free-text ambiance tag against the recognized categories.
    ///
    /// Matching is case-insensitive and ignores `-` and `_`, so "Work-Friendly",
    /// "work_friendly" and "workfriendly" all map to [`AmbianceCategory::WorkFriendly`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = normalize_tag(tag);
        Self::ALL
            .into_iter()
            .find(|category| normalize_tag(category.key()) == normalized)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Display for AmbianceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Per-user affinity profile. Every field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceVector {
    pub cozy: f64,
    pub lively: f64,
    pub work_friendly: f64,
    pub trendy: f64,
    pub traditional: f64,
    pub romantic: f64,
    pub price: f64,
}

impl Default for PreferenceVector {
    fn default() -> Self {
        Self::neutral()
    }
}

impl PreferenceVector {
    /// Vector signalling "no data": every field at 0.5
    pub fn neutral() -> Self {
        Self::uniform(NEUTRAL_SCORE)
    }

    pub fn zeroed() -> Self {
        Self::uniform(0.0)
    }

    fn uniform(value: f64) -> Self {
        Self {
            cozy: value,
            lively: value,
            work_friendly: value,
            trendy: value,
            traditional: value,
            romantic: value,
            price: value,
        }
    }

    pub fn ambiance(&self, category: AmbianceCategory) -> f64 {
        match category {
            AmbianceCategory::Cozy => self.cozy,
            AmbianceCategory::Lively => self.lively,
            AmbianceCategory::WorkFriendly => self.work_friendly,
            AmbianceCategory::Trendy => self.trendy,
            AmbianceCategory::Traditional => self.traditional,
            AmbianceCategory::Romantic => self.romantic,
        }
    }

    pub fn ambiance_mut(&mut self, category: AmbianceCategory) -> &mut f64 {
        match category {
            AmbianceCategory::Cozy => &mut self.cozy,
            AmbianceCategory::Lively => &mut self.lively,
            AmbianceCategory::WorkFriendly => &mut self.work_friendly,
            AmbianceCategory::Trendy => &mut self.trendy,
            AmbianceCategory::Traditional => &mut self.traditional,
            AmbianceCategory::Romantic => &mut self.romantic,
        }
    }

    /// Forces every field into `[0, 1]`. NaN becomes 0.
    pub fn clamped(mut self) -> Self {
        for category in AmbianceCategory::ALL {
            let value = self.ambiance_mut(category);
            *value = clamp_unit(*value);
        }
        self.price = clamp_unit(self.price);
        self
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A persisted preference vector together with when it was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPreference {
    pub user_id: String,
    #[serde(flatten)]
    pub vector: PreferenceVector,
    pub updated_at: DateTime<Utc>,
}
