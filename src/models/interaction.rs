use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of user action recorded against a place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Share,
    Try,
    /// Any action string we don't recognize. Carries no weight.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Signal strength of one occurrence of this action
    pub fn weight(self) -> f64 {
        match self {
            Action::View => 1.0,
            Action::Share => 3.0,
            Action::Try => 5.0,
            Action::Unknown => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Share => "share",
            Action::Try => "try",
            Action::Unknown => "unknown",
        }
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "view" => Action::View,
            "share" => Action::Share,
            "try" => Action::Try,
            _ => Action::Unknown,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated count of one action by one user against one place, joined
/// with the place's price tier and ambiance tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub action: Action,
    pub count: i64,
    /// Place price tier (0-4). Places without a tier are reported as 0.
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub ambiance: Vec<String>,
}

impl Interaction {
    pub fn new(action: Action, count: i64, price: f64, ambiance: &[&str]) -> Self {
        Self {
            action,
            count,
            price,
            ambiance: ambiance.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    /// Count with negative values treated as zero
    pub fn effective_count(&self) -> f64 {
        self.count.max(0) as f64
    }

    /// Action weight multiplied by the effective count
    pub fn weight(&self) -> f64 {
        self.action.weight() * self.effective_count()
    }
}
