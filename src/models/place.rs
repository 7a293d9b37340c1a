use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point of interest users can view, share, and try
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    /// Price tier from 0 (free) to 4 (most expensive), when known
    pub price: Option<i16>,
    #[serde(default)]
    pub ambiance: Vec<String>,
}

impl Place {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            city: city.into(),
            price: None,
            ambiance: Vec::new(),
        }
    }

    pub fn with_price(mut self, price: i16) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_ambiance(mut self, tags: &[&str]) -> Self {
        self.ambiance = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }

    /// Price tier as used by preference scoring; unknown tiers count as 0
    pub fn price_tier(&self) -> f64 {
        f64::from(self.price.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_place() {
        let place = Place::new("Kaffebar", "Oslo");
        assert_eq!(place.name, "Kaffebar");
        assert_eq!(place.city, "Oslo");
        assert_eq!(place.price, None);
        assert!(place.ambiance.is_empty());
    }

    #[test]
    fn test_price_tier_defaults_to_zero() {
        let place = Place::new("Park", "Oslo");
        assert_eq!(place.price_tier(), 0.0);

        let place = place.with_price(3);
        assert_eq!(place.price_tier(), 3.0);
    }
}
