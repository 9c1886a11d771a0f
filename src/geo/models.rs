use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upper bound on suggestions returned for one query
pub const MAX_SUGGESTIONS: usize = 5;

/// One Direct Geocoding API match.
/// Kept in the order the provider ranked them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CitySuggestion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl CitySuggestion {
    /// "Springfield, Illinois, US" style label
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_entry_with_extra_fields() {
        let payload = serde_json::json!({
            "name": "London",
            "local_names": { "en": "London", "fr": "Londres" },
            "lat": 51.5073219,
            "lon": -0.1276474,
            "country": "GB",
            "state": "England"
        });

        let suggestion: CitySuggestion = serde_json::from_value(payload).expect("deserializes");
        assert_eq!(suggestion.state.as_deref(), Some("England"));
        assert_eq!(suggestion.label(), "London, England, GB");
    }

    #[test]
    fn test_label_without_state() {
        let suggestion = CitySuggestion {
            name: "Monaco".to_string(),
            state: None,
            country: "MC".to_string(),
            lat: 43.73,
            lon: 7.42,
        };
        assert_eq!(suggestion.label(), "Monaco, MC");
    }
}
