/// Smart playlist criteria
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter/sort applied once over the whole song corpus to materialize a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SmartCriteria {
    /// Songs marked as favorite, corpus order
    Favorites,

    /// Songs with a last-played timestamp, newest first
    Recent {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Case-insensitive substring match on genre, corpus order
    Genre { value: String },

    /// Case-insensitive substring match on mood, corpus order
    Mood { value: String },

    /// Highest play count first
    MostPlayed {
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl SmartCriteria {
    /// Wire name of the criteria type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Recent { .. } => "recent",
            Self::Genre { .. } => "genre",
            Self::Mood { .. } => "mood",
            Self::MostPlayed { .. } => "mostPlayed",
        }
    }

    /// Filter value, for criteria that carry one
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Genre { value } | Self::Mood { value } => Some(value),
            _ => None,
        }
    }

    /// Display name for the materialized playlist
    pub fn playlist_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SmartCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) if !value.is_empty() => {
                write!(f, "Smart: {} ({})", self.type_name(), value)
            }
            _ => write!(f, "Smart: {}", self.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_names() {
        assert_eq!(SmartCriteria::Favorites.playlist_name(), "Smart: favorites");
        assert_eq!(
            SmartCriteria::Genre {
                value: "jazz".to_string()
            }
            .playlist_name(),
            "Smart: genre (jazz)"
        );
        assert_eq!(
            SmartCriteria::MostPlayed { limit: Some(5) }.playlist_name(),
            "Smart: mostPlayed"
        );
    }

    #[test]
    fn deserializes_tagged_json() {
        let criteria: SmartCriteria = serde_json::from_str(r#"{"type":"favorites"}"#).unwrap();
        assert_eq!(criteria, SmartCriteria::Favorites);

        let criteria: SmartCriteria =
            serde_json::from_str(r#"{"type":"mostPlayed","limit":10}"#).unwrap();
        assert_eq!(criteria, SmartCriteria::MostPlayed { limit: Some(10) });

        let criteria: SmartCriteria =
            serde_json::from_str(r#"{"type":"mood","value":"Chill"}"#).unwrap();
        assert_eq!(criteria.value(), Some("Chill"));
    }
}
