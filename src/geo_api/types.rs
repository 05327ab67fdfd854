use serde::{Deserialize, Serialize};

/// Subset of the geolocation payload the service reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeoLocation {
    pub city: Option<String>,
    pub country_name: Option<String>,
}

impl GeoLocation {
    pub fn city_or_unknown(&self) -> &str {
        self.city.as_deref().unwrap_or("unknown")
    }

    pub fn country_or_unknown(&self) -> &str {
        self.country_name.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::GeoLocation;

    #[test]
    fn deserializes_location() {
        let serialized = r#"{"ip":"8.8.8.8","country_name":"United States","city":"Mountain View","latitude":"37.42240"}"#;
        let location: GeoLocation = serde_json::from_str(serialized).expect("failed to deserialize");

        assert_eq!(location.city_or_unknown(), "Mountain View");
        assert_eq!(location.country_or_unknown(), "United States");
    }

    #[test]
    fn missing_fields_are_unknown() {
        let location: GeoLocation = serde_json::from_str(r#"{"ip":"10.0.0.1"}"#).unwrap();
        assert_eq!(location.city_or_unknown(), "unknown");
        assert_eq!(location.country_or_unknown(), "unknown");
    }
}
