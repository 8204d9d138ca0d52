//! Static city and locality reference data.
//!
//! The web client sends structured `cityId:localityId` pairs; Telegram users
//! are offered the default served location instead.

/// A locality inside a served city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locality {
    /// Stable id used by the web client.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
}

/// A served city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    /// Stable id used by the web client.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Localities inside the city.
    pub localities: &'static [Locality],
}

/// A city (and optional locality) resolved from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// City display name.
    pub city: String,
    /// Locality display name, when one was picked.
    pub locality: Option<String>,
}

impl ResolvedLocation {
    /// "Beltola, Guwahati" or just "Guwahati".
    pub fn display(&self) -> String {
        match &self.locality {
            Some(locality) => format!("{}, {}", locality, self.city),
            None => self.city.clone(),
        }
    }
}

const GUWAHATI_LOCALITIES: &[Locality] = &[
    Locality { id: "beltola", name: "Beltola" },
    Locality { id: "ganeshguri", name: "Ganeshguri" },
    Locality { id: "dispur", name: "Dispur" },
    Locality { id: "six-mile", name: "Six Mile" },
    Locality { id: "zoo-road", name: "Zoo Road" },
    Locality { id: "paltan-bazaar", name: "Paltan Bazaar" },
];

const CITIES: &[City] = &[City {
    id: "guwahati",
    name: "Guwahati",
    localities: GUWAHATI_LOCALITIES,
}];

/// Lookup over the served cities.
#[derive(Debug, Clone)]
pub struct LocationCatalog {
    cities: &'static [City],
}

impl Default for LocationCatalog {
    fn default() -> Self {
        Self { cities: CITIES }
    }
}

impl LocationCatalog {
    /// Catalog of the currently served cities.
    pub fn new() -> Self {
        Self::default()
    }

    /// All served cities.
    pub fn cities(&self) -> &[City] {
        self.cities
    }

    /// The location offered to Telegram buyers.
    pub fn default_location(&self) -> ResolvedLocation {
        let city = self.cities.first().map_or("Guwahati", |c| c.name);
        ResolvedLocation {
            city: city.to_string(),
            locality: None,
        }
    }

    /// Resolve a `cityId:localityId` pair (ids are case-insensitive).
    ///
    /// Returns `None` for anything that isn't a known pair, so callers can
    /// fall back to treating the input as a plain city name.
    pub fn resolve(&self, input: &str) -> Option<ResolvedLocation> {
        let (city_id, locality_id) = input.trim().split_once(':')?;
        let city = self
            .cities
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(city_id.trim()))?;
        let locality = city
            .localities
            .iter()
            .find(|l| l.id.eq_ignore_ascii_case(locality_id.trim()))?;
        Some(ResolvedLocation {
            city: city.name.to_string(),
            locality: Some(locality.name.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_pair() {
        let catalog = LocationCatalog::new();
        let resolved = catalog.resolve("guwahati:beltola").unwrap();
        assert_eq!(resolved.city, "Guwahati");
        assert_eq!(resolved.locality.as_deref(), Some("Beltola"));
        assert_eq!(resolved.display(), "Beltola, Guwahati");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let catalog = LocationCatalog::new();
        assert!(catalog.resolve("Guwahati:SIX-MILE").is_some());
    }

    #[test]
    fn test_resolve_unknown_inputs() {
        let catalog = LocationCatalog::new();
        assert!(catalog.resolve("guwahati:nowhere").is_none());
        assert!(catalog.resolve("mumbai:bandra").is_none());
        assert!(catalog.resolve("Guwahati").is_none());
    }

    #[test]
    fn test_default_location() {
        let location = LocationCatalog::new().default_location();
        assert_eq!(location.city, "Guwahati");
        assert_eq!(location.locality, None);
    }
}
