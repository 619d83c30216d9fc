// Airline-namespaced entity keys.
//
// Merged multi-airline responses prefix a subset of entity keys with the
// owning airline's designator ("KQ-SEG1"); unprefixed keys are shared across
// the document. Keys are parsed once into this tagged form so "belongs to
// airline X" is a structural property instead of a repeated string check.

/// A raw entity key split into its optional airline namespace and the
/// canonical local identifier the vendor expects in single-airline calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    pub airline: Option<String>,
    pub local: String,
}

impl NamespacedKey {
    pub fn parse(raw: &str) -> Self {
        match split_airline_prefix(raw) {
            Some((code, local)) => Self {
                airline: Some(code.to_string()),
                local: local.to_string(),
            },
            None => Self {
                airline: None,
                local: raw.to_string(),
            },
        }
    }

    /// The key as the vendor wrote it.
    pub fn raw(&self) -> String {
        match &self.airline {
            Some(code) => format!("{}-{}", code, self.local),
            None => self.local.clone(),
        }
    }

    pub fn is_prefixed(raw: &str) -> bool {
        split_airline_prefix(raw).is_some()
    }

    /// Canonical (prefix-free) form of a raw key, without allocating when
    /// the key is already canonical.
    pub fn strip(raw: &str) -> &str {
        match split_airline_prefix(raw) {
            Some((_, local)) => local,
            None => raw,
        }
    }

    /// The airline designator of a prefixed key, if any.
    pub fn airline_of(raw: &str) -> Option<&str> {
        split_airline_prefix(raw).map(|(code, _)| code)
    }
}

/// Whether a string has the shape of an IATA airline designator: two or
/// three characters, uppercase alphanumeric, at least one letter ("KQ",
/// "AF", "U2", "3U").
pub fn looks_like_airline_code(code: &str) -> bool {
    (2..=3).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && code.chars().any(|c| c.is_ascii_uppercase())
}

fn split_airline_prefix(raw: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = raw.split_once('-')?;
    if looks_like_airline_code(prefix) && !rest.is_empty() {
        Some((prefix, rest))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_key() {
        let key = NamespacedKey::parse("KQ-SEG1");
        assert_eq!(key.airline.as_deref(), Some("KQ"));
        assert_eq!(key.local, "SEG1");
        assert_eq!(key.raw(), "KQ-SEG1");
    }

    #[test]
    fn test_parse_unprefixed_key() {
        let key = NamespacedKey::parse("SEG1");
        assert_eq!(key.airline, None);
        assert_eq!(key.local, "SEG1");
        assert_eq!(key.raw(), "SEG1");
    }

    #[test]
    fn test_digit_bearing_designators() {
        // "U2" and "3U" are real designators; "12" is not one
        assert_eq!(NamespacedKey::airline_of("U2-SEG1"), Some("U2"));
        assert_eq!(NamespacedKey::airline_of("3U-PAX2"), Some("3U"));
        assert_eq!(NamespacedKey::airline_of("12-SEG1"), None);
    }

    #[test]
    fn test_non_designator_prefixes_stay_whole() {
        // Lowercase, too long, or empty remainder: not a namespace
        assert!(!NamespacedKey::is_prefixed("kq-SEG1"));
        assert!(!NamespacedKey::is_prefixed("KLMX-SEG1"));
        assert!(!NamespacedKey::is_prefixed("KQ-"));
        assert_eq!(NamespacedKey::strip("KLMX-SEG1"), "KLMX-SEG1");
    }

    #[test]
    fn test_strip_is_allocation_free_for_canonical_keys() {
        let raw = "SEG1";
        assert!(std::ptr::eq(NamespacedKey::strip(raw), raw));
        assert_eq!(NamespacedKey::strip("AF-OD2"), "OD2");
    }
}
