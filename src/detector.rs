// Airline multiplexing detection.
//
// A shopping response either carries one airline's offers in canonical form
// or merges several airlines into one document, in which case a subset of
// entity keys is airline-prefixed and the metadata block carries one
// transaction id per airline. Everything downstream branches on this, so
// detection runs first and exactly once per document.
//
// Detection is biased toward the single-airline path: evidence that cannot
// be interpreted is skipped (logged at debug), never escalated. A missed
// multi-airline document degrades to the simpler code path; a false
// positive would mis-partition every entity table.

use std::collections::BTreeSet;

use tracing::debug;

use crate::documents::{
    DataLists, DocumentMetadata, DocumentNote, PricedDocument, ShoppingDocument,
};
use crate::keys::{self, NamespacedKey};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AirlineDetection {
    pub is_multi_airline: bool,
    /// Distinct airline designators found, sorted.
    pub airline_codes: Vec<String>,
}

impl AirlineDetection {
    pub fn single_airline() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.airline_codes.iter().any(|c| c == code)
    }
}

pub fn detect(document: &ShoppingDocument) -> AirlineDetection {
    let notes: Vec<&DocumentNote> = document.warnings.iter().chain(&document.errors).collect();
    detect_parts(&document.data_lists, &notes, document.metadata.as_ref())
}

/// Pricing responses can recur in the same merged shape, so each downstream
/// stage re-runs detection against its own input document.
pub fn detect_priced(document: &PricedDocument) -> AirlineDetection {
    let notes: Vec<&DocumentNote> = document.warnings.iter().chain(&document.errors).collect();
    detect_parts(&document.data_lists, &notes, document.metadata.as_ref())
}

pub(crate) fn detect_parts(
    data_lists: &DataLists,
    notes: &[&DocumentNote],
    metadata: Option<&DocumentMetadata>,
) -> AirlineDetection {
    let mut codes = BTreeSet::new();

    let any_prefixed_key = collect_prefixed_key_codes(data_lists, &mut codes);
    let distinct_note_owners = collect_note_owners(notes, &mut codes);
    let distinct_metadata_owners = collect_metadata_owners(metadata, &mut codes);

    let is_multi_airline =
        any_prefixed_key || distinct_note_owners > 1 || distinct_metadata_owners > 1;

    AirlineDetection {
        is_multi_airline,
        airline_codes: codes.into_iter().collect(),
    }
}

// Source (a): airline-prefixed keys among travelers and flight segments.
// A single prefixed key is already conclusive.
fn collect_prefixed_key_codes(data_lists: &DataLists, codes: &mut BTreeSet<String>) -> bool {
    let traveler_keys = data_lists
        .anonymous_traveler_list
        .travelers
        .iter()
        .map(|t| t.object_key.as_str());
    let segment_keys = data_lists
        .flight_segment_list
        .segments
        .iter()
        .map(|s| s.segment_key.as_str());

    let mut found = false;
    for key in traveler_keys.chain(segment_keys) {
        if let Some(code) = NamespacedKey::airline_of(key) {
            codes.insert(code.to_string());
            found = true;
        }
    }
    found
}

// Source (b): warning/error owners. Only multiple distinct owners indicate
// a merged document; a single owner is normal for any response.
fn collect_note_owners(notes: &[&DocumentNote], codes: &mut BTreeSet<String>) -> usize {
    let mut owners = BTreeSet::new();
    for note in notes {
        match note.owner.as_deref() {
            Some(owner) if keys::looks_like_airline_code(owner) => {
                owners.insert(owner.to_string());
                codes.insert(owner.to_string());
            }
            Some(owner) => {
                debug!(owner, "skipping note owner that is not an airline designator");
            }
            None => {}
        }
    }
    owners.len()
}

// Source (c): per-airline shopping-response-id entries in the metadata
// block, one per merged airline.
fn collect_metadata_owners(
    metadata: Option<&DocumentMetadata>,
    codes: &mut BTreeSet<String>,
) -> usize {
    let Some(metadata) = metadata else {
        return 0;
    };

    let mut owners = BTreeSet::new();
    for entry in &metadata.shopping_response_ids {
        if keys::looks_like_airline_code(&entry.owner) {
            owners.insert(entry.owner.clone());
            codes.insert(entry.owner.clone());
        } else {
            debug!(
                owner = %entry.owner,
                "skipping metadata response id with malformed owner"
            );
        }
    }
    owners.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{
        AirlineResponseId, FlightSegment, KeyedValue, Traveler, SAMPLE_MULTI_AIRLINE_SHOPPING,
    };

    fn traveler(key: &str) -> Traveler {
        Traveler {
            object_key: key.to_string(),
            ..Default::default()
        }
    }

    fn segment(key: &str) -> FlightSegment {
        FlightSegment {
            segment_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_detects_merged_document_from_sample() {
        let doc: ShoppingDocument =
            serde_json::from_str(SAMPLE_MULTI_AIRLINE_SHOPPING).unwrap();
        let detection = detect(&doc);

        assert!(detection.is_multi_airline);
        assert_eq!(detection.airline_codes, vec!["AF", "KQ"]);
    }

    #[test]
    fn test_single_airline_document_stays_single() {
        let mut doc = ShoppingDocument::default();
        doc.data_lists
            .anonymous_traveler_list
            .travelers
            .push(traveler("PAX1"));
        doc.data_lists
            .flight_segment_list
            .segments
            .push(segment("SEG1"));

        let detection = detect(&doc);
        assert!(!detection.is_multi_airline);
        assert!(detection.airline_codes.is_empty());
    }

    #[test]
    fn test_one_prefixed_key_is_conclusive() {
        let mut doc = ShoppingDocument::default();
        doc.data_lists
            .anonymous_traveler_list
            .travelers
            .push(traveler("KQ-PAX1"));

        let detection = detect(&doc);
        assert!(detection.is_multi_airline);
        assert_eq!(detection.airline_codes, vec!["KQ"]);
    }

    #[test]
    fn test_single_warning_owner_is_not_multi() {
        let mut doc = ShoppingDocument::default();
        doc.warnings.push(DocumentNote {
            owner: Some("KQ".to_string()),
            ..Default::default()
        });

        let detection = detect(&doc);
        assert!(!detection.is_multi_airline);
        // The code itself is still collected for the resolver
        assert_eq!(detection.airline_codes, vec!["KQ"]);
    }

    #[test]
    fn test_two_warning_owners_are_multi() {
        let mut doc = ShoppingDocument::default();
        for owner in ["KQ", "AF"] {
            doc.warnings.push(DocumentNote {
                owner: Some(owner.to_string()),
                ..Default::default()
            });
        }

        let detection = detect(&doc);
        assert!(detection.is_multi_airline);
        assert_eq!(detection.airline_codes, vec!["AF", "KQ"]);
    }

    #[test]
    fn test_metadata_response_ids_are_multi() {
        let mut doc = ShoppingDocument::default();
        let mut metadata = crate::documents::DocumentMetadata::default();
        for owner in ["KQ", "AF"] {
            metadata.shopping_response_ids.push(AirlineResponseId {
                owner: owner.to_string(),
                response_id: KeyedValue::new(format!("SRID-{owner}")),
            });
        }
        doc.metadata = Some(metadata);

        let detection = detect(&doc);
        assert!(detection.is_multi_airline);
        assert_eq!(detection.airline_codes, vec!["AF", "KQ"]);
    }

    #[test]
    fn test_malformed_evidence_degrades_to_single() {
        let mut doc = ShoppingDocument::default();
        // Owners that are not airline designators must be ignored, not
        // counted as distinct airlines
        for owner in ["gateway", "UPSTREAM_TIMEOUT"] {
            doc.warnings.push(DocumentNote {
                owner: Some(owner.to_string()),
                ..Default::default()
            });
        }

        let detection = detect(&doc);
        assert!(!detection.is_multi_airline);
        assert!(detection.airline_codes.is_empty());
    }
}
