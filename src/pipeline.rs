// Offer selection and transformation.
//
// A user action selects one offer out of a (possibly merged) document. From
// that point on, every follow-up call must see only the owning airline's
// data, re-keyed to the canonical form the vendor expects in single-airline
// calls. The selection context derived here is the only state threaded
// through the follow-up chain; it is never mutated, only re-derived per
// stage.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::documents::{
    BaggageAllowance, Flight, FlightSegment, Offer, OriginDestination, PenaltyRecord,
    PricedDocument, ServiceDefinition, ShoppingDocument, Traveler,
};
use crate::keys::NamespacedKey;
use crate::resolver::{EntityCatalog, ReferenceTable};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("offer index {index} out of range, document has {available} offers")]
    OfferNotFound { index: usize, available: usize },

    #[error("offer {offer_id} has no resolvable owning airline")]
    MissingOfferOwner { offer_id: String },

    #[error("no shopping response id for airline {airline}")]
    MissingShoppingResponseId { airline: String },

    #[error("no flight segments resolved for offer {offer_id} of airline {airline}")]
    NoSegmentsResolved { offer_id: String, airline: String },
}

/// Derived once per user selection and threaded, unchanged, through every
/// downstream request about the selected offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionContext {
    pub offer_index: usize,
    pub owning_airline: String,
    pub shopping_response_id: String,
}

impl SelectionContext {
    pub fn derive(
        document: &ShoppingDocument,
        catalog: &EntityCatalog,
        offer_index: usize,
    ) -> Result<Self, PipelineError> {
        let offer = document
            .offer_at(offer_index)
            .ok_or(PipelineError::OfferNotFound {
                index: offer_index,
                available: document.offer_count(),
            })?;
        Self::for_offer(offer, catalog, offer_index)
    }

    pub fn derive_priced(
        document: &PricedDocument,
        catalog: &EntityCatalog,
        offer_index: usize,
    ) -> Result<Self, PipelineError> {
        let offer = document
            .offer_at(offer_index)
            .ok_or(PipelineError::OfferNotFound {
                index: offer_index,
                available: document.priced_offer.len(),
            })?;
        Self::for_offer(offer, catalog, offer_index)
    }

    fn for_offer(
        offer: &Offer,
        catalog: &EntityCatalog,
        offer_index: usize,
    ) -> Result<Self, PipelineError> {
        let owning_airline = owning_airline(offer, catalog)?;
        let shopping_response_id = catalog
            .shopping_response_id(&owning_airline)
            .ok_or_else(|| PipelineError::MissingShoppingResponseId {
                airline: owning_airline.clone(),
            })?
            .to_string();

        Ok(Self {
            offer_index,
            owning_airline,
            shopping_response_id,
        })
    }
}

/// Owning-airline extraction. `OfferID.Owner` is authoritative; failing
/// that, the operating carrier of the offer's first referenced segment,
/// then the marketing carrier. The operating carrier outranks the marketing
/// carrier for codeshare itineraries.
pub fn owning_airline(
    offer: &Offer,
    catalog: &EntityCatalog,
) -> Result<String, PipelineError> {
    if let Some(owner) = offer.offer_id.owner.as_deref() {
        let owner = owner.trim();
        if !owner.is_empty() {
            return Ok(owner.to_string());
        }
    }

    let first_segment = offer
        .offer_price
        .iter()
        .flat_map(|block| block.associations.iter())
        .filter_map(|assoc| assoc.applicable_flight.as_ref())
        .flat_map(|flight| flight.flight_segment_reference.iter())
        .find_map(|reference| catalog.segments.resolve(&reference.segment_ref, None));

    if let Some(segment) = first_segment {
        let carriers = [
            segment.operating_carrier.as_ref(),
            segment.marketing_carrier.as_ref(),
        ];
        for carrier in carriers.into_iter().flatten() {
            let code = carrier.airline_id.value.trim();
            if !code.is_empty() {
                return Ok(code.to_string());
            }
        }
    }

    Err(PipelineError::MissingOfferOwner {
        offer_id: offer.offer_id.value.clone(),
    })
}

/// The selected offer with every referenced entity resolved to the owning
/// airline and re-keyed to canonical form. All maps are ordered so the
/// serialized view (and every request built from it) is deterministic.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub context: SelectionContext,
    pub offer: Offer,
    pub price: PriceSummary,
    pub segments: BTreeMap<String, FlightSegment>,
    pub flights: BTreeMap<String, Flight>,
    pub origin_destinations: BTreeMap<String, OriginDestination>,
    pub travelers: BTreeMap<String, Traveler>,
    pub baggage: BTreeMap<String, BaggageAllowance>,
    pub services: BTreeMap<String, ServiceDefinition>,
    pub penalties: BTreeMap<String, PenaltyRecord>,
}

pub fn select_offer(
    document: &ShoppingDocument,
    catalog: &EntityCatalog,
    offer_index: usize,
) -> Result<OfferView, PipelineError> {
    let context = SelectionContext::derive(document, catalog, offer_index)?;
    let offer = document
        .offer_at(offer_index)
        .ok_or(PipelineError::OfferNotFound {
            index: offer_index,
            available: document.offer_count(),
        })?;
    resolve_offer(offer, catalog, &context)
}

pub fn select_priced_offer(
    document: &PricedDocument,
    catalog: &EntityCatalog,
    offer_index: usize,
) -> Result<OfferView, PipelineError> {
    let context = SelectionContext::derive_priced(document, catalog, offer_index)?;
    let offer = document
        .offer_at(offer_index)
        .ok_or(PipelineError::OfferNotFound {
            index: offer_index,
            available: document.priced_offer.len(),
        })?;
    resolve_offer(offer, catalog, &context)
}

pub fn resolve_offer(
    offer: &Offer,
    catalog: &EntityCatalog,
    context: &SelectionContext,
) -> Result<OfferView, PipelineError> {
    let airline = context.owning_airline.as_str();
    let refs = OfferReferences::collect(offer);

    // Records carry their own key field, which must match the canonical
    // map key in everything emitted downstream
    let segments: BTreeMap<String, FlightSegment> =
        filtered(&catalog.segments, airline, &refs.segments)
            .into_iter()
            .map(|(key, mut segment)| {
                segment.segment_key = key.clone();
                (key, segment)
            })
            .collect();
    if segments.is_empty() {
        return Err(PipelineError::NoSegmentsResolved {
            offer_id: offer.offer_id.value.clone(),
            airline: airline.to_string(),
        });
    }

    let flights: BTreeMap<String, Flight> = filtered(&catalog.flights, airline, &refs.flights)
        .into_iter()
        .map(|(key, mut flight)| {
            flight.flight_key = key.clone();
            (key, canonicalize_flight(flight))
        })
        .collect();
    let origin_destinations: BTreeMap<String, OriginDestination> =
        filtered(&catalog.origin_destinations, airline, &refs.origin_destinations)
            .into_iter()
            .map(|(key, mut od)| {
                od.origin_destination_key = key.clone();
                (key, canonicalize_origin_destination(od))
            })
            .collect();
    let travelers: BTreeMap<String, Traveler> =
        filtered(&catalog.travelers, airline, &refs.travelers)
            .into_iter()
            .map(|(key, mut traveler)| {
                traveler.object_key = key.clone();
                (key, traveler)
            })
            .collect();
    let penalties: BTreeMap<String, PenaltyRecord> =
        filtered(&catalog.penalties, airline, &refs.penalties)
            .into_iter()
            .map(|(key, mut penalty)| {
                penalty.object_key = key.clone();
                (key, penalty)
            })
            .collect();
    // Baggage and service pools carry no offer-level references in the
    // shopping shape; only the owning airline's partition survives.
    let baggage: BTreeMap<String, BaggageAllowance> =
        filtered(&catalog.baggage, airline, &BTreeSet::new())
            .into_iter()
            .map(|(key, mut allowance)| {
                allowance.list_key = key.clone();
                (key, allowance)
            })
            .collect();
    let services: BTreeMap<String, ServiceDefinition> =
        filtered(&catalog.services, airline, &BTreeSet::new())
            .into_iter()
            .map(|(key, mut service)| {
                service.object_key = key.clone();
                (key, service)
            })
            .collect();

    let price = aggregate_price(offer, catalog, airline);

    Ok(OfferView {
        context: context.clone(),
        offer: canonicalize_offer(offer),
        price,
        segments,
        flights,
        origin_destinations,
        travelers,
        baggage,
        services,
        penalties,
    })
}

// The owning airline's whole partition, re-keyed canonically, plus any
// referenced entities from the global partition. Cross-airline references
// are dropped: emitting them would leak another airline's data into a
// single-airline call.
fn filtered<T: Clone>(
    table: &ReferenceTable<T>,
    airline: &str,
    referenced: &BTreeSet<String>,
) -> BTreeMap<String, T> {
    let mut out = table.canonical_partition(airline);

    for raw in referenced {
        let key = NamespacedKey::parse(raw);
        match key.airline.as_deref() {
            Some(owner) if owner == airline => {
                if !out.contains_key(&key.local) {
                    warn!(
                        entity = table.kind().as_str(),
                        key = raw.as_str(),
                        "reference into the owning partition did not resolve"
                    );
                }
            }
            Some(other) => {
                warn!(
                    entity = table.kind().as_str(),
                    key = raw.as_str(),
                    foreign = other,
                    airline,
                    "dropping cross-airline reference"
                );
            }
            None => {
                if out.contains_key(&key.local) {
                    continue;
                }
                match table.global_get(&key.local) {
                    Some(record) => {
                        out.insert(key.local.clone(), record.clone());
                    }
                    None => warn!(
                        entity = table.kind().as_str(),
                        key = raw.as_str(),
                        airline,
                        "unresolved entity reference"
                    ),
                }
            }
        }
    }

    out
}

// Every key the selected offer points at, grouped by entity type, in the
// raw (possibly prefixed) form the document uses.
#[derive(Debug, Default)]
struct OfferReferences {
    segments: BTreeSet<String>,
    flights: BTreeSet<String>,
    origin_destinations: BTreeSet<String>,
    travelers: BTreeSet<String>,
    penalties: BTreeSet<String>,
}

impl OfferReferences {
    fn collect(offer: &Offer) -> Self {
        let mut refs = Self::default();

        for block in &offer.offer_price {
            for association in &block.associations {
                if let Some(travelers) = &association.associated_traveler {
                    refs.travelers
                        .extend(travelers.traveler_references.iter().cloned());
                }
                if let Some(flight) = &association.applicable_flight {
                    refs.flights.extend(flight.flight_references.iter().cloned());
                    refs.origin_destinations
                        .extend(flight.origin_destination_references.iter().cloned());
                    refs.segments.extend(
                        flight
                            .flight_segment_reference
                            .iter()
                            .map(|r| r.segment_ref.clone()),
                    );
                }
            }
            if let Some(fare) = &block.fare_detail {
                for component in &fare.fare_component {
                    refs.penalties.extend(component.penalty_refs.iter().cloned());
                }
            }
        }

        refs
    }
}

// ---------------------------------------------------------------------------
// Canonicalization: strip airline prefixes from every reference a record
// carries, so no emitted document contains a prefixed key anywhere.

fn strip_all(references: &mut Vec<String>) {
    for reference in references.iter_mut() {
        if NamespacedKey::is_prefixed(reference) {
            *reference = NamespacedKey::strip(reference).to_string();
        }
    }
}

pub fn canonicalize_offer(offer: &Offer) -> Offer {
    let mut offer = offer.clone();
    for block in &mut offer.offer_price {
        if let Some(item_id) = &mut block.offer_item_id {
            if NamespacedKey::is_prefixed(item_id) {
                *item_id = NamespacedKey::strip(item_id).to_string();
            }
        }
        for association in &mut block.associations {
            if let Some(travelers) = &mut association.associated_traveler {
                strip_all(&mut travelers.traveler_references);
            }
            if let Some(flight) = &mut association.applicable_flight {
                strip_all(&mut flight.flight_references);
                strip_all(&mut flight.origin_destination_references);
                for reference in &mut flight.flight_segment_reference {
                    if NamespacedKey::is_prefixed(&reference.segment_ref) {
                        reference.segment_ref =
                            NamespacedKey::strip(&reference.segment_ref).to_string();
                    }
                }
            }
        }
        if let Some(fare) = &mut block.fare_detail {
            for component in &mut fare.fare_component {
                strip_all(&mut component.penalty_refs);
            }
        }
    }
    offer
}

fn canonicalize_flight(mut flight: Flight) -> Flight {
    strip_all(&mut flight.segment_references.value);
    flight
}

fn canonicalize_origin_destination(mut od: OriginDestination) -> OriginDestination {
    strip_all(&mut od.flight_references.value);
    od
}

// ---------------------------------------------------------------------------
// Price aggregation

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub currency: String,
    pub total: f64,
    pub lines: Vec<PriceLine>,
}

/// One line per Passenger Type Code price block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub ptc: Option<String>,
    pub per_passenger: f64,
    pub traveler_count: usize,
    pub subtotal: f64,
}

/// Total = Σ per-passenger price × unique traveler count per block. Round
/// trips repeat the same traveler reference once per directional leg, so
/// the count deduplicates canonical traveler keys across all of a block's
/// associations.
pub fn aggregate_price(offer: &Offer, catalog: &EntityCatalog, airline: &str) -> PriceSummary {
    let mut currency = String::new();
    let mut total = 0.0;
    let mut lines = Vec::with_capacity(offer.offer_price.len());

    for block in &offer.offer_price {
        let unique: BTreeSet<&str> = block
            .associations
            .iter()
            .filter_map(|assoc| assoc.associated_traveler.as_ref())
            .flat_map(|travelers| travelers.traveler_references.iter())
            .map(|reference| NamespacedKey::strip(reference))
            .collect();
        // A block with no traveler association still prices one passenger
        let traveler_count = unique.len().max(1);

        let per_passenger = block
            .price_detail
            .as_ref()
            .map(|price| price.total_amount.value)
            .unwrap_or(0.0);
        if currency.is_empty() {
            if let Some(price) = &block.price_detail {
                currency = price.total_amount.code.clone();
            }
        }

        let ptc = unique
            .iter()
            .next()
            .and_then(|reference| catalog.travelers.resolve(reference, Some(airline)))
            .and_then(|traveler| traveler.ptc.as_ref())
            .map(|ptc| ptc.value.clone());

        let subtotal = per_passenger * traveler_count as f64;
        total += subtotal;
        lines.push(PriceLine {
            ptc,
            per_passenger,
            traveler_count,
            subtotal,
        });
    }

    if currency.is_empty() {
        if let Some(price) = &offer.total_price {
            currency = price.total_amount.code.clone();
        }
    }

    PriceSummary {
        currency,
        total,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{
        Amount, ApplicableFlight, AssociatedTraveler, Association, Carrier,
        FlightSegmentReference, KeyedValue, OfferId, OfferPrice, PriceDetail,
        SAMPLE_MULTI_AIRLINE_SHOPPING,
    };

    fn sample() -> (ShoppingDocument, EntityCatalog) {
        let doc: ShoppingDocument =
            serde_json::from_str(SAMPLE_MULTI_AIRLINE_SHOPPING).unwrap();
        let catalog = EntityCatalog::build(&doc);
        (doc, catalog)
    }

    fn offer_with_segment_ref(owner: Option<&str>, segment_ref: &str) -> Offer {
        Offer {
            offer_id: OfferId {
                value: "OFFER-X".to_string(),
                owner: owner.map(str::to_string),
                channel: None,
            },
            offer_price: vec![OfferPrice {
                associations: vec![Association {
                    associated_traveler: Some(AssociatedTraveler {
                        traveler_references: vec!["PAX1".to_string()],
                    }),
                    applicable_flight: Some(ApplicableFlight {
                        flight_segment_reference: vec![FlightSegmentReference {
                            segment_ref: segment_ref.to_string(),
                            class_of_service: None,
                        }],
                        ..Default::default()
                    }),
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_selecting_kq_offer_yields_only_canonical_kq_entities() {
        let (doc, catalog) = sample();
        let view = select_offer(&doc, &catalog, 0).unwrap();

        assert_eq!(view.context.owning_airline, "KQ");
        assert_eq!(view.context.shopping_response_id, "SRID-KQ77001");

        let segment_keys: Vec<&str> = view.segments.keys().map(String::as_str).collect();
        assert_eq!(segment_keys, vec!["SEG1", "SEG2"]);
        let traveler_keys: Vec<&str> = view.travelers.keys().map(String::as_str).collect();
        assert_eq!(traveler_keys, vec!["PAX1"]);

        // The whole view, serialized, must be prefix-free and AF-free
        let serialized = serde_json::to_string(&view).unwrap();
        assert!(!serialized.contains("KQ-"));
        assert!(!serialized.contains("AF-"));
    }

    #[test]
    fn test_no_entity_loss_from_owning_partition() {
        let (doc, catalog) = sample();
        let view = select_offer(&doc, &catalog, 0).unwrap();

        assert_eq!(
            view.segments.len(),
            catalog.segments.canonical_partition("KQ").len()
        );
        assert_eq!(
            view.origin_destinations.len(),
            catalog.origin_destinations.canonical_partition("KQ").len()
        );
        assert_eq!(
            view.flights.len(),
            catalog.flights.canonical_partition("KQ").len()
        );

        // References inside kept records are canonical too
        let flight = view.flights.get("FLT1").unwrap();
        assert_eq!(flight.segment_references.value, vec!["SEG1"]);
        let od = view.origin_destinations.get("OD1").unwrap();
        assert_eq!(od.flight_references.value, vec!["FLT1"]);
    }

    #[test]
    fn test_selecting_af_offer_threads_af_response_id() {
        let (doc, catalog) = sample();
        let view = select_offer(&doc, &catalog, 1).unwrap();

        assert_eq!(view.context.owning_airline, "AF");
        assert_eq!(view.context.shopping_response_id, "SRID-AF31442");
        assert_eq!(view.segments.len(), 1);
        assert!(view.segments.contains_key("SEG1"));
        assert!(view.penalties.contains_key("PEN1"));
    }

    #[test]
    fn test_round_trip_travelers_are_deduplicated() {
        let (doc, catalog) = sample();
        let view = select_offer(&doc, &catalog, 0).unwrap();

        // Two associations (outbound + return) both reference KQ-PAX1
        assert_eq!(view.price.lines.len(), 1);
        let line = &view.price.lines[0];
        assert_eq!(line.traveler_count, 1);
        assert_eq!(line.ptc.as_deref(), Some("ADT"));
        assert_eq!(view.price.total, 390.25);
        assert_eq!(view.price.currency, "USD");
    }

    #[test]
    fn test_naive_per_association_sum_would_double_count() {
        let (doc, catalog) = sample();
        let offer = doc.offer_at(0).unwrap();

        let per_association: usize = offer.offer_price[0]
            .associations
            .iter()
            .filter_map(|a| a.associated_traveler.as_ref())
            .map(|t| t.traveler_references.len())
            .sum();
        assert_eq!(per_association, 2);

        let summary = aggregate_price(offer, &catalog, "KQ");
        assert_eq!(summary.lines[0].traveler_count, 1);
    }

    #[test]
    fn test_multi_ptc_aggregation() {
        let (_, catalog) = sample();
        let mut offer = offer_with_segment_ref(Some("KQ"), "KQ-SEG1");
        offer.offer_price[0].price_detail = Some(PriceDetail {
            total_amount: Amount {
                value: 200.0,
                code: "USD".to_string(),
            },
            ..Default::default()
        });
        offer.offer_price[0].associations[0]
            .associated_traveler
            .as_mut()
            .unwrap()
            .traveler_references = vec!["KQ-PAX1".to_string(), "KQ-PAX2".to_string()];
        // Second block: one child at a lower fare
        let mut child_block = offer.offer_price[0].clone();
        child_block.price_detail = Some(PriceDetail {
            total_amount: Amount {
                value: 150.0,
                code: "USD".to_string(),
            },
            ..Default::default()
        });
        child_block.associations[0]
            .associated_traveler
            .as_mut()
            .unwrap()
            .traveler_references = vec!["KQ-PAX3".to_string()];
        offer.offer_price.push(child_block);

        let summary = aggregate_price(&offer, &catalog, "KQ");
        assert_eq!(summary.lines[0].traveler_count, 2);
        assert_eq!(summary.lines[1].traveler_count, 1);
        assert_eq!(summary.total, 2.0 * 200.0 + 150.0);
    }

    #[test]
    fn test_owner_falls_back_to_operating_then_marketing_carrier() {
        let (_, catalog) = sample();

        // KQ-SEG1 carries both carriers; operating wins
        let offer = offer_with_segment_ref(None, "KQ-SEG1");
        assert_eq!(owning_airline(&offer, &catalog).unwrap(), "KQ");

        // A segment with only a marketing carrier
        let mut doc = ShoppingDocument::default();
        doc.data_lists.flight_segment_list.segments.push(FlightSegment {
            segment_key: "SEG9".to_string(),
            marketing_carrier: Some(Carrier {
                airline_id: KeyedValue::new("ET"),
                ..Default::default()
            }),
            ..Default::default()
        });
        let catalog = EntityCatalog::build(&doc);
        let offer = offer_with_segment_ref(None, "SEG9");
        assert_eq!(owning_airline(&offer, &catalog).unwrap(), "ET");
    }

    #[test]
    fn test_missing_owner_is_an_error() {
        let catalog = EntityCatalog::build(&ShoppingDocument::default());
        let offer = offer_with_segment_ref(None, "SEG1");

        let err = owning_airline(&offer, &catalog).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingOfferOwner {
                offer_id: "OFFER-X".to_string()
            }
        );
    }

    #[test]
    fn test_offer_not_found_carries_available_count() {
        let (doc, catalog) = sample();
        let err = select_offer(&doc, &catalog, 7).unwrap_err();
        assert_eq!(
            err,
            PipelineError::OfferNotFound {
                index: 7,
                available: 2
            }
        );
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("2 offers"));
    }

    #[test]
    fn test_missing_response_id_is_fatal() {
        let mut doc = ShoppingDocument::default();
        doc.data_lists.flight_segment_list.segments.push(FlightSegment {
            segment_key: "KQ-SEG1".to_string(),
            ..Default::default()
        });
        let mut group = crate::documents::AirlineOffers::default();
        group
            .airline_offer
            .push(offer_with_segment_ref(Some("KQ"), "KQ-SEG1"));
        doc.offers_group.airline_offers.push(group);

        let catalog = EntityCatalog::build(&doc);
        let err = select_offer(&doc, &catalog, 0).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingShoppingResponseId {
                airline: "KQ".to_string()
            }
        );
    }

    #[test]
    fn test_zero_resolved_segments_is_fatal() {
        let mut doc = ShoppingDocument::default();
        doc.shopping_response_id = Some(crate::documents::TransactionId {
            response_id: KeyedValue::new("SRID-1"),
        });
        let mut group = crate::documents::AirlineOffers::default();
        group
            .airline_offer
            .push(offer_with_segment_ref(Some("KQ"), "SEG-MISSING"));
        doc.offers_group.airline_offers.push(group);

        let catalog = EntityCatalog::build(&doc);
        let err = select_offer(&doc, &catalog, 0).unwrap_err();
        assert!(matches!(err, PipelineError::NoSegmentsResolved { .. }));
    }

    #[test]
    fn test_transformation_is_idempotent() {
        let (doc, catalog) = sample();

        let first = serde_json::to_string(&select_offer(&doc, &catalog, 0).unwrap()).unwrap();
        let second = serde_json::to_string(&select_offer(&doc, &catalog, 0).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
