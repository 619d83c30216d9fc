// Namespaced reference resolution.
//
// Every vendor document cross-references its entity pools (segments,
// travelers, flights, origin-destinations, baggage, services, penalties) by
// string key. In merged multi-airline documents those keys are partly
// airline-prefixed, so each entity type gets a reference table partitioned
// by airline, with a global partition for shared (unprefixed) records. The
// catalog also carries the per-airline transaction id map that every
// downstream call must echo unchanged.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::detector::AirlineDetection;
use crate::documents::{
    BaggageAllowance, DataLists, DocumentMetadata, Flight, FlightSegment, OriginDestination,
    PenaltyRecord, PricedDocument, SeatAvailabilityDocument, ServiceDefinition,
    ServiceListDocument, ShoppingDocument, Traveler, TransactionId,
};
use crate::keys::NamespacedKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    FlightSegment,
    Flight,
    OriginDestination,
    Traveler,
    BaggageAllowance,
    Service,
    Penalty,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::FlightSegment => "flight segment",
            EntityKind::Flight => "flight",
            EntityKind::OriginDestination => "origin-destination",
            EntityKind::Traveler => "traveler",
            EntityKind::BaggageAllowance => "baggage allowance",
            EntityKind::Service => "service",
            EntityKind::Penalty => "penalty",
        }
    }
}

/// Lookup table for one entity type. Prefixed keys land in their airline's
/// partition under the canonical (stripped) key; unprefixed keys land in the
/// global partition. Partitions of different airlines may reuse the same
/// local key ("KQ-SEG1" and "AF-SEG1" both strip to "SEG1"); only one
/// partition is ever emitted downstream, so the canonical keys stay unique
/// where it matters.
#[derive(Debug, Clone)]
pub struct ReferenceTable<T> {
    kind: EntityKind,
    global: HashMap<String, T>,
    by_airline: HashMap<String, HashMap<String, T>>,
}

impl<T: Clone> ReferenceTable<T> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            global: HashMap::new(),
            by_airline: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn insert(&mut self, raw_key: &str, record: T) {
        let key = NamespacedKey::parse(raw_key);
        let partition = match key.airline {
            Some(airline) => self.by_airline.entry(airline).or_default(),
            None => &mut self.global,
        };
        if partition.insert(key.local, record).is_some() {
            warn!(
                entity = self.kind.as_str(),
                key = raw_key,
                "duplicate entity key, keeping the later record"
            );
        }
    }

    /// Resolution order: the key's own namespace is authoritative when
    /// present; otherwise the caller's airline partition, then the global
    /// partition, then a last-resort scan across all partitions (diagnostic
    /// only, never needed for a well-formed document).
    pub fn resolve(&self, raw_key: &str, airline: Option<&str>) -> Option<&T> {
        let key = NamespacedKey::parse(raw_key);

        if let Some(owner) = &key.airline {
            if let Some(record) = self
                .by_airline
                .get(owner.as_str())
                .and_then(|p| p.get(&key.local))
            {
                return Some(record);
            }
        }

        if let Some(code) = airline {
            if let Some(record) = self.by_airline.get(code).and_then(|p| p.get(&key.local)) {
                return Some(record);
            }
        }

        if let Some(record) = self.global.get(&key.local) {
            return Some(record);
        }

        for (code, partition) in &self.by_airline {
            if let Some(record) = partition.get(&key.local) {
                debug!(
                    entity = self.kind.as_str(),
                    key = raw_key,
                    partition = code.as_str(),
                    "resolved via cross-partition scan"
                );
                return Some(record);
            }
        }

        None
    }

    /// Copy of one airline's partition, already keyed canonically. Sorted
    /// so emitted documents are deterministic.
    pub fn canonical_partition(&self, airline: &str) -> BTreeMap<String, T> {
        self.by_airline
            .get(airline)
            .map(|partition| {
                partition
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn global_get(&self, key: &str) -> Option<&T> {
        self.global.get(key)
    }

    pub fn airline_codes(&self) -> impl Iterator<Item = &str> {
        self.by_airline.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.by_airline.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference tables for every entity type of one vendor document, plus the
/// transaction ids the vendor requires on follow-up calls.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    pub detection: AirlineDetection,
    pub segments: ReferenceTable<FlightSegment>,
    pub flights: ReferenceTable<Flight>,
    pub origin_destinations: ReferenceTable<OriginDestination>,
    pub travelers: ReferenceTable<Traveler>,
    pub baggage: ReferenceTable<BaggageAllowance>,
    pub services: ReferenceTable<ServiceDefinition>,
    pub penalties: ReferenceTable<PenaltyRecord>,
    response_ids_by_airline: HashMap<String, String>,
    document_response_id: Option<String>,
}

impl EntityCatalog {
    /// Builds the catalog for a shopping response, running detection first.
    pub fn build(document: &ShoppingDocument) -> Self {
        let detection = crate::detector::detect(document);
        Self::from_shopping(document, &detection)
    }

    pub fn from_shopping(document: &ShoppingDocument, detection: &AirlineDetection) -> Self {
        Self::from_parts(
            &document.data_lists,
            document.shopping_response_id.as_ref(),
            document.metadata.as_ref(),
            detection,
        )
    }

    pub fn from_priced(document: &PricedDocument, detection: &AirlineDetection) -> Self {
        Self::from_parts(
            &document.data_lists,
            document.shopping_response_id.as_ref(),
            document.metadata.as_ref(),
            detection,
        )
    }

    pub fn from_seat_availability(
        document: &SeatAvailabilityDocument,
        detection: &AirlineDetection,
    ) -> Self {
        Self::from_parts(
            &document.data_lists,
            document.shopping_response_id.as_ref(),
            None,
            detection,
        )
    }

    pub fn from_service_list(
        document: &ServiceListDocument,
        detection: &AirlineDetection,
    ) -> Self {
        Self::from_parts(
            &document.data_lists,
            document.shopping_response_id.as_ref(),
            None,
            detection,
        )
    }

    fn from_parts(
        data_lists: &DataLists,
        response_id: Option<&TransactionId>,
        metadata: Option<&DocumentMetadata>,
        detection: &AirlineDetection,
    ) -> Self {
        let mut segments = ReferenceTable::new(EntityKind::FlightSegment);
        for segment in &data_lists.flight_segment_list.segments {
            segments.insert(&segment.segment_key, segment.clone());
        }

        let mut flights = ReferenceTable::new(EntityKind::Flight);
        for flight in &data_lists.flight_list.flights {
            flights.insert(&flight.flight_key, flight.clone());
        }

        let mut origin_destinations = ReferenceTable::new(EntityKind::OriginDestination);
        for od in &data_lists.origin_destination_list.origin_destinations {
            origin_destinations.insert(&od.origin_destination_key, od.clone());
        }

        let mut travelers = ReferenceTable::new(EntityKind::Traveler);
        for traveler in &data_lists.anonymous_traveler_list.travelers {
            travelers.insert(&traveler.object_key, traveler.clone());
        }

        let mut baggage = ReferenceTable::new(EntityKind::BaggageAllowance);
        for allowance in &data_lists.checked_bag_allowance_list.allowances {
            baggage.insert(&allowance.list_key, allowance.clone());
        }

        let mut services = ReferenceTable::new(EntityKind::Service);
        for service in &data_lists.service_definition_list.services {
            services.insert(&service.object_key, service.clone());
        }

        let mut penalties = ReferenceTable::new(EntityKind::Penalty);
        for penalty in &data_lists.penalty_list.penalties {
            penalties.insert(&penalty.object_key, penalty.clone());
        }

        let mut response_ids_by_airline = HashMap::new();
        if let Some(metadata) = metadata {
            for entry in &metadata.shopping_response_ids {
                let id = entry.response_id.value.trim();
                if entry.owner.is_empty() || id.is_empty() {
                    debug!(
                        owner = %entry.owner,
                        "skipping metadata response id without owner or value"
                    );
                    continue;
                }
                response_ids_by_airline.insert(entry.owner.clone(), id.to_string());
            }
        }

        let document_response_id = response_id
            .map(|id| id.response_id.value.trim().to_string())
            .filter(|id| !id.is_empty());

        Self {
            detection: detection.clone(),
            segments,
            flights,
            origin_destinations,
            travelers,
            baggage,
            services,
            penalties,
            response_ids_by_airline,
            document_response_id,
        }
    }

    /// The transaction id the vendor expects on every follow-up call about
    /// this airline's offers: the airline's own metadata entry when the
    /// document is merged, otherwise the document-level id.
    pub fn shopping_response_id(&self, airline: &str) -> Option<&str> {
        self.response_ids_by_airline
            .get(airline)
            .map(String::as_str)
            .or(self.document_response_id.as_deref())
    }

    pub fn is_multi_airline(&self) -> bool {
        self.detection.is_multi_airline
    }
}
