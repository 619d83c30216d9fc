// Request bodies for the follow-up vendor calls.
//
// Pricing consumes the shopping selection; seat availability and service
// list consume the pricing response; order creation consumes the pricing
// response plus whatever the seat/service stages surfaced. Every builder
// re-derives the owning airline from its own input document, because the
// merged multi-airline shape can recur at each hop. Emitted bodies carry
// canonical (prefix-free) keys only.

use serde::Serialize;
use tracing::warn;

use crate::detector;
use crate::documents::{
    BaggageAllowanceList, DataLists, FlightList, FlightSegment, FlightSegmentList, KeyedValue,
    OfferId, OriginDestinationList, PenaltyList, PricedDocument, SeatAvailabilityDocument,
    ServiceDefinition, ServiceDefinitionList, ServiceListDocument, TransactionId, Traveler,
    TravelerList,
};
use crate::grouping;
use crate::keys::NamespacedKey;
use crate::pipeline::{self, OfferView, PipelineError};
use crate::resolver::EntityCatalog;

// ---------------------------------------------------------------------------
// Pricing (OfferPriceRQ)

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferPriceRequest {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: TransactionId,
    pub query: OfferPriceQuery,
    pub data_lists: DataLists,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferPriceQuery {
    #[serde(rename = "OfferID")]
    pub offer_id: OfferId,
    pub offer_items: Vec<OfferItemSelection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferItemSelection {
    #[serde(rename = "OfferItemID")]
    pub offer_item_id: String,
}

pub fn build_offer_price_request(view: &OfferView) -> OfferPriceRequest {
    OfferPriceRequest {
        shopping_response_id: transaction_id(&view.context.shopping_response_id),
        query: OfferPriceQuery {
            offer_id: view.offer.offer_id.clone(),
            offer_items: view
                .offer
                .offer_price
                .iter()
                .filter_map(|block| block.offer_item_id.clone())
                .map(|offer_item_id| OfferItemSelection { offer_item_id })
                .collect(),
        },
        data_lists: data_lists_from_view(view),
    }
}

// ---------------------------------------------------------------------------
// Seat availability / service list, built from the pricing response

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeatAvailabilityRequest {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: TransactionId,
    pub query: FlightQuery,
    pub travelers: Vec<Traveler>,
    pub data_lists: DataLists,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceListRequest {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: TransactionId,
    pub query: FlightQuery,
    pub data_lists: DataLists,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlightQuery {
    pub origin_destinations: Vec<LegGrouping>,
}

/// One directional leg of the priced itinerary, as the seat and service
/// calls want segments grouped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegGrouping {
    pub origin: String,
    pub destination: String,
    pub segment_references: Vec<String>,
}

pub fn build_seat_availability_request(
    document: &PricedDocument,
    offer_index: usize,
) -> Result<SeatAvailabilityRequest, PipelineError> {
    let view = priced_view(document, offer_index)?;
    Ok(SeatAvailabilityRequest {
        shopping_response_id: transaction_id(&view.context.shopping_response_id),
        query: FlightQuery {
            origin_destinations: leg_groupings(&view),
        },
        travelers: view.travelers.values().cloned().collect(),
        data_lists: data_lists_from_view(&view),
    })
}

pub fn build_service_list_request(
    document: &PricedDocument,
    offer_index: usize,
) -> Result<ServiceListRequest, PipelineError> {
    let view = priced_view(document, offer_index)?;
    Ok(ServiceListRequest {
        shopping_response_id: transaction_id(&view.context.shopping_response_id),
        query: FlightQuery {
            origin_destinations: leg_groupings(&view),
        },
        data_lists: data_lists_from_view(&view),
    })
}

// ---------------------------------------------------------------------------
// Order creation (OrderCreateRQ)

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderCreateRequest {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: TransactionId,
    pub query: OrderQuery,
    pub passengers: Vec<Traveler>,
    pub selected_services: Vec<ServiceDefinition>,
    pub data_lists: DataLists,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderQuery {
    #[serde(rename = "OfferID")]
    pub offer_id: OfferId,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItem {
    #[serde(rename = "OfferItemID")]
    pub offer_item_id: String,
    pub passenger_refs: Vec<String>,
}

/// Builds the final order from the priced offer plus the ancillaries the
/// user picked out of the seat and service responses. Service references
/// that resolve to another airline, or to nothing, are dropped with a
/// warning; the order itself never fails over ancillaries.
pub fn build_order_create_request(
    document: &PricedDocument,
    offer_index: usize,
    seats: Option<&SeatAvailabilityDocument>,
    services: Option<&ServiceListDocument>,
    selected_service_refs: &[String],
) -> Result<OrderCreateRequest, PipelineError> {
    let view = priced_view(document, offer_index)?;
    let selected_services =
        resolve_selected_services(&view, seats, services, selected_service_refs);

    let order_items = view
        .offer
        .offer_price
        .iter()
        .filter_map(|block| {
            let offer_item_id = block.offer_item_id.clone()?;
            let mut passenger_refs: Vec<String> = block
                .associations
                .iter()
                .filter_map(|assoc| assoc.associated_traveler.as_ref())
                .flat_map(|travelers| travelers.traveler_references.iter().cloned())
                .collect();
            passenger_refs.sort();
            passenger_refs.dedup();
            Some(OrderItem {
                offer_item_id,
                passenger_refs,
            })
        })
        .collect();

    Ok(OrderCreateRequest {
        shopping_response_id: transaction_id(&view.context.shopping_response_id),
        query: OrderQuery {
            offer_id: view.offer.offer_id.clone(),
            order_items,
        },
        passengers: view.travelers.values().cloned().collect(),
        selected_services,
        data_lists: data_lists_from_view(&view),
    })
}

// Seat and service responses are separate documents that can repeat the
// merged multi-airline shape, so each gets its own detection pass and
// catalog before any reference is honored.
fn resolve_selected_services(
    view: &OfferView,
    seats: Option<&SeatAvailabilityDocument>,
    services: Option<&ServiceListDocument>,
    selected_service_refs: &[String],
) -> Vec<ServiceDefinition> {
    let airline = view.context.owning_airline.as_str();

    let mut catalogs = Vec::new();
    if let Some(doc) = services {
        let detection = detector::detect_parts(&doc.data_lists, &[], None);
        catalogs.push(EntityCatalog::from_service_list(doc, &detection));
    }
    if let Some(doc) = seats {
        let detection = detector::detect_parts(&doc.data_lists, &[], None);
        catalogs.push(EntityCatalog::from_seat_availability(doc, &detection));
    }

    let mut resolved = Vec::new();
    for reference in selected_service_refs {
        if let Some(foreign) = NamespacedKey::airline_of(reference).filter(|c| *c != airline) {
            warn!(
                reference = reference.as_str(),
                foreign,
                airline,
                "dropping cross-airline service selection"
            );
            continue;
        }
        let record = catalogs
            .iter()
            .find_map(|catalog| catalog.services.resolve(reference, Some(airline)));
        match record {
            Some(service) => {
                let mut service = service.clone();
                service.object_key = NamespacedKey::strip(&service.object_key).to_string();
                resolved.push(service);
            }
            None => warn!(
                reference = reference.as_str(),
                airline, "selected service did not resolve in any ancillary document"
            ),
        }
    }
    resolved
}

// ---------------------------------------------------------------------------
// Shared helpers

fn priced_view(
    document: &PricedDocument,
    offer_index: usize,
) -> Result<OfferView, PipelineError> {
    let detection = detector::detect_priced(document);
    let catalog = EntityCatalog::from_priced(document, &detection);
    pipeline::select_priced_offer(document, &catalog, offer_index)
}

fn transaction_id(value: &str) -> TransactionId {
    TransactionId {
        response_id: KeyedValue::new(value),
    }
}

fn leg_groupings(view: &OfferView) -> Vec<LegGrouping> {
    let segments: Vec<FlightSegment> = view.segments.values().cloned().collect();
    grouping::split_legs(&segments)
        .into_iter()
        .map(|leg| LegGrouping {
            origin: leg
                .first()
                .map(|s| s.departure.airport_code.value.clone())
                .unwrap_or_default(),
            destination: leg
                .last()
                .map(|s| s.arrival.airport_code.value.clone())
                .unwrap_or_default(),
            segment_references: leg.iter().map(|s| s.segment_key.clone()).collect(),
        })
        .collect()
}

// The emitted data lists reuse the document shape, rebuilt from the
// canonical view so ordering is deterministic.
fn data_lists_from_view(view: &OfferView) -> DataLists {
    DataLists {
        anonymous_traveler_list: TravelerList {
            travelers: view.travelers.values().cloned().collect(),
        },
        flight_segment_list: FlightSegmentList {
            segments: view.segments.values().cloned().collect(),
        },
        flight_list: FlightList {
            flights: view.flights.values().cloned().collect(),
        },
        origin_destination_list: OriginDestinationList {
            origin_destinations: view.origin_destinations.values().cloned().collect(),
        },
        checked_bag_allowance_list: BaggageAllowanceList {
            allowances: view.baggage.values().cloned().collect(),
        },
        service_definition_list: ServiceDefinitionList {
            services: view.services.values().cloned().collect(),
        },
        penalty_list: PenaltyList {
            penalties: view.penalties.values().cloned().collect(),
        },
    }
}
