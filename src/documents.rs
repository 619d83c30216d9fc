// Raw vendor document model for the NDC shopping/pricing/booking protocol.
//
// Field names follow the vendor's PascalCase JSON convention via serde
// renames. Parsing is lenient: every block a response may omit is defaulted,
// because airlines differ wildly in which sections they populate. Payloads
// the pipeline only re-keys but never reads (baggage and service bodies)
// ride along as raw JSON maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// The vendor wraps most scalars as {"value": ...}
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KeyedValue {
    #[serde(default)]
    pub value: String,
}

impl KeyedValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

// {"value": ["SEG1", "SEG2"]} reference-list wrapper
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RefList {
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Amount {
    #[serde(rename = "value")]
    pub value: f64,
    pub code: String,
}

// Top-level transaction id: {"ResponseID": {"value": "..."}}
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionId {
    #[serde(rename = "ResponseID")]
    pub response_id: KeyedValue,
}

// Warning/Error record; Owner identifies the airline that produced it
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DocumentNote {
    pub owner: Option<String>,
    pub code: Option<String>,
    pub short_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Shopping response (AirShoppingRS)

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ShoppingDocument {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: Option<TransactionId>,
    pub warnings: Vec<DocumentNote>,
    pub errors: Vec<DocumentNote>,
    pub offers_group: OffersGroup,
    pub data_lists: DataLists,
    pub metadata: Option<DocumentMetadata>,
}

impl ShoppingDocument {
    // Offers in document order, across all airline groups. The pipeline's
    // global offer index counts in this order.
    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers_group
            .airline_offers
            .iter()
            .flat_map(|group| group.airline_offer.iter())
    }

    pub fn offer_at(&self, index: usize) -> Option<&Offer> {
        self.offers().nth(index)
    }

    pub fn offer_count(&self) -> usize {
        self.offers().count()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OffersGroup {
    pub airline_offers: Vec<AirlineOffers>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AirlineOffers {
    pub owner: Option<KeyedValue>,
    pub airline_offer: Vec<Offer>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Offer {
    #[serde(rename = "OfferID")]
    pub offer_id: OfferId,
    pub total_price: Option<PriceDetail>,
    pub offer_price: Vec<OfferPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OfferId {
    #[serde(rename = "value")]
    pub value: String,
    pub owner: Option<String>,
    pub channel: Option<String>,
}

// One per Passenger Type Code: the fare for that passenger type
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OfferPrice {
    #[serde(rename = "OfferItemID")]
    pub offer_item_id: Option<String>,
    pub price_detail: Option<PriceDetail>,
    pub fare_detail: Option<FareDetail>,
    pub associations: Vec<Association>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PriceDetail {
    pub total_amount: Amount,
    pub base_amount: Option<Amount>,
    pub taxes: Option<Amount>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FareDetail {
    pub fare_component: Vec<FareComponent>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FareComponent {
    pub fare_basis_code: Option<KeyedValue>,
    pub price_class_ref: Option<String>,
    pub penalty_refs: Vec<String>,
}

// Links a price block to its travelers and flights. Round trips typically
// carry two associations, one per directional leg.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Association {
    pub associated_traveler: Option<AssociatedTraveler>,
    pub applicable_flight: Option<ApplicableFlight>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AssociatedTraveler {
    pub traveler_references: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ApplicableFlight {
    pub flight_references: Vec<String>,
    pub flight_segment_reference: Vec<FlightSegmentReference>,
    pub origin_destination_references: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FlightSegmentReference {
    #[serde(rename = "ref")]
    pub segment_ref: String,
    pub class_of_service: Option<ClassOfService>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ClassOfService {
    pub code: Option<KeyedValue>,
}

// ---------------------------------------------------------------------------
// DataLists: the cross-referenced entity pools

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DataLists {
    pub anonymous_traveler_list: TravelerList,
    pub flight_segment_list: FlightSegmentList,
    pub flight_list: FlightList,
    pub origin_destination_list: OriginDestinationList,
    pub checked_bag_allowance_list: BaggageAllowanceList,
    pub service_definition_list: ServiceDefinitionList,
    pub penalty_list: PenaltyList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TravelerList {
    #[serde(rename = "AnonymousTraveler")]
    pub travelers: Vec<Traveler>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightSegmentList {
    #[serde(rename = "FlightSegment")]
    pub segments: Vec<FlightSegment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightList {
    #[serde(rename = "Flight")]
    pub flights: Vec<Flight>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginDestinationList {
    #[serde(rename = "OriginDestination")]
    pub origin_destinations: Vec<OriginDestination>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BaggageAllowanceList {
    #[serde(rename = "CheckedBagAllowance")]
    pub allowances: Vec<BaggageAllowance>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceDefinitionList {
    #[serde(rename = "ServiceDefinition")]
    pub services: Vec<ServiceDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PenaltyList {
    #[serde(rename = "Penalty")]
    pub penalties: Vec<PenaltyRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Traveler {
    pub object_key: String,
    #[serde(rename = "PTC")]
    pub ptc: Option<KeyedValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FlightSegment {
    pub segment_key: String,
    pub departure: TravelEndpoint,
    pub arrival: TravelEndpoint,
    pub marketing_carrier: Option<Carrier>,
    pub operating_carrier: Option<Carrier>,
    pub equipment: Option<Value>,
    pub flight_detail: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TravelEndpoint {
    pub airport_code: KeyedValue,
    pub date: Option<String>,
    pub time: Option<String>,
    pub terminal: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Carrier {
    #[serde(rename = "AirlineID")]
    pub airline_id: KeyedValue,
    pub name: Option<String>,
    pub flight_number: Option<KeyedValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Flight {
    pub flight_key: String,
    pub segment_references: RefList,
    pub journey: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OriginDestination {
    pub origin_destination_key: String,
    pub departure_code: Option<KeyedValue>,
    pub arrival_code: Option<KeyedValue>,
    pub flight_references: RefList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BaggageAllowance {
    pub list_key: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServiceDefinition {
    pub object_key: String,
    pub name: Option<KeyedValue>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

// Raw penalty record. The four indicators arrive as bool, number or string
// depending on the airline, so they stay raw JSON until coercion.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PenaltyRecord {
    pub object_key: String,
    pub cancel_fee_ind: Option<Value>,
    pub refundable_ind: Option<Value>,
    pub change_fee_ind: Option<Value>,
    pub change_allowed_ind: Option<Value>,
    pub details: PenaltyDetailList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PenaltyDetailList {
    #[serde(rename = "Detail")]
    pub details: Vec<PenaltyDetail>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PenaltyDetail {
    #[serde(rename = "Type")]
    pub penalty_type: Option<String>,
    pub application: Option<PenaltyApplication>,
    pub amounts: PenaltyAmountList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PenaltyApplication {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PenaltyAmountList {
    #[serde(rename = "Amount")]
    pub amounts: Vec<PenaltyAmount>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PenaltyAmount {
    pub currency_amount_value: Option<Amount>,
    pub amount_application: Option<String>,
}

// ---------------------------------------------------------------------------
// Metadata: per-airline transaction ids in merged multi-airline responses

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DocumentMetadata {
    #[serde(rename = "ShoppingResponseIDs")]
    pub shopping_response_ids: Vec<AirlineResponseId>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AirlineResponseId {
    pub owner: String,
    #[serde(rename = "ResponseID")]
    pub response_id: KeyedValue,
}

// ---------------------------------------------------------------------------
// Pricing response (OfferPriceRS). Same data-list conventions as shopping,
// with a freshly issued transaction id and re-priced offers.

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PricedDocument {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: Option<TransactionId>,
    pub warnings: Vec<DocumentNote>,
    pub errors: Vec<DocumentNote>,
    pub priced_offer: Vec<Offer>,
    pub data_lists: DataLists,
    pub metadata: Option<DocumentMetadata>,
}

impl PricedDocument {
    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.priced_offer.iter()
    }

    pub fn offer_at(&self, index: usize) -> Option<&Offer> {
        self.priced_offer.get(index)
    }
}

// ---------------------------------------------------------------------------
// Seat availability / service list responses. Only their data lists and the
// opaque seat maps matter to the order-creation stage.

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SeatAvailabilityDocument {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: Option<TransactionId>,
    pub warnings: Vec<DocumentNote>,
    pub data_lists: DataLists,
    pub seat_map: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServiceListDocument {
    #[serde(rename = "ShoppingResponseID")]
    pub shopping_response_id: Option<TransactionId>,
    pub warnings: Vec<DocumentNote>,
    pub data_lists: DataLists,
}

// ---------------------------------------------------------------------------
// Order creation response (OrderViewRS), consumed mostly opaquely

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OrderViewDocument {
    #[serde(rename = "OrderID")]
    pub order_id: Option<KeyedValue>,
    pub booking_references: Vec<BookingReference>,
    pub warnings: Vec<DocumentNote>,
    pub errors: Vec<DocumentNote>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BookingReference {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "AirlineID")]
    pub airline_id: Option<KeyedValue>,
}

// A merged two-airline shopping response in the vendor's wire shape, small
// enough to read but exercising every entity pool. Used across module tests.
pub const SAMPLE_MULTI_AIRLINE_SHOPPING: &str = r#"{
  "ShoppingResponseID": { "ResponseID": { "value": "SRID-GLOBAL" } },
  "Warnings": [
    { "Owner": "KQ", "ShortText": "Fares subject to change" },
    { "Owner": "AF", "ShortText": "Fares subject to change" }
  ],
  "OffersGroup": {
    "AirlineOffers": [
      {
        "Owner": { "value": "KQ" },
        "AirlineOffer": [
          {
            "OfferID": { "value": "OFR-83acde-KQ", "Owner": "KQ", "Channel": "NDC" },
            "TotalPrice": { "TotalAmount": { "value": 780.50, "Code": "USD" } },
            "OfferPrice": [
              {
                "OfferItemID": "KQ-ITEM1",
                "PriceDetail": { "TotalAmount": { "value": 390.25, "Code": "USD" } },
                "FareDetail": {
                  "FareComponent": [
                    { "FareBasisCode": { "value": "YLOWKE" }, "PenaltyRefs": ["KQ-PEN1"] }
                  ]
                },
                "Associations": [
                  {
                    "AssociatedTraveler": { "TravelerReferences": ["KQ-PAX1"] },
                    "ApplicableFlight": {
                      "FlightReferences": ["KQ-FLT1"],
                      "FlightSegmentReference": [{ "ref": "KQ-SEG1" }],
                      "OriginDestinationReferences": ["KQ-OD1"]
                    }
                  },
                  {
                    "AssociatedTraveler": { "TravelerReferences": ["KQ-PAX1"] },
                    "ApplicableFlight": {
                      "FlightReferences": ["KQ-FLT2"],
                      "FlightSegmentReference": [{ "ref": "KQ-SEG2" }],
                      "OriginDestinationReferences": ["KQ-OD2"]
                    }
                  }
                ]
              }
            ]
          }
        ]
      },
      {
        "Owner": { "value": "AF" },
        "AirlineOffer": [
          {
            "OfferID": { "value": "OFR-19bf02-AF", "Owner": "AF", "Channel": "NDC" },
            "TotalPrice": { "TotalAmount": { "value": 912.00, "Code": "USD" } },
            "OfferPrice": [
              {
                "OfferItemID": "AF-ITEM1",
                "PriceDetail": { "TotalAmount": { "value": 912.00, "Code": "USD" } },
                "FareDetail": {
                  "FareComponent": [
                    { "FareBasisCode": { "value": "NLGTFR" }, "PenaltyRefs": ["AF-PEN1"] }
                  ]
                },
                "Associations": [
                  {
                    "AssociatedTraveler": { "TravelerReferences": ["AF-PAX1"] },
                    "ApplicableFlight": {
                      "FlightReferences": ["AF-FLT1"],
                      "FlightSegmentReference": [{ "ref": "AF-SEG1" }],
                      "OriginDestinationReferences": ["AF-OD1"]
                    }
                  }
                ]
              }
            ]
          }
        ]
      }
    ]
  },
  "DataLists": {
    "AnonymousTravelerList": {
      "AnonymousTraveler": [
        { "ObjectKey": "KQ-PAX1", "PTC": { "value": "ADT" } },
        { "ObjectKey": "AF-PAX1", "PTC": { "value": "ADT" } }
      ]
    },
    "FlightSegmentList": {
      "FlightSegment": [
        {
          "SegmentKey": "KQ-SEG1",
          "Departure": { "AirportCode": { "value": "NBO" }, "Date": "2026-03-10", "Time": "08:45" },
          "Arrival": { "AirportCode": { "value": "CDG" }, "Date": "2026-03-10", "Time": "16:05" },
          "MarketingCarrier": { "AirlineID": { "value": "KQ" }, "FlightNumber": { "value": "112" } },
          "OperatingCarrier": { "AirlineID": { "value": "KQ" } }
        },
        {
          "SegmentKey": "KQ-SEG2",
          "Departure": { "AirportCode": { "value": "CDG" }, "Date": "2026-03-20", "Time": "10:30" },
          "Arrival": { "AirportCode": { "value": "NBO" }, "Date": "2026-03-20", "Time": "19:55" },
          "MarketingCarrier": { "AirlineID": { "value": "KQ" }, "FlightNumber": { "value": "113" } },
          "OperatingCarrier": { "AirlineID": { "value": "KQ" } }
        },
        {
          "SegmentKey": "AF-SEG1",
          "Departure": { "AirportCode": { "value": "NBO" }, "Date": "2026-03-10", "Time": "11:20" },
          "Arrival": { "AirportCode": { "value": "CDG" }, "Date": "2026-03-10", "Time": "18:40" },
          "MarketingCarrier": { "AirlineID": { "value": "AF" }, "FlightNumber": { "value": "815" } },
          "OperatingCarrier": { "AirlineID": { "value": "AF" } }
        }
      ]
    },
    "FlightList": {
      "Flight": [
        { "FlightKey": "KQ-FLT1", "SegmentReferences": { "value": ["KQ-SEG1"] } },
        { "FlightKey": "KQ-FLT2", "SegmentReferences": { "value": ["KQ-SEG2"] } },
        { "FlightKey": "AF-FLT1", "SegmentReferences": { "value": ["AF-SEG1"] } }
      ]
    },
    "OriginDestinationList": {
      "OriginDestination": [
        {
          "OriginDestinationKey": "KQ-OD1",
          "DepartureCode": { "value": "NBO" },
          "ArrivalCode": { "value": "CDG" },
          "FlightReferences": { "value": ["KQ-FLT1"] }
        },
        {
          "OriginDestinationKey": "KQ-OD2",
          "DepartureCode": { "value": "CDG" },
          "ArrivalCode": { "value": "NBO" },
          "FlightReferences": { "value": ["KQ-FLT2"] }
        },
        {
          "OriginDestinationKey": "AF-OD1",
          "DepartureCode": { "value": "NBO" },
          "ArrivalCode": { "value": "CDG" },
          "FlightReferences": { "value": ["AF-FLT1"] }
        }
      ]
    },
    "CheckedBagAllowanceList": {
      "CheckedBagAllowance": [
        { "ListKey": "KQ-BAG1", "PieceAllowance": { "TotalQuantity": 2 } },
        { "ListKey": "AF-BAG1", "PieceAllowance": { "TotalQuantity": 1 } }
      ]
    },
    "ServiceDefinitionList": {
      "ServiceDefinition": [
        { "ObjectKey": "KQ-SRV1", "Name": { "value": "Extra legroom" } },
        { "ObjectKey": "AF-SRV1", "Name": { "value": "Priority boarding" } }
      ]
    },
    "PenaltyList": {
      "Penalty": [
        {
          "ObjectKey": "KQ-PEN1",
          "CancelFeeInd": false,
          "RefundableInd": true,
          "ChangeFeeInd": false,
          "ChangeAllowedInd": true,
          "Details": {
            "Detail": [
              {
                "Type": "Change",
                "Application": { "Code": "4" },
                "Amounts": {
                  "Amount": [
                    {
                      "CurrencyAmountValue": { "value": 0.0, "Code": "USD" },
                      "AmountApplication": "MIN"
                    }
                  ]
                }
              }
            ]
          }
        },
        {
          "ObjectKey": "AF-PEN1",
          "CancelFeeInd": "true",
          "RefundableInd": "Missing",
          "ChangeFeeInd": 1,
          "ChangeAllowedInd": "allowed",
          "Details": {
            "Detail": [
              {
                "Type": "Cancel",
                "Application": { "Code": "2" },
                "Amounts": {
                  "Amount": [
                    {
                      "CurrencyAmountValue": { "value": 150.0, "Code": "EUR" },
                      "AmountApplication": "MAX"
                    }
                  ]
                }
              }
            ]
          }
        }
      ]
    }
  },
  "Metadata": {
    "ShoppingResponseIDs": [
      { "Owner": "KQ", "ResponseID": { "value": "SRID-KQ77001" } },
      { "Owner": "AF", "ResponseID": { "value": "SRID-AF31442" } }
    ]
  }
}"#;
