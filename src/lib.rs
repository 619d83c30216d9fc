// Core library for the NDC offer adaptation service

pub mod detector;
pub mod documents;
pub mod gateway;
pub mod grouping;
pub mod keys;
pub mod penalties;
pub mod pipeline;
pub mod requests;
pub mod resolver;
pub mod store;

// Re-export key types for convenience
pub use detector::{detect, detect_priced, AirlineDetection};
pub use documents::{
    Offer, OrderViewDocument, PricedDocument, SeatAvailabilityDocument, ServiceListDocument,
    ShoppingDocument,
};
pub use gateway::{GatewayConfig, GatewayError, HttpVendorGateway, RetryConfig, VendorGateway};
pub use keys::NamespacedKey;
pub use penalties::{interpret, PenaltyInterpretation, PenaltyTiming, PolicyAnswer, Tri};
pub use pipeline::{
    select_offer, select_priced_offer, OfferView, PipelineError, PriceSummary, SelectionContext,
};
pub use requests::{
    build_offer_price_request, build_order_create_request, build_seat_availability_request,
    build_service_list_request, OfferPriceRequest, OrderCreateRequest, SeatAvailabilityRequest,
    ServiceListRequest,
};
pub use resolver::{EntityCatalog, EntityKind, ReferenceTable};
pub use store::{DocumentStore, SessionStage, StoreConfig};
