use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng, Rng};

use ndc_offer_engine::documents::{
    AirlineOffers, ApplicableFlight, AssociatedTraveler, Association, Carrier, FlightSegment,
    FlightSegmentReference, KeyedValue, Offer, OfferId, OfferPrice, ShoppingDocument,
    TransactionId, Traveler, TravelEndpoint,
};
use ndc_offer_engine::pipeline;
use ndc_offer_engine::resolver::EntityCatalog;

const AIRLINES: [&str; 3] = ["KQ", "AF", "ET"];

// Synthetic merged shopping document: `segments_per_airline` prefixed
// segments and travelers per airline, one round-trip offer per airline
fn merged_document(segments_per_airline: usize) -> ShoppingDocument {
    let mut rng = thread_rng();
    let mut document = ShoppingDocument {
        shopping_response_id: Some(TransactionId {
            response_id: KeyedValue::new("SRID-BENCH"),
        }),
        ..Default::default()
    };

    for airline in AIRLINES {
        for index in 0..segments_per_airline {
            let day = 1 + (index % 27);
            document
                .data_lists
                .flight_segment_list
                .segments
                .push(FlightSegment {
                    segment_key: format!("{airline}-SEG{index}"),
                    departure: TravelEndpoint {
                        airport_code: KeyedValue::new("NBO"),
                        date: Some(format!("2026-05-{day:02}")),
                        time: Some(format!("{:02}:00", rng.gen_range(0..24))),
                        terminal: None,
                    },
                    arrival: TravelEndpoint {
                        airport_code: KeyedValue::new("CDG"),
                        date: Some(format!("2026-05-{day:02}")),
                        time: Some("23:59".to_string()),
                        terminal: None,
                    },
                    operating_carrier: Some(Carrier {
                        airline_id: KeyedValue::new(airline),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            document
                .data_lists
                .anonymous_traveler_list
                .travelers
                .push(Traveler {
                    object_key: format!("{airline}-PAX{index}"),
                    ptc: Some(KeyedValue::new("ADT")),
                });
        }

        let referenced: Vec<usize> = {
            let mut indices: Vec<usize> = (0..segments_per_airline).collect();
            indices.shuffle(&mut rng);
            indices.truncate(4.min(segments_per_airline));
            indices
        };
        let associations: Vec<Association> = referenced
            .iter()
            .map(|index| Association {
                associated_traveler: Some(AssociatedTraveler {
                    traveler_references: vec![format!("{airline}-PAX0")],
                }),
                applicable_flight: Some(ApplicableFlight {
                    flight_segment_reference: vec![FlightSegmentReference {
                        segment_ref: format!("{airline}-SEG{index}"),
                        class_of_service: None,
                    }],
                    ..Default::default()
                }),
            })
            .collect();

        document.offers_group.airline_offers.push(AirlineOffers {
            owner: Some(KeyedValue::new(airline)),
            airline_offer: vec![Offer {
                offer_id: OfferId {
                    value: format!("OFR-BENCH-{airline}"),
                    owner: Some(airline.to_string()),
                    channel: None,
                },
                offer_price: vec![OfferPrice {
                    offer_item_id: Some("ITEM1".to_string()),
                    associations,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        });
    }

    document
}

pub fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("offer_pipeline");

    for segments_per_airline in [10, 100, 1000].iter() {
        let document = merged_document(*segments_per_airline);

        group.bench_with_input(
            BenchmarkId::new("catalog_build", segments_per_airline),
            &document,
            |b, document| b.iter(|| black_box(EntityCatalog::build(document))),
        );

        let catalog = EntityCatalog::build(&document);
        group.bench_with_input(
            BenchmarkId::new("select_offer", segments_per_airline),
            &(&document, &catalog),
            |b, (document, catalog)| {
                b.iter(|| black_box(pipeline::select_offer(document, catalog, 0).unwrap()))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
