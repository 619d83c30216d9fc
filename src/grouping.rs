// Round-trip leg grouping.
//
// The seat and service calls want segments grouped per directional leg, but
// the vendor hands back one flat segment list. The split point is guessed:
// the largest gap between an arrival and the next departure, when it
// exceeds the turnaround threshold and the itinerary closes on itself. A
// heuristic, not a guarantee — irregular multi-city itineraries can fool
// it, which is why it lives behind one replaceable function.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::documents::{FlightSegment, TravelEndpoint};

/// Minimum arrival-to-departure gap treated as a turnaround, in hours.
pub const MIN_TURNAROUND_HOURS: i64 = 4;

/// Segment count from which an unsplittable itinerary is split at its
/// midpoint instead of kept whole.
pub const MIDPOINT_FALLBACK_MIN_SEGMENTS: usize = 4;

/// Splits an itinerary's segments into directional legs.
///
/// Segments are ordered by departure time. The largest gap between
/// consecutive segments becomes the turnaround point if it exceeds
/// [`MIN_TURNAROUND_HOURS`] and the first origin equals the last
/// destination (a closed loop). Failing that, itineraries of at least
/// [`MIDPOINT_FALLBACK_MIN_SEGMENTS`] segments are split at the midpoint;
/// anything shorter is one contiguous, possibly multi-stop leg.
pub fn split_legs(segments: &[FlightSegment]) -> Vec<Vec<FlightSegment>> {
    if segments.is_empty() {
        return Vec::new();
    }
    if segments.len() == 1 {
        return vec![segments.to_vec()];
    }

    let mut ordered: Vec<FlightSegment> = segments.to_vec();
    // Only reorder when every segment has a usable departure time;
    // otherwise trust the document order
    if ordered.iter().all(|s| departure_time(s).is_some()) {
        ordered.sort_by_key(|s| departure_time(s).unwrap_or(NaiveDateTime::MIN));
    }

    if let Some(split_at) = turnaround_index(&ordered) {
        let tail = ordered.split_off(split_at + 1);
        return vec![ordered, tail];
    }

    if ordered.len() >= MIDPOINT_FALLBACK_MIN_SEGMENTS {
        let tail = ordered.split_off(ordered.len() / 2);
        return vec![ordered, tail];
    }

    vec![ordered]
}

// Index of the segment after which the itinerary turns around, if any.
fn turnaround_index(ordered: &[FlightSegment]) -> Option<usize> {
    if !is_closed_loop(ordered) {
        return None;
    }

    let mut best: Option<(usize, chrono::Duration)> = None;
    for (index, pair) in ordered.windows(2).enumerate() {
        let arrival = arrival_time(&pair[0])?;
        let departure = departure_time(&pair[1])?;
        let gap = departure - arrival;
        if best.map_or(true, |(_, widest)| gap > widest) {
            best = Some((index, gap));
        }
    }

    best.filter(|(_, gap)| *gap > chrono::Duration::hours(MIN_TURNAROUND_HOURS))
        .map(|(index, _)| index)
}

fn is_closed_loop(ordered: &[FlightSegment]) -> bool {
    match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => {
            let origin = &first.departure.airport_code.value;
            let destination = &last.arrival.airport_code.value;
            !origin.is_empty() && origin == destination
        }
        _ => false,
    }
}

pub fn departure_time(segment: &FlightSegment) -> Option<NaiveDateTime> {
    endpoint_time(&segment.departure)
}

pub fn arrival_time(segment: &FlightSegment) -> Option<NaiveDateTime> {
    endpoint_time(&segment.arrival)
}

// Dates arrive as "2026-03-10"; times as "08:45" or "08:45:00", sometimes
// absent for date-only endpoints
fn endpoint_time(endpoint: &TravelEndpoint) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(endpoint.date.as_deref()?, "%Y-%m-%d").ok()?;
    let time = endpoint
        .time
        .as_deref()
        .and_then(parse_time)
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::KeyedValue;

    fn segment(
        key: &str,
        from: &str,
        dep: (&str, &str),
        to: &str,
        arr: (&str, &str),
    ) -> FlightSegment {
        FlightSegment {
            segment_key: key.to_string(),
            departure: TravelEndpoint {
                airport_code: KeyedValue::new(from),
                date: Some(dep.0.to_string()),
                time: Some(dep.1.to_string()),
                terminal: None,
            },
            arrival: TravelEndpoint {
                airport_code: KeyedValue::new(to),
                date: Some(arr.0.to_string()),
                time: Some(arr.1.to_string()),
                terminal: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_splits_at_widest_gap() {
        let segments = vec![
            segment("SEG1", "NBO", ("2026-03-10", "08:45"), "CDG", ("2026-03-10", "16:05")),
            segment("SEG2", "CDG", ("2026-03-20", "10:30"), "NBO", ("2026-03-20", "19:55")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0][0].segment_key, "SEG1");
        assert_eq!(legs[1][0].segment_key, "SEG2");
    }

    #[test]
    fn test_multi_stop_one_way_stays_one_leg() {
        // Short connection in ADD; itinerary does not close on itself
        let segments = vec![
            segment("SEG1", "NBO", ("2026-03-10", "08:45"), "ADD", ("2026-03-10", "10:50")),
            segment("SEG2", "ADD", ("2026-03-10", "12:10"), "CDG", ("2026-03-10", "19:30")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].len(), 2);
    }

    #[test]
    fn test_connection_below_threshold_does_not_split_closed_loop() {
        // Closes on itself but every gap is under four hours: still one leg
        let segments = vec![
            segment("SEG1", "NBO", ("2026-03-10", "08:00"), "ADD", ("2026-03-10", "10:00")),
            segment("SEG2", "ADD", ("2026-03-10", "12:00"), "NBO", ("2026-03-10", "14:00")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 1);
    }

    #[test]
    fn test_turnaround_beats_ordinary_connections() {
        let segments = vec![
            segment("SEG1", "NBO", ("2026-03-10", "08:00"), "ADD", ("2026-03-10", "10:00")),
            segment("SEG2", "ADD", ("2026-03-10", "12:00"), "CDG", ("2026-03-10", "19:00")),
            segment("SEG3", "CDG", ("2026-03-18", "09:00"), "ADD", ("2026-03-18", "17:00")),
            segment("SEG4", "ADD", ("2026-03-18", "19:00"), "NBO", ("2026-03-18", "21:00")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].len(), 2);
        assert_eq!(legs[1][0].segment_key, "SEG3");
    }

    #[test]
    fn test_out_of_order_segments_are_sorted_first() {
        let segments = vec![
            segment("SEG2", "CDG", ("2026-03-20", "10:30"), "NBO", ("2026-03-20", "19:55")),
            segment("SEG1", "NBO", ("2026-03-10", "08:45"), "CDG", ("2026-03-10", "16:05")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0][0].segment_key, "SEG1");
    }

    #[test]
    fn test_midpoint_fallback_for_long_unsplittable_itineraries() {
        // Four segments, no qualifying gap, not a closed loop: the
        // midpoint split is an approximation, not a guarantee
        let segments = vec![
            segment("SEG1", "NBO", ("2026-03-10", "06:00"), "ADD", ("2026-03-10", "08:00")),
            segment("SEG2", "ADD", ("2026-03-10", "09:00"), "CAI", ("2026-03-10", "12:00")),
            segment("SEG3", "CAI", ("2026-03-10", "13:00"), "ATH", ("2026-03-10", "15:00")),
            segment("SEG4", "ATH", ("2026-03-10", "16:00"), "CDG", ("2026-03-10", "19:00")),
        ];

        let legs = split_legs(&segments);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].len(), 2);
        assert_eq!(legs[1].len(), 2);
    }

    #[test]
    fn test_unparseable_times_keep_document_order() {
        let mut first = segment("SEG1", "NBO", ("2026-03-10", "08:45"), "CDG", ("2026-03-10", "16:05"));
        first.departure.date = None;
        let second =
            segment("SEG2", "CDG", ("2026-03-20", "10:30"), "NBO", ("2026-03-20", "19:55"));

        let legs = split_legs(&[first, second]);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0][0].segment_key, "SEG1");
    }
}
