// Fare penalty interpretation.
//
// Airlines report change/cancellation conditions as a handful of loosely
// typed indicator fields plus detail records with an action type and a
// timing code. This engine turns one raw penalty record into display-ready
// policy answers. It is total: malformed input coerces to Unknown, never to
// an error and never to a silent "No".

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::documents::{PenaltyDetail, PenaltyRecord};

/// Three-valued logical for raw indicator fields. `Unknown` is distinct
/// from `False`: an absent or unrecognized indicator must never read as a
/// denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tri {
    True,
    False,
    Unknown,
}

impl Tri {
    /// Permissive coercion from whatever the airline sent: booleans, 0/1
    /// numbers, and a family of yes/no strings. `"Missing"` and anything
    /// unrecognized are Unknown.
    pub fn from_raw(raw: Option<&Value>) -> Self {
        match raw {
            Some(Value::Bool(true)) => Tri::True,
            Some(Value::Bool(false)) => Tri::False,
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Tri::True,
                Some(0) => Tri::False,
                _ => Tri::Unknown,
            },
            Some(Value::String(s)) => Self::from_token(s),
            _ => Tri::Unknown,
        }
    }

    fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "allowed" | "1" => Tri::True,
            "false" | "no" | "not allowed" | "nav" | "0" => Tri::False,
            _ => Tri::Unknown,
        }
    }
}

/// Display-ready policy answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyAnswer {
    Yes,
    No,
    Unknown,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for PolicyAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PolicyAnswer::Yes => "Yes",
            PolicyAnswer::No => "No",
            PolicyAnswer::Unknown => "Unknown",
            PolicyAnswer::NotApplicable => "N/A",
        };
        f.write_str(text)
    }
}

/// When the penalty applies, relative to departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PenaltyTiming {
    AfterDepartureNoShow,
    BeforeDepartureNoShow,
    AfterDeparture,
    BeforeDeparture,
}

impl PenaltyTiming {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(PenaltyTiming::AfterDepartureNoShow),
            "2" => Some(PenaltyTiming::BeforeDepartureNoShow),
            "3" => Some(PenaltyTiming::AfterDeparture),
            "4" => Some(PenaltyTiming::BeforeDeparture),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            PenaltyTiming::AfterDepartureNoShow => 1,
            PenaltyTiming::BeforeDepartureNoShow => 2,
            PenaltyTiming::AfterDeparture => 3,
            PenaltyTiming::BeforeDeparture => 4,
        }
    }

    /// Post-departure action is categorically non-negotiable: it overrides
    /// whatever the fee/allowed indicators say.
    pub fn is_after_departure(&self) -> bool {
        matches!(
            self,
            PenaltyTiming::AfterDepartureNoShow | PenaltyTiming::AfterDeparture
        )
    }

    fn condition_label(&self) -> &'static str {
        match self {
            PenaltyTiming::AfterDepartureNoShow => "no-show after departure",
            PenaltyTiming::BeforeDepartureNoShow => "no-show before departure",
            PenaltyTiming::AfterDeparture => "after departure",
            PenaltyTiming::BeforeDeparture => "before departure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PenaltyAction {
    Cancel,
    Change,
}

impl PenaltyAction {
    // "Cancel", "Change", and the NoShow variants; no-show is a
    // cancellation-family action
    fn from_detail(detail: &PenaltyDetail) -> Self {
        let raw = detail.penalty_type.as_deref().unwrap_or("");
        if raw.to_ascii_lowercase().contains("change") {
            PenaltyAction::Change
        } else {
            PenaltyAction::Cancel
        }
    }
}

/// One display-ready interpretation of a penalty detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyInterpretation {
    pub penalty_applicable: PolicyAnswer,
    pub refund_applicable: PolicyAnswer,
    pub cancel_allowed: PolicyAnswer,
    pub change_allowed: PolicyAnswer,
    pub interpretation: String,
    pub timing_code: Option<u8>,
}

/// Interprets a raw penalty record, one entry per detail record. A record
/// without details still yields the indicator-level interpretations so the
/// engine stays total.
pub fn interpret(record: &PenaltyRecord) -> Vec<PenaltyInterpretation> {
    if record.details.details.is_empty() {
        return vec![
            interpret_cancel(record, None),
            interpret_change(record, None),
        ];
    }

    record
        .details
        .details
        .iter()
        .map(|detail| interpret_detail(record, detail))
        .collect()
}

pub fn interpret_detail(record: &PenaltyRecord, detail: &PenaltyDetail) -> PenaltyInterpretation {
    let timing = detail
        .application
        .as_ref()
        .and_then(|application| application.code.as_deref())
        .and_then(PenaltyTiming::from_code);

    match PenaltyAction::from_detail(detail) {
        PenaltyAction::Cancel => interpret_cancel(record, timing),
        PenaltyAction::Change => interpret_change(record, timing),
    }
}

fn interpret_cancel(
    record: &PenaltyRecord,
    timing: Option<PenaltyTiming>,
) -> PenaltyInterpretation {
    let cancel_fee = Tri::from_raw(record.cancel_fee_ind.as_ref());
    let refundable = Tri::from_raw(record.refundable_ind.as_ref());
    let (penalty_applicable, refund_applicable, cancel_allowed, text) =
        cancel_matrix(cancel_fee, refundable);

    let mut result = PenaltyInterpretation {
        penalty_applicable,
        refund_applicable,
        cancel_allowed,
        change_allowed: PolicyAnswer::NotApplicable,
        interpretation: text.to_string(),
        timing_code: timing.map(|t| t.code()),
    };

    if let Some(timing) = timing {
        if timing.is_after_departure() {
            result.refund_applicable = PolicyAnswer::No;
            result.cancel_allowed = PolicyAnswer::No;
            result.interpretation =
                format!("Not refundable in case of {}", timing.condition_label());
        }
    }

    result
}

fn interpret_change(
    record: &PenaltyRecord,
    timing: Option<PenaltyTiming>,
) -> PenaltyInterpretation {
    let change_fee = Tri::from_raw(record.change_fee_ind.as_ref());
    let change_allowed_ind = Tri::from_raw(record.change_allowed_ind.as_ref());
    let (penalty_applicable, change_allowed, text) =
        change_matrix(change_fee, change_allowed_ind);

    let mut result = PenaltyInterpretation {
        penalty_applicable,
        refund_applicable: PolicyAnswer::NotApplicable,
        cancel_allowed: PolicyAnswer::NotApplicable,
        change_allowed,
        interpretation: text.to_string(),
        timing_code: timing.map(|t| t.code()),
    };

    if let Some(timing) = timing {
        if timing.is_after_departure() {
            result.change_allowed = PolicyAnswer::No;
            result.interpretation =
                format!("Changes not permitted in case of {}", timing.condition_label());
        }
    }

    result
}

// Both tables are total over {True, False, Unknown}². Unknown rows must
// stay distinguishable from False rows.

fn cancel_matrix(
    cancel_fee: Tri,
    refundable: Tri,
) -> (PolicyAnswer, PolicyAnswer, PolicyAnswer, &'static str) {
    use PolicyAnswer::{No, Unknown, Yes};

    match (cancel_fee, refundable) {
        (Tri::False, Tri::True) => (No, Yes, Yes, "Fully refundable, free cancellation"),
        (Tri::True, Tri::True) => (
            Yes,
            Yes,
            Yes,
            "Cancellation penalty applies, remainder refundable",
        ),
        (Tri::True, Tri::False) => (
            Yes,
            No,
            No,
            "Non-refundable fare, cancellation penalty applies",
        ),
        (Tri::False, Tri::False) => (No, No, No, "Non-refundable fare, cancellation not offered"),
        (Tri::True, Tri::Unknown) => (
            Yes,
            Unknown,
            Unknown,
            "Cancellation penalty applies, refund conditions unknown",
        ),
        (Tri::False, Tri::Unknown) => (
            No,
            Unknown,
            Unknown,
            "No cancellation penalty, refund conditions unknown",
        ),
        (Tri::Unknown, Tri::True) => (
            Unknown,
            Yes,
            Yes,
            "Refundable, cancellation penalty conditions unknown",
        ),
        (Tri::Unknown, Tri::False) => (
            Unknown,
            No,
            No,
            "Non-refundable fare, cancellation penalty conditions unknown",
        ),
        (Tri::Unknown, Tri::Unknown) => (
            Unknown,
            Unknown,
            Unknown,
            "Cancellation conditions unknown, contact the airline",
        ),
    }
}

fn change_matrix(change_fee: Tri, change_allowed: Tri) -> (PolicyAnswer, PolicyAnswer, &'static str) {
    use PolicyAnswer::{No, Unknown, Yes};

    match (change_fee, change_allowed) {
        (Tri::False, Tri::True) => (No, Yes, "Free change + difference in fare"),
        (Tri::True, Tri::True) => (Yes, Yes, "Change penalty + difference in fare"),
        (Tri::True, Tri::False) => (Yes, No, "Changes not permitted for this fare"),
        (Tri::False, Tri::False) => (No, No, "Changes not permitted for this fare"),
        (Tri::True, Tri::Unknown) => (
            Yes,
            Unknown,
            "Change penalty applies, change conditions unknown",
        ),
        (Tri::False, Tri::Unknown) => (
            No,
            Unknown,
            "No change penalty, change conditions unknown",
        ),
        (Tri::Unknown, Tri::True) => (
            Unknown,
            Yes,
            "Changes allowed, change penalty conditions unknown",
        ),
        (Tri::Unknown, Tri::False) => (
            Unknown,
            No,
            "Changes not permitted, change penalty conditions unknown",
        ),
        (Tri::Unknown, Tri::Unknown) => (
            Unknown,
            Unknown,
            "Change conditions unknown, contact the airline",
        ),
    }
}
