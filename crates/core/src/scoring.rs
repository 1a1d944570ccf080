//! Per-field similarity scores and the weighted overall score.
//!
//! Every function here is pure and clamps its result to `[0, 1]`; the same
//! inputs always produce the same scores, which keeps classification
//! deterministic across calls.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::DedupConfig;
use crate::domain::invoice::{InvoiceData, SimilarityScores};
use crate::hashing::{normalize_invoice_number, normalize_vendor};

/// Abbreviated corporate form tokens dropped before vendor comparison.
/// Long forms ("Limited", "Corporation") are kept; they still match the
/// stripped name through the containment path below.
const LEGAL_SUFFIXES: &[&str] = &[
    "ltd", "inc", "corp", "co", "llc", "llp", "gmbh", "ag", "kg", "plc", "sa", "srl", "bv",
    "nv", "oy", "ab", "pty", "sarl",
];

const CONTAINMENT_FLOOR: f64 = 0.85;
const ACRONYM_FLOOR: f64 = 0.75;

/// Vendor-name similarity over case-folded, punctuation- and
/// legal-suffix-stripped names.
pub fn vendor_similarity(a: &str, b: &str) -> f64 {
    let left = clean_vendor(a);
    let right = clean_vendor(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }

    let base = strsim::normalized_levenshtein(&left, &right);

    if left.contains(&right) || right.contains(&left) {
        return base.max(CONTAINMENT_FLOOR);
    }
    let (acro_left, acro_right) = (acronym(&left), acronym(&right));
    if acro_left.len() > 1 && acro_left == acro_right {
        return base.max(ACRONYM_FLOOR);
    }

    clamp(base)
}

/// Invoice numbers are exact identifiers: equal after normalization or not
/// a match at all.
pub fn invoice_number_match(a: &str, b: &str) -> f64 {
    let left = normalize_invoice_number(a);
    let right = normalize_invoice_number(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        1.0
    } else {
        0.0
    }
}

/// Linear decay over the absolute day difference, zero beyond the window.
pub fn date_proximity(a: NaiveDate, b: NaiveDate, window_days: i64) -> f64 {
    let diff = (a - b).num_days().abs();
    if diff == 0 {
        return 1.0;
    }
    if window_days <= 0 || diff >= window_days {
        return 0.0;
    }
    clamp(1.0 - diff as f64 / window_days as f64)
}

/// Exact within the absolute tolerance, linear decay inside the relative
/// band, zero outside it.
pub fn amount_match(a: Decimal, b: Decimal, config: &DedupConfig) -> f64 {
    let diff = (a - b).abs();
    if diff <= config.amount_abs_tolerance {
        return 1.0;
    }

    let larger = a.abs().max(b.abs());
    if larger.is_zero() {
        return 0.0;
    }
    let relative = match (diff / larger).to_f64() {
        Some(value) => value,
        None => return 0.0,
    };
    if relative >= config.amount_rel_tolerance {
        return 0.0;
    }
    clamp(1.0 - relative / config.amount_rel_tolerance)
}

/// Scores `candidate` against `subject` and folds the components into the
/// weighted overall score.
pub fn similarity_scores(
    subject: &InvoiceData,
    candidate: &InvoiceData,
    config: &DedupConfig,
) -> SimilarityScores {
    let vendor = match (&subject.vendor_name, &candidate.vendor_name) {
        (Some(a), Some(b)) => vendor_similarity(a, b),
        _ => 0.0,
    };
    let number = match (&subject.invoice_number, &candidate.invoice_number) {
        (Some(a), Some(b)) => invoice_number_match(a, b),
        _ => 0.0,
    };
    let date = match (subject.invoice_date, candidate.invoice_date) {
        (Some(a), Some(b)) => date_proximity(a, b, config.date_window_days),
        _ => 0.0,
    };
    let amount = match (subject.total_amount, candidate.total_amount) {
        (Some(a), Some(b)) => amount_match(a, b, config),
        _ => 0.0,
    };

    let weights = &config.weights;
    let overall = clamp(
        vendor * weights.vendor
            + number * weights.invoice_number
            + date * weights.date
            + amount * weights.amount,
    );

    SimilarityScores {
        vendor_match: vendor,
        invoice_number_match: number,
        date_proximity: date,
        amount_match: amount,
        overall,
    }
}

fn clean_vendor(name: &str) -> String {
    normalize_vendor(name)
        .split(' ')
        .filter(|token| !token.is_empty() && !LEGAL_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn acronym(cleaned: &str) -> String {
    cleaned.split(' ').filter_map(|word| word.chars().next()).collect()
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
