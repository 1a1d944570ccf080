//! Invoice key fields derived from the dynamic extracted-field bag.
//!
//! The extraction subsystem emits loosely named fields; the accessor here
//! encodes the synonym preference order once so no caller repeats the
//! fallback chains.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DedupConfig;
use crate::domain::extraction::ExtractedField;

const VENDOR_KEYS: &[&str] = &["vendor_name", "supplier_name", "vendor"];
const INVOICE_NUMBER_KEYS: &[&str] = &["invoice_number", "document_number", "invoice_no"];
const DATE_KEYS: &[&str] = &["invoice_date", "date", "issue_date"];
const AMOUNT_KEYS: &[&str] = &["total_amount", "amount_due", "total"];
const CURRENCY_KEYS: &[&str] = &["currency", "currency_code"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y"];

/// Returns the first non-blank value among `keys`, in preference order.
pub fn field_value<'a>(
    bag: &'a HashMap<String, ExtractedField>,
    keys: &[&str],
) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| bag.get(*key))
        .map(|field| field.value.trim())
        .find(|value| !value.is_empty())
}

/// Key identifying fields of an invoice, derived per check and never
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
    pub currency: String,
}

impl InvoiceData {
    pub fn from_fields(bag: &HashMap<String, ExtractedField>, config: &DedupConfig) -> Self {
        let currency = field_value(bag, CURRENCY_KEYS)
            .map(|value| value.to_uppercase())
            .unwrap_or_else(|| config.default_currency.to_uppercase());

        Self {
            vendor_name: field_value(bag, VENDOR_KEYS).map(str::to_string),
            invoice_number: field_value(bag, INVOICE_NUMBER_KEYS).map(str::to_string),
            invoice_date: field_value(bag, DATE_KEYS).and_then(parse_date),
            total_amount: field_value(bag, AMOUNT_KEYS).and_then(parse_amount),
            currency,
        }
    }

    /// Fuzzy matching needs at least one anchor field to search on.
    pub fn has_anchor(&self) -> bool {
        self.vendor_name.is_some() || self.invoice_number.is_some()
    }

    /// True when none of the identifying fields is present; such an
    /// extraction has no invoice identity at all.
    pub fn is_blank(&self) -> bool {
        self.vendor_name.is_none()
            && self.invoice_number.is_none()
            && self.invoice_date.is_none()
            && self.total_amount.is_none()
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    tracing::debug!(value = trimmed, "unparseable invoice date, treating as absent");
    None
}

fn parse_amount(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<Decimal>() {
        Ok(amount) => Some(amount),
        Err(_) => {
            tracing::debug!(value, "unparseable amount, treating as absent");
            None
        }
    }
}

/// Per-field similarity scores plus the weighted overall score, all in
/// `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScores {
    pub vendor_match: f64,
    pub invoice_number_match: f64,
    pub date_proximity: f64,
    pub amount_match: f64,
    pub overall: f64,
}
