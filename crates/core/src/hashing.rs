//! Content hashing and canonical invoice fingerprints.
//!
//! Both digests are SHA-256, hex encoded, and used only for equality
//! comparison. The fingerprint canonicalizes the identifying invoice
//! fields first so that formatting noise in the source document never
//! changes the digest.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::invoice::InvoiceData;
use crate::errors::DedupError;

/// Joins normalized fields; stripped from every normalized value so it can
/// never occur inside one.
const FIELD_SEPARATOR: char = '\u{1f}';
/// Stands in for an absent field. Distinct from the empty string so
/// "absent" and "present but empty" never collide.
const ABSENT: &str = "\u{1}";

/// SHA-256 over raw file content. Rejects empty buffers: an empty upload is
/// an ingestion bug, not a document.
pub fn content_hash(bytes: &[u8]) -> Result<String, DedupError> {
    if bytes.is_empty() {
        return Err(DedupError::invalid_input("cannot hash an empty file buffer"));
    }
    Ok(hex_digest(bytes))
}

/// Canonical fingerprint over the invoice identity fields.
///
/// Two invoices with the same normalized vendor, number, date, amount and
/// currency fingerprint identically regardless of capitalization,
/// whitespace or punctuation in the source. Errors when every identity
/// field is absent (currency alone identifies nothing).
pub fn invoice_fingerprint(data: &InvoiceData) -> Result<String, DedupError> {
    if data.is_blank() {
        return Err(DedupError::invalid_input(
            "fingerprint requires at least one of vendor, invoice number, date or amount",
        ));
    }

    let vendor = data.vendor_name.as_deref().map(normalize_vendor);
    let number = data.invoice_number.as_deref().map(normalize_invoice_number);
    let date = data.invoice_date.map(|d| d.format("%Y-%m-%d").to_string());
    let amount = data.total_amount.map(normalize_amount);
    let currency = data.currency.trim().to_uppercase();

    let key = [
        vendor.as_deref().unwrap_or(ABSENT),
        number.as_deref().unwrap_or(ABSENT),
        date.as_deref().unwrap_or(ABSENT),
        amount.as_deref().unwrap_or(ABSENT),
        &currency,
    ]
    .join(&FIELD_SEPARATOR.to_string());

    Ok(hex_digest(key.as_bytes()))
}

/// Case-fold, collapse whitespace, strip punctuation and control
/// characters. Shared with the scoring normalizer so fingerprint and fuzzy
/// comparisons agree on what a vendor name "is".
pub fn normalize_vendor(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_invoice_number(number: &str) -> String {
    number
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != FIELD_SEPARATOR)
        .collect()
}

fn normalize_amount(amount: Decimal) -> String {
    // Fixed-point two decimals, so 100 and 100.00 fingerprint the same.
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::invoice::InvoiceData;
    use crate::errors::DedupError;

    use super::{content_hash, invoice_fingerprint, normalize_vendor};

    fn invoice(vendor: &str, number: &str, amount: Decimal) -> InvoiceData {
        InvoiceData {
            vendor_name: Some(vendor.to_string()),
            invoice_number: Some(number.to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            total_amount: Some(amount),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn content_hash_is_stable_and_content_sensitive() {
        let a = content_hash(b"invoice body").expect("hash");
        let b = content_hash(b"invoice body").expect("hash");
        let c = content_hash(b"invoice body!").expect("hash");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(matches!(content_hash(b""), Err(DedupError::InvalidInput(_))));
    }

    #[test]
    fn fingerprint_survives_formatting_noise() {
        let clean = invoice("Acme Ltd", "INV-001", Decimal::new(10000, 2));
        let noisy = invoice("  ACME, Ltd.  ", "inv-001", Decimal::new(100, 0));

        assert_eq!(
            invoice_fingerprint(&clean).expect("fingerprint"),
            invoice_fingerprint(&noisy).expect("fingerprint"),
        );
    }

    #[test]
    fn different_invoice_numbers_fingerprint_differently() {
        let a = invoice("Acme Ltd", "INV-001", Decimal::new(10000, 2));
        let b = invoice("Acme Ltd", "INV-002", Decimal::new(10000, 2));
        assert_ne!(
            invoice_fingerprint(&a).expect("fingerprint"),
            invoice_fingerprint(&b).expect("fingerprint"),
        );
    }

    #[test]
    fn absent_field_differs_from_empty_field() {
        let mut absent = invoice("Acme Ltd", "INV-001", Decimal::new(10000, 2));
        absent.invoice_number = None;
        // An extraction with a blank number never reaches the fingerprint
        // as an empty string, but the encoding must still keep the two
        // shapes apart.
        let with_number = invoice("Acme Ltd", "", Decimal::new(10000, 2));

        assert_ne!(
            invoice_fingerprint(&absent).expect("fingerprint"),
            invoice_fingerprint(&with_number).expect("fingerprint"),
        );
    }

    #[test]
    fn all_fields_absent_is_invalid_input() {
        let blank = InvoiceData {
            vendor_name: None,
            invoice_number: None,
            invoice_date: None,
            total_amount: None,
            currency: "USD".to_string(),
        };
        assert!(matches!(invoice_fingerprint(&blank), Err(DedupError::InvalidInput(_))));
    }

    #[test]
    fn vendor_normalization_collapses_noise() {
        assert_eq!(normalize_vendor("  ACME,   Ltd. "), "acme ltd");
        assert_eq!(normalize_vendor("Müller & Söhne GmbH"), "müller söhne gmbh");
    }
}
