//! Engine configuration: scoring weights, classification thresholds and
//! matching tolerances. All values are injected through service
//! constructors; there is no ambient global configuration.

use rust_decimal::Decimal;

use crate::errors::DedupError;

/// Weights applied to the per-field similarity scores.
///
/// The four weights must sum to 1.0 so that overall scores stay in `[0, 1]`
/// and remain comparable across calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringWeights {
    pub vendor: f64,
    pub invoice_number: f64,
    pub date: f64,
    pub amount: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { vendor: 0.35, invoice_number: 0.30, date: 0.15, amount: 0.20 }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), DedupError> {
        let sum = self.vendor + self.invoice_number + self.date + self.amount;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(DedupError::invalid_input(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        if [self.vendor, self.invoice_number, self.date, self.amount]
            .iter()
            .any(|w| !(0.0..=1.0).contains(w))
        {
            return Err(DedupError::invalid_input("scoring weights must lie in [0, 1]"));
        }
        Ok(())
    }
}

/// Ascending confidence thresholds driving duplicate classification.
///
/// `unlikely` participates only in the ordering invariant; any score below
/// `possible` classifies as unique.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchThresholds {
    pub unlikely: f64,
    pub possible: f64,
    pub likely: f64,
    pub certain: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self { unlikely: 0.50, possible: 0.70, likely: 0.85, certain: 0.95 }
    }
}

impl MatchThresholds {
    pub fn validate(&self) -> Result<(), DedupError> {
        let ordered = self.unlikely < self.possible
            && self.possible < self.likely
            && self.likely < self.certain;
        if !ordered {
            return Err(DedupError::invalid_input(format!(
                "thresholds must satisfy unlikely < possible < likely < certain, got {:?}",
                self
            )));
        }
        if self.unlikely < 0.0 || self.certain > 1.0 {
            return Err(DedupError::invalid_input("thresholds must lie in [0, 1]"));
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DedupConfig {
    pub weights: ScoringWeights,
    pub thresholds: MatchThresholds,
    /// Currency assumed when the extraction carries none.
    pub default_currency: String,
    /// Day window beyond which date proximity scores zero.
    pub date_window_days: i64,
    /// Absolute amount tolerance treated as an exact match.
    pub amount_abs_tolerance: Decimal,
    /// Relative band (fraction of the larger amount) outside which the
    /// amount score is zero.
    pub amount_rel_tolerance: f64,
    /// Upper bound on fuzzy candidates fetched per check.
    pub max_fuzzy_candidates: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: MatchThresholds::default(),
            default_currency: "USD".to_string(),
            date_window_days: 30,
            amount_abs_tolerance: Decimal::new(1, 2), // 0.01
            amount_rel_tolerance: 0.05,
            max_fuzzy_candidates: 10,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> Result<(), DedupError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if self.date_window_days <= 0 {
            return Err(DedupError::invalid_input("date window must be positive"));
        }
        if self.max_fuzzy_candidates == 0 {
            return Err(DedupError::invalid_input("fuzzy candidate cap must be positive"));
        }
        Ok(())
    }
}
