//! Pure deal calculators.
//!
//! The calculators take validated inputs and a set of [`Weights`] and
//! produce an [`Assessment`]: a score in `0..=100`, a recommendation, a
//! human readable reasoning line and calculator specific metadata.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

mod cash_offer;
mod multifamily;

pub use self::cash_offer::{CashOfferInput, CashOfferMetadata, cash_offer_range};
pub use self::multifamily::{MultifamilyInput, MultifamilyMetadata, multifamily_score};

/// Output of a calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment<M> {
    pub score: f64,
    pub recommendation: String,
    pub reasoning: String,
    pub metadata: M,
}

/// Tunable factors of the cash offer calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashOfferWeights {
    pub arv_discount: f64,
    pub repair_buffer: f64,
    pub min_margin: f64,
    pub max_margin: f64,
}

impl Default for CashOfferWeights {
    fn default() -> Self {
        Self {
            arv_discount: 0.7,
            repair_buffer: 1.1,
            min_margin: 0.10,
            max_margin: 0.18,
        }
    }
}

/// Tunable factors of the multifamily calculator, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultifamilyWeights {
    pub noi_weight: f64,
    pub cap_rate_weight: f64,
    pub comps_weight: f64,
    pub max_score: f64,
}

impl Default for MultifamilyWeights {
    fn default() -> Self {
        Self {
            noi_weight: 40.0,
            cap_rate_weight: 35.0,
            comps_weight: 25.0,
            max_score: 100.0,
        }
    }
}

/// Calculator weights, keyed by calculator.
///
/// Missing sections and missing keys fall back to the defaults, so a partial
/// weights file only overrides what it names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub cash_offer: CashOfferWeights,
    pub multifamily: MultifamilyWeights,
}

impl Weights {
    /// Parses weights from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid weights document: {e}")))
    }

    /// Loads weights from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

pub(crate) fn clamp_score(value: f64, maximum: f64) -> f64 {
    value.min(maximum).max(0.0)
}

pub(crate) fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub(crate) fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Formats a whole amount with thousands separators, e.g. `127,710`.
pub(crate) fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value.is_sign_negative() && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub(crate) fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::invalid_input(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(127_710.0), "127,710");
        assert_eq!(format_thousands(1_234_567.8), "1,234,568");
        assert_eq!(format_thousands(-4500.0), "-4,500");
    }

    #[test]
    fn test_partial_weights_file() {
        let weights =
            Weights::from_json(r#"{"cash_offer": {"arv_discount": 0.65}}"#).unwrap();
        assert_eq!(weights.cash_offer.arv_discount, 0.65);
        assert_eq!(weights.cash_offer.repair_buffer, 1.1);
        assert_eq!(weights.multifamily, MultifamilyWeights::default());
    }

    #[test]
    fn test_invalid_weights_document() {
        assert!(matches!(
            Weights::from_json("[1, 2]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(clamp_score(120.0, 100.0), 100.0);
        assert_eq!(clamp_score(-3.0, 100.0), 0.0);
        assert_eq!(safe_divide(1.0, 0.0), 0.0);
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[6.0, 7.0]), Some(6.5));
        assert_eq!(round_to(1.23456, 2), 1.23);
    }
}
