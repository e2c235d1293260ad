//! Cash offer range calculator.

use serde::{Deserialize, Serialize};

use super::{
    Assessment, CashOfferWeights, clamp_score, ensure, format_thousands, round_to, safe_divide,
};
use crate::Result;

const RECOMMENDATION: &str =
    "Anchor low range on first offer; move toward high range with strong motivation.";

/// Confidence below which the high margin widens.
const LOW_CONFIDENCE: f64 = 0.5;
const LOW_CONFIDENCE_MARGIN: f64 = 0.05;

/// Inputs of [`cash_offer_range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashOfferInput {
    #[serde(default)]
    pub lead_id: Option<String>,
    /// After repair value; must be positive.
    pub arv: f64,
    pub estimated_repairs: f64,
    #[serde(default)]
    pub wholesale_fee: f64,
    /// Confidence in the valuation, `0..=1`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

impl CashOfferInput {
    pub fn new(arv: f64, estimated_repairs: f64) -> Self {
        Self {
            lead_id: None,
            arv,
            estimated_repairs,
            wholesale_fee: 0.0,
            confidence: default_confidence(),
        }
    }

    #[must_use]
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    #[must_use]
    pub fn with_wholesale_fee(mut self, wholesale_fee: f64) -> Self {
        self.wholesale_fee = wholesale_fee;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.arv.is_finite() && self.arv > 0.0, "arv must be greater than 0")?;
        ensure(
            self.estimated_repairs.is_finite() && self.estimated_repairs >= 0.0,
            "estimated_repairs must not be negative",
        )?;
        ensure(
            self.wholesale_fee.is_finite() && self.wholesale_fee >= 0.0,
            "wholesale_fee must not be negative",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.confidence),
            "confidence must be between 0 and 1",
        )
    }
}

/// Metadata of a cash offer assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashOfferMetadata {
    pub lead_id: Option<String>,
    pub offer_low: f64,
    pub offer_high: f64,
    /// Width of the window relative to the ARV.
    pub spread: f64,
}

/// Computes an opening cash offer window.
///
/// The base offer is the discounted ARV minus buffered repairs and the
/// wholesale fee. The window is the base offer less the minimum and maximum
/// margins; the narrower it is relative to the ARV, the higher the score.
pub fn cash_offer_range(
    input: &CashOfferInput,
    weights: &CashOfferWeights,
) -> Result<Assessment<CashOfferMetadata>> {
    input.validate()?;

    let base_offer = input.arv * weights.arv_discount
        - input.estimated_repairs * weights.repair_buffer
        - input.wholesale_fee;

    let margin_high = if input.confidence < LOW_CONFIDENCE {
        weights.max_margin + LOW_CONFIDENCE_MARGIN
    } else {
        weights.max_margin
    };
    let margin_low = weights.min_margin;

    let mut high_offer = (base_offer * (1.0 - margin_low)).max(0.0);
    let mut low_offer = (base_offer * (1.0 - margin_high)).max(0.0);
    if high_offer < low_offer {
        std::mem::swap(&mut high_offer, &mut low_offer);
    }

    let spread = safe_divide(high_offer - low_offer, input.arv);
    let score = clamp_score(100.0 - spread * 200.0, 100.0);

    let reasoning = format!(
        "ARV discounting at {:.0}% with repair buffer {:.2} produces a {}-{} window.",
        weights.arv_discount * 100.0,
        weights.repair_buffer,
        format_thousands(low_offer),
        format_thousands(high_offer),
    );

    Ok(Assessment {
        score,
        recommendation: RECOMMENDATION.to_owned(),
        reasoning,
        metadata: CashOfferMetadata {
            lead_id: input.lead_id.clone(),
            offer_low: round_to(low_offer, 2),
            offer_high: round_to(high_offer, 2),
            spread,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_default_window() {
        let input = CashOfferInput::new(200_000.0, 20_000.0).with_lead_id("lead-1");
        let assessment = cash_offer_range(&input, &CashOfferWeights::default()).unwrap();

        assert_eq!(assessment.metadata.offer_low, 96_760.0);
        assert_eq!(assessment.metadata.offer_high, 106_200.0);
        assert!(approx(assessment.metadata.spread, 0.0472));
        assert!(approx(assessment.score, 90.56));
        assert_eq!(assessment.metadata.lead_id.as_deref(), Some("lead-1"));
        assert_eq!(
            assessment.reasoning,
            "ARV discounting at 70% with repair buffer 1.10 produces a 96,760-106,200 window."
        );
    }

    #[test]
    fn test_low_confidence_widens_window() {
        let input = CashOfferInput::new(200_000.0, 20_000.0).with_confidence(0.2);
        let assessment = cash_offer_range(&input, &CashOfferWeights::default()).unwrap();

        // 118,000 less a 23% margin.
        assert_eq!(assessment.metadata.offer_low, 90_860.0);
        assert_eq!(assessment.metadata.offer_high, 106_200.0);
        assert!(assessment.score < 90.56);
    }

    #[test]
    fn test_underwater_deal_floors_at_zero() {
        let input = CashOfferInput::new(100_000.0, 80_000.0).with_wholesale_fee(5_000.0);
        let assessment = cash_offer_range(&input, &CashOfferWeights::default()).unwrap();

        assert_eq!(assessment.metadata.offer_low, 0.0);
        assert_eq!(assessment.metadata.offer_high, 0.0);
        assert_eq!(assessment.score, 100.0);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let weights = CashOfferWeights::default();
        for input in [
            CashOfferInput::new(0.0, 0.0),
            CashOfferInput::new(100_000.0, -1.0),
            CashOfferInput::new(100_000.0, 0.0).with_wholesale_fee(-5.0),
            CashOfferInput::new(100_000.0, 0.0).with_confidence(1.5),
        ] {
            assert!(matches!(
                cash_offer_range(&input, &weights),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_deserialize_defaults() {
        let input: CashOfferInput =
            serde_json::from_str(r#"{"arv": 150000, "estimated_repairs": 10000}"#).unwrap();
        assert_eq!(input.confidence, 0.5);
        assert_eq!(input.wholesale_fee, 0.0);
        assert_eq!(input.lead_id, None);
    }
}
