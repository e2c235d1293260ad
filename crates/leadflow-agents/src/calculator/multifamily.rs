//! Multifamily acquisition scoring.

use serde::{Deserialize, Serialize};

use super::{Assessment, MultifamilyWeights, average, clamp_score, ensure, safe_divide};
use crate::Result;

/// Occupancy at which the bonus is zero.
const STABILIZED_OCCUPANCY: f64 = 0.9;
const OCCUPANCY_BONUS_FACTOR: f64 = 50.0;

/// Inputs of [`multifamily_score`].
///
/// A cap rate of zero counts as not provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultifamilyInput {
    #[serde(default)]
    pub property_id: Option<String>,
    /// Net operating income.
    pub noi: f64,
    pub purchase_price: f64,
    #[serde(default)]
    pub cap_rate: Option<f64>,
    #[serde(default)]
    pub market_cap_rate: Option<f64>,
    #[serde(default)]
    pub comparable_cap_rates: Vec<f64>,
    /// Occupancy, `0..=1`.
    #[serde(default)]
    pub occupancy_rate: Option<f64>,
}

impl MultifamilyInput {
    pub fn new(noi: f64, purchase_price: f64) -> Self {
        Self {
            noi,
            purchase_price,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.noi.is_finite() && self.noi >= 0.0, "noi must not be negative")?;
        ensure(
            self.purchase_price.is_finite() && self.purchase_price > 0.0,
            "purchase_price must be greater than 0",
        )?;
        ensure(
            self.cap_rate.is_none_or(|rate| rate >= 0.0),
            "cap_rate must not be negative",
        )?;
        ensure(
            self.market_cap_rate.is_none_or(|rate| rate >= 0.0),
            "market_cap_rate must not be negative",
        )?;
        ensure(
            self.comparable_cap_rates.iter().all(|rate| rate.is_finite()),
            "comparable_cap_rates must be finite",
        )?;
        ensure(
            self.occupancy_rate
                .is_none_or(|rate| (0.0..=1.0).contains(&rate)),
            "occupancy_rate must be between 0 and 1",
        )
    }
}

/// Metadata of a multifamily assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultifamilyMetadata {
    pub property_id: Option<String>,
    /// NOI over purchase price, in percent.
    pub noi_yield: f64,
    pub cap_rate: f64,
    pub market_cap_rate: f64,
    pub comps_average: f64,
    pub occupancy_bonus: f64,
}

/// Scores a multifamily deal from its yield, cap rate spread and comps.
pub fn multifamily_score(
    input: &MultifamilyInput,
    weights: &MultifamilyWeights,
) -> Result<Assessment<MultifamilyMetadata>> {
    input.validate()?;

    let provided = |rate: Option<f64>| rate.filter(|rate| *rate != 0.0);

    let noi_yield = safe_divide(input.noi, input.purchase_price) * 100.0;
    let cap_rate = provided(input.cap_rate).unwrap_or(noi_yield);
    let market_cap_rate = provided(input.market_cap_rate).unwrap_or(cap_rate);
    let cap_delta = cap_rate - market_cap_rate;

    let comps_average = provided(average(&input.comparable_cap_rates)).unwrap_or(market_cap_rate);
    let comps_delta = cap_rate - comps_average;

    let occupancy_bonus = input
        .occupancy_rate
        .map_or(0.0, |rate| (rate - STABILIZED_OCCUPANCY) * OCCUPANCY_BONUS_FACTOR);

    let raw_score = noi_yield * (weights.noi_weight / 100.0)
        + cap_delta * 100.0 * (weights.cap_rate_weight / 100.0)
        + comps_delta * 100.0 * (weights.comps_weight / 100.0)
        + occupancy_bonus;
    let score = clamp_score(raw_score, weights.max_score);

    let recommendation = if score >= 80.0 {
        "Advance to underwriting; numbers support acquisition."
    } else if score >= 60.0 {
        "Gather more comps and stress test financing assumptions."
    } else {
        "Deprioritize; financial metrics trail market expectations."
    };

    Ok(Assessment {
        score,
        recommendation: recommendation.to_owned(),
        reasoning: format!(
            "NOI yield of {noi_yield:.2}% and cap delta of {cap_delta:.2}% result in a score of {score:.1}."
        ),
        metadata: MultifamilyMetadata {
            property_id: input.property_id.clone(),
            noi_yield,
            cap_rate,
            market_cap_rate,
            comps_average,
            occupancy_bonus,
        },
    })
}
