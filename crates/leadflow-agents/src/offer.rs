//! Cash offers for motivated properties.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use leadflow_airtable::{FieldValue, Query, Record, RecordPatch, RecordStore};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::calculator::round_to;
use crate::listing::dedup_by_id;
use crate::summary::{AgentSummary, RecordOutcome};
use crate::writeback::write_back;
use crate::{Error, PropertySchema, Result, TRACING_TARGET_AGENT};

const AGENT_NAME: &str = "offer";

/// Runtime options of the offer agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct OfferAgentConfig {
    /// Minimum motivation score for a property to receive an offer.
    #[cfg_attr(
        feature = "config",
        arg(long = "offer-threshold", env = "OFFER_THRESHOLD", default_value = "70")
    )]
    pub threshold: u8,

    /// Share of the ARV offered before repairs.
    #[cfg_attr(
        feature = "config",
        arg(long = "offer-margin", env = "OFFER_MARGIN", default_value = "0.7")
    )]
    pub margin: f64,

    /// Value written to the offer type column.
    #[cfg_attr(
        feature = "config",
        arg(long = "offer-type", env = "OFFER_TYPE", default_value = "Cash")
    )]
    pub offer_type: String,

    /// Records processed per run when the caller gives no limit.
    #[cfg_attr(
        feature = "config",
        arg(id = "offer_max_records", long = "offer-max-records", env = "OFFER_MAX_RECORDS")
    )]
    pub max_records: Option<usize>,
}

impl Default for OfferAgentConfig {
    fn default() -> Self {
        Self {
            threshold: 70,
            margin: 0.7,
            offer_type: "Cash".to_owned(),
            max_records: None,
        }
    }
}

impl OfferAgentConfig {
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold > 100 {
            return Err(Error::config("offer threshold must be between 0 and 100"));
        }
        if !(self.margin.is_finite() && self.margin > 0.0) {
            return Err(Error::config("offer margin must be a positive number"));
        }
        if self.offer_type.trim().is_empty() {
            return Err(Error::config("offer type must not be empty"));
        }
        Ok(())
    }
}

/// Offer for an ARV and repair estimate: `max(arv * margin - repairs, 0)`,
/// rounded to cents.
pub fn cash_offer(arv: f64, repairs: f64, margin: f64) -> f64 {
    round_to((arv * margin - repairs).max(0.0), 2)
}

/// Writes suggested offers for motivated properties that have none yet.
#[derive(Clone)]
pub struct OfferAgent {
    store: Arc<dyn RecordStore>,
    schema: PropertySchema,
    config: OfferAgentConfig,
}

impl OfferAgent {
    pub fn new(store: Arc<dyn RecordStore>, schema: PropertySchema, config: OfferAgentConfig) -> Self {
        Self {
            store,
            schema,
            config,
        }
    }

    /// Prices up to `limit` records and persists the offers with one batch
    /// update. Records without an ARV are skipped.
    pub async fn run(
        &self,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<AgentSummary> {
        let schema = &self.schema;
        let limit = limit.or(self.config.max_records);

        let mut query = Query::new(&schema.table).with_filter(self.filter_formula());
        if let Some(limit) = limit {
            query = query.with_max_records(u32::try_from(limit).unwrap_or(u32::MAX));
        }

        let mut records = self.store.list_records(&query, cancel).await?;
        let duplicates = dedup_by_id(&mut records);
        if duplicates > 0 {
            tracing::debug!(
                target: TRACING_TARGET_AGENT,
                agent = AGENT_NAME,
                duplicates,
                "Dropped repeated records from listing"
            );
        }
        records.retain(|record| self.is_candidate(record));
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        let mut outcomes = Vec::with_capacity(records.len());
        let mut patches = Vec::with_capacity(records.len());

        for record in &records {
            let Some(arv) = record
                .field(&schema.arv)
                .and_then(FieldValue::as_f64)
                .filter(|arv| *arv > 0.0)
            else {
                tracing::info!(
                    target: TRACING_TARGET_AGENT,
                    agent = AGENT_NAME,
                    record_id = %record.id,
                    "Skipping property without ARV"
                );
                outcomes.push(RecordOutcome::skipped(&record.id, "missing ARV"));
                continue;
            };
            let repairs = record
                .field(&schema.estimated_repairs)
                .and_then(FieldValue::as_f64)
                .unwrap_or(0.0);
            let offer = cash_offer(arv, repairs, self.config.margin);

            tracing::debug!(
                target: TRACING_TARGET_AGENT,
                agent = AGENT_NAME,
                record_id = %record.id,
                arv,
                repairs,
                offer,
                "Priced property"
            );
            patches.push(
                RecordPatch::new(&record.id)
                    .with_field(&schema.suggested_offer, offer)
                    .with_field(&schema.offer_type, self.config.offer_type.as_str()),
            );
            outcomes.push(RecordOutcome::success(&record.id).with_offer(offer));
        }

        write_back(
            self.store.as_ref(),
            AGENT_NAME,
            &schema.table,
            &patches,
            &mut outcomes,
            cancel,
        )
        .await;

        let summary = AgentSummary::new(AGENT_NAME, outcomes);
        tracing::info!(
            target: TRACING_TARGET_AGENT,
            agent = AGENT_NAME,
            processed = summary.processed,
            success = summary.success,
            failed = summary.failed,
            skipped = summary.skipped,
            "Offer agent finished"
        );
        Ok(summary)
    }

    fn filter_formula(&self) -> String {
        format!(
            "AND({{{}}} >= {}, {})",
            self.schema.motivation_score,
            self.config.threshold,
            PropertySchema::blank_formula(&self.schema.suggested_offer),
        )
    }

    fn is_candidate(&self, record: &Record) -> bool {
        let motivated = record
            .field(&self.schema.motivation_score)
            .and_then(FieldValue::as_f64)
            .is_some_and(|score| score >= f64::from(self.config.threshold));
        motivated && record.is_blank(&self.schema.suggested_offer)
    }
}

impl fmt::Debug for OfferAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfferAgent")
            .field("table", &self.schema.table)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use leadflow_airtable::mock::MemoryStore;

    use super::*;
    use crate::RecordStatus;

    const TABLE: &str = "Properties";

    fn agent(store: &MemoryStore) -> OfferAgent {
        OfferAgent::new(
            Arc::new(store.clone()),
            PropertySchema::default(),
            OfferAgentConfig::default(),
        )
    }

    #[test]
    fn test_cash_offer() {
        assert_eq!(cash_offer(200_000.0, 25_000.0, 0.7), 115_000.0);
        assert_eq!(cash_offer(100_000.0, 90_000.0, 0.7), 0.0);
        assert_eq!(cash_offer(123_456.78, 1_000.0, 0.7), 85_419.75);
    }

    #[test]
    fn test_config_validation() {
        assert!(OfferAgentConfig::default().validate().is_ok());
        assert!(OfferAgentConfig::default().with_threshold(101).validate().is_err());
        assert!(OfferAgentConfig::default().with_margin(0.0).validate().is_err());
    }

    #[tokio::test]
    async fn test_prices_motivated_properties() {
        let store = MemoryStore::new();
        store.insert(
            TABLE,
            Record::new("recA")
                .with_field("Motivation Score", 85)
                .with_field("ARV", "$200,000")
                .with_field("Estimated Repairs", 25_000),
        );
        store.insert(TABLE, Record::new("recLow").with_field("Motivation Score", 40));
        store.insert(
            TABLE,
            Record::new("recPriced")
                .with_field("Motivation Score", 90)
                .with_field("Suggested Offer", 50_000),
        );
        store.insert(TABLE, Record::new("recNoArv").with_field("Motivation Score", 75));

        let summary = agent(&store)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.agent, "offer");
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.details[0].offer, Some(115_000.0));
        assert_eq!(summary.details[1].status, RecordStatus::Skipped);

        let record = store.record(TABLE, "recA").unwrap();
        assert_eq!(
            record.field("Suggested Offer").and_then(FieldValue::as_f64),
            Some(115_000.0)
        );
        assert_eq!(
            record.field("Offer Type").and_then(FieldValue::as_str),
            Some("Cash")
        );
        assert_eq!(
            store.queries()[0].filter_formula(),
            Some(
                "AND({Motivation Score} >= 70, OR({Suggested Offer} = '', {Suggested Offer} = BLANK()))"
            )
        );
    }

    #[tokio::test]
    async fn test_nothing_to_price() {
        let store = MemoryStore::new();
        let summary = agent(&store)
            .run(Some(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.processed, 0);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_listing_priced_once() {
        let store = MemoryStore::new();
        let record = Record::new("recA")
            .with_field("Motivation Score", 85)
            .with_field("ARV", 100_000);
        store.insert(TABLE, record.clone());
        store.insert(TABLE, record);

        let summary = agent(&store)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.details[0].offer, Some(70_000.0));

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].len(), 1);
    }
}
