//! Motivation scoring with a language model.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

#[cfg(feature = "config")]
use clap::Args;
use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use leadflow_airtable::{FieldValue, Fields, Query, Record, RecordPatch, RecordStore};
use leadflow_ollama::LanguageModel;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::listing::dedup_by_id;
use crate::summary::{AgentSummary, RecordOutcome};
use crate::writeback::write_back;
use crate::{Error, PropertySchema, Result, TRACING_TARGET_AGENT};

const AGENT_NAME: &str = "score";

const PROMPT_PREAMBLE: &str = "\
You are an AI analyst for a wholesale real estate company.
Evaluate the following property based on its potential motivation and distress level for a quick cash sale.

Analyze:
- Property details (year built, beds, baths, sqft, type, location)
- Ownership and situation (vacant, absentee, inherited, tax delinquent, preforeclosure)
- Market context (recent sales, price trends, demand in ZIP)
- Visible distress indicators (repairs needed, liens, age of home, long ownership)
- Online listings and sale history from Zillow, Realtor, Propwire, and general market knowledge

Scoring rules:
1. If sold within the last 24 months → score = 0
2. Otherwise, assign a score 1–100 (90–100 = very motivated, 70–89 = likely motivated, 40–69 = mild, 1–39 = low)
Return only the numeric score, nothing else.

Property data:
";

const NO_FIELDS: &str = "No property fields provided.";

/// Accepted sale date layouts, tried in order on the first ten characters.
const SALE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}").expect("score pattern should compile"));

/// Runtime options of the score agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct ScoreAgentConfig {
    /// Records scored per run when the caller gives no limit.
    #[cfg_attr(
        feature = "config",
        arg(id = "score_max_records", long = "score-max-records", env = "SCORE_MAX_RECORDS")
    )]
    pub max_records: Option<usize>,

    /// Sales this many days old or newer score 0 without asking the model.
    #[cfg_attr(
        feature = "config",
        arg(long = "score-recent-sale-days", env = "SCORE_RECENT_SALE_DAYS", default_value = "730")
    )]
    pub recent_sale_days: i32,
}

impl Default for ScoreAgentConfig {
    fn default() -> Self {
        Self {
            max_records: None,
            recent_sale_days: 730,
        }
    }
}

impl ScoreAgentConfig {
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.recent_sale_days < 0 {
            return Err(Error::config("recent sale window must not be negative"));
        }
        Ok(())
    }
}

/// Extracts the first number between 0 and 100 from a model reply.
///
/// Only runs of one to three digits are considered, so `"1000"` yields `100`
/// and `"150"` is skipped.
pub fn parse_score(reply: &str) -> Option<u8> {
    SCORE_PATTERN
        .find_iter(reply)
        .filter_map(|m| m.as_str().parse::<u16>().ok())
        .find(|score| *score <= 100)
        .and_then(|score| u8::try_from(score).ok())
}

/// Scores properties with a blank motivation score.
#[derive(Clone)]
pub struct ScoreAgent {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn LanguageModel>,
    schema: PropertySchema,
    config: ScoreAgentConfig,
    today: Option<Date>,
}

impl ScoreAgent {
    pub fn new(
        store: Arc<dyn RecordStore>,
        model: Arc<dyn LanguageModel>,
        schema: PropertySchema,
        config: ScoreAgentConfig,
    ) -> Self {
        Self {
            store,
            model,
            schema,
            config,
            today: None,
        }
    }

    /// Pins the date recent sales are measured against. Defaults to the
    /// current UTC date.
    #[must_use]
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    /// Scores up to `limit` records (or the configured maximum) and persists
    /// the scores with one batch update.
    ///
    /// Fails only when the properties cannot be listed; per-record failures
    /// are reported in the summary.
    pub async fn run(
        &self,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<AgentSummary> {
        let schema = &self.schema;
        let limit = limit.or(self.config.max_records);

        let mut query = Query::new(&schema.table)
            .with_filter(PropertySchema::blank_formula(&schema.motivation_score));
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
        records.retain(|record| record.is_blank(&schema.motivation_score));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        if records.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_AGENT,
                agent = AGENT_NAME,
                "No properties require motivation scoring"
            );
        }

        let today = self.today.unwrap_or_else(utc_today);
        let mut outcomes = Vec::with_capacity(records.len());
        let mut patches = Vec::with_capacity(records.len());

        for record in &records {
            if cancel.is_cancelled() {
                outcomes.push(RecordOutcome::error(&record.id, "run cancelled"));
                continue;
            }
            match self.score_record(record, today).await {
                Ok(score) => {
                    patches.push(
                        RecordPatch::new(&record.id).with_field(&schema.motivation_score, score),
                    );
                    outcomes.push(RecordOutcome::success(&record.id).with_score(score));
                }
                Err(message) => {
                    tracing::warn!(
                        target: TRACING_TARGET_AGENT,
                        agent = AGENT_NAME,
                        record_id = %record.id,
                        error = %message,
                        "Failed to score property"
                    );
                    outcomes.push(RecordOutcome::error(&record.id, message));
                }
            }
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
            "Score agent finished"
        );
        Ok(summary)
    }

    async fn score_record(&self, record: &Record, today: Date) -> Result<u8, String> {
        if record.id.is_empty() {
            return Err("missing record id".to_owned());
        }

        if let Some(sold) = self.recent_sale(&record.fields, today) {
            tracing::info!(
                target: TRACING_TARGET_AGENT,
                agent = AGENT_NAME,
                record_id = %record.id,
                sold = %sold,
                "Property sold recently, assigning score 0"
            );
            return Ok(0);
        }

        let prompt = build_prompt(&self.schema, &record.fields);
        let reply = self
            .model
            .generate(&prompt)
            .await
            .map_err(|e| e.to_string())?;
        let score = parse_score(reply.trim())
            .ok_or_else(|| format!("no score between 0 and 100 in model reply {reply:?}"))?;

        tracing::debug!(
            target: TRACING_TARGET_AGENT,
            agent = AGENT_NAME,
            record_id = %record.id,
            score,
            "Scored property"
        );
        Ok(score)
    }

    /// Returns the first parseable sale date if it lies within the window.
    fn recent_sale(&self, fields: &Fields, today: Date) -> Option<Date> {
        let sold = self
            .schema
            .sale_date_fields()
            .into_iter()
            .filter_map(|name| fields.get(name))
            .find_map(parse_sale_date)?;
        let days = sold.until(today).ok()?.get_days();
        (days <= self.config.recent_sale_days).then_some(sold)
    }
}

impl fmt::Debug for ScoreAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreAgent")
            .field("model", &self.model.model_name())
            .field("table", &self.schema.table)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn utc_today() -> Date {
    Timestamp::now().to_zoned(TimeZone::UTC).date()
}

fn parse_sale_date(value: &FieldValue) -> Option<Date> {
    let text = value.as_str()?.trim();
    let head = text.get(..10).unwrap_or(text);
    SALE_DATE_FORMATS
        .iter()
        .find_map(|format| Date::strptime(format, head).ok())
}

/// Renders the scoring prompt: key fields in fixed order, then every other
/// non-blank field alphabetically.
fn build_prompt(schema: &PropertySchema, fields: &Fields) -> String {
    let mut lines = Vec::new();
    let mut seen = BTreeSet::new();

    for name in schema.key_fields() {
        if let Some(value) = fields.get(name) {
            lines.push(format!("{name}: {value}"));
            seen.insert(name);
        }
    }
    for (name, value) in fields {
        if seen.contains(name.as_str()) || value.is_blank() {
            continue;
        }
        lines.push(format!("{name}: {value}"));
    }

    let data = if lines.is_empty() {
        NO_FIELDS.to_owned()
    } else {
        lines.join("\n")
    };
    format!("{PROMPT_PREAMBLE}{data}\n")
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use leadflow_airtable::mock::MemoryStore;
    use leadflow_airtable::{Error as StoreError, Operation};
    use leadflow_ollama::mock::MockModel;

    use super::*;
    use crate::RecordStatus;

    const TABLE: &str = "Properties";

    fn agent(store: &MemoryStore, model: &MockModel) -> ScoreAgent {
        ScoreAgent::new(
            Arc::new(store.clone()),
            Arc::new(model.clone()),
            PropertySchema::default(),
            ScoreAgentConfig::default(),
        )
        .with_today(date(2024, 6, 1))
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("85"), Some(85));
        assert_eq!(parse_score("Score: 72/100"), Some(72));
        assert_eq!(parse_score("150 then 40"), Some(40));
        assert_eq!(parse_score("1000"), Some(100));
        assert_eq!(parse_score("0"), Some(0));
        assert_eq!(parse_score("very motivated"), None);
        assert_eq!(parse_score("999"), None);
    }

    #[test]
    fn test_prompt_orders_key_fields_first() {
        let record = Record::new("rec1")
            .with_field("Zip", "30301")
            .with_field("Address", "1 Main St")
            .with_field("Notes", "roof leak")
            .with_field("Agent", "")
            .with_field("Baths", FieldValue::Null)
            .with_field("Tags", vec!["absentee", "", "vacant"]);

        let prompt = build_prompt(&PropertySchema::default(), &record.fields);

        assert!(prompt.starts_with(PROMPT_PREAMBLE));
        assert!(prompt.ends_with(
            "Address: 1 Main St\nZip: 30301\nBaths: \nNotes: roof leak\nTags: absentee, vacant\n"
        ));
        assert!(!prompt.contains("Agent:"));
    }

    #[test]
    fn test_prompt_without_fields() {
        let prompt = build_prompt(&PropertySchema::default(), &Fields::new());
        assert!(prompt.ends_with("Property data:\nNo property fields provided.\n"));
    }

    #[test]
    fn test_parse_sale_date_formats() {
        let expected = Some(date(2023, 5, 1));
        assert_eq!(parse_sale_date(&"2023-05-01".into()), expected);
        assert_eq!(parse_sale_date(&"05/01/2023".into()), expected);
        assert_eq!(parse_sale_date(&"2023/05/01".into()), expected);
        assert_eq!(parse_sale_date(&"2023-05-01T12:00:00.000Z".into()), expected);
        assert_eq!(parse_sale_date(&"May 1st".into()), None);
        assert_eq!(parse_sale_date(&FieldValue::from(2023)), None);
    }

    #[tokio::test]
    async fn test_scores_and_persists() {
        let store = MemoryStore::new();
        store.insert(TABLE, Record::new("recA").with_field("Address", "1 Main St"));
        store.insert(TABLE, Record::new("recB").with_field("Address", "2 Oak Ave"));
        let model = MockModel::with_replies(["85", "Score: 42"]);

        let summary = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.agent, "score");
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.details[0].score, Some(85));
        assert_eq!(summary.details[1].score, Some(42));
        assert_eq!(store.updates().len(), 1);

        let record = store.record(TABLE, "recB").unwrap();
        assert_eq!(
            record.field("Motivation Score").and_then(FieldValue::as_f64),
            Some(42.0)
        );
        assert!(model.prompts()[0].contains("Address: 1 Main St"));

        let query = &store.queries()[0];
        assert_eq!(
            query.filter_formula(),
            Some("OR({Motivation Score} = '', {Motivation Score} = BLANK())")
        );
    }

    #[tokio::test]
    async fn test_recent_sale_scores_zero_without_model() {
        let store = MemoryStore::new();
        store.insert(TABLE, Record::new("recSold").with_field("Last Sold Date", "2023-05-01"));
        store.insert(TABLE, Record::new("recOld").with_field("Last Sale Date", "01/15/2019"));
        let model = MockModel::always("77");

        let summary = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.details[0].score, Some(0));
        assert_eq!(summary.details[1].score, Some(77));
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_limit_and_already_scored_records() {
        let store = MemoryStore::new();
        store.insert(TABLE, Record::new("recDone").with_field("Motivation Score", 90));
        for i in 0..5 {
            store.insert(TABLE, Record::new(format!("rec{i}")));
        }
        let model = MockModel::always("50");

        let summary = agent(&store, &model)
            .run(Some(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.queries()[0].max_records(), Some(2));
        // The store truncates before the blank check, leaving one candidate.
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.details[0].record_id, "rec0");
    }

    #[tokio::test]
    async fn test_model_failures_are_per_record() {
        let store = MemoryStore::new();
        store.insert(TABLE, Record::new("recA"));
        store.insert(TABLE, Record::new("recB"));
        store.insert(TABLE, Record::new("recC"));
        let model = MockModel::with_replies(["not sure"]);
        model.push_error(500, "model crashed");

        let summary = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.failed, 3);
        assert!(
            summary.details[0]
                .error
                .as_deref()
                .unwrap()
                .contains("no score between 0 and 100")
        );
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_partial_write_failure() {
        let store = MemoryStore::new().with_failing_chunks_from(1);
        for i in 0..23 {
            store.insert(TABLE, Record::new(format!("rec{i:02}")));
        }
        let model = MockModel::always("64");

        let summary = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.success, 10);
        assert_eq!(summary.failed, 13);
        assert_eq!(summary.details[10].status, RecordStatus::Error);
        assert_eq!(summary.details[10].score, Some(64));
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let store = MemoryStore::new().with_list_error(|| StoreError::Authentication {
            operation: Operation::List,
            resource: TABLE.to_owned(),
            attempts: 1,
            status: 401,
            message: "invalid token".to_owned(),
        });
        let model = MockModel::always("50");

        let error = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Store(ref e) if e.is_authentication()));
    }

    #[tokio::test]
    async fn test_repeated_listing_scored_once() {
        let store = MemoryStore::new();
        store.insert(TABLE, Record::new("recA").with_field("Address", "1 Main St"));
        store.insert(TABLE, Record::new("recB").with_field("Address", "2 Oak Ave"));
        store.insert(TABLE, Record::new("recA").with_field("Address", "1 Main St"));
        let model = MockModel::with_replies(["85", "40", "10"]);

        let summary = agent(&store, &model)
            .run(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.success, 2);
        assert_eq!(model.prompts().len(), 2);

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let ids: Vec<_> = updates[0].iter().map(|patch| patch.id.as_str()).collect();
        assert_eq!(ids, ["recA", "recB"]);
    }
}
