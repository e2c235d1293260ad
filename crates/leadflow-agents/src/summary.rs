//! Run summaries returned by agents.

use serde::{Deserialize, Serialize};

/// Result of processing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
    Skipped,
}

/// Per-record entry of a run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub record_id: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn success(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            status: RecordStatus::Success,
            score: None,
            offer: None,
            error: None,
        }
    }

    pub fn error(record_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Error,
            error: Some(error.into()),
            ..Self::success(record_id)
        }
    }

    pub fn skipped(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Skipped,
            error: Some(reason.into()),
            ..Self::success(record_id)
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn with_offer(mut self, offer: f64) -> Self {
        self.offer = Some(offer);
        self
    }

    /// Marks a pending success as failed, keeping the computed values.
    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.status = RecordStatus::Error;
        self.error = Some(error.into());
    }
}

/// Summary of one agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent: String,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<RecordOutcome>,
}

impl AgentSummary {
    /// Tallies the outcomes of a run.
    pub fn new(agent: impl Into<String>, details: Vec<RecordOutcome>) -> Self {
        let count = |status: RecordStatus| details.iter().filter(|d| d.status == status).count();
        Self {
            agent: agent.into(),
            processed: details.len(),
            success: count(RecordStatus::Success),
            failed: count(RecordStatus::Error),
            skipped: count(RecordStatus::Skipped),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_summary_counts_and_shape() {
        let summary = AgentSummary::new(
            "score",
            vec![
                RecordOutcome::success("rec1").with_score(85),
                RecordOutcome::error("rec2", "model unavailable"),
                RecordOutcome::skipped("rec3", "missing ARV"),
            ],
        );

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            serde_json::to_value(&summary.details[0]).unwrap(),
            json!({"record_id": "rec1", "status": "success", "score": 85})
        );
    }
}
