use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TokenRecord;

/// Aggregated log-probability per class label. May cover only a subset of the known classes.
pub type ClassLogprobMap = BTreeMap<String, f64>;

/// Normalized probability per class label. Values sum to 1.0.
pub type ClassProbabilityMap = BTreeMap<String, f64>;

/// Result of one schema-constrained model query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Class label decoded from the structured JSON payload
    pub predicted_label: String,
    /// Every token emitted during generation, in order
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
}

impl Decision {
    pub fn new(predicted_label: impl Into<String>, tokens: Vec<TokenRecord>) -> Self {
        Self {
            predicted_label: predicted_label.into(),
            tokens,
        }
    }
}

/// A decision together with the transcript row it was made for.
///
/// Persisted as one JSON line per decision so a run can be re-parsed offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    pub decided_at: DateTime<Utc>,
    pub dyad: u32,
    pub speaker: String,
    /// Transcript text that was sent to the model
    pub text: String,
    pub question_type: String,
    pub model: String,
    pub decision: Decision,
}

impl DecisionRecord {
    pub fn new(
        dyad: u32,
        speaker: impl Into<String>,
        text: impl Into<String>,
        question_type: impl Into<String>,
        model: impl Into<String>,
        decision: Decision,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            decided_at: Utc::now(),
            dyad,
            speaker: speaker.into(),
            text: text.into(),
            question_type: question_type.into(),
            model: model.into(),
            decision,
        }
    }
}
