use std::future::Future;

use anyhow::Result;
use tracing::{info, warn};

use crate::llm::{build_messages, ChatMessage, OpenAiClient, QuestionRegistry, QuestionSpec};
use crate::models::{Decision, DecisionInput, DecisionRecord};

/// Anything that can answer a structured question about a conversation
pub trait Decider {
    /// Model identifier recorded with each decision
    fn model(&self) -> &str;

    fn decide(
        &self,
        messages: Vec<ChatMessage>,
        question_type: &str,
        spec: &QuestionSpec,
    ) -> impl Future<Output = Result<Decision>> + Send;
}

impl Decider for OpenAiClient {
    fn model(&self) -> &str {
        OpenAiClient::model(self)
    }

    fn decide(
        &self,
        messages: Vec<ChatMessage>,
        question_type: &str,
        spec: &QuestionSpec,
    ) -> impl Future<Output = Result<Decision>> + Send {
        OpenAiClient::decide(self, messages, question_type, spec)
    }
}

/// Configuration for Stage 2
#[derive(Debug, Clone)]
pub struct Stage2Config {
    /// Speaker labels to classify; inputs for other speakers are skipped
    pub speakers: Vec<String>,
}

impl Default for Stage2Config {
    fn default() -> Self {
        Self {
            speakers: vec!["A".to_string(), "B".to_string()],
        }
    }
}

/// Result of Stage 2 processing
#[derive(Debug)]
pub struct Stage2Result {
    /// Decisions that came back from the model
    pub records: Vec<DecisionRecord>,
    /// Inputs skipped because their speaker is not classified
    pub skipped: usize,
    /// Requests that failed
    pub failures: usize,
}

/// Execute Stage 2: query the model once per decision input
///
/// An unsupported question type fails before any request is made. A failed request only
/// loses that one decision.
pub async fn execute_decisions<D: Decider>(
    client: &D,
    inputs: &[DecisionInput],
    question_type: &str,
    registry: &QuestionRegistry,
    config: &Stage2Config,
) -> Result<Stage2Result> {
    let spec = registry.get(question_type)?;

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut failures = 0;

    info!(
        "Stage 2: {} inputs, question type {:?}, model {}",
        inputs.len(),
        question_type,
        client.model()
    );

    for input in inputs {
        if !config.speakers.contains(&input.speaker) {
            skipped += 1;
            continue;
        }

        let messages = build_messages(&input.transcript, &input.speaker, &spec.question);

        match client.decide(messages, question_type, spec).await {
            Ok(decision) => {
                info!(
                    "Dyad {} speaker {}: {}",
                    input.dyad, input.speaker, decision.predicted_label
                );
                records.push(DecisionRecord::new(
                    input.dyad,
                    input.speaker.as_str(),
                    input.transcript.as_str(),
                    question_type,
                    client.model(),
                    decision,
                ));
            }
            Err(e) => {
                warn!(
                    "Dyad {} speaker {} failed: {:#}",
                    input.dyad, input.speaker, e
                );
                failures += 1;
            }
        }
    }

    Ok(Stage2Result {
        records,
        skipped,
        failures,
    })
}
