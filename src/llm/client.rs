use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{json_schema, ChatMessage, QuestionSpec};
use crate::error::ClassifyError;
use crate::models::{Alternative, Decision, TokenRecord};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (from OPENAI_API_KEY, or API_KEY)
    pub api_key: String,
    /// API base URL (from OPENAI_BASE_URL)
    pub base_url: String,
    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Sampling temperature; 0 always picks the most likely token
    pub temperature: f64,
    /// Number of alternatives to return per output position
    pub top_logprobs: u8,
    /// Per-request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .context("OPENAI_API_KEY (or API_KEY) environment variable not set")?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            base_url,
            ..Self::new(api_key)
        })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            top_logprobs: 10,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The API accepts 0..=20
    pub fn with_top_logprobs(mut self, top_logprobs: u8) -> Self {
        self.top_logprobs = top_logprobs.min(20);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI chat completions client for schema-constrained single-field decisions
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the model the registered question and return its decision with token logprobs
    pub async fn decide(
        &self,
        messages: Vec<ChatMessage>,
        question_type: &str,
        spec: &QuestionSpec,
    ) -> Result<Decision> {
        let request = self.build_request(messages, question_type, spec);

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error: {} - {}", status, body);
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        decision_from_response(response, question_type)
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        question_type: &str,
        spec: &QuestionSpec,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            stream: false,
            logprobs: true,
            top_logprobs: self.config.top_logprobs,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    strict: true,
                    name: question_type.to_string(),
                    schema: json_schema(question_type, spec),
                },
            },
        }
    }
}

/// Parse a raw chat completion body into a decision
pub fn parse_chat_completion(json: &str, question_type: &str) -> Result<Decision> {
    let response: ChatCompletionResponse =
        serde_json::from_str(json).context("Failed to parse chat completion JSON")?;
    decision_from_response(response, question_type)
}

fn decision_from_response(
    response: ChatCompletionResponse,
    question_type: &str,
) -> Result<Decision> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .context("No choices in response")?;

    let content = choice.message.content.context("No content in response")?;
    let payload: serde_json::Value =
        serde_json::from_str(&content).context("Structured output is not valid JSON")?;
    let predicted_label = payload
        .get(question_type)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ClassifyError::MissingField(question_type.to_string()))?
        .to_string();

    let tokens: Vec<TokenRecord> = choice
        .logprobs
        .and_then(|l| l.content)
        .unwrap_or_default()
        .into_iter()
        .map(|t| TokenRecord {
            text: t.token,
            logprob: t.logprob,
            alternatives: t
                .top_logprobs
                .into_iter()
                .map(|top| Alternative::new(top.token, top.logprob))
                .collect(),
        })
        .collect();

    debug!(
        "Decision {:?} with {} logprob tokens",
        predicted_label,
        tokens.len()
    );

    Ok(Decision::new(predicted_label, tokens))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
    logprobs: bool,
    top_logprobs: u8,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    strict: bool,
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Option<Vec<TokenLogprob>>,
}

#[derive(Debug, Deserialize)]
struct TokenLogprob {
    token: String,
    logprob: f64,
    #[serde(default)]
    top_logprobs: Vec<TopLogprob>,
}

#[derive(Debug, Deserialize)]
struct TopLogprob {
    token: String,
    logprob: f64,
}
