use serde::{Deserialize, Serialize};

/// One of the top-K candidate tokens the model considered at an output position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Raw token text, possibly carrying JSON quote characters
    pub text: String,
    /// Natural log-probability of this candidate (<= 0)
    pub logprob: f64,
}

impl Alternative {
    pub fn new(text: impl Into<String>, logprob: f64) -> Self {
        Self {
            text: text.into(),
            logprob,
        }
    }
}

/// A single decoded output token with its log-probability and top-K alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Raw token text as emitted by the model
    pub text: String,
    /// Natural log-probability of the emitted token (<= 0)
    pub logprob: f64,
    /// Most likely tokens at this position, in the order the model returned them
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl TokenRecord {
    pub fn new(text: impl Into<String>, logprob: f64) -> Self {
        Self {
            text: text.into(),
            logprob,
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Alternative>) -> Self {
        self.alternatives = alternatives;
        self
    }
}
