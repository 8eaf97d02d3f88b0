use serde::Serialize;
use tracing::{debug, warn};

use super::{
    aggregate_logprob, extract_class_logprobs, first_alternatives, match_predicted_tokens,
    normalize,
};
use crate::error::ClassifyError;
use crate::llm::QuestionSpec;
use crate::models::{ClassLogprobMap, ClassProbabilityMap, Decision};

/// Class-level view of a single model decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDecision {
    /// The class the model chose
    pub predicted_value: String,
    /// Summed log-probability of the tokens spelling the prediction, if they were found
    pub predicted_logprob: Option<f64>,
    /// Log-probabilities recovered for competing classes
    pub class_logprobs: ClassLogprobMap,
    /// Normalized class probabilities, absent when nothing could be recovered
    pub percentages: Option<ClassProbabilityMap>,
}

impl ParsedDecision {
    /// Probability assigned to the predicted class
    pub fn confidence(&self) -> Option<f64> {
        self.percentages
            .as_ref()
            .and_then(|p| p.get(&self.predicted_value).copied())
    }
}

/// Turn a raw decision into class probabilities.
///
/// 1. Reject predictions outside the registered classes
/// 2. Locate the predicted token span and sum its log-probabilities
/// 3. Read competing classes from the first matched token's alternatives
/// 4. Fall back to the predicted class alone when no alternative is a known class
/// 5. Softmax-normalize
pub fn parse_decision(
    decision: &Decision,
    question_type: &str,
    spec: &QuestionSpec,
) -> Result<ParsedDecision, ClassifyError> {
    let predicted = decision.predicted_label.as_str();

    if !spec.has_class(predicted) {
        return Err(ClassifyError::LabelNotInSchema {
            question_type: question_type.to_string(),
            label: predicted.to_string(),
        });
    }

    let matched = match_predicted_tokens(&decision.tokens, predicted);
    let predicted_logprob = aggregate_logprob(&matched);

    if predicted_logprob.is_none() {
        warn!(
            "Predicted label {:?} not found among {} tokens",
            predicted,
            decision.tokens.len()
        );
    } else {
        debug!(
            "Predicted label {:?} matched {} token(s), logprob {:?}",
            predicted,
            matched.len(),
            predicted_logprob
        );
    }

    let mut class_logprobs = extract_class_logprobs(first_alternatives(&matched), &spec.classes);

    if class_logprobs.is_empty() {
        if let Some(logprob) = predicted_logprob {
            debug!("No competing classes in alternatives, using predicted logprob only");
            class_logprobs.insert(predicted.to_string(), logprob);
        }
    }

    let percentages = normalize(&class_logprobs);

    Ok(ParsedDecision {
        predicted_value: predicted.to_string(),
        predicted_logprob,
        class_logprobs,
        percentages,
    })
}
