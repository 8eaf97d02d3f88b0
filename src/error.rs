use thiserror::Error;

/// Domain errors raised while turning a model decision into class probabilities.
///
/// Gaps in the model's log-probabilities (no matching token, no competing classes) are not
/// errors; they surface as `None` fields on [`crate::logprobs::ParsedDecision`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unsupported question type: {0}")]
    UnsupportedQuestionType(String),

    /// The structured output named a class outside the registered set. This means the
    /// upstream schema constraint was not honored.
    #[error("predicted label {label:?} is not a known class for question type {question_type:?}")]
    LabelNotInSchema {
        question_type: String,
        label: String,
    },

    #[error("structured payload is missing string field {0:?}")]
    MissingField(String),

    #[error("invalid question registry: {0}")]
    InvalidRegistry(String),
}
