use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::logprobs::normalize_token_text;

/// Question type registered by default
pub const DEFAULT_QUESTION_TYPE: &str = "gender";

/// A structured question: what to ask and which answers are allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Prompt appended to the conversation as the final user message
    pub question: String,
    /// Mutually exclusive class labels, in export column order
    pub classes: Vec<String>,
}

impl QuestionSpec {
    pub fn new<I, S>(question: impl Into<String>, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_class(&self, label: &str) -> bool {
        self.classes.iter().any(|class| class == label)
    }

    fn validate(&self, question_type: &str) -> Result<(), ClassifyError> {
        let invalid = |reason: String| {
            ClassifyError::InvalidRegistry(format!("question type {:?}: {}", question_type, reason))
        };

        if self.question.trim().is_empty() {
            return Err(invalid("question is empty".to_string()));
        }
        if self.classes.is_empty() {
            return Err(invalid("no classes".to_string()));
        }

        let mut seen = HashSet::new();
        for class in &self.classes {
            if class.is_empty() {
                return Err(invalid("empty class label".to_string()));
            }
            // Labels are compared against quote-stripped token text
            if normalize_token_text(class) != class {
                return Err(invalid(format!(
                    "class {:?} has leading/trailing quotes or whitespace",
                    class
                )));
            }
            if !seen.insert(class.as_str()) {
                return Err(invalid(format!("duplicate class {:?}", class)));
            }
        }

        Ok(())
    }
}

/// Lookup table from question type to its question and class set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionRegistry {
    questions: BTreeMap<String, QuestionSpec>,
}

impl Default for QuestionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuestionRegistry {
    /// Registry with the built-in question types
    pub fn builtin() -> Self {
        let mut questions = BTreeMap::new();
        questions.insert(
            DEFAULT_QUESTION_TYPE.to_string(),
            QuestionSpec::new("Which gender do you identify as?", ["male", "female"]),
        );
        Self { questions }
    }

    /// Build a registry from explicit entries, validating each one
    pub fn from_entries<I>(entries: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = (String, QuestionSpec)>,
    {
        let registry = Self {
            questions: entries.into_iter().collect(),
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Parse a registry from JSON: `{"<type>": {"question": "...", "classes": [...]}}`
    pub fn from_json(json: &str) -> Result<Self> {
        let registry: QuestionRegistry =
            serde_json::from_str(json).context("Failed to parse question registry JSON")?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question registry: {:?}", path))?;
        Self::from_json(&content)
    }

    /// Load from `path` if given, otherwise use the built-in registry
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    fn validate(&self) -> Result<(), ClassifyError> {
        if self.questions.is_empty() {
            return Err(ClassifyError::InvalidRegistry(
                "no question types defined".to_string(),
            ));
        }
        for (question_type, spec) in &self.questions {
            if question_type.trim().is_empty() {
                return Err(ClassifyError::InvalidRegistry(
                    "empty question type name".to_string(),
                ));
            }
            spec.validate(question_type)?;
        }
        Ok(())
    }

    pub fn get(&self, question_type: &str) -> Result<&QuestionSpec, ClassifyError> {
        self.questions
            .get(question_type)
            .ok_or_else(|| ClassifyError::UnsupportedQuestionType(question_type.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QuestionSpec)> {
        self.questions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Strict JSON schema forcing a single enumerated string field named after the question type
pub fn json_schema(question_type: &str, spec: &QuestionSpec) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        question_type.to_string(),
        serde_json::json!({
            "type": "string",
            "enum": spec.classes,
        }),
    );

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": [question_type],
        "additionalProperties": false
    })
}
