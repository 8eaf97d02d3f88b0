use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat role a transcript line is replayed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The speaker the model is asked to be
    Assistant,
    /// The conversation partner, and the final question
    User,
}

/// A single chat message sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Replay a `speaker: text` transcript from `which_speaker`'s point of view, then ask the question.
///
/// Lines spoken by `which_speaker` become assistant turns and everything else becomes user
/// turns, so the model answers in the first person as that speaker. Blank lines and lines
/// with no speaker prefix are skipped.
pub fn build_messages(transcript: &str, which_speaker: &str, question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    for line in transcript.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((speaker, text)) = line.split_once(':') else {
            debug!("Skipping transcript line without speaker prefix: {:?}", line);
            continue;
        };

        let role = if speaker.trim() == which_speaker {
            ChatRole::Assistant
        } else {
            ChatRole::User
        };
        messages.push(ChatMessage::new(role, text.trim()));
    }

    messages.push(ChatMessage::new(ChatRole::User, question));
    messages
}
