use serde::{Deserialize, Serialize};

/// One row of the combined transcript file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    /// Source file stem the turn was read from
    #[serde(rename = "ID")]
    pub id: String,
    pub dyad: u32,
    /// Normalized speaker label ("A" or "B")
    pub speaker: String,
    /// 1-based position of the turn within its dyad
    pub turn: u32,
    /// Line in `"<speaker>: <text>"` form
    pub transcript: String,
}

/// One unit of work for the model: a speaker and the transcript shown for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInput {
    pub dyad: u32,
    pub speaker: String,
    pub transcript: String,
}

impl DecisionInput {
    pub fn new(dyad: u32, speaker: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            dyad,
            speaker: speaker.into(),
            transcript: transcript.into(),
        }
    }
}
