use std::collections::BTreeMap;

use clap::ValueEnum;

use crate::models::{DecisionInput, TranscriptTurn};

/// How much of a dyad's conversation the model sees for each decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscriptMethod {
    /// Whole dialogue from both partners, once per speaker
    EachPartSim,
    /// Only the target speaker's own lines
    EachPartAlone,
    /// A single turn at a time
    EachTurnAlone,
}

/// Execute Stage 1: restructure combined turns into decision inputs
///
/// `turns` are expected sorted by dyad then turn, as produced by Stage 0.
pub fn structure_transcript(
    turns: &[TranscriptTurn],
    method: TranscriptMethod,
) -> Vec<DecisionInput> {
    match method {
        TranscriptMethod::EachPartSim => {
            let mut dyads: BTreeMap<u32, (Vec<&str>, Vec<&str>)> = BTreeMap::new();
            for turn in turns {
                let (speakers, lines) = dyads.entry(turn.dyad).or_default();
                if !speakers.contains(&turn.speaker.as_str()) {
                    speakers.push(turn.speaker.as_str());
                }
                lines.push(turn.transcript.as_str());
            }

            dyads
                .into_iter()
                .flat_map(|(dyad, (speakers, lines))| {
                    let joined = lines.join("\n");
                    speakers
                        .into_iter()
                        .map(move |speaker| DecisionInput::new(dyad, speaker, joined.clone()))
                })
                .collect()
        }
        TranscriptMethod::EachPartAlone => {
            let mut parts: BTreeMap<(u32, &str), Vec<&str>> = BTreeMap::new();
            for turn in turns {
                parts
                    .entry((turn.dyad, turn.speaker.as_str()))
                    .or_default()
                    .push(turn.transcript.as_str());
            }

            parts
                .into_iter()
                .map(|((dyad, speaker), lines)| DecisionInput::new(dyad, speaker, lines.join("\n")))
                .collect()
        }
        TranscriptMethod::EachTurnAlone => turns
            .iter()
            .map(|turn| {
                DecisionInput::new(turn.dyad, turn.speaker.as_str(), turn.transcript.as_str())
            })
            .collect(),
    }
}
