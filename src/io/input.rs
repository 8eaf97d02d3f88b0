use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{DecisionRecord, TranscriptTurn};

/// A `Speaker`/`Text` line from a raw per-dyad transcript file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub speaker: String,
    pub text: String,
}

/// Read a raw transcript CSV with `Speaker` and `Text` columns (header case ignored)
pub fn read_raw_transcript(path: &Path) -> Result<Vec<RawLine>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open transcript: {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {:?}", path))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .with_context(|| format!("Missing {:?} column in {:?}", name, path))
    };
    let speaker_col = column("speaker")?;
    let text_col = column("text")?;

    let mut lines = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read row {} of {:?}", row + 1, path))?;
        let speaker = record.get(speaker_col).unwrap_or_default().trim();
        if speaker.is_empty() {
            continue;
        }
        lines.push(RawLine {
            speaker: speaker.to_string(),
            text: record.get(text_col).unwrap_or_default().trim().to_string(),
        });
    }

    Ok(lines)
}

/// Read the combined transcript CSV (`ID,dyad,speaker,turn,transcript`)
pub fn read_transcript_turns(path: &Path) -> Result<Vec<TranscriptTurn>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open combined transcript: {:?}", path))?;

    reader
        .deserialize::<TranscriptTurn>()
        .enumerate()
        .map(|(row, turn)| {
            turn.with_context(|| format!("Invalid row {} in {:?}", row + 1, path))
        })
        .collect()
}

/// Read decision records written as JSON lines
pub fn read_decisions_jsonl(path: &Path) -> Result<Vec<DecisionRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open decisions file: {:?}", path))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DecisionRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid decision record on line {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_raw_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dyad_3.csv");
        std::fs::write(
            &path,
            "Speaker,Text,Start\nJo,\"Hello, there\",0\n,,\nSam, Hi ,1\n",
        )
        .unwrap();

        let lines = read_raw_transcript(&path).unwrap();

        assert_eq!(
            lines,
            vec![
                RawLine {
                    speaker: "Jo".to_string(),
                    text: "Hello, there".to_string(),
                },
                RawLine {
                    speaker: "Sam".to_string(),
                    text: "Hi".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_read_raw_transcript_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dyad_3.csv");
        std::fs::write(&path, "Who,Text\nJo,hi\n").unwrap();

        let err = read_raw_transcript(&path).unwrap_err();
        assert!(err.to_string().contains("speaker"));
    }

    #[test]
    fn test_read_transcript_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_transcripts.csv");
        std::fs::write(
            &path,
            "ID,dyad,speaker,turn,transcript\nDyad_1,1,A,1,A: hi\nDyad_1,1,B,2,\"B: hello, you\"\n",
        )
        .unwrap();

        let turns = read_transcript_turns(&path).unwrap();

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].id, "Dyad_1");
        assert_eq!(turns[1].speaker, "B");
        assert_eq!(turns[1].turn, 2);
        assert_eq!(turns[1].transcript, "B: hello, you");
    }
}
