use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::io::{read_raw_transcript, RawLine};
use crate::models::TranscriptTurn;

/// Dyad id embedded in a transcript file name, e.g. `Dyad_12`, `Dyad-3`, `Dyad 7`
static DYAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Dyad[ _-]?(\d+)").expect("valid dyad regex"));

/// Speaker labels assigned by order of first appearance
const SPEAKER_LABELS: [&str; 2] = ["A", "B"];

/// Result of Stage 0
#[derive(Debug)]
pub struct CombineResult {
    /// All turns, sorted by dyad then turn number
    pub turns: Vec<TranscriptTurn>,
    /// Number of transcript files combined
    pub files_combined: usize,
    /// Files skipped because no dyad id was found in the name
    pub files_skipped: Vec<PathBuf>,
}

/// Extract the dyad id from a file stem
pub fn dyad_id_from_name(stem: &str) -> Option<u32> {
    DYAD_RE
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Execute Stage 0: combine a folder of per-dyad transcript CSVs into one turn table
///
/// Each file must carry its dyad id in the name and have `Speaker` and `Text` columns.
/// The first two distinct speakers in a file become `A` and `B`.
pub fn combine_transcripts(dir: &Path) -> Result<CombineResult> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read transcript directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    let mut turns = Vec::new();
    let mut files_combined = 0;
    let mut files_skipped = Vec::new();

    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(dyad) = dyad_id_from_name(&stem) else {
            warn!("Skipping {:?}: no dyad id in file name", path);
            files_skipped.push(path);
            continue;
        };

        let lines = read_raw_transcript(&path)?;
        let file_turns = label_turns(&stem, dyad, &lines);
        info!(
            "Dyad {}: {} turns from {:?}",
            dyad,
            file_turns.len(),
            path
        );
        turns.extend(file_turns);
        files_combined += 1;
    }

    turns.sort_by_key(|t| (t.dyad, t.turn));

    Ok(CombineResult {
        turns,
        files_combined,
        files_skipped,
    })
}

/// Map raw speakers to `A`/`B` and number the turns
fn label_turns(id: &str, dyad: u32, lines: &[RawLine]) -> Vec<TranscriptTurn> {
    let mut order: Vec<&str> = Vec::new();
    let mut turns = Vec::new();

    for line in lines {
        let position = match order.iter().position(|s| *s == line.speaker) {
            Some(position) => position,
            None => {
                order.push(&line.speaker);
                order.len() - 1
            }
        };

        let Some(label) = SPEAKER_LABELS.get(position) else {
            warn!(
                "Dyad {}: dropping line from extra speaker {:?}",
                dyad, line.speaker
            );
            continue;
        };

        turns.push(TranscriptTurn {
            id: id.to_string(),
            dyad,
            speaker: label.to_string(),
            turn: turns.len() as u32 + 1,
            transcript: format!("{}: {}", label, line.text),
        });
    }

    turns
}
