use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::logprobs::ParsedDecision;
use crate::models::{DecisionRecord, TranscriptTurn};

/// One flattened output row per decision
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub decision_id: Uuid,
    pub dyad_id: u32,
    pub speaker: String,
    pub text: String,
    pub predicted_value: String,
    pub predicted_logprob: Option<f64>,
    /// Log-probability per class, aligned with the table's class order
    pub class_logprobs: Vec<Option<f64>>,
    /// Normalized probability per class, aligned with the table's class order
    pub class_pcts: Vec<Option<f64>>,
}

impl ExportRow {
    pub fn from_parsed(
        record: &DecisionRecord,
        parsed: &ParsedDecision,
        classes: &[String],
    ) -> Self {
        let class_logprobs = classes
            .iter()
            .map(|class| parsed.class_logprobs.get(class).copied())
            .collect();
        let class_pcts = classes
            .iter()
            .map(|class| {
                parsed
                    .percentages
                    .as_ref()
                    .and_then(|p| p.get(class).copied())
            })
            .collect();

        Self {
            decision_id: record.decision_id,
            dyad_id: record.dyad,
            speaker: record.speaker.clone(),
            text: record.text.clone(),
            predicted_value: parsed.predicted_value.clone(),
            predicted_logprob: parsed.predicted_logprob,
            class_logprobs,
            class_pcts,
        }
    }
}

/// Tabular export for a single question type
#[derive(Debug, Clone)]
pub struct ExportTable {
    classes: Vec<String>,
    rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ExportRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names: fixed fields, then `<class>_logprob` and `<class>_pct` per class
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = [
            "decision_id",
            "dyad_id",
            "speaker",
            "text",
            "predicted_value",
            "predicted_logprob",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(self.classes.iter().map(|c| format!("{}_logprob", c)));
        header.extend(self.classes.iter().map(|c| format!("{}_pct", c)));
        header
    }

    /// Write as CSV; absent values become empty cells
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.header())?;

        for row in &self.rows {
            let mut record = vec![
                row.decision_id.to_string(),
                row.dyad_id.to_string(),
                row.speaker.clone(),
                row.text.clone(),
                row.predicted_value.clone(),
                format_optional(row.predicted_logprob),
            ];
            record.extend(row.class_logprobs.iter().copied().map(format_optional));
            record.extend(row.class_pcts.iter().copied().map(format_optional));
            wtr.write_record(&record)?;
        }

        wtr.flush().context("Failed to flush CSV")?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        self.write_csv(file)
            .with_context(|| format!("Failed to write CSV: {:?}", path))
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the combined transcript CSV (`ID,dyad,speaker,turn,transcript`)
pub fn write_transcript_turns(turns: &[TranscriptTurn], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    for turn in turns {
        wtr.serialize(turn).context("Failed to write transcript row")?;
    }
    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}

/// Write decision records as JSON lines
pub fn write_decisions_jsonl(records: &[DecisionRecord], path: &Path) -> Result<()> {
    let mut file = std::io::BufWriter::new(
        std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?,
    );
    for record in records {
        serde_json::to_writer(&mut file, record).context("Failed to write decision record")?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    Ok(())
}
