use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::io::{write_decisions_jsonl, ExportRow, ExportTable};
use crate::llm::{QuestionRegistry, DEFAULT_QUESTION_TYPE};
use crate::logprobs::parse_decision;
use crate::models::DecisionRecord;

/// Configuration for Stage 3 export
#[derive(Debug, Clone)]
pub struct Stage3Config {
    /// Question type whose decisions are exported; others are skipped
    pub question_type: String,
}

impl Default for Stage3Config {
    fn default() -> Self {
        Self {
            question_type: DEFAULT_QUESTION_TYPE.to_string(),
        }
    }
}

/// Result of Stage 3 export
#[derive(Debug)]
pub struct Stage3Result {
    /// Flattened rows, one per exported decision
    pub table: ExportTable,
    /// Records skipped because they belong to another question type
    pub records_skipped: usize,
    /// Rows where no class probabilities could be recovered
    pub rows_without_percentages: usize,
    /// Path to the CSV (if written)
    pub csv_path: Option<PathBuf>,
    /// Path to the raw decision records (if written)
    pub decisions_path: Option<PathBuf>,
}

/// Execute Stage 3: parse every decision into class probabilities and write the outputs
///
/// Raw decision records are written first. A predicted label outside the registered
/// classes then aborts the export, since it means the schema constraint was not enforced
/// upstream. Missing log-probabilities only leave empty cells.
pub fn execute_export(
    records: &[DecisionRecord],
    registry: &QuestionRegistry,
    csv_output: Option<&Path>,
    decisions_output: Option<&Path>,
    config: &Stage3Config,
) -> Result<Stage3Result> {
    // Persisted before any record is parsed
    let decisions_path = match decisions_output {
        Some(path) => {
            info!("Writing {} decision records to {:?}", records.len(), path);
            write_decisions_jsonl(records, path)?;
            Some(path.to_path_buf())
        }
        None => None,
    };

    let spec = registry.get(&config.question_type)?;
    let mut table = ExportTable::new(spec.classes.clone());
    let mut records_skipped = 0;
    let mut rows_without_percentages = 0;

    for record in records {
        if record.question_type != config.question_type {
            warn!(
                "Skipping decision {}: question type {:?} is not {:?}",
                record.decision_id, record.question_type, config.question_type
            );
            records_skipped += 1;
            continue;
        }

        let parsed = parse_decision(&record.decision, &record.question_type, spec)?;
        if parsed.percentages.is_none() {
            rows_without_percentages += 1;
        }
        table.push(ExportRow::from_parsed(record, &parsed, &spec.classes));
    }

    let mut result = Stage3Result {
        table,
        records_skipped,
        rows_without_percentages,
        csv_path: None,
        decisions_path,
    };

    if let Some(path) = csv_output {
        info!("Writing {} rows to {:?}", result.table.len(), path);
        result.table.write_csv_file(path)?;
        result.csv_path = Some(path.to_path_buf());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifyError;
    use crate::io::read_decisions_jsonl;
    use crate::models::{Alternative, Decision, TokenRecord};

    fn record(label: &str, alternatives: Vec<Alternative>) -> DecisionRecord {
        DecisionRecord::new(
            1,
            "A",
            "A: hi\nB: hello",
            "gender",
            "gpt-4o-mini",
            Decision::new(
                label,
                vec![
                    TokenRecord::new("{\"gender\":\"", 0.0),
                    TokenRecord::new(label, -0.2).with_alternatives(alternatives),
                    TokenRecord::new("\"}", 0.0),
                ],
            ),
        )
    }

    #[test]
    fn test_stage3_config_default() {
        assert_eq!(Stage3Config::default().question_type, "gender");
    }

    #[test]
    fn test_execute_export_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out.csv");
        let jsonl_path = dir.path().join("decisions.jsonl");

        let mut other = record("male", vec![]);
        other.question_type = "age".to_string();
        let records = vec![
            record(
                "male",
                vec![Alternative::new("male", -0.2), Alternative::new("female", -1.8)],
            ),
            record("female", vec![]),
            other,
        ];

        let result = execute_export(
            &records,
            &QuestionRegistry::builtin(),
            Some(&csv_path),
            Some(&jsonl_path),
            &Stage3Config::default(),
        )
        .unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(result.records_skipped, 1);
        assert_eq!(result.rows_without_percentages, 0);

        let first = &result.table.rows()[0];
        assert_eq!(first.class_logprobs, vec![Some(-0.2), Some(-1.8)]);
        assert!((first.class_pcts[0].unwrap() - 0.832).abs() < 1e-3);

        let second = &result.table.rows()[1];
        assert_eq!(second.class_logprobs, vec![None, Some(-0.2)]);
        assert_eq!(second.class_pcts, vec![None, Some(1.0)]);

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with(
            "decision_id,dyad_id,speaker,text,predicted_value,predicted_logprob,\
             male_logprob,female_logprob,male_pct,female_pct\n"
        ));
        assert_eq!(read_decisions_jsonl(&jsonl_path).unwrap(), records);
    }

    #[test]
    fn test_execute_export_rejects_schema_violation() {
        let records = vec![record("nonbinary", vec![])];

        let err = execute_export(
            &records,
            &QuestionRegistry::builtin(),
            None,
            None,
            &Stage3Config::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClassifyError>(),
            Some(ClassifyError::LabelNotInSchema { .. })
        ));
    }

    #[test]
    fn test_execute_export_keeps_decisions_on_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out.csv");
        let jsonl_path = dir.path().join("decisions.jsonl");
        let records = vec![
            record("male", vec![Alternative::new("male", -0.2)]),
            record("other", vec![]),
        ];

        let result = execute_export(
            &records,
            &QuestionRegistry::builtin(),
            Some(&csv_path),
            Some(&jsonl_path),
            &Stage3Config::default(),
        );

        assert!(result.is_err());
        assert!(!csv_path.exists());
        assert_eq!(read_decisions_jsonl(&jsonl_path).unwrap(), records);
    }
}
