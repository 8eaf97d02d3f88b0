use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dyadic::llm::DEFAULT_QUESTION_TYPE;
use dyadic::{
    combine_transcripts, execute_decisions, execute_export, read_decisions_jsonl,
    read_transcript_turns, structure_transcript, write_transcript_turns, OpenAiClient,
    OpenAiConfig, QuestionRegistry, Stage2Config, Stage3Config, TranscriptMethod,
};

#[derive(Parser)]
#[command(name = "dyadic")]
#[command(
    author,
    version,
    about = "Speaker attribute classification for dyadic transcripts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine per-dyad transcript CSVs into one turn table
    Combine {
        /// Directory of transcript CSVs (dyad id in each file name)
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output combined transcript CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify every speaker with the language model and export class probabilities
    Run {
        /// Combined transcript CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV with one row per decision
        #[arg(short, long)]
        output: PathBuf,

        /// How much of the conversation the model sees per decision
        #[arg(long, value_enum, default_value = "each-part-sim")]
        method: TranscriptMethod,

        /// Model to query
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Question type to ask
        #[arg(long, default_value = DEFAULT_QUESTION_TYPE)]
        question_type: String,

        /// JSON file of question types (defaults to the built-in registry)
        #[arg(long)]
        questions: Option<PathBuf>,

        /// Alternatives requested per output token
        #[arg(long, default_value = "10")]
        top_logprobs: u8,

        /// Also save raw decisions as JSON lines for later reparsing
        #[arg(long)]
        decisions: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Recompute class probabilities from saved decisions without querying the model
    Reparse {
        /// JSON lines file written by `run --decisions`
        #[arg(short, long)]
        decisions: PathBuf,

        /// Output CSV with one row per decision
        #[arg(short, long)]
        output: PathBuf,

        /// Question type to export
        #[arg(long, default_value = DEFAULT_QUESTION_TYPE)]
        question_type: String,

        /// JSON file of question types (defaults to the built-in registry)
        #[arg(long)]
        questions: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List registered question types
    Questions {
        /// JSON file of question types (defaults to the built-in registry)
        #[arg(long)]
        questions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Combine {
            input_dir,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            combine(&input_dir, &output)
        }
        Commands::Run {
            input,
            output,
            method,
            model,
            question_type,
            questions,
            top_logprobs,
            decisions,
            timeout_secs,
            verbose,
        } => {
            setup_logging(verbose);
            let registry = QuestionRegistry::load(questions.as_deref())?;
            let config = OpenAiConfig::from_env()?
                .with_model(model)
                .with_top_logprobs(top_logprobs)
                .with_timeout(Duration::from_secs(timeout_secs));
            run(
                &input,
                &output,
                method,
                &question_type,
                &registry,
                config,
                decisions.as_deref(),
            )
            .await
        }
        Commands::Reparse {
            decisions,
            output,
            question_type,
            questions,
            verbose,
        } => {
            setup_logging(verbose);
            let registry = QuestionRegistry::load(questions.as_deref())?;
            reparse(&decisions, &output, &question_type, &registry)
        }
        Commands::Questions { questions } => {
            let registry = QuestionRegistry::load(questions.as_deref())?;
            for (question_type, spec) in registry.iter() {
                println!("{}: {}", question_type, spec.question);
                println!("  classes: {}", spec.classes.join(", "));
            }
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn combine(input_dir: &Path, output: &Path) -> Result<()> {
    info!("Combining transcripts from {:?}", input_dir);
    let result = combine_transcripts(input_dir).context("Failed to combine transcripts")?;

    if !result.files_skipped.is_empty() {
        warn!(
            "{} file(s) skipped without a dyad id",
            result.files_skipped.len()
        );
    }

    write_transcript_turns(&result.turns, output)?;
    info!(
        "Wrote {} turns from {} files to {:?}",
        result.turns.len(),
        result.files_combined,
        output
    );
    Ok(())
}

async fn run(
    input: &Path,
    output: &Path,
    method: TranscriptMethod,
    question_type: &str,
    registry: &QuestionRegistry,
    config: OpenAiConfig,
    decisions_output: Option<&Path>,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let turns = read_transcript_turns(input).context("Failed to read combined transcript")?;

    // Stage 1: Restructure
    let inputs = structure_transcript(&turns, method);
    info!(
        "Stage 1: {} turns restructured into {} inputs ({:?})",
        turns.len(),
        inputs.len(),
        method
    );

    // Stage 2: Query the model
    let client = OpenAiClient::new(config)?;
    let stage2_config = Stage2Config::default();
    let stage2_result =
        execute_decisions(&client, &inputs, question_type, registry, &stage2_config).await?;
    info!(
        "Stage 2: {} decisions, {} skipped, {} failures",
        stage2_result.records.len(),
        stage2_result.skipped,
        stage2_result.failures
    );

    // Stage 3: Export
    let stage3_config = Stage3Config {
        question_type: question_type.to_string(),
    };
    let stage3_result = execute_export(
        &stage2_result.records,
        registry,
        Some(output),
        decisions_output,
        &stage3_config,
    )?;

    report(&stage3_result);
    Ok(())
}

fn reparse(
    decisions: &Path,
    output: &Path,
    question_type: &str,
    registry: &QuestionRegistry,
) -> Result<()> {
    info!("Loading decisions from {:?}", decisions);
    let records = read_decisions_jsonl(decisions)?;

    let stage3_config = Stage3Config {
        question_type: question_type.to_string(),
    };
    let stage3_result = execute_export(&records, registry, Some(output), None, &stage3_config)?;

    report(&stage3_result);
    Ok(())
}

fn report(result: &dyadic::stages::Stage3Result) {
    if let Some(path) = &result.csv_path {
        info!("CSV written to {:?}", path);
    }
    if let Some(path) = &result.decisions_path {
        info!("Decisions written to {:?}", path);
    }

    info!(
        "Complete: {} rows, {} without class probabilities, {} skipped",
        result.table.len(),
        result.rows_without_percentages,
        result.records_skipped
    );
}
