pub mod error;
pub mod io;
pub mod llm;
pub mod logprobs;
pub mod models;
pub mod stages;

pub use error::ClassifyError;
pub use io::{read_decisions_jsonl, read_transcript_turns, write_transcript_turns, ExportTable};
pub use llm::{OpenAiClient, OpenAiConfig, QuestionRegistry, QuestionSpec};
pub use logprobs::{
    aggregate_logprob, extract_class_logprobs, first_alternatives, match_predicted_tokens,
    normalize, normalize_token_text, parse_decision, ParsedDecision,
};
pub use models::{
    Alternative, ClassLogprobMap, ClassProbabilityMap, Decision, DecisionInput, DecisionRecord,
    TokenRecord, TranscriptTurn,
};
pub use stages::{
    combine_transcripts, execute_decisions, execute_export, structure_transcript, Stage2Config,
    Stage3Config, TranscriptMethod,
};
