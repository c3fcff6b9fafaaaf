//! Error types for configuration, tokenization, analysis, and sessions.

use quill_primitives::EditError;
use thiserror::Error;

/// Invalid analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to parse analysis config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("invalid folding marker pattern `{pattern}`: {source}")]
	InvalidPattern {
		pattern: String,
		#[source]
		source: regex::Error,
	},
	#[error("bracket pair {index} has an empty open or close text")]
	EmptyBracket { index: usize },
	#[error("bracket pair {index} uses the same text `{text}` for open and close")]
	SymmetricBracket { index: usize, text: String },
	#[error("too many bracket pairs: {count}")]
	TooManyBrackets { count: usize },
	#[error("tab size must be at least 1")]
	InvalidTabSize,
}

/// Failure to tokenize a single line. The line degrades to plain style.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
	#[error("tokenization exceeded the line time budget")]
	Timeout,
	#[error("tokenizer failed: {0}")]
	Failed(String),
	#[error("tokenizer panicked: {0}")]
	Panicked(String),
}

/// Failures detected while applying edits.
///
/// An invalid position means the host and worker documents disagree, so the
/// session asks the host for a reset. A cache inconsistency is rebuilt from
/// the worker's own document copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
	#[error("invalid edit position: {0}")]
	InvalidPosition(#[from] EditError),
	#[error("state cache holds {cache_lines} lines but the document has {document_lines}")]
	InconsistentCache { cache_lines: usize, document_lines: usize },
}

/// Errors surfaced by [`crate::AnalysisSession`].
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("analysis session was destroyed")]
	Destroyed,
	#[error("failed to spawn analysis worker: {0}")]
	WorkerSpawn(#[source] std::io::Error),
	#[error("analysis worker exited unexpectedly")]
	WorkerGone,
	#[error("an edit was rejected; the document must be reset")]
	ResetRequired,
	#[error(transparent)]
	Config(#[from] ConfigError),
}
