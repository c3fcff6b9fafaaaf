//! The line tokenizer capability consumed by the analyzer.

use std::fmt;
use std::time::Instant;

use quill_primitives::{TokenKind, TokenStyle};

use crate::error::TokenizeError;

/// A token as produced by a tokenizer, before theme resolution.
///
/// A token extends to the start of the next one or to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken {
	pub start_column: usize,
	pub style: TokenStyle,
	pub kind: TokenKind,
}

impl RawToken {
	pub const fn new(start_column: usize, style: TokenStyle, kind: TokenKind) -> Self {
		Self { start_column, style, kind }
	}
}

/// Output of tokenizing one line.
#[derive(Debug, Clone)]
pub struct LineTokens<S> {
	/// Tokens ordered by start column.
	pub tokens: Vec<RawToken>,
	/// State to feed into the next line.
	pub state: S,
}

/// Maps `(line text, previous state)` to `(tokens, next state)`.
///
/// Implementations must be referentially transparent: the same text and
/// state always produce the same tokens and an equal state. Incremental
/// analysis stops re-tokenizing once [`LineTokenizer::states_equal`] reports
/// a recomputed state equal to the cached one, so an inconsistent equality
/// predicate leaves stale styling behind.
pub trait LineTokenizer: Send + 'static {
	type State: Clone + fmt::Debug + Send + 'static;

	/// State fed to the first line of the document.
	fn initial_state(&self) -> Self::State;

	/// Tokenizes `line`, which excludes its terminator.
	///
	/// `deadline` is the point after which the analyzer treats the line as
	/// timed out; long-running tokenizers should check it and bail out with
	/// [`TokenizeError::Timeout`].
	fn tokenize(&self, line: &str, state: &Self::State, deadline: Instant) -> Result<LineTokens<Self::State>, TokenizeError>;

	fn states_equal(&self, a: &Self::State, b: &Self::State) -> bool;
}
