//! Analysis of a single line: tokenize, normalize spans, derive line state.

use std::time::Instant;

use quill_primitives::{LineSpans, Span, TokenKind};
use quill_worker::catch_panic;

use crate::cache::LineState;
use crate::config::CompiledConfig;
use crate::error::TokenizeError;
use crate::folding::indent_level;
use crate::theme::ColorTheme;
use crate::tokenizer::{LineTokenizer, LineTokens};

/// Tokenizes `text` from `prev` and derives everything cached for the line.
///
/// A failing, panicking, or overrunning tokenizer leaves the line as one
/// plain span and carries `prev` forward as the line's state.
pub(super) fn analyze_line<T: LineTokenizer>(
	tokenizer: &T,
	theme: &dyn ColorTheme,
	config: &CompiledConfig,
	line: usize,
	text: &str,
	prev: &T::State,
) -> (LineState<T::State>, LineSpans) {
	let budget = config.line_timeout;
	let started = Instant::now();
	let result = catch_panic(|| tokenizer.tokenize(text, prev, started + budget))
		.unwrap_or_else(|message| Err(TokenizeError::Panicked(message)))
		.and_then(|tokens| if started.elapsed() > budget { Err(TokenizeError::Timeout) } else { Ok(tokens) });

	let plain = theme.plain();
	let (tokenizer_state, spans, failure) = match result {
		Ok(LineTokens { tokens, state }) => {
			let spans = tokens.into_iter().map(|token| Span {
				start_column: token.start_column,
				style: token.style,
				attributes: theme.resolve(token.style),
				kind: token.kind,
			});
			(state, LineSpans::normalize(spans, plain), None)
		}
		Err(error) => {
			tracing::warn!(line, error = %error, "analysis.tokenize_failed");
			(prev.clone(), LineSpans::plain(plain), Some(error))
		}
	};

	let identifiers = (config.collect_identifiers && failure.is_none()).then(|| collect_identifiers(text, &spans));
	let state = LineState {
		tokenizer_state,
		indent_level: indent_level(text, config.tab_size),
		folding_marker: config.folding.as_ref().and_then(|rules| rules.marker(text)),
		identifiers,
		failure,
	};
	(state, spans)
}

/// Distinct identifiers formed by the full text of a code span, sorted.
pub(super) fn collect_identifiers(text: &str, spans: &LineSpans) -> Box<[Box<str>]> {
	let chars: Vec<char> = text.chars().collect();
	let mut found: Vec<Box<str>> = spans
		.runs(chars.len())
		.filter(|(_, _, span)| span.kind == TokenKind::Other)
		.map(|(start, end, _)| &chars[start..end])
		.filter(|word| is_identifier(word))
		.map(|word| word.iter().collect::<String>().into_boxed_str())
		.collect();
	found.sort_unstable();
	found.dedup();
	found.into_boxed_slice()
}

fn is_identifier(word: &[char]) -> bool {
	let Some((first, rest)) = word.split_first() else {
		return false;
	};
	let part = |ch: &char| ch.is_alphanumeric() || *ch == '_' || *ch == '$';
	(first.is_alphabetic() || *first == '_' || *first == '$') && rest.iter().all(part)
}

#[cfg(test)]
mod tests {
	use quill_primitives::{StyleAttributes, TokenStyle};

	use super::*;

	fn spans(starts: &[(usize, TokenKind)]) -> LineSpans {
		LineSpans::normalize(
			starts.iter().map(|(start_column, kind)| Span {
				start_column: *start_column,
				style: TokenStyle::PLAIN,
				attributes: StyleAttributes::default(),
				kind: *kind,
			}),
			StyleAttributes::default(),
		)
	}

	#[test]
	fn identifiers_come_from_whole_code_spans() {
		let text = "let _x = \"str\" $y9;";
		let spans = spans(&[
			(0, TokenKind::Other),
			(3, TokenKind::Other),
			(4, TokenKind::Other),
			(6, TokenKind::Other),
			(9, TokenKind::String),
			(14, TokenKind::Other),
			(15, TokenKind::Other),
			(18, TokenKind::Other),
		]);
		let idents = collect_identifiers(text, &spans);
		let idents: Vec<&str> = idents.iter().map(AsRef::as_ref).collect();
		assert_eq!(idents, vec!["$y9", "_x", "let"]);
	}

	#[test]
	fn spans_with_mixed_text_are_not_identifiers() {
		let spans = spans(&[(0, TokenKind::Other)]);
		assert!(collect_identifiers("foo bar", &spans).is_empty());
		assert!(collect_identifiers("9lives", &spans).is_empty());
	}

	#[test]
	fn comment_words_are_skipped() {
		let spans = spans(&[(0, TokenKind::Comment)]);
		assert!(collect_identifiers("word", &spans).is_empty());
	}

	#[test]
	fn duplicates_collapse() {
		let spans = spans(&[(0, TokenKind::Other), (1, TokenKind::Other), (2, TokenKind::Other)]);
		let idents = collect_identifiers("a a", &spans);
		assert_eq!(idents.len(), 1);
	}
}
