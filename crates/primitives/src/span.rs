//! Styled runs of a single line.

use smallvec::SmallVec;

use crate::range::CharIdx;
use crate::style::{Color, StyleAttributes, StyleId, TokenKind, TokenStyle};

/// A styled run starting at `start_column` and extending to the next span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
	pub start_column: CharIdx,
	/// Style reference the tokenizer produced; kept for recoloring.
	pub style: TokenStyle,
	/// Colors resolved from `style` by the theme in effect at publish time.
	pub attributes: StyleAttributes,
	pub kind: TokenKind,
}

/// The spans of one line, ordered with strictly increasing start columns and
/// the first span at column 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineSpans {
	spans: SmallVec<[Span; 4]>,
}

impl LineSpans {
	/// A single plain span covering the whole line.
	pub fn plain(attributes: StyleAttributes) -> Self {
		let mut spans = SmallVec::new();
		spans.push(Span {
			start_column: 0,
			style: TokenStyle::PLAIN,
			attributes,
			kind: TokenKind::Other,
		});
		Self { spans }
	}

	/// Normalizes `spans` into a valid sequence.
	///
	/// A plain span is prepended when the first span starts after column 0.
	/// When several spans share a start column the last one wins, and spans
	/// starting before their predecessor are dropped.
	pub fn normalize(spans: impl IntoIterator<Item = Span>, plain: StyleAttributes) -> Self {
		let mut out: SmallVec<[Span; 4]> = SmallVec::new();
		for span in spans {
			match out.last_mut() {
				Some(last) if span.start_column == last.start_column => *last = span,
				Some(last) if span.start_column < last.start_column => {}
				_ => out.push(span),
			}
		}
		if out.first().is_none_or(|first| first.start_column > 0) {
			out.insert(
				0,
				Span {
					start_column: 0,
					style: TokenStyle::PLAIN,
					attributes: plain,
					kind: TokenKind::Other,
				},
			);
		}
		Self { spans: out }
	}

	pub fn as_slice(&self) -> &[Span] {
		&self.spans
	}

	pub fn iter(&self) -> impl Iterator<Item = &Span> {
		self.spans.iter()
	}

	pub fn len(&self) -> usize {
		self.spans.len()
	}

	/// Always false; a line carries at least one span.
	pub fn is_empty(&self) -> bool {
		self.spans.is_empty()
	}

	/// Yields each span with its column range, the last one ending at `line_len`.
	///
	/// Spans starting at or beyond `line_len` yield nothing.
	pub fn runs(&self, line_len: CharIdx) -> impl Iterator<Item = (CharIdx, CharIdx, &Span)> {
		self.spans.iter().enumerate().filter_map(move |(idx, span)| {
			let end = self.spans.get(idx + 1).map_or(line_len, |next| next.start_column.min(line_len));
			(span.start_column < end).then_some((span.start_column, end, span))
		})
	}

	/// Returns the span covering `column`.
	pub fn span_at(&self, column: CharIdx) -> &Span {
		let idx = self.spans.partition_point(|span| span.start_column <= column);
		&self.spans[idx.saturating_sub(1)]
	}

	/// Re-resolves every span's attributes with `lookup`.
	pub fn recolor(&self, lookup: impl Fn(StyleId) -> Color) -> Self {
		let spans = self
			.spans
			.iter()
			.map(|span| Span {
				attributes: StyleAttributes::resolve(span.style, &lookup),
				..*span
			})
			.collect();
		Self { spans }
	}
}
