//! Immutable results published to the style receiver.

use std::sync::Arc;

use quill_primitives::LineSpans;

use crate::error::TokenizeError;
use crate::folding::FoldingRegion;

/// A complete styling snapshot of the document.
#[derive(Debug, Clone)]
pub struct Styles {
	lines: Vec<Arc<LineSpans>>,
	folding: Arc<[FoldingRegion]>,
	generation: u64,
}

impl Styles {
	pub(crate) fn new(lines: Vec<Arc<LineSpans>>, folding: Arc<[FoldingRegion]>, generation: u64) -> Self {
		Self {
			lines,
			folding,
			generation,
		}
	}

	pub fn line_count(&self) -> usize {
		self.lines.len()
	}

	pub fn line(&self, line: usize) -> Option<&LineSpans> {
		self.lines.get(line).map(AsRef::as_ref)
	}

	pub fn lines(&self) -> impl Iterator<Item = &LineSpans> {
		self.lines.iter().map(AsRef::as_ref)
	}

	pub fn folding(&self) -> &[FoldingRegion] {
		&self.folding
	}

	/// Edit generation this snapshot was computed for.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Whether `line` shares its spans with `other` by pointer.
	pub fn shares_line(&self, other: &Self, line: usize) -> bool {
		match (self.lines.get(line), other.lines.get(line)) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

/// Lines whose spans changed since the previous publication, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleUpdateRange {
	pub start_line: usize,
	pub end_line: usize,
}

impl StyleUpdateRange {
	pub fn contains(&self, line: usize) -> bool {
		(self.start_line..=self.end_line).contains(&line)
	}
}

/// A tokenization failure on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub line: usize,
	pub error: TokenizeError,
}

/// All current tokenization failures, ordered by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
	entries: Vec<Diagnostic>,
}

impl Diagnostics {
	pub(crate) fn new(entries: Vec<Diagnostic>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[Diagnostic] {
		&self.entries
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}
