//! Per-line cache of tokenizer state and derived metadata.

use std::ops::Range;

use crate::error::TokenizeError;
use crate::folding::{FoldingLine, FoldingMarker};

/// Everything derived from tokenizing one line.
///
/// A pure function of the previous line's `tokenizer_state` and the line's
/// own text.
#[derive(Debug, Clone)]
pub struct LineState<S> {
	pub tokenizer_state: S,
	/// `None` for whitespace-only lines.
	pub indent_level: Option<u32>,
	pub folding_marker: Option<FoldingMarker>,
	/// Distinct identifiers on the line, sorted. `None` when collection is off.
	pub identifiers: Option<Box<[Box<str>]>>,
	/// Set when the tokenizer failed and the line fell back to plain style.
	pub failure: Option<TokenizeError>,
}

impl<S> LineState<S> {
	pub fn identifiers(&self) -> impl Iterator<Item = &str> {
		self.identifiers.iter().flat_map(|idents| idents.iter().map(AsRef::as_ref))
	}

	pub fn folding_line(&self) -> FoldingLine {
		FoldingLine {
			indent: self.indent_level,
			marker: self.folding_marker,
		}
	}
}

#[derive(Debug, Clone)]
struct Slot<S> {
	state: Option<LineState<S>>,
	/// Text changed since `state` was computed.
	dirty: bool,
}

impl<S> Slot<S> {
	const fn fresh() -> Self {
		Self { state: None, dirty: true }
	}
}

/// Line-aligned cache slots.
///
/// Dirty slots keep their previous state so the analyzer can compare against
/// it. Every clean slot holds a state.
#[derive(Debug, Clone)]
pub struct StateCache<S> {
	slots: Vec<Slot<S>>,
}

impl<S> StateCache<S> {
	/// A cache of `lines` empty, dirty slots.
	pub fn new(lines: usize) -> Self {
		Self {
			slots: (0..lines).map(|_| Slot::fresh()).collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn get(&self, line: usize) -> Option<&LineState<S>> {
		self.slots.get(line)?.state.as_ref()
	}

	pub fn is_dirty(&self, line: usize) -> bool {
		self.slots.get(line).is_some_and(|slot| slot.dirty)
	}

	pub fn mark_dirty(&mut self, lines: Range<usize>) {
		let end = lines.end.min(self.slots.len());
		for slot in &mut self.slots[lines.start.min(end)..end] {
			slot.dirty = true;
		}
	}

	/// Inserts `count` empty, dirty slots before `at`.
	pub fn insert_lines(&mut self, at: usize, count: usize) {
		let at = at.min(self.slots.len());
		self.slots.splice(at..at, (0..count).map(|_| Slot::fresh()));
	}

	/// Removes the slots in `lines`, returning the states they held.
	pub fn remove_lines(&mut self, lines: Range<usize>) -> Vec<LineState<S>> {
		let end = lines.end.min(self.slots.len());
		self.slots.drain(lines.start.min(end)..end).filter_map(|slot| slot.state).collect()
	}

	pub fn first_dirty(&self) -> Option<usize> {
		self.next_dirty(0)
	}

	/// First dirty line at or after `from`.
	pub fn next_dirty(&self, from: usize) -> Option<usize> {
		self.slots.get(from..)?.iter().position(|slot| slot.dirty).map(|idx| idx + from)
	}

	pub fn has_dirty(&self) -> bool {
		self.first_dirty().is_some()
	}

	/// Stores a freshly computed state, clearing the dirty flag. Returns the
	/// state it replaced.
	pub fn replace(&mut self, line: usize, state: LineState<S>) -> Option<LineState<S>> {
		let slot = &mut self.slots[line];
		slot.dirty = false;
		slot.state.replace(state)
	}

	/// Empties every slot, returning the evicted states.
	pub fn clear(&mut self) -> Vec<LineState<S>> {
		self.slots.drain(..).filter_map(|slot| slot.state).collect()
	}

	pub fn states(&self) -> impl Iterator<Item = Option<&LineState<S>>> {
		self.slots.iter().map(|slot| slot.state.as_ref())
	}
}
