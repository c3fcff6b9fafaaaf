//! Text edits expressed in line/column coordinates.

use ropey::Rope;
use thiserror::Error;

use crate::range::{CharIdx, Position};
use crate::rope::line_content_len;

/// Errors raised while applying a [`TextEdit`] to a rope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// The position lies outside the document.
	#[error("position {0} is outside the document")]
	OutOfBounds(Position),
	/// A deletion whose end precedes its start.
	#[error("deletion end {end} precedes start {start}")]
	Inverted { start: Position, end: Position },
}

/// A single document change as reported by the document collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
	/// `text` inserted at `start`; `end` is the post-insert end position.
	Insert { start: Position, end: Position, text: String },
	/// `start..end` (pre-edit coordinates) removed; `text` is the removed content.
	Delete { start: Position, end: Position, text: String },
}

/// Line-level shape of an applied edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDelta {
	/// Start of the affected range, identical before and after the edit.
	///
	/// An edit right after a `\r` starts on the line holding that `\r`.
	/// Columns count chars from the start of the line.
	pub start: Position,
	/// End of the affected range before the edit.
	pub old_end: Position,
	/// End of the affected range after the edit.
	pub new_end: Position,
	/// Char offset where the edit begins.
	pub start_char: CharIdx,
	/// Number of chars removed.
	pub removed_chars: usize,
	/// Number of chars inserted.
	pub inserted_chars: usize,
}

impl EditDelta {
	/// Lines that disappeared after `start.line`.
	pub fn removed_lines(&self) -> usize {
		self.old_end.line - self.start.line
	}

	/// Lines that appeared after `start.line`.
	pub fn inserted_lines(&self) -> usize {
		self.new_end.line - self.start.line
	}

	/// Whether the document line count changed.
	pub fn changes_line_count(&self) -> bool {
		self.removed_lines() != self.inserted_lines()
	}
}

impl TextEdit {
	/// Builds an insertion, deriving the end position from `text`.
	pub fn insert(start: Position, text: impl Into<String>) -> Self {
		let text = text.into();
		let end = start.advance(&text);
		Self::Insert { start, end, text }
	}

	/// Builds a deletion of `start..end`.
	pub fn delete(start: Position, end: Position, text: impl Into<String>) -> Self {
		Self::Delete {
			start,
			end,
			text: text.into(),
		}
	}

	pub fn start(&self) -> Position {
		match self {
			Self::Insert { start, .. } | Self::Delete { start, .. } => *start,
		}
	}

	/// Applies the edit to `rope` and reports its line-level shape.
	///
	/// The shape is read back from the rope on both sides of the edit. A
	/// `\r` directly before the edit can pair with a `\n` at its end, so
	/// the line holding that `\r` is included in the affected range.
	pub fn apply(&self, rope: &mut Rope) -> Result<EditDelta, EditError> {
		let (from, to, text) = match self {
			Self::Insert { start, text, .. } => {
				let at = char_index(rope, *start)?;
				(at, at, text.as_str())
			}
			Self::Delete { start, end, .. } => {
				if end < start {
					return Err(EditError::Inverted { start: *start, end: *end });
				}
				(char_index(rope, *start)?, char_index(rope, *end)?, "")
			}
		};

		let first_line = if from > 0 && rope.char(from - 1) == '\r' {
			rope.char_to_line(from - 1)
		} else {
			rope.char_to_line(from)
		};
		let start = Position::new(first_line, from - rope.line_to_char(first_line));
		let old_end = position_at(rope, to);

		rope.remove(from..to);
		rope.insert(from, text);
		let inserted_chars = text.chars().count();

		Ok(EditDelta {
			start,
			old_end,
			new_end: position_at(rope, from + inserted_chars),
			start_char: from,
			removed_chars: to - from,
			inserted_chars,
		})
	}
}

fn position_at(rope: &Rope, offset: CharIdx) -> Position {
	let line = rope.char_to_line(offset);
	Position::new(line, offset - rope.line_to_char(line))
}

/// Converts `pos` to a char offset, rejecting columns past the line content.
pub fn char_index(rope: &Rope, pos: Position) -> Result<CharIdx, EditError> {
	let line = rope.get_line(pos.line).ok_or(EditError::OutOfBounds(pos))?;
	if pos.column > line_content_len(line) {
		return Err(EditError::OutOfBounds(pos));
	}
	Ok(rope.line_to_char(pos.line) + pos.column)
}
