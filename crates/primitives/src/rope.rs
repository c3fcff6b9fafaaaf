//! Rope utilities and the document read interface.

use std::borrow::Cow;

use ropey::{Rope, RopeSlice};

use crate::range::CharLen;

fn is_line_break(ch: char) -> bool {
	matches!(ch, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// Returns the number of characters in `line` excluding its terminator.
///
/// `\r\n` counts as a single two-character terminator.
pub fn line_content_len(line: RopeSlice) -> CharLen {
	let len = line.len_chars();
	if len == 0 {
		return 0;
	}
	let last = line.char(len - 1);
	if !is_line_break(last) {
		return len;
	}
	if last == '\n' && len >= 2 && line.char(len - 2) == '\r' {
		len - 2
	} else {
		len - 1
	}
}

/// Read access to a line-oriented document.
pub trait TextDocument {
	/// Number of lines, including the empty line after a trailing newline.
	fn line_count(&self) -> usize;

	/// Text of `line` without its terminator, or `None` past the end.
	fn line_text(&self, line: usize) -> Option<Cow<'_, str>>;

	/// Number of characters on `line` excluding the terminator.
	fn column_count(&self, line: usize) -> Option<CharLen>;
}

impl TextDocument for Rope {
	fn line_count(&self) -> usize {
		self.len_lines()
	}

	fn line_text(&self, line: usize) -> Option<Cow<'_, str>> {
		let slice = self.get_line(line)?;
		let content = slice.slice(..line_content_len(slice));
		Some(Cow::from(content))
	}

	fn column_count(&self, line: usize) -> Option<CharLen> {
		self.get_line(line).map(line_content_len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_lf_terminator() {
		let text = Rope::from("hello\nworld");
		assert_eq!(text.column_count(0), Some(5));
		assert_eq!(text.column_count(1), Some(5));
	}

	#[test]
	fn strips_crlf_terminator() {
		let text = Rope::from("ab\r\ncd");
		assert_eq!(text.column_count(0), Some(2));
		assert_eq!(text.line_text(0).as_deref(), Some("ab"));
	}

	#[test]
	fn trailing_newline_yields_empty_last_line() {
		let text = Rope::from("x\n");
		assert_eq!(text.line_count(), 2);
		assert_eq!(text.line_text(1).as_deref(), Some(""));
	}

	#[test]
	fn out_of_range_line_is_none() {
		let text = Rope::from("x");
		assert_eq!(text.line_text(1), None);
		assert_eq!(text.column_count(3), None);
	}
}
