use std::fmt;

/// A position in the text, measured in characters (not bytes).
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// Kept distinct from [`CharIdx`] so call sites read as either an offset or a
/// length.
pub type CharLen = usize;

/// A `(line, column)` coordinate. Columns count characters from the start of
/// the line and exclude the line terminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
	/// Zero-based line index.
	pub line: usize,
	/// Zero-based character column within the line.
	pub column: usize,
}

impl Position {
	/// Document start.
	pub const ZERO: Self = Self { line: 0, column: 0 };

	pub const fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}

	/// Returns the position reached after writing `text` starting here.
	pub fn advance(self, text: &str) -> Self {
		let mut pos = self;
		let mut chars = text.chars().peekable();
		while let Some(ch) = chars.next() {
			match ch {
				'\r' => {
					if chars.peek() == Some(&'\n') {
						chars.next();
					}
					pos.line += 1;
					pos.column = 0;
				}
				'\n' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}' => {
					pos.line += 1;
					pos.column = 0;
				}
				_ => pos.column += 1,
			}
		}
		pos
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn advance_counts_columns_on_same_line() {
		assert_eq!(Position::new(2, 3).advance("abc"), Position::new(2, 6));
	}

	#[test]
	fn advance_resets_column_after_newline() {
		assert_eq!(Position::new(0, 5).advance("x\nyz"), Position::new(1, 2));
	}

	#[test]
	fn crlf_is_a_single_break() {
		assert_eq!(Position::ZERO.advance("a\r\nb\rc"), Position::new(2, 1));
	}

	#[test]
	fn ordering_is_line_major() {
		assert!(Position::new(1, 0) > Position::new(0, 99));
		assert!(Position::new(1, 2) < Position::new(1, 3));
	}
}
