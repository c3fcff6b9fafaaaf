//! Bracket pair engine: token scanning, the persistent bracket tree, and the
//! host-facing provider.

mod provider;
mod query;
mod tree;

use quill_primitives::LineSpans;
use smallvec::SmallVec;

pub use provider::BracketProvider;
pub use tree::{Balance, BracketTree, LineLeaf, Summary};

use crate::error::ConfigError;

/// Index of a pair in the configured bracket list.
pub type BracketId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketKind {
	Open,
	Close,
}

/// A bracket occurrence on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketToken {
	pub column: usize,
	pub len: usize,
	pub kind: BracketKind,
	pub id: BracketId,
}

/// Char range of one bracket in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketSpan {
	pub offset: usize,
	pub len: usize,
}

impl BracketSpan {
	pub const fn new(offset: usize, len: usize) -> Self {
		Self { offset, len }
	}

	pub const fn end(&self) -> usize {
		self.offset + self.len
	}
}

/// A matched open/close pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketPair {
	pub open: BracketSpan,
	pub close: BracketSpan,
	pub id: BracketId,
	/// Unmatched opens enclosing `open`, counted over every bracket id.
	pub depth: u32,
}

/// Result of looking up the bracket adjacent to an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairedBracket {
	Matched(BracketPair),
	/// The adjacent bracket has no partner in the document.
	Unmatched {
		position: BracketSpan,
		id: BracketId,
		kind: BracketKind,
	},
}

impl PairedBracket {
	pub fn pair(&self) -> Option<&BracketPair> {
		match self {
			Self::Matched(pair) => Some(pair),
			Self::Unmatched { .. } => None,
		}
	}
}

#[derive(Debug, Clone)]
struct Pattern {
	chars: Box<[char]>,
	kind: BracketKind,
	id: BracketId,
}

/// Configured bracket texts and the scanner that finds them in code spans.
#[derive(Debug, Clone)]
pub struct BracketSet {
	pairs: Vec<(Box<str>, Box<str>)>,
	/// Longest text first so multi-char brackets win over their prefixes.
	patterns: Vec<Pattern>,
}

impl BracketSet {
	pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, ConfigError> {
		let mut set = Self {
			pairs: Vec::new(),
			patterns: Vec::new(),
		};
		for (index, (open, close)) in pairs.into_iter().enumerate() {
			if open.is_empty() || close.is_empty() {
				return Err(ConfigError::EmptyBracket { index });
			}
			if open == close {
				return Err(ConfigError::SymmetricBracket {
					index,
					text: open.to_string(),
				});
			}
			let id = BracketId::try_from(index).map_err(|_| ConfigError::TooManyBrackets { count: index + 1 })?;
			for (text, kind) in [(open, BracketKind::Open), (close, BracketKind::Close)] {
				set.patterns.push(Pattern {
					chars: text.chars().collect(),
					kind,
					id,
				});
			}
			set.pairs.push((open.into(), close.into()));
		}
		set.patterns.sort_by(|a, b| b.chars.len().cmp(&a.chars.len()));
		Ok(set)
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	/// Open and close text of bracket `id`.
	pub fn pair(&self, id: BracketId) -> Option<(&str, &str)> {
		self.pairs.get(usize::from(id)).map(|(open, close)| (open.as_ref(), close.as_ref()))
	}

	/// Finds brackets inside the code spans of `line`.
	///
	/// A bracket must lie entirely within one span; comments and literals are
	/// skipped.
	pub fn scan(&self, line: &str, spans: &LineSpans) -> SmallVec<[BracketToken; 4]> {
		let mut tokens = SmallVec::new();
		if self.patterns.is_empty() {
			return tokens;
		}
		let chars: Vec<char> = line.chars().collect();
		for (start, end, span) in spans.runs(chars.len()) {
			if !span.kind.is_code() {
				continue;
			}
			let mut column = start;
			while column < end {
				let hit = self
					.patterns
					.iter()
					.find(|pattern| column + pattern.chars.len() <= end && chars[column..column + pattern.chars.len()] == *pattern.chars);
				match hit {
					Some(pattern) => {
						tokens.push(BracketToken {
							column,
							len: pattern.chars.len(),
							kind: pattern.kind,
							id: pattern.id,
						});
						column += pattern.chars.len();
					}
					None => column += 1,
				}
			}
		}
		tokens
	}
}
