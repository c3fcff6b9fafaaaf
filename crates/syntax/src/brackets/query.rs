//! Bracket lookups over a [`BracketTree`].

use rustc_hash::FxHashMap;

use super::tree::{Body, BracketTree, Node, Summary};
use super::{BracketId, BracketKind, BracketPair, BracketSpan, BracketToken, PairedBracket};

/// A bracket token with its document coordinates.
#[derive(Debug, Clone, Copy)]
struct Located {
	line: usize,
	/// Index of the token within its line.
	index: usize,
	offset: usize,
	token: BracketToken,
}

impl Located {
	fn span(&self) -> BracketSpan {
		BracketSpan::new(self.offset, self.token.len)
	}
}

impl BracketTree {
	/// Looks up the bracket touching `offset` and its partner.
	///
	/// Candidates in priority order: a closer ending at `offset`, an opener
	/// starting at it, an opener ending at it, a closer starting at it.
	/// Returns `None` when no bracket touches `offset` or the offset lies
	/// outside the document.
	pub fn paired_bracket_at(&self, offset: usize) -> Option<PairedBracket> {
		let (line, line_start, leaf) = self.locate_offset(offset)?;
		let column = offset - line_start;
		let ends_here = |t: &BracketToken| t.column + t.len == column;
		let starts_here = |t: &BracketToken| t.column == column;
		let candidates: [(BracketKind, &dyn Fn(&BracketToken) -> bool); 4] = [
			(BracketKind::Close, &ends_here),
			(BracketKind::Open, &starts_here),
			(BracketKind::Open, &ends_here),
			(BracketKind::Close, &starts_here),
		];
		let (index, token) = candidates.iter().find_map(|(kind, adjacent)| {
			leaf.tokens()
				.iter()
				.enumerate()
				.find(|(_, token)| token.kind == *kind && adjacent(token))
		})?;
		let here = Located {
			line,
			index,
			offset: line_start + token.column,
			token: *token,
		};
		Some(self.resolve(here))
	}

	/// Every matched pair with at least one bracket starting in
	/// `start..end`, ordered by opening offset.
	pub fn pairs_in_range(&self, start: usize, end: usize) -> Vec<BracketPair> {
		let end = end.min(self.len_chars());
		if start >= end {
			return Vec::new();
		}
		let (Some((first_line, ..)), Some((last_line, ..))) = (self.locate_offset(start), self.locate_offset(end - 1)) else {
			return Vec::new();
		};

		let mut stacks: FxHashMap<BracketId, Vec<Located>> = FxHashMap::default();
		let mut matched: Vec<(Located, Located)> = Vec::new();
		let mut orphan_closes: Vec<Located> = Vec::new();
		self.for_each_leaf(first_line..last_line + 1, |line, line_start, leaf| {
			for (index, token) in leaf.tokens().iter().enumerate() {
				let offset = line_start + token.column;
				if offset < start || offset >= end {
					continue;
				}
				let here = Located {
					line,
					index,
					offset,
					token: *token,
				};
				match token.kind {
					BracketKind::Open => stacks.entry(token.id).or_default().push(here),
					BracketKind::Close => match stacks.get_mut(&token.id).and_then(Vec::pop) {
						Some(open) => matched.push((open, here)),
						None => orphan_closes.push(here),
					},
				}
			}
		});

		for close in orphan_closes {
			if let Some(open) = self.find_open(close) {
				matched.push((open, close));
			}
		}
		for open in stacks.into_values().flatten() {
			if let Some(close) = self.find_close(open) {
				matched.push((open, close));
			}
		}

		let mut pairs: Vec<BracketPair> = matched
			.into_iter()
			.map(|(open, close)| BracketPair {
				open: open.span(),
				close: close.span(),
				id: open.token.id,
				depth: self.depth_at(open),
			})
			.collect();
		pairs.sort_unstable_by_key(|pair| pair.open.offset);
		pairs
	}

	fn resolve(&self, here: Located) -> PairedBracket {
		let partner = match here.token.kind {
			BracketKind::Open => self.find_close(here).map(|close| (here, close)),
			BracketKind::Close => self.find_open(here).map(|open| (open, here)),
		};
		match partner {
			Some((open, close)) => PairedBracket::Matched(BracketPair {
				open: open.span(),
				close: close.span(),
				id: here.token.id,
				depth: self.depth_at(open),
			}),
			None => PairedBracket::Unmatched {
				position: here.span(),
				id: here.token.id,
				kind: here.token.kind,
			},
		}
	}

	/// Unmatched openers of any id strictly before `at`.
	fn depth_at(&self, at: Located) -> u32 {
		let mut prefix = self.prefix_summary(at.line);
		if let Some(leaf) = self.leaf(at.line) {
			for token in &leaf.tokens()[..at.index] {
				prefix.push(token);
			}
		}
		prefix.unmatched_opens()
	}

	/// Summary of all lines before `line`.
	fn prefix_summary(&self, line: usize) -> Summary {
		let mut acc = Summary::default();
		let mut node: &Node = &self.root;
		let mut base = 0;
		while let Body::Branch(children) = &node.body {
			let mut next = None;
			for child in children {
				if base + child.lines <= line {
					acc = acc.then(&child.summary);
					base += child.lines;
				} else {
					next = Some(child);
					break;
				}
			}
			match next {
				Some(child) => node = child,
				None => break,
			}
		}
		acc
	}

	fn find_close(&self, open: Located) -> Option<Located> {
		let leaf = self.leaf(open.line)?;
		let line_start = open.offset - open.token.column;
		let id = open.token.id;
		let mut needed = 1u32;
		for (index, token) in leaf.tokens().iter().enumerate().skip(open.index + 1) {
			if token.id != id {
				continue;
			}
			match token.kind {
				BracketKind::Open => needed += 1,
				BracketKind::Close => {
					needed -= 1;
					if needed == 0 {
						return Some(Located {
							line: open.line,
							index,
							offset: line_start + token.column,
							token: *token,
						});
					}
				}
			}
		}
		seek_forward(&self.root, 0, 0, open.line + 1, id, &mut needed)
	}

	fn find_open(&self, close: Located) -> Option<Located> {
		let leaf = self.leaf(close.line)?;
		let line_start = close.offset - close.token.column;
		let id = close.token.id;
		let mut needed = 1u32;
		for (index, token) in leaf.tokens()[..close.index].iter().enumerate().rev() {
			if token.id != id {
				continue;
			}
			match token.kind {
				BracketKind::Close => needed += 1,
				BracketKind::Open => {
					needed -= 1;
					if needed == 0 {
						return Some(Located {
							line: close.line,
							index,
							offset: line_start + token.column,
							token: *token,
						});
					}
				}
			}
		}
		seek_backward(&self.root, 0, 0, close.line, id, &mut needed)
	}
}

/// Finds the closer that brings `needed` unmatched closers of `id` to zero,
/// scanning lines from `from_line` on.
fn seek_forward(node: &Node, line_base: usize, char_base: usize, from_line: usize, id: BracketId, needed: &mut u32) -> Option<Located> {
	if line_base + node.lines <= from_line {
		return None;
	}
	if line_base >= from_line {
		let balance = node.summary.get(id);
		if *needed > balance.close {
			*needed = *needed - balance.close + balance.open;
			return None;
		}
	}
	match &node.body {
		Body::Leaf(leaf) => {
			for (index, token) in leaf.tokens().iter().enumerate() {
				if token.id != id {
					continue;
				}
				match token.kind {
					BracketKind::Open => *needed += 1,
					BracketKind::Close => {
						*needed -= 1;
						if *needed == 0 {
							return Some(Located {
								line: line_base,
								index,
								offset: char_base + token.column,
								token: *token,
							});
						}
					}
				}
			}
			None
		}
		Body::Branch(children) => {
			let (mut line, mut offset) = (line_base, char_base);
			for child in children {
				if let Some(found) = seek_forward(child, line, offset, from_line, id, needed) {
					return Some(found);
				}
				line += child.lines;
				offset += child.len;
			}
			None
		}
	}
}

/// Finds the opener that brings `needed` unmatched openers of `id` to zero,
/// scanning lines before `before_line` from the end.
fn seek_backward(node: &Node, line_base: usize, char_base: usize, before_line: usize, id: BracketId, needed: &mut u32) -> Option<Located> {
	if line_base >= before_line {
		return None;
	}
	if line_base + node.lines <= before_line {
		let balance = node.summary.get(id);
		if *needed > balance.open {
			*needed = *needed - balance.open + balance.close;
			return None;
		}
	}
	match &node.body {
		Body::Leaf(leaf) => {
			for (index, token) in leaf.tokens().iter().enumerate().rev() {
				if token.id != id {
					continue;
				}
				match token.kind {
					BracketKind::Close => *needed += 1,
					BracketKind::Open => {
						*needed -= 1;
						if *needed == 0 {
							return Some(Located {
								line: line_base,
								index,
								offset: char_base + token.column,
								token: *token,
							});
						}
					}
				}
			}
			None
		}
		Body::Branch(children) => {
			let mut bases = Vec::with_capacity(children.len());
			let (mut line, mut offset) = (line_base, char_base);
			for child in children {
				bases.push((line, offset));
				line += child.lines;
				offset += child.len;
			}
			for (child, (line, offset)) in children.iter().zip(bases).rev() {
				if let Some(found) = seek_backward(child, line, offset, before_line, id, needed) {
					return Some(found);
				}
			}
			None
		}
	}
}
