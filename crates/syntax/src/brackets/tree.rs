//! Persistent B-tree over document lines carrying bracket balances.
//!
//! Leaves are lines. Every node caches its char length, line count, and a
//! [`Summary`] of unmatched brackets, so offsets are located and partners
//! found without visiting subtrees whose balance rules them out. Splices
//! rebuild only the nodes on the touched paths; untouched subtrees are shared
//! between tree versions.

use std::ops::Range;
use std::sync::Arc;

use quill_primitives::EditDelta;
use smallvec::SmallVec;

use super::{BracketId, BracketKind, BracketToken};

pub(super) const MAX_CHILDREN: usize = 8;
pub(super) const MIN_CHILDREN: usize = MAX_CHILDREN / 2;

/// Unmatched brackets of one id in some run of text, after cancelling pairs
/// that close inside the run. In reduced form the run reads as `close`
/// closers followed by `open` openers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
	pub open: u32,
	pub close: u32,
}

impl Balance {
	/// Balance of `self` followed by `next`.
	pub const fn then(self, next: Self) -> Self {
		let matched = if self.open < next.close { self.open } else { next.close };
		Self {
			open: self.open - matched + next.open,
			close: self.close + next.close - matched,
		}
	}

	pub const fn is_zero(&self) -> bool {
		self.open == 0 && self.close == 0
	}
}

/// Per-id balances indexed by bracket id, with trailing zero entries trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
	balances: SmallVec<[Balance; 4]>,
}

impl Summary {
	pub fn of_tokens<'a>(tokens: impl IntoIterator<Item = &'a BracketToken>) -> Self {
		let mut summary = Self::default();
		for token in tokens {
			summary.push(token);
		}
		summary
	}

	pub fn get(&self, id: BracketId) -> Balance {
		self.balances.get(usize::from(id)).copied().unwrap_or_default()
	}

	/// Appends one token.
	pub fn push(&mut self, token: &BracketToken) {
		let idx = usize::from(token.id);
		if self.balances.len() <= idx {
			self.balances.resize(idx + 1, Balance::default());
		}
		let balance = &mut self.balances[idx];
		match token.kind {
			BracketKind::Open => balance.open += 1,
			BracketKind::Close if balance.open > 0 => balance.open -= 1,
			BracketKind::Close => balance.close += 1,
		}
		self.trim();
	}

	/// Summary of `self` followed by `next`.
	pub fn then(&self, next: &Self) -> Self {
		let len = self.balances.len().max(next.balances.len());
		let mut balances: SmallVec<[Balance; 4]> = (0..len)
			.map(|idx| {
				let left = self.balances.get(idx).copied().unwrap_or_default();
				let right = next.balances.get(idx).copied().unwrap_or_default();
				left.then(right)
			})
			.collect();
		while balances.last().is_some_and(Balance::is_zero) {
			balances.pop();
		}
		Self { balances }
	}

	/// Unmatched openers over all ids.
	pub fn unmatched_opens(&self) -> u32 {
		self.balances.iter().map(|balance| balance.open).sum()
	}

	fn trim(&mut self) {
		while self.balances.last().is_some_and(Balance::is_zero) {
			self.balances.pop();
		}
	}
}

/// One line: its char length including the terminator, and its brackets
/// ordered by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineLeaf {
	len: usize,
	tokens: SmallVec<[BracketToken; 4]>,
}

impl LineLeaf {
	pub fn new(len: usize, tokens: SmallVec<[BracketToken; 4]>) -> Self {
		Self { len, tokens }
	}

	pub fn empty(len: usize) -> Self {
		Self::new(len, SmallVec::new())
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn tokens(&self) -> &[BracketToken] {
		&self.tokens
	}

	/// Carries brackets across a raw edit covering `first..=last`, producing
	/// one leaf per entry of `new_lens`.
	///
	/// Brackets ending before the edit keep their columns on the first leaf;
	/// brackets starting at or after its old end move with the text onto the
	/// last leaf. Brackets overlapping the edited range are dropped.
	pub fn shift_across(first: &Self, last: &Self, delta: &EditDelta, new_lens: &[usize]) -> Vec<Self> {
		let prefix = first
			.tokens
			.iter()
			.filter(|token| token.column + token.len <= delta.start.column)
			.copied();
		let suffix = last
			.tokens
			.iter()
			.filter(|token| token.column >= delta.old_end.column)
			.map(|token| BracketToken {
				column: token.column - delta.old_end.column + delta.new_end.column,
				..*token
			});

		let mut leaves: Vec<Self> = new_lens.iter().map(|len| Self::empty(*len)).collect();
		let Some(last_idx) = leaves.len().checked_sub(1) else {
			return leaves;
		};
		leaves[0].tokens.extend(prefix);
		leaves[last_idx].tokens.extend(suffix);
		leaves
	}
}

#[derive(Debug)]
pub(super) struct Node {
	pub(super) len: usize,
	pub(super) lines: usize,
	pub(super) summary: Summary,
	pub(super) body: Body,
}

#[derive(Debug)]
pub(super) enum Body {
	Leaf(LineLeaf),
	Branch(Vec<Arc<Node>>),
}

impl Node {
	fn leaf(leaf: LineLeaf) -> Self {
		Self {
			len: leaf.len,
			lines: 1,
			summary: Summary::of_tokens(&leaf.tokens),
			body: Body::Leaf(leaf),
		}
	}

	fn branch(children: Vec<Arc<Node>>) -> Self {
		let mut len = 0;
		let mut lines = 0;
		let mut summary = Summary::default();
		for child in &children {
			len += child.len;
			lines += child.lines;
			summary = summary.then(&child.summary);
		}
		Self {
			len,
			lines,
			summary,
			body: Body::Branch(children),
		}
	}

	pub(super) fn children(&self) -> &[Arc<Node>] {
		match &self.body {
			Body::Branch(children) => children,
			Body::Leaf(_) => &[],
		}
	}
}

/// Immutable bracket index over a document snapshot.
#[derive(Debug, Clone)]
pub struct BracketTree {
	pub(super) root: Arc<Node>,
}

impl Default for BracketTree {
	fn default() -> Self {
		Self {
			root: Arc::new(Node::branch(Vec::new())),
		}
	}
}

impl BracketTree {
	pub fn from_leaves(leaves: impl IntoIterator<Item = LineLeaf>) -> Self {
		let nodes: Vec<Arc<Node>> = leaves.into_iter().map(|leaf| Arc::new(Node::leaf(leaf))).collect();
		Self::from_level(group(nodes))
	}

	pub fn line_count(&self) -> usize {
		self.root.lines
	}

	pub fn len_chars(&self) -> usize {
		self.root.len
	}

	pub fn summary(&self) -> &Summary {
		&self.root.summary
	}

	pub fn leaf(&self, line: usize) -> Option<&LineLeaf> {
		let mut node = &*self.root;
		let mut base = 0;
		loop {
			match &node.body {
				Body::Leaf(leaf) => return Some(leaf),
				Body::Branch(children) => {
					let mut next = None;
					for child in children {
						if line < base + child.lines {
							next = Some(child);
							break;
						}
						base += child.lines;
					}
					node = next?;
				}
			}
		}
	}

	/// Char offset where `line` starts.
	pub fn line_start(&self, line: usize) -> Option<usize> {
		if line >= self.root.lines {
			return None;
		}
		let mut node = &*self.root;
		let mut base = 0;
		let mut offset = 0;
		while let Body::Branch(children) = &node.body {
			let mut next = None;
			for child in children {
				if line < base + child.lines {
					next = Some(child);
					break;
				}
				base += child.lines;
				offset += child.len;
			}
			node = next?;
		}
		Some(offset)
	}

	/// Line containing `offset` and the char offset of that line's start.
	///
	/// The document end maps to the last line.
	pub(super) fn locate_offset(&self, offset: usize) -> Option<(usize, usize, &LineLeaf)> {
		if offset > self.root.len {
			return None;
		}
		let mut node = &*self.root;
		let mut line = 0;
		let mut start = 0;
		loop {
			match &node.body {
				Body::Leaf(leaf) => return Some((line, start, leaf)),
				Body::Branch(children) => {
					let last = children.len().checked_sub(1)?;
					let mut picked = last;
					for (idx, child) in children.iter().enumerate() {
						if idx == last || offset < start + child.len {
							picked = idx;
							break;
						}
						start += child.len;
						line += child.lines;
					}
					node = &children[picked];
				}
			}
		}
	}

	/// Visits the leaves of `lines` in order with their line index and start offset.
	pub fn for_each_leaf<'a>(&'a self, lines: Range<usize>, mut f: impl FnMut(usize, usize, &'a LineLeaf)) {
		visit(&self.root, 0, 0, &lines, &mut f);
	}

	/// Replaces the leaves of `lines` with `leaves`.
	///
	/// The range is clamped to the tree. Nodes off the touched paths are
	/// shared with `self`.
	pub fn splice(&self, lines: Range<usize>, leaves: Vec<LineLeaf>) -> Self {
		let total = self.root.lines;
		let start = lines.start.min(total);
		let end = lines.end.clamp(start, total);
		if start == end && leaves.is_empty() {
			return self.clone();
		}
		let mut pending = Some(leaves);
		Self::from_level(splice_children(self.root.children(), start, end, &mut pending))
	}

	fn from_level(mut nodes: Vec<Arc<Node>>) -> Self {
		while nodes.len() > 1 {
			nodes = group(nodes);
		}
		let Some(mut root) = nodes.pop() else {
			return Self::default();
		};
		loop {
			let next = match root.children() {
				[only] if matches!(only.body, Body::Branch(_)) => Arc::clone(only),
				_ => break,
			};
			root = next;
		}
		Self { root }
	}
}

fn visit<'a>(node: &'a Node, line_base: usize, char_base: usize, lines: &Range<usize>, f: &mut impl FnMut(usize, usize, &'a LineLeaf)) {
	if line_base >= lines.end || line_base + node.lines <= lines.start {
		return;
	}
	match &node.body {
		Body::Leaf(leaf) => f(line_base, char_base, leaf),
		Body::Branch(children) => {
			let (mut line, mut offset) = (line_base, char_base);
			for child in children {
				visit(child, line, offset, lines, f);
				line += child.lines;
				offset += child.len;
			}
		}
	}
}

/// Splices `start..end` (relative line range) out of the subtree formed by
/// `children`, inserting the pending leaves where the range begins. Returns
/// the replacement nodes, one level above `children`.
fn splice_children(children: &[Arc<Node>], start: usize, end: usize, pending: &mut Option<Vec<LineLeaf>>) -> Vec<Arc<Node>> {
	let Some(last_child) = children.len().checked_sub(1) else {
		let leaves = pending.take().unwrap_or_default();
		return group(leaves.into_iter().map(|leaf| Arc::new(Node::leaf(leaf))).collect());
	};

	let mut offsets = Vec::with_capacity(children.len());
	let mut running = 0;
	for child in children {
		offsets.push(running);
		running += child.lines;
	}
	let containing = |line: usize| {
		offsets
			.iter()
			.zip(children)
			.position(|(off, child)| line < off + child.lines)
			.unwrap_or(last_child)
	};
	let first = containing(start);
	let last = if end > start { containing(end - 1) } else { first };

	let mut out: Vec<Arc<Node>> = children[..first].to_vec();
	for idx in first..=last {
		let child = &children[idx];
		let off = offsets[idx];
		let local_start = start.max(off) - off;
		let local_end = end.min(off + child.lines).max(start.max(off)) - off;
		match &child.body {
			Body::Leaf(_) => {
				let removed = local_start == 0 && local_end == 1;
				if local_start == 0 {
					push_leaves(&mut out, pending);
				}
				if !removed {
					out.push(Arc::clone(child));
				}
				if local_start == 1 {
					push_leaves(&mut out, pending);
				}
			}
			Body::Branch(grandchildren) => {
				if local_start == 0 && local_end == child.lines && pending.is_none() {
					continue;
				}
				out.extend(splice_children(grandchildren, local_start, local_end, pending));
			}
		}
	}
	out.extend_from_slice(&children[last + 1..]);
	rebalance(&mut out);
	group(out)
}

fn push_leaves(out: &mut Vec<Arc<Node>>, pending: &mut Option<Vec<LineLeaf>>) {
	if let Some(leaves) = pending.take() {
		out.extend(leaves.into_iter().map(|leaf| Arc::new(Node::leaf(leaf))));
	}
}

/// Merges underfull branch nodes with a neighbor.
fn rebalance(nodes: &mut Vec<Arc<Node>>) {
	let mut idx = 0;
	while idx < nodes.len() && nodes.len() > 1 {
		let underfull = matches!(&nodes[idx].body, Body::Branch(children) if children.len() < MIN_CHILDREN);
		if !underfull {
			idx += 1;
			continue;
		}
		let left = if idx + 1 < nodes.len() { idx } else { idx - 1 };
		let mut merged = nodes[left].children().to_vec();
		merged.extend_from_slice(nodes[left + 1].children());
		let replacement = if merged.len() <= MAX_CHILDREN {
			vec![Arc::new(Node::branch(merged))]
		} else {
			let tail = merged.split_off(merged.len() / 2);
			vec![Arc::new(Node::branch(merged)), Arc::new(Node::branch(tail))]
		};
		nodes.splice(left..=left + 1, replacement);
		idx = left;
	}
}

/// Groups `nodes` into evenly sized parents of at most [`MAX_CHILDREN`].
fn group(nodes: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
	if nodes.is_empty() {
		return nodes;
	}
	let count = nodes.len().div_ceil(MAX_CHILDREN);
	let base = nodes.len() / count;
	let extra = nodes.len() % count;
	let mut iter = nodes.into_iter();
	(0..count)
		.map(|idx| {
			let take = base + usize::from(idx < extra);
			Arc::new(Node::branch(iter.by_ref().take(take).collect()))
		})
		.collect()
}

#[cfg(test)]
impl BracketTree {
	/// Asserts cached aggregates, uniform leaf depth, and fan-out bounds.
	pub(crate) fn assert_invariants(&self) {
		fn check(node: &Node, is_root: bool) -> usize {
			match &node.body {
				Body::Leaf(leaf) => {
					assert_eq!(node.lines, 1);
					assert_eq!(node.len, leaf.len);
					assert_eq!(node.summary, Summary::of_tokens(&leaf.tokens));
					0
				}
				Body::Branch(children) => {
					assert!(children.len() <= MAX_CHILDREN, "branch with {} children", children.len());
					if !is_root {
						assert!(!children.is_empty(), "empty inner branch");
					}
					let depths: Vec<usize> = children.iter().map(|child| check(child, false)).collect();
					assert!(depths.windows(2).all(|w| w[0] == w[1]), "leaves at uneven depth");
					assert_eq!(node.len, children.iter().map(|c| c.len).sum::<usize>());
					assert_eq!(node.lines, children.iter().map(|c| c.lines).sum::<usize>());
					let folded = children.iter().fold(Summary::default(), |acc, c| acc.then(&c.summary));
					assert_eq!(node.summary, folded);
					depths.first().copied().unwrap_or(0) + 1
				}
			}
		}
		check(&self.root, true);
	}

	/// Number of nodes of `self` that are shared by pointer with `other`.
	pub(crate) fn shared_nodes_with(&self, other: &Self) -> usize {
		fn collect(node: &Arc<Node>, out: &mut Vec<*const Node>) {
			out.push(Arc::as_ptr(node));
			for child in node.children() {
				collect(child, out);
			}
		}
		let mut mine = Vec::new();
		let mut theirs = Vec::new();
		collect(&self.root, &mut mine);
		collect(&other.root, &mut theirs);
		theirs.sort_unstable();
		mine.iter().filter(|ptr| theirs.binary_search(ptr).is_ok()).count()
	}
}
