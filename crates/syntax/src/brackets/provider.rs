use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use quill_worker::GenerationClock;

use super::{BracketPair, BracketTree, PairedBracket};
use crate::receiver::StyleReceiver;

#[derive(Debug, Default)]
struct Snapshot {
	tree: BracketTree,
	generation: u64,
}

#[derive(Debug, Default)]
struct ViewState {
	cursor: Option<usize>,
	visible: Option<Range<usize>>,
	pushed_pair: Option<PairedBracket>,
	pushed_range: Option<Arc<[BracketPair]>>,
}

struct Inner {
	snapshot: ArcSwap<Snapshot>,
	clock: GenerationClock,
	view: Mutex<ViewState>,
	detached: AtomicBool,
}

/// Host-side bracket queries over the latest published tree.
///
/// Queries run synchronously against an immutable snapshot. A snapshot
/// older than the newest edit is stale and every query answers `None`
/// until the worker publishes the tree for that edit.
#[derive(Clone)]
pub struct BracketProvider {
	inner: Arc<Inner>,
}

impl fmt::Debug for BracketProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BracketProvider")
			.field("generation", &self.inner.snapshot.load().generation)
			.field("detached", &self.is_detached())
			.finish_non_exhaustive()
	}
}

impl BracketProvider {
	pub(crate) fn new(clock: GenerationClock) -> Self {
		Self {
			inner: Arc::new(Inner {
				snapshot: ArcSwap::from_pointee(Snapshot::default()),
				clock,
				view: Mutex::new(ViewState::default()),
				detached: AtomicBool::new(false),
			}),
		}
	}

	pub(crate) fn publish(&self, tree: BracketTree, generation: u64) {
		if self.is_detached() {
			return;
		}
		self.inner.snapshot.store(Arc::new(Snapshot { tree, generation }));
	}

	/// Drops the tree; all later queries answer `None`.
	pub(crate) fn detach(&self) {
		self.inner.detached.store(true, Ordering::Release);
		self.inner.snapshot.store(Arc::new(Snapshot::default()));
	}

	pub fn is_detached(&self) -> bool {
		self.inner.detached.load(Ordering::Acquire)
	}

	/// Generation of the published snapshot.
	pub fn generation(&self) -> u64 {
		self.inner.snapshot.load().generation
	}

	fn current(&self) -> Option<Arc<Snapshot>> {
		if self.is_detached() {
			return None;
		}
		let snapshot = self.inner.snapshot.load_full();
		(snapshot.generation == self.inner.clock.current()).then_some(snapshot)
	}

	pub fn paired_bracket_at(&self, offset: usize) -> Option<PairedBracket> {
		self.current()?.tree.paired_bracket_at(offset)
	}

	/// `None` when the snapshot is stale or no pair touches `range`.
	pub fn pairs_in_range(&self, range: Range<usize>) -> Option<Vec<BracketPair>> {
		let pairs = self.current()?.tree.pairs_in_range(range.start, range.end);
		(!pairs.is_empty()).then_some(pairs)
	}

	pub fn set_cursor(&self, offset: Option<usize>) {
		self.inner.view.lock().cursor = offset;
	}

	pub fn set_visible_range(&self, range: Option<Range<usize>>) {
		self.inner.view.lock().visible = range;
	}

	/// Recomputes the cursor pair and visible pairs, pushing each to
	/// `receiver` only when it differs from what was last pushed.
	pub fn flush(&self, receiver: &mut dyn StyleReceiver) {
		let (cursor, visible) = {
			let view = self.inner.view.lock();
			(view.cursor, view.visible.clone())
		};
		let pair = cursor.and_then(|offset| self.paired_bracket_at(offset));
		let range: Option<Arc<[BracketPair]>> = visible.and_then(|range| self.pairs_in_range(range)).map(Arc::from);

		let (push_pair, push_range) = {
			let mut view = self.inner.view.lock();
			let push_pair = view.pushed_pair != pair;
			let push_range = view.pushed_range != range;
			view.pushed_pair = pair;
			if push_range {
				view.pushed_range = range.clone();
			}
			(push_pair, push_range)
		};
		if push_pair {
			tracing::trace!(?pair, "brackets.flush_pair");
			receiver.update_matched_bracket_pair(pair);
		}
		if push_range {
			tracing::trace!(pairs = range.as_ref().map_or(0, |r| r.len()), "brackets.flush_range");
			receiver.update_bracket_pairs_in_range(range);
		}
	}
}
