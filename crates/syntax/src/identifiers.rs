//! Identifier occurrence counts, biased toward lines currently cached.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Multiset of identifiers keyed by text.
///
/// `count(id)` equals the number of cached lines whose identifier set holds
/// `id`. Entries reaching zero are removed.
#[derive(Debug, Default)]
pub struct IdentifierTracker {
	counts: FxHashMap<Box<str>, usize>,
	total: usize,
}

impl IdentifierTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add<'a>(&mut self, identifiers: impl IntoIterator<Item = &'a str>) {
		for ident in identifiers {
			*self.counts.entry(Box::from(ident)).or_default() += 1;
			self.total += 1;
		}
	}

	/// Removes one occurrence of each identifier. Unknown identifiers are ignored.
	pub fn remove<'a>(&mut self, identifiers: impl IntoIterator<Item = &'a str>) {
		for ident in identifiers {
			let Some(count) = self.counts.get_mut(ident) else {
				tracing::debug!(identifier = ident, "identifiers.remove_unknown");
				continue;
			};
			*count -= 1;
			self.total -= 1;
			if *count == 0 {
				self.counts.remove(ident);
			}
		}
	}

	pub fn count(&self, ident: &str) -> usize {
		self.counts.get(ident).copied().unwrap_or(0)
	}

	/// Distinct identifiers.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Sum of all counts.
	pub fn total(&self) -> usize {
		self.total
	}

	pub fn clear(&mut self) {
		self.counts.clear();
		self.total = 0;
	}

	/// Identifiers starting with `prefix`, most frequent first, ties broken
	/// lexicographically.
	pub fn matching(&self, prefix: &str, limit: usize) -> Vec<(String, usize)> {
		let mut hits: Vec<(&str, usize)> = self
			.counts
			.iter()
			.filter(|(ident, _)| ident.starts_with(prefix))
			.map(|(ident, count)| (ident.as_ref(), *count))
			.collect();
		hits.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
		hits.into_iter().take(limit).map(|(ident, count)| (ident.to_owned(), count)).collect()
	}
}

/// Shared read handle to a session's [`IdentifierTracker`].
///
/// Only the analysis worker writes; hosts read for completion ranking.
#[derive(Debug, Clone, Default)]
pub struct SharedIdentifiers {
	inner: Arc<RwLock<IdentifierTracker>>,
}

impl SharedIdentifiers {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn count(&self, ident: &str) -> usize {
		self.inner.read().count(ident)
	}

	pub fn len(&self) -> usize {
		self.inner.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.read().is_empty()
	}

	pub fn total(&self) -> usize {
		self.inner.read().total()
	}

	pub fn matching(&self, prefix: &str, limit: usize) -> Vec<(String, usize)> {
		self.inner.read().matching(prefix, limit)
	}

	pub(crate) fn update<R>(&self, f: impl FnOnce(&mut IdentifierTracker) -> R) -> R {
		f(&mut self.inner.write())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_follow_adds_and_removes() {
		let mut tracker = IdentifierTracker::new();
		tracker.add(["foo", "bar"]);
		tracker.add(["foo"]);
		assert_eq!(tracker.count("foo"), 2);
		assert_eq!(tracker.count("bar"), 1);
		assert_eq!(tracker.total(), 3);

		tracker.remove(["foo", "bar"]);
		assert_eq!(tracker.count("foo"), 1);
		assert_eq!(tracker.count("bar"), 0);
		assert_eq!(tracker.len(), 1);
		assert_eq!(tracker.total(), 1);
	}

	#[test]
	fn removing_unknown_identifier_never_goes_negative() {
		let mut tracker = IdentifierTracker::new();
		tracker.remove(["ghost"]);
		assert_eq!(tracker.count("ghost"), 0);
		assert_eq!(tracker.total(), 0);
		assert!(tracker.is_empty());
	}

	#[test]
	fn clear_empties_everything() {
		let mut tracker = IdentifierTracker::new();
		tracker.add(["a", "b", "a"]);
		tracker.clear();
		assert!(tracker.is_empty());
		assert_eq!(tracker.total(), 0);
	}

	#[test]
	fn matching_ranks_by_count_then_name() {
		let mut tracker = IdentifierTracker::new();
		tracker.add(["value", "variant", "variant", "vec", "other"]);
		assert_eq!(
			tracker.matching("va", 10),
			vec![("variant".to_string(), 2), ("value".to_string(), 1)]
		);
		assert_eq!(tracker.matching("v", 2), vec![("variant".to_string(), 2), ("value".to_string(), 1)]);
	}

	#[test]
	fn shared_handle_reads_writer_updates() {
		let shared = SharedIdentifiers::new();
		let reader = shared.clone();
		shared.update(|tracker| tracker.add(["x"]));
		assert_eq!(reader.count("x"), 1);
		assert_eq!(reader.len(), 1);
	}
}
