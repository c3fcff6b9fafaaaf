use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock shared between a producer and its worker.
///
/// Every stamped change advances the clock; work started for an older
/// generation observes itself as superseded.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	current: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a clock at generation 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the clock and returns the new generation.
	pub fn next(&self) -> u64 {
		self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the latest generation handed out.
	pub fn current(&self) -> u64 {
		self.current.load(Ordering::Acquire)
	}

	/// Creates a token for `generation` that is also cancelled by `cancel`.
	pub fn token(&self, generation: u64, cancel: &CancellationToken) -> GenerationToken {
		GenerationToken {
			generation,
			clock: self.clone(),
			cancel: cancel.child_token(),
		}
	}
}

/// Generation-scoped cancellation token.
///
/// Cancelled once the clock has moved past its generation or when its
/// cancellation source fires.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	clock: GenerationClock,
	cancel: CancellationToken,
}

impl GenerationToken {
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when superseded or explicitly cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled() || self.clock.current() != self.generation
	}

	/// Requests cancellation of this token and its children.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Creates a child token in the same generation.
	pub fn child(&self) -> Self {
		Self {
			generation: self.generation,
			clock: self.clock.clone(),
			cancel: self.cancel.child_token(),
		}
	}
}
