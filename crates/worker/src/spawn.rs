use std::thread::JoinHandle;

use thiserror::Error;

use crate::TaskClass;
use crate::panic::panic_message;

/// A worker thread terminated by a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("worker thread `{thread}` panicked: {message}")]
pub struct WorkerPanic {
	pub thread: String,
	pub message: String,
}

/// Handle to a dedicated named worker thread.
#[derive(Debug)]
pub struct WorkerThread<R> {
	name: String,
	class: TaskClass,
	handle: JoinHandle<R>,
}

impl<R> WorkerThread<R> {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Waits for the thread to exit, surfacing a panic as [`WorkerPanic`].
	pub fn join(self) -> Result<R, WorkerPanic> {
		let Self { name, class, handle } = self;
		match handle.join() {
			Ok(value) => {
				tracing::trace!(worker_class = class.as_str(), thread = %name, "worker.joined");
				Ok(value)
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				tracing::error!(worker_class = class.as_str(), thread = %name, %message, "worker.panicked");
				Err(WorkerPanic { thread: name, message })
			}
		}
	}
}

/// Spawns a dedicated named OS thread with worker classification metadata.
pub fn spawn_named_thread<F, R>(class: TaskClass, label: &str, f: F) -> std::io::Result<WorkerThread<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = class.thread_name(label);
	tracing::trace!(worker_class = class.as_str(), thread = %name, "worker.spawn_named_thread");
	let handle = std::thread::Builder::new().name(name.clone()).spawn(f)?;
	Ok(WorkerThread { name, class, handle })
}
