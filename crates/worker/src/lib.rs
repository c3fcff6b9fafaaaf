//! Worker primitives: task classes, named worker threads, panic capture, and
//! generation-scoped cancellation.

mod class;
mod panic;
mod spawn;
mod token;

pub use class::TaskClass;
pub use panic::{catch_panic, panic_message};
pub use spawn::{WorkerPanic, WorkerThread, spawn_named_thread};
pub use token::{GenerationClock, GenerationToken};
