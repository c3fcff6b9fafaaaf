use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"<unknown panic>".to_string()
	}
}

/// Runs `f`, converting a panic into its message.
///
/// Callers must not observe state `f` left half-updated; the closure is
/// asserted unwind safe.
pub fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, String> {
	catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}
