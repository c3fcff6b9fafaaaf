/// Execution classes used for worker naming and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work on the host's own thread.
	Interactive,
	/// Long-running CPU work on a dedicated thread.
	Analysis,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Analysis => "analysis",
		}
	}

	/// Thread name for a worker of this class serving `label`.
	pub fn thread_name(self, label: &str) -> String {
		format!("quill-{}-{label}", self.as_str())
	}
}
