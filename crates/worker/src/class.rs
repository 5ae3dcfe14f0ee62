/// Execution classes attached to spawned work for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Background walk that feeds a bounded queue.
	Producer,
	/// Task draining a bounded queue.
	Consumer,
	/// Concurrent writer into shared state.
	Writer,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Producer => "producer",
			Self::Consumer => "consumer",
			Self::Writer => "writer",
		}
	}
}
