//! Worker primitives shared by the collections: task classes, spawn
//! entrypoints, stop tokens and the bounded back-pressured queue.

mod class;
pub mod queue;
mod spawn;
mod token;

pub use class::TaskClass;
pub use queue::{QueueReceiver, QueueSender, SendError, TrySendError, bounded};
pub use spawn::{spawn, spawn_named_thread, spawn_thread};
pub use token::{GenerationClock, StopToken};
