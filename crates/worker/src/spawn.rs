use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

/// Returns the ambient runtime handle, falling back to a small shared runtime
/// when called from plain threads.
fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("coolthings-worker")
			.build()
			.expect("failed to build coolthings-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task tagged with `class`.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns a dedicated OS thread tagged with `class`.
pub fn spawn_thread<F, R>(class: TaskClass, f: F) -> std::thread::JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_thread");
	std::thread::spawn(f)
}

/// Spawns a dedicated named OS thread tagged with `class`.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(worker_class = class.as_str(), thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spawn_outside_runtime_uses_global_runtime() {
		let handle = spawn(TaskClass::Producer, async { 7u32 });
		let value = runtime_handle().block_on(handle).unwrap();
		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn spawn_inside_runtime_uses_current_handle() {
		let value = spawn(TaskClass::Consumer, async { "inner" }).await.unwrap();
		assert_eq!(value, "inner");
	}

	#[test]
	fn named_thread_carries_name() {
		let handle = spawn_named_thread(TaskClass::Writer, "writer-0", || std::thread::current().name().map(str::to_owned)).unwrap();
		assert_eq!(handle.join().unwrap().as_deref(), Some("writer-0"));
	}
}
