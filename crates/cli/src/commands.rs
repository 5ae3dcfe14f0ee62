use std::collections::HashMap;
use std::sync::{Arc, Barrier};

use anyhow::anyhow;
use coolthings_collections::{GuardedMap, MessageType, SnapshotOptions, WalkReport, count_per_type, iterate_with};
use coolthings_worker::{TaskClass, spawn_thread};
use serde_json::Value;
use tracing::info;

/// Starts `writers` threads together, each inserting its own key, and returns
/// the final number of keys.
pub fn stress(writers: usize) -> anyhow::Result<usize> {
	let map: Arc<GuardedMap> = Arc::new(GuardedMap::new());
	let start = Arc::new(Barrier::new(writers));

	let handles: Vec<_> = (0..writers)
		.map(|i| {
			let map = Arc::clone(&map);
			let start = Arc::clone(&start);
			spawn_thread(TaskClass::Writer, move || {
				start.wait();
				let key = i as i64;
				map.insert(key, key);
			})
		})
		.collect();

	for (i, handle) in handles.into_iter().enumerate() {
		handle.join().map_err(|_| anyhow!("writer {i} panicked"))?;
	}

	let len = map.len();
	info!(writers, len, "stress finished");
	Ok(len)
}

/// Result of one `walk` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSummary {
	pub received: usize,
	pub value_sum: i64,
	pub high_water: usize,
	pub report: WalkReport,
}

/// Walks a generated `key-N -> N` map, optionally stopping after `take`.
pub async fn walk(entries: usize, options: SnapshotOptions, take: Option<usize>) -> WalkSummary {
	let source: HashMap<String, i64> = (0..entries).map(|i| (format!("key-{i}"), i as i64)).collect();
	let mut snapshot = iterate_with(source, options);
	let limit = take.unwrap_or(usize::MAX);

	let mut received = 0;
	let mut value_sum = 0i64;
	while received < limit {
		let Some(entry) = snapshot.next().await else {
			break;
		};
		received += 1;
		value_sum = value_sum.saturating_add(entry.value);
	}

	let high_water = snapshot.high_water();
	let report = snapshot.cancel().await;
	info!(generation = report.generation, received, high_water, outcome = ?report.outcome, "walk finished");
	WalkSummary {
		received,
		value_sum,
		high_water,
		report,
	}
}

/// Classifies raw rows, then walks the per-type counts. Sorted by type.
pub async fn tally(rows: &[String], options: SnapshotOptions) -> Vec<(MessageType, i64)> {
	let values: Vec<Value> = rows
		.iter()
		.map(|row| serde_json::from_str(row).unwrap_or_else(|_| Value::String(row.clone())))
		.collect();

	let counts = count_per_type(&values);
	let mut walked: Vec<(MessageType, i64)> = iterate_with(counts, options).drain().await.into_iter().map(Into::into).collect();
	walked.sort();
	walked
}
