use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use coolthings_collections::{GuardedMap, MessageType, SnapshotOptions, count_per_type, iterate, iterate_with};
use coolthings_worker::{TaskClass, spawn_thread};

#[test]
fn thousand_writers_with_distinct_keys_are_all_counted() {
	const WRITERS: i64 = 1_000;
	let map = Arc::new(GuardedMap::new());
	let start = Arc::new(Barrier::new(WRITERS as usize));

	let handles: Vec<_> = (0..WRITERS)
		.map(|i| {
			let map = Arc::clone(&map);
			let start = Arc::clone(&start);
			spawn_thread(TaskClass::Writer, move || {
				start.wait();
				map.insert(i, i);
			})
		})
		.collect();

	for handle in handles {
		handle.join().expect("writer must not panic");
	}

	assert_eq!(map.len(), WRITERS as usize);
	for i in 0..WRITERS {
		assert_eq!(map.get(&i), Some(i));
	}
}

static SHARED: GuardedMap<u32, u32> = GuardedMap::new();

#[test]
fn static_map_observations_stay_in_range() {
	const WRITERS: u32 = 64;
	const PER_WRITER: u32 = 50;
	let total = (WRITERS * PER_WRITER) as usize;

	let handles: Vec<_> = (0..WRITERS)
		.map(|w| {
			spawn_thread(TaskClass::Writer, move || {
				for i in 0..PER_WRITER {
					SHARED.insert(w * PER_WRITER + i, w);
					let seen = SHARED.len();
					assert!((1..=total).contains(&seen), "observed len {seen}");
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(SHARED.len(), total);
}

#[test]
fn same_key_writers_leave_a_single_entry() {
	let map = Arc::new(GuardedMap::new());
	let handles: Vec<_> = (0..32i64)
		.map(|v| {
			let map = Arc::clone(&map);
			spawn_thread(TaskClass::Writer, move || map.insert(0, v))
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(map.len(), 1);
	let winner = map.get(&0).unwrap();
	assert!((0..32).contains(&winner));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn live_map_is_walked_through_a_copy() {
	let map: Arc<GuardedMap<String, i64>> = Arc::new(GuardedMap::new());
	for i in 0..100 {
		map.insert(format!("k{i}"), i);
	}

	let writer = {
		let map = Arc::clone(&map);
		spawn_thread(TaskClass::Writer, move || {
			for i in 100..2_000 {
				map.insert(format!("k{i}"), i);
			}
		})
	};

	let copy = map.snapshot();
	let expected: HashSet<(String, i64)> = copy.iter().map(|(k, v)| (k.clone(), *v)).collect();
	let walked: HashSet<(String, i64)> = iterate_with(copy, SnapshotOptions::with_capacity(3))
		.drain()
		.await
		.into_iter()
		.map(Into::into)
		.collect();

	assert_eq!(walked, expected);
	assert!(walked.len() >= 100);

	writer.join().unwrap();
	assert_eq!(map.len(), 2_000);
}

#[tokio::test]
async fn tallied_counts_walk_as_plain_entries() {
	let rows = [5, 5, 5, 1, 1, 2, 4].map(serde_json::Value::from);
	let counts = count_per_type(&rows);

	let mut snapshot = iterate(counts);
	let mut walked = Vec::new();
	while let Some(entry) = tokio::time::timeout(Duration::from_secs(1), snapshot.next()).await.unwrap() {
		walked.push((entry.key, entry.value));
	}
	walked.sort();

	assert_eq!(
		walked,
		[(MessageType::Unknown, 1), (MessageType::Mail, 3), (MessageType::Push, 1), (MessageType::Sms, 2)]
	);
}
