//! Property-based tests for the cache store and memoized wrappers.

use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::{cache_with, CacheOptions, CacheStore, Capacity, Lookup};

// == Strategies ==
#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: u8, value: u32 },
    Get { key: u8 },
    Remove { key: u8 },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (0u8..16, any::<u32>()).prop_map(|(key, value)| StoreOp::Set { key, value }),
        (0u8..16).prop_map(|key| StoreOp::Get { key }),
        (0u8..16).prop_map(|key| StoreOp::Remove { key }),
    ]
}

/// Reference LRU: a vector ordered from least to most recently used.
#[derive(Default)]
struct ModelLru {
    entries: VecDeque<(u8, u32)>,
}

impl ModelLru {
    fn touch(&mut self, key: u8) -> Option<u32> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(pos)?;
        self.entries.push_back(entry);
        Some(entry.1)
    }

    fn set(&mut self, key: u8, value: u32, capacity: usize) {
        if self.touch(key).is_some() {
            if let Some(last) = self.entries.back_mut() {
                last.1 = value;
            }
            return;
        }
        if capacity == 0 {
            return;
        }
        if self.entries.len() >= capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, value));
    }

    fn remove(&mut self, key: u8) {
        self.entries.retain(|(k, _)| *k != key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // A bounded store never holds more entries than its capacity.
    #[test]
    fn prop_bounded_store_respects_capacity(
        capacity in 0usize..8,
        ops in prop::collection::vec(store_op_strategy(), 1..100),
    ) {
        let mut store = CacheStore::new(Capacity::Bounded(capacity), false);
        for op in ops {
            match op {
                StoreOp::Set { key, value } => { store.set(key, value); }
                StoreOp::Get { key } => { store.get(&key); }
                StoreOp::Remove { key } => { store.remove(&key); }
            }
            prop_assert!(store.len() <= capacity);
        }
    }

    // A bounded store behaves exactly like a reference LRU list.
    #[test]
    fn prop_bounded_store_matches_lru_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(store_op_strategy(), 1..100),
    ) {
        let mut store = CacheStore::new(Capacity::Bounded(capacity), false);
        let mut model = ModelLru::default();

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    store.set(key, value);
                    model.set(key, value, capacity);
                }
                StoreOp::Get { key } => {
                    let expected = model.touch(key);
                    prop_assert_eq!(store.get(&key).cloned().into_option(), expected);
                }
                StoreOp::Remove { key } => {
                    store.remove(&key);
                    model.remove(key);
                }
            }
        }

        let order: Vec<(u8, u32)> = store.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u32)> = model.entries.iter().copied().collect();
        prop_assert_eq!(order, expected);
    }

    // Hits plus misses always equals the number of lookups.
    #[test]
    fn prop_statistics_accuracy(
        capacity in prop_oneof![Just(Capacity::Unbounded), (1usize..8).prop_map(Capacity::Bounded)],
        ops in prop::collection::vec(store_op_strategy(), 1..100),
    ) {
        let mut store = CacheStore::new(capacity, true);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                StoreOp::Set { key, value } => { store.set(key, value); }
                StoreOp::Get { key } => match store.get(&key) {
                    Lookup::Hit(_) => expected_hits += 1,
                    Lookup::Miss => expected_misses += 1,
                },
                StoreOp::Remove { key } => { store.remove(&key); }
            }
        }

        prop_assert_eq!(store.hits(), Some(expected_hits));
        prop_assert_eq!(store.misses(), Some(expected_misses));
    }

    // An unbounded memoized function runs once per distinct argument.
    #[test]
    fn prop_unbounded_memoization_runs_once_per_key(
        args in prop::collection::vec(0u16..32, 1..64),
    ) {
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);
        let decorator = cache_with(CacheOptions::new().track_stats(true)).unwrap();
        let square = decorator.apply(move |x: &(u16,)| {
            counter.set(counter.get() + 1);
            u32::from(x.0) * u32::from(x.0)
        });

        for arg in &args {
            prop_assert_eq!(square.call((*arg,)).unwrap(), u32::from(*arg) * u32::from(*arg));
        }

        let distinct: HashMap<u16, ()> = args.iter().map(|a| (*a, ())).collect();
        prop_assert_eq!(calls.get(), distinct.len());

        let info = square.info().unwrap();
        prop_assert_eq!(info.misses, Some(distinct.len() as u64));
        prop_assert_eq!(info.hits, Some((args.len() - distinct.len()) as u64));
    }
}
