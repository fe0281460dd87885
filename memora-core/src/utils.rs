//! Helpers for the recency queue behind [`BoundedMap`](crate::BoundedMap).
//!
//! The queue holds every key once, least recently used at the front. Both helpers scan
//! linearly, so they cost O(n) in the number of cached entries.

use std::collections::VecDeque;

/// Marks `key` as the most recently used entry.
///
/// Keys that are not queued are ignored.
///
/// ```
/// use std::collections::VecDeque;
/// use memora_core::utils::mark_recent;
///
/// let mut recency = VecDeque::from(["north", "east", "south"]);
/// mark_recent(&mut recency, &"north");
/// assert_eq!(recency, ["east", "south", "north"]);
///
/// mark_recent(&mut recency, &"west");
/// assert_eq!(recency.len(), 3);
/// ```
pub fn mark_recent<K: PartialEq>(recency: &mut VecDeque<K>, key: &K) {
    let Some(index) = recency.iter().position(|queued| queued == key) else {
        return;
    };
    if index + 1 < recency.len() {
        if let Some(queued) = recency.remove(index) {
            recency.push_back(queued);
        }
    }
}

/// Drops `key` from the queue. Returns whether it was queued.
///
/// ```
/// use std::collections::VecDeque;
/// use memora_core::utils::forget_key;
///
/// let mut recency = VecDeque::from([10, 20, 30]);
/// assert!(forget_key(&mut recency, &20));
/// assert!(!forget_key(&mut recency, &20));
/// assert_eq!(recency, [10, 30]);
/// ```
pub fn forget_key<K: PartialEq>(recency: &mut VecDeque<K>, key: &K) -> bool {
    recency
        .iter()
        .position(|queued| queued == key)
        .and_then(|index| recency.remove(index))
        .is_some()
}
