use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::Timestamp;

/// Tracks access history for a single page
#[derive(Debug)]
struct AccessInfo {
    /// History of access timestamps (most recent at back)
    history: VecDeque<Timestamp>,
    /// Whether this page may currently be chosen as a victim
    is_evictable: bool,
}

impl AccessInfo {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    /// Records an access at the given timestamp
    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance, or None (+inf) with fewer than k accesses
    fn k_distance(&self, current_timestamp: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(current_timestamp - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

/// LRU-K Replacement Policy
///
/// The LRU-K algorithm evicts the entry whose backward k-distance is the
/// maximum of all entries in the replacer. Backward k-distance is the
/// difference in time between the current timestamp and the timestamp of the
/// kth previous access.
///
/// An entry with fewer than k historical accesses is given +inf as its
/// backward k-distance. If multiple entries have +inf backward k-distance, the
/// replacer evicts the one with the earliest overall timestamp.
pub struct LruKReplacer<K> {
    /// K value for the LRU-K algorithm
    k: usize,
    /// Current timestamp (monotonically increasing)
    current_timestamp: AtomicU64,
    /// Access information for each tracked key
    entries: Mutex<HashMap<K, AccessInfo>>,
    /// Number of evictable entries
    num_evictable: Mutex<usize>,
}

impl<K: Copy + Eq + Hash> LruKReplacer<K> {
    /// Creates a new LRU-K replacer with the given k value.
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            current_timestamp: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
            num_evictable: Mutex::new(0),
        }
    }

    /// Evicts the entry with the largest backward k-distance.
    /// Returns None if there are no evictable entries.
    pub fn evict(&self) -> Option<K> {
        self.evict_where(|_| true)
    }

    /// Like `evict`, but only considers evictable entries accepted by `allow`.
    pub fn evict_where<F>(&self, mut allow: F) -> Option<K>
    where
        F: FnMut(&K) -> bool,
    {
        let mut entries = self.entries.lock();
        let mut num_evictable = self.num_evictable.lock();

        if *num_evictable == 0 {
            return None;
        }

        let current_ts = self.current_timestamp.load(Ordering::Relaxed);

        let mut victim: Option<K> = None;
        let mut victim_k_dist: Option<Timestamp> = None;
        let mut victim_earliest_ts: Option<Timestamp> = None;

        for (key, info) in entries.iter() {
            if !info.is_evictable || !allow(key) {
                continue;
            }

            let k_dist = info.k_distance(current_ts, self.k);
            let earliest_ts = info.earliest_timestamp();

            let should_replace = match (victim_k_dist, k_dist) {
                // +inf beats any finite distance
                (None, Some(_)) => false,
                (Some(_), None) => true,
                (None, None) => match (victim_earliest_ts, earliest_ts) {
                    (Some(v_ts), Some(c_ts)) => c_ts < v_ts,
                    (None, Some(_)) => true,
                    _ => false,
                },
                (Some(v_dist), Some(c_dist)) => c_dist > v_dist,
            };

            if victim.is_none() || should_replace {
                victim = Some(*key);
                victim_k_dist = k_dist;
                victim_earliest_ts = earliest_ts;
            }
        }

        if let Some(key) = victim {
            entries.remove(&key);
            *num_evictable -= 1;
        }

        victim
    }

    /// Records that `key` was accessed at the current timestamp.
    pub fn record_access(&self, key: K) {
        let timestamp = self.current_timestamp.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock();

        entries
            .entry(key)
            .or_insert_with(AccessInfo::new)
            .record_access(timestamp, self.k);
    }

    /// Sets whether an entry may be chosen as a victim.
    pub fn set_evictable(&self, key: K, is_evictable: bool) {
        let mut entries = self.entries.lock();
        let mut num_evictable = self.num_evictable.lock();

        if let Some(info) = entries.get_mut(&key) {
            if info.is_evictable != is_evictable {
                if is_evictable {
                    *num_evictable += 1;
                } else {
                    *num_evictable -= 1;
                }
                info.is_evictable = is_evictable;
            }
        } else if is_evictable {
            let mut info = AccessInfo::new();
            info.is_evictable = true;
            entries.insert(key, info);
            *num_evictable += 1;
        }
    }

    /// Forgets `key` entirely.
    pub fn remove(&self, key: K) {
        let mut entries = self.entries.lock();
        let mut num_evictable = self.num_evictable.lock();

        if let Some(info) = entries.remove(&key) {
            if info.is_evictable {
                *num_evictable -= 1;
            }
        }
    }

    /// Returns the number of evictable entries.
    pub fn size(&self) -> usize {
        *self.num_evictable.lock()
    }

    /// Returns the k value of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
