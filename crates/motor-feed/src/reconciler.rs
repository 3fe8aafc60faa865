//! Reading reconciler.
//!
//! Merges incoming readings into a bounded, newest-first buffer. Checks run
//! in priority order:
//! 1. same `id` present: replace in place
//! 2. same `timestamp` present: replace in place
//! 3. otherwise: prepend, then evict from the back down to capacity
//!
//! Invariant: no two entries share an `id`, no two share a `timestamp`, and
//! `len() <= capacity()` after every insert.

use motor_core::Reading;
use std::collections::VecDeque;

/// Default buffer capacity.
pub const DEFAULT_MAX_READINGS: usize = 100;

/// What an upsert did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Replaced the entry with the same id, now at this index.
    ReplacedById(usize),
    /// Replaced the entry with the same timestamp at this index.
    ReplacedByTimestamp(usize),
    /// Prepended a novel reading; `evicted` entries fell off the back.
    Inserted { evicted: usize },
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplacedById(_) => "replaced_by_id",
            Self::ReplacedByTimestamp(_) => "replaced_by_timestamp",
            Self::Inserted { .. } => "inserted",
        }
    }

    pub fn evicted(&self) -> usize {
        match self {
            Self::Inserted { evicted } => *evicted,
            _ => 0,
        }
    }
}

/// Bounded, newest-first reading buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl Default for ReadingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_READINGS)
    }
}

impl ReadingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Reading> {
        self.readings.get(index)
    }

    /// Newest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    /// Merge one reading.
    pub fn upsert(&mut self, incoming: Reading) -> UpsertOutcome {
        if let Some(i) = self.readings.iter().position(|r| r.id == incoming.id) {
            let timestamp = incoming.timestamp;
            self.readings[i] = incoming;

            // The replacement may carry a timestamp owned by another entry.
            let conflict = self
                .readings
                .iter()
                .enumerate()
                .position(|(k, r)| k != i && r.timestamp == timestamp);
            return match conflict {
                Some(j) => {
                    self.readings.remove(j);
                    UpsertOutcome::ReplacedById(if j < i { i - 1 } else { i })
                }
                None => UpsertOutcome::ReplacedById(i),
            };
        }

        if let Some(j) = self
            .readings
            .iter()
            .position(|r| r.timestamp == incoming.timestamp)
        {
            self.readings[j] = incoming;
            return UpsertOutcome::ReplacedByTimestamp(j);
        }

        self.readings.push_front(incoming);
        UpsertOutcome::Inserted {
            evicted: self.truncate(),
        }
    }

    /// Change capacity, truncating immediately when shrinking. Returns the
    /// number of evicted readings.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        self.truncate()
    }

    /// Merge a snapshot fetched while readings may already have streamed in.
    ///
    /// The snapshot is ordered newest-first and seeded into an empty buffer,
    /// then previously streamed readings are re-applied oldest-first so
    /// their versions win. Returns the resulting length.
    pub fn merge_snapshot(&mut self, mut snapshot: Vec<Reading>) -> usize {
        let streamed: Vec<Reading> = self.readings.drain(..).collect();

        snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for reading in snapshot.into_iter().rev() {
            self.upsert(reading);
        }
        for reading in streamed.into_iter().rev() {
            self.upsert(reading);
        }
        self.readings.len()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    fn truncate(&mut self) -> usize {
        let evicted = self.readings.len().saturating_sub(self.capacity);
        self.readings.truncate(self.capacity);
        evicted
    }
}

/// Reducer form of [`ReadingBuffer::upsert`]: applies `capacity` and returns
/// the new buffer.
pub fn upsert(
    mut buffer: ReadingBuffer,
    incoming: Reading,
    capacity: usize,
) -> (ReadingBuffer, UpsertOutcome) {
    buffer.capacity = capacity;
    let outcome = buffer.upsert(incoming);
    (buffer, outcome)
}
