//! Locally synthesized high-temperature advisories.

use motor_core::{Advisory, Reading};
use std::collections::VecDeque;

/// Default advisory log bound.
pub const DEFAULT_MAX_ADVISORIES: usize = 20;

/// Raises an advisory when a reading's temperature exceeds the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisoryPolicy {
    pub threshold_c: f64,
}

impl Default for AdvisoryPolicy {
    fn default() -> Self {
        Self { threshold_c: 80.0 }
    }
}

impl AdvisoryPolicy {
    pub fn new(threshold_c: f64) -> Self {
        Self { threshold_c }
    }

    pub fn evaluate(&self, reading: &Reading) -> Option<Advisory> {
        (reading.temperature > self.threshold_c)
            .then(|| Advisory::high_temperature(reading.id.clone(), reading.temperature))
    }
}

/// Bounded, newest-first advisory log.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryLog {
    entries: VecDeque<Advisory>,
    capacity: usize,
}

impl Default for AdvisoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ADVISORIES)
    }
}

impl AdvisoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, advisory: Advisory) {
        self.entries.push_front(advisory);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Advisory> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Advisory> {
        self.entries.iter().cloned().collect()
    }
}
