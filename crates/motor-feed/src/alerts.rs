//! Alert registry.
//!
//! Alerts are kept newest-first and deduplicated by `id`. A re-sent alert
//! never overwrites the stored entry, so an acknowledgement is never lost.

use motor_core::Alert;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertRegistry {
    alerts: VecDeque<Alert>,
    /// Optional bound (dedup first, then evict oldest).
    capacity: Option<usize>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            alerts: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Newest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn to_vec(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn unacknowledged(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    /// Insert unless the id is already present. Returns true if inserted.
    pub fn add(&mut self, alert: Alert) -> bool {
        if self.alerts.iter().any(|a| a.id == alert.id) {
            return false;
        }
        self.alerts.push_front(alert);
        if let Some(capacity) = self.capacity {
            self.alerts.truncate(capacity);
        }
        true
    }

    /// Mark an alert acknowledged. Unknown ids are ignored. Returns true if
    /// the flag changed.
    pub fn acknowledge(&mut self, id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if !alert.acknowledged => {
                alert.acknowledged = true;
                true
            }
            _ => false,
        }
    }
}

/// Reducer form of [`AlertRegistry::add`].
pub fn add(mut registry: AlertRegistry, alert: Alert) -> AlertRegistry {
    registry.add(alert);
    registry
}

/// Reducer form of [`AlertRegistry::acknowledge`].
pub fn acknowledge(mut registry: AlertRegistry, id: &str) -> AlertRegistry {
    registry.acknowledge(id);
    registry
}
