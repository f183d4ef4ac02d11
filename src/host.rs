//! Host boundary.
//!
//! The framework never talks to the game engine directly. It reads inputs and
//! manipulates status-effect slots through [`EntityHost`], and writes persisted
//! fields into a [`FieldStore`] whose encoding is left to the host.

use crate::id::StatusHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-entity accessor implemented by the host game.
///
/// # Examples
///
/// ```rust
/// use kiform::{EntityHost, MemoryHost, StatusHandle};
///
/// let mut host = MemoryHost::new();
/// host.apply_status(StatusHandle(3), 2);
/// assert!(host.has_status(StatusHandle(3)));
///
/// host.advance();
/// host.advance();
/// assert!(!host.has_status(StatusHandle(3)));
/// ```
pub trait EntityHost: Send + Sync {
    /// Whether the charge input is held this tick.
    fn is_charging(&self) -> bool;

    /// Whether the status slot is currently present on the entity.
    fn has_status(&self, status: StatusHandle) -> bool;

    /// Apply the status, or refresh it, for `ticks` ticks.
    fn apply_status(&mut self, status: StatusHandle, ticks: u32);

    /// Remove the status if present.
    fn remove_status(&mut self, status: StatusHandle);
}

/// An in-memory host used by tests, demos and headless simulations.
///
/// Status timers only count down when [`MemoryHost::advance`] is called.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    charging: bool,
    statuses: HashMap<StatusHandle, u32>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_charging(&mut self, charging: bool) {
        self.charging = charging;
    }

    /// Count every status down by one tick, expiring those that reach zero.
    pub fn advance(&mut self) {
        self.statuses.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });
    }

    /// Remaining ticks of a status, if present.
    pub fn remaining(&self, status: StatusHandle) -> Option<u32> {
        self.statuses.get(&status).copied()
    }

    pub fn status_count(&self) -> usize {
        self.statuses.len()
    }
}

impl EntityHost for MemoryHost {
    fn is_charging(&self) -> bool {
        self.charging
    }

    fn has_status(&self, status: StatusHandle) -> bool {
        self.statuses.contains_key(&status)
    }

    fn apply_status(&mut self, status: StatusHandle, ticks: u32) {
        if ticks == 0 {
            self.statuses.remove(&status);
        } else {
            self.statuses.insert(status, ticks);
        }
    }

    fn remove_status(&mut self, status: StatusHandle) {
        self.statuses.remove(&status);
    }
}

/// Named persisted fields of one entity.
///
/// Values are stored as JSON values so any serializable field can be kept;
/// the host decides how the store itself is encoded.
///
/// # Examples
///
/// ```rust
/// use kiform::FieldStore;
///
/// let mut fields = FieldStore::new();
/// fields.set("mastery_level", 4);
///
/// let level: Option<u32> = fields.get("mastery_level");
/// assert_eq!(level, Some(4));
/// assert!(!fields.contains_key("trait"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStore {
    data: HashMap<String, serde_json::Value>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Values that fail to serialize are not stored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Read a field, `None` if absent or of the wrong shape.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }
}
