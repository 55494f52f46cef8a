//! In-memory activity log.
//!
//! A bounded ring of the engine's most recent actions, served verbatim
//! by the dashboard API. Process-lifetime only; a restart starts empty.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::types::{ActivityAction, ActivityEntry};

/// Maximum retained entries. Appends beyond this evict the oldest.
const MAX_ENTRIES: usize = 200;

/// Cheaply cloneable handle to the shared log.
#[derive(Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<ActivityEntry>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time, evicting the
    /// oldest entry once the cap is reached.
    pub fn append(&self, action: ActivityAction, details: serde_json::Value) {
        let entry = ActivityEntry {
            time: Utc::now(),
            action,
            details,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == MAX_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Up to `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
