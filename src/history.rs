// src/history.rs
//! Bounded, most-recent-first in-memory history of completed analyses.
//! Insertion at head plus eviction at tail is one step under the lock, so
//! readers never observe a partially updated list.

use std::sync::Mutex;

use crate::analysis::Analysis;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug)]
pub struct RecentAnalyses {
    inner: Mutex<Vec<Analysis>>,
    cap: usize,
}

impl Default for RecentAnalyses {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentAnalyses {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    /// Insert at the head; the oldest entry falls off the tail on overflow.
    pub fn insert(&self, analysis: Analysis) {
        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.insert(0, analysis);
        v.truncate(self.cap);
    }

    /// Current contents, head-first (most recent first).
    pub fn snapshot(&self) -> Vec<Analysis> {
        self.inner.lock().expect("history mutex poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
