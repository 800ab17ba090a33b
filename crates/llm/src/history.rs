//! In-process record of past analyses
//!
//! Retention is a ring buffer: once `capacity` entries are held the oldest
//! one is evicted on append. A capacity of 0 keeps everything.

use std::collections::{HashSet, VecDeque};

use crate::types::{ContextSummary, HistoryEntry};

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    /// 0 = unbounded
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append, evicting the oldest entry when full; returns the evicted entry
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let evicted = if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Entry count, sentiment distribution, most recent timestamp
    pub fn summary(&self) -> ContextSummary {
        let mut summary = ContextSummary {
            total_entries: self.entries.len(),
            last_analyzed: self.entries.back().map(|e| e.result.timestamp),
            ..ContextSummary::default()
        };
        for entry in &self.entries {
            *summary.sentiments.entry(entry.result.sentiment).or_insert(0) += 1;
        }
        summary
    }

    /// Entries sharing words with `query`, most overlap first
    ///
    /// Entries without any shared word are left out; equal overlaps keep
    /// insertion order.
    pub fn similar(&self, query: &str, limit: usize) -> Vec<HistoryEntry> {
        let query_words = word_set(query);
        if query_words.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &HistoryEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let overlap = word_set(&entry.text).intersection(&query_words).count();
                (overlap > 0).then_some((overlap, entry))
            })
            .collect();

        // stable: ties stay in insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

/// Case-folded, whitespace-separated distinct words
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
