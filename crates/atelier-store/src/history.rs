//! Linear undo/redo history of one page.
//!
//! Unlike a classic two-stack design the history keeps every entry in one
//! vector with a cursor: entries after the cursor are the redoable ones and
//! are discarded by the next push.

use serde::{Deserialize, Serialize};

/// One immutable `{code, theme}` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub code: String,
    pub theme: String,
}

impl HistoryEntry {
    pub fn new(code: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            theme: theme.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    /// Snapshot taken at creation, restored by `reset` even after trimming.
    origin: HistoryEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl History {
    pub fn new(initial: HistoryEntry) -> Self {
        Self::with_limit(initial, None)
    }

    /// A limit of zero is treated as unbounded.
    pub fn with_limit(initial: HistoryEntry, limit: Option<usize>) -> Self {
        Self {
            entries: vec![initial.clone()],
            cursor: 0,
            origin: initial,
            limit: limit.filter(|limit| *limit > 0),
        }
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn origin(&self) -> &HistoryEntry {
        &self.origin
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Truncate everything after the cursor and append `entry`.
    ///
    /// Returns false when `entry` equals the current snapshot; the redo
    /// branch is still discarded but nothing is appended.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        self.entries.truncate(self.cursor + 1);
        if *self.current() == entry {
            return false;
        }

        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
        self.trim();
        true
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Restore the creation snapshot and drop every later entry.
    /// Returns false when the history already was that single entry.
    pub fn reset(&mut self) -> bool {
        let unchanged = self.entries.len() == 1 && self.entries[0] == self.origin;
        self.entries = vec![self.origin.clone()];
        self.cursor = 0;
        !unchanged
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit.filter(|limit| *limit > 0);
        self.trim();
    }

    /// Enforce the limit without ever dropping the current entry: the
    /// oldest undo entries go first, then the farthest redo entries.
    fn trim(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let excess = self.entries.len().saturating_sub(limit);
        let front = excess.min(self.cursor);
        self.entries.drain(..front);
        self.cursor -= front;
        self.entries.truncate(limit);
    }

    /// Bring a deserialized history back to a consistent shape.
    pub(crate) fn repair(&mut self) {
        if self.entries.is_empty() {
            self.entries.push(self.origin.clone());
        }
        if self.cursor >= self.entries.len() {
            self.cursor = self.entries.len() - 1;
        }
    }
}
