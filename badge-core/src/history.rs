//! Bounded undo/redo history of document snapshots.
//!
//! Every mutation records the document as it was *before* the change. The
//! stack and cursor work like this:
//!
//! ```text
//! record:  [S0 S1 S2] cursor=3      live state S3 is not on the stack
//! undo:    [S0 S1 S2 S3] cursor=2   live S3 pushed as redo tip, S2 restored
//! redo:    [S0 S1 S2 S3] cursor=3   S3 restored
//! record:  [S0 S1 S2 S3'] cursor=4  redo branch truncated
//! ```
//!
//! When `cursor < len`, `stack[cursor]` equals the live document.

use crate::document::DocumentSnapshot;

/// Default number of recorded states kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Undo/redo stack with a re-entrancy guard.
#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<DocumentSnapshot>,
    cursor: usize,
    replaying: bool,
    limit: usize,
}

impl History {
    /// Create an empty history holding at most `limit` recorded states.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            stack: Vec::new(),
            cursor: 0,
            replaying: false,
            limit: limit.max(1),
        }
    }

    /// Record a pre-mutation snapshot.
    ///
    /// Ignored while a restore is being replayed. Discards any redo branch and
    /// evicts the oldest entry once the limit is exceeded.
    pub fn record(&mut self, snapshot: DocumentSnapshot) -> bool {
        if self.replaying {
            tracing::trace!("Ignoring history record during replay");
            return false;
        }
        self.stack.truncate(self.cursor);
        self.stack.push(snapshot);
        self.cursor = self.stack.len();

        while self.stack.len() > self.limit {
            self.stack.remove(0);
            self.cursor -= 1;
            tracing::trace!(limit = self.limit, "Evicted oldest history entry");
        }
        true
    }

    /// Step back one state.
    ///
    /// `live` is the current document; it becomes the redo tip when the live
    /// state has not been recorded yet. Returns the snapshot to restore and
    /// enters replay mode until [`History::finish_replay`] is called.
    pub fn undo(&mut self, live: DocumentSnapshot) -> Option<DocumentSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor == self.stack.len() {
            self.stack.push(live);
        }
        self.cursor -= 1;
        self.replaying = true;
        Some(self.stack[self.cursor].clone())
    }

    /// Step forward one state. Enters replay mode like [`History::undo`].
    pub fn redo(&mut self) -> Option<DocumentSnapshot> {
        if self.cursor + 1 >= self.stack.len() {
            return None;
        }
        self.cursor += 1;
        self.replaying = true;
        Some(self.stack[self.cursor].clone())
    }

    /// Leave replay mode once the restored state has settled.
    pub fn finish_replay(&mut self) {
        self.replaying = false;
    }

    /// Whether a restore is in progress.
    #[must_use]
    pub const fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Whether there is a state to step back to.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether there is a state to step forward to.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Current cursor position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drop all history, e.g. after the document has been persisted.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.cursor = 0;
        self.replaying = false;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PosterData;

    fn snap(width: f64) -> DocumentSnapshot {
        DocumentSnapshot {
            elements: Vec::new(),
            poster: PosterData::new(width, 10.0),
        }
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(snap(1.0)).is_none());
        assert!(history.redo().is_none());
        assert!(!history.is_replaying());
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = History::default();
        history.record(snap(1.0));
        history.record(snap(2.0));

        let restored = history.undo(snap(3.0)).expect("undo");
        history.finish_replay();
        assert_eq!(restored, snap(2.0));
        assert_eq!(history.len(), 3);

        let restored = history.undo(snap(2.0)).expect("undo");
        history.finish_replay();
        assert_eq!(restored, snap(1.0));
        assert!(!history.can_undo());

        assert_eq!(history.redo().expect("redo"), snap(2.0));
        history.finish_replay();
        assert_eq!(history.redo().expect("redo"), snap(3.0));
        history.finish_replay();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_truncates_redo_branch() {
        let mut history = History::default();
        history.record(snap(1.0));
        history.undo(snap(2.0));
        history.finish_replay();
        assert!(history.can_redo());

        history.record(snap(1.0));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_record_ignored_during_replay() {
        let mut history = History::default();
        history.record(snap(1.0));
        history.undo(snap(2.0));
        assert!(history.is_replaying());
        assert!(!history.record(snap(9.0)));
        history.finish_replay();
        assert_eq!(history.len(), 2);
        assert!(history.record(snap(9.0)));
    }

    #[test]
    fn test_bounded_to_limit() {
        let mut history = History::default();
        for i in 0..60 {
            history.record(snap(f64::from(i)));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.cursor(), DEFAULT_HISTORY_LIMIT);

        // Oldest 10 evicted.
        let mut last = None;
        while let Some(s) = history.undo(snap(60.0)) {
            history.finish_replay();
            last = Some(s);
        }
        assert_eq!(last, Some(snap(10.0)));
    }

    #[test]
    fn test_clear() {
        let mut history = History::default();
        history.record(snap(1.0));
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_undo());
    }
}
