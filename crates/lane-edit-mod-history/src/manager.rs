/// Core undo/redo manager over whole-value snapshots.
///
/// Each committed state is stored as an independent value. Undo moves the
/// current state onto the redo stack and exposes the previous one; redo
/// moves it back. Snapshots are full copies, so memory grows linearly with
/// the number of edits times the size of the value.

/// Manages undo/redo history for a single edited value.
///
/// The current state is always present, which makes the "never empty"
/// guarantee structural: there is no way to pop the last snapshot.
#[derive(Clone)]
pub struct SnapshotHistory<T> {
    /// Committed states older than `current`, ordered oldest first.
    past: Vec<T>,
    /// The most recent committed state (top of the history).
    current: T,
    /// Undone states, with the most-recently-undone on top.
    redo_stack: Vec<T>,
}

impl<T> std::fmt::Debug for SnapshotHistory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotHistory")
            .field("depth", &self.depth())
            .field("redo_len", &self.redo_stack.len())
            .finish()
    }
}

impl<T> SnapshotHistory<T> {
    /// Creates a history holding only `baseline`.
    pub fn new(baseline: T) -> Self {
        Self {
            past: Vec::new(),
            current: baseline,
            redo_stack: Vec::new(),
        }
    }

    /// Returns the current (top) state.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Commits a new state on top of the history.
    ///
    /// Clears the redo stack: a fresh edit invalidates undone states.
    pub fn push(&mut self, state: T) {
        let previous = std::mem::replace(&mut self.current, state);
        self.past.push(previous);
        self.redo_stack.clear();
    }

    /// Undoes the most recent state.
    ///
    /// Returns the state that is current afterwards, or `None` if only the
    /// baseline is left.
    pub fn undo(&mut self) -> Option<&T> {
        let previous = self.past.pop()?;
        let undone = std::mem::replace(&mut self.current, previous);
        self.redo_stack.push(undone);
        Some(&self.current)
    }

    /// Redoes the most recently undone state.
    ///
    /// Returns the state that is current afterwards, or `None` if there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Option<&T> {
        let next = self.redo_stack.pop()?;
        let previous = std::mem::replace(&mut self.current, next);
        self.past.push(previous);
        Some(&self.current)
    }

    /// Whether undo is available (a state older than the current one exists).
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of states in the history, including the current one. Always >= 1.
    pub fn depth(&self) -> usize {
        self.past.len() + 1
    }

    /// Number of states waiting on the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drops all history and redo states, keeping only a new baseline.
    pub fn reset(&mut self, baseline: T) {
        self.past.clear();
        self.redo_stack.clear();
        self.current = baseline;
        tracing::debug!("History reset to a fresh baseline");
    }
}

impl<T: Default> Default for SnapshotHistory<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
