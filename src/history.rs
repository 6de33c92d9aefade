//! Reversible-action history for undo/redo.
//!
//! Every recorded action is self-inverting: invoking it applies its captured
//! payload to the target and returns the action that reverses that effect.
//! One mechanism serves both directions - `undo` invokes the top of the undo
//! stack and pushes the returned inverse on the redo stack, and `redo` does
//! the same with the stacks swapped.

use log::debug;

/// A self-inverting unit of change.
///
/// `invoke` mutates the target back to the captured snapshot and returns the
/// inverse action, recapturing whatever live state it needs at invoke time.
/// An action never has to know in advance how many times it will be
/// inverted.
pub trait Reversible {
    /// State the action applies to
    type Target;

    /// Apply the action and return its inverse
    fn invoke(self, target: &mut Self::Target) -> Self;
}

struct Entry<A> {
    description: String,
    action: A,
}

/// Undo and redo stacks of reversible actions
pub struct History<A: Reversible> {
    undo: Vec<Entry<A>>,
    redo: Vec<Entry<A>>,
}

impl<A: Reversible> History<A> {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record a committed modification.
    ///
    /// `action` must already be the inverse of the mutation being recorded.
    /// Any new edit invalidates forward history, so the redo stack is
    /// cleared.
    pub fn record(&mut self, description: impl Into<String>, action: A) {
        self.undo.push(Entry {
            description: description.into(),
            action,
        });
        self.redo.clear();
    }

    /// Revert the most recent modification.
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self, target: &mut A::Target) -> bool {
        let Some(entry) = self.undo.pop() else {
            debug!("undo requested with empty history");
            return false;
        };
        let inverse = entry.action.invoke(target);
        self.redo.push(Entry {
            description: entry.description,
            action: inverse,
        });
        true
    }

    /// Re-apply the most recently undone modification.
    ///
    /// Returns false when there is nothing to redo.
    pub fn redo(&mut self, target: &mut A::Target) -> bool {
        let Some(entry) = self.redo.pop() else {
            debug!("redo requested with empty history");
            return false;
        };
        let inverse = entry.action.invoke(target);
        self.undo.push(Entry {
            description: entry.description,
            action: inverse,
        });
        true
    }

    /// Drop both stacks
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Whether an undo step is available
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Display description of the modification `undo` would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.last().map(|e| e.description.as_str())
    }

    /// Display description of the modification `redo` would re-apply
    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().map(|e| e.description.as_str())
    }
}

impl<A: Reversible> Default for History<A> {
    fn default() -> Self {
        Self::new()
    }
}
