//! Undo/redo command history.
//!
//! A linear stack of reversible edits with a cursor. Each command carries
//! both its before and after value, so undo restores state directly instead
//! of replaying the whole edit sequence from the original image. Live
//! slider/drag updates never enter the stack — editors push only the
//! committed value (see the live vs. commit setters on
//! [`crate::editor::Workbench`]).

use crate::transform::{CanvasStyle, EffectKind, FilterPreset, Transform};

// ============================================================================
// EditCommand
// ============================================================================

/// One committed, reversible edit.
///
/// Consumers match exhaustively and apply either the `after` (redo) or
/// `before` (undo) side; see `PhotoParams::apply`/`revert` in the editor
/// module.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    SetTransform { before: Transform, after: Transform },
    SetEffect { kind: EffectKind, before: f32, after: f32 },
    SetFilter { before: FilterPreset, after: FilterPreset },
    SetStyle { before: CanvasStyle, after: CanvasStyle },
    SetCopies { before: u32, after: u32 },
}

// ============================================================================
// EditHistory
// ============================================================================

/// Linear undo/redo stack with a cursor.
///
/// `cursor` counts the commands currently applied; pushing while undone
/// truncates the redo tail. No depth limit — a session is short-lived and
/// the whole stack is discarded on navigation or image change.
#[derive(Debug, Default)]
pub struct EditHistory {
    commands: Vec<EditCommand>,
    cursor: usize,
}

impl EditHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed edit whose forward action the caller has already
    /// applied. Any undone commands beyond the cursor are discarded.
    pub fn push(&mut self, command: EditCommand) {
        self.commands.truncate(self.cursor);
        self.commands.push(command);
        self.cursor += 1;
    }

    /// Steps the cursor back and returns the command to revert, if any.
    pub fn undo(&mut self) -> Option<&EditCommand> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.commands.get(self.cursor)
    }

    /// Steps the cursor forward and returns the command to re-apply, if any.
    pub fn redo(&mut self) -> Option<&EditCommand> {
        if self.cursor >= self.commands.len() {
            return None;
        }
        let command = self.commands.get(self.cursor);
        self.cursor += 1;
        command
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    /// Number of commands currently applied.
    pub fn applied(&self) -> usize {
        self.cursor
    }

    /// Total recorded commands, including undone ones.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops everything. Called when a new image is loaded — there is no
    /// cross-image undo.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn copies(before: u32, after: u32) -> EditCommand {
        EditCommand::SetCopies { before, after }
    }

    #[test]
    fn empty_history_has_nothing_to_do() {
        let mut history = EditHistory::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn undo_then_redo_walks_the_cursor() {
        let mut history = EditHistory::new();
        history.push(copies(1, 2));
        history.push(copies(2, 3));

        assert_eq!(history.undo(), Some(&copies(2, 3)));
        assert_eq!(history.undo(), Some(&copies(1, 2)));
        assert!(history.undo().is_none());

        assert_eq!(history.redo(), Some(&copies(1, 2)));
        assert_eq!(history.redo(), Some(&copies(2, 3)));
        assert!(history.redo().is_none());
    }

    #[test]
    fn push_truncates_redo_tail() {
        let mut history = EditHistory::new();
        history.push(copies(1, 2));
        history.push(copies(2, 3));
        history.undo();

        history.push(copies(2, 5));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(&copies(2, 5)));
    }

    #[test]
    fn clear_discards_everything() {
        let mut history = EditHistory::new();
        history.push(copies(1, 2));
        history.clear();

        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
