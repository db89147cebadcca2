/// Decoded keyboard events
use serde::{Deserialize, Serialize};

/// A single key press delivered to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Printable character
    Char(char),
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
    /// Shift + arrow left
    ShiftLeft,
    /// Shift + arrow right
    ShiftRight,
    /// Return / Enter
    Enter,
    /// Backspace
    Backspace,
    /// Delete
    Delete,
    /// Insert
    Insert,
    /// Ctrl-C
    Interrupt,
}
