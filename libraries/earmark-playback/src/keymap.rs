//! Key bindings
//!
//! Maps decoded key presses to session commands. Which slots a command may
//! touch depends on the test mode and is checked by the session, not here.

use earmark_core::Key;

/// Seconds moved by an arrow-key seek
pub const SHORT_SEEK_SECS: i64 = 2;

/// Seconds moved by a shifted arrow-key seek
pub const LONG_SEEK_SECS: i64 = 10;

/// A user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start playing a slot
    FlipTo(usize),
    /// Play the previous slot
    FlipPrevious,
    /// Play the next slot
    FlipNext,
    /// Record a slot as this trial's choice
    Choose(usize),
    /// Record the playing slot as this trial's choice
    ChooseCurrent,
    /// Move the cursor by whole seconds
    Seek(i64),
    /// Move the cursor to the loop start
    SeekToStart,
    /// Pause or resume
    TogglePause,
    /// Cycle flip style
    CycleFlipStyle,
    /// Cycle restart mode
    CycleRestartMode,
    /// Loop start = cursor
    SetStart,
    /// Loop start = beginning of sample
    ResetStart,
    /// Loop end = cursor
    SetEnd,
    /// Loop end = end of sample
    ResetEnd,
    /// Withdraw the last recorded choice
    Undo,
    /// Restore the last withdrawn choice
    Redo,
    /// Show or hide the key help
    ToggleKeymap,
    /// End the session
    Quit,
}

/// Command bound to `key`, if any
pub fn command_for(key: Key) -> Option<Command> {
    let cmd = match key {
        Key::Interrupt => Command::Quit,
        Key::Up => Command::FlipPrevious,
        Key::Down => Command::FlipNext,
        Key::Left => Command::Seek(-SHORT_SEEK_SECS),
        Key::Right => Command::Seek(SHORT_SEEK_SECS),
        Key::ShiftLeft => Command::Seek(-LONG_SEEK_SECS),
        Key::ShiftRight => Command::Seek(LONG_SEEK_SECS),
        Key::Backspace => Command::SeekToStart,
        Key::Enter => Command::ChooseCurrent,
        Key::Delete => Command::Undo,
        Key::Insert => Command::Redo,
        Key::Char(c) => match c {
            // '1' is the first slot, '0' the tenth
            '0' => Command::FlipTo(9),
            '1'..='9' => Command::FlipTo(c as usize - '1' as usize),
            'a' => Command::FlipTo(0),
            'b' => Command::FlipTo(1),
            'x' => Command::FlipTo(2),
            'A' | '!' => Command::Choose(0),
            'B' | '@' => Command::Choose(1),
            'X' | '#' => Command::Choose(2),
            ' ' => Command::TogglePause,
            'f' => Command::CycleFlipStyle,
            'r' => Command::CycleRestartMode,
            's' => Command::SetStart,
            'S' => Command::ResetStart,
            'e' => Command::SetEnd,
            'E' => Command::ResetEnd,
            '?' => Command::ToggleKeymap,
            _ => return None,
        },
    };
    Some(cmd)
}

/// Help text shown by `?`
pub const KEYMAP_HELP: &str = "\
  a b x / 1-9 0   play slot              A B X / ! @ #   choose slot
  up / down       previous / next slot   enter           choose playing slot
  left / right    seek 2s                shift+arrows    seek 10s
  backspace       back to loop start     space           pause
  s / S           set / reset start      e / E           set / reset end
  f               cycle flip style       r               cycle restart mode
  delete / insert undo / redo choice     ?               toggle this help
  ctrl-c          quit";
