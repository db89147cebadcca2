//! Terminal byte stream to [`Key`] decoding
//!
//! Handles the single-byte controls and the CSI/SS3 escape sequences that
//! xterm-compatible terminals send for arrows, Delete and Insert. Escape
//! sequences may arrive split across reads; the decoder holds the partial
//! sequence until the rest comes in.

use earmark_core::Key;
use std::collections::VecDeque;

const ESC: u8 = 0x1b;

/// Longest escape sequence kept before it is discarded as garbage
const MAX_SEQUENCE: usize = 8;

/// Stateful decoder for raw terminal input
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

enum Sequence {
    Incomplete,
    Complete(Key),
    Unknown,
    /// Escape followed by something that does not start a sequence
    NotEscape,
}

impl KeyDecoder {
    /// Decoder with nothing buffered
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partial escape sequence is waiting for more bytes
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop a partial escape sequence, e.g. after a lone Escape press
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Decode `bytes`, appending complete keys to `out`
    pub fn feed(&mut self, bytes: &[u8], out: &mut VecDeque<Key>) {
        for &byte in bytes {
            self.push(byte, out);
        }
    }

    fn push(&mut self, byte: u8, out: &mut VecDeque<Key>) {
        if self.pending.is_empty() {
            if byte == ESC {
                self.pending.push(byte);
            } else if let Some(key) = single(byte) {
                out.push_back(key);
            }
            return;
        }

        self.pending.push(byte);
        match sequence(&self.pending) {
            Sequence::Incomplete => {}
            Sequence::Complete(key) => {
                self.pending.clear();
                out.push_back(key);
            }
            Sequence::Unknown => self.pending.clear(),
            Sequence::NotEscape => {
                self.pending.clear();
                self.push(byte, out);
            }
        }
    }
}

fn single(byte: u8) -> Option<Key> {
    match byte {
        0x03 => Some(Key::Interrupt),
        b'\r' | b'\n' => Some(Key::Enter),
        0x7f | 0x08 => Some(Key::Backspace),
        0x20..=0x7e => Some(Key::Char(char::from(byte))),
        _ => None,
    }
}

/// Classify `seq`, which starts with ESC and holds at least two bytes
fn sequence(seq: &[u8]) -> Sequence {
    if !matches!(seq[1], b'[' | b'O') {
        return Sequence::NotEscape;
    }
    let Some((&last, params)) = seq[2..].split_last() else {
        return Sequence::Incomplete;
    };

    // parameter and intermediate bytes until a final byte arrives
    if !(0x40..=0x7e).contains(&last) {
        return if (0x20..=0x3f).contains(&last) && seq.len() < MAX_SEQUENCE {
            Sequence::Incomplete
        } else {
            Sequence::Unknown
        };
    }

    let key = match (params, last) {
        (b"" | b"1;2", b'A') => Key::Up,
        (b"" | b"1;2", b'B') => Key::Down,
        (b"", b'C') => Key::Right,
        (b"", b'D') => Key::Left,
        // xterm modifier 2 is Shift; rxvt sends lowercase finals instead
        (b"1;2", b'C') | (b"", b'c') => Key::ShiftRight,
        (b"1;2", b'D') | (b"", b'd') => Key::ShiftLeft,
        (b"3", b'~') => Key::Delete,
        (b"2", b'~') => Key::Insert,
        _ => return Sequence::Unknown,
    };
    Sequence::Complete(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(bytes: &[u8]) -> Vec<Key> {
        let mut decoder = KeyDecoder::new();
        let mut out = VecDeque::new();
        decoder.feed(bytes, &mut out);
        out.into_iter().collect()
    }

    #[test]
    fn printable_characters_pass_through() {
        assert_eq!(
            decode(b"aB1 ?"),
            vec![
                Key::Char('a'),
                Key::Char('B'),
                Key::Char('1'),
                Key::Char(' '),
                Key::Char('?')
            ]
        );
    }

    #[test]
    fn control_bytes() {
        assert_eq!(decode(b"\r"), vec![Key::Enter]);
        assert_eq!(decode(b"\n"), vec![Key::Enter]);
        assert_eq!(decode(&[0x7f, 0x08]), vec![Key::Backspace, Key::Backspace]);
        assert_eq!(decode(&[0x03]), vec![Key::Interrupt]);
        assert!(decode(&[0x01, 0x1f]).is_empty());
    }

    #[test]
    fn arrows_in_both_cursor_modes() {
        assert_eq!(
            decode(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
        assert_eq!(decode(b"\x1bOC\x1bOD"), vec![Key::Right, Key::Left]);
    }

    #[test]
    fn shifted_arrows() {
        assert_eq!(
            decode(b"\x1b[1;2C\x1b[1;2D"),
            vec![Key::ShiftRight, Key::ShiftLeft]
        );
        assert_eq!(decode(b"\x1b[c\x1b[d"), vec![Key::ShiftRight, Key::ShiftLeft]);
    }

    #[test]
    fn delete_and_insert() {
        assert_eq!(decode(b"\x1b[3~\x1b[2~"), vec![Key::Delete, Key::Insert]);
    }

    #[test]
    fn sequence_split_across_reads() {
        let mut decoder = KeyDecoder::new();
        let mut out = VecDeque::new();

        decoder.feed(b"\x1b[1", &mut out);
        assert!(out.is_empty());
        assert!(decoder.is_pending());

        decoder.feed(b";2", &mut out);
        decoder.feed(b"Cx", &mut out);
        assert_eq!(out, [Key::ShiftRight, Key::Char('x')]);
        assert!(!decoder.is_pending());
    }

    #[test]
    fn unknown_sequences_are_dropped() {
        // F1 and Page Up
        assert_eq!(decode(b"\x1bOP\x1b[5~a"), vec![Key::Char('a')]);
    }

    #[test]
    fn escape_then_letter_yields_the_letter() {
        assert_eq!(decode(b"\x1bq"), vec![Key::Char('q')]);
        assert_eq!(decode(b"\x1b\x1b[A"), vec![Key::Up]);
    }

    #[test]
    fn reset_discards_lone_escape() {
        let mut decoder = KeyDecoder::new();
        let mut out = VecDeque::new();
        decoder.feed(&[ESC], &mut out);
        assert!(decoder.is_pending());
        decoder.reset();
        decoder.feed(b"[A", &mut out);
        assert_eq!(out, [Key::Char('['), Key::Char('A')]);
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_grow_the_buffer(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..16)) {
            let mut decoder = KeyDecoder::new();
            let mut out = VecDeque::new();
            for chunk in &chunks {
                decoder.feed(chunk, &mut out);
                prop_assert!(decoder.pending.len() < MAX_SEQUENCE);
            }
        }
    }
}
