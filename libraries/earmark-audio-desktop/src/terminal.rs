//! Raw-mode terminal key source
//!
//! The input thread blocks in `poll(2)` on standard input and on the read end
//! of a wake pipe. Teardown writes one byte into the pipe, so the blocked
//! call returns promptly instead of racing a cancellation against `read`.

use crate::error::{DesktopError, Result};
use crate::keys::KeyDecoder;
use earmark_core::{InputSource, InputWaker, Key};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use tracing::{debug, warn};

/// How long an unfinished escape sequence waits for its next byte
const ESCAPE_TIMEOUT_MS: libc::c_int = 50;

/// Saved terminal settings, restored on drop
struct RawMode {
    fd: RawFd,
    saved: libc::termios,
}

impl RawMode {
    #[allow(unsafe_code)]
    fn enable(fd: RawFd) -> Result<Self> {
        // SAFETY: termios is plain old data and tcgetattr overwrites it on success
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: `saved` is a valid, writable termios
        if unsafe { libc::tcgetattr(fd, &mut saved) } != 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mut raw = saved;
        // Ctrl-C arrives as a byte rather than SIGINT so the session can end cleanly
        raw.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ISIG | libc::IEXTEN);
        raw.c_iflag &= !(libc::IXON | libc::ICRNL);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        // SAFETY: `raw` is a fully initialised termios copied from the terminal
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(Self { fd, saved })
    }
}

impl Drop for RawMode {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: restores the settings read in `enable` on the same descriptor
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved) } != 0 {
            warn!(
                "Could not restore terminal settings: {}",
                io::Error::last_os_error()
            );
        }
    }
}

/// Non-blocking pipe used to wake the input thread
#[allow(unsafe_code)]
fn wake_pipe() -> Result<(File, File)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    // SAFETY: `fds` has room for the two descriptors pipe writes
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error().into());
    }
    // SAFETY: pipe succeeded, so both descriptors are open and owned by nobody else
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_nonblocking(&read)?;
    set_nonblocking(&write)?;
    Ok((File::from(read), File::from(write)))
}

#[allow(unsafe_code)]
fn set_nonblocking(fd: &OwnedFd) -> Result<()> {
    let fd = fd.as_raw_fd();
    // SAFETY: fcntl on an open descriptor with integer arguments only
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    // SAFETY: as above
    if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

#[allow(unsafe_code)]
fn poll(fds: &mut [libc::pollfd], timeout_ms: libc::c_int) -> io::Result<usize> {
    // SAFETY: the pointer and length describe a live, exclusively borrowed slice
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

#[allow(unsafe_code)]
fn read_fd(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Key source reading the controlling terminal
pub struct TerminalInput {
    input: RawFd,
    _raw: Option<RawMode>,
    decoder: KeyDecoder,
    queue: VecDeque<Key>,
    wake_read: File,
    wake_write: Arc<File>,
}

impl TerminalInput {
    /// Switch standard input to raw mode and read keys from it
    ///
    /// The previous terminal settings come back when the value is dropped.
    pub fn open() -> Result<Self> {
        if !io::stdin().is_terminal() {
            return Err(DesktopError::Terminal(
                "standard input is not a terminal".into(),
            ));
        }
        let raw = RawMode::enable(libc::STDIN_FILENO)?;
        debug!("Terminal switched to raw mode");
        Self::with_input(libc::STDIN_FILENO, Some(raw))
    }

    fn with_input(input: RawFd, raw: Option<RawMode>) -> Result<Self> {
        let (wake_read, wake_write) = wake_pipe()?;
        Ok(Self {
            input,
            _raw: raw,
            decoder: KeyDecoder::new(),
            queue: VecDeque::new(),
            wake_read,
            wake_write: Arc::new(wake_write),
        })
    }

    fn drain_wake_pipe(&mut self) {
        let mut buf = [0u8; 16];
        while matches!(self.wake_read.read(&mut buf), Ok(n) if n > 0) {}
    }

    fn read_input(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        let n = loop {
            match read_fd(self.input, &mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            return Err(DesktopError::Terminal("end of input".into()));
        }
        self.decoder.feed(&buf[..n], &mut self.queue);
        Ok(())
    }
}

impl InputSource for TerminalInput {
    fn next_key(&mut self) -> earmark_core::Result<Option<Key>> {
        loop {
            if let Some(key) = self.queue.pop_front() {
                return Ok(Some(key));
            }

            let timeout = if self.decoder.is_pending() {
                ESCAPE_TIMEOUT_MS
            } else {
                -1
            };
            let mut fds = [
                libc::pollfd {
                    fd: self.input,
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.wake_read.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];

            match poll(&mut fds, timeout) {
                // a bare Escape press: nothing followed it
                Ok(0) => {
                    self.decoder.reset();
                    continue;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DesktopError::from(e).into()),
            }

            if fds[1].revents != 0 {
                self.drain_wake_pipe();
                return Ok(None);
            }
            if fds[0].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
                self.read_input()?;
            }
        }
    }

    fn waker(&self) -> InputWaker {
        let pipe = Arc::clone(&self.wake_write);
        InputWaker::new(move || {
            // a full pipe already guarantees a wake-up
            let _ = (&*pipe).write_all(&[1]);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ===== Helpers =====

    /// Key source reading from a pipe instead of the terminal
    fn piped() -> (File, File, TerminalInput) {
        let (read, write) = wake_pipe().unwrap();
        let input = TerminalInput::with_input(read.as_raw_fd(), None).unwrap();
        (read, write, input)
    }

    // ===== Tests =====

    #[test]
    fn keys_are_read_in_order() {
        let (_read, mut write, mut input) = piped();
        write.write_all(b"a\x1b[C\r").unwrap();

        assert_eq!(input.next_key().unwrap(), Some(Key::Char('a')));
        assert_eq!(input.next_key().unwrap(), Some(Key::Right));
        assert_eq!(input.next_key().unwrap(), Some(Key::Enter));
    }

    #[test]
    fn waker_interrupts_blocked_read() {
        let (_read, _write, mut input) = piped();
        let waker = input.waker();

        let reader = std::thread::spawn(move || input.next_key().unwrap());
        std::thread::sleep(Duration::from_millis(20));
        waker.wake();

        assert_eq!(reader.join().unwrap(), None);
    }

    #[test]
    fn closed_input_is_a_terminal_error() {
        let (_read, write, mut input) = piped();
        drop(write);

        let err = input.next_key().unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn lone_escape_is_discarded_after_timeout() {
        let (_read, mut write, mut input) = piped();
        write.write_all(&[0x1b]).unwrap();

        let reader = std::thread::spawn(move || {
            let key = input.next_key().unwrap();
            (key, input)
        });
        std::thread::sleep(Duration::from_millis(200));
        write.write_all(b"[A").unwrap();

        let (key, _input) = reader.join().unwrap();
        assert_eq!(key, Some(Key::Char('[')));
    }
}
