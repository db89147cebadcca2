/// One-line session status on stderr
use earmark_playback::{format_time, SessionStatus, KEYMAP_HELP};
use std::io::{self, Write};

/// Render `status` as a single line
pub fn format_status(status: &SessionStatus) -> String {
    let mut line = format!(
        "{} | playing {}{} | {} [{} - {}]",
        status.mode,
        status.playing_label,
        if status.paused { " (paused)" } else { "" },
        format_time(status.position_secs),
        format_time(status.start_secs),
        format_time(status.end_secs),
    );
    if status.mode.records_choices() {
        line.push_str(&format!(
            " | trial {}/{}",
            (status.trials_done + 1).min(status.trials_total),
            status.trials_total
        ));
    }
    if let Some(correct) = status.correct {
        line.push_str(&format!(" | score {correct}/{}", status.trials_done));
    }
    line.push_str(&format!(
        " | flip {} | restart {} | ? for keys",
        status.flip_style, status.restart
    ));
    line
}

/// Redraws the status line in place
pub struct StatusLine<W: Write> {
    out: W,
    last: Option<SessionStatus>,
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Redraw if anything visible changed
    pub fn update(&mut self, status: &SessionStatus) -> io::Result<()> {
        if self.last.as_ref() == Some(status) {
            return Ok(());
        }
        let keymap_opened =
            status.show_keymap && !self.last.as_ref().is_some_and(|s| s.show_keymap);

        if keymap_opened {
            write!(self.out, "\r\x1b[K")?;
            for line in KEYMAP_HELP.lines() {
                write!(self.out, "{line}\r\n")?;
            }
        }
        write!(self.out, "\r\x1b[K{}", format_status(status))?;
        self.out.flush()?;
        self.last = Some(status.clone());
        Ok(())
    }

    /// Move past the status line so later output starts on a fresh line
    pub fn finish(&mut self) -> io::Result<()> {
        if self.last.take().is_some() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}
