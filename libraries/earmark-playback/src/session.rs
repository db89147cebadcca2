//! Listening session state machine
//!
//! The session owns the prepared samples, the trial state and the play
//! cursor. Commands are queued as pending actions and applied when the next
//! fragment is rendered, so a flip, a recorded choice, a seek or a pause is
//! heard as a one-fragment transition. The session never blocks; threading
//! lives in the coordinator.

use crate::error::{PlaybackError, Result};
use crate::fragment::{fill_fragment, Cursor, FillMode, LoopRegion};
use crate::keymap::{command_for, Command};
use crate::report::{SessionStats, TrialReport};
use crate::transition::{blend_transition, fade, FlipStyle, Transition};
use crate::trial::{Assignment, TestMode, TrialHistory, TrialRecord, MAX_CASUAL_SAMPLES};
use earmark_audio::{TransitionWindows, MIN_FRAGMENTS};
use earmark_core::{fragment_frames, Key, Sample};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// When the cursor jumps back to the loop start on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    /// Never
    #[default]
    None,
    /// After every recorded choice
    AfterTrial,
    /// After every recorded choice and every flip
    EveryFlip,
}

impl RestartMode {
    /// Next mode in the cycle; casual sessions record no choices and skip
    /// `AfterTrial`
    pub fn next(self, mode: TestMode) -> Self {
        match self {
            Self::None if mode.records_choices() => Self::AfterTrial,
            Self::None | Self::AfterTrial => Self::EveryFlip,
            Self::EveryFlip => Self::None,
        }
    }
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::AfterTrial => "after trial",
            Self::EveryFlip => "every flip",
        })
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Kind of test
    pub mode: TestMode,
    /// Choices to record before the session ends
    pub trials: usize,
    /// Initial flip style
    pub flip_style: FlipStyle,
    /// Initial restart mode
    pub restart: RestartMode,
    /// Initial loop start in seconds
    pub start_secs: f64,
    /// Initial loop end in seconds; `None` is the end of the samples
    pub end_secs: Option<f64>,
    /// Show the score while the test runs (disables undo and redo)
    pub running_score: bool,
    /// Seed for slot randomization; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: TestMode::Casual,
            trials: 10,
            flip_style: FlipStyle::Seamless,
            restart: RestartMode::None,
            start_secs: 0.0,
            end_secs: None,
            running_score: false,
            seed: None,
        }
    }
}

/// Result of rendering one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The fragment buffer holds audio to play
    Ready,
    /// The session is over; nothing was rendered
    Finished,
}

/// Snapshot for the status display
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Test mode
    pub mode: TestMode,
    /// Slot currently audible
    pub playing_slot: usize,
    /// Label of that slot
    pub playing_label: String,
    /// Play position in seconds
    pub position_secs: f64,
    /// Loop start in seconds
    pub start_secs: f64,
    /// Loop end in seconds
    pub end_secs: f64,
    /// Sample length in seconds
    pub length_secs: f64,
    /// Playback is paused
    pub paused: bool,
    /// Current flip style
    pub flip_style: FlipStyle,
    /// Current restart mode
    pub restart: RestartMode,
    /// Choices recorded
    pub trials_done: usize,
    /// Choices the session asks for
    pub trials_total: usize,
    /// Correct choices so far, only with running score enabled
    pub correct: Option<usize>,
    /// Key help is visible
    pub show_keymap: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Pending {
    flip: Option<usize>,
    select: Option<usize>,
    pause: bool,
    seek: Option<i64>,
}

/// One listening session over prepared samples
///
/// All samples share format, layout and length, and span at least
/// [`MIN_FRAGMENTS`] fragments.
#[derive(Debug)]
pub struct Session {
    samples: Vec<Sample>,
    windows: TransitionWindows,
    mode: TestMode,
    trials: usize,
    flip_style: FlipStyle,
    restart: RestartMode,
    running_score: bool,
    rng: StdRng,
    assignment: Assignment,
    history: TrialHistory,
    current_slot: usize,
    current_sample: usize,
    cursor: Cursor,
    markers: LoopRegion,
    paused: bool,
    resume_on_schedule: bool,
    pending: Pending,
    scratch: Vec<u8>,
    stats: SessionStats,
    show_keymap: bool,
    finished: bool,
}

impl Session {
    /// Start a session
    ///
    /// # Errors
    /// - [`PlaybackError::NoSamples`] for an empty sample list
    /// - [`PlaybackError::InvalidSession`] if the sample count does not fit
    ///   the mode, the samples differ in format, layout or length, a sample
    ///   is shorter than three fragments, or the loop markers are empty
    pub fn new(samples: Vec<Sample>, windows: TransitionWindows, options: SessionOptions) -> Result<Self> {
        let first = samples.first().ok_or(PlaybackError::NoSamples)?;
        let mode = options.mode;

        match mode {
            TestMode::Casual if samples.len() > MAX_CASUAL_SAMPLES => {
                return Err(PlaybackError::InvalidSession(format!(
                    "casual mode takes at most {MAX_CASUAL_SAMPLES} samples, got {}",
                    samples.len()
                )));
            }
            TestMode::Ab | TestMode::Abx | TestMode::Xxy if samples.len() != 2 => {
                return Err(PlaybackError::InvalidSession(format!(
                    "{mode} test needs exactly two samples, got {}",
                    samples.len()
                )));
            }
            _ => {}
        }
        if options.trials == 0 {
            return Err(PlaybackError::InvalidSession("trial count must be at least 1".into()));
        }

        for other in &samples[1..] {
            if other.format() != first.format()
                || other.layout() != first.layout()
                || other.data().len() != first.data().len()
            {
                return Err(PlaybackError::InvalidSession(format!(
                    "{} and {} were not prepared to the same shape",
                    first.name(),
                    other.name()
                )));
            }
        }

        let rate = first.rate();
        let bpf = first.bytes_per_frame();
        let frames = fragment_frames(rate);
        if windows.frames() != frames {
            return Err(PlaybackError::InvalidSession(format!(
                "transition windows are {} frames, fragments are {frames}",
                windows.frames()
            )));
        }
        let fragment = frames * bpf;
        let size = first.data().len();
        if size < MIN_FRAGMENTS * fragment {
            return Err(PlaybackError::InvalidSession(format!(
                "{} is shorter than {MIN_FRAGMENTS} fragments",
                first.name()
            )));
        }

        let to_bytes = |secs: f64| (secs.max(0.0) * f64::from(rate)).round() as usize * bpf;
        let start = to_bytes(options.start_secs).min(size - fragment);
        let end = options.end_secs.map_or(size, to_bytes).clamp(fragment, size);
        if end <= start {
            return Err(PlaybackError::InvalidSession(format!(
                "loop end ({:.2}s) is not after loop start ({:.2}s)",
                (end / bpf) as f64 / f64::from(rate),
                (start / bpf) as f64 / f64::from(rate)
            )));
        }

        let mut scratch = Vec::new();
        scratch.try_reserve_exact(fragment)?;
        scratch.resize(fragment, 0);

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let assignment = Assignment::draw(mode, samples.len(), &mut rng);
        let current_sample = assignment.sample(0).unwrap_or(0);

        tracing::info!(
            "Starting {} session over {} samples ({} trials)",
            mode,
            samples.len(),
            options.trials
        );

        Ok(Self {
            samples,
            windows,
            mode,
            trials: options.trials,
            flip_style: options.flip_style,
            restart: options.restart,
            running_score: options.running_score,
            rng,
            assignment,
            history: TrialHistory::new(),
            current_slot: 0,
            current_sample,
            cursor: Cursor::at(start),
            markers: LoopRegion { start, end },
            paused: false,
            resume_on_schedule: false,
            pending: Pending::default(),
            scratch,
            stats: SessionStats::default(),
            show_keymap: false,
            finished: false,
        })
    }

    /// Bytes in one rendered fragment
    pub fn fragment_bytes(&self) -> usize {
        self.scratch.len()
    }

    /// Whether a new key may be handled now
    ///
    /// A queued flip, choice or pause blocks further input until the next
    /// fragment applies it. Seeks accumulate.
    pub fn accepts_input(&self) -> bool {
        self.pending.flip.is_none() && self.pending.select.is_none() && !self.pending.pause
    }

    /// Whether the session is over
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether every requested choice has been recorded
    pub fn trials_complete(&self) -> bool {
        self.mode.records_choices() && self.history.len() >= self.trials
    }

    /// Translate a key press and apply it
    pub fn handle_key(&mut self, key: Key) {
        if let Some(command) = command_for(key) {
            self.apply(command);
        }
    }

    /// Apply a command
    ///
    /// Commands that make no sense in the current mode or state are ignored.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Quit => {
                tracing::info!("Session stopped by user");
                self.finished = true;
            }
            Command::FlipTo(slot) => self.request_flip(slot),
            Command::FlipPrevious => {
                if self.current_slot > 0 {
                    self.request_flip(self.current_slot - 1);
                }
            }
            Command::FlipNext => self.request_flip(self.current_slot + 1),
            Command::Choose(slot) => self.request_select(slot),
            Command::ChooseCurrent => self.request_select(self.current_slot),
            Command::Seek(secs) => {
                let bytes = secs * i64::from(self.rate()) * self.bytes_per_frame() as i64;
                self.pending.seek = Some(self.pending.seek.unwrap_or(0) + bytes);
                self.stats.seeks += 1;
            }
            Command::SeekToStart => {
                let start = self.region().start as i64;
                self.pending.seek = Some(start - self.cursor.position as i64);
                self.stats.seeks += 1;
            }
            Command::TogglePause => self.pending.pause = true,
            Command::CycleFlipStyle => self.flip_style = self.flip_style.next(),
            Command::CycleRestartMode => self.restart = self.restart.next(self.mode),
            Command::SetStart => {
                if self.cursor.position < self.markers.end {
                    self.markers.start = self.cursor.position;
                }
            }
            Command::ResetStart => self.markers.start = 0,
            Command::SetEnd => {
                if self.cursor.position > self.markers.start {
                    self.markers.end = self.cursor.position;
                }
            }
            Command::ResetEnd => self.markers.end = self.size(),
            Command::Undo => {
                if !self.running_score && self.history.undo() {
                    self.stats.undos += 1;
                }
            }
            Command::Redo => {
                if !self.running_score && self.history.redo() {
                    self.stats.redos += 1;
                }
            }
            Command::ToggleKeymap => self.show_keymap = !self.show_keymap,
        }
    }

    fn request_flip(&mut self, slot: usize) {
        if slot != self.current_slot && slot < self.mode.slots(self.samples.len()) {
            self.pending.flip = Some(slot);
        }
    }

    fn request_select(&mut self, slot: usize) {
        if self.mode.selectable(slot) {
            self.pending.select = Some(slot);
        }
    }

    /// Render the next fragment into `out`, applying pending actions
    ///
    /// # Errors
    /// Returns [`PlaybackError::CursorOverrun`] if cursor bookkeeping broke,
    /// or [`PlaybackError::InvalidSession`] if `out` is not one fragment long.
    pub fn render(&mut self, out: &mut [u8]) -> Result<RenderOutcome> {
        if self.finished {
            return Ok(RenderOutcome::Finished);
        }
        let saved = self.cursor;
        let mut transition = None;

        if let Some(slot) = self.pending.flip.take() {
            self.current_slot = slot;
            self.stats.flips += 1;
            transition = Some(Transition::Flip(self.flip_style));
            if self.restart == RestartMode::EveryFlip {
                self.queue_restart();
            }
        }

        if let Some(slot) = self.pending.select.take() {
            self.record_choice(slot);
            transition = Some(Transition::Select);
            if self.restart != RestartMode::None {
                self.queue_restart();
            }
            self.current_slot = 0;
            if self.history.len() >= self.trials {
                tracing::info!("All {} trials recorded", self.trials);
                self.finished = true;
                return Ok(RenderOutcome::Finished);
            }
        }

        let outgoing = self.current_sample;
        self.current_sample = self.assignment.sample(self.current_slot).unwrap_or(0);
        let seek = self.pending.seek.take();

        if self.paused {
            self.render_paused(out, seek)?;
            return Ok(RenderOutcome::Ready);
        }

        let region = self.markers;
        let format = self.samples[outgoing].format();
        let channels = self.channels();
        fill_fragment(
            out,
            &self.samples[outgoing],
            region,
            &mut self.cursor,
            self.windows.crossfade(),
            FillMode::LateSafe,
        )?;

        if transition.is_some() || seek.is_some() {
            let incoming = &self.samples[self.current_sample];
            if let Some(seek) = seek {
                self.cursor = Cursor::at(self.wrap_seek(saved.position, seek));
                fill_fragment(
                    &mut self.scratch,
                    incoming,
                    region,
                    &mut self.cursor,
                    self.windows.crossfade(),
                    FillMode::OnSchedule,
                )?;
            } else {
                let mut cursor = saved;
                fill_fragment(
                    &mut self.scratch,
                    incoming,
                    region,
                    &mut cursor,
                    self.windows.crossfade(),
                    FillMode::LateSafe,
                )?;
            }
            let transition = transition.unwrap_or(Transition::Seek);
            blend_transition(out, &self.scratch, format, channels, &self.windows, transition);
        } else if self.pending.pause {
            fade(out, format, channels, &self.windows, false);
            self.pending.pause = false;
            self.paused = true;
        }

        self.stats.fragments_played += 1;
        Ok(RenderOutcome::Ready)
    }

    /// While paused the cursor holds and output is silence. Seeks move the
    /// cursor; resuming fades in from it.
    fn render_paused(&mut self, out: &mut [u8], seek: Option<i64>) -> Result<()> {
        out.fill(0);
        if let Some(seek) = seek {
            self.cursor = Cursor::at(self.wrap_seek(self.cursor.position, seek));
            self.resume_on_schedule = true;
        }
        if !self.pending.pause {
            return Ok(());
        }

        let mode = if self.resume_on_schedule {
            FillMode::OnSchedule
        } else {
            FillMode::LateSafe
        };
        let sample = &self.samples[self.current_sample];
        fill_fragment(out, sample, self.markers, &mut self.cursor, self.windows.crossfade(), mode)?;
        fade(out, sample.format(), self.channels(), &self.windows, true);

        self.pending.pause = false;
        self.paused = false;
        self.resume_on_schedule = false;
        self.stats.fragments_played += 1;
        Ok(())
    }

    /// Restarting overrides any seek queued for the same fragment
    fn queue_restart(&mut self) {
        self.pending.seek = Some(self.region().start as i64 - self.cursor.position as i64);
    }

    fn record_choice(&mut self, slot: usize) {
        let record = TrialRecord::new(self.assignment.clone(), slot);
        tracing::info!(
            "Trial {} recorded: slot {}{}",
            self.history.len() + 1,
            self.mode.slot_label(slot),
            if self.mode.has_answer() && record.correct { " (correct)" } else { "" }
        );
        self.history.record(record);
        self.assignment = Assignment::draw(self.mode, self.samples.len(), &mut self.rng);
    }

    /// Target of a relative seek, wrapped into the loop by whole loop lengths
    fn wrap_seek(&self, position: usize, seek: i64) -> usize {
        let region = self.region();
        let (start, end) = (region.start as i64, region.end as i64);
        let len = (end - start).max(1);
        let mut target = position as i64 + seek;
        if target > end {
            target -= (target - end + len - 1) / len * len;
        }
        if target < start {
            target += (start - target + len - 1) / len * len;
        }
        target.max(0) as usize
    }

    fn region(&self) -> LoopRegion {
        self.markers
            .effective(self.size(), self.fragment_bytes(), self.bytes_per_frame())
    }

    fn size(&self) -> usize {
        self.samples[0].data().len()
    }

    fn rate(&self) -> u32 {
        self.samples[0].rate()
    }

    fn channels(&self) -> usize {
        usize::from(self.samples[0].channels())
    }

    fn bytes_per_frame(&self) -> usize {
        self.samples[0].bytes_per_frame()
    }

    fn secs(&self, bytes: usize) -> f64 {
        (bytes / self.bytes_per_frame()) as f64 / f64::from(self.rate())
    }

    /// Current state for display
    pub fn status(&self) -> SessionStatus {
        let region = self.region();
        SessionStatus {
            mode: self.mode,
            playing_slot: self.current_slot,
            playing_label: self.mode.slot_label(self.current_slot),
            position_secs: self.secs(self.cursor.position),
            start_secs: self.secs(region.start),
            end_secs: self.secs(region.end),
            length_secs: self.secs(self.size()),
            paused: self.paused,
            flip_style: self.flip_style,
            restart: self.restart,
            trials_done: self.history.len(),
            trials_total: self.trials,
            correct: (self.running_score && self.mode.has_answer()).then(|| self.history.correct()),
            show_keymap: self.show_keymap,
        }
    }

    /// Slot-to-sample mapping of the trial in progress
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Recorded choices
    pub fn history(&self) -> &TrialHistory {
        &self.history
    }

    /// Counters so far
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Audible playback time so far
    pub fn elapsed_secs(&self) -> f64 {
        self.stats.fragments_played as f64 * self.windows.frames() as f64 / f64::from(self.rate())
    }

    /// Summary of the session so far
    pub fn report(&self) -> TrialReport {
        TrialReport::new(
            self.mode,
            self.samples.iter().map(Sample::name).collect(),
            &self.history,
            self.stats,
            self.elapsed_secs(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earmark_core::{ChannelLayout, NativeDepth, SampleFormat};

    const RATE: u32 = 100;
    const FRAG: usize = 10;

    /// One second of mono 16-bit audio at a constant level
    fn constant(name: &str, level: i16) -> Sample {
        lasting(name, level, 1)
    }

    fn lasting(name: &str, level: i16, secs: u32) -> Sample {
        let data = (0..RATE * secs).flat_map(|_| level.to_le_bytes()).collect();
        Sample::from_bytes(
            name,
            RATE,
            ChannelLayout::mono(),
            NativeDepth::Integer(16),
            SampleFormat::Int16,
            data,
        )
        .unwrap()
    }

    fn session(mode: TestMode, samples: Vec<Sample>, options: SessionOptions) -> Session {
        Session::new(
            samples,
            TransitionWindows::new(RATE, SampleFormat::Int16),
            SessionOptions {
                mode,
                seed: Some(7),
                ..options
            },
        )
        .unwrap()
    }

    fn pair(mode: TestMode) -> Session {
        session(
            mode,
            vec![constant("a.wav", 1000), constant("b.wav", -1000)],
            SessionOptions::default(),
        )
    }

    fn render(s: &mut Session) -> Vec<i16> {
        let mut out = vec![0u8; s.fragment_bytes()];
        assert_eq!(s.render(&mut out).unwrap(), RenderOutcome::Ready);
        out.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect()
    }

    #[test]
    fn randomized_modes_need_two_samples() {
        let err = Session::new(
            vec![constant("a.wav", 0)],
            TransitionWindows::new(RATE, SampleFormat::Int16),
            SessionOptions {
                mode: TestMode::Abx,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidSession(_)));
    }

    #[test]
    fn empty_loop_is_rejected() {
        let err = Session::new(
            vec![constant("a.wav", 0)],
            TransitionWindows::new(RATE, SampleFormat::Int16),
            SessionOptions {
                start_secs: 0.5,
                end_secs: Some(0.3),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidSession(_)));
    }

    #[test]
    fn plays_first_slot_until_flipped() {
        let mut s = pair(TestMode::Casual);
        assert_eq!(render(&mut s), vec![1000; FRAG]);

        s.apply(Command::FlipTo(1));
        assert!(!s.accepts_input());
        let blended = render(&mut s);
        assert!(blended[0] > 900 && blended[FRAG - 1] < -900);
        assert!(s.accepts_input());

        assert_eq!(render(&mut s), vec![-1000; FRAG]);
        assert_eq!(s.status().playing_slot, 1);
        assert_eq!(s.stats().flips, 1);
    }

    #[test]
    fn pointless_flips_are_ignored() {
        let mut s = pair(TestMode::Casual);
        s.apply(Command::FlipTo(0));
        s.apply(Command::FlipTo(5));
        s.apply(Command::FlipPrevious);
        assert!(s.accepts_input());
    }

    #[test]
    fn casual_records_nothing() {
        let mut s = pair(TestMode::Casual);
        s.apply(Command::Choose(0));
        s.apply(Command::ChooseCurrent);
        assert!(s.accepts_input());
        render(&mut s);
        assert!(s.history().is_empty());
    }

    #[test]
    fn abx_rejects_choosing_x() {
        let mut s = pair(TestMode::Abx);
        s.apply(Command::Choose(2));
        assert!(s.accepts_input());
        s.apply(Command::Choose(1));
        assert!(!s.accepts_input());
    }

    #[test]
    fn session_finishes_after_last_trial() {
        let mut s = session(
            TestMode::Xxy,
            vec![constant("a.wav", 1000), constant("b.wav", -1000)],
            SessionOptions {
                trials: 2,
                ..Default::default()
            },
        );
        s.apply(Command::Choose(2));
        render(&mut s);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.status().playing_slot, 0);

        s.apply(Command::Choose(0));
        let mut out = vec![0u8; s.fragment_bytes()];
        assert_eq!(s.render(&mut out).unwrap(), RenderOutcome::Finished);
        assert!(s.is_finished());
        assert_eq!(s.report().trials, 2);
    }

    #[test]
    fn pause_fades_out_holds_and_fades_in() {
        let mut s = pair(TestMode::Casual);
        render(&mut s);

        s.apply(Command::TogglePause);
        let out = render(&mut s);
        assert!(out[0] > 900);
        assert!(out[FRAG - 1].abs() < 100);
        let held = s.status().position_secs;
        assert!(s.status().paused);

        assert_eq!(render(&mut s), vec![0; FRAG]);
        assert_eq!(s.status().position_secs, held);

        s.apply(Command::TogglePause);
        let out = render(&mut s);
        assert!(out[0].abs() < 100);
        assert!(out[FRAG - 1] > 900);
        assert!(!s.status().paused);
        assert_eq!(s.stats().fragments_played, 3);
    }

    #[test]
    fn seek_wraps_around_the_loop() {
        let mut s = pair(TestMode::Casual);
        render(&mut s);
        // two seconds forward on a one second loop lands where it started
        s.apply(Command::Seek(2));
        render(&mut s);
        assert!((s.status().position_secs - 0.2).abs() < 1e-9);
    }

    #[test]
    fn seek_while_paused_moves_silently() {
        let mut s = pair(TestMode::Casual);
        s.apply(Command::TogglePause);
        render(&mut s);
        s.apply(Command::SeekToStart);
        assert_eq!(render(&mut s), vec![0; FRAG]);
        assert_eq!(s.status().position_secs, 0.0);

        s.apply(Command::TogglePause);
        render(&mut s);
        assert!((s.status().position_secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn restart_on_flip_returns_to_loop_start() {
        let mut s = pair(TestMode::Casual);
        s.apply(Command::CycleRestartMode);
        assert_eq!(s.status().restart, RestartMode::EveryFlip);
        render(&mut s);
        render(&mut s);
        s.apply(Command::FlipTo(1));
        render(&mut s);
        assert!((s.status().position_secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn restart_replaces_a_pending_seek() {
        let mut s = session(
            TestMode::Casual,
            vec![lasting("a.wav", 1000, 3), lasting("b.wav", -1000, 3)],
            SessionOptions::default(),
        );
        s.apply(Command::CycleRestartMode);
        render(&mut s);
        render(&mut s);
        s.apply(Command::Seek(1));
        s.apply(Command::FlipTo(1));
        render(&mut s);
        assert!((s.status().position_secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn loop_markers_follow_the_cursor() {
        let mut s = pair(TestMode::Casual);
        for _ in 0..5 {
            render(&mut s);
        }
        s.apply(Command::SetStart);
        assert!((s.status().start_secs - 0.5).abs() < 1e-9);
        s.apply(Command::SetEnd);
        assert!((s.status().end_secs - 1.0).abs() < 1e-9, "end at the cursor is ignored");
        s.apply(Command::ResetStart);
        assert_eq!(s.status().start_secs, 0.0);
    }

    #[test]
    fn long_run_never_overruns() {
        let mut s = pair(TestMode::Casual);
        s.apply(Command::SetStart);
        for i in 0..200 {
            if i % 17 == 0 {
                s.apply(Command::Seek(if i % 2 == 0 { 2 } else { -10 }));
            }
            if i % 23 == 0 {
                s.apply(Command::FlipNext);
            }
            render(&mut s);
        }
    }

    #[test]
    fn undo_is_disabled_with_running_score() {
        let mut s = session(
            TestMode::Abx,
            vec![constant("a.wav", 1000), constant("b.wav", -1000)],
            SessionOptions {
                running_score: true,
                ..Default::default()
            },
        );
        s.apply(Command::Choose(0));
        render(&mut s);
        s.apply(Command::Undo);
        assert_eq!(s.history().len(), 1);
        assert!(s.status().correct.is_some());
    }

    #[test]
    fn restart_cycle_skips_after_trial_in_casual() {
        assert_eq!(RestartMode::None.next(TestMode::Casual), RestartMode::EveryFlip);
        assert_eq!(RestartMode::None.next(TestMode::Ab), RestartMode::AfterTrial);
        assert_eq!(RestartMode::EveryFlip.next(TestMode::Ab), RestartMode::None);
    }
}
