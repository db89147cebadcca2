//! Fragment filling with looping crossfade
//!
//! Playback is produced one fragment at a time. When the cursor nears the
//! loop end the filler crossfades the tail of the loop into its start, so a
//! looping sample never clicks. A crossfade can straddle two fragments; the
//! remaining length is carried in [`Cursor::crossfade_left`].

use crate::error::{PlaybackError, Result};
use earmark_audio::MIN_FRAGMENTS;
use earmark_core::{Sample, SampleFormat};

/// Loop boundaries as byte offsets into a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    /// First byte of the loop
    pub start: usize,
    /// One past the last byte of the loop
    pub end: usize,
}

impl LoopRegion {
    /// Region covering a whole buffer of `size` bytes
    pub fn whole(size: usize) -> Self {
        Self { start: 0, end: size }
    }

    /// Region the filler actually uses for a buffer of `size` bytes
    ///
    /// The loop always spans at least three fragments: `end` is raised to
    /// `3 * fragment` and `start` lowered to `size - 3 * fragment` when needed.
    /// Both are frame aligned.
    pub fn effective(self, size: usize, fragment: usize, bytes_per_frame: usize) -> Self {
        let span = MIN_FRAGMENTS * fragment;
        let align = |v: usize| v - v % bytes_per_frame;
        Self {
            start: align(self.start.min(size.saturating_sub(span))),
            end: align(self.end.max(span).min(size)),
        }
    }

    /// Loop length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True if the loop is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Play position within the current sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Byte offset of the next frame to play (of the outgoing signal during a crossfade)
    pub position: usize,
    /// Frames of loop crossfade still to play; zero when none is in progress
    pub crossfade_left: usize,
}

impl Cursor {
    /// Cursor at `position` with no crossfade pending
    pub fn at(position: usize) -> Self {
        Self {
            position,
            crossfade_left: 0,
        }
    }
}

/// How the filler schedules the loop crossfade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Normal playback; a crossfade that starts late still uses the full envelope
    LateSafe,
    /// Right after a seek; a crossfade already due is joined part-way so the
    /// loop start arrives on time
    OnSchedule,
}

/// Fill `out` with the next fragment of `sample` and advance `cursor`
///
/// `envelope` is the fade-out curve, one gain per frame of a fragment; its
/// length defines the fragment length. The crossfade weight for a frame is
/// the envelope value at the number of crossfade frames still remaining.
///
/// # Errors
/// - [`PlaybackError::CursorOverrun`] if the cursor, with no crossfade in
///   progress, is past the last position a whole fragment can be read from
/// - [`PlaybackError::InvalidSession`] if the sample is shorter than three
///   fragments or `out` is not one fragment long
pub fn fill_fragment(
    out: &mut [u8],
    sample: &Sample,
    region: LoopRegion,
    cursor: &mut Cursor,
    envelope: &[f32],
    mode: FillMode,
) -> Result<()> {
    let bpf = sample.bytes_per_frame();
    let n = envelope.len();
    let fragment = n * bpf;
    let data = sample.data();

    if out.len() != fragment {
        return Err(PlaybackError::InvalidSession(format!(
            "fragment buffer is {} bytes, expected {fragment}",
            out.len()
        )));
    }
    if n == 0 || data.len() < MIN_FRAGMENTS * fragment {
        return Err(PlaybackError::InvalidSession(format!(
            "{} is shorter than {MIN_FRAGMENTS} fragments",
            sample.name()
        )));
    }

    let region = region.effective(data.len(), fragment, bpf);
    let blender = Blender {
        data,
        format: sample.format(),
        bpf,
    };

    match mode {
        FillMode::LateSafe => blender.late_safe(out, region, cursor, envelope),
        FillMode::OnSchedule => blender.on_schedule(out, region, cursor, envelope),
    }
}

struct Blender<'a> {
    data: &'a [u8],
    format: SampleFormat,
    bpf: usize,
}

impl Blender<'_> {
    fn frame(&self, offset: usize) -> &[u8] {
        &self.data[offset..offset + self.bpf]
    }

    /// `out = a * (1 - w) + b * w`, per channel
    fn blend(&self, out: &mut [u8], a: usize, b: usize, w: f32) {
        let bps = self.format.bytes();
        let (fa, fb) = (self.frame(a), self.frame(b));
        for ((o, x), y) in out
            .chunks_exact_mut(bps)
            .zip(fa.chunks_exact(bps))
            .zip(fb.chunks_exact(bps))
        {
            let v = self.format.read(x) * (1.0 - w) + self.format.read(y) * w;
            self.format.write(o, v);
        }
    }

    fn late_safe(&self, out: &mut [u8], region: LoopRegion, cursor: &mut Cursor, envelope: &[f32]) -> Result<()> {
        let n = envelope.len();
        let bpf = self.bpf;
        let size = self.data.len();

        if cursor.crossfade_left > 0 {
            let mut left = cursor.crossfade_left.min(n);
            let mut a = cursor.position;
            let mut b = region.start + (n - left) * bpf;
            if a + left * bpf > size {
                return Err(PlaybackError::CursorOverrun {
                    position: a,
                    limit: size - left * bpf,
                });
            }
            for frame in out.chunks_exact_mut(bpf) {
                if left > 0 {
                    left -= 1;
                    self.blend(frame, a, b, envelope[left]);
                    a += bpf;
                } else {
                    frame.copy_from_slice(self.frame(b));
                }
                b += bpf;
            }
            *cursor = Cursor::at(b);
            return Ok(());
        }

        let fragment = n * bpf;
        let limit = size - fragment;
        let pos = cursor.position;
        if pos > limit {
            return Err(PlaybackError::CursorOverrun { position: pos, limit });
        }

        if pos + 2 * fragment <= region.end {
            out.copy_from_slice(&self.data[pos..pos + fragment]);
            cursor.position = pos + fragment;
            return Ok(());
        }

        // Crossfade ends exactly at the loop end, unless that moment has
        // already passed; then it starts now with the whole envelope.
        let mut left = (region.end.saturating_sub(pos) / bpf).max(n);
        let mut a = pos;
        let mut b = region.start;
        for frame in out.chunks_exact_mut(bpf) {
            left -= 1;
            if left >= n {
                frame.copy_from_slice(self.frame(a));
            } else {
                self.blend(frame, a, b, envelope[left]);
                b += bpf;
            }
            a += bpf;
        }
        *cursor = Cursor {
            position: if left == 0 { b } else { a },
            crossfade_left: left,
        };
        Ok(())
    }

    fn on_schedule(&self, out: &mut [u8], region: LoopRegion, cursor: &mut Cursor, envelope: &[f32]) -> Result<()> {
        let n = envelope.len();
        let bpf = self.bpf;
        let fragment = n * bpf;
        let pos = cursor.position;

        if pos + 2 * fragment <= region.end {
            out.copy_from_slice(&self.data[pos..pos + fragment]);
            *cursor = Cursor::at(pos + fragment);
            return Ok(());
        }

        // frames until the loop end; negative once the cursor has passed it
        let due = (region.end as isize - pos as isize) / bpf as isize;
        let mut left = due;
        let mut a = pos;
        // the incoming side is as far into the loop as the crossfade is overdue
        let mut b = region.start + (n as isize - due).max(0) as usize * bpf;
        if b + fragment > self.data.len() {
            return Err(PlaybackError::CursorOverrun {
                position: pos,
                limit: region.end,
            });
        }
        for frame in out.chunks_exact_mut(bpf) {
            left -= 1;
            if left >= n as isize {
                frame.copy_from_slice(self.frame(a));
                a += bpf;
            } else if left >= 0 {
                self.blend(frame, a, b, envelope[left as usize]);
                a += bpf;
                b += bpf;
            } else {
                frame.copy_from_slice(self.frame(b));
                b += bpf;
            }
        }
        *cursor = if left > 0 {
            Cursor {
                position: a,
                crossfade_left: (left as usize).min(n),
            }
        } else {
            Cursor::at(b)
        };
        Ok(())
    }
}
