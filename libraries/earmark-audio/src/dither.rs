/// Triangular (high-pass TPDF) dither for bit-depth reduction
use rand::Rng;

/// Per-channel triangular dither generator
///
/// Each draw returns the previous uniform value minus a fresh one, so the
/// noise is triangular in amplitude (peak ±1 LSB) and first-order
/// high-passed in spectrum. Channels keep independent state and are
/// visited in interleave order.
#[derive(Debug, Clone)]
pub struct TriangularDither<R> {
    previous: Vec<f32>,
    channel: usize,
    rng: R,
}

impl<R: Rng> TriangularDither<R> {
    /// Create a generator for `channels` interleaved channels
    pub fn new(channels: usize, rng: R) -> Self {
        Self {
            previous: vec![0.0; channels.max(1)],
            channel: 0,
            rng,
        }
    }

    /// Dither value for the next interleaved sample, in LSBs
    pub fn next_value(&mut self) -> f32 {
        let r = self.rng.gen::<f32>() - 0.5;
        let slot = &mut self.previous[self.channel];
        let value = *slot - r;
        *slot = r;
        self.channel = (self.channel + 1) % self.previous.len();
        value
    }
}
