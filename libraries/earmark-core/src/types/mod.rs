mod channels;
mod input;
mod sample;

pub use channels::{ChannelLayout, ChannelRole};
pub use input::Key;
pub use sample::{NativeDepth, Sample, SampleFormat};
