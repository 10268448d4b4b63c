//! The output frame a listener worker hands to its sink: one callback's
//! worth of routed, planar PCM with borrowed channel views.

use asio_core::{SampleFormat, StackVec};
use asio_registry::SpeakerLayout;

use crate::routing::MAX_OUTPUT_CHANNELS;

/// One routed frame. Channel pointers are borrowed from either the source
/// ring slot or the listener's silence buffer and are only valid for the
/// duration of the `emit` call that receives this frame.
pub struct OutputFrame<'a> {
    pub sample_format: SampleFormat,
    pub frames: usize,
    pub sample_rate: u32,
    pub timestamp_ns: u64,
    pub speaker_layout: SpeakerLayout,
    channels: StackVec<&'a [u8], MAX_OUTPUT_CHANNELS>,
}

impl<'a> OutputFrame<'a> {
    pub fn new(
        sample_format: SampleFormat,
        frames: usize,
        sample_rate: u32,
        timestamp_ns: u64,
        speaker_layout: SpeakerLayout,
        channels: StackVec<&'a [u8], MAX_OUTPUT_CHANNELS>,
    ) -> Self {
        OutputFrame { sample_format, frames, sample_rate, timestamp_ns, speaker_layout, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> &'a [u8] {
        *self.channels.get(index).expect("channel index in range")
    }
}
