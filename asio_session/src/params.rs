//! Session parameters: the tuple the Control surface negotiates before a
//! session can be prepared.

use asio_core::SampleFormat;

/// `{sample_rate, buffer_size, sample_format, active_input_channels}` from
/// the data model. Mutable only by tearing down and re-preparing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub sample_format: SampleFormat,
    pub active_input_channels: usize,
}
