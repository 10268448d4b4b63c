//! The device session state machine: `Unprepared → Prepared → Running →
//! Stopped → Destroyed`.

use cpal::traits::{DeviceTrait, StreamTrait};

use asio_core::{RingBuffer, SampleFormat};
use asio_registry::Registry;

use crate::callback::CaptureState;
use crate::error::{Result, SessionError};
use crate::params::SessionParams;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unprepared,
    Prepared,
    Running,
    Stopped,
    Destroyed,
}

/// Owns one device's ring buffer and `cpal` stream.
///
/// There is one `Session` per device, created lazily on first listener
/// attach and destroyed when no listeners remain. Listeners hold only a
/// ring buffer handle cloned out of it; the session itself is owned by the
/// registry/control layer.
pub struct Session {
    device_index: usize,
    params: Option<SessionParams>,
    ring: Option<RingBuffer>,
    stream: Option<cpal::Stream>,
    state: SessionState,
}

impl Session {
    pub fn new(device_index: usize) -> Self {
        Session {
            device_index,
            params: None,
            ring: None,
            stream: None,
            state: SessionState::Unprepared,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The registry index of the device this session was opened against.
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// The ring buffer listeners read from. `None` before the session has
    /// been prepared.
    pub fn ring(&self) -> Option<&RingBuffer> {
        self.ring.as_ref()
    }

    pub fn params(&self) -> Option<SessionParams> {
        self.params
    }

    /// `Unprepared|Stopped → Prepared`. Allocates (or grows) the ring to
    /// match `params`. Does not open the device or start the stream; that
    /// happens in `start`.
    pub fn prepare(&mut self, params: SessionParams) -> Result<()> {
        if !matches!(self.state, SessionState::Unprepared | SessionState::Stopped) {
            return Err(SessionError::InvalidTransition(self.state));
        }

        match &self.ring {
            Some(ring) => ring.prepare(params.active_input_channels, params.buffer_size as usize, params.sample_format),
            None => {
                self.ring = Some(RingBuffer::new(
                    params.active_input_channels,
                    params.buffer_size as usize,
                    params.sample_format,
                ));
            }
        }

        self.params = Some(params);
        self.state = SessionState::Prepared;
        log::info!(
            "session for device {} prepared: {} Hz, {} frames, {} channels",
            self.device_index,
            params.sample_rate,
            params.buffer_size,
            params.active_input_channels
        );
        Ok(())
    }

    /// `Prepared → Running`. Builds and starts the `cpal` input stream.
    pub fn start(&mut self, registry: &Registry) -> Result<()> {
        if self.state != SessionState::Prepared {
            return Err(SessionError::InvalidTransition(self.state));
        }

        let params = self.params.ok_or(SessionError::InvalidTransition(self.state))?;
        let ring = self.ring.clone().ok_or(SessionError::InvalidTransition(self.state))?;
        let device = registry.open_cpal_device(self.device_index)?;

        let config = cpal::StreamConfig {
            channels: params.active_input_channels as u16,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(params.buffer_size),
        };

        let mut capture = CaptureState {
            ring,
            channel_count: params.active_input_channels,
            bytes_per_sample: params.sample_format.bytes_per_sample(),
            buffer_size: params.buffer_size as usize,
            sample_rate: params.sample_rate,
            stats: Default::default(),
        };

        let err_fn = |err: cpal::StreamError| {
            log::warn!("device stream error: {err}");
        };

        let stream = match params.sample_format {
            SampleFormat::U8Planar => device.build_input_stream(
                &config,
                move |data: &[u8], _| capture.on_data(data),
                err_fn,
                None,
            )?,
            SampleFormat::S16Planar => device.build_input_stream(
                &config,
                move |data: &[i16], _| capture.on_data(data),
                err_fn,
                None,
            )?,
            SampleFormat::S32Planar => device.build_input_stream(
                &config,
                move |data: &[i32], _| capture.on_data(data),
                err_fn,
                None,
            )?,
            SampleFormat::F32Planar => device.build_input_stream(
                &config,
                move |data: &[f32], _| capture.on_data(data),
                err_fn,
                None,
            )?,
        };

        stream.play()?;
        self.stream = Some(stream);
        self.state = SessionState::Running;
        log::info!("session for device {} running", self.device_index);
        Ok(())
    }

    /// `Running → Stopped`. Halts the stream; ring contents remain valid.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Running {
            return Err(SessionError::InvalidTransition(self.state));
        }
        if let Some(stream) = &self.stream {
            stream.pause()?;
        }
        self.stream = None;
        self.state = SessionState::Stopped;
        log::info!("session for device {} stopped", self.device_index);
        Ok(())
    }

    /// `Stopped → Prepared`. Reallocates ring storage only if `params`
    /// requires more than is already allocated.
    pub fn reconfigure(&mut self, params: SessionParams) -> Result<()> {
        if self.state != SessionState::Stopped {
            return Err(SessionError::InvalidTransition(self.state));
        }
        self.state = SessionState::Unprepared;
        self.prepare(params)
    }

    /// Any state → `Destroyed`. Closes the device; idempotent.
    pub fn release(&mut self) {
        self.stream = None;
        self.state = SessionState::Destroyed;
        log::info!("session for device {} released", self.device_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SessionParams {
        SessionParams {
            sample_rate: 48_000,
            buffer_size: 256,
            sample_format: SampleFormat::F32Planar,
            active_input_channels: 2,
        }
    }

    #[test]
    fn starts_unprepared() {
        let session = Session::new(0);
        assert_eq!(session.state(), SessionState::Unprepared);
        assert!(session.ring().is_none());
    }

    #[test]
    fn prepare_allocates_ring_and_advances_state() {
        let mut session = Session::new(0);
        session.prepare(params()).unwrap();
        assert_eq!(session.state(), SessionState::Prepared);
        assert!(session.ring().is_some());
    }

    #[test]
    fn prepare_from_running_is_rejected() {
        let mut session = Session::new(0);
        session.prepare(params()).unwrap();
        session.state = SessionState::Running;
        assert!(matches!(session.prepare(params()), Err(SessionError::InvalidTransition(_))));
    }

    #[test]
    fn reconfigure_requires_stopped_state() {
        let mut session = Session::new(0);
        session.prepare(params()).unwrap();
        assert!(matches!(session.reconfigure(params()), Err(SessionError::InvalidTransition(_))));

        session.state = SessionState::Stopped;
        session.reconfigure(params()).unwrap();
        assert_eq!(session.state(), SessionState::Prepared);
    }

    #[test]
    fn release_is_reachable_from_any_state() {
        let mut session = Session::new(0);
        session.release();
        assert_eq!(session.state(), SessionState::Destroyed);
    }
}
