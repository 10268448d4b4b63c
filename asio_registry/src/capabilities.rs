//! Capability descriptions reported by a device descriptor: sample rates,
//! buffer-size ranges, sample formats, and the speaker layout enumeration
//! used throughout the rest of the pipeline.

use asio_core::SampleFormat;

/// How a device's supported buffer sizes vary between its min and max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSizeGranularity {
    /// Only `min` (== `max`) is a legal buffer size.
    Fixed,
    /// Sizes double from `min` to `max`.
    PowerOfTwo,
    /// Sizes step arithmetically from `min` to `max` by `step`.
    Arithmetic { step: u32 },
}

/// Supported buffer-size range and the rule governing which sizes within it
/// are legal, mirroring the driver's reported granularity value
/// (`-1` = power-of-two, `0` = fixed, `> 0` = arithmetic step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizeRange {
    pub min: u32,
    pub max: u32,
    pub granularity: BufferSizeGranularity,
}

impl BufferSizeRange {
    pub fn from_granularity(min: u32, max: u32, granularity: i32) -> Self {
        let granularity = match granularity {
            g if g < 0 => BufferSizeGranularity::PowerOfTwo,
            0 => BufferSizeGranularity::Fixed,
            step => BufferSizeGranularity::Arithmetic { step: step as u32 },
        };
        BufferSizeRange { min, max, granularity }
    }

    /// All buffer sizes this range and granularity rule admit.
    pub fn legal_sizes(&self) -> Vec<u32> {
        match self.granularity {
            BufferSizeGranularity::Fixed => vec![self.min],
            BufferSizeGranularity::PowerOfTwo => {
                let mut sizes = Vec::new();
                let mut size = self.min.max(1);
                while size <= self.max {
                    sizes.push(size);
                    size *= 2;
                }
                sizes
            }
            BufferSizeGranularity::Arithmetic { step } => {
                let step = step.max(1);
                let mut sizes = Vec::new();
                let mut size = self.min;
                while size <= self.max {
                    sizes.push(size);
                    size += step;
                }
                sizes
            }
        }
    }

    pub fn contains(&self, size: u32) -> bool {
        self.legal_sizes().contains(&size)
    }
}

/// Output speaker layout, selected per-listener. `1..=8` map to a fixed
/// layout name except `7`, which this enumeration does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerLayout {
    Mono,
    Stereo,
    TwoPointOne,
    FourPointZero,
    FourPointOne,
    FivePointOne,
    SevenPointOne,
}

impl SpeakerLayout {
    /// Number of output channels this layout carries.
    pub const fn channel_count(self) -> usize {
        match self {
            SpeakerLayout::Mono => 1,
            SpeakerLayout::Stereo => 2,
            SpeakerLayout::TwoPointOne => 3,
            SpeakerLayout::FourPointZero => 4,
            SpeakerLayout::FourPointOne => 5,
            SpeakerLayout::FivePointOne => 6,
            SpeakerLayout::SevenPointOne => 8,
        }
    }
}

impl TryFrom<u8> for SpeakerLayout {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(SpeakerLayout::Mono),
            2 => Ok(SpeakerLayout::Stereo),
            3 => Ok(SpeakerLayout::TwoPointOne),
            4 => Ok(SpeakerLayout::FourPointZero),
            5 => Ok(SpeakerLayout::FourPointOne),
            6 => Ok(SpeakerLayout::FivePointOne),
            8 => Ok(SpeakerLayout::SevenPointOne),
            other => Err(other),
        }
    }
}

/// Immutable capability view of a device: everything the Control surface
/// needs to validate a requested session configuration against.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub sample_rates: Vec<u32>,
    pub buffer_sizes: BufferSizeRange,
    pub sample_formats: Vec<SampleFormat>,
    pub input_channel_count: usize,
    pub output_channel_count: usize,
    pub input_channel_names: Vec<String>,
}

impl DeviceCapabilities {
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rates.contains(&rate)
    }

    pub fn supports_buffer_size(&self, size: u32) -> bool {
        self.buffer_sizes.contains(size)
    }

    pub fn supports_format(&self, format: SampleFormat) -> bool {
        self.sample_formats.contains(&format)
    }
}
