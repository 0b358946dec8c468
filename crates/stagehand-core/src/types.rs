//! Audio and identity types shared across the crate

use std::fmt;
use std::ops::{Add, AddAssign, Deref, DerefMut, Mul};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Sample = f32;

/// One stereo frame
///
/// `#[repr(C)]` keeps the layout `[left, right]`, so a frame slice can be
/// viewed as interleaved `f32` without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self::new(value, value)
    }
}

impl Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.left + other.left, self.right + other.right)
    }
}

impl AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, gain: Sample) -> Self {
        Self::new(self.left * gain, self.right * gain)
    }
}

/// Stereo frames: a decoded stem, or a render block
///
/// Derefs to `[StereoSample]` for indexing and iteration.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    frames: Vec<StereoSample>,
}

impl StereoBuffer {
    pub fn silence(len: usize) -> Self {
        Self {
            frames: vec![StereoSample::silence(); len],
        }
    }

    /// Pairs `[L, R, L, R, ...]` into frames; a trailing odd sample is dropped
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        let frames = interleaved
            .chunks_exact(2)
            .map(|pair| StereoSample::new(pair[0], pair[1]))
            .collect();
        Self { frames }
    }

    pub fn from_vec(frames: Vec<StereoSample>) -> Self {
        Self { frames }
    }

    /// Resize a preallocated render block without allocating
    ///
    /// Growing past the capacity reserved up front would allocate, which the
    /// audio thread must never do.
    #[inline]
    pub fn set_len_from_capacity(&mut self, len: usize) {
        debug_assert!(len <= self.frames.capacity(), "render block grown past its capacity");
        self.frames.resize(len, StereoSample::silence());
    }

    pub fn fill_silence(&mut self) {
        self.frames.fill(StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.frames
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.frames
    }

    /// Zero-copy interleaved view
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.frames)
    }

    /// Largest absolute sample on either side
    pub fn peak(&self) -> Sample {
        self.frames
            .iter()
            .map(|f| f.left.abs().max(f.right.abs()))
            .fold(0.0, Sample::max)
    }
}

impl Deref for StereoBuffer {
    type Target = [StereoSample];

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}

impl DerefMut for StereoBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.frames
    }
}

/// A decoded stem, immutable once built
///
/// The loader produces it at the output rate; the rate travels along so
/// offsets and durations never need the device.
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    samples: StereoBuffer,
    sample_rate: u32,
}

impl ChannelBuffer {
    pub fn new(samples: StereoBuffer, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    #[inline]
    pub fn samples(&self) -> &StereoBuffer {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index of a position in seconds; negative or non-finite is 0
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate as f64).round() as usize
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identity of a song, stable across sessions
    SongId
);

uuid_id!(
    /// Identity of a channel; also names its stored audio file
    ChannelId
);

/// Slot of a persistent channel node in the render graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_arithmetic() {
        let mut acc = StereoSample::new(1.0, 2.0);
        acc += StereoSample::mono(0.5) * 2.0;
        assert_eq!(acc, StereoSample::new(2.0, 3.0));
    }

    #[test]
    fn test_interleaved_round_trip_drops_odd_tail() {
        let buffer = StereoBuffer::from_interleaved(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[1], StereoSample::new(3.0, 4.0));
        assert_eq!(buffer.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.peak(), 4.0);
    }

    #[test]
    fn test_render_block_resizes_in_place() {
        let mut block = StereoBuffer::silence(256);
        block.set_len_from_capacity(64);
        assert_eq!(block.len(), 64);
        block.set_len_from_capacity(256);
        assert_eq!(block.len(), 256);
        assert!(block.iter().all(|f| *f == StereoSample::silence()));
    }

    #[test]
    fn test_channel_buffer_offsets() {
        let buffer = ChannelBuffer::new(StereoBuffer::silence(96_000), 48_000);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
        assert_eq!(buffer.frame_at(0.5), 24_000);
        assert_eq!(buffer.frame_at(f64::NAN), 0);
        assert_eq!(buffer.frame_at(-1.0), 0);
    }

    #[test]
    fn test_ids_parse_from_display() {
        let id = ChannelId::new();
        let parsed: ChannelId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_ne!(SongId::new(), SongId::new());
    }
}
