//! Output stream preferences
//!
//! Everything here is a preference: the backend negotiates with the device
//! and logs when it has to settle for something else.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Render buffer preallocated for the callback; larger host buffers are
/// rendered in part and padded with silence
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Frames per callback when the config asks for nothing in particular
/// (~10.7ms at 48kHz, comfortable for backing tracks)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

pub const MIN_BUFFER_SIZE: u32 = 64;

/// Rate asked of the device when the config leaves it open
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Saved output device
///
/// The host is part of the identity: the same interface can show up under
/// ALSA and JACK with different capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    /// Host name as cpal reports it ("ALSA", "JACK", "CoreAudio", ...);
    /// `None` matches the device on any host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "[{}] {}", host, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// `None` follows the system default output
    pub device: Option<DeviceId>,
    /// Frames per callback; `None` uses [`DEFAULT_BUFFER_SIZE`]
    pub buffer_frames: Option<u32>,
    /// `None` asks for [`DEFAULT_SAMPLE_RATE`]
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    /// Requested frames per callback, kept inside what the render buffer holds
    pub fn buffer_frames(&self) -> u32 {
        self.buffer_frames
            .unwrap_or(DEFAULT_BUFFER_SIZE)
            .clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE as u32)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.filter(|rate| *rate > 0).unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

/// One-way output latency of a buffer in milliseconds
pub fn latency_ms(frames: u32, sample_rate: u32) -> f32 {
    frames as f32 / sample_rate.max(1) as f32 * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_frames_are_clamped() {
        assert_eq!(AudioConfig::default().buffer_frames(), DEFAULT_BUFFER_SIZE);
        let tiny = AudioConfig {
            buffer_frames: Some(8),
            ..Default::default()
        };
        assert_eq!(tiny.buffer_frames(), MIN_BUFFER_SIZE);
        let huge = AudioConfig {
            buffer_frames: Some(1 << 20),
            ..Default::default()
        };
        assert_eq!(huge.buffer_frames(), MAX_BUFFER_SIZE as u32);
    }

    #[test]
    fn test_latency() {
        assert!((latency_ms(480, 48_000) - 10.0).abs() < 1e-4);
        assert!(latency_ms(512, 0).is_finite());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(DeviceId::new("Scarlett").to_string(), "Scarlett");
        assert_eq!(DeviceId::with_host("Scarlett", "JACK").to_string(), "[JACK] Scarlett");
    }

    #[test]
    fn test_yaml_leaves_unset_fields_open() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 44100\n").unwrap();
        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(config.buffer_frames, None);
        assert!(config.device.is_none());

        let config: AudioConfig = serde_yaml::from_str("device:\n  name: Scarlett\n").unwrap();
        assert_eq!(config.device, Some(DeviceId::new("Scarlett")));
        assert_eq!(config.sample_rate(), DEFAULT_SAMPLE_RATE);
    }
}
