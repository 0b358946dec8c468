//! Audio output errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no output devices on any audio host")]
    NoDevices,

    #[error("audio host {host} has no default output device")]
    NoDefaultDevice { host: String },

    /// A configured device that is not connected right now
    #[error("output device {0} is not connected")]
    DeviceNotFound(String),

    #[error("could not query output formats: {0}")]
    FormatQuery(String),

    #[error("device offers no 32-bit float output")]
    NoFloatOutput,

    #[error("could not open the output stream: {0}")]
    StreamOpen(String),

    #[error("output stream refused to start: {0}")]
    StreamStart(String),

    /// A suspended stream could not be restarted
    #[error("could not resume audio: {0}")]
    Resume(String),
}

pub type AudioResult<T> = Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_device() {
        let err = AudioError::DeviceNotFound("[ALSA] Scarlett 2i2".to_string());
        assert_eq!(err.to_string(), "output device [ALSA] Scarlett 2i2 is not connected");

        let err = AudioError::NoDefaultDevice { host: "JACK".to_string() };
        assert!(err.to_string().contains("JACK"));
    }
}
