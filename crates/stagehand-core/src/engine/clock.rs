//! Monotonic audio clock
//!
//! The transport never reads wall time. Elapsed positions are derived from the
//! number of frames the render callback has produced, published through
//! atomics so the control thread can sample them every frame without locking.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::AudioError;

/// Source of audio time for the transport
///
/// `now()` must be monotonic non-decreasing for the lifetime of the session.
pub trait AudioClock: Send + Sync {
    /// Current audio time in seconds
    fn now(&self) -> f64;

    /// Whether the host has suspended the clock (device idle, unplugged, ...)
    fn is_suspended(&self) -> bool {
        false
    }

    /// Attempt to resume a suspended clock
    fn resume(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Atomics shared between the render callback and the control thread
///
/// `frames` is written only by the audio thread, `suspended` by the stream
/// error callback and the backend handle. Everyone else reads lock-free.
#[derive(Debug)]
pub struct ClockAtomics {
    frames: AtomicU64,
    sample_rate: AtomicU32,
    suspended: AtomicBool,
    resume_requested: AtomicBool,
}

impl ClockAtomics {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate.max(1)),
            suspended: AtomicBool::new(false),
            resume_requested: AtomicBool::new(false),
        }
    }

    /// Advance the clock by one rendered block (audio thread only)
    #[inline]
    pub fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Relaxed);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    /// Take a pending resume request (backend handle only)
    pub fn take_resume_request(&self) -> bool {
        self.resume_requested.swap(false, Ordering::Relaxed)
    }
}

/// Audio clock driven by the output stream's render callback
///
/// The stream itself lives with the backend handle on the control thread, so
/// `resume()` only raises a request; the handle restarts the stream the next
/// time it is serviced and clears the suspended flag once the host agrees.
#[derive(Debug, Clone)]
pub struct StreamClock {
    atomics: Arc<ClockAtomics>,
}

impl StreamClock {
    pub fn new(atomics: Arc<ClockAtomics>) -> Self {
        Self { atomics }
    }

    pub fn atomics(&self) -> &Arc<ClockAtomics> {
        &self.atomics
    }
}

impl AudioClock for StreamClock {
    fn now(&self) -> f64 {
        self.atomics.frames() as f64 / self.atomics.sample_rate() as f64
    }

    fn is_suspended(&self) -> bool {
        self.atomics.is_suspended()
    }

    fn resume(&self) -> Result<(), AudioError> {
        if self.atomics.is_suspended() {
            self.atomics.resume_requested.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Hand-driven clock for offline rendering and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
    suspended: AtomicBool,
    fail_resume: AtomicBool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        let delta = (seconds.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Relaxed);
    }

    /// Make subsequent `resume()` calls fail, as a host that refuses to wake would
    pub fn set_fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::Relaxed);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    fn resume(&self) -> Result<(), AudioError> {
        if self.fail_resume.load(Ordering::Relaxed) {
            return Err(AudioError::Resume("clock resume refused".to_string()));
        }
        self.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }
}
