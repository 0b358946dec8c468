//! Transport clock - the authoritative play-head
//!
//! Elapsed time is a pure function of the audio clock:
//!
//! ```text
//! paused:  elapsed = offset
//! playing: elapsed = offset + (now - origin)
//! ```
//!
//! `offset` accumulates completed segments, `origin` is the audio-clock time
//! at which the running segment began. Nothing here reads wall time.

/// Sanitize a duration for transport purposes (non-finite or negative -> 0)
pub fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportClock {
    playing: bool,
    /// Seconds accumulated from completed segments
    offset: f64,
    /// Audio-clock time at which the current segment began
    origin: f64,
    /// Duration of the active song (sanitized)
    duration: f64,
}

impl TransportClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = sanitize_duration(duration);
    }

    /// Elapsed seconds at audio time `now` (pure read)
    pub fn elapsed(&self, now: f64) -> f64 {
        if self.playing {
            // A clock that hasn't caught up with the origin yet counts as zero progress
            self.offset + (now - self.origin).max(0.0)
        } else {
            self.offset
        }
    }

    /// Whether a playing segment has reached the end of the song
    pub fn reached_end(&self, now: f64) -> bool {
        self.playing && self.duration > 0.0 && self.elapsed(now) >= self.duration
    }

    /// Start a segment at `now`; no-op if already playing
    pub fn play(&mut self, now: f64) {
        if self.playing {
            return;
        }
        self.origin = now;
        self.playing = true;
    }

    /// Fold the running segment into the offset; no-op if not playing
    pub fn pause(&mut self, now: f64) {
        if !self.playing {
            return;
        }
        self.offset = self.elapsed(now);
        self.playing = false;
    }

    /// Back to offset 0, re-originating the segment if playing
    pub fn seek_to_start(&mut self, now: f64) {
        self.offset = 0.0;
        if self.playing {
            self.origin = now;
        }
    }

    /// Paused at 0 (song switch)
    pub fn reset(&mut self) {
        self.playing = false;
        self.offset = 0.0;
        self.origin = 0.0;
    }

    /// Stop at the end of the song (natural end)
    pub fn finish(&mut self) {
        self.playing = false;
        self.offset = self.duration;
    }
}
