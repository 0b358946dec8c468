//! Pad voice rendering (audio thread)
//!
//! One active voice plus a few releasing ones. Switching notes moves the
//! active voice into the release pool where it decays while the new voice
//! fades in, which gives the crossfade between pads.

use basedrop::Shared;

use crate::engine::param::SmoothedParam;
use crate::engine::PadSource;
use crate::types::{ChannelBuffer, StereoBuffer, StereoSample};

/// Cutoff of the synth voice's low-pass (Hz)
const SYNTH_LOWPASS_HZ: f32 = 400.0;
const SYNTH_LOWPASS_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// Synth oscillators are loud; keep the sum clear of clipping at full volume
const SYNTH_HEADROOM: f32 = 0.5;

/// Maximum voices fading out at the same time
pub const MAX_RELEASING_VOICES: usize = 4;

/// Low-pass biquad state (mono)
#[derive(Debug, Clone, Default)]
struct Lowpass {
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
    x1: f32, x2: f32, y1: f32, y2: f32,
}

impl Lowpass {
    fn new(freq: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            ..Default::default()
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let out = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
                - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }
}

enum Oscillator {
    /// Sawtooth at the note plus a sine an octave below, low-passed
    Synth {
        saw_phase: f32,
        sine_phase: f32,
        increment: f32,
        filter: Lowpass,
    },
    Sample {
        buffer: Shared<ChannelBuffer>,
        position: usize,
    },
}

impl Oscillator {
    #[inline]
    fn next_frame(&mut self) -> StereoSample {
        match self {
            Oscillator::Synth { saw_phase, sine_phase, increment, filter } => {
                let saw = 2.0 * *saw_phase - 1.0;
                let sine = (*sine_phase * std::f32::consts::TAU).sin();
                *saw_phase = (*saw_phase + *increment).fract();
                *sine_phase = (*sine_phase + *increment * 0.5).fract();
                StereoSample::mono(filter.process((saw + sine) * SYNTH_HEADROOM))
            }
            Oscillator::Sample { buffer, position } => {
                let samples = buffer.samples();
                if samples.is_empty() {
                    return StereoSample::silence();
                }
                if *position >= samples.len() {
                    *position = 0;
                }
                let frame = samples[*position];
                *position += 1;
                frame
            }
        }
    }
}

/// A single pad voice with its own envelope
pub struct PadVoice {
    oscillator: Oscillator,
    level: SmoothedParam,
    /// Frames left before a releasing voice is freed
    release_frames_left: Option<u64>,
}

impl PadVoice {
    pub fn new(source: PadSource, volume: f32, fade_in: f64, sample_rate: u32) -> Self {
        let oscillator = match source {
            PadSource::Synth { frequency } => Oscillator::Synth {
                saw_phase: 0.0,
                sine_phase: 0.0,
                increment: frequency / sample_rate.max(1) as f32,
                filter: Lowpass::new(SYNTH_LOWPASS_HZ, SYNTH_LOWPASS_Q, sample_rate.max(1) as f32),
            },
            PadSource::Sample { buffer } => Oscillator::Sample { buffer, position: 0 },
        };
        let mut level = SmoothedParam::new(0.0);
        level.linear_ramp(volume, fade_in, sample_rate);
        Self {
            oscillator,
            level,
            release_frames_left: None,
        }
    }

    pub fn level(&self) -> f32 {
        self.level.value()
    }

    fn release(&mut self, time_constant: f64, hold: f64, sample_rate: u32) {
        self.level.approach(0.0, time_constant, sample_rate);
        self.release_frames_left = Some((hold.max(0.0) * sample_rate as f64).round() as u64);
    }

    /// Mix this voice into `out`; returns false once a released voice is done
    fn render_add(&mut self, out: &mut [StereoSample]) -> bool {
        for frame in out.iter_mut() {
            let level = self.level.next_value();
            *frame += self.oscillator.next_frame() * level;
        }
        match self.release_frames_left.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(out.len() as u64);
                *left > 0
            }
            None => true,
        }
    }
}

/// All pad voices owned by the render graph
pub struct PadVoices {
    sample_rate: u32,
    active: Option<PadVoice>,
    releasing: [Option<PadVoice>; MAX_RELEASING_VOICES],
}

impl PadVoices {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            active: None,
            releasing: Default::default(),
        }
    }

    pub fn start(&mut self, source: PadSource, volume: f32, fade_in: f64) {
        if self.active.is_some() {
            // Callers release first; a voice started on top of another still crossfades
            self.release(0.5, 2.5);
        }
        self.active = Some(PadVoice::new(source, volume, fade_in, self.sample_rate));
    }

    pub fn release(&mut self, time_constant: f64, hold: f64) {
        let Some(mut voice) = self.active.take() else { return };
        voice.release(time_constant, hold, self.sample_rate);
        let slot = match self.releasing.iter().position(|v| v.is_none()) {
            Some(free) => free,
            // Pool full: replace the quietest voice
            None => self
                .releasing
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    let la = a.1.as_ref().map_or(0.0, |v| v.level());
                    let lb = b.1.as_ref().map_or(0.0, |v| v.level());
                    la.total_cmp(&lb)
                })
                .map_or(0, |(i, _)| i),
        };
        self.releasing[slot] = Some(voice);
    }

    pub fn set_volume(&mut self, volume: f32, time_constant: f64) {
        if let Some(voice) = self.active.as_mut() {
            voice.level.approach(volume, time_constant, self.sample_rate);
        }
    }

    pub fn active(&self) -> Option<&PadVoice> {
        self.active.as_ref()
    }

    pub fn releasing_count(&self) -> usize {
        self.releasing.iter().filter(|v| v.is_some()).count()
    }

    /// Mix every voice into `out` (added on top of whatever is there)
    pub fn render_add(&mut self, out: &mut StereoBuffer) {
        let frames = out.as_mut_slice();
        if let Some(voice) = self.active.as_mut() {
            voice.render_add(frames);
        }
        for slot in self.releasing.iter_mut() {
            if let Some(voice) = slot.as_mut() {
                if !voice.render_add(frames) {
                    *slot = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 1000;

    fn render(voices: &mut PadVoices, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silence(frames);
        voices.render_add(&mut out);
        out
    }

    #[test]
    fn test_synth_voice_fades_in_linearly() {
        let mut voices = PadVoices::new(SR);
        voices.start(PadSource::Synth { frequency: 130.81 }, 0.4, 2.0);

        render(&mut voices, 1000);
        let level = voices.active().unwrap().level();
        assert!((level - 0.2).abs() < 1e-3, "level after 1s = {}", level);

        render(&mut voices, 1000);
        assert!((voices.active().unwrap().level() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_release_frees_voice_after_hold() {
        let mut voices = PadVoices::new(SR);
        voices.start(PadSource::Synth { frequency: 220.0 }, 0.4, 0.0);
        voices.release(0.5, 2.5);

        assert!(voices.active().is_none());
        assert_eq!(voices.releasing_count(), 1);

        render(&mut voices, 2000);
        assert_eq!(voices.releasing_count(), 1);
        render(&mut voices, 600);
        assert_eq!(voices.releasing_count(), 0);
    }

    #[test]
    fn test_start_over_active_voice_crossfades() {
        let mut voices = PadVoices::new(SR);
        voices.start(PadSource::Synth { frequency: 220.0 }, 0.4, 0.0);
        voices.start(PadSource::Synth { frequency: 246.94 }, 0.4, 2.0);

        assert!(voices.active().is_some());
        assert_eq!(voices.releasing_count(), 1);
    }

    #[test]
    fn test_sample_voice_loops() {
        let buffer = ChannelBuffer::new(
            StereoBuffer::from_interleaved(&[1.0, 1.0, 0.5, 0.5]),
            SR,
        );
        let shared = Shared::new(&crate::engine::gc_handle(), buffer);
        let mut voices = PadVoices::new(SR);
        voices.start(PadSource::Sample { buffer: shared }, 1.0, 0.0);

        let out = render(&mut voices, 5);
        let lefts: Vec<f32> = out.iter().map(|s| s.left).collect();
        assert_eq!(lefts, vec![1.0, 0.5, 1.0, 0.5, 1.0]);
    }
}
