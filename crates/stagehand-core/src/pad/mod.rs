//! Ambient pads
//!
//! A pad is a sustained harmonic bed keyed by note, independent of the
//! setlist transport. Only one pad sounds at a time: pressing the sounding
//! note stops it, pressing another one crossfades.
//!
//! [`PadBank`] is the control side. It owns its own command sink so pad
//! traffic never competes with the transport queue. The voices themselves are
//! rendered by the render graph (see [`voice`]), after the master stage.

pub mod voice;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use basedrop::{Handle, Shared};
use serde::{Deserialize, Serialize};

use crate::engine::{gc_handle, GraphCommand, GraphSink, PadSource};
use crate::types::ChannelBuffer;

pub const DEFAULT_PAD_VOLUME: f32 = 0.4;
/// Fade-in of the built-in synth voice (linear, seconds)
pub const SYNTH_FADE_IN_SECS: f64 = 2.0;
/// Fade-in of a custom sample pad (linear, seconds)
pub const SAMPLE_FADE_IN_SECS: f64 = 1.5;
pub const RELEASE_TIME_CONSTANT: f64 = 0.5;
/// A released voice is freed after this long
pub const RELEASE_HOLD_SECS: f64 = 2.5;
const VOLUME_TIME_CONSTANT: f64 = 0.05;

/// The twelve pad keys, one octave from C3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PadNote {
    C,
    Db,
    D,
    Eb,
    E,
    F,
    Gb,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl PadNote {
    pub const ALL: [PadNote; 12] = [
        PadNote::C,
        PadNote::Db,
        PadNote::D,
        PadNote::Eb,
        PadNote::E,
        PadNote::F,
        PadNote::Gb,
        PadNote::G,
        PadNote::Ab,
        PadNote::A,
        PadNote::Bb,
        PadNote::B,
    ];

    /// Fundamental of the synth voice in Hz
    pub fn frequency(self) -> f32 {
        match self {
            PadNote::C => 130.81,
            PadNote::Db => 138.59,
            PadNote::D => 146.83,
            PadNote::Eb => 155.56,
            PadNote::E => 164.81,
            PadNote::F => 174.61,
            PadNote::Gb => 185.00,
            PadNote::G => 196.00,
            PadNote::Ab => 207.65,
            PadNote::A => 220.00,
            PadNote::Bb => 233.08,
            PadNote::B => 246.94,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PadNote::C => "C",
            PadNote::Db => "Db",
            PadNote::D => "D",
            PadNote::Eb => "Eb",
            PadNote::E => "E",
            PadNote::F => "F",
            PadNote::Gb => "Gb",
            PadNote::G => "G",
            PadNote::Ab => "Ab",
            PadNote::A => "A",
            PadNote::Bb => "Bb",
            PadNote::B => "B",
        }
    }
}

impl fmt::Display for PadNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PadNote {
    type Err = String;

    /// Accepts flats and sharps ("Db", "C#"), any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let note = match s.trim().to_ascii_lowercase().as_str() {
            "c" | "b#" => PadNote::C,
            "db" | "c#" => PadNote::Db,
            "d" => PadNote::D,
            "eb" | "d#" => PadNote::Eb,
            "e" | "fb" => PadNote::E,
            "f" | "e#" => PadNote::F,
            "gb" | "f#" => PadNote::Gb,
            "g" => PadNote::G,
            "ab" | "g#" => PadNote::Ab,
            "a" => PadNote::A,
            "bb" | "a#" => PadNote::Bb,
            "b" | "cb" => PadNote::B,
            other => return Err(format!("unknown note '{}'", other)),
        };
        Ok(note)
    }
}

struct CustomPad {
    name: String,
    buffer: Shared<ChannelBuffer>,
}

/// Control side of the pads
pub struct PadBank<G: GraphSink> {
    sink: G,
    active: Option<PadNote>,
    volume: f32,
    custom: BTreeMap<PadNote, CustomPad>,
    gc: Handle,
}

impl<G: GraphSink> PadBank<G> {
    pub fn new(sink: G, volume: f32) -> Self {
        Self {
            sink,
            active: None,
            volume: clamp_pad_volume(volume),
            custom: BTreeMap::new(),
            gc: gc_handle(),
        }
    }

    pub fn active_note(&self) -> Option<PadNote> {
        self.active
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn sink(&self) -> &G {
        &self.sink
    }

    /// Press a pad key; returns the note now sounding
    pub fn play(&mut self, note: PadNote) -> Option<PadNote> {
        if self.active == Some(note) {
            self.stop();
            return None;
        }
        if self.active.is_some() {
            self.release();
        }

        let (source, fade_in) = match self.custom.get(&note) {
            Some(pad) => (
                PadSource::Sample {
                    buffer: Shared::clone(&pad.buffer),
                },
                SAMPLE_FADE_IN_SECS,
            ),
            None => (
                PadSource::Synth {
                    frequency: note.frequency(),
                },
                SYNTH_FADE_IN_SECS,
            ),
        };
        self.sink.submit(GraphCommand::PadStart {
            source,
            volume: self.volume,
            fade_in,
        });
        self.active = Some(note);
        log::debug!("Pad {} on", note);
        self.active
    }

    /// Release whatever is sounding
    pub fn stop(&mut self) {
        if self.active.is_some() {
            self.release();
            log::debug!("Pad off");
        }
    }

    fn release(&mut self) {
        self.active = None;
        self.sink.submit(GraphCommand::PadRelease {
            time_constant: RELEASE_TIME_CONSTANT,
            hold: RELEASE_HOLD_SECS,
        });
    }

    /// Pad level, clamped to `[0, 1]`, ramped on the sounding voice
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_pad_volume(volume);
        self.sink.submit(GraphCommand::PadVolume {
            volume: self.volume,
            time_constant: VOLUME_TIME_CONSTANT,
        });
    }

    /// Use a sample instead of the synth voice for `note`
    ///
    /// Takes effect the next time the note is pressed.
    pub fn set_custom_pad(&mut self, note: PadNote, name: impl Into<String>, buffer: ChannelBuffer) {
        let pad = CustomPad {
            name: name.into(),
            buffer: Shared::new(&self.gc, buffer),
        };
        self.custom.insert(note, pad);
    }

    pub fn remove_custom_pad(&mut self, note: PadNote) -> bool {
        self.custom.remove(&note).is_some()
    }

    /// Display name of the custom pad on `note`, if any
    pub fn custom_pad(&self, note: PadNote) -> Option<&str> {
        self.custom.get(&note).map(|p| p.name.as_str())
    }

    pub fn custom_pads(&self) -> impl Iterator<Item = (PadNote, &str)> + '_ {
        self.custom.iter().map(|(note, pad)| (*note, pad.name.as_str()))
    }
}

fn clamp_pad_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RenderGraph;
    use crate::types::{StereoBuffer, StereoSample};

    const SR: u32 = 1000;

    fn bank() -> PadBank<RenderGraph> {
        PadBank::new(RenderGraph::new(SR), DEFAULT_PAD_VOLUME)
    }

    #[test]
    fn test_note_parsing_and_frequencies() {
        assert_eq!("c".parse::<PadNote>().unwrap(), PadNote::C);
        assert_eq!("C#".parse::<PadNote>().unwrap(), PadNote::Db);
        assert_eq!(" bb ".parse::<PadNote>().unwrap(), PadNote::Bb);
        assert!("H".parse::<PadNote>().is_err());

        assert_eq!(PadNote::C.frequency(), 130.81);
        assert_eq!(PadNote::A.frequency(), 220.0);
        assert_eq!(PadNote::B.frequency(), 246.94);
        for pair in PadNote::ALL.windows(2) {
            assert!(pair[0].frequency() < pair[1].frequency());
        }
        for note in PadNote::ALL {
            assert_eq!(note.name().parse::<PadNote>().unwrap(), note);
        }
    }

    #[test]
    fn test_same_note_toggles_off() {
        let mut pads = bank();
        assert_eq!(pads.play(PadNote::G), Some(PadNote::G));
        assert!(pads.sink().pads().active().is_some());

        assert_eq!(pads.play(PadNote::G), None);
        assert_eq!(pads.active_note(), None);
        assert!(pads.sink().pads().active().is_none());
        assert_eq!(pads.sink().pads().releasing_count(), 1);
    }

    #[test]
    fn test_switching_notes_crossfades() {
        let mut pads = bank();
        pads.play(PadNote::C);
        pads.play(PadNote::E);

        assert_eq!(pads.active_note(), Some(PadNote::E));
        assert!(pads.sink().pads().active().is_some());
        assert_eq!(pads.sink().pads().releasing_count(), 1);

        pads.stop();
        pads.stop();
        assert_eq!(pads.sink().pads().releasing_count(), 2);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut pads = bank();
        pads.set_volume(3.0);
        assert_eq!(pads.volume(), 1.0);
        pads.set_volume(f32::NAN);
        assert_eq!(pads.volume(), 0.0);
    }

    #[test]
    fn test_custom_pad_replaces_synth() {
        let mut pads = bank();
        let buffer = ChannelBuffer::new(StereoBuffer::from_vec(vec![StereoSample::mono(0.5); 100]), SR);
        pads.set_custom_pad(PadNote::D, "Warm strings", buffer);

        assert_eq!(pads.custom_pad(PadNote::D), Some("Warm strings"));
        assert_eq!(pads.custom_pads().count(), 1);
        pads.play(PadNote::D);
        assert!(pads.sink().pads().active().is_some());

        assert!(pads.remove_custom_pad(PadNote::D));
        assert!(!pads.remove_custom_pad(PadNote::D));
    }
}
