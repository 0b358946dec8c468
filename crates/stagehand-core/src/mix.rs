//! Mix state - per-channel volume, mute, solo, pan and bus routing
//!
//! Pure data plus the rules that turn it into audible gain. Solo is exclusive
//! across a whole song: as soon as one channel is soloed, every channel that
//! isn't goes silent. Mute always wins over solo.

use serde::{Deserialize, Serialize};

/// Upper bound of a channel fader (unity plus ~1.6 dB of headroom)
pub const MAX_CHANNEL_VOLUME: f32 = 1.2;

/// Channel name fragments that route to the left (monitor) side when
/// auto-pan is enabled
pub const AUTO_PAN_LEFT_MARKERS: [&str; 5] = ["click", "metronome", "metronomo", "guide", "guia"];

/// Output bus of a channel, used for in-ear monitor splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    Left,
    Right,
    #[default]
    Stereo,
}

impl Bus {
    /// Pan position this bus maps to
    pub fn pan(self) -> f32 {
        match self {
            Bus::Left => -1.0,
            Bus::Right => 1.0,
            Bus::Stereo => 0.0,
        }
    }

    /// Bus that best describes a pan position
    pub fn from_pan(pan: f32) -> Self {
        if pan <= -0.5 {
            Bus::Left
        } else if pan >= 0.5 {
            Bus::Right
        } else {
            Bus::Stereo
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bus::Left => "L",
            Bus::Right => "R",
            Bus::Stereo => "L/R",
        }
    }
}

impl std::str::FromStr for Bus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" | "1" => Ok(Bus::Left),
            "r" | "right" | "2" => Ok(Bus::Right),
            "s" | "stereo" | "c" | "center" | "l/r" | "1/2" => Ok(Bus::Stereo),
            other => Err(format!("unknown bus '{}'", other)),
        }
    }
}

/// Live mix settings of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMix {
    pub volume: f32,
    pub muted: bool,
    pub soloed: bool,
    pub pan: f32,
    pub bus: Bus,
}

impl Default for ChannelMix {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            soloed: false,
            pan: 0.0,
            bus: Bus::Stereo,
        }
    }
}

impl ChannelMix {
    /// Fresh mix for a newly loaded channel
    pub fn for_channel(name: &str, auto_pan: bool) -> Self {
        let pan = auto_pan_for(name, auto_pan);
        Self {
            pan,
            bus: Bus::from_pan(pan),
            ..Default::default()
        }
    }

    /// Clamp values coming from outside (snapshots, operator input)
    pub fn sanitized(mut self) -> Self {
        self.volume = clamp_volume(self.volume);
        self.pan = if self.pan.is_finite() { self.pan.clamp(-1.0, 1.0) } else { 0.0 };
        self
    }

    pub fn set_bus(&mut self, bus: Bus) {
        self.bus = bus;
        self.pan = bus.pan();
    }
}

/// Clamp a fader value to `[0, MAX_CHANNEL_VOLUME]` (NaN becomes 0)
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, MAX_CHANNEL_VOLUME)
}

/// Whether any channel of a song is soloed
pub fn any_soloed<'a>(mixes: impl IntoIterator<Item = &'a ChannelMix>) -> bool {
    mixes.into_iter().any(|m| m.soloed)
}

/// Audible gain of a channel given whether its song has any solo active
pub fn effective_gain(mix: &ChannelMix, song_has_solo: bool) -> f32 {
    if mix.muted || (song_has_solo && !mix.soloed) {
        0.0
    } else {
        mix.volume
    }
}

/// Pan derived from a channel name
///
/// With auto-pan on, click/guide style channels go hard left and everything
/// else hard right. With it off, everything sits in the centre.
pub fn auto_pan_for(name: &str, enabled: bool) -> f32 {
    if !enabled {
        return 0.0;
    }
    let lower = name.to_lowercase();
    if AUTO_PAN_LEFT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Bus::Left.pan()
    } else {
        Bus::Right.pan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mix(volume: f32, muted: bool, soloed: bool) -> ChannelMix {
        ChannelMix { volume, muted, soloed, ..Default::default() }
    }

    #[test]
    fn test_solo_exclusivity() {
        let mixes = [mix(0.8, false, true), mix(0.6, false, false), mix(1.1, false, true)];
        let has_solo = any_soloed(&mixes);
        assert!(has_solo);

        let gains: Vec<f32> = mixes.iter().map(|m| effective_gain(m, has_solo)).collect();
        assert_eq!(gains, vec![0.8, 0.0, 1.1]);
    }

    #[test]
    fn test_mute_precedence() {
        assert_eq!(effective_gain(&mix(1.0, true, true), true), 0.0);
        assert_eq!(effective_gain(&mix(1.0, true, false), false), 0.0);
        assert_eq!(effective_gain(&mix(0.7, false, false), false), 0.7);
    }

    #[test]
    fn test_volume_clamping() {
        assert_eq!(clamp_volume(1.5), MAX_CHANNEL_VOLUME);
        assert_eq!(clamp_volume(-0.2), 0.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
        assert_eq!(clamp_volume(0.9), 0.9);
    }

    #[test]
    fn test_bus_pan_mapping() {
        assert_eq!(Bus::Left.pan(), -1.0);
        assert_eq!(Bus::Right.pan(), 1.0);
        assert_eq!(Bus::Stereo.pan(), 0.0);
        for bus in [Bus::Left, Bus::Right, Bus::Stereo] {
            assert_eq!(Bus::from_pan(bus.pan()), bus);
        }
        assert_eq!("1/2".parse::<Bus>().unwrap(), Bus::Stereo);
        assert_eq!("L".parse::<Bus>().unwrap(), Bus::Left);
        assert!("up".parse::<Bus>().is_err());
    }

    #[test]
    fn test_auto_pan_heuristic() {
        assert_eq!(auto_pan_for("CLICK", true), -1.0);
        assert_eq!(auto_pan_for("Metronomo 120", true), -1.0);
        assert_eq!(auto_pan_for("Vocal Guide", true), -1.0);
        assert_eq!(auto_pan_for("guia", true), -1.0);
        assert_eq!(auto_pan_for("Bass", true), 1.0);
        assert_eq!(auto_pan_for("Click", false), 0.0);

        let click = ChannelMix::for_channel("click", true);
        assert_eq!(click.bus, Bus::Left);
        let keys = ChannelMix::for_channel("Keys", false);
        assert_eq!(keys.bus, Bus::Stereo);
    }

    #[test]
    fn test_sanitized() {
        let m = ChannelMix { volume: 3.0, pan: f32::INFINITY, ..Default::default() }.sanitized();
        assert_eq!(m.volume, MAX_CHANNEL_VOLUME);
        assert_eq!(m.pan, 0.0);
    }
}
