//! Per-frame facial animation: blink, mood, lip-sync and jaw channels.

mod blink;
mod driver;
mod rig;

use crate::config::{AnimationConfig, ConfigError};
use crate::viseme::Viseme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use blink::{BlinkState, Blinker};
pub use driver::{AnimationDriver, FrameOutput};
pub use rig::{ChannelBindings, FaceRig, MorphTargetRig, Output, RigChannel};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Serious,
    Surprise,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Neutral, Mood::Happy, Mood::Serious, Mood::Surprise];

    pub fn label(self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Serious => "serious",
            Mood::Surprise => "surprise",
        }
    }

    pub fn target(self) -> MoodTarget {
        let (smile, brow_down, brow_up, squint) = match self {
            Mood::Neutral => (0.05, 0.0, 0.0, 0.0),
            Mood::Happy => (0.35, 0.0, 0.0, 0.15),
            Mood::Serious => (0.0, 0.35, 0.0, 0.10),
            Mood::Surprise => (0.05, 0.0, 0.45, 0.0),
        };
        MoodTarget {
            smile,
            brow_down,
            brow_up,
            squint,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownMood(s.to_owned()))
    }
}

/// Fixed expression a mood pulls the face toward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoodTarget {
    pub smile: f32,
    pub brow_down: f32,
    pub brow_up: f32,
    pub squint: f32,
}

/// Smoothed channel values, each in `[0, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelState {
    pub blink_left: f32,
    pub blink_right: f32,
    pub brow_down: f32,
    pub brow_up: f32,
    pub squint: f32,
    pub smile: f32,
    pub visemes: [f32; Viseme::COUNT],
    pub jaw_open: f32,
    /// Synthesized mouth movement while speaking without a timeline.
    pub talk: f32,
}

/// How strongly each viseme drives its own morph target.
const VISEME_INTENSITY: [f32; Viseme::COUNT] = [
    0.0,  // sil
    0.50, // PP
    0.40, // FF
    0.45, // TH
    0.45, // DD
    0.35, // kk
    0.45, // CH
    0.35, // SS
    0.35, // nn
    0.45, // RR
    0.75, // aa
    0.65, // E
    0.55, // I
    0.70, // O
    0.55, // U
];

/// Supplementary jaw opening per viseme.
const VISEME_JAW: [f32; Viseme::COUNT] = [
    0.0,  // sil
    0.0,  // PP
    0.03, // FF
    0.06, // TH
    0.08, // DD
    0.05, // kk
    0.08, // CH
    0.03, // SS
    0.05, // nn
    0.08, // RR
    0.30, // aa
    0.18, // E
    0.10, // I
    0.25, // O
    0.08, // U
];

/// Every rate and target table the blend uses, in one place.
#[derive(Clone, Debug, PartialEq)]
pub struct BlendProfile {
    pub mood_rate: f32,
    pub viseme_rate: f32,
    pub viseme_intensity: [f32; Viseme::COUNT],
    pub viseme_jaw: [f32; Viseme::COUNT],
    pub smile_attenuation: f32,
    pub mouth_open_gain: f32,
}

impl Default for BlendProfile {
    fn default() -> Self {
        Self::from_config(&AnimationConfig::default())
    }
}

impl BlendProfile {
    pub fn from_config(cfg: &AnimationConfig) -> Self {
        Self {
            mood_rate: cfg.rates.mood,
            viseme_rate: cfg.rates.viseme,
            viseme_intensity: VISEME_INTENSITY,
            viseme_jaw: VISEME_JAW,
            smile_attenuation: cfg.smile_attenuation,
            mouth_open_gain: cfg.mouth_open_gain,
        }
    }

    pub fn intensity(&self, viseme: Viseme) -> f32 {
        self.viseme_intensity[viseme.index()]
    }

    pub fn jaw(&self, viseme: Viseme) -> f32 {
        self.viseme_jaw[viseme.index()]
    }
}

/// Moves `current` toward `target` by `min(1, rate * dt)` of the distance.
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let step = (rate * dt).clamp(0.0, 1.0);
    (current + (target - current) * step).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_smile_converges_in_one_long_frame() {
        let target = Mood::Happy.target().smile;
        let smile = approach(0.0, target, 5.0, 1.0);
        assert!((smile - 0.35).abs() < 1e-6);
    }

    #[test]
    fn approach_is_partial_for_short_frames() {
        let v = approach(0.0, 1.0, 5.0, 0.1);
        assert!((v - 0.5).abs() < 1e-6);
        assert_eq!(approach(0.2, 0.8, 5.0, 0.0), 0.2);
    }

    #[test]
    fn approach_stays_in_unit_range() {
        assert_eq!(approach(0.5, 2.0, 100.0, 1.0), 1.0);
        assert_eq!(approach(0.5, -1.0, 100.0, 1.0), 0.0);
    }

    #[test]
    fn mood_parses_labels() {
        assert_eq!("Happy".parse::<Mood>(), Ok(Mood::Happy));
        assert_eq!(" surprise ".parse::<Mood>(), Ok(Mood::Surprise));
        assert_eq!(
            "angry".parse::<Mood>(),
            Err(ConfigError::UnknownMood("angry".to_owned()))
        );
        assert_eq!(Mood::Serious.to_string(), "serious");
    }

    #[test]
    fn tables_follow_viseme_order() {
        let p = BlendProfile::default();
        assert_eq!(p.intensity(Viseme::Silence), 0.0);
        assert_eq!(p.intensity(Viseme::Aa), 0.75);
        assert_eq!(p.intensity(Viseme::U), 0.55);
        assert_eq!(p.jaw(Viseme::Aa), 0.30);
        assert_eq!(p.jaw(Viseme::O), 0.25);
        assert_eq!(p.jaw(Viseme::RR), 0.08);
        assert!(Viseme::ALL.iter().all(|v| p.jaw(*v) <= 0.30));
    }
}
