use super::rig::{ChannelBindings, FaceRig, Output};
use super::{approach, BlendProfile, Blinker, ChannelState, Mood};
use crate::config::AnimationConfig;
use crate::sync::SyncReader;
use crate::viseme::Viseme;

const LOG_TARGET: &str = "animation";

/// Values written to the rig for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutput {
    pub blink_left: f32,
    pub blink_right: f32,
    pub brow_down: f32,
    pub brow_up: f32,
    pub squint: f32,
    pub smile: f32,
    pub visemes: [f32; Viseme::COUNT],
    pub jaw_open: f32,
    pub mouth_open: f32,
    /// Viseme resolved this frame; `None` when lip-sync is inactive.
    pub viseme: Option<Viseme>,
}

impl FrameOutput {
    pub fn value(&self, output: Output) -> f32 {
        match output {
            Output::BlinkLeft => self.blink_left,
            Output::BlinkRight => self.blink_right,
            Output::BrowDown => self.brow_down,
            Output::BrowUp => self.brow_up,
            Output::Squint => self.squint,
            Output::Smile => self.smile,
            Output::Viseme(v) => self.visemes[v.index()],
            Output::JawOpen => self.jaw_open,
            Output::MouthOpen => self.mouth_open,
        }
    }
}

/// Mouth movement for speech without a timeline: two rectified sines.
fn talking_wave(t: f64) -> f32 {
    let wave = (t * 12.0).sin() * 0.6 + (t * 19.0).sin() * 0.4;
    (wave.abs() * 0.5) as f32
}

/// Blends blink, mood, lip-sync and jaw channels once per rendered frame.
pub struct AnimationDriver<R: FaceRig> {
    rig: R,
    bindings: ChannelBindings,
    profile: BlendProfile,
    blinker: Blinker,
    sync: SyncReader,
    channels: ChannelState,
    mood: Mood,
    speaking: bool,
    session_time: f64,
}

impl<R: FaceRig> AnimationDriver<R> {
    pub fn new(rig: R, sync: SyncReader, config: &AnimationConfig) -> Self {
        let bindings = ChannelBindings::resolve(&rig);
        Self {
            rig,
            bindings,
            profile: BlendProfile::from_config(config),
            blinker: Blinker::new(config.blink, config.seed),
            sync,
            channels: ChannelState::default(),
            mood: Mood::default(),
            speaking: false,
            session_time: 0.0,
        }
    }

    pub fn set_mood(&mut self, mood: Mood) {
        if mood != self.mood {
            tracing::debug!(target: LOG_TARGET, %mood, "mood changed");
            self.mood = mood;
        }
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// External "speaking now" flag, used when no timeline is active.
    pub fn set_speaking(&mut self, speaking: bool) {
        self.speaking = speaking;
    }

    pub fn channels(&self) -> &ChannelState {
        &self.channels
    }

    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn session_time(&self) -> f64 {
        self.session_time
    }

    /// Advances every channel by `dt` seconds and pushes the result to the rig.
    pub fn tick(&mut self, dt: f64) -> FrameOutput {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.session_time += dt;
        let step = dt as f32;
        let p = &self.profile;
        let ch = &mut self.channels;

        let blink = self.blinker.update(self.session_time);

        let target = self.mood.target();
        ch.smile = approach(ch.smile, target.smile, p.mood_rate, step);
        ch.brow_down = approach(ch.brow_down, target.brow_down, p.mood_rate, step);
        ch.brow_up = approach(ch.brow_up, target.brow_up, p.mood_rate, step);
        ch.squint = approach(ch.squint, target.squint, p.mood_rate, step);

        let sample = self.sync.sample();
        let active = sample.as_ref().map(|s| s.viseme());
        for v in Viseme::ALL {
            let goal = match active {
                Some(current) if current == v => p.intensity(v),
                _ => 0.0,
            };
            let slot = &mut ch.visemes[v.index()];
            *slot = approach(*slot, goal, p.viseme_rate, step);
        }
        let jaw_goal = active.map(|v| p.jaw(v)).unwrap_or(0.0);
        ch.jaw_open = approach(ch.jaw_open, jaw_goal, p.viseme_rate, step);

        let talk_goal = if sample.is_none() && self.speaking {
            talking_wave(self.session_time)
        } else {
            0.0
        };
        ch.talk = approach(ch.talk, talk_goal, p.viseme_rate, step);

        ch.blink_left = (blink + ch.squint).min(1.0);
        ch.blink_right = ch.blink_left;

        let mouth_open = if self.bindings.has_visemes() {
            ch.talk
        } else {
            ch.talk.max((ch.jaw_open * p.mouth_open_gain).min(1.0))
        };
        let smile = if sample.is_some() {
            (ch.smile * p.smile_attenuation).clamp(0.0, 1.0)
        } else {
            ch.smile
        };

        let frame = FrameOutput {
            blink_left: ch.blink_left,
            blink_right: ch.blink_right,
            brow_down: ch.brow_down,
            brow_up: ch.brow_up,
            squint: ch.squint,
            smile,
            visemes: ch.visemes,
            jaw_open: ch.jaw_open,
            mouth_open,
            viseme: active,
        };

        tracing::trace!(
            target: LOG_TARGET,
            t = self.session_time,
            elapsed = sample.as_ref().map(|s| s.elapsed),
            viseme = active.map(Viseme::label),
            jaw = frame.jaw_open,
            "frame"
        );

        self.bindings.apply(&mut self.rig, |o| frame.value(o));
        frame
    }
}
