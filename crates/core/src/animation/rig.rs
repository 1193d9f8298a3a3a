use crate::viseme::Viseme;

/// Opaque handle to one blendable channel on a rig.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RigChannel(pub usize);

/// A face mesh exposing named morph targets.
pub trait FaceRig {
    fn channel_index(&self, name: &str) -> Option<RigChannel>;
    fn set_weight(&mut self, channel: RigChannel, value: f32);
}

/// Logical channel produced by the animation driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Output {
    BlinkLeft,
    BlinkRight,
    BrowDown,
    BrowUp,
    Squint,
    Smile,
    Viseme(Viseme),
    JawOpen,
    MouthOpen,
}

impl Output {
    fn all() -> impl Iterator<Item = Output> {
        [
            Output::BlinkLeft,
            Output::BlinkRight,
            Output::BrowDown,
            Output::BrowUp,
            Output::Squint,
            Output::Smile,
            Output::JawOpen,
            Output::MouthOpen,
        ]
        .into_iter()
        .chain(Viseme::ALL.into_iter().map(Output::Viseme))
    }

    /// ARKit / Ready Player Me morph names this output drives.
    pub fn morph_names(self) -> Vec<String> {
        let names: &[&str] = match self {
            Output::BlinkLeft => &["eyeBlinkLeft"],
            Output::BlinkRight => &["eyeBlinkRight"],
            Output::BrowDown => &["browDownLeft", "browDownRight"],
            Output::BrowUp => &["browInnerUp", "browOuterUpLeft", "browOuterUpRight"],
            Output::Squint => &["eyeSquintLeft", "eyeSquintRight"],
            Output::Smile => &["mouthSmileLeft", "mouthSmileRight"],
            Output::JawOpen => &["jawOpen"],
            Output::MouthOpen => &["mouthOpen"],
            Output::Viseme(v) => return vec![v.morph_target()],
        };
        names.iter().map(|s| (*s).to_owned()).collect()
    }
}

/// Output-to-rig mapping resolved once when a rig is attached.
#[derive(Clone, Debug, Default)]
pub struct ChannelBindings {
    bound: Vec<(Output, RigChannel)>,
    has_visemes: bool,
}

impl ChannelBindings {
    pub fn resolve(rig: &impl FaceRig) -> Self {
        let mut bound = Vec::new();
        let mut missing = 0usize;
        for output in Output::all() {
            for name in output.morph_names() {
                match rig.channel_index(&name) {
                    Some(channel) => bound.push((output, channel)),
                    None => missing += 1,
                }
            }
        }

        let has_visemes = bound
            .iter()
            .any(|(o, _)| matches!(o, Output::Viseme(v) if !v.is_silence()));
        tracing::debug!(
            bound = bound.len(),
            missing,
            has_visemes,
            "rig channels resolved"
        );
        Self { bound, has_visemes }
    }

    /// Whether the rig has any speaking viseme targets.
    pub fn has_visemes(&self) -> bool {
        self.has_visemes
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn apply(&self, rig: &mut impl FaceRig, value_of: impl Fn(Output) -> f32) {
        for (output, channel) in &self.bound {
            rig.set_weight(*channel, value_of(*output));
        }
    }
}

/// In-memory rig: a fixed list of morph target names and their weights.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MorphTargetRig {
    names: Vec<String>,
    weights: Vec<f32>,
}

impl MorphTargetRig {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let weights = vec![0.0; names.len()];
        Self { names, weights }
    }

    /// The full Ready Player Me face set: ARKit shapes plus all visemes.
    pub fn ready_player_me() -> Self {
        let names = Output::all().flat_map(Output::morph_names);
        Self::new(names)
    }

    /// Writes by name; unknown names are ignored.
    pub fn set_channel(&mut self, name: &str, value: f32) {
        if let Some(channel) = self.channel_index(name) {
            self.set_weight(channel, value);
        }
    }

    pub fn weight(&self, name: &str) -> Option<f32> {
        self.channel_index(name).map(|c| self.weights[c.0])
    }

    pub fn weights(&self) -> impl Iterator<Item = (&str, f32)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }
}

impl FaceRig for MorphTargetRig {
    fn channel_index(&self, name: &str) -> Option<RigChannel> {
        self.names.iter().position(|n| n == name).map(RigChannel)
    }

    fn set_weight(&mut self, channel: RigChannel, value: f32) {
        if let Some(w) = self.weights.get_mut(channel.0) {
            *w = value;
        }
    }
}
