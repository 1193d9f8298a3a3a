use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SPEECH_RATE: f64 = 1.0;
pub const DEFAULT_FPS: u32 = 60;
pub const ENV_SPEECH_RATE: &str = "AVATAR_SPEECH_RATE";
pub const ENV_BLINK_SEED: &str = "AVATAR_BLINK_SEED";

/// Speaking-rate multiplier; 1.0 is normal speed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "f64", into = "f64")]
pub struct SpeechRate(f64);

impl SpeechRate {
    pub fn new(rate: f64) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        Ok(Self(rate))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for SpeechRate {
    fn default() -> Self {
        Self(DEFAULT_SPEECH_RATE)
    }
}

impl TryFrom<f64> for SpeechRate {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SpeechRate> for f64 {
    fn from(rate: SpeechRate) -> Self {
        rate.0
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlinkConfig {
    /// Seconds the lid takes to close and reopen.
    pub duration: f64,
    pub min_interval: f64,
    /// Random extra interval, uniformly drawn from `[0, jitter)`.
    pub jitter: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            duration: 0.15,
            min_interval: 2.0,
            jitter: 4.0,
        }
    }
}

/// Per-second approach rates for the smoothed channels.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlendRates {
    pub mood: f32,
    pub viseme: f32,
}

impl Default for BlendRates {
    fn default() -> Self {
        Self {
            mood: 5.0,
            viseme: 20.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub speech_rate: SpeechRate,
    pub blink: BlinkConfig,
    pub rates: BlendRates,
    /// Smile multiplier while lip-sync is active.
    pub smile_attenuation: f32,
    /// Jaw-to-mouth-open gain for rigs without viseme targets.
    pub mouth_open_gain: f32,
    /// Fixed blink RNG seed; random when absent.
    pub seed: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speech_rate: SpeechRate::default(),
            blink: BlinkConfig::default(),
            rates: BlendRates::default(),
            smile_attenuation: 0.3,
            mouth_open_gain: 1.8,
            seed: None,
        }
    }
}

impl AnimationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.blink;
        if !(b.duration > 0.0 && b.min_interval >= 0.0 && b.jitter >= 0.0)
            || !(b.duration.is_finite() && b.min_interval.is_finite() && b.jitter.is_finite())
        {
            return Err(ConfigError::InvalidBlink);
        }
        let r = &self.rates;
        if !(r.mood.is_finite() && r.mood > 0.0 && r.viseme.is_finite() && r.viseme > 0.0) {
            return Err(ConfigError::InvalidBlendRate);
        }
        if !(0.0..=1.0).contains(&self.smile_attenuation) {
            return Err(ConfigError::InvalidSmileAttenuation(self.smile_attenuation));
        }
        if !(self.mouth_open_gain.is_finite() && self.mouth_open_gain >= 0.0) {
            return Err(ConfigError::InvalidMouthGain(self.mouth_open_gain));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("speech rate must be a finite number > 0, got {0}")]
    InvalidRate(f64),
    #[error("blink duration must be > 0 and intervals >= 0")]
    InvalidBlink,
    #[error("blend rates must be finite and > 0")]
    InvalidBlendRate,
    #[error("smile attenuation must be within [0, 1], got {0}")]
    InvalidSmileAttenuation(f32),
    #[error("mouth open gain must be finite and >= 0, got {0}")]
    InvalidMouthGain(f32),
    #[error("unknown mood: {0}")]
    UnknownMood(String),
    #[error("invalid value for {key}: {value}")]
    InvalidEnvValue { key: String, value: String },
    #[error("failed to read config {path}: {details}")]
    Read { path: String, details: String },
    #[error("invalid config: {0}")]
    Parse(String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// CLI value, then environment, then `fallback`.
pub fn resolve_speech_rate(
    cli_value: Option<f64>,
    env: &impl Env,
    fallback: SpeechRate,
) -> Result<SpeechRate, ConfigError> {
    match cli_value {
        Some(v) => SpeechRate::new(v),
        None => match env.var(ENV_SPEECH_RATE) {
            Some(raw) => {
                let v = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidEnvValue {
                        key: ENV_SPEECH_RATE.to_owned(),
                        value: raw.clone(),
                    })?;
                SpeechRate::new(v)
            }
            None => Ok(fallback),
        },
    }
}

pub fn resolve_seed(
    cli_value: Option<u64>,
    env: &impl Env,
    fallback: Option<u64>,
) -> Result<Option<u64>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(v)),
        None => match env.var(ENV_BLINK_SEED) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnvValue {
                    key: ENV_BLINK_SEED.to_owned(),
                    value: raw,
                }),
            None => Ok(fallback),
        },
    }
}
