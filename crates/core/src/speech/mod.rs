//! Speech-engine seam and the orchestrator that keeps the face in sync.

mod simulated;
mod speaker;

use crate::config::SpeechRate;
use crate::sync::AudioClock;
use crate::utterance::Utterance;
use crate::viseme::Alignment;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use simulated::SimulatedSpeech;
pub use speaker::{SpeakReport, Speaker, SpeakerStatus};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Audio could not be fetched right now; worth retrying.
    #[error("speech audio unavailable: {details}")]
    Unavailable { details: String },

    #[error("playback failed: {details}")]
    Failed { details: String },

    #[error("playback cancelled")]
    Cancelled,
}

impl PlaybackError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::Unavailable { .. })
    }
}

/// Notifications a speech engine emits while an utterance plays.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    /// Audio became audible.
    Started,
    /// The engine reached the word or character at `char_index`.
    Boundary { char_index: usize },
    Ended,
    Failed { details: String },
}

/// Audio ready to play, with whatever timing the provider returned.
pub struct PreparedSpeech {
    pub utterance: Utterance,
    pub rate: SpeechRate,
    pub alignment: Option<Alignment>,
    pub audio: Option<Arc<dyn AudioClock>>,
}

impl PreparedSpeech {
    pub fn new(utterance: Utterance, rate: SpeechRate) -> Self {
        Self {
            utterance,
            rate,
            alignment: None,
            audio: None,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioClock>) -> Self {
        self.audio = Some(audio);
        self
    }
}

pub trait SpeechPlayer: Send + Sync {
    /// Fetches or synthesizes audio for one utterance.
    fn prepare<'a>(
        &'a self,
        utterance: &'a Utterance,
        rate: SpeechRate,
    ) -> BoxFuture<'a, Result<PreparedSpeech, PlaybackError>>;

    /// Plays to completion, reporting progress on `events`.
    fn play(
        &self,
        speech: PreparedSpeech,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> BoxFuture<'_, Result<(), PlaybackError>>;
}
