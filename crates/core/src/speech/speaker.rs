use crate::animation::Mood;
use crate::config::SpeechRate;
use crate::speech::{PlaybackError, SpeechEvent, SpeechPlayer};
use crate::sync::SyncWriter;
use crate::util::{retry_with_backoff, RetryConfig};
use crate::utterance::Utterance;
use crate::viseme::{compile, Timeline};
use tokio::sync::{mpsc, watch};

const LOG_TARGET: &str = "speech::speaker";

/// What the face should show right now, published for the frame loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeakerStatus {
    pub mood: Mood,
    pub speaking: bool,
    /// Index of the utterance being spoken.
    pub utterance: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeakReport {
    pub spoken: usize,
    pub failed: Vec<(usize, PlaybackError)>,
}

/// Plays utterances one at a time and drives the sync writer around them.
///
/// At most one utterance is active; the next starts only after the previous
/// one has been deactivated, whether it ended or failed.
pub struct Speaker<P> {
    player: P,
    writer: SyncWriter,
    rate: SpeechRate,
    retry: RetryConfig,
    status: watch::Sender<SpeakerStatus>,
}

impl<P: SpeechPlayer> Speaker<P> {
    pub fn new(player: P, writer: SyncWriter, rate: SpeechRate) -> Self {
        let (status, _) = watch::channel(SpeakerStatus::default());
        Self {
            player,
            writer,
            rate,
            retry: RetryConfig::default(),
            status,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeakerStatus> {
        self.status.subscribe()
    }

    /// Speaks every utterance in order; failures are reported, not fatal.
    pub async fn speak_all(&mut self, utterances: &[Utterance]) -> SpeakReport {
        let mut report = SpeakReport::default();
        for (index, utterance) in utterances.iter().enumerate() {
            match self.speak(index, utterance).await {
                Ok(()) => report.spoken += 1,
                Err(e) => report.failed.push((index, e)),
            }
        }
        report
    }

    pub async fn speak(
        &mut self,
        index: usize,
        utterance: &Utterance,
    ) -> Result<(), PlaybackError> {
        let rate = self.rate;
        let player = &self.player;
        let prepared = retry_with_backoff(
            &self.retry,
            || player.prepare(utterance, rate),
            PlaybackError::is_transient,
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(target: LOG_TARGET, utterance = index, error = %e, "speech fetch failed");
        })?;

        let (timeline, char_times) =
            build_timeline(index, utterance, rate, prepared.alignment.as_ref());
        tracing::debug!(
            target: LOG_TARGET,
            utterance = index,
            mood = %utterance.mood,
            events = timeline.len(),
            aligned = char_times.is_none(),
            "speaking"
        );

        self.writer.activate(timeline, char_times, prepared.audio.clone());
        self.status.send_replace(SpeakerStatus {
            mood: utterance.mood,
            speaking: true,
            utterance: Some(index),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let Self { player, writer, .. } = self;
        let (result, ()) = tokio::join!(
            player.play(prepared, tx),
            follow_events(index, writer, rx)
        );

        writer.deactivate();
        self.status.send_modify(|s| {
            s.speaking = false;
            s.utterance = None;
        });

        result.inspect_err(|e| {
            tracing::warn!(target: LOG_TARGET, utterance = index, error = %e, "playback failed");
        })
    }
}

/// Provider alignment when present and valid, the text estimate otherwise.
fn build_timeline(
    index: usize,
    utterance: &Utterance,
    rate: SpeechRate,
    alignment: Option<&crate::viseme::Alignment>,
) -> (Timeline, Option<Vec<f64>>) {
    if let Some(alignment) = alignment {
        match alignment.to_timeline() {
            Ok(timeline) => return (timeline, None),
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    utterance = index,
                    error = %e,
                    "unusable alignment, estimating from text"
                );
            }
        }
    }
    let compiled = compile(&utterance.text, rate.get());
    (compiled.timeline, Some(compiled.char_times))
}

async fn follow_events(
    index: usize,
    writer: &mut SyncWriter,
    mut events: mpsc::UnboundedReceiver<SpeechEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SpeechEvent::Started => writer.restart_clock(),
            SpeechEvent::Boundary { char_index } => {
                writer.recalibrate(char_index);
            }
            SpeechEvent::Ended => break,
            SpeechEvent::Failed { details } => {
                tracing::warn!(target: LOG_TARGET, utterance = index, %details, "speech engine error");
                writer.deactivate();
                break;
            }
        }
    }
}
