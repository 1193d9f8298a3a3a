use crate::config::SpeechRate;
use crate::speech::{PlaybackError, PreparedSpeech, SpeechEvent, SpeechPlayer};
use crate::utterance::Utterance;
use crate::viseme::compile;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Wall-clock speech engine with no audio output.
///
/// Speaks at the compiled estimate stretched by `time_scale`, emitting one
/// boundary event per word the way browser speech engines do. A scale other
/// than 1.0 simulates an engine that drifts from the estimate.
#[derive(Clone, Debug)]
pub struct SimulatedSpeech {
    time_scale: f64,
}

impl SimulatedSpeech {
    pub fn new() -> Self {
        Self { time_scale: 1.0 }
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        if time_scale.is_finite() && time_scale > 0.0 {
            self.time_scale = time_scale;
        }
        self
    }
}

impl Default for SimulatedSpeech {
    fn default() -> Self {
        Self::new()
    }
}

/// Indices of characters that start a word.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_space = true;
    for (i, c) in text.chars().enumerate() {
        let space = c.is_whitespace();
        if prev_space && !space {
            starts.push(i);
        }
        prev_space = space;
    }
    starts
}

impl SpeechPlayer for SimulatedSpeech {
    fn prepare<'a>(
        &'a self,
        utterance: &'a Utterance,
        rate: SpeechRate,
    ) -> BoxFuture<'a, Result<PreparedSpeech, PlaybackError>> {
        async move { Ok(PreparedSpeech::new(utterance.clone(), rate)) }.boxed()
    }

    fn play(
        &self,
        speech: PreparedSpeech,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            let compiled = compile(&speech.utterance.text, speech.rate.get());
            let scaled = |secs: f64| Duration::from_secs_f64((secs * self.time_scale).max(0.0));
            let send = |event| {
                events
                    .send(event)
                    .map_err(|_| PlaybackError::Cancelled)
            };

            let origin = Instant::now();
            send(SpeechEvent::Started)?;

            for index in word_starts(&speech.utterance.text) {
                let at = compiled.char_times.get(index).copied().unwrap_or(0.0);
                sleep_until(origin + scaled(at)).await;
                send(SpeechEvent::Boundary { char_index: index })?;
            }

            sleep_until(origin + scaled(compiled.timeline.total_duration())).await;
            send(SpeechEvent::Ended)?;
            Ok(())
        }
        .boxed()
    }
}
