use super::{is_letter, is_vowel, match_letters, Timeline, TimelineBuilder, Viseme};
use serde::Serialize;

/// Seconds per phoneme at speech rate 1.0.
pub const BASE_PHONEME_SECS: f64 = 0.06;

const SPACE_PAUSE: f64 = 0.5;
const CLAUSE_PAUSE: f64 = 4.0;
const SENTENCE_PAUSE: f64 = 6.0;
const VOWEL_STRETCH: f64 = 1.3;

/// Output of [`compile`]: the timeline plus the start time of every input
/// character, used to recalibrate the wall clock on boundary events.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct CompiledTimeline {
    pub timeline: Timeline,
    /// Indexed by `char` position in the source text.
    pub char_times: Vec<f64>,
}

/// Estimates a viseme timeline for `text` spoken at `rate` (1.0 = normal).
///
/// The mapping is grapheme based and deterministic. A non-positive or
/// non-finite rate is treated as 1.0.
pub fn compile(text: &str, rate: f64) -> CompiledTimeline {
    let rate = if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        tracing::warn!(rate, "invalid speech rate, using 1.0");
        1.0
    };
    let base = BASE_PHONEME_SECS / rate;

    let chars: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let mut char_times = vec![0.0; chars.len()];
    let mut builder = TimelineBuilder::default();
    let mut time = 0.0;
    let mut i = 0;

    while i < chars.len() {
        char_times[i] = time;
        let ch = chars[i];

        if !is_letter(ch) {
            let pause = match ch {
                ' ' => base * SPACE_PAUSE,
                ',' | ';' | ':' => base * CLAUSE_PAUSE,
                '.' | '!' | '?' => base * SENTENCE_PAUSE,
                _ => 0.0,
            };
            if pause > 0.0 {
                builder.push(Viseme::Silence, time, pause);
                time += pause;
            }
            i += 1;
            continue;
        }

        let (viseme, step) = match_letters(ch, chars.get(i + 1).copied());
        let duration = if is_vowel(ch) {
            base * VOWEL_STRETCH
        } else {
            base
        };

        builder.push(viseme, time, duration);
        time += duration;

        if step == 2 {
            char_times[i + 1] = time;
        }
        i += step;
    }

    CompiledTimeline {
        timeline: builder.finish(time),
        char_times,
    }
}
