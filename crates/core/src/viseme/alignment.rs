use super::{is_letter, match_letters, Timeline, TimelineBuilder, TimelineError, Viseme};
use serde::{Deserialize, Serialize};

/// Per-character timing returned by TTS providers that support alignment.
///
/// Field names follow the ElevenLabs `with-timestamps` payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Alignment {
    pub characters: Vec<String>,
    #[serde(rename = "character_start_times_seconds")]
    pub start_times: Vec<f64>,
    #[serde(rename = "character_end_times_seconds")]
    pub end_times: Vec<f64>,
}

impl Alignment {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        serde_json::from_str(json).map_err(|e| TimelineError::MalformedAlignment {
            details: e.to_string(),
        })
    }

    pub fn to_timeline(&self) -> Result<Timeline, TimelineError> {
        build_from_alignment(&self.characters, &self.start_times, &self.end_times)
    }
}

fn first_lower(s: &str) -> Option<char> {
    s.chars().next().map(|c| c.to_ascii_lowercase())
}

/// Builds a timeline from provider timestamps instead of estimating them.
///
/// Uses the same letter mapping as [`compile`](super::compile); a digraph's
/// event spans from the first character's start to the second's end. Fails
/// only when the three slices differ in length.
pub fn build_from_alignment<S: AsRef<str>>(
    characters: &[S],
    start_times: &[f64],
    end_times: &[f64],
) -> Result<Timeline, TimelineError> {
    if characters.len() != start_times.len() || characters.len() != end_times.len() {
        return Err(TimelineError::InvalidInput {
            characters: characters.len(),
            starts: start_times.len(),
            ends: end_times.len(),
        });
    }

    let chars: Vec<Option<char>> = characters.iter().map(|s| first_lower(s.as_ref())).collect();
    let mut builder = TimelineBuilder::default();
    let mut i = 0;

    while i < chars.len() {
        let start = start_times[i];
        let ch = match chars[i] {
            Some(c) if is_letter(c) => c,
            _ => {
                let gap = end_times[i] - start;
                if gap > 0.0 {
                    builder.push(Viseme::Silence, start, gap);
                }
                i += 1;
                continue;
            }
        };

        let (viseme, step) = match_letters(ch, chars.get(i + 1).copied().flatten());
        let end = end_times[i + step - 1];
        builder.push(viseme, start, end - start);
        i += step;
    }

    let total = end_times.last().copied().unwrap_or(0.0);
    Ok(builder.finish(total))
}
