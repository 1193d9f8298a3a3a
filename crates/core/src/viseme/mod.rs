//! Viseme vocabulary and the timelines built from it.
//!
//! A [`Timeline`] is an ordered, non-overlapping run of [`VisemeEvent`]s for a
//! single utterance. Both builders ([`compile`] for plain text and
//! [`build_from_alignment`] for provider alignment data) go through the same
//! insertion path, so the runtime [`resolve`] never needs to know where a
//! timeline came from.

mod alignment;
mod compiler;
mod resolver;

use serde::{Deserialize, Serialize};

pub use alignment::{build_from_alignment, Alignment};
pub use compiler::{compile, CompiledTimeline, BASE_PHONEME_SECS};
pub use resolver::resolve;

/// Discrete mouth shape. Labels follow the Oculus/Ready Player Me viseme set.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Viseme {
    #[default]
    #[serde(rename = "sil")]
    Silence,
    PP,
    FF,
    TH,
    DD,
    #[serde(rename = "kk")]
    Kk,
    CH,
    SS,
    #[serde(rename = "nn")]
    Nn,
    RR,
    #[serde(rename = "aa")]
    Aa,
    E,
    I,
    O,
    U,
}

impl Viseme {
    pub const COUNT: usize = 15;

    pub const ALL: [Viseme; Viseme::COUNT] = [
        Viseme::Silence,
        Viseme::PP,
        Viseme::FF,
        Viseme::TH,
        Viseme::DD,
        Viseme::Kk,
        Viseme::CH,
        Viseme::SS,
        Viseme::Nn,
        Viseme::RR,
        Viseme::Aa,
        Viseme::E,
        Viseme::I,
        Viseme::O,
        Viseme::U,
    ];

    /// Position in [`Viseme::ALL`]; used to index per-viseme channel arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Viseme::Silence => "sil",
            Viseme::PP => "PP",
            Viseme::FF => "FF",
            Viseme::TH => "TH",
            Viseme::DD => "DD",
            Viseme::Kk => "kk",
            Viseme::CH => "CH",
            Viseme::SS => "SS",
            Viseme::Nn => "nn",
            Viseme::RR => "RR",
            Viseme::Aa => "aa",
            Viseme::E => "E",
            Viseme::I => "I",
            Viseme::O => "O",
            Viseme::U => "U",
        }
    }

    /// Morph target name a rig exposes for this shape, e.g. `viseme_aa`.
    pub fn morph_target(self) -> String {
        format!("viseme_{}", self.label())
    }

    pub fn is_silence(self) -> bool {
        self == Viseme::Silence
    }
}

const DIGRAPHS: &[(&str, Viseme)] = &[
    ("th", Viseme::TH),
    ("sh", Viseme::CH),
    ("ch", Viseme::CH),
    ("ph", Viseme::FF),
    ("wh", Viseme::U),
    ("ck", Viseme::Kk),
    ("ng", Viseme::Kk),
    ("qu", Viseme::Kk),
    ("ee", Viseme::I),
    ("ea", Viseme::I),
    ("ey", Viseme::I),
    ("ie", Viseme::I),
    ("oo", Viseme::U),
    ("ou", Viseme::Aa),
    ("ow", Viseme::Aa),
    ("ai", Viseme::E),
    ("ay", Viseme::E),
    ("ei", Viseme::E),
    ("oi", Viseme::O),
    ("oy", Viseme::O),
];

fn letter_viseme(c: char) -> Viseme {
    match c {
        'a' => Viseme::Aa,
        'e' => Viseme::E,
        'i' => Viseme::I,
        'o' => Viseme::O,
        'u' => Viseme::U,
        'p' | 'b' | 'm' => Viseme::PP,
        'f' | 'v' => Viseme::FF,
        't' | 'd' => Viseme::DD,
        'k' | 'g' | 'c' | 'q' | 'x' => Viseme::Kk,
        's' | 'z' => Viseme::SS,
        'n' | 'l' => Viseme::Nn,
        'r' => Viseme::RR,
        'j' => Viseme::CH,
        'y' => Viseme::I,
        'w' => Viseme::U,
        _ => Viseme::Silence,
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_lowercase()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Maps the letter at the cursor, preferring a digraph with `next`.
///
/// Returns the viseme and how many characters it consumed (1 or 2). Both
/// arguments must already be lowercased.
fn match_letters(current: char, next: Option<char>) -> (Viseme, usize) {
    if let Some(next) = next.filter(|c| is_letter(*c)) {
        let found = DIGRAPHS.iter().find(|(pair, _)| {
            let mut chars = pair.chars();
            chars.next() == Some(current) && chars.next() == Some(next)
        });
        if let Some((_, viseme)) = found {
            return (*viseme, 2);
        }
    }
    (letter_viseme(current), 1)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error(
        "alignment arrays differ in length: {characters} characters, {starts} start times, {ends} end times"
    )]
    InvalidInput {
        characters: usize,
        starts: usize,
        ends: usize,
    },
    #[error("malformed alignment payload: {details}")]
    MalformedAlignment { details: String },
}

/// One mouth shape held for `duration` seconds starting at `time`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VisemeEvent {
    pub viseme: Viseme,
    /// Seconds from utterance start.
    pub time: f64,
    pub duration: f64,
}

impl VisemeEvent {
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }

    pub fn contains(&self, elapsed: f64) -> bool {
        elapsed >= self.time && elapsed < self.end()
    }
}

/// Immutable viseme sequence for one utterance.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Timeline {
    events: Vec<VisemeEvent>,
    total_duration: f64,
}

impl Timeline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[VisemeEvent] {
        &self.events
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Insertion path shared by both timeline builders.
///
/// Keeps events ordered, non-overlapping and merged: a shape equal to the
/// previous one extends it to the new end instead of starting a new event.
#[derive(Debug, Default)]
struct TimelineBuilder {
    events: Vec<VisemeEvent>,
}

impl TimelineBuilder {
    fn push(&mut self, viseme: Viseme, time: f64, duration: f64) {
        let duration = duration.max(0.0);
        let end = time + duration;

        if let Some(last) = self.events.last_mut() {
            if last.viseme == viseme {
                last.duration = last.duration.max(end - last.time);
                return;
            }

            // Provider timings may overlap; never start before the previous end.
            let floor = last.end();
            if time < floor {
                self.events.push(VisemeEvent {
                    viseme,
                    time: floor,
                    duration: (end - floor).max(0.0),
                });
                return;
            }
        }

        self.events.push(VisemeEvent {
            viseme,
            time,
            duration,
        });
    }

    fn finish(self, total_duration: f64) -> Timeline {
        let last_end = self.events.last().map(VisemeEvent::end).unwrap_or(0.0);
        Timeline {
            events: self.events,
            total_duration: total_duration.max(last_end),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EPS: f64 = 1e-9;

    pub(crate) fn assert_well_formed(timeline: &Timeline) {
        for pair in timeline.events().windows(2) {
            assert!(
                pair[0].end() <= pair[1].time + EPS,
                "overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
            assert_ne!(pair[0].viseme, pair[1].viseme, "unmerged neighbours");
        }
        if let Some(last) = timeline.events().last() {
            assert!(timeline.total_duration() + EPS >= last.end());
        }
    }

    #[test]
    fn digraph_wins_over_single_letter() {
        assert_eq!(match_letters('t', Some('h')), (Viseme::TH, 2));
        assert_eq!(match_letters('o', Some('u')), (Viseme::Aa, 2));
        assert_eq!(match_letters('t', Some('a')), (Viseme::DD, 1));
        assert_eq!(match_letters('t', Some(' ')), (Viseme::DD, 1));
        assert_eq!(match_letters('h', None), (Viseme::Silence, 1));
    }

    #[test]
    fn viseme_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Viseme::Kk).expect("serialize");
        assert_eq!(json, "\"kk\"");
        let back: Viseme = serde_json::from_str("\"sil\"").expect("deserialize");
        assert_eq!(back, Viseme::Silence);
    }

    #[test]
    fn built_timeline_serializes_events_and_total() {
        let mut b = TimelineBuilder::default();
        b.push(Viseme::Aa, 0.0, 0.5);
        let json = serde_json::to_value(b.finish(1.0)).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "events": [{ "viseme": "aa", "time": 0.0, "duration": 0.5 }],
                "total_duration": 1.0,
            })
        );
    }

    #[test]
    fn index_matches_all_order() {
        for (i, v) in Viseme::ALL.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
        assert_eq!(Viseme::Aa.morph_target(), "viseme_aa");
    }

    #[test]
    fn builder_merges_and_clamps_overlaps() {
        let mut b = TimelineBuilder::default();
        b.push(Viseme::Aa, 0.0, 0.2);
        b.push(Viseme::Aa, 0.2, 0.1);
        b.push(Viseme::PP, 0.25, 0.1);
        b.push(Viseme::Silence, 0.5, -1.0);
        let timeline = b.finish(0.0);

        assert_eq!(timeline.len(), 3);
        assert!((timeline.events()[0].duration - 0.3).abs() < EPS);
        assert!((timeline.events()[1].time - 0.3).abs() < EPS);
        assert!((timeline.events()[1].duration - 0.05).abs() < EPS);
        assert_eq!(timeline.events()[2].duration, 0.0);
        assert!((timeline.total_duration() - 0.5).abs() < EPS);
        assert_well_formed(&timeline);
    }
}
