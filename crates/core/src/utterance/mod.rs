//! Turns chat replies into speakable, mood-tagged sentences.

mod analyzer;

use crate::animation::Mood;
use serde::{Deserialize, Serialize};

pub use analyzer::{KeywordMoodAnalyzer, MoodAnalyzer};

/// One sentence handed to the speech engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub mood: Mood,
}

fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim_start().trim_start_matches('#');
        let line = line
            .trim_start()
            .strip_prefix("- ")
            .unwrap_or(line.trim_start());
        out.extend(line.chars().filter(|c| !matches!(c, '*' | '_' | '`' | '~')));
        out.push(' ');
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // keep runs like "?!" or "..." in the same sentence
            while let Some(&next) = chars.peek() {
                if !matches!(next, '.' | '!' | '?') {
                    break;
                }
                current.push(next);
                chars.next();
            }
            let done = current.trim().to_owned();
            if !done.is_empty() {
                sentences.push(done);
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_owned());
    }
    sentences
}

/// Splits a leading `[mood]` tag off a sentence, if it names a known mood.
fn take_mood_tag(sentence: &str) -> (Option<Mood>, &str) {
    let Some(rest) = sentence.strip_prefix('[') else {
        return (None, sentence);
    };
    let Some((tag, after)) = rest.split_once(']') else {
        return (None, sentence);
    };
    match tag.parse::<Mood>() {
        Ok(mood) => (Some(mood), after.trim_start()),
        Err(_) => (None, sentence),
    }
}

/// Normalizes `text` into sentences tagged with a mood.
///
/// A tag applies to its own sentence only; untagged sentences go through
/// `analyzer`. Sentences left empty after stripping are dropped.
pub fn normalize_with(text: &str, analyzer: &impl MoodAnalyzer) -> Vec<Utterance> {
    split_sentences(&strip_formatting(text))
        .into_iter()
        .filter_map(|sentence| {
            let (tagged, body) = take_mood_tag(&sentence);
            let body = body.trim();
            if !body.chars().any(char::is_alphanumeric) {
                return None;
            }
            let mood = tagged.unwrap_or_else(|| analyzer.analyze(body));
            Some(Utterance {
                text: body.to_owned(),
                mood,
            })
        })
        .collect()
}

pub fn normalize(text: &str) -> Vec<Utterance> {
    normalize_with(text, &KeywordMoodAnalyzer::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_and_keeps_terminators() {
        let out = normalize("Hello there. How are you?! I am fine");
        let texts: Vec<_> = out.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello there.", "How are you?!", "I am fine"]);
    }

    #[test]
    fn strips_markdown() {
        let out = normalize("# Title\n**Bold** and `code` and _italics_.\n- item one");
        let texts: Vec<_> = out.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["Title Bold and code and italics.", "item one"]);
    }

    #[test]
    fn explicit_tag_wins_over_keywords() {
        let out = normalize("[serious] I love this. [happy]Great! [unknown] plain.");
        assert_eq!(out[0].mood, Mood::Serious);
        assert_eq!(out[0].text, "I love this.");
        assert_eq!(out[1].mood, Mood::Happy);
        assert_eq!(out[1].text, "Great!");
        assert_eq!(out[2].mood, Mood::Neutral);
        assert_eq!(out[2].text, "[unknown] plain.");
    }

    #[test]
    fn keyword_mood_when_untagged() {
        let out = normalize("Wow! That is amazing news.");
        assert!(out.iter().all(|u| u.mood == Mood::Surprise));
    }

    #[test]
    fn punctuation_only_input_yields_nothing() {
        assert!(normalize("").is_empty());
        assert!(normalize("  ... !!  ").is_empty());
        assert!(normalize("[happy]").is_empty());
    }
}
