use crate::animation::Mood;

/// Infers a mood for one sentence.
pub trait MoodAnalyzer: Send + Sync {
    fn analyze(&self, sentence: &str) -> Mood;
}

/// Keyword matcher; first matching mood wins, neutral otherwise.
pub struct KeywordMoodAnalyzer {
    keywords: Vec<(Mood, Vec<&'static str>)>,
}

impl KeywordMoodAnalyzer {
    pub fn new() -> Self {
        Self {
            keywords: vec![
                (
                    Mood::Surprise,
                    vec!["wow", "whoa", "amazing", "incredible", "unbelievable", "surpris"],
                ),
                (
                    Mood::Happy,
                    vec!["happy", "glad", "great", "love", "awesome", "wonderful", "joy", "excited"],
                ),
                (
                    Mood::Serious,
                    vec!["sorry", "unfortunately", "important", "warning", "careful", "serious", "sad"],
                ),
            ],
        }
    }
}

impl Default for KeywordMoodAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MoodAnalyzer for KeywordMoodAnalyzer {
    fn analyze(&self, sentence: &str) -> Mood {
        let lower = sentence.to_lowercase();
        self.keywords
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(mood, _)| *mood)
            .unwrap_or(Mood::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_moods() {
        let analyzer = KeywordMoodAnalyzer::new();
        assert_eq!(analyzer.analyze("I am so happy to see you!"), Mood::Happy);
        assert_eq!(analyzer.analyze("Wow, that is a big one."), Mood::Surprise);
        assert_eq!(analyzer.analyze("Unfortunately it broke."), Mood::Serious);
        assert_eq!(analyzer.analyze("The weather is okay today."), Mood::Neutral);
    }

    #[test]
    fn surprise_beats_happy_when_both_match() {
        let analyzer = KeywordMoodAnalyzer::new();
        assert_eq!(analyzer.analyze("Wow, I love it"), Mood::Surprise);
    }
}
