use super::{Timeline, Viseme};

/// Returns the viseme active at `elapsed` seconds into the utterance.
///
/// Anything outside the timeline (before the first event, after the total
/// duration, NaN) resolves to [`Viseme::Silence`].
pub fn resolve(timeline: &Timeline, elapsed: f64) -> Viseme {
    if !(elapsed >= 0.0 && elapsed < timeline.total_duration()) {
        return Viseme::Silence;
    }

    timeline
        .events()
        .iter()
        .find(|event| event.contains(elapsed))
        .map(|event| event.viseme)
        .unwrap_or(Viseme::Silence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::{build_from_alignment, compile};

    #[test]
    fn picks_event_covering_elapsed() {
        let timeline = build_from_alignment(&["a", "b"], &[0.0, 0.1], &[0.1, 0.3]).expect("valid");
        assert_eq!(resolve(&timeline, 0.0), Viseme::Aa);
        assert_eq!(resolve(&timeline, 0.099), Viseme::Aa);
        assert_eq!(resolve(&timeline, 0.1), Viseme::PP);
        assert_eq!(resolve(&timeline, 0.29), Viseme::PP);
    }

    #[test]
    fn outside_and_gaps_are_silence() {
        let timeline =
            build_from_alignment(&["a", "b"], &[0.1, 0.5], &[0.2, 0.6]).expect("valid");
        assert_eq!(resolve(&timeline, 0.05), Viseme::Silence);
        assert_eq!(resolve(&timeline, 0.3), Viseme::Silence);
        assert_eq!(resolve(&timeline, 0.6), Viseme::Silence);
        assert_eq!(resolve(&timeline, 10.0), Viseme::Silence);
    }

    #[test]
    fn total_over_odd_inputs() {
        let timeline = compile("Speak clearly, please.", 1.0).timeline;
        for elapsed in [
            -1.0,
            -0.0,
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::MAX,
            timeline.total_duration(),
        ] {
            let v = resolve(&timeline, elapsed);
            if !(elapsed >= 0.0 && elapsed < timeline.total_duration()) {
                assert_eq!(v, Viseme::Silence, "elapsed {elapsed}");
            }
        }
        assert_eq!(resolve(&Timeline::empty(), 0.0), Viseme::Silence);
    }
}
