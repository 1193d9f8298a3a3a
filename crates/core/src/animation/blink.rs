use crate::config::BlinkConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlinkState {
    pub is_blinking: bool,
    pub blink_start_time: f64,
    pub next_blink_time: f64,
}

/// Autonomous eyelid animation, independent of speech.
#[derive(Debug)]
pub struct Blinker {
    state: BlinkState,
    config: BlinkConfig,
    rng: StdRng,
}

impl Blinker {
    pub fn new(config: BlinkConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let first = config.min_interval + rng.random::<f64>() * config.jitter;
        Self {
            state: BlinkState {
                next_blink_time: first,
                ..BlinkState::default()
            },
            config,
            rng,
        }
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    /// Advances to session time `now` and returns the lid closure in `[0, 1]`.
    pub fn update(&mut self, now: f64) -> f32 {
        if !self.state.is_blinking && now > self.state.next_blink_time {
            self.state.is_blinking = true;
            self.state.blink_start_time = now;
            self.state.next_blink_time =
                now + self.config.min_interval + self.rng.random::<f64>() * self.config.jitter;
        }

        if !self.state.is_blinking {
            return 0.0;
        }

        let progress = (now - self.state.blink_start_time) / self.config.duration;
        if progress >= 1.0 {
            self.state.is_blinking = false;
            return 0.0;
        }
        ((progress * PI).sin() as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blinker(jitter: f64) -> Blinker {
        Blinker::new(
            BlinkConfig {
                duration: 0.15,
                min_interval: 2.0,
                jitter,
            },
            Some(7),
        )
    }

    #[test]
    fn first_blink_within_interval() {
        for seed in 0..32 {
            let b = Blinker::new(BlinkConfig::default(), Some(seed));
            let next = b.state().next_blink_time;
            assert!((2.0..6.0).contains(&next), "seed {seed}: {next}");
        }
    }

    #[test]
    fn blink_rises_and_falls() {
        let mut b = blinker(0.0);
        assert_eq!(b.update(1.0), 0.0);

        assert_eq!(b.update(2.01), 0.0);
        assert!(b.state().is_blinking);

        let mid = b.update(2.01 + 0.075);
        assert!((mid - 1.0).abs() < 1e-3, "mid blink {mid}");

        let late = b.update(2.01 + 0.14);
        assert!(late > 0.0 && late < mid);

        assert_eq!(b.update(2.01 + 0.2), 0.0);
        assert!(!b.state().is_blinking);
    }

    #[test]
    fn next_blink_scheduled_at_start() {
        let mut b = blinker(4.0);
        let first = b.state().next_blink_time;
        let start = first + 0.001;
        b.update(start);

        let next = b.state().next_blink_time;
        assert!(next >= start + 2.0 && next < start + 6.0);
    }

    #[test]
    fn seeded_blinkers_agree() {
        let mut a = blinker(4.0);
        let mut b = blinker(4.0);
        for i in 0..2_000 {
            let t = f64::from(i) * 0.016;
            assert_eq!(a.update(t), b.update(t));
        }
    }
}
