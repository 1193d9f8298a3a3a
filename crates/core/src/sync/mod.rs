//! Shared speech synchronization state.
//!
//! The orchestrator owns the only [`SyncWriter`]; the per-frame animation
//! driver owns the only [`SyncReader`]. Neither half is `Clone`, so the
//! single-writer / single-reader contract is enforced by the type system.
//! The state itself sits behind a mutex so the two halves may live on
//! different threads.

use crate::viseme::{resolve, Timeline, Viseme};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

const LOG_TARGET: &str = "sync";

/// Monotonic time source in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for tests and offline rendering.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: f64) {
        *lock_recovering(&self.now) = now;
    }

    pub fn advance(&self, secs: f64) {
        *lock_recovering(&self.now) += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *lock_recovering(&self.now)
    }
}

/// Playback position of the audio actually being heard.
pub trait AudioClock: Send + Sync {
    /// Seconds from the start of the clip.
    fn position(&self) -> f64;
    fn is_playing(&self) -> bool;
}

/// Where an elapsed-time sample came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElapsedSource {
    AudioClock,
    WallClock,
}

/// What the reader sees for one frame while synchronization is active.
#[derive(Clone, Debug)]
pub struct SyncSample {
    pub timeline: Arc<Timeline>,
    pub elapsed: f64,
    pub source: ElapsedSource,
}

impl SyncSample {
    pub fn viseme(&self) -> Viseme {
        resolve(&self.timeline, self.elapsed)
    }
}

#[derive(Default)]
struct SyncState {
    timeline: Arc<Timeline>,
    char_times: Option<Vec<f64>>,
    start_time: f64,
    active: bool,
    audio: Option<Arc<dyn AudioClock>>,
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(target: LOG_TARGET, "sync state lock was poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

/// Creates the writer/reader pair over a fresh, inactive state.
pub fn channel(clock: Arc<dyn Clock>) -> (SyncWriter, SyncReader) {
    let state = Arc::new(Mutex::new(SyncState::default()));
    (
        SyncWriter {
            state: Arc::clone(&state),
            clock: Arc::clone(&clock),
        },
        SyncReader { state, clock },
    )
}

/// Orchestrator side: activates, recalibrates and deactivates.
pub struct SyncWriter {
    state: Arc<Mutex<SyncState>>,
    clock: Arc<dyn Clock>,
}

impl SyncWriter {
    /// Starts synchronizing `timeline` from now.
    ///
    /// `char_times` enables boundary recalibration; `audio` switches elapsed
    /// time to the audio clock whenever it reports playing. Any previous
    /// utterance is replaced.
    pub fn activate(
        &mut self,
        timeline: Timeline,
        char_times: Option<Vec<f64>>,
        audio: Option<Arc<dyn AudioClock>>,
    ) {
        let now = self.clock.now();
        let mut state = lock_recovering(&self.state);
        tracing::debug!(
            target: LOG_TARGET,
            events = timeline.len(),
            total_duration = timeline.total_duration(),
            audio_clock = audio.is_some(),
            "sync activated"
        );
        state.timeline = Arc::new(timeline);
        state.char_times = char_times;
        state.start_time = now;
        state.audio = audio;
        state.active = true;
    }

    /// Resets the wall-clock origin to now, e.g. when audio actually starts.
    pub fn restart_clock(&mut self) {
        let now = self.clock.now();
        let mut state = lock_recovering(&self.state);
        if state.active {
            state.start_time = now;
        }
    }

    /// Aligns the wall clock with a boundary event at `char_index`.
    ///
    /// Returns `false` when inactive, when no per-character times exist, or
    /// when the index is out of range; the state is left untouched then.
    pub fn recalibrate(&mut self, char_index: usize) -> bool {
        let now = self.clock.now();
        let mut state = lock_recovering(&self.state);
        if !state.active {
            return false;
        }
        let Some(offset) = state
            .char_times
            .as_ref()
            .and_then(|times| times.get(char_index).copied())
        else {
            tracing::debug!(target: LOG_TARGET, char_index, "boundary ignored");
            return false;
        };

        let drift = (now - state.start_time) - offset;
        state.start_time = now - offset;
        tracing::trace!(target: LOG_TARGET, char_index, offset, drift, "sync recalibrated");
        true
    }

    /// Stops synchronization and drops the audio handle.
    pub fn deactivate(&mut self) {
        let mut state = lock_recovering(&self.state);
        if state.active {
            tracing::debug!(target: LOG_TARGET, "sync deactivated");
        }
        state.active = false;
        state.audio = None;
    }

    pub fn is_active(&self) -> bool {
        lock_recovering(&self.state).active
    }
}

/// Frame-driver side: samples the active timeline and elapsed time.
pub struct SyncReader {
    state: Arc<Mutex<SyncState>>,
    clock: Arc<dyn Clock>,
}

impl SyncReader {
    /// `None` while inactive; resolving a viseme is not allowed then.
    pub fn sample(&self) -> Option<SyncSample> {
        let now = self.clock.now();
        let state = lock_recovering(&self.state);
        if !state.active {
            return None;
        }

        let (elapsed, source) = match state.audio.as_ref().filter(|a| a.is_playing()) {
            Some(audio) => (audio.position(), ElapsedSource::AudioClock),
            None => (now - state.start_time, ElapsedSource::WallClock),
        };

        Some(SyncSample {
            timeline: Arc::clone(&state.timeline),
            elapsed,
            source,
        })
    }

    pub fn is_active(&self) -> bool {
        lock_recovering(&self.state).active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::compile;

    struct FakeAudio {
        position: Mutex<f64>,
        playing: Mutex<bool>,
    }

    impl FakeAudio {
        fn new(position: f64, playing: bool) -> Self {
            Self {
                position: Mutex::new(position),
                playing: Mutex::new(playing),
            }
        }
    }

    impl AudioClock for FakeAudio {
        fn position(&self) -> f64 {
            *self.position.lock().unwrap()
        }

        fn is_playing(&self) -> bool {
            *self.playing.lock().unwrap()
        }
    }

    fn setup(start: f64) -> (Arc<ManualClock>, SyncWriter, SyncReader) {
        let clock = Arc::new(ManualClock::new(start));
        let (w, r) = channel(clock.clone());
        (clock, w, r)
    }

    #[test]
    fn starts_inactive() {
        let (_clock, writer, reader) = setup(0.0);
        assert!(!writer.is_active());
        assert!(reader.sample().is_none());
    }

    #[test]
    fn wall_clock_elapsed_from_activation() {
        let (clock, mut writer, reader) = setup(5.0);
        writer.activate(compile("hello", 1.0).timeline, None, None);
        clock.advance(0.25);

        let sample = reader.sample().expect("active");
        assert_eq!(sample.source, ElapsedSource::WallClock);
        assert!((sample.elapsed - 0.25).abs() < 1e-9);
    }

    #[test]
    fn boundary_recalibrates_wall_clock() {
        let (clock, mut writer, reader) = setup(100.0);
        let mut char_times = vec![0.0; 10];
        char_times[5] = 0.42;
        writer.activate(Timeline::empty(), Some(char_times), None);

        clock.set(103.0);
        assert!(writer.recalibrate(5));
        clock.advance(0.1);

        let sample = reader.sample().expect("active");
        assert!((sample.elapsed - 0.52).abs() < 1e-9);
    }

    #[test]
    fn recalibration_ignored_without_map_or_in_range_index() {
        let (clock, mut writer, reader) = setup(0.0);
        writer.activate(Timeline::empty(), None, None);
        clock.advance(1.0);
        assert!(!writer.recalibrate(0));

        writer.activate(Timeline::empty(), Some(vec![0.0, 0.1]), None);
        assert!(!writer.recalibrate(7));
        clock.advance(0.5);
        assert!((reader.sample().expect("active").elapsed - 0.5).abs() < 1e-9);

        writer.deactivate();
        assert!(!writer.recalibrate(1));
    }

    #[test]
    fn playing_audio_clock_wins() {
        let (clock, mut writer, reader) = setup(0.0);
        let audio = Arc::new(FakeAudio::new(1.25, true));
        writer.activate(Timeline::empty(), None, Some(audio.clone()));
        clock.advance(9.0);

        let sample = reader.sample().expect("active");
        assert_eq!(sample.source, ElapsedSource::AudioClock);
        assert_eq!(sample.elapsed, 1.25);

        *audio.playing.lock().unwrap() = false;
        let sample = reader.sample().expect("active");
        assert_eq!(sample.source, ElapsedSource::WallClock);
        assert!((sample.elapsed - 9.0).abs() < 1e-9);
    }

    #[test]
    fn deactivate_drops_audio_and_stops_sampling() {
        let (_clock, mut writer, reader) = setup(0.0);
        let audio = Arc::new(FakeAudio::new(0.5, true));
        writer.activate(Timeline::empty(), None, Some(audio.clone()));
        writer.deactivate();

        assert!(reader.sample().is_none());
        assert_eq!(Arc::strong_count(&audio), 1);
    }

    #[test]
    fn restart_clock_moves_origin() {
        let (clock, mut writer, reader) = setup(0.0);
        writer.activate(Timeline::empty(), None, None);
        clock.advance(2.0);
        writer.restart_clock();
        clock.advance(0.3);
        assert!((reader.sample().expect("active").elapsed - 0.3).abs() < 1e-9);
    }

    #[test]
    fn sample_resolves_viseme() {
        let (clock, mut writer, reader) = setup(0.0);
        writer.activate(compile("a", 1.0).timeline, None, None);
        clock.advance(0.01);
        assert_eq!(reader.sample().expect("active").viseme(), Viseme::Aa);
    }
}
