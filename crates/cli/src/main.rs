#![deny(warnings)]

use anyhow::Context;
use avatar_lipsync_core::animation::{AnimationDriver, MorphTargetRig};
use avatar_lipsync_core::config::{
    resolve_seed, resolve_speech_rate, AnimationConfig, Env, StdEnv, DEFAULT_FPS,
};
use avatar_lipsync_core::speech::{SimulatedSpeech, Speaker};
use avatar_lipsync_core::sync::{self, SystemClock};
use avatar_lipsync_core::utterance::{normalize, Utterance};
use avatar_lipsync_core::viseme::{compile, Alignment, Timeline};
use clap::Parser;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avatar-lipsync")]
#[command(about = "Drive an avatar face from speech text (viseme timeline + blend driver)")]
struct Args {
    /// Text to speak; may contain `[mood]` tags.
    #[arg(long)]
    text: String,

    /// Speech rate multiplier (1.0 = normal).
    #[arg(long)]
    rate: Option<f64>,

    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,

    /// JSON alignment payload to build the timeline from (with --dump-timeline).
    #[arg(long)]
    alignment: Option<PathBuf>,

    /// JSON animation config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blink RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// How much slower (>1) or faster (<1) the simulated engine speaks than estimated.
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,

    /// Print timelines as JSON and exit.
    #[arg(long, default_value_t = false)]
    dump_timeline: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;
    let utterances = normalize(&args.text);

    tracing::info!(
        utterances = utterances.len(),
        rate = cfg.speech_rate.get(),
        fps = args.fps,
        "config loaded"
    );

    if args.dump_timeline {
        return dump_timelines(&utterances, &cfg, args.alignment.as_ref());
    }

    run_session(utterances, cfg, args.fps, args.time_scale).await
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<AnimationConfig> {
    let mut cfg = match &args.config {
        Some(path) => AnimationConfig::load(path)?,
        None => AnimationConfig::default(),
    };
    cfg.speech_rate = resolve_speech_rate(args.rate, env, cfg.speech_rate)?;
    cfg.seed = resolve_seed(args.seed, env, cfg.seed)?;
    if args.fps == 0 {
        anyhow::bail!("--fps must be > 0");
    }
    Ok(cfg)
}

fn dump_timelines(
    utterances: &[Utterance],
    cfg: &AnimationConfig,
    alignment: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let out = match alignment {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading alignment {}", path.display()))?;
            let timeline: Timeline = Alignment::from_json(&raw)?.to_timeline()?;
            json!([{ "source": path.display().to_string(), "timeline": timeline }])
        }
        None => {
            let items: Vec<_> = utterances
                .iter()
                .map(|u| {
                    let compiled = compile(&u.text, cfg.speech_rate.get());
                    json!({
                        "text": u.text,
                        "mood": u.mood,
                        "timeline": compiled.timeline,
                        "char_times": compiled.char_times,
                    })
                })
                .collect();
            json!(items)
        }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[derive(Debug, Default)]
struct UtteranceStats {
    frames: usize,
    peak_jaw: f32,
    visemes: BTreeMap<&'static str, usize>,
}

async fn run_session(
    utterances: Vec<Utterance>,
    cfg: AnimationConfig,
    fps: u32,
    time_scale: f64,
) -> anyhow::Result<()> {
    let clock = Arc::new(SystemClock::new());
    let (writer, reader) = sync::channel(clock);
    let mut driver = AnimationDriver::new(MorphTargetRig::ready_player_me(), reader, &cfg);

    let player = SimulatedSpeech::new().with_time_scale(time_scale);
    let mut speaker = Speaker::new(player, writer, cfg.speech_rate);
    let status = speaker.subscribe();
    let mut speaking = tokio::spawn(async move { speaker.speak_all(&utterances).await });

    let frame = Duration::from_secs_f64(1.0 / f64::from(fps));
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut stats: BTreeMap<usize, UtteranceStats> = BTreeMap::new();

    let report = loop {
        tokio::select! {
            done = &mut speaking => break done.context("speaker task panicked")?,
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;

                let current = *status.borrow();
                driver.set_mood(current.mood);
                driver.set_speaking(current.speaking);
                let out = driver.tick(dt);

                if let Some(index) = current.utterance {
                    let entry = stats.entry(index).or_default();
                    entry.frames += 1;
                    entry.peak_jaw = entry.peak_jaw.max(out.jaw_open);
                    if let Some(v) = out.viseme {
                        *entry.visemes.entry(v.label()).or_default() += 1;
                    }
                }
            }
        }
    };

    // let channels settle after the last utterance
    let settle_frames = fps / 2;
    for _ in 0..settle_frames {
        ticker.tick().await;
        let now = Instant::now();
        driver.tick(now.duration_since(last).as_secs_f64());
        last = now;
    }

    for (index, s) in &stats {
        tracing::info!(
            utterance = index,
            frames = s.frames,
            peak_jaw = s.peak_jaw,
            visemes = ?s.visemes,
            "utterance animated"
        );
    }
    for (index, error) in &report.failed {
        tracing::warn!(utterance = index, error = %error, "utterance failed");
    }

    let residual = driver.channels().jaw_open;
    tracing::info!(
        spoken = report.spoken,
        failed = report.failed.len(),
        residual_jaw = residual,
        session_secs = driver.session_time(),
        "session finished"
    );
    Ok(())
}
