//! Lip-sync simulator.
//!
//! Feeds a saved `/chat` reply through the scheduler against a synthetic
//! avatar that exposes every morph target in the blend-shape map, and
//! prints each lip-sync event as one JSON line on stdout. Diagnostics go to
//! stderr so stdout stays machine-readable.
//!
//! ```text
//! lipsync-sim simulate <reply.json> [--audio <file>] [--config <toml>]
//! lipsync-sim play     <reply.json> [--audio <file>] [--config <toml>]
//! lipsync-sim request  <avatar> <text...>
//! lipsync-sim table
//! lipsync-sim avatars
//! ```

use anyhow::{Context, bail};
use lipsync::audio::{SimulatedPlayback, probe_duration_ms};
use lipsync::avatar::MorphMesh;
use lipsync::avatar::catalog::AvatarCatalog;
use lipsync::pipeline::messages::{ChatReply, ChatRequest};
use lipsync::viseme::{VISEME_CLASS_COUNT, VisemeId, all_morph_targets, blend_shapes_for};
use lipsync::{LipSyncConfig, LipSyncCoordinator, LipSyncDriver, LipSyncEvent};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Frames allowed for the mouth to settle after the audio ends.
const MAX_SETTLE_FRAMES: usize = 1_000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lipsync=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("lipsync-sim failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "simulate" => simulate(&ReplyArgs::parse(rest)?),
        "play" => play(&ReplyArgs::parse(rest)?).await,
        "request" => request(rest),
        "table" => table(),
        "avatars" => avatars(),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => bail!("unknown command '{other}' (try --help)"),
    }
}

fn print_usage() {
    eprintln!(
        "usage:\n  \
         lipsync-sim simulate <reply.json> [--audio <file>] [--config <toml>]\n  \
         lipsync-sim play <reply.json> [--audio <file>] [--config <toml>]\n  \
         lipsync-sim request <avatar> <text...>\n  \
         lipsync-sim table\n  \
         lipsync-sim avatars"
    );
}

struct ReplyArgs {
    reply: PathBuf,
    audio: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl ReplyArgs {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut reply = None;
        let mut audio = None;
        let mut config = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--audio" => {
                    let value = iter.next().context("--audio needs a file")?;
                    audio = Some(PathBuf::from(value));
                }
                "--config" => {
                    let value = iter.next().context("--config needs a file")?;
                    config = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => bail!("unknown flag '{flag}'"),
                path if reply.is_none() => reply = Some(PathBuf::from(path)),
                extra => bail!("unexpected argument '{extra}'"),
            }
        }
        Ok(Self {
            reply: reply.context("missing <reply.json>")?,
            audio,
            config,
        })
    }
}

/// Everything a run needs, loaded up front.
struct Session {
    config: LipSyncConfig,
    reply: ChatReply,
    duration_ms: f64,
}

impl Session {
    fn load(args: &ReplyArgs) -> anyhow::Result<Self> {
        let config = load_config(args.config.as_deref())?;
        let body = std::fs::read_to_string(&args.reply)
            .with_context(|| format!("reading {}", args.reply.display()))?;
        let reply = ChatReply::from_json(&body)?;
        let track = reply.track()?;

        let duration_ms = match &args.audio {
            Some(path) => probe_duration_ms(path)?,
            None => track.end_time_ms(config.scheduler.trailing_sustain_ms),
        };
        tracing::info!(
            events = track.len(),
            duration_ms,
            audio_url = %reply.resolve_audio_url(&config.backend.base_url)?,
            "reply loaded"
        );
        Ok(Self {
            config,
            reply,
            duration_ms,
        })
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LipSyncConfig> {
    if let Some(path) = path {
        return Ok(LipSyncConfig::from_file(path)?);
    }
    let default_path = LipSyncConfig::default_config_path();
    if default_path.exists() {
        tracing::info!(path = %default_path.display(), "using config file");
        Ok(LipSyncConfig::from_file(&default_path)?)
    } else {
        Ok(LipSyncConfig::default())
    }
}

/// Head with the full viseme vocabulary, teeth sharing the jaw, and a body
/// with no morph targets.
fn synthetic_avatar() -> Vec<MorphMesh> {
    vec![
        MorphMesh::new("Wolf3D_Head", all_morph_targets()),
        MorphMesh::new("Wolf3D_Teeth", ["jawOpen", "mouthOpen", "tongueOut"]),
        MorphMesh::without_morph_targets("Wolf3D_Body"),
    ]
}

fn print_events(out: &mut impl Write, events: &[LipSyncEvent]) -> anyhow::Result<()> {
    for event in events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    Ok(())
}

/// Offline run on a stepped clock: one frame per `frame_interval_ms`.
fn simulate(args: &ReplyArgs) -> anyhow::Result<()> {
    let session = Session::load(args)?;
    let step_ms = session.config.runner.frame_interval_ms as f64;
    let mut coordinator = LipSyncCoordinator::new(session.config.clone());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    print_events(&mut out, &coordinator.load_avatar(synthetic_avatar()).events)?;
    print_events(&mut out, &coordinator.arm_reply(&session.reply, 0.0)?)?;
    if let Some(event) = coordinator.playback_started() {
        print_events(&mut out, &[event])?;
    }

    let mut now_ms = 0.0;
    let mut frames = 0usize;
    while now_ms <= session.duration_ms {
        print_events(&mut out, &coordinator.frame(now_ms, now_ms))?;
        now_ms += step_ms;
        frames += 1;
    }

    if let Some(event) = coordinator.stop(now_ms) {
        print_events(&mut out, &[event])?;
    }
    let mut settle = 0;
    while coordinator.engine().active_count() > 0 && settle < MAX_SETTLE_FRAMES {
        now_ms += step_ms;
        coordinator.frame(now_ms, session.duration_ms);
        settle += 1;
    }

    tracing::info!(frames, settle_frames = settle, end_ms = now_ms, "simulation finished");
    Ok(())
}

/// Real-time run through the frame loop.
async fn play(args: &ReplyArgs) -> anyhow::Result<()> {
    let session = Session::load(args)?;
    let poll = Duration::from_millis(session.config.runner.frame_interval_ms);
    let clock = Arc::new(SimulatedPlayback::new().with_duration_ms(session.duration_ms));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut driver = LipSyncDriver::new(LipSyncCoordinator::new(session.config), clock.clone())
        .with_events(tx);

    driver.load_avatar(synthetic_avatar());
    driver.arm_reply(&session.reply)?;
    clock.play();
    driver.playback_started()?;

    let stdout = std::io::stdout();
    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                print_events(&mut stdout.lock(), &[event])?;
            }
            _ = tokio::time::sleep(poll) => {
                if clock.is_finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    driver.stop()?;
    driver.settled().await;
    driver.shutdown().await;
    while let Ok(event) = rx.try_recv() {
        print_events(&mut stdout.lock(), &[event])?;
    }
    Ok(())
}

/// Print the `/chat` request body the browser would send.
fn request(args: &[String]) -> anyhow::Result<()> {
    let Some((avatar, words)) = args.split_first() else {
        bail!("usage: lipsync-sim request <avatar> <text...>");
    };
    let request = ChatRequest::for_avatar(&words.join(" "), &AvatarCatalog::builtin(), avatar)?;
    println!("{}", serde_json::to_string(&request)?);
    Ok(())
}

fn table() -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for id in 0..VISEME_CLASS_COUNT as VisemeId {
        let shapes: Vec<String> = blend_shapes_for(id)
            .iter()
            .map(|(target, weight)| format!("{target}={weight:.2}"))
            .collect();
        writeln!(out, "{id:>2}  {}", shapes.join(" "))?;
    }
    Ok(())
}

fn avatars() -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for profile in AvatarCatalog::builtin().profiles() {
        writeln!(
            out,
            "{:<14}{:<8}{}",
            profile.file,
            profile.gender.to_string(),
            profile.voice
        )?;
    }
    Ok(())
}
