//! videodemux
//!
//! Plays a video at its native frame rate and prints every event as a JSON
//! line, or serves the JSON-lines control protocol on stdin/stdout.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{after, never, select, unbounded};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use videodemux::ipc::{forward_events, IpcMessage, IpcServer};
use videodemux::{Player, PlayerConfig, SyntheticSpec};

/// Paced video frame demuxer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to play
    path: Option<PathBuf>,

    /// Path to a player configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seek to this position (seconds) before starting
    #[arg(long)]
    seek: Option<f64>,

    /// Stop after this many seconds of playback
    #[arg(long)]
    play_for: Option<f64>,

    /// Use stdin/stdout for IPC communication
    #[arg(long)]
    stdio: bool,

    /// Play a generated test stream instead of a file
    #[arg(long)]
    synthetic: bool,

    /// Frame count of the generated stream
    #[arg(long, default_value_t = 300)]
    synthetic_frames: u64,

    /// Frame rate of the generated stream
    #[arg(long, default_value_t = 30.0)]
    synthetic_fps: f64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    info!("videodemux starting...");

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from: {:?}", path);
            PlayerConfig::load_from_file(path)?
        }
        None => PlayerConfig::default(),
    };

    let player = if args.synthetic {
        spawn_synthetic(&args, config)?
    } else {
        spawn_file_player(&args, config)?
    };

    if args.stdio {
        return IpcServer::new(player).run_stdio();
    }

    let path = match (&args.path, args.synthetic) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("synthetic"),
        (None, false) => anyhow::bail!("no input file given (pass a path, --synthetic or --stdio)"),
    };
    play(&player, path, args.seek, args.play_for)
}

/// Logs go to stderr; stdout carries JSON lines
fn init_logging(debug: bool) -> Result<()> {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?,
        Err(_) => {
            let level = if debug { Level::DEBUG } else { Level::INFO };
            tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?
        }
    }
    Ok(())
}

fn spawn_synthetic(args: &Args, config: PlayerConfig) -> Result<Player> {
    let spec = SyntheticSpec {
        frame_count: args.synthetic_frames,
        frame_rate: args.synthetic_fps,
        ..Default::default()
    };
    info!(
        "Synthetic stream: {} frames @ {}fps, {}x{}",
        spec.frame_count, spec.frame_rate, spec.width, spec.height
    );
    Player::spawn(config, spec.opener()).context("Failed to start player")
}

#[cfg(feature = "ffmpeg")]
fn spawn_file_player(_args: &Args, config: PlayerConfig) -> Result<Player> {
    Player::with_ffmpeg(config).context("Failed to start player")
}

#[cfg(not(feature = "ffmpeg"))]
fn spawn_file_player(args: &Args, config: PlayerConfig) -> Result<Player> {
    tracing::warn!("Built without ffmpeg support, playing a synthetic stream");
    spawn_synthetic(args, config)
}

/// Load, start and print events until `end`
fn play(player: &Player, path: PathBuf, seek: Option<f64>, play_for: Option<f64>) -> Result<()> {
    let deadline = match play_for {
        Some(secs) if secs.is_finite() && secs >= 0.0 => after(Duration::from_secs_f64(secs)),
        Some(secs) => anyhow::bail!("invalid --play-for value: {}", secs),
        None => never(),
    };

    let (events_tx, events) = unbounded();
    forward_events(player, &events_tx)?;
    drop(events_tx);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Err(e) = player.load(&path) {
        // The error event carries the message for JSON consumers
        for msg in events.try_iter() {
            writeln!(out, "{}", msg.to_json()?)?;
        }
        return Err(e).with_context(|| format!("Failed to load {}", path.display()));
    }
    if let Some(secs) = seek {
        player.seek(secs).with_context(|| format!("Failed to seek to {}s", secs))?;
    }
    player.start()?;

    loop {
        select! {
            recv(events) -> msg => {
                let Ok(msg) = msg else { break };
                writeln!(out, "{}", msg.to_json()?)?;
                if msg == IpcMessage::End {
                    break;
                }
            },
            recv(deadline) -> _ => {
                info!("Play time elapsed, stopping");
                player.stop()?;
            },
        }
    }

    out.flush()?;
    info!("Playback finished");
    Ok(())
}
