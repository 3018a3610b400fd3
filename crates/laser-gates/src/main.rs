//! Headless laser gates runner.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use laser_gates::{Session, SessionConfig};
use sprite_actions::EngineConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "laser-gates")]
#[command(about = "Run a scripted laser gates session on the sprite action scheduler", long_about = None)]
struct Args {
    /// Report action lifecycle events through tracing
    #[arg(long, env = "LASER_GATES_DEBUG_ACTIONS")]
    debug_actions: bool,

    /// Number of frames to simulate
    #[arg(long, env = "LASER_GATES_FRAMES", default_value_t = 900)]
    frames: u64,

    /// Delta per frame, in 60 FPS reference frames
    #[arg(long, env = "LASER_GATES_DT", default_value_t = 1.0)]
    dt: f32,

    /// Forcefields per wave
    #[arg(long, env = "LASER_GATES_FORCEFIELDS", default_value_t = 3)]
    forcefields: usize,

    /// Log to stderr only
    #[arg(long, env = "LASER_GATES_NO_FILE_LOG")]
    no_file_log: bool,

    /// Session ID used for the log directory (defaults to a timestamp)
    #[arg(long, env = "LASER_GATES_SESSION")]
    session: Option<String>,

    /// Print the final sprite state as JSON
    #[arg(long, env = "LASER_GATES_DUMP_STATE")]
    dump_state: bool,
}

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    setup_logging(args.session.clone(), !args.no_file_log)?;

    let engine = EngineConfig::from_env();
    let engine = if args.debug_actions {
        engine.with_debug(true)
    } else {
        engine
    };
    let config = SessionConfig {
        frames: args.frames,
        dt: args.dt,
        forcefields: args.forcefields,
        engine,
    };

    let mut session = Session::new(config).context("Failed to start session")?;
    let summary = session.run().context("Session aborted")?;
    tracing::info!("Session finished: {}", summary);
    println!("{}", summary);

    if args.dump_state {
        let state = serde_json::json!({
            "summary": summary,
            "sprites": session.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}

/// Setup logging to stderr and, unless disabled, to a per-session file
fn setup_logging(session_id: Option<String>, file_log: bool) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !file_log {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return Ok(());
    }

    // Create session ID if not provided
    let session_id = match session_id {
        Some(id) => id,
        None => {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .context("System clock is before the Unix epoch")?
                .as_secs();
            format!("session_{}", timestamp)
        }
    };

    let session_log_dir = log_dir().join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!("Failed to create log directory: {}", session_log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "laser-gates.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    // Leak the guard to keep file writer alive
    std::mem::forget(_guard);

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/laser-gates.log", session_log_dir.display());

    Ok(())
}

/// Platform cache directory for logs, e.g. `~/.cache/laser-gates/logs` on Linux
fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "laser-gates")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/laser-gates"))
        .join("logs")
}
