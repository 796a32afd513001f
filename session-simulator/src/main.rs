mod config;
mod engine;
mod sink;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use tracing::{info, warn};
use playback_session::{
    EngineRuntime, MediaSink, NoticeCallback, PlaybackPath, SessionConfig, SessionController,
    SessionProps, SessionSnapshot, UpdateOutcome,
};
use crate::config::{RuntimeMode, SimulatorConfig};
use crate::engine::{EngineReport, SimulatedRuntime};
use crate::sink::SimulatedSink;

/// Host-facing notice captured from the session callbacks
#[derive(Debug, Clone, Serialize)]
struct Notice {
    at: DateTime<Utc>,
    kind: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    snapshot: SessionSnapshot,
    engine: Option<EngineReport>,
    play_requests: usize,
    native_source: Option<String>,
    notices: Vec<Notice>,
}

type NoticeLog = Arc<Mutex<Vec<Notice>>>;

fn notice_callback(log: &NoticeLog, kind: &'static str) -> NoticeCallback {
    let log = log.clone();
    Arc::new(move |message: &str| {
        if let Ok(mut notices) = log.lock() {
            notices.push(Notice {
                at: Utc::now(),
                kind,
                message: message.to_string(),
            });
        }
    })
}

fn cli() -> Command {
    Command::new("session-simulator")
        .version("1.0")
        .author("Video Streaming Team")
        .about("Drives an adaptive HLS playback session against a scripted engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Simulator configuration (toml)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("URL")
                .help("Stream URL, overrides the configured source"),
        )
        .arg(
            Arg::new("autoplay")
                .long("autoplay")
                .help("Start playback as soon as the stream is ready")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-policy")
                .long("dump-policy")
                .help("Print the session policy as toml and exit")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志 - 使用环境变量 RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("dump-policy") {
        let policy = toml::to_string_pretty(&SessionConfig::default())
            .context("Failed to serialize session policy")?;
        println!("{}", policy);
        return Ok(());
    }

    info!("🎬 Session simulator starting...");

    // 加载配置
    let mut config = SimulatorConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path)).await?;
    if let Some(source) = matches.get_one::<String>("source") {
        config.source = source.clone();
    }
    if matches.get_flag("autoplay") {
        config.autoplay = true;
    }
    info!("✓ Configuration loaded");
    info!("  Source: {}", config.source);
    info!("  Autoplay: {}", config.autoplay);
    info!("  Runtime: {:?}", config.runtime);
    info!("  Scenario steps: {}", config.scenario.len());

    let summary = run(config).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn run(config: SimulatorConfig) -> Result<RunSummary> {
    let runtime = match config.runtime {
        RuntimeMode::Absent => None,
        mode => Some(Arc::new(SimulatedRuntime::new(mode, config.scenario.clone()))),
    };
    let finished = runtime.as_ref().map(|r| r.finished());
    let stats = runtime.as_ref().map(|r| r.stats());

    let sink = Arc::new(SimulatedSink::new(&config.sink));
    let notices: NoticeLog = Arc::new(Mutex::new(Vec::new()));

    let mut controller =
        SessionController::new(runtime.map(|r| r as Arc<dyn EngineRuntime>));
    info!("✓ Session {} created", controller.session_id());

    let props = SessionProps::new(config.source.clone())
        .autoplay(config.autoplay)
        .on_error(notice_callback(&notices, "error"))
        .on_autoplay_prevented(notice_callback(&notices, "autoplay_prevented"));

    let dyn_sink: Arc<dyn MediaSink> = sink.clone();
    let outcome = controller.update(Some(dyn_sink), props);
    info!("Bind outcome: {:?}", outcome);

    match (outcome, finished) {
        (UpdateOutcome::Bound(PlaybackPath::EngineManaged), Some(finished)) => {
            info!("✅ Session running, press Ctrl+C to stop");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Interrupted");
                        break;
                    }
                    _ = finished.cancelled() => {
                        controller.run_until_idle().await;
                        break;
                    }
                    outcome = controller.process_next() => {
                        if outcome.is_none() {
                            break;
                        }
                    }
                }
            }
        }
        _ => {
            // 原生路径或绑定失败：只需等待播放请求结算
            let _ = tokio::time::timeout(config.idle_timeout, controller.run_until_idle()).await;
        }
    }

    let snapshot = controller.snapshot();
    controller.stop();
    info!("⏹️ Session stopped");

    let notices = notices.lock().map(|n| n.clone()).unwrap_or_default();
    Ok(RunSummary {
        snapshot,
        engine: stats.map(|s| s.report()),
        play_requests: sink.play_requests(),
        native_source: sink.native_source(),
        notices,
    })
}
