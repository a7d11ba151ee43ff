//! `sentry` command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{
    validate_alert_email, wait_until_settled, BackendClient, VideoBackend, DEFAULT_POLL_INTERVAL,
};
use crate::config::{PlayerSettings, SentryConfig};
use crate::export::export_video;
use crate::format::format_duration;
use crate::render::RasterSurface;
use crate::runtime::{Event, EventLoop, UserCommand};
use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Play back luggage detections over analysed video frames"
)]
pub struct Args {
    /// Backend origin (overrides config and SENTRY_BACKEND_URL).
    #[arg(long, global = true, value_name = "URL")]
    backend_url: Option<String>,

    /// Playback rate when the backend suggests none.
    #[arg(long, global = true)]
    fps: Option<f64>,

    /// Width available for the rendered frame, in pixels.
    #[arg(long, global = true)]
    width: Option<u32>,

    /// TrueType font for detection labels.
    #[arg(long, global = true, value_name = "PATH")]
    font: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, global = true, default_value = "auto", value_name = "MODE")]
    ui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive player. Reads commands from stdin.
    Play {
        video_id: u64,
        /// PNG rewritten after every drawn frame.
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },
    /// Render every frame with overlays to PNG files.
    Export {
        video_id: u64,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
    /// Show processing status.
    Status {
        video_id: u64,
        /// Poll until analysis completes or fails.
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
    /// Aggregate analysis results for a video.
    Summary { video_id: u64 },
    /// List uploaded videos.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Upload a video file, optionally starting analysis right away.
    Upload {
        file: PathBuf,
        /// Start analysis once the upload is accepted.
        #[arg(long)]
        analyze: bool,
        /// Alert address passed to the analysis.
        #[arg(long, requires = "analyze")]
        email: Option<String>,
    },
    /// Start analysis of an uploaded video.
    Analyze {
        video_id: u64,
        /// Address to alert when abandoned luggage is found.
        #[arg(long)]
        email: Option<String>,
    },
    /// Ask a natural-language question about the detections.
    Query {
        question: String,
        #[arg(long, value_name = "ID")]
        video: Option<u64>,
    },
}

const PROMPT_HELP: &str =
    "commands: play | pause | toggle | seek N | start | end | open ID | status | quit";

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let cfg = {
        let _stage = ui.stage("Load config");
        resolve_config(&args)?
    };
    let client = BackendClient::new(cfg.backend.clone())?;
    log::info!("backend: {}{}", cfg.backend.origin, cfg.backend.api_prefix);

    match args.command {
        Command::Play { video_id, snapshot } => {
            let mut player = cfg.player.clone();
            if snapshot.is_some() {
                player.snapshot_path = snapshot;
            }
            play(Arc::new(client), video_id, &player)
        }
        Command::Export { video_id, out } => {
            let surface =
                RasterSurface::new().with_discovered_font(cfg.player.font_path.as_deref())?;
            let report = export_video(&client, video_id, &cfg.player, surface, &out, &ui)?;
            println!(
                "wrote {} frames to {} ({} detections drawn, {} frames failed)",
                report.written.len(),
                out.display(),
                report.detections_drawn,
                report.failed.len()
            );
            Ok(())
        }
        Command::Status {
            video_id,
            wait,
            timeout,
        } => {
            let record = if wait {
                let _stage = ui.stage(&format!("Wait for video {}", video_id));
                wait_until_settled(
                    || client.video(video_id),
                    DEFAULT_POLL_INTERVAL,
                    timeout.map(Duration::from_secs),
                    |record| log::info!("video {}: {}", record.id, record.status),
                )?
            } else {
                client.video(video_id)?
            };
            println!(
                "{}\t{}\t{}\t{}",
                record.id,
                record.original_filename,
                record.status,
                format_duration(record.duration)
            );
            Ok(())
        }
        Command::Summary { video_id } => {
            let summary = client.video_summary(video_id)?;
            println!("luggage:   {}", summary.total_luggage);
            println!("abandoned: {}", summary.abandoned_count);
            println!("persons:   {}", summary.total_persons);
            for (kind, count) in &summary.luggage_types {
                println!("  type  {:<12} {}", kind, count);
            }
            for (color, count) in &summary.color_distribution {
                println!("  color {:<12} {}", color, count);
            }
            Ok(())
        }
        Command::List { skip, limit } => {
            let videos = client.list_videos(skip, limit)?;
            if videos.is_empty() {
                println!("no videos");
            }
            for video in videos {
                let size = match (video.width, video.height) {
                    (Some(w), Some(h)) => format!("{}x{}", w, h),
                    _ => "-".to_string(),
                };
                println!(
                    "{:>5}  {:<11} {}  {:<9}  {}",
                    video.id,
                    video.status,
                    format_duration(video.duration),
                    size,
                    video.original_filename
                );
            }
            Ok(())
        }
        Command::Upload {
            file,
            analyze,
            email,
        } => {
            if let Some(address) = &email {
                validate_alert_email(address)?;
            }
            let record = {
                let _stage = ui.stage("Upload video");
                client.upload_video(&file)?
            };
            log::info!("uploaded {} as video {}", file.display(), record.id);
            println!("{}\t{}\t{}", record.id, record.original_filename, record.status);
            if analyze {
                let ack = client.analyze_video(record.id, email.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&ack)?);
            }
            Ok(())
        }
        Command::Analyze { video_id, email } => {
            let ack = client.analyze_video(video_id, email.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
            Ok(())
        }
        Command::Query { question, video } => {
            let answer = client.query(&question, video)?;
            println!("{}", answer.answer);
            if let Some(count) = answer.match_count() {
                println!("({} matching detections)", count);
            }
            Ok(())
        }
    }
}

fn resolve_config(args: &Args) -> Result<SentryConfig> {
    let mut cfg = SentryConfig::load()?;
    if let Some(url) = &args.backend_url {
        cfg.backend.origin = url.clone();
    }
    if let Some(fps) = args.fps {
        cfg.player.default_fps = fps;
    }
    if let Some(width) = args.width {
        cfg.player.container_width = width;
    }
    if let Some(font) = &args.font {
        cfg.player.font_path = Some(font.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn play(
    backend: Arc<dyn VideoBackend>,
    video_id: u64,
    settings: &PlayerSettings,
) -> Result<()> {
    let mut surface = RasterSurface::new().with_discovered_font(settings.font_path.as_deref())?;
    match &settings.snapshot_path {
        Some(path) => surface = surface.with_snapshot_path(path),
        None => log::info!("no snapshot path set; frames are rendered in memory only"),
    }
    let mut player = EventLoop::new(backend, surface, settings);

    let tx = player.sender();
    ctrlc::set_handler(move || {
        let _ = tx.send(Event::Shutdown);
    })
    .context("set Ctrl-C handler")?;

    let tx = player.sender();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match UserCommand::parse(&line) {
                    Ok(command) => {
                        if tx.send(Event::Command(command)).is_err() {
                            return;
                        }
                    }
                    Err(err) => eprintln!("{}\n{}", err, PROMPT_HELP),
                }
            }
            let _ = tx.send(Event::Shutdown);
        })
        .context("spawn stdin reader")?;

    eprintln!("{}", PROMPT_HELP);
    player.open(video_id)?;
    player.run()
}
