//! Single-owner event loop for the interactive player.
//!
//! The loop thread owns the `PlayerView` and the surface. Dataset loads and
//! frame fetches run on short-lived worker threads and report back over a
//! channel, so all state changes happen in one place and in arrival order.

use anyhow::{anyhow, Context, Result};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::VideoBackend;
use crate::config::PlayerSettings;
use crate::error::PlayerError;
use crate::loader::{fetch_dataset, Dataset, LoadTicket};
use crate::playback::PlaybackCommand;
use crate::player::{DrawOutcome, DrawRequest, PlayerView};
use crate::render::{load_frame_image, DecodedFrame, Surface};

/// Commands a user can type at the player prompt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UserCommand {
    Playback(PlaybackCommand),
    Open(u64),
    Status,
    Quit,
}

impl UserCommand {
    /// Parse one prompt line, e.g. `seek 12`, `open 3`, `toggle`.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(anyhow!("too many arguments to '{}'", verb));
        }
        let command = match verb.as_str() {
            "play" => UserCommand::Playback(PlaybackCommand::Play),
            "pause" => UserCommand::Playback(PlaybackCommand::Pause),
            "toggle" | "space" => UserCommand::Playback(PlaybackCommand::Toggle),
            "start" | "home" => UserCommand::Playback(PlaybackCommand::JumpToStart),
            "end" => UserCommand::Playback(PlaybackCommand::JumpToEnd),
            "seek" => {
                let raw = arg.ok_or_else(|| anyhow!("'seek' needs a frame index"))?;
                let index = raw
                    .parse::<i64>()
                    .with_context(|| format!("invalid frame index '{}'", raw))?;
                UserCommand::Playback(PlaybackCommand::Seek(index))
            }
            "open" => {
                let raw = arg.ok_or_else(|| anyhow!("'open' needs a video id"))?;
                let id = raw
                    .parse::<u64>()
                    .with_context(|| format!("invalid video id '{}'", raw))?;
                UserCommand::Open(id)
            }
            "status" => UserCommand::Status,
            "quit" | "exit" | "q" => UserCommand::Quit,
            other => return Err(anyhow!("unknown command '{}'", other)),
        };
        if arg.is_some() && !matches!(verb.as_str(), "seek" | "open") {
            return Err(anyhow!("'{}' takes no arguments", verb));
        }
        Ok(command)
    }
}

/// Everything the loop reacts to.
#[derive(Debug)]
pub enum Event {
    Command(UserCommand),
    Loaded(LoadTicket, Result<Dataset, PlayerError>),
    ImageReady(DrawRequest, Result<DecodedFrame, PlayerError>),
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStatus {
    Running,
    Stopped,
}

pub struct EventLoop<S: Surface> {
    view: PlayerView,
    backend: Arc<dyn VideoBackend>,
    surface: S,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    last_outcome: Option<DrawOutcome>,
    stopped: bool,
}

impl<S: Surface> EventLoop<S> {
    pub fn new(backend: Arc<dyn VideoBackend>, surface: S, settings: &PlayerSettings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            view: PlayerView::new(settings),
            backend,
            surface,
            tx,
            rx,
            last_outcome: None,
            stopped: false,
        }
    }

    /// Handle for feeding events from other threads (stdin reader, signal handler).
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Result of the most recent completed draw.
    pub fn last_outcome(&self) -> Option<&DrawOutcome> {
        self.last_outcome.as_ref()
    }

    /// Switch to `video_id` and start loading it in the background.
    pub fn open(&mut self, video_id: u64) -> Result<()> {
        let Some(ticket) = self.view.open(video_id) else {
            log::debug!("video {} already open", video_id);
            return Ok(());
        };
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let default_fps = self.view.default_fps();
        std::thread::Builder::new()
            .name(format!("load-{}", video_id))
            .spawn(move || {
                let outcome = fetch_dataset(backend.as_ref(), video_id, default_fps);
                deliver(&tx, Event::Loaded(ticket, outcome));
            })
            .context("spawn loader thread")?;
        Ok(())
    }

    /// Process at most one event, waiting up to `max_wait` (or less if a
    /// playback tick is due sooner).
    pub fn step(&mut self, max_wait: Duration) -> Result<LoopStatus> {
        if self.stopped {
            return Ok(LoopStatus::Stopped);
        }
        self.spawn_pending_draw()?;

        let now = Instant::now();
        let wait = match self.view.time_until_tick(now) {
            Some(tick) => tick.min(max_wait),
            None => max_wait,
        };
        match self.rx.recv_timeout(wait) {
            Ok(event) => self.handle(event)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.stopped = true,
        }
        if !self.stopped && self.view.on_timer(Instant::now()) {
            self.spawn_pending_draw()?;
        }
        Ok(if self.stopped {
            LoopStatus::Stopped
        } else {
            LoopStatus::Running
        })
    }

    /// Run until a `Quit` command or `Shutdown` event.
    pub fn run(&mut self) -> Result<()> {
        while self.step(Duration::from_millis(250))? == LoopStatus::Running {}
        self.view.close();
        log::info!("player stopped");
        Ok(())
    }

    /// Step until `done` holds or `timeout` elapses. Returns whether `done` held.
    pub fn run_until<F>(&mut self, timeout: Duration, mut done: F) -> Result<bool>
    where
        F: FnMut(&PlayerView, &S) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.view, &self.surface) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let slice = (deadline - now).min(Duration::from_millis(50));
            if self.step(slice)? == LoopStatus::Stopped {
                return Ok(done(&self.view, &self.surface));
            }
        }
    }

    fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Command(UserCommand::Playback(command)) => {
                self.view.command(command, Instant::now());
            }
            Event::Command(UserCommand::Open(video_id)) => self.open(video_id)?,
            Event::Command(UserCommand::Status) => println!("{}", self.view.status_line()),
            Event::Command(UserCommand::Quit) | Event::Shutdown => {
                log::info!("shutting down player");
                self.stopped = true;
            }
            Event::Loaded(ticket, outcome) => {
                if self.view.finish_load(ticket, outcome, Instant::now()) {
                    println!("{}", self.view.status_line());
                }
            }
            Event::ImageReady(request, image) => {
                let outcome = self.view.finish_draw(&request, image, &mut self.surface);
                if let DrawOutcome::Failed(err) = &outcome {
                    eprintln!("{}", err);
                }
                self.last_outcome = Some(outcome);
            }
        }
        Ok(())
    }

    fn spawn_pending_draw(&mut self) -> Result<()> {
        let Some(request) = self.view.next_draw() else {
            return Ok(());
        };
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        std::thread::Builder::new()
            .name(format!("frame-{}", request.frame.frame_number))
            .spawn(move || {
                let image = load_frame_image(backend.as_ref(), &request.frame);
                deliver(&tx, Event::ImageReady(request, image));
            })
            .context("spawn frame fetch thread")?;
        Ok(())
    }
}

/// Hand a worker result to the loop. Returns false if the loop is gone.
fn deliver(tx: &Sender<Event>, event: Event) -> bool {
    let Err(mpsc::SendError(event)) = tx.send(event) else {
        return true;
    };
    match event {
        Event::Loaded(ticket, _) => {
            log::debug!("event loop gone; dropping load for video {}", ticket.video_id)
        }
        Event::ImageReady(request, _) => log::debug!(
            "event loop gone; dropping image for frame {}",
            request.frame.frame_number
        ),
        other => log::debug!("event loop gone; dropping {:?}", other),
    }
    false
}
