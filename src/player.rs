//! One overlay-player view.
//!
//! `PlayerView` owns the loader state, the playback controller and the draw
//! bookkeeping for a single surface. It performs no I/O itself: callers feed
//! it load results and decoded images, and ask it what to fetch next. That
//! keeps it usable from the threaded event loop and from blocking callers.

use std::time::{Duration, Instant};

use crate::api::VideoBackend;
use crate::config::PlayerSettings;
use crate::error::PlayerError;
use crate::frame::Frame;
use crate::loader::{Dataset, LoadState, LoadTicket, Loader};
use crate::playback::{PlaybackCommand, PlaybackController, PlaybackState};
use crate::render::{load_frame_image, DecodedFrame, DrawReport, OverlayRenderer, Surface};

/// What the view should display right now.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewStatus {
    Idle,
    Loading { video_id: u64 },
    /// Blocking error; nothing is rendered.
    Failed(PlayerError),
    /// Loaded fine, nothing to show.
    NoData { video_id: u64 },
    Ready { video_id: u64 },
}

/// A frame image the view wants drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRequest {
    pub ticket: LoadTicket,
    pub index: usize,
    pub frame: Frame,
}

#[derive(Debug)]
pub enum DrawOutcome {
    Drawn(DrawReport),
    /// Recoverable per-frame failure; the previous frame stays on the surface.
    Failed(PlayerError),
    /// The request belonged to a video that is no longer open.
    Discarded,
}

pub struct PlayerView {
    loader: Loader,
    controller: PlaybackController,
    renderer: OverlayRenderer,
    default_fps: f64,
    in_flight: Option<DrawRequest>,
    last_drawn: Option<(LoadTicket, usize)>,
    banner: Option<PlayerError>,
}

impl PlayerView {
    pub fn new(settings: &PlayerSettings) -> Self {
        Self {
            loader: Loader::new(),
            controller: PlaybackController::new(0, settings.default_fps),
            renderer: OverlayRenderer::new(settings.container_width),
            default_fps: settings.default_fps,
            in_flight: None,
            last_drawn: None,
            banner: None,
        }
    }

    pub fn default_fps(&self) -> f64 {
        self.default_fps
    }

    /// Switch to `video_id`. Stops playback and invalidates everything in
    /// flight for the previous video. Returns the ticket to load with, or
    /// `None` if this video is already open.
    pub fn open(&mut self, video_id: u64) -> Option<LoadTicket> {
        let ticket = self.loader.request(video_id)?;
        self.controller.teardown();
        self.in_flight = None;
        self.last_drawn = None;
        self.banner = None;
        log::info!("opening video {}", video_id);
        Some(ticket)
    }

    /// Feed a finished load. Returns false for stale results.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<Dataset, PlayerError>,
        now: Instant,
    ) -> bool {
        if !self.loader.complete(ticket, outcome) {
            return false;
        }
        match self.loader.dataset() {
            Some(dataset) => {
                let (count, fps) = (dataset.frame_count(), dataset.playback_fps);
                self.controller.set_fps(fps, now);
                self.controller.set_frame_count(count, now);
            }
            None => self.controller.set_frame_count(0, now),
        }
        true
    }

    /// Load `video_id` on the calling thread.
    pub fn load_blocking(&mut self, backend: &dyn VideoBackend, video_id: u64) -> ViewStatus {
        if let Some(ticket) = self.open(video_id) {
            let outcome = crate::loader::fetch_dataset(backend, video_id, self.default_fps);
            self.finish_load(ticket, outcome, Instant::now());
        }
        self.status()
    }

    pub fn command(&mut self, command: PlaybackCommand, now: Instant) {
        self.controller.apply(command, now);
    }

    /// Advance playback if the timer is due.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        self.controller.on_timer(now)
    }

    /// Time until the next playback tick, `None` when no timer runs.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.controller.ticker().time_until(now)
    }

    /// Tear the view down: no timer, no pending work.
    pub fn close(&mut self) {
        self.controller.teardown();
        self.loader.reset();
        self.in_flight = None;
        self.last_drawn = None;
    }

    pub fn status(&self) -> ViewStatus {
        match self.loader.state() {
            LoadState::Idle => ViewStatus::Idle,
            LoadState::Loading(t) => ViewStatus::Loading {
                video_id: t.video_id,
            },
            LoadState::Failed { error, .. } => ViewStatus::Failed(error.clone()),
            LoadState::Empty(t) => ViewStatus::NoData {
                video_id: t.video_id,
            },
            LoadState::Ready { ticket, .. } => ViewStatus::Ready {
                video_id: ticket.video_id,
            },
        }
    }

    pub fn playback(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.loader.dataset()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.dataset()?
            .frames
            .get(self.controller.current_index())
    }

    /// Most recent per-frame error, cleared by the next successful draw.
    pub fn banner(&self) -> Option<&PlayerError> {
        self.banner.as_ref()
    }

    /// Next image to fetch, if the displayed frame is out of date and no
    /// other fetch is in flight. Draws are issued one at a time.
    pub fn next_draw(&mut self) -> Option<DrawRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let ticket = self.loader.current_ticket()?;
        let index = self.controller.current_index();
        if self.last_drawn == Some((ticket, index)) {
            return None;
        }
        let frame = self.dataset()?.frames.get(index)?.clone();
        let request = DrawRequest {
            ticket,
            index,
            frame,
        };
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Complete a draw started with [`next_draw`](Self::next_draw).
    ///
    /// Images for a video that is no longer open are dropped. Images for the
    /// open video are drawn even if playback has moved on; the next request
    /// then catches up.
    pub fn finish_draw(
        &mut self,
        request: &DrawRequest,
        image: Result<DecodedFrame, PlayerError>,
        surface: &mut dyn Surface,
    ) -> DrawOutcome {
        if self.in_flight.as_ref() == Some(request) {
            self.in_flight = None;
        }
        let Some(dataset) = self
            .loader
            .dataset()
            .filter(|_| self.loader.is_current(request.ticket))
        else {
            log::debug!(
                "discarding image for frame {} of stale video {}",
                request.frame.frame_number,
                request.ticket.video_id
            );
            return DrawOutcome::Discarded;
        };
        self.last_drawn = Some((request.ticket, request.index));

        let drawn = match image {
            Ok(decoded) => self.renderer.draw(&mut *surface, decoded, &dataset.detections),
            Err(err) => Err(err),
        };
        match drawn {
            Ok(report) => {
                if let Err(err) = surface.present() {
                    log::warn!("present failed: {:#}", err);
                }
                self.banner = None;
                log::debug!("{}", self.status_line());
                DrawOutcome::Drawn(report)
            }
            Err(err) => {
                log::warn!("{}", err);
                self.banner = Some(err.clone());
                DrawOutcome::Failed(err)
            }
        }
    }

    /// Fetch, decode and draw the current frame on the calling thread.
    pub fn draw_blocking(
        &mut self,
        backend: &dyn VideoBackend,
        surface: &mut dyn Surface,
    ) -> Option<DrawOutcome> {
        let request = self.next_draw()?;
        let image = load_frame_image(backend, &request.frame);
        Some(self.finish_draw(&request, image, surface))
    }

    /// `Frame 3 of 10 [playing @ 2.0 fps]`, or the current view status.
    pub fn status_line(&self) -> String {
        match self.status() {
            ViewStatus::Idle => "no video open".to_string(),
            ViewStatus::Loading { video_id } => format!("loading video {}…", video_id),
            ViewStatus::Failed(err) => format!("error: {}", err),
            ViewStatus::NoData { video_id } => {
                format!("no frames available for video {}", video_id)
            }
            ViewStatus::Ready { .. } => {
                let state = self.playback();
                let mode = if state.is_playing { "playing" } else { "paused" };
                let mut line = format!(
                    "Frame {} of {} [{} @ {:.1} fps]",
                    state.current_frame_index + 1,
                    state.frame_count,
                    mode,
                    state.playback_fps
                );
                if let Some(banner) = &self.banner {
                    line.push_str(&format!(" ! {}", banner));
                }
                line
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StubBackend;
    use crate::detect::{BoundingBox, Detection};
    use crate::render::RecordingSurface;

    fn settings() -> PlayerSettings {
        PlayerSettings::default()
    }

    fn det(frame_number: u64) -> Detection {
        Detection {
            frame_number,
            bounding_box: BoundingBox::new(4.0, 20.0, 30.0, 40.0),
            object_class: "backpack".into(),
            confidence: 0.5,
            color: None,
        }
    }

    #[test]
    fn ready_view_draws_current_frame_once() {
        let backend = StubBackend::new()
            .with_solid_frames(3, 64, 48)
            .with_detections(vec![det(1)]);
        let mut view = PlayerView::new(&settings());
        assert_eq!(view.load_blocking(&backend, 5), ViewStatus::Ready { video_id: 5 });

        let mut surface = RecordingSurface::new();
        assert!(matches!(
            view.draw_blocking(&backend, &mut surface),
            Some(DrawOutcome::Drawn(_))
        ));
        assert!(view.draw_blocking(&backend, &mut surface).is_none());
        assert_eq!(surface.presents(), 1);

        view.command(PlaybackCommand::Seek(1), Instant::now());
        assert!(matches!(
            view.draw_blocking(&backend, &mut surface),
            Some(DrawOutcome::Drawn(ref report)) if report.drawn() == 1
        ));
        assert_eq!(view.status_line(), "Frame 2 of 3 [paused @ 2.0 fps]");
    }

    #[test]
    fn failed_image_keeps_playing_and_sets_banner() {
        let backend = StubBackend::new()
            .with_solid_frames(3, 64, 48)
            .failing_bypass(1)
            .failing_plain(1);
        let mut view = PlayerView::new(&settings());
        view.load_blocking(&backend, 1);
        let mut surface = RecordingSurface::new();
        view.draw_blocking(&backend, &mut surface);

        let t0 = Instant::now();
        view.command(PlaybackCommand::Play, t0);
        assert!(view.on_timer(t0 + Duration::from_millis(500)));
        assert!(matches!(
            view.draw_blocking(&backend, &mut surface),
            Some(DrawOutcome::Failed(PlayerError::ImageLoad { frame_number: 1, .. }))
        ));
        assert!(view.banner().is_some());
        assert!(view.playback().is_playing);
        // Frame 0 is still what the surface shows.
        assert_eq!(surface.presents(), 1);

        assert!(view.on_timer(t0 + Duration::from_millis(1000)));
        assert!(matches!(
            view.draw_blocking(&backend, &mut surface),
            Some(DrawOutcome::Drawn(_))
        ));
        assert!(view.banner().is_none());
    }

    #[test]
    fn switching_video_discards_in_flight_draw() {
        let backend = StubBackend::new().with_solid_frames(2, 16, 16);
        let mut view = PlayerView::new(&settings());
        view.load_blocking(&backend, 1);
        let request = view.next_draw().expect("draw for video 1");
        let image = load_frame_image(&backend, &request.frame);

        view.command(PlaybackCommand::Play, Instant::now());
        let ticket = view.open(2).expect("new video");
        assert!(!view.playback().is_playing);
        assert!(view.time_until_tick(Instant::now()).is_none());

        let mut surface = RecordingSurface::new();
        assert!(matches!(
            view.finish_draw(&request, image, &mut surface),
            DrawOutcome::Discarded
        ));
        assert!(surface.ops().is_empty());

        let outcome = crate::loader::fetch_dataset(&backend, 2, 2.0);
        assert!(view.finish_load(ticket, outcome, Instant::now()));
        assert_eq!(view.status(), ViewStatus::Ready { video_id: 2 });
    }

    #[test]
    fn empty_and_failed_loads_are_distinct() {
        let mut view = PlayerView::new(&settings());
        assert_eq!(
            view.load_blocking(&StubBackend::new(), 3),
            ViewStatus::NoData { video_id: 3 }
        );
        view.command(PlaybackCommand::Play, Instant::now());
        assert!(!view.playback().is_playing);
        assert!(view.next_draw().is_none());

        let status = view.load_blocking(&StubBackend::new().failing_frames(), 4);
        assert!(matches!(status, ViewStatus::Failed(PlayerError::DataFetch(_))));
        assert!(view.status_line().starts_with("error: failed to load video data"));
    }

    #[test]
    fn only_one_draw_in_flight() {
        let backend = StubBackend::new().with_solid_frames(4, 8, 8);
        let mut view = PlayerView::new(&settings());
        view.load_blocking(&backend, 1);
        let first = view.next_draw().expect("first draw");
        view.command(PlaybackCommand::Seek(2), Instant::now());
        assert!(view.next_draw().is_none());

        let mut surface = RecordingSurface::new();
        let image = load_frame_image(&backend, &first.frame);
        assert!(matches!(
            view.finish_draw(&first, image, &mut surface),
            DrawOutcome::Drawn(_)
        ));
        let second = view.next_draw().expect("catch-up draw");
        assert_eq!(second.index, 2);
    }
}
