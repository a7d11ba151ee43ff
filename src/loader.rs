//! Frame + detection loading for one video view.
//!
//! Every load is tagged with a `LoadTicket`. Opening another video bumps the
//! generation, so results still in flight for the previous one are recognised
//! as stale and dropped instead of overwriting the current view.

use crate::api::VideoBackend;
use crate::detect::DetectionIndex;
use crate::error::PlayerError;
use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub video_id: u64,
    pub generation: u64,
}

/// Everything the player needs for one video.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub video_id: u64,
    pub frames: Vec<Frame>,
    pub detections: DetectionIndex,
    pub playback_fps: f64,
}

impl Dataset {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Clone, Debug, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading(LoadTicket),
    Failed {
        ticket: LoadTicket,
        error: PlayerError,
    },
    /// Loaded fine, but there are no frames to show.
    Empty(LoadTicket),
    Ready {
        ticket: LoadTicket,
        dataset: Dataset,
    },
}

impl LoadState {
    pub fn ticket(&self) -> Option<LoadTicket> {
        match self {
            LoadState::Idle => None,
            LoadState::Loading(ticket) | LoadState::Empty(ticket) => Some(*ticket),
            LoadState::Failed { ticket, .. } | LoadState::Ready { ticket, .. } => Some(*ticket),
        }
    }
}

/// Fetch frames and detections for `video_id`.
///
/// The two requests run side by side; both must finish before this returns.
/// Either failing fails the whole load.
pub fn fetch_dataset(
    backend: &dyn VideoBackend,
    video_id: u64,
    default_fps: f64,
) -> Result<Dataset, PlayerError> {
    let (frames, detections) = std::thread::scope(|scope| {
        let detections = scope.spawn(|| backend.video_detections(video_id));
        let frames = backend.video_frames(video_id);
        let detections = detections
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("detection fetch panicked")));
        (frames, detections)
    });

    let frames = frames.map_err(|e| PlayerError::DataFetch(format!("frames: {:#}", e)))?;
    let detections =
        detections.map_err(|e| PlayerError::DataFetch(format!("detections: {:#}", e)))?;

    let playback_fps = frames.fps_or(default_fps);
    Ok(Dataset {
        video_id,
        frames: frames.frames,
        detections: DetectionIndex::new(detections.detections),
        playback_fps,
    })
}

/// Load lifecycle for the active video.
#[derive(Debug, Default)]
pub struct Loader {
    generation: u64,
    state: LoadState,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match &self.state {
            LoadState::Ready { dataset, .. } => Some(dataset),
            _ => None,
        }
    }

    pub fn current_ticket(&self) -> Option<LoadTicket> {
        self.state.ticket()
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.current_ticket() == Some(ticket)
    }

    /// Start loading `video_id`. Returns `None` when that video is already
    /// loading or loaded; a failed load may be retried.
    pub fn request(&mut self, video_id: u64) -> Option<LoadTicket> {
        let unchanged = matches!(
            &self.state,
            LoadState::Loading(t) | LoadState::Empty(t) | LoadState::Ready { ticket: t, .. }
                if t.video_id == video_id
        );
        if unchanged {
            return None;
        }
        self.generation += 1;
        let ticket = LoadTicket {
            video_id,
            generation: self.generation,
        };
        self.state = LoadState::Loading(ticket);
        Some(ticket)
    }

    /// Record a finished load. Stale tickets are ignored and return false.
    pub fn complete(&mut self, ticket: LoadTicket, outcome: Result<Dataset, PlayerError>) -> bool {
        if !matches!(self.state, LoadState::Loading(t) if t == ticket) {
            log::debug!(
                "discarding stale load for video {} (generation {})",
                ticket.video_id,
                ticket.generation
            );
            return false;
        }
        self.state = match outcome {
            Ok(dataset) if dataset.frames.is_empty() => {
                log::info!("video {}: no frames available", ticket.video_id);
                LoadState::Empty(ticket)
            }
            Ok(dataset) => {
                log::info!(
                    "video {}: {} frames, {} detections on {} frames, {} fps",
                    ticket.video_id,
                    dataset.frames.len(),
                    dataset.detections.len(),
                    dataset.detections.frame_count(),
                    dataset.playback_fps
                );
                LoadState::Ready { ticket, dataset }
            }
            Err(error) => {
                log::error!("video {}: {}", ticket.video_id, error);
                LoadState::Failed { ticket, error }
            }
        };
        true
    }

    /// Forget the current video; any in-flight load becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = LoadState::Idle;
    }
}
