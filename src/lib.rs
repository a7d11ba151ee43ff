//! Luggage Sentry overlay player
//!
//! Replays analysed surveillance video as a sequence of still frames and draws
//! the luggage detections the backend produced for each frame on top of it.
//!
//! # Architecture
//!
//! - `api`: backend seam (`VideoBackend`), the HTTP client and a stub backend
//! - `loader`: fetches frames + detections for one video, tagged by `LoadTicket`
//! - `playback`: pure `PlaybackState` transitions and the `Ticker` timer
//! - `render`: display geometry, color contrast and drawing onto a `Surface`
//! - `player`: one view combining the above, no I/O of its own
//! - `runtime`: single-owner event loop with worker threads for fetches
//! - `cli`: the `sentry` binary

pub mod api;
pub mod cli;
pub mod color;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod format;
pub mod frame;
pub mod geometry;
pub mod loader;
pub mod playback;
pub mod player;
pub mod render;
pub mod runtime;
pub mod ui;

pub use api::{BackendClient, ImageRequest, StubBackend, VideoBackend};
pub use color::{color_name_to_hex, contrast_color};
pub use config::{BackendSettings, PlayerSettings, SentryConfig};
pub use detect::{BoundingBox, Detection, DetectionIndex};
pub use error::PlayerError;
pub use frame::{Frame, FrameList, DEFAULT_PLAYBACK_FPS};
pub use geometry::{map_box, unmap_rect, DisplayGeometry, Scale, ScreenRect};
pub use loader::{fetch_dataset, Dataset, LoadState, LoadTicket, Loader};
pub use playback::{PlaybackCommand, PlaybackController, PlaybackState, Ticker};
pub use player::{DrawOutcome, DrawRequest, PlayerView, ViewStatus};
pub use render::{load_frame_image, OverlayRenderer, RasterSurface, RecordingSurface, Surface};
pub use runtime::{Event, EventLoop, LoopStatus, UserCommand};
