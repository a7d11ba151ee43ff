//! Backend collaborator.
//!
//! `VideoBackend` is the seam the overlay player depends on. `BackendClient`
//! implements it over HTTP and additionally exposes the analysis operations
//! (status, summary, listing, analysis trigger, natural-language query) used
//! by the CLI. `StubBackend` serves a fixed in-memory dataset.

mod backend;
mod http;
mod models;
mod poll;
mod stub;

pub use backend::{ImageRequest, VideoBackend};
pub use http::BackendClient;
pub use models::{
    validate_alert_email, QueryAnswer, QueryRequest, VideoRecord, VideoStatus, VideoSummary,
};
pub use poll::{wait_until_settled, DEFAULT_POLL_INTERVAL};
pub use stub::{encode_png, StubBackend};
