//! Blocking HTTP client for the analysis backend.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use url::Url;

use super::backend::{ImageRequest, VideoBackend};
use super::models::{validate_alert_email, QueryAnswer, QueryRequest, VideoRecord, VideoSummary};
use crate::config::BackendSettings;
use crate::detect::DetectionList;
use crate::frame::{Frame, FrameList};

const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
const BYPASS_HEADER_VALUE: &str = "true";

/// ureq-backed client for `<origin><api_prefix>`.
#[derive(Clone, Debug)]
pub struct BackendClient {
    agent: ureq::Agent,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let origin = Url::parse(&settings.origin)
            .with_context(|| format!("parse backend origin '{}'", settings.origin))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported backend scheme '{}'; expected http(s)",
                origin.scheme()
            ));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .build();
        Ok(Self { agent, settings })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// `<origin><api_prefix><path>`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.settings.origin.trim_end_matches('/'),
            self.settings.api_prefix,
            path
        )
    }

    /// Absolute URL for an asset locator. Absolute locators pass through.
    pub fn asset_url(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return locator.to_string();
        }
        let origin = self.settings.origin.trim_end_matches('/');
        if locator.starts_with('/') {
            format!("{}{}", origin, locator)
        } else {
            format!("{}/{}", origin, locator)
        }
    }

    fn get(&self, url: &str) -> ureq::Request {
        self.agent
            .get(url)
            .set(&self.settings.bypass_header, BYPASS_HEADER_VALUE)
    }

    fn post(&self, url: &str) -> ureq::Request {
        self.agent
            .post(url)
            .set(&self.settings.bypass_header, BYPASS_HEADER_VALUE)
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.api_url(path);
        let mut request = self.get(&url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().with_context(|| format!("GET {}", url))?;
        response
            .into_json::<Value>()
            .with_context(|| format!("decode json from {}", url))
    }

    pub fn video(&self, video_id: u64) -> Result<VideoRecord> {
        let body = self.get_json(&format!("/videos/{}", video_id), &[])?;
        serde_json::from_value(body).context("parse video record")
    }

    pub fn video_summary(&self, video_id: u64) -> Result<VideoSummary> {
        let body = self.get_json(&format!("/videos/{}/summary", video_id), &[])?;
        serde_json::from_value(body).context("parse video summary")
    }

    /// Accepts either a bare array or `{ "videos": [...] }`.
    pub fn list_videos(&self, skip: u32, limit: u32) -> Result<Vec<VideoRecord>> {
        let body = self.get_json(
            "/videos",
            &[("skip", skip.to_string()), ("limit", limit.to_string())],
        )?;
        let entries = match body {
            Value::Array(_) => body,
            Value::Object(mut map) => map.remove("videos").unwrap_or(Value::Array(Vec::new())),
            _ => return Err(anyhow!("unexpected video list shape")),
        };
        serde_json::from_value(entries).context("parse video list")
    }

    /// Start analysis; an alert email is validated before it is sent.
    pub fn analyze_video(&self, video_id: u64, alert_email: Option<&str>) -> Result<Value> {
        let url = self.api_url(&format!("/analyze/{}", video_id));
        let mut request = self.post(&url);
        if let Some(email) = alert_email {
            request = request.query("alert_email", &validate_alert_email(email)?);
        }
        let response = request.call().with_context(|| format!("POST {}", url))?;
        response
            .into_json::<Value>()
            .with_context(|| format!("decode json from {}", url))
    }

    /// Upload a video file as the multipart field `file`.
    pub fn upload_video(&self, path: &Path) -> Result<VideoRecord> {
        if !path.is_file() {
            return Err(anyhow!("{} is not a file", path.display()));
        }
        let url = self.api_url("/upload");
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .with_context(|| format!("open upload file {}", path.display()))?;
        // Large files may take longer than a single request timeout allows.
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.settings.timeout)
            .timeout(None)
            .build()
            .context("build upload client")?;
        let response = client
            .post(&url)
            .header(self.settings.bypass_header.as_str(), BYPASS_HEADER_VALUE)
            .multipart(form)
            .send()
            .with_context(|| format!("POST {}", url))?
            .error_for_status()
            .with_context(|| format!("POST {}", url))?;
        response
            .json::<VideoRecord>()
            .with_context(|| format!("decode uploaded video record from {}", url))
    }

    pub fn query(&self, question: &str, video_id: Option<u64>) -> Result<QueryAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(anyhow!("question is empty"));
        }
        let url = self.api_url("/query");
        let response = self
            .post(&url)
            .send_json(QueryRequest { question, video_id })
            .with_context(|| format!("POST {}", url))?;
        response
            .into_json::<QueryAnswer>()
            .with_context(|| format!("decode query answer from {}", url))
    }
}

impl VideoBackend for BackendClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn video_frames(&self, video_id: u64) -> Result<FrameList> {
        let body = self.get_json(&format!("/videos/{}/frames", video_id), &[])?;
        Ok(FrameList::from_value(body))
    }

    fn video_detections(&self, video_id: u64) -> Result<DetectionList> {
        let body = self.get_json(
            &format!("/videos/{}/detections", video_id),
            &[("limit", self.settings.detection_limit.to_string())],
        )?;
        let list = DetectionList::from_value(body);
        if list.skipped > 0 {
            log::warn!(
                "video {}: dropped {} malformed detections",
                video_id,
                list.skipped
            );
        }
        Ok(list)
    }

    fn frame_image(&self, frame: &Frame, request: ImageRequest) -> Result<Vec<u8>> {
        let url = self.asset_url(&frame.url);
        let call = match request {
            ImageRequest::Bypass => self.get(&url),
            ImageRequest::Plain => self.agent.get(&url),
        };
        let response = call.call().with_context(|| format!("GET {}", url))?;
        // Interstitial warning pages come back as 200 text/html.
        if response.content_type().starts_with("text/html") {
            return Err(anyhow!("{} returned an html page instead of an image", url));
        }
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES + 1)
            .read_to_end(&mut bytes)
            .with_context(|| format!("read image body from {}", url))?;
        if bytes.len() as u64 > MAX_IMAGE_BYTES {
            return Err(anyhow!("image at {} exceeds {} bytes", url, MAX_IMAGE_BYTES));
        }
        if bytes.is_empty() {
            return Err(anyhow!("empty image body from {}", url));
        }
        Ok(bytes)
    }
}
