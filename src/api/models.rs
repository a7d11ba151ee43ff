//! Analysis records served by the backend outside the player core.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    #[default]
    Unknown,
}

impl VideoStatus {
    /// True once the backend will not change the status on its own.
    pub fn is_settled(self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Unknown => "unknown",
        };
        f.pad(name)
    }
}

/// `/videos/{id}` record.
#[derive(Clone, Debug, Deserialize)]
pub struct VideoRecord {
    pub id: u64,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub status: VideoStatus,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub upload_time: Option<String>,
}

/// `/videos/{id}/summary`; every field is optional on the wire.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VideoSummary {
    #[serde(default)]
    pub total_luggage: u64,
    #[serde(default)]
    pub abandoned_count: u64,
    #[serde(default)]
    pub total_persons: u64,
    #[serde(default)]
    pub color_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub luggage_types: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub question: &'a str,
    pub video_id: Option<u64>,
}

/// Natural-language query answer.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub supporting_data: Option<Value>,
}

impl QueryAnswer {
    /// `supporting_data.count`, when the backend reports matches.
    pub fn match_count(&self) -> Option<u64> {
        self.supporting_data
            .as_ref()
            .and_then(|data| data.get("count"))
            .and_then(Value::as_u64)
    }
}

/// Validate an alert email before it is attached to an analysis request.
pub fn validate_alert_email(email: &str) -> Result<String> {
    static EMAIL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex")
    });
    let email = email.trim();
    if email.is_empty() {
        return Err(anyhow!("alert email is empty"));
    }
    if !re.is_match(email) {
        return Err(anyhow!("'{}' is not a valid email address", email));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_does_not_fail_parsing() {
        let record: VideoRecord = serde_json::from_value(json!({
            "id": 7,
            "original_filename": "gate_b.mp4",
            "status": "queued"
        }))
        .unwrap();
        assert_eq!(record.status, VideoStatus::Unknown);
        assert!(!record.status.is_settled());
        assert_eq!(record.duration, None);
    }

    #[test]
    fn summary_defaults_missing_counts() {
        let summary: VideoSummary =
            serde_json::from_value(json!({"total_luggage": 4, "color_distribution": {"red": 3}}))
                .unwrap();
        assert_eq!(summary.total_luggage, 4);
        assert_eq!(summary.abandoned_count, 0);
        assert_eq!(summary.color_distribution.get("red"), Some(&3));
        assert!(summary.luggage_types.is_empty());
    }

    #[test]
    fn email_validation_matches_simple_shape() {
        assert_eq!(
            validate_alert_email(" ops@example.com ").unwrap(),
            "ops@example.com"
        );
        assert!(validate_alert_email("").is_err());
        assert!(validate_alert_email("ops@example").is_err());
        assert!(validate_alert_email("ops @example.com").is_err());
        assert!(validate_alert_email("@example.com").is_err());
    }

    #[test]
    fn query_answer_exposes_match_count() {
        let answer: QueryAnswer = serde_json::from_value(json!({
            "answer": "Two suitcases were left unattended.",
            "supporting_data": {"count": 2}
        }))
        .unwrap();
        assert_eq!(answer.match_count(), Some(2));
    }
}
