//! Request and response bodies.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::downloader::{DownloadOutcome, PlaylistDetails, VideoDetails};

/// Whether a URL names one video or a playlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    #[default]
    Video,
    Playlist,
}

/// `POST /video-download` body.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    /// Resolution label ("720p"), or bitrate label ("128kbps") with `audio_only`
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub mode: DownloadMode,
    #[serde(default)]
    pub audio_only: bool,
    /// Skip videos whose output file already exists
    #[serde(default)]
    pub resume: bool,
}

/// `POST /video-details` body.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailsRequest {
    pub url: String,
    #[serde(default)]
    pub mode: DownloadMode,
}

/// Outcome of one video in a download report.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub url: String,
    /// success, skipped or failed
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ItemReport {
    pub fn new(url: impl Into<String>, outcome: &DownloadOutcome) -> Self {
        let url = url.into();
        match outcome {
            DownloadOutcome::Success(path) => Self {
                url,
                status: "success",
                path: Some(path.clone()),
                reason: None,
                attempts: None,
            },
            DownloadOutcome::Skipped(reason) => Self {
                url,
                status: "skipped",
                path: None,
                reason: Some(reason.to_string()),
                attempts: None,
            },
            DownloadOutcome::Failed { error, attempts } => Self {
                url,
                status: "failed",
                path: None,
                reason: Some(error.to_string()),
                attempts: Some(*attempts),
            },
        }
    }
}

/// `POST /video-download` response.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub mode: DownloadMode,
    /// Files written by this request
    pub downloaded: Vec<PathBuf>,
    pub results: Vec<ItemReport>,
}

/// `POST /video-details` response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DetailsResponse {
    Video(VideoDetails),
    Playlist(PlaylistDetails),
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{DownloadError, SkipReason};

    #[test]
    fn test_request_defaults() {
        let req: DownloadRequest =
            serde_json::from_str(r#"{"url": "https://youtu.be/x"}"#).unwrap();
        assert_eq!(req.mode, DownloadMode::Video);
        assert!(req.quality.is_none());
        assert!(!req.audio_only);
        assert!(!req.resume);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let req = serde_json::from_str::<DownloadRequest>(r#"{"url": "u", "mode": "channel"}"#);
        assert!(req.is_err());
    }

    #[test]
    fn test_item_report_shapes() {
        let failed = ItemReport::new(
            "u",
            &DownloadOutcome::Failed {
                error: DownloadError::Transfer("reset".into()),
                attempts: 6,
            },
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 6);
        assert!(json.get("path").is_none());

        let skipped = ItemReport::new("u", &DownloadOutcome::Skipped(SkipReason::Gone));
        assert_eq!(skipped.status, "skipped");
        assert!(skipped.attempts.is_none());
    }
}
