// Common data models for downloader

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

/// Container extension for every output file
pub const OUTPUT_EXTENSION: &str = "mp4";

/// One encoded representation of a video offered by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Extractor format ID (e.g., "18", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    /// Resolution label (e.g., "720p")
    pub resolution: Option<String>,
    /// Audio bitrate label (e.g., "128kbps")
    pub abr: Option<String>,
    pub height: Option<u32>,
    /// Audio bitrate in kbps
    pub bitrate_kbps: Option<f32>,
    pub has_video: bool,
    pub has_audio: bool,
    pub filesize: Option<u64>,
}

impl Stream {
    /// Video and audio in one container
    pub fn is_progressive(&self) -> bool {
        self.has_video && self.has_audio
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }
}

/// Video resolved by the extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub description: String,
    pub webpage_url: String,
    /// Provider-specific metadata block (uploader, duration, tags...)
    pub metadata: serde_json::Value,
    pub streams: Vec<Stream>,
}

/// Playlist resolved by the extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Member video URLs in playlist order
    pub video_urls: Vec<String>,
}

/// Requested encoding for a download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StreamSelector {
    /// Exact resolution label, e.g. "720p"
    Resolution(String),
    /// Exact audio bitrate label, e.g. "128kbps"
    Bitrate(String),
    #[default]
    BestAvailable,
}

impl StreamSelector {
    /// Interpret a user-supplied quality string.
    ///
    /// In audio-only mode the label names a bitrate, otherwise a resolution.
    pub fn from_quality(quality: Option<&str>, audio_only: bool) -> Self {
        match quality.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) if audio_only => Self::Bitrate(q.to_string()),
            Some(q) => Self::Resolution(q.to_string()),
            None => Self::BestAvailable,
        }
    }
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(r) => write!(f, "resolution {}", r),
            Self::Bitrate(b) => write!(f, "audio bitrate {}", b),
            Self::BestAvailable => write!(f, "best available"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Resume mode found the output file already present
    AlreadyExists,
    /// Source reports the video permanently removed
    Gone,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Gone => write!(f, "gone"),
        }
    }
}

/// Result of one single-video download
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Skipped(SkipReason),
    Failed {
        error: DownloadError,
        /// Transfer attempts made; 0 when resolution failed before transferring
        attempts: u32,
    },
}

impl DownloadOutcome {
    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Success(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One playlist member and its outcome
#[derive(Debug, Clone)]
pub struct PlaylistItem {
    /// Position in the playlist
    pub index: usize,
    pub url: String,
    pub outcome: DownloadOutcome,
}

/// Every member outcome of a playlist download, in playlist order
#[derive(Debug, Clone, Default)]
pub struct PlaylistResult {
    pub items: Vec<PlaylistItem>,
}

impl PlaylistResult {
    /// Paths of the members that downloaded successfully
    pub fn downloaded_files(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.output_path().cloned())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, DownloadOutcome::Failed { .. }))
    }
}

/// Retry configuration shared by all downloads of a downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Linear backoff: `base_delay * attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Total transfer attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// Downloader options
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    /// Skip videos whose output file already exists
    pub resume: bool,
    pub audio_only: bool,
    pub retry: RetryPolicy,
    /// Upper bound on concurrent playlist downloads
    pub concurrency: usize,
}

impl DownloadOptions {
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            resume: false,
            audio_only: false,
            retry: RetryPolicy::default(),
            concurrency: default_concurrency(),
        }
    }
}

/// Network configuration shared by the extractor and the probe
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Metadata extraction timeout in seconds
    pub info_timeout_secs: u64,
    /// Single transfer attempt timeout in seconds
    pub transfer_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            cookies_path: None,
            info_timeout_secs: 30,
            transfer_timeout_secs: 3600,
            probe_timeout_secs: 10,
        }
    }
}

/// User's downloads directory, or the working directory when unknown
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Stream descriptor exposed by the details endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    pub abr: Option<String>,
    pub progressive: bool,
    pub filesize: Option<u64>,
}

impl From<&Stream> for StreamDescriptor {
    fn from(s: &Stream) -> Self {
        Self {
            format_id: s.format_id.clone(),
            ext: s.ext.clone(),
            resolution: s.resolution.clone(),
            abr: s.abr.clone(),
            progressive: s.is_progressive(),
            filesize: s.filesize,
        }
    }
}

/// Read-only details of a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    pub title: String,
    pub thumbnail_url: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub streams: Vec<StreamDescriptor>,
}

impl From<VideoInfo> for VideoDetails {
    fn from(info: VideoInfo) -> Self {
        Self {
            streams: info.streams.iter().map(StreamDescriptor::from).collect(),
            title: info.title,
            thumbnail_url: info.thumbnail,
            description: info.description,
            metadata: info.metadata,
        }
    }
}

/// Read-only details of a playlist and its members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDetails {
    pub title: String,
    /// Borrowed from the first member video
    pub thumbnail_url: String,
    pub description: String,
    /// Borrowed from the first member video
    pub metadata: serde_json::Value,
    pub videos: Vec<VideoDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(3), Duration::from_secs(15));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_selector_from_quality() {
        assert_eq!(
            StreamSelector::from_quality(Some("720p"), false),
            StreamSelector::Resolution("720p".to_string())
        );
        assert_eq!(
            StreamSelector::from_quality(Some("128kbps"), true),
            StreamSelector::Bitrate("128kbps".to_string())
        );
        assert_eq!(
            StreamSelector::from_quality(Some("  "), false),
            StreamSelector::BestAvailable
        );
        assert_eq!(StreamSelector::from_quality(None, true), StreamSelector::BestAvailable);
    }

    #[test]
    fn test_playlist_result_keeps_only_successes() {
        let result = PlaylistResult {
            items: vec![
                PlaylistItem {
                    index: 0,
                    url: "a".into(),
                    outcome: DownloadOutcome::Success(PathBuf::from("a.mp4")),
                },
                PlaylistItem {
                    index: 1,
                    url: "b".into(),
                    outcome: DownloadOutcome::Skipped(SkipReason::Gone),
                },
                PlaylistItem {
                    index: 2,
                    url: "c".into(),
                    outcome: DownloadOutcome::Failed {
                        error: DownloadError::Transfer("reset".into()),
                        attempts: 6,
                    },
                },
            ],
        };

        assert_eq!(result.downloaded_files(), vec![PathBuf::from("a.mp4")]);
        assert_eq!(result.failures().count(), 1);
        assert_eq!(result.items.len(), 3);
    }
}
