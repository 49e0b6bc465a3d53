// Extractor trait and invocation modes

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{PlaylistInfo, Stream, VideoInfo};

/// How yt-dlp is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorMode {
    /// CLI binary yt-dlp (faster, no Python dependency)
    Cli,
    /// Python module yt_dlp
    Python,
    /// Binary when available, Python module otherwise
    #[default]
    Auto,
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Python => write!(f, "python"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "python" => Ok(Self::Python),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown extractor mode '{}'", other)),
        }
    }
}

/// External capability that resolves URLs and transfers stream bytes.
///
/// Every failure is reported as a [`DownloadError`]; callers decide which
/// kinds are terminal.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Resolve a video URL into metadata and its streams
    async fn resolve_video(&self, url: &str) -> Result<VideoInfo, DownloadError>;

    /// Resolve a playlist URL into its member video URLs
    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError>;

    /// Write `stream` of `video` to exactly `dest`
    async fn transfer(
        &self,
        video: &VideoInfo,
        stream: &Stream,
        dest: &Path,
    ) -> Result<(), DownloadError>;
}
