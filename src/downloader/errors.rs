// Error types for the download pipeline

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// URL cannot be turned into a video or playlist (bad URL, extractor
    /// incompatibility, empty playlist)
    #[error("Cannot resolve {url}: {reason}")]
    UnresolvableSource { url: String, reason: String },

    /// Requested quality/format is not offered by the video
    #[error("No stream matches {selector}")]
    NoMatchingStream { selector: String },

    /// Source reports permanent removal (HTTP 410, deleted video)
    #[error("Resource gone: {0}")]
    ResourceGone(String),

    /// Network or I/O failure while transferring bytes
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Another in-flight download already writes this path
    #[error("Output path {} is already being written by another download", .0.display())]
    OutputCollision(PathBuf),

    /// yt-dlp or python not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Generic metadata retrieval failure
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Whether another transfer attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transfer(_) | Self::Timeout(_) | Self::Io(_) | Self::ExecutionError(_)
        )
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ResourceGone(_))
    }

    /// Classify yt-dlp stderr output.
    ///
    /// Messages that identify a permanent condition (removed video, unsupported
    /// URL) win over `fallback`, which builds the error for everything else.
    pub fn from_ytdlp_stderr(
        url: &str,
        stderr: &str,
        fallback: impl FnOnce(String) -> DownloadError,
    ) -> Self {
        let message = summarize_stderr(stderr);
        let lower = stderr.to_lowercase();

        if lower.contains("http error 410")
            || lower.contains("video unavailable")
            || lower.contains("no longer available")
            || lower.contains("has been removed")
        {
            return Self::ResourceGone(message);
        }

        if lower.contains("unsupported url") || lower.contains("is not a valid url") {
            return Self::UnresolvableSource {
                url: url.to_string(),
                reason: message,
            };
        }

        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::Timeout(message);
        }

        fallback(message)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Keep the lines of yt-dlp stderr that carry the actual failure
fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:") || l.contains("HTTP Error"))
        .take(2)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(msg: String) -> DownloadError {
        DownloadError::Transfer(msg)
    }

    #[test]
    fn test_gone_detection() {
        let err = DownloadError::from_ytdlp_stderr(
            "https://youtu.be/x",
            "ERROR: [youtube] x: Video unavailable. This video has been removed by the uploader",
            transfer,
        );
        assert!(err.is_gone());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_http_410_detection() {
        let err =
            DownloadError::from_ytdlp_stderr("u", "ERROR: unable to download: HTTP Error 410: Gone", transfer);
        assert!(matches!(err, DownloadError::ResourceGone(_)));
    }

    #[test]
    fn test_unsupported_url() {
        let err = DownloadError::from_ytdlp_stderr(
            "notaurl",
            "ERROR: 'notaurl' is not a valid URL",
            transfer,
        );
        match err {
            DownloadError::UnresolvableSource { url, .. } => assert_eq!(url, "notaurl"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fallback_keeps_error_lines() {
        let stderr = "WARNING: something\nERROR: HTTP Error 503: Service Unavailable\n";
        let err = DownloadError::from_ytdlp_stderr("u", stderr, transfer);
        match err {
            DownloadError::Transfer(msg) => {
                assert_eq!(msg, "ERROR: HTTP Error 503: Service Unavailable")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(DownloadError::Transfer(String::new()).is_retryable());
    }

    #[test]
    fn test_terminal_kinds_not_retryable() {
        assert!(!DownloadError::NoMatchingStream { selector: "720p".into() }.is_retryable());
        assert!(!DownloadError::Cancelled.is_retryable());
        assert!(!DownloadError::OutputCollision(PathBuf::from("a.mp4")).is_retryable());
    }
}
