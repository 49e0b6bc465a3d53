// yt-dlp extractor - resolves metadata with `-J` and transfers one format
//
// The same argument building is used for the native binary and for
// `python3 -m yt_dlp`; only the program and its leading arguments differ.

use std::path::Path;
use std::process::Command as StdCommand;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::traits::{Extractor, ExtractorMode};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{NetworkConfig, PlaylistInfo, Stream, VideoInfo};
use crate::downloader::utils::{
    escape_output_template, get_cookie_args, get_proxy_args, run_output_with_timeout,
};

/// Fields copied into the provider metadata block
const METADATA_FIELDS: &[&str] = &[
    "uploader",
    "uploader_id",
    "channel",
    "channel_id",
    "channel_url",
    "duration",
    "view_count",
    "like_count",
    "upload_date",
    "categories",
    "tags",
    "age_limit",
    "availability",
    "extractor",
];

/// Program plus leading arguments used to run yt-dlp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpCommand {
    program: String,
    prefix_args: Vec<String>,
}

impl YtDlpCommand {
    /// Native yt-dlp binary
    pub fn binary(path: impl Into<String>) -> Self {
        Self {
            program: path.into(),
            prefix_args: Vec::new(),
        }
    }

    /// `<python> -m yt_dlp`
    pub fn python(interpreter: impl Into<String>) -> Self {
        Self {
            program: interpreter.into(),
            prefix_args: vec!["-m".to_string(), "yt_dlp".to_string()],
        }
    }

    /// Pick an invocation for `mode`, honoring an explicit binary path
    pub fn detect(mode: ExtractorMode, explicit_path: Option<&str>) -> Result<Self, DownloadError> {
        if let Some(path) = explicit_path {
            return Ok(Self::binary(path));
        }

        let binary = Self::binary(find_ytdlp());
        let python = Self::python(python_cmd());

        let candidates = match mode {
            ExtractorMode::Cli => vec![binary],
            ExtractorMode::Python => vec![python],
            ExtractorMode::Auto => vec![binary, python],
        };

        for candidate in candidates {
            if candidate.is_available() {
                info!(program = %candidate.program, mode = %mode, "using yt-dlp");
                return Ok(candidate);
            }
        }

        Err(DownloadError::ToolNotFound(format!(
            "yt-dlp not available (mode: {})",
            mode
        )))
    }

    /// Check that `--version` runs
    pub fn is_available(&self) -> bool {
        match StdCommand::new(&self.program)
            .args(&self.prefix_args)
            .arg("--version")
            .output()
        {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args(&self, rest: Vec<String>) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.extend(rest);
        args
    }
}

/// Find yt-dlp binary
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",          // System installation
    ];

    for path in common_paths {
        if Path::new(path).exists() {
            return path.to_string();
        }
    }

    // Last resort: hope it's in PATH
    "yt-dlp".to_string()
}

fn python_cmd() -> String {
    // Allow overriding python interpreter (e.g. venv)
    std::env::var("YTDLP_PYTHON").unwrap_or_else(|_| "python3".to_string())
}

/// Extractor backed by yt-dlp
pub struct YtDlpExtractor {
    command: YtDlpCommand,
    network: NetworkConfig,
}

impl YtDlpExtractor {
    pub fn new(command: YtDlpCommand, network: NetworkConfig) -> Self {
        Self { command, network }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.network.info_timeout_secs.to_string(),
        ];
        args.extend(get_cookie_args(&self.network));
        args.extend(get_proxy_args(&self.network));
        args
    }

    fn build_video_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["-J".to_string(), "--no-playlist".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());
        self.command.args(args)
    }

    fn build_playlist_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["-J".to_string(), "--flat-playlist".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());
        self.command.args(args)
    }

    fn build_transfer_args(&self, url: &str, format_id: &str, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format_id.to_string(),
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "--no-continue".to_string(),
            "--no-mtime".to_string(),
            "--newline".to_string(),
            "-o".to_string(),
            escape_output_template(&dest.to_string_lossy()),
        ];
        args.extend(self.common_args());
        args.push(url.to_string());
        self.command.args(args)
    }

    /// Flat playlist listing pages through every entry; allow more time
    fn playlist_timeout_secs(&self) -> u64 {
        self.network.info_timeout_secs.saturating_mul(4)
    }

    async fn run_json(
        &self,
        url: &str,
        args: Vec<String>,
        timeout_secs: u64,
    ) -> Result<Value, DownloadError> {
        debug!(program = %self.command.program, args = %args.join(" "), "running yt-dlp");

        let output = run_output_with_timeout(&self.command.program, args, timeout_secs)
            .await
            .map_err(|e| unresolvable(url, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::from_ytdlp_stderr(url, &stderr, |reason| {
                DownloadError::UnresolvableSource {
                    url: url.to_string(),
                    reason,
                }
            }));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

/// Resolution-time failures other than missing tools make the URL unusable
fn unresolvable(url: &str, err: DownloadError) -> DownloadError {
    match err {
        DownloadError::ToolNotFound(_) => err,
        other => DownloadError::UnresolvableSource {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        let args = self.build_video_args(url);
        let json = self
            .run_json(url, args, self.network.info_timeout_secs)
            .await?;
        parse_video_json(&json, url)
    }

    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError> {
        let args = self.build_playlist_args(url);
        let json = self
            .run_json(url, args, self.playlist_timeout_secs())
            .await?;
        Ok(parse_playlist_json(&json))
    }

    async fn transfer(
        &self,
        video: &VideoInfo,
        stream: &Stream,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        if video.webpage_url.is_empty() {
            return Err(DownloadError::Transfer(format!(
                "video {} has no source URL",
                video.id
            )));
        }
        let url = video.webpage_url.as_str();

        let args = self.build_transfer_args(url, &stream.format_id, dest);
        debug!(program = %self.command.program, args = %args.join(" "), "starting transfer");

        let output = run_output_with_timeout(
            &self.command.program,
            args,
            self.network.transfer_timeout_secs,
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::from_ytdlp_stderr(
                url,
                &stderr,
                DownloadError::Transfer,
            ));
        }

        if !tokio::fs::try_exists(dest).await? {
            warn!(dest = %dest.display(), "yt-dlp exited cleanly without writing output");
            return Err(DownloadError::Transfer(format!(
                "no output written to {}",
                dest.display()
            )));
        }

        Ok(())
    }
}

/// Parse `yt-dlp -J` output for a single video
pub(crate) fn parse_video_json(json: &Value, requested_url: &str) -> Result<VideoInfo, DownloadError> {
    if json.get("_type").and_then(Value::as_str) == Some("playlist") {
        return Err(DownloadError::UnresolvableSource {
            url: requested_url.to_string(),
            reason: "URL points to a playlist, not a video".to_string(),
        });
    }

    let streams = match json["formats"].as_array() {
        Some(formats) => formats.iter().filter_map(parse_stream).collect(),
        // Single-format sites describe the only stream at top level
        None => parse_stream(json).into_iter().collect(),
    };

    let webpage_url = json["webpage_url"]
        .as_str()
        .filter(|u| !u.is_empty())
        .unwrap_or(requested_url)
        .to_string();

    Ok(VideoInfo {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        webpage_url,
        metadata: extract_metadata(json),
        streams,
    })
}

fn extract_metadata(json: &Value) -> Value {
    let mut block = serde_json::Map::new();
    for field in METADATA_FIELDS {
        if let Some(value) = json.get(*field).filter(|v| !v.is_null()) {
            block.insert((*field).to_string(), value.clone());
        }
    }
    Value::Object(block)
}

/// One `formats[]` entry; entries without a format ID are not downloadable
fn parse_stream(f: &Value) -> Option<Stream> {
    let format_id = f["format_id"].as_str().filter(|id| !id.is_empty())?;
    let height = f["height"].as_u64().map(|h| h as u32);
    let vcodec = f["vcodec"].as_str();
    let acodec = f["acodec"].as_str();

    let has_video = match vcodec {
        Some(v) => v != "none",
        None => height.is_some(),
    };
    let has_audio = match acodec {
        Some(a) => a != "none",
        // Codec-less entries with a picture are plain progressive files
        None => vcodec.is_none() && height.is_some(),
    };

    let bitrate_kbps = f["abr"].as_f64().filter(|b| *b > 0.0).map(|b| b as f32);

    Some(Stream {
        format_id: format_id.to_string(),
        ext: f["ext"].as_str().unwrap_or("").to_string(),
        resolution: height.filter(|_| has_video).map(|h| format!("{}p", h)),
        abr: bitrate_kbps
            .filter(|_| has_audio)
            .map(|b| format!("{}kbps", b.round() as u32)),
        height,
        bitrate_kbps,
        has_video,
        has_audio,
        filesize: f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64()),
    })
}

/// Parse `yt-dlp -J --flat-playlist` output
pub(crate) fn parse_playlist_json(json: &Value) -> PlaylistInfo {
    let video_urls = json["entries"]
        .as_array()
        .map(|entries| entries.iter().filter_map(entry_url).collect())
        .unwrap_or_default();

    PlaylistInfo {
        id: json["id"].as_str().unwrap_or("").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        video_urls,
    }
}

fn entry_url(entry: &Value) -> Option<String> {
    let is_http = |u: &&str| u.starts_with("http://") || u.starts_with("https://");

    if let Some(url) = entry["url"].as_str().filter(is_http) {
        return Some(url.to_string());
    }
    if let Some(url) = entry["webpage_url"].as_str().filter(is_http) {
        return Some(url.to_string());
    }

    let id = entry["id"].as_str().filter(|id| !id.is_empty())?;
    match entry["ie_key"].as_str() {
        Some("Youtube") | None => Some(format!("https://www.youtube.com/watch?v={}", id)),
        Some(_) => None,
    }
}
