// In-memory extractor and probe used by unit tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use super::errors::DownloadError;
use super::extractors::Extractor;
use super::models::{DownloadOptions, PlaylistInfo, RetryPolicy, Stream, VideoInfo};
use super::orchestrator::Downloader;
use super::probe::SourceProbe;

/// How `FakeExtractor::transfer` behaves
#[derive(Debug, Clone, Copy)]
pub enum TransferScript {
    Succeed,
    AlwaysFail,
    /// Fail the first N transfer calls, then succeed
    FailFirst(u32),
    Gone,
}

pub struct FakeExtractor {
    videos: HashMap<String, VideoInfo>,
    playlists: HashMap<String, PlaylistInfo>,
    script: TransferScript,
    transfer_delay: Duration,
    pub resolve_calls: AtomicU32,
    pub transfer_calls: AtomicU32,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    formats: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            videos: HashMap::new(),
            playlists: HashMap::new(),
            script: TransferScript::Succeed,
            transfer_delay: Duration::ZERO,
            resolve_calls: AtomicU32::new(0),
            transfer_calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            formats: Mutex::new(Vec::new()),
        }
    }

    pub fn with_video(mut self, url: &str, video: VideoInfo) -> Self {
        self.videos.insert(url.to_string(), video);
        self
    }

    pub fn with_playlist(mut self, url: &str, title: &str, video_urls: &[&str]) -> Self {
        self.playlists.insert(
            url.to_string(),
            PlaylistInfo {
                id: "PL".to_string(),
                title: title.to_string(),
                description: format!("{} description", title),
                video_urls: video_urls.iter().map(|u| u.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_transfer(mut self, script: TransferScript) -> Self {
        self.script = script;
        self
    }

    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    /// Format IDs passed to `transfer`, in call order
    pub fn transferred_formats(&self) -> Vec<String> {
        self.formats.lock().clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn resolve_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.videos
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::UnresolvableSource {
                url: url.to_string(),
                reason: "unknown video".to_string(),
            })
    }

    async fn resolve_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError> {
        self.playlists
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::UnresolvableSource {
                url: url.to_string(),
                reason: "unknown playlist".to_string(),
            })
    }

    async fn transfer(
        &self,
        video: &VideoInfo,
        stream: &Stream,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        let call = self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.formats.lock().push(stream.format_id.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.transfer_delay.is_zero() {
            tokio::time::sleep(self.transfer_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = match self.script {
            TransferScript::Succeed => false,
            TransferScript::AlwaysFail => true,
            TransferScript::FailFirst(n) => call < n,
            TransferScript::Gone => {
                return Err(DownloadError::ResourceGone(format!("{} removed", video.id)))
            }
        };

        // Leave a partial file behind like an interrupted download would
        tokio::fs::write(dest, format!("{}:{}", video.id, stream.format_id)).await?;
        if fail {
            return Err(DownloadError::Transfer("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

pub struct FakeProbe {
    response: Option<u16>,
}

impl FakeProbe {
    pub fn ok() -> Self {
        Self::status(200)
    }

    pub fn status(code: u16) -> Self {
        Self {
            response: Some(code),
        }
    }

    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl SourceProbe for FakeProbe {
    async fn status(&self, url: &str) -> Result<u16, DownloadError> {
        self.response
            .ok_or_else(|| DownloadError::Transfer(format!("HEAD {}: connection refused", url)))
    }
}

fn stream(format_id: &str, height: Option<u32>, kbps: Option<u32>) -> Stream {
    Stream {
        format_id: format_id.to_string(),
        ext: if height.is_some() { "mp4" } else { "m4a" }.to_string(),
        resolution: height.map(|h| format!("{}p", h)),
        abr: kbps.map(|b| format!("{}kbps", b)),
        height,
        bitrate_kbps: kbps.map(|b| b as f32),
        has_video: height.is_some(),
        has_audio: kbps.is_some(),
        filesize: None,
    }
}

/// Video offering 144p/360p/720p progressive, 1080p video-only and 128kbps audio
pub fn sample_video(id: &str, title: &str) -> VideoInfo {
    VideoInfo {
        id: id.to_string(),
        title: title.to_string(),
        thumbnail: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
        description: format!("about {}", title),
        webpage_url: format!("https://www.youtube.com/watch?v={}", id),
        metadata: json!({ "uploader": "Tester", "duration": 60 }),
        streams: vec![
            stream("17", Some(144), Some(48)),
            stream("18", Some(360), Some(96)),
            stream("22", Some(720), Some(192)),
            stream("137", Some(1080), None),
            stream("140", None, Some(128)),
        ],
    }
}

/// Downloader over `extractor` writing into `dir`, with zero backoff
pub fn downloader_for(
    extractor: FakeExtractor,
    probe: FakeProbe,
    dir: &Path,
    max_retries: u32,
) -> (Downloader, Arc<FakeExtractor>) {
    let extractor = Arc::new(extractor);
    let options = DownloadOptions::default()
        .with_output_dir(dir)
        .with_retry(RetryPolicy::new(max_retries, Duration::ZERO))
        .with_concurrency(4);

    let downloader = Downloader::new(extractor.clone(), Arc::new(probe), options);
    (downloader, extractor)
}
