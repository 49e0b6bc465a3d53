// Downloader - resolve, probe, then transfer with bounded retries

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::claims::OutputClaims;
use super::errors::DownloadError;
use super::extractors::Extractor;
use super::filename::output_file_name;
use super::models::{
    DownloadOptions, DownloadOutcome, SkipReason, Stream, StreamSelector, VideoInfo,
    OUTPUT_EXTENSION,
};
use super::probe::{SourceProbe, GONE};
use super::stream_selector::resolve_stream;

/// Suffix of the temporary file a transfer writes before the final rename
const PARTIAL_SUFFIX: &str = ".part";

/// Single-video and playlist downloader.
///
/// Cloning is cheap; clones share the extractor, probe, options and the
/// output path registry.
#[derive(Clone)]
pub struct Downloader {
    pub(crate) extractor: Arc<dyn Extractor>,
    probe: Arc<dyn SourceProbe>,
    options: Arc<DownloadOptions>,
    claims: OutputClaims,
}

impl Downloader {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        probe: Arc<dyn SourceProbe>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            extractor,
            probe,
            options: Arc::new(options),
            claims: OutputClaims::new(),
        }
    }

    /// Share an output path registry with other downloaders
    pub fn with_claims(mut self, claims: OutputClaims) -> Self {
        self.claims = claims;
        self
    }

    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Copy whose claims also keep every path written during one run
    pub(crate) fn for_run(&self) -> Self {
        let claims = self.claims.for_run();
        self.clone().with_claims(claims)
    }

    /// Download one video
    pub async fn download(&self, url: &str, selector: &StreamSelector) -> DownloadOutcome {
        self.download_with_cancel(url, selector, &CancellationToken::new())
            .await
    }

    /// Download one video, giving up when `cancel` fires
    pub async fn download_with_cancel(
        &self,
        url: &str,
        selector: &StreamSelector,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        let span = info_span!("download", url = %url, selector = %selector);
        self.run_download(url, selector, cancel).instrument(span).await
    }

    async fn run_download(
        &self,
        url: &str,
        selector: &StreamSelector,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        if cancel.is_cancelled() {
            return failed(DownloadError::Cancelled, 0);
        }

        // 1. Metadata: failures mean the URL itself is unusable
        let video = match self.extractor.resolve_video(url).await {
            Ok(video) => video,
            Err(e) if e.is_gone() => {
                warn!(error = %e, "video is no longer available, skipping");
                return DownloadOutcome::Skipped(SkipReason::Gone);
            }
            Err(e) => {
                error!(error = %e, "failed to resolve video");
                return failed(e, 0);
            }
        };

        // 2. Stream selection is never retried
        let stream = match resolve_stream(&video.streams, selector, self.options.audio_only) {
            Ok(stream) => stream.clone(),
            Err(e) => {
                warn!(title = %video.title, "no compatible stream found");
                return failed(e, 0);
            }
        };

        // 3. Pre-flight existence probe
        match self.probe.status(url).await {
            Ok(GONE) => {
                warn!(title = %video.title, "video is no longer available (410 Gone), skipping");
                return DownloadOutcome::Skipped(SkipReason::Gone);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "existence probe failed, continuing"),
        }

        // 4. Output path, owned by this task until it finishes
        let output_path = self.output_path_for(&video);
        let claim = match self.claims.claim(&output_path) {
            Ok(guard) => guard,
            Err(e) => {
                error!(path = %output_path.display(), "output path collides with another download");
                return failed(e, 0);
            }
        };

        if self.options.resume && is_file(&output_path).await {
            info!(title = %video.title, "output already exists, skipping");
            return DownloadOutcome::Skipped(SkipReason::AlreadyExists);
        }

        info!(
            title = %video.title,
            format = %stream.format_id,
            extractor = self.extractor.name(),
            "downloading"
        );

        // 5-6. Transfer with retries; video and stream stay cached
        let outcome = self
            .transfer_with_retries(&video, &stream, &output_path, cancel)
            .await;
        if outcome.is_success() {
            claim.commit();
        }
        outcome
    }

    async fn transfer_with_retries(
        &self,
        video: &VideoInfo,
        stream: &Stream,
        output_path: &Path,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        let policy = self.options.retry;
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(DownloadError::Cancelled),
                result = self.transfer_once(video, stream, output_path) => result,
            };

            let err = match result {
                Ok(()) => {
                    info!(title = %video.title, path = %output_path.display(), attempts, "download complete");
                    return DownloadOutcome::Success(output_path.to_path_buf());
                }
                Err(e) => e,
            };

            if matches!(err, DownloadError::Cancelled) {
                remove_partial(&partial_path(output_path)).await;
                return failed(err, attempts);
            }

            if err.is_gone() {
                warn!(title = %video.title, error = %err, "video removed during transfer, skipping");
                return DownloadOutcome::Skipped(SkipReason::Gone);
            }

            if !err.is_retryable() {
                error!(title = %video.title, error = %err, "transfer failed permanently");
                return failed(err, attempts);
            }

            if attempts > policy.max_retries {
                warn!(
                    title = %video.title,
                    error = %err,
                    attempts,
                    "max retries reached, skipping download"
                );
                return failed(err, attempts);
            }

            let delay = policy.backoff(attempts);
            warn!(
                title = %video.title,
                error = %err,
                "retrying download (attempt {}/{}) in {:?}",
                attempts + 1,
                policy.max_attempts(),
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => return failed(DownloadError::Cancelled, attempts),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One transfer into the temporary sibling, renamed into place on success
    async fn transfer_once(
        &self,
        video: &VideoInfo,
        stream: &Stream,
        output_path: &Path,
    ) -> Result<(), DownloadError> {
        let partial = partial_path(output_path);
        remove_partial(&partial).await;

        if let Err(e) = self.extractor.transfer(video, stream, &partial).await {
            remove_partial(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, output_path).await {
            remove_partial(&partial).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// `<output_dir>/<sanitized title>.mp4`
    pub fn output_path_for(&self, video: &VideoInfo) -> PathBuf {
        self.options
            .output_dir
            .join(output_file_name(&video.title, OUTPUT_EXTENSION))
    }
}

fn failed(error: DownloadError, attempts: u32) -> DownloadOutcome {
    DownloadOutcome::Failed { error, attempts }
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}
