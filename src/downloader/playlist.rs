// Playlist downloads - bounded fan-out over the single-video path

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use super::errors::DownloadError;
use super::models::{DownloadOutcome, PlaylistItem, PlaylistResult, StreamSelector};
use super::orchestrator::Downloader;

impl Downloader {
    /// Download every member of a playlist.
    ///
    /// Members run concurrently, at most `options.concurrency` at a time.
    /// One member failing never stops the others; the result lists every
    /// member in playlist order.
    pub async fn download_playlist(
        &self,
        url: &str,
        selector: &StreamSelector,
    ) -> Result<PlaylistResult, DownloadError> {
        self.download_playlist_with_cancel(url, selector, &CancellationToken::new())
            .await
    }

    pub async fn download_playlist_with_cancel(
        &self,
        url: &str,
        selector: &StreamSelector,
        cancel: &CancellationToken,
    ) -> Result<PlaylistResult, DownloadError> {
        let span = info_span!("playlist", url = %url);
        self.run_playlist(url, selector, cancel).instrument(span).await
    }

    async fn run_playlist(
        &self,
        url: &str,
        selector: &StreamSelector,
        cancel: &CancellationToken,
    ) -> Result<PlaylistResult, DownloadError> {
        let playlist = self.extractor.resolve_playlist(url).await.map_err(|e| {
            error!(error = %e, "failed to resolve playlist");
            e
        })?;

        if playlist.video_urls.is_empty() {
            return Err(DownloadError::UnresolvableSource {
                url: url.to_string(),
                reason: "no videos found in playlist".to_string(),
            });
        }

        info!(
            title = %playlist.title,
            count = playlist.video_urls.len(),
            concurrency = self.options().concurrency,
            "downloading playlist"
        );

        // Members of one run may not overwrite each other's files
        let run = self.for_run();
        let permits = Arc::new(Semaphore::new(self.options().concurrency.max(1)));
        let mut handles = Vec::with_capacity(playlist.video_urls.len());

        for (index, video_url) in playlist.video_urls.into_iter().enumerate() {
            let downloader = run.clone();
            let selector = selector.clone();
            let permits = permits.clone();
            let cancel = cancel.clone();
            let task_url = video_url.clone();

            let handle = tokio::spawn(
                async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return DownloadOutcome::Failed {
                                error: DownloadError::Cancelled,
                                attempts: 0,
                            }
                        }
                    };
                    downloader
                        .download_with_cancel(&task_url, &selector, &cancel)
                        .await
                }
                .in_current_span(),
            );
            handles.push((index, video_url, handle));
        }

        let mut items = Vec::with_capacity(handles.len());
        for (index, url, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(url = %url, error = %e, "download task aborted");
                    DownloadOutcome::Failed {
                        error: DownloadError::ExecutionError(format!("download task aborted: {}", e)),
                        attempts: 0,
                    }
                }
            };
            items.push(PlaylistItem {
                index,
                url,
                outcome,
            });
        }

        let result = PlaylistResult { items };
        info!(
            total = result.items.len(),
            downloaded = result.downloaded_files().len(),
            failed = result.failures().count(),
            "playlist download completed"
        );
        Ok(result)
    }
}
