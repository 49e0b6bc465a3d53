//! Download and detail routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    DetailsRequest, DetailsResponse, DownloadMode, DownloadReport, DownloadRequest, ItemReport,
};
use crate::api::server::AppState;
use crate::downloader::StreamSelector;

/// Download one video or a whole playlist and report every outcome.
///
/// Per-video failures are part of the report; only request errors and
/// playlists that cannot be resolved produce an error response.
pub async fn video_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<DownloadReport>> {
    let Json(request) = payload?;
    let url = non_empty_url(&request.url)?;
    let selector = StreamSelector::from_quality(request.quality.as_deref(), request.audio_only);
    let downloader = state.downloader(&request);

    // Dropping the request future stops its downloads
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    info!(url = %url, mode = ?request.mode, selector = %selector, "download requested");

    let report = match request.mode {
        DownloadMode::Video => {
            let outcome = downloader.download_with_cancel(url, &selector, &cancel).await;
            DownloadReport {
                mode: request.mode,
                downloaded: outcome.output_path().cloned().into_iter().collect(),
                results: vec![ItemReport::new(url, &outcome)],
            }
        }
        DownloadMode::Playlist => {
            let result = downloader
                .download_playlist_with_cancel(url, &selector, &cancel)
                .await?;
            DownloadReport {
                mode: request.mode,
                downloaded: result.downloaded_files(),
                results: result
                    .items
                    .iter()
                    .map(|item| ItemReport::new(item.url.as_str(), &item.outcome))
                    .collect(),
            }
        }
    };

    Ok(Json(report))
}

pub async fn video_details(
    State(state): State<AppState>,
    payload: Result<Json<DetailsRequest>, JsonRejection>,
) -> ApiResult<Json<DetailsResponse>> {
    let Json(request) = payload?;
    let url = non_empty_url(&request.url)?;
    let fetcher = state.details();

    let response = match request.mode {
        DownloadMode::Video => DetailsResponse::Video(fetcher.video_details(url).await?),
        DownloadMode::Playlist => DetailsResponse::Playlist(fetcher.playlist_details(url).await?),
    };
    Ok(Json(response))
}

fn non_empty_url(url: &str) -> ApiResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }
    Ok(url)
}
