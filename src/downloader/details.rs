// Read-only video and playlist details

use std::sync::Arc;

use tracing::{info, warn};

use super::errors::DownloadError;
use super::extractors::Extractor;
use super::models::{PlaylistDetails, VideoDetails};

/// Fetches details without downloading anything
#[derive(Clone)]
pub struct DetailsFetcher {
    extractor: Arc<dyn Extractor>,
}

impl DetailsFetcher {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    pub async fn video_details(&self, url: &str) -> Result<VideoDetails, DownloadError> {
        let info = self
            .extractor
            .resolve_video(url)
            .await
            .map_err(into_fetch_error)?;
        Ok(VideoDetails::from(info))
    }

    /// Playlist title and description plus details of every member.
    ///
    /// Thumbnail and metadata come from the first member. Members that
    /// fail to resolve after the first are left out.
    pub async fn playlist_details(&self, url: &str) -> Result<PlaylistDetails, DownloadError> {
        let playlist = self
            .extractor
            .resolve_playlist(url)
            .await
            .map_err(into_fetch_error)?;

        let mut urls = playlist.video_urls.iter();
        let first_url = urls.next().ok_or_else(|| DownloadError::UnresolvableSource {
            url: url.to_string(),
            reason: "no videos found in playlist".to_string(),
        })?;

        let first = self.video_details(first_url).await?;
        let mut details = PlaylistDetails {
            title: playlist.title.clone(),
            thumbnail_url: first.thumbnail_url.clone(),
            description: playlist.description.clone(),
            metadata: first.metadata.clone(),
            videos: vec![first],
        };

        for video_url in urls {
            match self.video_details(video_url).await {
                Ok(video) => details.videos.push(video),
                Err(e) => warn!(url = %video_url, error = %e, "skipping playlist member"),
            }
        }

        info!(
            title = %details.title,
            videos = details.videos.len(),
            "fetched playlist details"
        );
        Ok(details)
    }
}

/// Keep typed source errors, fold the rest into a generic fetch error
fn into_fetch_error(e: DownloadError) -> DownloadError {
    match e {
        DownloadError::UnresolvableSource { .. }
        | DownloadError::ResourceGone(_)
        | DownloadError::ToolNotFound(_)
        | DownloadError::Timeout(_)
        | DownloadError::Fetch(_) => e,
        other => DownloadError::Fetch(other.to_string()),
    }
}
