// Downloader module - resolution, stream selection, retries and playlists

pub mod claims;
pub mod details;
pub mod errors;
pub mod extractors;
pub mod filename;
pub mod models;
pub mod orchestrator;
pub mod playlist;
pub mod probe;
pub mod stream_selector;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use claims::OutputClaims;
pub use details::DetailsFetcher;
pub use errors::DownloadError;
pub use extractors::{Extractor, ExtractorMode, YtDlpCommand, YtDlpExtractor};
pub use models::{
    DownloadOptions, DownloadOutcome, NetworkConfig, PlaylistDetails, PlaylistResult,
    RetryPolicy, SkipReason, StreamSelector, VideoDetails,
};
pub use orchestrator::Downloader;
pub use probe::{HttpProbe, SourceProbe};
