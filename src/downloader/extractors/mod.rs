// Extractor module - the yt-dlp collaborator behind a trait
//
// Two invocation modes:
// - CLI mode: native `yt-dlp` binary (faster, no Python dependency)
// - Python mode: `python3 -m yt_dlp` (when only the module is installed)

mod cli;
mod traits;

pub use cli::{YtDlpCommand, YtDlpExtractor};
pub use traits::{Extractor, ExtractorMode};
