// StreamSelector - picks the stream a download transfers
//
// Selection order:
// 1. Exact resolution label ("720p"), progressive streams first
// 2. Audio bitrate label ("128kbps"), matched against measured bitrates
// 3. Best available: highest-bitrate audio in audio-only mode,
//    otherwise the highest-resolution progressive stream

use super::errors::DownloadError;
use super::models::{Stream, StreamSelector};

/// Pick one stream for `selector`, or `None` when nothing matches
pub fn select_stream<'a>(
    streams: &'a [Stream],
    selector: &StreamSelector,
    audio_only: bool,
) -> Option<&'a Stream> {
    match selector {
        StreamSelector::Resolution(label) => find_resolution(streams, label),
        StreamSelector::Bitrate(label) => find_bitrate(streams, label),
        StreamSelector::BestAvailable if audio_only => find_best_audio(streams),
        StreamSelector::BestAvailable => find_best_progressive(streams),
    }
}

/// Same as [`select_stream`] with a typed error for the no-match case
pub fn resolve_stream<'a>(
    streams: &'a [Stream],
    selector: &StreamSelector,
    audio_only: bool,
) -> Result<&'a Stream, DownloadError> {
    select_stream(streams, selector, audio_only).ok_or_else(|| DownloadError::NoMatchingStream {
        selector: selector.to_string(),
    })
}

/// yt-dlp lists formats worst to best, so a video-only stream often comes
/// before the progressive one with the same height
fn find_resolution<'a>(streams: &'a [Stream], label: &str) -> Option<&'a Stream> {
    let mut matches = streams
        .iter()
        .filter(|s| s.resolution.as_deref() == Some(label));
    let first = matches.next()?;
    if first.is_progressive() {
        return Some(first);
    }
    matches.find(|s| s.is_progressive()).or(Some(first))
}

/// Measured bitrates drift around the nominal tier (129.5 for "128kbps")
const BITRATE_TOLERANCE_KBPS: f32 = 8.0;

/// Exact label first, else the audio stream closest to the requested tier
fn find_bitrate<'a>(streams: &'a [Stream], label: &str) -> Option<&'a Stream> {
    if let Some(exact) = streams.iter().find(|s| s.abr.as_deref() == Some(label)) {
        return Some(exact);
    }

    let target = parse_kbps(label)?;
    let distance = |s: &Stream| s.bitrate_kbps.map(|b| (b - target).abs());

    streams
        .iter()
        .filter(|s| s.has_audio)
        .filter_map(|s| distance(s).map(|d| (s, d)))
        .filter(|(_, d)| *d <= BITRATE_TOLERANCE_KBPS)
        // audio-only beats progressive, then the closer bitrate wins
        .min_by(|(a, da), (b, db)| {
            b.is_audio_only()
                .cmp(&a.is_audio_only())
                .then(da.total_cmp(db))
        })
        .map(|(s, _)| s)
}

/// "128kbps", "128k" or "128" as kbps
fn parse_kbps(label: &str) -> Option<f32> {
    let lower = label.trim().to_ascii_lowercase();
    let digits = lower
        .strip_suffix("kbps")
        .or_else(|| lower.strip_suffix('k'))
        .unwrap_or(&lower);
    digits.trim().parse::<f32>().ok().filter(|b| *b > 0.0)
}

/// Highest resolution among streams carrying both video and audio
fn find_best_progressive(streams: &[Stream]) -> Option<&Stream> {
    streams
        .iter()
        .filter(|s| s.is_progressive())
        .max_by_key(|s| s.height.unwrap_or(0))
}

/// Highest bitrate audio-only stream, else any stream with audio
fn find_best_audio(streams: &[Stream]) -> Option<&Stream> {
    let by_bitrate = |s: &&Stream| s.bitrate_kbps.map(|b| (b * 100.0) as u32).unwrap_or(0);

    streams
        .iter()
        .filter(|s| s.is_audio_only())
        .max_by_key(by_bitrate)
        .or_else(|| streams.iter().filter(|s| s.has_audio).max_by_key(by_bitrate))
}
