//! Playlist conversion.
//!
//! A run goes Resolving -> Windowed -> Converting(1..=N) -> Assembling -> Done.
//! Resolution failures end it early (invalid url / playlist not found), and
//! a run where no track converted ends without emitting any report.

use super::report::{self, REPORT_CHUNK_LIMIT};
use super::track::find_match;
use crate::api::{strip_angle_brackets, Provider};
use crate::error::{ConvertError, Result};
use crate::models::UniversalTrack;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub const ATTACHMENT_NAME: &str = "converted_tracks.txt";

#[derive(Debug, Clone)]
pub struct PlaylistOptions {
    /// Cap on converted tracks for non-privileged callers.
    pub max_size: usize,
    /// Pause between two consecutive track searches.
    pub cooldown: Duration,
    pub chunk_limit: usize,
}

impl Default for PlaylistOptions {
    fn default() -> Self {
        Self {
            max_size: 15,
            cooldown: Duration::from_millis(500),
            chunk_limit: REPORT_CHUNK_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub url: String,
    /// 1-based; tracks before it are skipped.
    pub start_index: usize,
    /// Privileged callers are not subject to `max_size`.
    pub privileged: bool,
}

impl PlaylistRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_index: 1,
            privileged: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Output handed to the presentation layer while a conversion runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistEvent {
    /// Sent once, before any track is converted.
    Notice(String),
    /// One page of the report. Only the last page carries the attachment.
    Chunk {
        text: String,
        attachment: Option<Attachment>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistOutcome {
    Completed { converted: usize, not_found: usize },
    /// Missing, private, or empty.
    PlaylistNotFound,
    /// Every track failed to convert; nothing was emitted after the notice.
    NoResults,
}

/// Apply the 1-based `start_index` and optional cap. Returns the window and
/// whether the whole playlist is longer than the cap.
pub fn window(
    tracks: &[UniversalTrack],
    start_index: usize,
    max_size: Option<usize>,
) -> (&[UniversalTrack], bool) {
    let start = start_index.max(1) - 1;
    let rest = tracks.get(start..).unwrap_or(&[]);
    match max_size {
        Some(max) => (&rest[..rest.len().min(max)], tracks.len() > max),
        None => (rest, false),
    }
}

fn emit(events: &UnboundedSender<PlaylistEvent>, event: PlaylistEvent) {
    // The caller may have gone away; the run still completes.
    if events.send(event).is_err() {
        debug!("Playlist event receiver dropped");
    }
}

/// Convert tracks strictly one after another with `cooldown` between
/// searches. Failed or empty searches keep their slot as `None`.
async fn convert_sequentially(
    tracks: &[UniversalTrack],
    target: &dyn Provider,
    cooldown: Duration,
) -> Vec<Option<String>> {
    let mut results = Vec::with_capacity(tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(cooldown).await;
        }
        let converted = match find_match(track, target).await {
            Ok(Some(found)) => Some(found.url),
            Ok(None) => {
                debug!("No match for {} on {}", track, target.name());
                None
            }
            Err(e) => {
                warn!("Search for {} on {} failed: {}", track, target.name(), e);
                None
            }
        };
        results.push(converted);
    }
    results
}

/// Convert a playlist from `source` to `target`, streaming the notice and
/// report chunks through `events`.
pub async fn convert_playlist(
    source: &dyn Provider,
    target: &dyn Provider,
    request: &PlaylistRequest,
    options: &PlaylistOptions,
    events: &UnboundedSender<PlaylistEvent>,
) -> Result<PlaylistOutcome> {
    let playlists = source
        .as_playlist_provider()
        .ok_or_else(|| ConvertError::PlaylistsUnsupported(source.name().to_string()))?;

    let url = strip_angle_brackets(&request.url);
    let playlist_id = playlists.get_playlist_id(url)?;
    let playlist = match playlists.get_playlist_content(&playlist_id).await? {
        Some(p) if !p.tracks.is_empty() => p,
        _ => {
            info!("{}: playlist {} not found or empty", source.name(), playlist_id);
            return Ok(PlaylistOutcome::PlaylistNotFound);
        }
    };

    let cap = if request.privileged { None } else { Some(options.max_size) };
    let (tracks, truncated) = window(&playlist.tracks, request.start_index, cap);
    let notice = if truncated {
        format!(
            "This playlist is too big to convert in a reasonable amount of time, \
             only the first {} tracks will be converted.\nThis may take a while...",
            options.max_size
        )
    } else {
        "Converting tracks. This may take a while...".to_string()
    };
    emit(events, PlaylistEvent::Notice(notice));

    info!(
        "Converting {} of {} tracks from {} to {}",
        tracks.len(),
        playlist.tracks.len(),
        source.name(),
        target.name()
    );
    let results = convert_sequentially(tracks, target, options.cooldown).await;

    let converted = results.iter().filter(|r| r.is_some()).count();
    if converted == 0 {
        info!("No tracks of {} could be converted", playlist.url);
        return Ok(PlaylistOutcome::NoResults);
    }

    let mut chunks = report::paginate(
        &report::report_header(url),
        report::report_lines(&results),
        options.chunk_limit,
    );
    let attachment = Attachment {
        filename: ATTACHMENT_NAME.to_string(),
        content: report::attachment_text(&results).into_bytes(),
    };
    let last = chunks.pop();
    for text in chunks {
        emit(events, PlaylistEvent::Chunk { text, attachment: None });
    }
    if let Some(text) = last {
        emit(
            events,
            PlaylistEvent::Chunk {
                text,
                attachment: Some(attachment),
            },
        );
    }

    Ok(PlaylistOutcome::Completed {
        converted,
        not_found: results.len() - converted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<UniversalTrack> {
        (1..=n)
            .map(|i| UniversalTrack::new(format!("t{}", i), vec!["a".into()], format!("https://x/{}", i)))
            .collect()
    }

    #[test]
    fn caps_from_the_start() {
        let all = tracks(50);
        let (w, truncated) = window(&all, 1, Some(15));
        assert_eq!(w.len(), 15);
        assert_eq!(w[0].title, "t1");
        assert_eq!(w[14].title, "t15");
        assert!(truncated);
    }

    #[test]
    fn start_index_then_cap() {
        let all = tracks(50);
        let (w, truncated) = window(&all, 40, Some(15));
        assert_eq!(w.len(), 11);
        assert_eq!(w[0].title, "t40");
        assert!(truncated);
    }

    #[test]
    fn short_playlist_is_not_truncated() {
        let all = tracks(15);
        let (w, truncated) = window(&all, 1, Some(15));
        assert_eq!(w.len(), 15);
        assert!(!truncated);
    }

    #[test]
    fn privileged_is_uncapped_and_zero_start_is_first() {
        let all = tracks(50);
        let (w, truncated) = window(&all, 0, None);
        assert_eq!(w.len(), 50);
        assert!(!truncated);
    }

    #[test]
    fn start_past_end_is_empty() {
        let all = tracks(3);
        let (w, _) = window(&all, 10, Some(15));
        assert!(w.is_empty());
    }
}
