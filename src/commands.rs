//! User-facing command handlers. Platform names and urls come in as typed,
//! and `InvalidURL` / unknown-platform / not-found outcomes come back as
//! reply text. Other errors propagate.

use crate::config::Config;
use crate::convert::playlist::{convert_playlist, PlaylistEvent, PlaylistOptions, PlaylistOutcome, PlaylistRequest};
use crate::convert::report::{playlist_summary, PlaylistSummary};
use crate::convert::track::{convert_message_urls, convert_track, TrackOutcome};
use crate::error::ConvertError;
use crate::registry::ProviderRegistry;
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

pub const UNKNOWN_PLATFORM: &str = "Unknown platform";
pub const INVALID_URL: &str = "Invalid url";
pub const INVALID_PLAYLIST_URL: &str = "Invalid playlist url";
pub const NO_RESULTS: &str = "No results found";
pub const TRACK_NOT_FOUND: &str = "Could not find that track";
pub const PLAYLIST_NOT_FOUND: &str = "Could not find that playlist. Ensure that it exists and is public.";
pub const NOTHING_TO_CONVERT: &str = "Nothing to convert";

fn backticked(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{}`", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a single track url; the reply is the converted url or a message.
pub async fn track_convert(
    registry: &ProviderRegistry,
    from_platform: &str,
    to_platform: &str,
    url: &str,
) -> Result<String> {
    let (source, target) = match (registry.lookup(from_platform), registry.lookup(to_platform)) {
        (Some(s), Some(t)) => (s, t),
        _ => return Ok(UNKNOWN_PLATFORM.to_string()),
    };
    match convert_track(source.as_ref(), target.as_ref(), url).await {
        Ok(TrackOutcome::Converted(track)) => Ok(track.url),
        Ok(TrackOutcome::SourceNotFound) => Ok(TRACK_NOT_FOUND.to_string()),
        Ok(TrackOutcome::NoResults) => Ok(NO_RESULTS.to_string()),
        Err(ConvertError::InvalidUrl(_)) => Ok(INVALID_URL.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Search one platform and reply with up to `count` result urls.
pub async fn search(
    registry: &ProviderRegistry,
    platform: &str,
    query: &str,
    count: usize,
) -> Result<String> {
    let provider = match registry.lookup(platform) {
        Some(p) => p,
        None => {
            return Ok(format!(
                "Invalid platform! Available platforms are: {}",
                backticked(&registry.list_names())
            ))
        }
    };
    let results = provider.search_tracks(query).await?;
    if results.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }
    Ok(results
        .iter()
        .take(count.max(1))
        .map(|t| t.url.as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistInfoReply {
    Summary(PlaylistSummary),
    Message(String),
}

pub async fn playlist_info(
    registry: &ProviderRegistry,
    platform: &str,
    playlist_url: &str,
    max_tracks: usize,
) -> Result<PlaylistInfoReply> {
    let provider = registry.lookup(platform);
    let playlists = match provider.as_deref().and_then(|p| p.as_playlist_provider()) {
        Some(p) => p,
        None => {
            return Ok(PlaylistInfoReply::Message(format!(
                "Invalid platform! Available platforms with playlist support are: {}",
                backticked(&registry.playlist_capable())
            )))
        }
    };
    let playlist_id = match playlists.get_playlist_id(crate::api::strip_angle_brackets(playlist_url)) {
        Ok(id) => id,
        Err(_) => return Ok(PlaylistInfoReply::Message(INVALID_PLAYLIST_URL.to_string())),
    };
    Ok(match playlists.get_playlist_content(&playlist_id).await? {
        Some(playlist) => PlaylistInfoReply::Summary(playlist_summary(&playlist, max_tracks)),
        None => PlaylistInfoReply::Message(PLAYLIST_NOT_FOUND.to_string()),
    })
}

/// Convert a playlist. Progress and the report go through `events`; the
/// returned text, if any, is a final reply for the failure cases.
#[allow(clippy::too_many_arguments)]
pub async fn playlist_convert(
    registry: &ProviderRegistry,
    from_platform: &str,
    to_platform: &str,
    url: &str,
    start_index: usize,
    privileged: bool,
    options: &PlaylistOptions,
    events: &UnboundedSender<PlaylistEvent>,
) -> Result<Option<String>> {
    let source = registry
        .lookup(from_platform)
        .filter(|p| p.as_playlist_provider().is_some());
    let (source, target) = match (source, registry.lookup(to_platform)) {
        (Some(s), Some(t)) => (s, t),
        _ => return Ok(Some(UNKNOWN_PLATFORM.to_string())),
    };
    let request = PlaylistRequest {
        url: url.to_string(),
        start_index,
        privileged,
    };
    match convert_playlist(source.as_ref(), target.as_ref(), &request, options, events).await {
        Ok(PlaylistOutcome::Completed { .. }) => Ok(None),
        Ok(PlaylistOutcome::PlaylistNotFound) => Ok(Some(PLAYLIST_NOT_FOUND.to_string())),
        Ok(PlaylistOutcome::NoResults) => Ok(Some(NO_RESULTS.to_string())),
        Err(ConvertError::InvalidUrl(_)) => Ok(Some(INVALID_PLAYLIST_URL.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Passive handler for every inbound message. `None` means stay silent.
pub async fn on_message(registry: &ProviderRegistry, cfg: &Config, text: &str) -> Result<Option<String>> {
    if !cfg.passive_scan_enabled() {
        return Ok(None);
    }
    Ok(convert_message_urls(text, registry, &cfg.preferred_platform).await?)
}

/// Explicit "convert this message" action.
pub async fn convert_message(registry: &ProviderRegistry, cfg: &Config, text: &str) -> Result<String> {
    Ok(convert_message_urls(text, registry, &cfg.preferred_platform)
        .await?
        .unwrap_or_else(|| NOTHING_TO_CONVERT.to_string()))
}
