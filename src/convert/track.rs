use crate::api::{strip_angle_brackets, Provider};
use crate::error::{ConvertError, Result};
use crate::models::UniversalTrack;
use crate::query::track_to_query;
use crate::registry::ProviderRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

static MESSAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<?(?:https:|http:)\S+>?").expect("valid message url regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Converted(UniversalTrack),
    /// The source platform has no track with the extracted id.
    SourceNotFound,
    /// The target platform returned no search results.
    NoResults,
}

/// Search `target` for `track` and take its top-ranked result.
pub async fn find_match(
    track: &UniversalTrack,
    target: &dyn Provider,
) -> anyhow::Result<Option<UniversalTrack>> {
    let query = track_to_query(track);
    debug!("Searching {} for {:?}", target.name(), query);
    Ok(target.search_tracks(&query).await?.into_iter().next())
}

/// Convert one track URL from `source` to `target`.
///
/// No retries and no fallback target. Provider failures are returned as
/// `ConvertError::Provider`.
pub async fn convert_track(
    source: &dyn Provider,
    target: &dyn Provider,
    url: &str,
) -> Result<TrackOutcome> {
    let url = strip_angle_brackets(url);
    let track_id = source.get_track_id(url)?;
    let track = match source.track_from_id(&track_id).await? {
        Some(t) => t,
        None => {
            debug!("{} has no track {}", source.name(), track_id);
            return Ok(TrackOutcome::SourceNotFound);
        }
    };
    Ok(match find_match(&track, target).await? {
        Some(found) => TrackOutcome::Converted(found),
        None => TrackOutcome::NoResults,
    })
}

/// Detect the source platform of `url` and convert it to `preferred`.
/// Any failure yields `None`.
async fn convert_detected(
    url: &str,
    registry: &ProviderRegistry,
    preferred_name: &str,
    preferred: &dyn Provider,
) -> Option<String> {
    let url = strip_angle_brackets(url);
    // Already on the preferred platform, even if a catch-all provider would parse it too.
    if preferred.is_valid_track_url(url) {
        debug!("{} is already a {} url", url, preferred.name());
        return None;
    }
    for (name, provider) in registry.iter() {
        if name == preferred_name {
            continue;
        }
        let track_id = match provider.get_track_id(url) {
            Ok(id) => id,
            Err(_) => continue,
        };
        // The first provider that parses the url is authoritative.
        let track = match provider.track_from_id(&track_id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                debug!("{}: no track {} for {}", name, track_id, url);
                return None;
            }
            Err(e) => {
                warn!("{}: resolving {} failed: {}", name, url, e);
                return None;
            }
        };
        return match find_match(&track, preferred).await {
            Ok(found) => found.map(|t| t.url),
            Err(e) => {
                warn!("{}: search for {} failed: {}", preferred.name(), track, e);
                None
            }
        };
    }
    debug!("No provider recognises {}", url);
    None
}

/// Convert every candidate URL to the preferred platform concurrently.
///
/// Output order follows input order. URLs that no provider recognises, or
/// that fail to convert, are dropped.
pub async fn convert_urls<S: AsRef<str>>(
    urls: &[S],
    registry: &ProviderRegistry,
    preferred: &str,
) -> Result<Vec<String>> {
    let preferred_provider: Arc<dyn Provider> = registry
        .lookup(preferred)
        .ok_or_else(|| ConvertError::UnknownProvider(preferred.to_string()))?;
    let preferred_name = preferred.trim().to_lowercase();

    let conversions = urls.iter().map(|url| {
        convert_detected(url.as_ref(), registry, &preferred_name, preferred_provider.as_ref())
    });
    let results = futures::future::join_all(conversions).await;
    Ok(results.into_iter().flatten().collect())
}

/// URLs found in free text. Includes `<...>`-wrapped ones.
pub fn find_urls(text: &str) -> Vec<&str> {
    MESSAGE_URL.find_iter(text).map(|m| m.as_str()).collect()
}

fn is_suppressed(url: &str) -> bool {
    url.starts_with('<') && url.ends_with('>')
}

/// Scan message text and convert its links to the preferred platform.
///
/// Links the author wrapped in `<...>` are left alone. Returns the converted
/// urls joined by spaces, or `None` when nothing converted.
pub async fn convert_message_urls(
    text: &str,
    registry: &ProviderRegistry,
    preferred: &str,
) -> Result<Option<String>> {
    if registry.lookup(preferred).is_none() {
        return Err(ConvertError::UnknownProvider(preferred.to_string()));
    }
    let urls: Vec<&str> = find_urls(text)
        .into_iter()
        .filter(|u| !is_suppressed(u))
        .collect();
    if urls.is_empty() {
        return Ok(None);
    }
    let converted = convert_urls(&urls, registry, preferred).await?;
    if converted.is_empty() {
        return Ok(None);
    }
    Ok(Some(converted.join(" ")))
}
