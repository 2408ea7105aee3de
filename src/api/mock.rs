use super::{PlaylistProvider, Provider};
use crate::error::InvalidUrlError;
use crate::models::{UniversalPlaylist, UniversalTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// One recorded `search_tracks` call.
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub at: Instant,
}

/// Build a track whose url has the mock shape `https://{host}/{id}`.
pub fn mock_track(host: &str, id: &str, title: &str, artists: &[&str]) -> UniversalTrack {
    UniversalTrack::new(
        title,
        artists.iter().map(|a| a.to_string()).collect(),
        format!("https://{}/{}", host, id),
    )
}

/// A scripted in-memory provider used in tests.
/// Track urls look like `https://{host}/{id}`, playlists like
/// `https://{host}/playlist/{id}`. Unscripted searches return no results.
pub struct MockProvider {
    name: String,
    host: String,
    track_re: Regex,
    playlist_re: Regex,
    tracks: HashMap<String, UniversalTrack>,
    failing_lookups: HashSet<String>,
    search_results: HashMap<String, Vec<UniversalTrack>>,
    failing_searches: HashSet<String>,
    playlists: Option<HashMap<String, UniversalPlaylist>>,
    lookup_delay: Option<Duration>,
    searches: Mutex<Vec<SearchCall>>,
}

impl MockProvider {
    pub fn new(name: &str, host: &str) -> Self {
        let escaped = regex::escape(host);
        Self {
            name: name.to_string(),
            host: host.to_string(),
            track_re: Regex::new(&format!(r"^(?:https?://)?{}/([A-Za-z0-9_\-]+)$", escaped))
                .expect("valid mock track regex"),
            playlist_re: Regex::new(&format!(
                r"^(?:https?://)?{}/playlist/([A-Za-z0-9_\-]+)$",
                escaped
            ))
            .expect("valid mock playlist regex"),
            tracks: HashMap::new(),
            failing_lookups: HashSet::new(),
            search_results: HashMap::new(),
            failing_searches: HashSet::new(),
            playlists: None,
            lookup_delay: None,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn with_track(mut self, id: &str, title: &str, artists: &[&str]) -> Self {
        let track = mock_track(&self.host, id, title, artists);
        self.tracks.insert(id.to_string(), track);
        self
    }

    /// `track_from_id(id)` fails with a transport error.
    pub fn with_failing_lookup(mut self, id: &str) -> Self {
        self.failing_lookups.insert(id.to_string());
        self
    }

    /// Make every `track_from_id` take `delay`.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn with_search_result(mut self, query: &str, results: Vec<UniversalTrack>) -> Self {
        self.search_results.insert(query.to_string(), results);
        self
    }

    /// `search_tracks(query)` fails as if the platform rate limited us.
    pub fn with_failing_search(mut self, query: &str) -> Self {
        self.failing_searches.insert(query.to_string());
        self
    }

    /// Enable the playlist capability without adding any playlist.
    pub fn with_playlist_support(mut self) -> Self {
        self.playlists.get_or_insert_with(HashMap::new);
        self
    }

    pub fn with_playlist(mut self, id: &str, name: &str, tracks: Vec<UniversalTrack>) -> Self {
        let playlist = UniversalPlaylist {
            name: name.to_string(),
            description: None,
            owner_names: Some(vec!["mock".to_string()]),
            url: format!("https://{}/playlist/{}", self.host, id),
            cover_url: None,
            tracks,
        };
        self.playlists
            .get_or_insert_with(HashMap::new)
            .insert(id.to_string(), playlist);
        self
    }

    /// Every search made so far, in call order.
    pub fn searches(&self) -> Vec<SearchCall> {
        self.searches
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_track_id(&self, track_url: &str) -> Result<String, InvalidUrlError> {
        self.track_re
            .captures(track_url)
            .map(|c| c[1].to_string())
            .ok_or_else(|| InvalidUrlError::new(format!("{} track", self.name), track_url))
    }

    async fn track_from_id(&self, track_id: &str) -> Result<Option<UniversalTrack>> {
        info!("MockProvider {}: track_from_id {}", self.name, track_id);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_lookups.contains(track_id) {
            return Err(anyhow!("{}: connection reset", self.name));
        }
        Ok(self.tracks.get(track_id).cloned())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<UniversalTrack>> {
        info!("MockProvider {}: search {}", self.name, query);
        if let Ok(mut calls) = self.searches.lock() {
            calls.push(SearchCall {
                query: query.to_string(),
                at: Instant::now(),
            });
        }
        if self.failing_searches.contains(query) {
            return Err(anyhow!("rate_limited: retry_after=Some(1)"));
        }
        Ok(self.search_results.get(query).cloned().unwrap_or_default())
    }

    fn as_playlist_provider(&self) -> Option<&dyn PlaylistProvider> {
        self.playlists.as_ref().map(|_| self as &dyn PlaylistProvider)
    }
}

#[async_trait]
impl PlaylistProvider for MockProvider {
    fn get_playlist_id(&self, playlist_url: &str) -> Result<String, InvalidUrlError> {
        self.playlist_re
            .captures(playlist_url)
            .map(|c| c[1].to_string())
            .ok_or_else(|| InvalidUrlError::new(format!("{} playlist", self.name), playlist_url))
    }

    async fn get_playlist_content(&self, playlist_id: &str) -> Result<Option<UniversalPlaylist>> {
        Ok(self
            .playlists
            .as_ref()
            .and_then(|p| p.get(playlist_id))
            .cloned())
    }
}
