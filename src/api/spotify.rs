use super::token::{StoredToken, TokenCache};
use super::{OAuthProvider, PlaylistProvider, Provider};
use crate::error::InvalidUrlError;
use crate::models::{UniversalAlbum, UniversalPlaylist, UniversalTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::env;

static TRACK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?open\.spotify\.com/(?:intl-[a-zA-Z-]+/)?track/([a-zA-Z0-9]+)")
        .expect("valid track url regex")
});
static TRACK_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^spotify:track:([a-zA-Z0-9]+)$").expect("valid track uri regex"));
static PLAYLIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?open\.spotify\.com/(?:intl-[a-zA-Z-]+/)?playlist/([a-zA-Z0-9]+)")
        .expect("valid playlist url regex")
});
static PLAYLIST_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^spotify:playlist:([a-zA-Z0-9]+)$").expect("valid playlist uri regex")
});

const SEARCH_LIMIT: u32 = 10;

/// Spotify provider backed by the Spotify Web API, authenticated with the
/// client-credentials grant.
/// Endpoints may be overridden by SPOTIFY_AUTH_BASE and SPOTIFY_API_BASE env vars.
pub struct SpotifyProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    api_base: String,
    auth_base: String,
    token: TokenCache,
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(client_id, client_secret, Self::default_api_base(), Self::default_auth_base())
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        api_base: String,
        auth_base: String,
    ) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth_base: auth_base.trim_end_matches('/').to_string(),
            token: TokenCache::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn default_auth_base() -> String {
        env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
    }
    fn default_api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    async fn request_token(&self) -> Result<StoredToken> {
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        );
        let url = format!("{}/api/token", self.auth_base);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to refresh token: {} - {}", status, body));
        }
        let j: Value = resp.json().await?;
        let access_token = j["access_token"]
            .as_str()
            .ok_or_else(|| anyhow!("no access_token"))?
            .to_string();
        let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
        Ok(StoredToken::from_expires_in(access_token, expires_in))
    }

    pub async fn get_bearer(&self) -> Result<String> {
        self.token.bearer(|| self.request_token()).await
    }

    /// GET a JSON document. `Ok(None)` for 404/400, which Spotify uses for
    /// unknown or malformed ids.
    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let bearer = self.get_bearer().await?;
            let resp = self
                .client
                .get(url)
                .header(AUTHORIZATION, &bearer)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED && attempt == 1 {
                warn!("Got 401 from Spotify; dropping cached token and retrying");
                self.token.invalidate().await;
                continue;
            }
            if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
                debug!("Spotify returned {} for {}", status, url);
                return Ok(None);
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                return Err(anyhow!("rate_limited: retry_after={:?}", retry_after));
            }
            if !status.is_success() {
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!("spotify request failed: {} => {}", status, txt));
            }
            return Ok(Some(resp.json().await?));
        }
    }

    async fn playlist_tracks(&self, first_page: &Value) -> Result<Vec<UniversalTrack>> {
        let mut tracks = Vec::new();
        let mut page = first_page.clone();
        loop {
            if let Some(items) = page["items"].as_array() {
                // local files and podcast episodes have no usable track object
                tracks.extend(
                    items
                        .iter()
                        .filter(|it| it["track"]["type"].as_str().unwrap_or("track") == "track")
                        .filter_map(|it| track_from_json(&it["track"])),
                );
            }
            let next = match page["next"].as_str() {
                Some(n) => n.to_string(),
                None => break,
            };
            page = match self.get_json(&next).await? {
                Some(p) => p,
                None => break,
            };
        }
        Ok(tracks)
    }
}

fn first_image(images: &Value) -> Option<String> {
    images
        .as_array()
        .and_then(|a| a.first())
        .and_then(|i| i["url"].as_str())
        .map(|s| s.to_string())
}

fn artist_names(artists: &Value) -> Vec<String> {
    artists
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|artist| artist["name"].as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Spotify reports release dates at year, month or day precision.
pub(crate) fn parse_release_date(date: &str, precision: Option<&str>) -> Option<DateTime<Utc>> {
    let full = match precision.unwrap_or("day") {
        "year" => format!("{}-01-01", date),
        "month" => format!("{}-01", date),
        _ => date.to_string(),
    };
    let day = NaiveDate::parse_from_str(&full, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
}

fn album_from_json(j: &Value) -> Option<UniversalAlbum> {
    let id = j["id"].as_str()?;
    Some(UniversalAlbum {
        title: j["name"].as_str()?.to_string(),
        artist_names: artist_names(&j["artists"]),
        url: format!("https://open.spotify.com/album/{}", id),
        release_date: j["release_date"]
            .as_str()
            .and_then(|d| parse_release_date(d, j["release_date_precision"].as_str())),
        cover_url: first_image(&j["images"]),
    })
}

pub(crate) fn track_from_json(j: &Value) -> Option<UniversalTrack> {
    let id = j["id"].as_str()?;
    let artists = artist_names(&j["artists"]);
    if artists.is_empty() {
        return None;
    }
    let album = album_from_json(&j["album"]);
    Some(UniversalTrack {
        title: j["name"].as_str()?.to_string(),
        artist_names: artists,
        url: format!("https://open.spotify.com/track/{}", id),
        cover_url: album.as_ref().and_then(|a| a.cover_url.clone()),
        album,
    })
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn name(&self) -> &str {
        "spotify"
    }

    fn get_track_id(&self, track_url: &str) -> Result<String, InvalidUrlError> {
        TRACK_URL
            .captures(track_url)
            .or_else(|| TRACK_URI.captures(track_url))
            .map(|c| c[1].to_string())
            .ok_or_else(|| InvalidUrlError::new("spotify track", track_url))
    }

    async fn track_from_id(&self, track_id: &str) -> Result<Option<UniversalTrack>> {
        let url = format!("{}/tracks/{}", self.api_base, track_id);
        Ok(self.get_json(&url).await?.as_ref().and_then(track_from_json))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<UniversalTrack>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );
        let j = match self.get_json(&url).await? {
            Some(j) => j,
            None => return Ok(Vec::new()),
        };
        Ok(j["tracks"]["items"]
            .as_array()
            .map(|items| items.iter().filter_map(track_from_json).collect())
            .unwrap_or_default())
    }

    fn as_playlist_provider(&self) -> Option<&dyn PlaylistProvider> {
        Some(self)
    }

    fn as_oauth_provider(&self) -> Option<&dyn OAuthProvider> {
        Some(self)
    }
}

#[async_trait]
impl PlaylistProvider for SpotifyProvider {
    fn get_playlist_id(&self, playlist_url: &str) -> Result<String, InvalidUrlError> {
        PLAYLIST_URL
            .captures(playlist_url)
            .or_else(|| PLAYLIST_URI.captures(playlist_url))
            .map(|c| c[1].to_string())
            .ok_or_else(|| InvalidUrlError::new("spotify playlist", playlist_url))
    }

    async fn get_playlist_content(&self, playlist_id: &str) -> Result<Option<UniversalPlaylist>> {
        let url = format!("{}/playlists/{}", self.api_base, playlist_id);
        let j = match self.get_json(&url).await? {
            Some(j) => j,
            None => return Ok(None),
        };
        let tracks = self.playlist_tracks(&j["tracks"]).await?;
        let owner = j["owner"]["display_name"]
            .as_str()
            .or_else(|| j["owner"]["id"].as_str())
            .map(|s| vec![s.to_string()]);
        Ok(Some(UniversalPlaylist {
            name: j["name"].as_str().unwrap_or("").to_string(),
            description: j["description"]
                .as_str()
                .filter(|d| !d.trim().is_empty())
                .map(|s| s.to_string()),
            owner_names: owner,
            url: format!("https://open.spotify.com/playlist/{}", playlist_id),
            cover_url: first_image(&j["images"]),
            tracks,
        }))
    }
}

#[async_trait]
impl OAuthProvider for SpotifyProvider {
    async fn should_update_token(&self) -> bool {
        self.token.should_update().await
    }

    async fn refresh_access_token(&self) -> Result<()> {
        self.token.force_refresh(|| self.request_token()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn provider() -> SpotifyProvider {
        SpotifyProvider::with_endpoints("id".into(), "secret".into(), "http://api".into(), "http://auth".into())
    }

    #[test]
    fn extracts_track_ids() {
        let p = provider();
        assert_eq!(
            p.get_track_id("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc").unwrap(),
            "4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            p.get_track_id("https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC").unwrap(),
            "4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(p.get_track_id("spotify:track:abc123").unwrap(), "abc123");
        assert!(p.get_track_id("https://open.spotify.com/album/abc").is_err());
        assert!(!p.is_valid_track_url("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn extracts_playlist_ids() {
        let p = provider();
        assert_eq!(
            p.get_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert!(!p.is_valid_playlist_url("https://open.spotify.com/track/abc"));
    }

    #[test]
    fn canonical_track_url_round_trips() {
        let j = serde_json::json!({
            "id": "abc123",
            "name": "Song",
            "artists": [{"name": "Artist"}],
        });
        let track = track_from_json(&j).unwrap();
        assert_eq!(provider().get_track_id(&track.url).unwrap(), "abc123");
        assert!(track.album.is_none());
    }

    #[test]
    fn release_date_precisions() {
        let y = parse_release_date("1999", Some("year")).unwrap();
        assert_eq!((y.year(), y.month(), y.day()), (1999, 1, 1));
        let m = parse_release_date("1999-07", Some("month")).unwrap();
        assert_eq!((m.year(), m.month()), (1999, 7));
        assert!(parse_release_date("garbage", None).is_none());
    }
}
