use super::{PlaylistProvider, Provider};
use crate::error::InvalidUrlError;
use crate::models::{UniversalPlaylist, UniversalTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;

pub const DEFAULT_INSTANCE_URL: &str = "https://yt.artemislena.eu";

const VIDEO_FIELDS: &str = "title,author,videoId,videoThumbnails,type";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid url regex")
}

// The host can be any Invidious instance, so only the path shape is checked.
static INVIDIOUS_WATCH: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:https?://)?.+\..+watch\?v=([a-zA-Z0-9_\-]+)"));
static INVIDIOUS_PLAYLIST: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:https?://)?.+\..+playlist\?list=([a-zA-Z0-9_\-]+)"));

static YOUTUBE_WATCH: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/watch\?(?:[^#\s]*&)?v=([a-zA-Z0-9_\-]+)")
});
static YOUTUBE_SHORT: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:https?://)?youtu\.be/([a-zA-Z0-9_\-]+)"));
static YOUTUBE_PLAYLIST: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/playlist\?list=([a-zA-Z0-9_\-]+)")
});

static MUSIC_WATCH: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:https?://)?music\.youtube\.com/watch\?v=([a-zA-Z0-9_\-]+)"));
static MUSIC_PLAYLIST: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:https?://)?music\.youtube\.com/playlist\?list=([a-zA-Z0-9_\-]+)"));

fn first_capture(patterns: &[&Regex], url: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(url))
        .map(|c| c[1].to_string())
}

/// Decides which URLs a video platform accepts and how its canonical URLs
/// look. The search/resolve routine in `VideoProvider` is shared.
pub trait UrlStyle: Send + Sync {
    fn platform(&self) -> &str;
    fn video_id(&self, url: &str) -> Option<String>;
    fn playlist_id(&self, url: &str) -> Option<String>;
    fn video_url(&self, instance_url: &str, video_id: &str) -> String;
    fn playlist_url(&self, instance_url: &str, playlist_id: &str) -> String;
}

pub struct InvidiousStyle;

impl UrlStyle for InvidiousStyle {
    fn platform(&self) -> &str {
        "invidious"
    }
    fn video_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*INVIDIOUS_WATCH], url)
    }
    fn playlist_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*INVIDIOUS_PLAYLIST], url)
    }
    fn video_url(&self, instance_url: &str, video_id: &str) -> String {
        format!("{}/watch?v={}", instance_url, video_id)
    }
    fn playlist_url(&self, instance_url: &str, playlist_id: &str) -> String {
        format!("{}/playlist?list={}", instance_url, playlist_id)
    }
}

pub struct YoutubeStyle;

impl UrlStyle for YoutubeStyle {
    fn platform(&self) -> &str {
        "youtube"
    }
    fn video_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*YOUTUBE_WATCH, &*YOUTUBE_SHORT], url)
    }
    fn playlist_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*YOUTUBE_PLAYLIST], url)
    }
    fn video_url(&self, _instance_url: &str, video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
    fn playlist_url(&self, _instance_url: &str, playlist_id: &str) -> String {
        format!("https://www.youtube.com/playlist?list={}", playlist_id)
    }
}

pub struct YoutubeMusicStyle;

impl UrlStyle for YoutubeMusicStyle {
    fn platform(&self) -> &str {
        "youtube_music"
    }
    fn video_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*MUSIC_WATCH], url)
    }
    fn playlist_id(&self, url: &str) -> Option<String> {
        first_capture(&[&*MUSIC_PLAYLIST], url)
    }
    fn video_url(&self, _instance_url: &str, video_id: &str) -> String {
        format!("https://music.youtube.com/watch?v={}", video_id)
    }
    fn playlist_url(&self, _instance_url: &str, playlist_id: &str) -> String {
        format!("https://music.youtube.com/playlist?list={}", playlist_id)
    }
}

/// Video platform provider that resolves and searches through the
/// Invidious API, with URL handling delegated to a `UrlStyle`.
pub struct VideoProvider {
    client: Client,
    instance_url: String,
    style: Box<dyn UrlStyle>,
}

impl VideoProvider {
    pub fn new(instance_url: &str, style: Box<dyn UrlStyle>) -> Self {
        Self {
            client: Client::new(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
            style,
        }
    }

    pub fn invidious(instance_url: &str) -> Self {
        Self::new(instance_url, Box::new(InvidiousStyle))
    }

    pub fn youtube(instance_url: &str) -> Self {
        Self::new(instance_url, Box::new(YoutubeStyle))
    }

    pub fn youtube_music(instance_url: &str) -> Self {
        Self::new(instance_url, Box::new(YoutubeMusicStyle))
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{}: {} returned 404", self.style.platform(), url);
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
            return Err(anyhow!("invidious request failed: {} => {}", status, txt));
        }
        Ok(Some(resp.json().await?))
    }

    fn video_to_universal(&self, video: &Value) -> Option<UniversalTrack> {
        let video_id = video["videoId"].as_str()?;
        let author = video["author"].as_str()?;
        // auto-generated music channels are named "<Artist> - Topic"
        let author = author.strip_suffix(" - Topic").unwrap_or(author);
        Some(UniversalTrack {
            title: video["title"].as_str()?.to_string(),
            artist_names: vec![author.to_string()],
            url: self.style.video_url(&self.instance_url, video_id),
            cover_url: video["videoThumbnails"]
                .as_array()
                .and_then(|t| t.first())
                .and_then(|t| t["url"].as_str())
                .map(|s| s.to_string()),
            album: None,
        })
    }
}

#[async_trait]
impl Provider for VideoProvider {
    fn name(&self) -> &str {
        self.style.platform()
    }

    fn get_track_id(&self, track_url: &str) -> Result<String, InvalidUrlError> {
        self.style
            .video_id(track_url)
            .ok_or_else(|| InvalidUrlError::new(format!("{} video", self.style.platform()), track_url))
    }

    async fn track_from_id(&self, track_id: &str) -> Result<Option<UniversalTrack>> {
        let url = format!(
            "{}/api/v1/videos/{}?fields={}",
            self.instance_url, track_id, VIDEO_FIELDS
        );
        Ok(self
            .get_json(&url)
            .await?
            .as_ref()
            .and_then(|v| self.video_to_universal(v)))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<UniversalTrack>> {
        let url = format!(
            "{}/api/v1/search?q={}&type=video&fields={}",
            self.instance_url,
            urlencoding::encode(query),
            VIDEO_FIELDS
        );
        let results = match self.get_json(&url).await? {
            Some(j) => j,
            None => return Ok(Vec::new()),
        };
        Ok(results
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v["type"].as_str() == Some("video"))
                    .filter_map(|v| self.video_to_universal(v))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn as_playlist_provider(&self) -> Option<&dyn PlaylistProvider> {
        Some(self)
    }
}

#[async_trait]
impl PlaylistProvider for VideoProvider {
    fn get_playlist_id(&self, playlist_url: &str) -> Result<String, InvalidUrlError> {
        self.style.playlist_id(playlist_url).ok_or_else(|| {
            InvalidUrlError::new(format!("{} playlist", self.style.platform()), playlist_url)
        })
    }

    async fn get_playlist_content(&self, playlist_id: &str) -> Result<Option<UniversalPlaylist>> {
        let base = format!("{}/api/v1/playlists/{}", self.instance_url, playlist_id);
        let info = match self.get_json(&base).await? {
            Some(j) => j,
            None => return Ok(None),
        };
        let expected = info["videoCount"].as_u64().unwrap_or(0) as usize;

        let mut videos: Vec<Value> = info["videos"].as_array().cloned().unwrap_or_default();
        let mut page = 1;
        while videos.len() < expected {
            page += 1;
            let next = match self.get_json(&format!("{}?page={}", base, page)).await? {
                Some(j) => j,
                None => break,
            };
            match next["videos"].as_array() {
                Some(more) if !more.is_empty() => videos.extend(more.iter().cloned()),
                _ => break,
            }
        }

        let tracks: Vec<UniversalTrack> = videos
            .iter()
            .filter_map(|v| self.video_to_universal(v))
            .collect();
        Ok(Some(UniversalPlaylist {
            name: info["title"].as_str().unwrap_or("").to_string(),
            description: info["description"]
                .as_str()
                .filter(|d| !d.trim().is_empty())
                .map(|s| s.to_string()),
            owner_names: info["author"].as_str().map(|a| vec![a.to_string()]),
            url: self.style.playlist_url(&self.instance_url, playlist_id),
            cover_url: tracks.first().and_then(|t| t.cover_url.clone()),
            tracks,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invidious_accepts_any_instance() {
        let p = VideoProvider::invidious("https://inv.example.org/");
        assert_eq!(p.instance_url(), "https://inv.example.org");
        assert_eq!(p.get_track_id("https://yewtu.be/watch?v=dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(p.get_playlist_id("https://yewtu.be/playlist?list=PL123_-x").unwrap(), "PL123_-x");
        assert!(p.get_track_id("not a url").is_err());
    }

    #[test]
    fn youtube_shapes() {
        let p = VideoProvider::youtube(DEFAULT_INSTANCE_URL);
        assert_eq!(p.get_track_id("https://www.youtube.com/watch?v=abc_-1").unwrap(), "abc_-1");
        assert_eq!(p.get_track_id("https://youtube.com/watch?t=10&v=abc").unwrap(), "abc");
        assert_eq!(p.get_track_id("https://youtu.be/abc").unwrap(), "abc");
        assert!(p.get_track_id("https://music.youtube.com/watch?v=abc").is_err());
        assert!(p.get_track_id("https://open.spotify.com/track/abc").is_err());
    }

    #[test]
    fn youtube_music_rewrites_canonical_urls() {
        let p = VideoProvider::youtube_music(DEFAULT_INSTANCE_URL);
        let track = p
            .video_to_universal(&serde_json::json!({
                "title": "Song",
                "author": "Artist - Topic",
                "videoId": "abc",
                "videoThumbnails": [{"url": "https://img/1.jpg"}],
                "type": "video"
            }))
            .unwrap();
        assert_eq!(track.url, "https://music.youtube.com/watch?v=abc");
        assert_eq!(track.artist_names, vec!["Artist".to_string()]);
        assert_eq!(p.get_track_id(&track.url).unwrap(), "abc");
        assert!(p.get_track_id("https://www.youtube.com/watch?v=abc").is_err());
    }
}
