use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Platform that converted links point to.
    #[serde(default = "default_preferred_platform")]
    pub preferred_platform: String,

    /// Playlist length cap for non-privileged callers.
    #[serde(default = "default_max_convert_playlist_size")]
    pub max_convert_playlist_size: usize,

    /// Empty disables passive message scanning.
    #[serde(default)]
    pub disliked_platforms: Vec<String>,

    #[serde(default = "default_playlist_cooldown_ms")]
    pub playlist_cooldown_ms: u64,

    #[serde(default = "default_report_chunk_limit")]
    pub report_chunk_limit: usize,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub invidious: InvidiousConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InvidiousConfig {
    #[serde(default = "default_instance_url")]
    pub instance_url: String,
}

impl Default for InvidiousConfig {
    fn default() -> Self {
        Self { instance_url: default_instance_url() }
    }
}

fn default_preferred_platform() -> String { "youtube".into() }
fn default_max_convert_playlist_size() -> usize { 15 }
fn default_playlist_cooldown_ms() -> u64 { 500 }
fn default_report_chunk_limit() -> usize { 2000 }
fn default_log_dir() -> PathBuf { "/var/log/music-convert".into() }
fn default_instance_url() -> String { crate::api::invidious::DEFAULT_INSTANCE_URL.into() }

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_platform: default_preferred_platform(),
            max_convert_playlist_size: default_max_convert_playlist_size(),
            disliked_platforms: Vec::new(),
            playlist_cooldown_ms: default_playlist_cooldown_ms(),
            report_chunk_limit: default_report_chunk_limit(),
            log_dir: default_log_dir(),
            spotify: SpotifyConfig::default(),
            invidious: InvidiousConfig::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let mut cfg: Config = toml::from_str(&s)?;
        cfg.fill_from_env();
        Ok(cfg)
    }

    /// Blank Spotify credentials are taken from SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET.
    pub fn fill_from_env(&mut self) {
        if self.spotify.client_id.is_empty() {
            self.spotify.client_id = std::env::var("SPOTIFY_CLIENT_ID").unwrap_or_default();
        }
        if self.spotify.client_secret.is_empty() {
            self.spotify.client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default();
        }
    }

    /// Passive scanning only runs when at least one platform is disliked.
    pub fn passive_scan_enabled(&self) -> bool {
        !self.disliked_platforms.is_empty()
    }

    pub fn playlist_options(&self) -> crate::convert::playlist::PlaylistOptions {
        crate::convert::playlist::PlaylistOptions {
            max_size: self.max_convert_playlist_size,
            cooldown: std::time::Duration::from_millis(self.playlist_cooldown_ms),
            chunk_limit: self.report_chunk_limit,
        }
    }
}
