pub mod invidious;
pub mod mock;
pub mod spotify;
pub mod token;

use crate::error::InvalidUrlError;
use crate::models::{UniversalPlaylist, UniversalTrack};
use anyhow::Result;

/// Provider trait: the operations the converters need from a platform.
/// Implementations: spotify::SpotifyProvider, invidious::VideoProvider, mock::MockProvider.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Return the provider's name (for logging, registry keys, etc)
    fn name(&self) -> &str;

    /// Parse a platform URL into a track id. Pure; never touches the network.
    fn get_track_id(&self, track_url: &str) -> Result<String, InvalidUrlError>;

    /// Resolve a track id. `Ok(None)` when the platform has no such track.
    async fn track_from_id(&self, track_id: &str) -> Result<Option<UniversalTrack>>;

    /// Free-text search, in the platform's own relevance order.
    async fn search_tracks(&self, query: &str) -> Result<Vec<UniversalTrack>>;

    fn is_valid_track_url(&self, track_url: &str) -> bool {
        self.get_track_id(track_url).is_ok()
    }

    /// Playlist capability, if this platform has one.
    fn as_playlist_provider(&self) -> Option<&dyn PlaylistProvider> {
        None
    }

    /// OAuth capability, if requests to this platform need a bearer token.
    fn as_oauth_provider(&self) -> Option<&dyn OAuthProvider> {
        None
    }
}

#[async_trait::async_trait]
pub trait PlaylistProvider: Send + Sync {
    fn get_playlist_id(&self, playlist_url: &str) -> Result<String, InvalidUrlError>;

    /// Resolve a playlist with all of its tracks. `Ok(None)` when missing or private.
    async fn get_playlist_content(&self, playlist_id: &str) -> Result<Option<UniversalPlaylist>>;

    fn is_valid_playlist_url(&self, playlist_url: &str) -> bool {
        self.get_playlist_id(playlist_url).is_ok()
    }
}

/// Providers refresh transparently before requests; this is exposed for
/// diagnostics only.
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    async fn should_update_token(&self) -> bool;

    async fn refresh_access_token(&self) -> Result<()>;
}

/// Remove the `<...>` wrapper chat clients use to suppress link previews.
pub fn strip_angle_brackets(url: &str) -> &str {
    let trimmed = url.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}
