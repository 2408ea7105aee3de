use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalAlbum {
    pub title: String,
    pub artist_names: Vec<String>,
    pub url: String,
    pub release_date: Option<DateTime<Utc>>,
    pub cover_url: Option<String>,
}

/// A track as seen by every provider. `url` is the canonical link on the
/// platform that resolved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalTrack {
    pub title: String,
    pub artist_names: Vec<String>,
    pub url: String,
    pub cover_url: Option<String>,
    pub album: Option<UniversalAlbum>,
}

/// Tracks are kept in playback order; conversion preserves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalPlaylist {
    pub name: String,
    pub description: Option<String>,
    pub owner_names: Option<Vec<String>>,
    pub url: String,
    pub cover_url: Option<String>,
    pub tracks: Vec<UniversalTrack>,
}

impl UniversalTrack {
    pub fn new(title: impl Into<String>, artist_names: Vec<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist_names,
            url: url.into(),
            cover_url: None,
            album: None,
        }
    }
}

impl fmt::Display for UniversalAlbum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.artist_names.join(", "))
    }
}

impl fmt::Display for UniversalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.artist_names.join(", "))
    }
}

impl fmt::Display for UniversalPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_names {
            Some(owners) if !owners.is_empty() => {
                write!(f, "Playlist {} by {}", self.name, owners.join(", "))
            }
            _ => write!(f, "Playlist {}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_artists() {
        let t = UniversalTrack::new("Song", vec!["A".into(), "B".into()], "https://x/1");
        assert_eq!(t.to_string(), "Song by A, B");
    }

    #[test]
    fn playlist_display_without_owners() {
        let p = UniversalPlaylist {
            name: "Mix".into(),
            description: None,
            owner_names: None,
            url: "https://x/p".into(),
            cover_url: None,
            tracks: vec![],
        };
        assert_eq!(p.to_string(), "Playlist Mix");
    }
}
