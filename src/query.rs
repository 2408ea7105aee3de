use crate::models::UniversalTrack;

/// Build the text query used to look a track up on another platform.
///
/// Artists come first, then the title. Case and punctuation are left alone.
pub fn track_to_query(track: &UniversalTrack) -> String {
    let artists = track.artist_names.join(", ");
    if artists.is_empty() {
        return track.title.clone();
    }
    format!("{} {}", artists, track.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artists_then_title() {
        let t = UniversalTrack::new("Song (Live)", vec!["A".into(), "B".into()], "https://x/1");
        assert_eq!(track_to_query(&t), "A, B Song (Live)");
    }

    #[test]
    fn no_artist_falls_back_to_title() {
        let t = UniversalTrack::new("Song", vec![], "https://x/1");
        assert_eq!(track_to_query(&t), "Song");
    }
}
