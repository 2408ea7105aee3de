use crate::models::UniversalPlaylist;

/// Chunk size ceiling for chat messages, in characters.
pub const REPORT_CHUNK_LIMIT: usize = 2000;
/// Ceiling for a playlist summary body, in characters.
pub const SUMMARY_LIMIT: usize = 4096;

pub const NOT_FOUND_SENTINEL: &str = "Could not be found";

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Wrap a link in `<...>` so chat clients don't expand a preview for it.
pub fn suppress_embed(url: &str) -> String {
    format!("<{}>", url)
}

pub fn report_header(source_url: &str) -> String {
    format!(
        "# Finished converting tracks\nConverted from: {}\n\n",
        suppress_embed(source_url)
    )
}

/// One numbered line per track, `None` entries rendered as the not-found sentinel.
pub fn report_lines(results: &[Option<String>]) -> Vec<String> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| match r {
            Some(url) => format!("{}. {}\n", i + 1, suppress_embed(url)),
            None => format!("{}. {}\n", i + 1, NOT_FOUND_SENTINEL),
        })
        .collect()
}

/// Newline-separated list of converted urls and sentinels, in track order.
pub fn attachment_text(results: &[Option<String>]) -> String {
    results
        .iter()
        .map(|r| r.as_deref().unwrap_or(NOT_FOUND_SENTINEL))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pack lines into chunks of at most `limit` characters.
///
/// A chunk is flushed when appending the next line would go over `limit`.
/// Lines are never split, so a single line longer than `limit` gets a chunk
/// of its own.
pub fn paginate<I>(header: &str, lines: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut chunks = Vec::new();
    let mut buf = header.to_string();
    for line in lines {
        if !buf.is_empty() && char_len(&buf) + char_len(&line) > limit {
            chunks.push(std::mem::take(&mut buf));
        }
        buf.push_str(&line);
    }
    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

/// Escape characters chat markdown would interpret.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|' | '>' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSummary {
    pub title: String,
    pub url: String,
    pub body: String,
    pub footer: Option<String>,
    pub cover_url: Option<String>,
}

/// Render a playlist overview: description then numbered tracks, cut off
/// after `max_tracks` lines or at `SUMMARY_LIMIT` characters with an
/// "And N more..." trailer.
pub fn playlist_summary(playlist: &UniversalPlaylist, max_tracks: usize) -> PlaylistSummary {
    let mut body = playlist
        .description
        .as_deref()
        .map(|d| escape_markdown(d.trim()))
        .unwrap_or_default();
    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str("**Tracks**");

    let total = playlist.tracks.len();
    for (i, track) in playlist.tracks.iter().enumerate() {
        // Counts the current track, which is dropped when the loop stops here.
        let trailer = format!("\n\nAnd {} more...", total - i);
        if i >= max_tracks {
            body.push_str(&trailer);
            break;
        }
        let line = format!(
            "{}. [{}]({}) - {}",
            i + 1,
            escape_markdown(&track.title),
            track.url,
            track
                .artist_names
                .iter()
                .map(|a| escape_markdown(a))
                .collect::<Vec<_>>()
                .join(", ")
        );
        // The last track needs no room reserved for a trailer after it.
        let reserved = if i + 1 == total { 0 } else { char_len(&trailer) };
        if char_len(&body) + 1 + char_len(&line) + reserved >= SUMMARY_LIMIT {
            body.push_str(&trailer);
            break;
        }
        body.push('\n');
        body.push_str(&line);
    }

    PlaylistSummary {
        title: playlist.name.clone(),
        url: playlist.url.clone(),
        body,
        footer: playlist
            .owner_names
            .as_ref()
            .filter(|o| !o.is_empty())
            .map(|o| format!("By {}", o.join(", "))),
        cover_url: playlist.cover_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UniversalTrack;

    fn line_of(len: usize) -> String {
        let mut s = "x".repeat(len - 1);
        s.push('\n');
        s
    }

    #[test]
    fn flushes_before_line_that_crosses_limit() {
        // 20 lines of 100 chars fill the first chunk exactly; line 21 starts the next
        let lines: Vec<String> = (0..25).map(|_| line_of(100)).collect();
        let chunks = paginate("", lines, REPORT_CHUNK_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lines().count(), 20);
        assert_eq!(chunks[1].lines().count(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= REPORT_CHUNK_LIMIT));
    }

    #[test]
    fn header_counts_towards_first_chunk() {
        let lines: Vec<String> = (0..3).map(|_| line_of(10)).collect();
        let chunks = paginate(&"h".repeat(15), lines, 30);
        assert_eq!(chunks, vec![format!("{}{}", "h".repeat(15), line_of(10)), line_of(10).repeat(2)]);
    }

    #[test]
    fn oversized_line_gets_own_chunk() {
        let chunks = paginate("", vec![line_of(5), line_of(50), line_of(5)], 20);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let wide = "é".repeat(9) + "\n"; // 10 chars, 19 bytes
        let chunks = paginate("", vec![wide.clone(), wide], 20);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn lines_and_attachment_keep_one_slot_per_track() {
        let results = vec![Some("https://t/1".to_string()), None];
        assert_eq!(report_lines(&results), vec!["1. <https://t/1>\n", "2. Could not be found\n"]);
        assert_eq!(attachment_text(&results), "https://t/1\nCould not be found");
    }

    #[test]
    fn summary_cuts_off_at_max_tracks() {
        let tracks: Vec<UniversalTrack> = (1..=5)
            .map(|i| UniversalTrack::new(format!("Song_{}", i), vec!["A".into()], format!("https://t/{}", i)))
            .collect();
        let playlist = UniversalPlaylist {
            name: "Mix".into(),
            description: Some("  *best* hits ".into()),
            owner_names: Some(vec!["me".into()]),
            url: "https://t/p".into(),
            cover_url: None,
            tracks,
        };
        let summary = playlist_summary(&playlist, 2);
        assert!(summary.body.starts_with("\\*best\\* hits\n\n**Tracks**"));
        assert!(summary.body.contains("1. [Song\\_1](https://t/1) - A"));
        assert!(summary.body.contains("2. [Song\\_2]"));
        assert!(!summary.body.contains("3. ["));
        assert!(summary.body.ends_with("And 3 more..."));
        assert_eq!(summary.footer.as_deref(), Some("By me"));
    }

    fn playlist_of(tracks: Vec<UniversalTrack>) -> UniversalPlaylist {
        UniversalPlaylist {
            name: "Mix".into(),
            description: None,
            owner_names: None,
            url: "https://t/p".into(),
            cover_url: None,
            tracks,
        }
    }

    #[test]
    fn cutting_only_the_last_track_still_counts_it() {
        let tracks = (1..=3)
            .map(|i| UniversalTrack::new(format!("S{}", i), vec!["A".into()], format!("https://t/{}", i)))
            .collect();
        let summary = playlist_summary(&playlist_of(tracks), 2);
        assert_eq!(
            summary.body,
            "**Tracks**\n1. [S1](https://t/1) - A\n2. [S2](https://t/2) - A\n\nAnd 1 more..."
        );
        assert_eq!(summary.footer, None);
    }

    #[test]
    fn summary_stays_under_character_limit() {
        let tracks = (1..=200)
            .map(|i| UniversalTrack::new("x".repeat(60), vec!["A".into()], format!("https://t/{}", i)))
            .collect();
        let summary = playlist_summary(&playlist_of(tracks), 500);
        assert!(summary.body.starts_with("**Tracks**\n1. "));
        assert!(summary.body.chars().count() < SUMMARY_LIMIT);
        assert!(summary.body.ends_with(" more..."));
    }

    #[test]
    fn whole_playlist_has_no_trailer() {
        let tracks = vec![UniversalTrack::new("S1", vec!["A".into()], "https://t/1")];
        let summary = playlist_summary(&playlist_of(tracks), 1);
        assert_eq!(summary.body, "**Tracks**\n1. [S1](https://t/1) - A");
    }
}
