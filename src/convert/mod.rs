pub mod playlist;
pub mod report;
pub mod track;

pub use playlist::{convert_playlist, PlaylistEvent, PlaylistOptions, PlaylistOutcome, PlaylistRequest};
pub use track::{convert_message_urls, convert_track, convert_urls, TrackOutcome};
