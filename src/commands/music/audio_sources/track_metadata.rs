//! Defines the `TrackDescriptor` struct, the resolved and playable representation
//! of a requested song, shared by the resolver, the queues and the players.

use std::fmt;
use std::time::Duration;

use super::spotify::SpotifyTrack;
use super::youtube::VideoInfo;

/// Which kind of query produced a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A Spotify track link, streamed from its best YouTube match.
    Spotify,
    /// A direct YouTube link.
    Youtube,
    /// Free text searched on YouTube.
    Search,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Spotify => write!(f, "Spotify"),
            SourceKind::Youtube => write!(f, "YouTube"),
            SourceKind::Search => write!(f, "YouTube search"),
        }
    }
}

/// Everything needed to show and stream one requested song.
///
/// Descriptors are never mutated after resolution. Queuing the same song twice
/// stores two independent copies.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    /// The title of the track.
    pub title: String,
    /// Spotify artists or the YouTube uploader.
    pub artist: Option<String>,
    pub source_kind: SourceKind,
    /// YouTube watch URL handed to songbird's lazy `YoutubeDl` input. The
    /// actual media URL is only resolved once playback starts.
    pub stream_reference: String,
    /// The link shown to users: the Spotify track page or the watch URL.
    pub origin_url: String,
    /// The duration of the track, if available.
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// Display name of the user who requested the track.
    pub requested_by: String,
}

impl TrackDescriptor {
    /// Creates a descriptor from a yt-dlp entry (direct link or search hit).
    pub fn from_video(video: VideoInfo, source_kind: SourceKind, requested_by: &str) -> Self {
        Self {
            title: video.title,
            artist: video.uploader,
            source_kind,
            origin_url: video.url.clone(),
            stream_reference: video.url,
            duration: video.duration,
            thumbnail: video.thumbnail,
            requested_by: requested_by.to_string(),
        }
    }

    /// Creates a descriptor for a Spotify track streamed from `video`.
    /// Display data comes from Spotify, only the stream comes from YouTube.
    pub fn from_spotify(track: SpotifyTrack, video: VideoInfo, requested_by: &str) -> Self {
        let origin_url = track.page_url();
        Self {
            title: track.name,
            artist: (!track.artists.is_empty()).then(|| track.artists.join(", ")),
            source_kind: SourceKind::Spotify,
            stream_reference: video.url,
            origin_url,
            duration: track.duration.or(video.duration),
            thumbnail: track.album_image.or(video.thumbnail),
            requested_by: requested_by.to_string(),
        }
    }

    /// A bare YouTube link with no metadata: the URL doubles as the title.
    pub fn from_youtube_link(url: &str, requested_by: &str) -> Self {
        Self {
            title: url.to_string(),
            artist: None,
            source_kind: SourceKind::Youtube,
            stream_reference: url.to_string(),
            origin_url: url.to_string(),
            duration: None,
            thumbnail: None,
            requested_by: requested_by.to_string(),
        }
    }

    /// "Artist - Title" when the artist is known, the title otherwise.
    pub fn display_name(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }
}
