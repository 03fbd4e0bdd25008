//! This module turns what a user typed into a playable track.
//! It classifies the query (Spotify link, YouTube link, other link, free text)
//! and dispatches it to the matching audio source.

/// Submodule with the Spotify Web API client.
pub mod spotify;
/// Submodule defining the `TrackDescriptor` struct used across audio sources.
pub mod track_metadata;
/// Submodule with the `yt-dlp` backed YouTube lookups.
pub mod youtube;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::commands::music::utils::music_manager::{Provider, ResolutionError};
use crate::config::Config;
use spotify::{SpotifyApi, SpotifyPlaylist};
use track_metadata::{SourceKind, TrackDescriptor};
use youtube::{VideoSearch, YoutubeApi};

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, ResolutionError>;

/// Most entries taken from one playlist
pub const PLAYLIST_TRACK_LIMIT: usize = 100;
/// yt-dlp searches running at once while resolving a playlist
const PLAYLIST_SEARCH_CONCURRENCY: usize = 4;

/// What kind of input a query is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Spotify,
    Youtube,
    /// A link to a site no audio source handles.
    UnsupportedUrl,
    Search,
}

impl QueryKind {
    pub fn classify(query: &str) -> Self {
        if SpotifyApi::is_spotify_url(query) {
            QueryKind::Spotify
        } else if YoutubeApi::is_youtube_url(query) {
            QueryKind::Youtube
        } else if AudioSource::is_url(query) {
            QueryKind::UnsupportedUrl
        } else {
            QueryKind::Search
        }
    }
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as a web URL.
    /// Does not validate if the URL is actually reachable or supported by any specific API.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}

/// The YouTube matches found for one Spotify playlist
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlaylist {
    pub name: String,
    /// Matches in playlist order.
    pub tracks: Vec<TrackDescriptor>,
    /// Entries no YouTube video was found for.
    pub missed: usize,
}

/// Resolves queries against YouTube and, when configured, Spotify.
pub struct TrackResolver {
    youtube: Arc<dyn VideoSearch>,
    spotify: Option<SpotifyApi>,
    /// Account `/tneu` lists playlists of.
    spotify_user: Option<String>,
}

impl TrackResolver {
    pub fn new(youtube: Arc<dyn VideoSearch>, spotify: Option<SpotifyApi>) -> Self {
        Self {
            youtube,
            spotify,
            spotify_user: None,
        }
    }

    pub fn with_spotify_user(mut self, user_id: Option<String>) -> Self {
        self.spotify_user = user_id;
        self
    }

    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let spotify = config
            .spotify
            .clone()
            .map(|credentials| SpotifyApi::new(http_client, credentials));
        Self::new(Arc::new(YoutubeApi::new(&config.ytdlp_path)), spotify)
            .with_spotify_user(config.spotify_user_id.clone())
    }

    fn spotify(&self) -> AudioSourceResult<&SpotifyApi> {
        self.spotify.as_ref().ok_or_else(|| {
            ResolutionError::unavailable(Provider::Spotify, "Spotify credentials are not configured")
        })
    }

    /// Turn a query into a track. Makes no retries.
    pub async fn resolve(
        &self,
        query: &str,
        requested_by: &str,
    ) -> AudioSourceResult<TrackDescriptor> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::not_found(query));
        }

        match QueryKind::classify(query) {
            QueryKind::Spotify => self.resolve_spotify(query, requested_by).await,
            QueryKind::Youtube => {
                let video = self.youtube.lookup(query).await?;
                let mut track = TrackDescriptor::from_video(video, SourceKind::Youtube, requested_by);
                // Keep what the user pasted so timestamps and list params survive.
                track.stream_reference = query.to_string();
                track.origin_url = query.to_string();
                Ok(track)
            }
            QueryKind::UnsupportedUrl => {
                info!("No audio source handles {}", query);
                Err(ResolutionError::not_found(query))
            }
            QueryKind::Search => {
                let video = self
                    .youtube
                    .search(query)
                    .await?
                    .ok_or_else(|| ResolutionError::not_found(query))?;
                Ok(TrackDescriptor::from_video(
                    video,
                    SourceKind::Search,
                    requested_by,
                ))
            }
        }
    }

    async fn resolve_spotify(
        &self,
        url: &str,
        requested_by: &str,
    ) -> AudioSourceResult<TrackDescriptor> {
        let spotify = self.spotify()?;
        let track_id =
            SpotifyApi::extract_track_id(url).ok_or_else(|| ResolutionError::not_found(url))?;

        let track = spotify.get_track(&track_id).await?;
        let search_query = track.youtube_search_query();
        info!("Searching YouTube for Spotify track: {}", search_query);

        let video = self
            .youtube
            .search(&search_query)
            .await?
            .ok_or_else(|| ResolutionError::not_found(&search_query))?;
        Ok(TrackDescriptor::from_spotify(track, video, requested_by))
    }

    /// Public playlists of the configured Spotify account
    pub async fn user_playlists(&self) -> AudioSourceResult<Vec<SpotifyPlaylist>> {
        let spotify = self.spotify()?;
        let user = self.spotify_user.as_deref().ok_or_else(|| {
            ResolutionError::unavailable(Provider::Spotify, "SPOTIFY_USER_ID is not set")
        })?;
        spotify.get_user_playlists(user).await
    }

    /// Search YouTube for every entry of a Spotify playlist. Entries without
    /// a match are counted and left out. Fails when nothing matched at all.
    pub async fn resolve_playlist(
        &self,
        playlist_id: &str,
        requested_by: &str,
    ) -> AudioSourceResult<ResolvedPlaylist> {
        let playlist = self
            .spotify()?
            .get_playlist_tracks(playlist_id, PLAYLIST_TRACK_LIMIT)
            .await?;
        let total = playlist.tracks.len();
        info!(
            "Searching YouTube for {} tracks of playlist '{}'",
            total, playlist.name
        );

        let tracks: Vec<TrackDescriptor> = stream::iter(playlist.tracks)
            .map(move |track| async move {
                let query = track.youtube_search_query();
                match self.youtube.search(&query).await {
                    Ok(Some(video)) => Some(TrackDescriptor::from_spotify(track, video, requested_by)),
                    Ok(None) => {
                        info!("No YouTube match for {}", query);
                        None
                    }
                    Err(e) => {
                        warn!("YouTube search for {} failed: {}", query, e);
                        None
                    }
                }
            })
            .buffered(PLAYLIST_SEARCH_CONCURRENCY)
            .filter_map(|found| async move { found })
            .collect()
            .await;

        if tracks.is_empty() {
            return Err(ResolutionError::not_found(&playlist.name));
        }
        Ok(ResolvedPlaylist {
            name: playlist.name,
            missed: total - tracks.len(),
            tracks,
        })
    }

    /// Build a track straight from a YouTube link, skipping classification.
    /// The title comes from yt-dlp when it answers, the URL stands in otherwise.
    /// Anything but an http(s) link on a YouTube host is refused.
    pub async fn direct_youtube(
        &self,
        url: &str,
        requested_by: &str,
    ) -> AudioSourceResult<TrackDescriptor> {
        let url = url.trim();
        if !YoutubeApi::is_direct_link(url) {
            return Err(ResolutionError::not_found(url));
        }
        match self.youtube.lookup(url).await {
            Ok(video) => {
                let mut track = TrackDescriptor::from_video(video, SourceKind::Youtube, requested_by);
                track.stream_reference = url.to_string();
                track.origin_url = url.to_string();
                Ok(track)
            }
            Err(e) => {
                info!("Using bare link for {}: {}", url, e);
                Ok(TrackDescriptor::from_youtube_link(url, requested_by))
            }
        }
    }
}
