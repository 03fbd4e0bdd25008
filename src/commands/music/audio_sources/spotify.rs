//! Spotify Web API client used to turn track links and playlists into YouTube
//! searches. Handles authentication (client credentials flow), URL parsing,
//! and API requests.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use regex::Regex;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::commands::music::utils::music_manager::{Provider, ResolutionError};

/// Result type specific to Spotify API operations.
pub type SpotifyResult<T> = Result<T, ResolutionError>;

const ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const API_URL: &str = "https://api.spotify.com";

/// Matches track links, including localized `/intl-xx/` paths, and `spotify:track:` URIs.
static SPOTIFY_TRACK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:https?://)?(?:open|play)\.spotify\.com/(?:intl-[a-zA-Z-]+/)?track/|spotify:track:)([a-zA-Z0-9]+)(?:[?#/].*)?$",
    )
    .unwrap()
});

/// Application credentials for the client credentials flow.
#[derive(Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Data structure for Spotify track information
#[derive(Clone, Debug, PartialEq)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration: Option<Duration>,
    pub album_image: Option<String>,
}

impl SpotifyTrack {
    /// The public page of this track.
    pub fn page_url(&self) -> String {
        format!("https://open.spotify.com/track/{}", self.id)
    }

    /// Free-text YouTube query for this track: `"{artists} {title}"`.
    pub fn youtube_search_query(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.artists.join(", "), self.name)
        }
    }
}

/// A playlist as listed on a user's profile
#[derive(Clone, Debug, PartialEq)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub track_count: u64,
    pub public: bool,
    pub owner: String,
    pub url: String,
}

/// A playlist's name and its tracks in playlist order.
#[derive(Clone, Debug, PartialEq)]
pub struct SpotifyPlaylistTracks {
    pub name: String,
    pub tracks: Vec<SpotifyTrack>,
}

/// Authentication tokens for Spotify API
#[derive(Debug, Serialize, Deserialize)]
struct SpotifyToken {
    access_token: String,
    token_type: String,
    expires_in: u64,
    #[serde(skip, default = "Instant::now")]
    created_at: Instant,
}

impl SpotifyToken {
    fn is_expired(&self) -> bool {
        let expiry = Duration::from_secs(self.expires_in);
        let elapsed = self.created_at.elapsed();
        // Consider it expired 30 seconds before actual expiry
        elapsed > expiry.saturating_sub(Duration::from_secs(30))
    }
}

/// Spotify API client
pub struct SpotifyApi {
    http: reqwest::Client,
    credentials: SpotifyCredentials,
    accounts_url: String,
    api_url: String,
    token: Mutex<Option<SpotifyToken>>,
}

impl SpotifyApi {
    pub fn new(http: reqwest::Client, credentials: SpotifyCredentials) -> Self {
        Self {
            http,
            credentials,
            accounts_url: ACCOUNTS_URL.to_string(),
            api_url: API_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point the client at other hosts, e.g. a local mock server.
    pub fn with_base_urls(mut self, accounts_url: &str, api_url: &str) -> Self {
        self.accounts_url = accounts_url.trim_end_matches('/').to_string();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Check if the given query points at Spotify at all (track or not)
    pub fn is_spotify_url(query: &str) -> bool {
        if query.starts_with("spotify:") {
            return true;
        }
        Url::parse(query).is_ok_and(|url| {
            url.host_str().is_some_and(|host| {
                host == "open.spotify.com" || host == "play.spotify.com" || host == "spotify.com"
            })
        })
    }

    /// Extract track ID from a Spotify track URL or URI
    pub fn extract_track_id(url: &str) -> Option<String> {
        SPOTIFY_TRACK_REGEX
            .captures(url.trim())
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Returns a cached access token, requesting a new one when it is missing
    /// or about to expire.
    async fn get_access_token(&self) -> SpotifyResult<String> {
        let mut token_lock = self.token.lock().await;

        if let Some(token) = &*token_lock {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting a new Spotify access token");
        let auth = BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));

        let params = [("grant_type", "client_credentials")];
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .header(header::AUTHORIZATION, format!("Basic {}", auth))
            .form(&params)
            .send()
            .await
            .map_err(|e| unavailable(format!("Failed to request Spotify token: {}", e)))?;

        if !response.status().is_success() {
            return Err(unavailable(error_text(response).await));
        }

        let token_response = response
            .json::<SpotifyToken>()
            .await
            .map_err(|e| unavailable(format!("Failed to parse Spotify token: {}", e)))?;

        let access_token = token_response.access_token.clone();
        *token_lock = Some(token_response);

        Ok(access_token)
    }

    /// Fetches detailed information for a single Spotify track by its ID.
    pub async fn get_track(&self, track_id: &str) -> SpotifyResult<SpotifyTrack> {
        let token = self.get_access_token().await?;
        info!("Fetching Spotify track {}", track_id);

        let track_data = self
            .get_json(&format!("{}/v1/tracks/{}", self.api_url, track_id), &token, track_id)
            .await?;

        parse_track(track_id, &track_data)
    }

    /// First page (up to 50) of a user's public playlists
    pub async fn get_user_playlists(&self, user_id: &str) -> SpotifyResult<Vec<SpotifyPlaylist>> {
        let token = self.get_access_token().await?;
        info!("Fetching Spotify playlists of user {}", user_id);

        let user: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        let body = self
            .get_json(
                &format!("{}/v1/users/{}/playlists?limit=50", self.api_url, user),
                &token,
                user_id,
            )
            .await?;

        Ok(body["items"]
            .as_array()
            .map(|items| items.iter().filter_map(parse_playlist).collect())
            .unwrap_or_default())
    }

    /// A playlist's tracks, following the `next` links until the playlist
    /// ends or `max_tracks` were collected. Local files, episodes and
    /// removed entries are left out.
    pub async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        max_tracks: usize,
    ) -> SpotifyResult<SpotifyPlaylistTracks> {
        let token = self.get_access_token().await?;
        info!("Fetching Spotify playlist {}", playlist_id);

        let playlist = self
            .get_json(
                &format!("{}/v1/playlists/{}", self.api_url, playlist_id),
                &token,
                playlist_id,
            )
            .await?;
        let name = playlist["name"]
            .as_str()
            .unwrap_or("Unknown Playlist")
            .to_string();

        let mut tracks = Vec::new();
        let mut page = playlist["tracks"].clone();
        loop {
            if let Some(items) = page["items"].as_array() {
                tracks.extend(items.iter().filter_map(playlist_item_track));
            }
            if tracks.len() >= max_tracks {
                tracks.truncate(max_tracks);
                break;
            }
            // Check if there's a URL for the next page.
            match page["next"].as_str() {
                Some(next_url) => {
                    debug!("Fetching next page of playlist {}", playlist_id);
                    page = self.get_json(next_url, &token, playlist_id).await?;
                }
                None => break,
            }
        }

        Ok(SpotifyPlaylistTracks { name, tracks })
    }

    /// GET a Web API resource. 400 and 404 mean `subject` does not exist.
    async fn get_json(
        &self,
        url: &str,
        token: &str,
        subject: &str,
    ) -> SpotifyResult<serde_json::Value> {
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| unavailable(format!("Failed to request Spotify data: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(ResolutionError::not_found(subject));
            }
            _ => return Err(unavailable(error_text(response).await)),
        }

        response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse Spotify data: {}", e)))
    }
}

fn unavailable(reason: String) -> ResolutionError {
    ResolutionError::unavailable(Provider::Spotify, reason)
}

async fn error_text(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Cannot read response".to_string());
    format!("Spotify API error: {} - {}", status, text)
}

fn parse_track(track_id: &str, track_data: &serde_json::Value) -> SpotifyResult<SpotifyTrack> {
    let name = track_data["name"]
        .as_str()
        .ok_or_else(|| unavailable("Missing track name".to_string()))?
        .to_string();

    let artists = track_data["artists"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["name"].as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let album_image = track_data["album"]["images"]
        .as_array()
        .and_then(|images| images.first())
        .and_then(|image| image["url"].as_str())
        .map(|s| s.to_string());

    Ok(SpotifyTrack {
        id: track_data["id"].as_str().unwrap_or(track_id).to_string(),
        name,
        artists,
        duration: track_data["duration_ms"].as_u64().map(Duration::from_millis),
        album_image,
    })
}

fn parse_playlist(item: &serde_json::Value) -> Option<SpotifyPlaylist> {
    let id = item["id"].as_str()?.to_string();
    Some(SpotifyPlaylist {
        name: item["name"].as_str().unwrap_or("Untitled").to_string(),
        track_count: item["tracks"]["total"].as_u64().unwrap_or(0),
        public: item["public"].as_bool().unwrap_or(false),
        owner: item["owner"]["display_name"]
            .as_str()
            .unwrap_or("Unknown")
            .to_string(),
        url: item["external_urls"]["spotify"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", id)),
        id,
    })
}

/// The track of one playlist entry, if it is a playable Spotify track.
fn playlist_item_track(item: &serde_json::Value) -> Option<SpotifyTrack> {
    let track = &item["track"];
    if track["type"].as_str() != Some("track") || item["is_local"].as_bool() == Some(true) {
        return None;
    }
    let id = track["id"].as_str()?;
    parse_track(id, track).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use test_case::test_case;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SpotifyApi {
        SpotifyApi::new(
            reqwest::Client::new(),
            SpotifyCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        )
        .with_base_urls(&server.uri(), &server.uri())
    }

    fn token_response(expires_in: u64) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": expires_in,
        }))
    }

    fn track_body() -> serde_json::Value {
        json!({
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "duration_ms": 213573,
            "artists": [{ "name": "Rick Astley" }],
            "album": { "images": [{ "url": "https://i.scdn.co/image/cover" }] }
        })
    }

    #[test_case("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC" => Some("4uLU6hMCjMI75M1A2tKUQC".to_string()); "track link")]
    #[test_case("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc" => Some("4uLU6hMCjMI75M1A2tKUQC".to_string()); "with share query")]
    #[test_case("https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC" => Some("4uLU6hMCjMI75M1A2tKUQC".to_string()); "localized link")]
    #[test_case("spotify:track:4uLU6hMCjMI75M1A2tKUQC" => Some("4uLU6hMCjMI75M1A2tKUQC".to_string()); "uri")]
    #[test_case("https://open.spotify.com/album/1ATL5GLyefJaxhQzSPVrLX" => None; "album")]
    #[test_case("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M" => None; "playlist")]
    #[test_case("https://www.youtube.com/watch?v=dQw4w9WgXcQ" => None; "not spotify")]
    fn test_extract_track_id(url: &str) -> Option<String> {
        SpotifyApi::extract_track_id(url)
    }

    #[test_case("https://open.spotify.com/album/1ATL5GLyefJaxhQzSPVrLX" => true)]
    #[test_case("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M" => true)]
    #[test_case("https://youtu.be/dQw4w9WgXcQ" => false)]
    #[test_case("spotify rick astley" => false)]
    fn test_is_spotify_url(query: &str) -> bool {
        SpotifyApi::is_spotify_url(query)
    }

    #[test]
    fn test_youtube_search_query_joins_artists() {
        let track = SpotifyTrack {
            id: "x".to_string(),
            name: "Under Pressure".to_string(),
            artists: vec!["Queen".to_string(), "David Bowie".to_string()],
            duration: None,
            album_image: None,
        };

        assert_eq!(track.youtube_search_query(), "Queen, David Bowie Under Pressure");
    }

    /// Fetches a track and reuses the cached token for the second request.
    #[tokio::test]
    async fn test_get_track_caches_token() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(token_response(3600))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/4uLU6hMCjMI75M1A2tKUQC"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_body()))
            .expect(2)
            .mount(&server)
            .await;
        let api = client(&server);

        // Act
        let first = api.get_track("4uLU6hMCjMI75M1A2tKUQC").await.unwrap();
        let second = api.get_track("4uLU6hMCjMI75M1A2tKUQC").await.unwrap();

        // Assert
        assert_eq!(first, second);
        assert_eq!(first.name, "Never Gonna Give You Up");
        assert_eq!(first.artists, vec!["Rick Astley"]);
        assert_eq!(first.duration, Some(Duration::from_millis(213573)));
        assert_eq!(
            first.album_image.as_deref(),
            Some("https://i.scdn.co/image/cover")
        );
    }

    /// Tokens inside the 30 second safety margin are refreshed.
    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_response(10))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_body()))
            .mount(&server)
            .await;
        let api = client(&server);

        api.get_track("abc").await.unwrap();
        api.get_track("abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_track_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_response(3600))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server).get_track("missing").await;

        assert_eq!(result, Err(ResolutionError::not_found("missing")));
    }

    #[tokio::test]
    async fn test_server_error_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_response(3600))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tracks/abc"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;

        let result = client(&server).get_track("abc").await;

        assert_matches!(
            result,
            Err(ResolutionError::ProviderUnavailable { provider: Provider::Spotify, reason })
                if reason.contains("503") && reason.contains("try later")
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let result = client(&server).get_track("abc").await;

        assert_matches!(result, Err(ResolutionError::ProviderUnavailable { .. }));
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_response(3600))
            .mount(server)
            .await;
    }

    fn playlist_entry(id: &str, name: &str) -> serde_json::Value {
        json!({
            "track": {
                "type": "track",
                "id": id,
                "name": name,
                "duration_ms": 180000,
                "artists": [{ "name": "Artist" }],
                "album": { "images": [] }
            }
        })
    }

    #[tokio::test]
    async fn test_user_playlists_are_listed() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/users/tneu.radio/playlists"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": "pl1",
                        "name": "Study Beats",
                        "public": true,
                        "tracks": { "total": 42 },
                        "owner": { "display_name": "TNEU" },
                        "external_urls": { "spotify": "https://open.spotify.com/playlist/pl1" }
                    },
                    null,
                    { "id": "pl2", "name": "Private Mix", "public": false, "tracks": { "total": 3 }, "owner": {} }
                ]
            })))
            .mount(&server)
            .await;

        let playlists = client(&server).get_user_playlists("tneu.radio").await.unwrap();

        assert_eq!(
            playlists,
            vec![
                SpotifyPlaylist {
                    id: "pl1".to_string(),
                    name: "Study Beats".to_string(),
                    track_count: 42,
                    public: true,
                    owner: "TNEU".to_string(),
                    url: "https://open.spotify.com/playlist/pl1".to_string(),
                },
                SpotifyPlaylist {
                    id: "pl2".to_string(),
                    name: "Private Mix".to_string(),
                    track_count: 3,
                    public: false,
                    owner: "Unknown".to_string(),
                    url: "https://open.spotify.com/playlist/pl2".to_string(),
                },
            ]
        );
    }

    /// Follows `next` across pages and drops entries that are not tracks.
    #[tokio::test]
    async fn test_playlist_tracks_follow_next_page() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/pl1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Study Beats",
                "tracks": {
                    "items": [
                        playlist_entry("t1", "First"),
                        { "track": null },
                        { "track": { "type": "episode", "id": "e1", "name": "Podcast" } },
                        { "is_local": true, "track": { "type": "track", "id": null, "name": "Local" } }
                    ],
                    "next": format!("{}/v1/playlists/pl1/tracks?offset=100", server.uri())
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/pl1/tracks"))
            .and(query_param("offset", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [playlist_entry("t2", "Second")],
                "next": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let playlist = client(&server)
            .get_playlist_tracks("pl1", 100)
            .await
            .unwrap();

        // Assert
        assert_eq!(playlist.name, "Study Beats");
        let names: Vec<&str> = playlist.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_playlist_tracks_stop_at_limit() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/pl1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Long",
                "tracks": {
                    "items": [playlist_entry("t1", "One"), playlist_entry("t2", "Two"), playlist_entry("t3", "Three")],
                    "next": format!("{}/v1/playlists/pl1/tracks?offset=3", server.uri())
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/pl1/tracks"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let playlist = client(&server).get_playlist_tracks("pl1", 2).await.unwrap();

        assert_eq!(playlist.tracks.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_playlist_is_not_found() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server).get_playlist_tracks("gone", 100).await;

        assert_eq!(result, Err(ResolutionError::not_found("gone")));
    }
}
