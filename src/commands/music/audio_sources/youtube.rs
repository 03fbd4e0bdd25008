//! YouTube lookups through the `yt-dlp` command-line tool, plus YouTube URL
//! classification.

use serde::Deserialize;
use serenity::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::commands::music::utils::music_manager::{Provider, ResolutionError};

pub const DEFAULT_YTDLP: &str = "yt-dlp";

/// yt-dlp stderr fragments meaning the video itself does not exist.
const MISSING_VIDEO_MARKERS: [&str; 4] = [
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "Incomplete YouTube ID",
];

/// The parts of a yt-dlp entry a track needs.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    /// Canonical watch URL.
    pub url: String,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
}

/// Raw `yt-dlp -j` output
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    title: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
}

impl TryFrom<YtDlpEntry> for VideoInfo {
    type Error = ResolutionError;

    fn try_from(entry: YtDlpEntry) -> Result<Self, Self::Error> {
        let url = entry
            .webpage_url
            .or(entry.original_url)
            .ok_or_else(|| unavailable("yt-dlp returned an entry without a URL"))?;

        Ok(Self {
            title: entry.title.unwrap_or_else(|| "Unknown Title".to_string()),
            url,
            duration: entry
                .duration
                .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
                .map(Duration::from_secs_f64),
            thumbnail: entry.thumbnail,
            uploader: entry.uploader.or(entry.channel),
        })
    }
}

/// Video lookups the resolver depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Top result for a free-text search, if there is one.
    async fn search(&self, text: &str) -> Result<Option<VideoInfo>, ResolutionError>;

    /// Metadata of a single video link.
    async fn lookup(&self, url: &str) -> Result<VideoInfo, ResolutionError>;
}

/// `VideoSearch` backed by a local `yt-dlp` executable.
pub struct YoutubeApi {
    ytdlp_path: String,
}

impl YoutubeApi {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Checks if the input string is a YouTube video link
    pub fn is_youtube_url(query: &str) -> bool {
        let Ok(url) = Url::parse(query) else {
            return false;
        };
        match url.host_str() {
            Some("youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com") => {
                url.path().starts_with("/watch") || url.path().starts_with("/shorts/")
            }
            Some("youtu.be") => url.path().len() > 1,
            _ => false,
        }
    }

    /// The looser check `/testyt` applies: any http(s) link on a YouTube host.
    pub fn is_direct_link(input: &str) -> bool {
        let Ok(url) = Url::parse(input) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        match url.host_str() {
            Some(host) => {
                host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
            }
            None => false,
        }
    }

    async fn run(&self, target: &str) -> Result<Output, ResolutionError> {
        debug!("Running {} for {}", self.ytdlp_path, target);
        Command::new(&self.ytdlp_path)
            .args(ytdlp_args(target))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| unavailable(format!("Failed to run {}: {}", self.ytdlp_path, e)))
    }
}

#[async_trait]
impl VideoSearch for YoutubeApi {
    async fn search(&self, text: &str) -> Result<Option<VideoInfo>, ResolutionError> {
        info!("Searching YouTube for: {}", text);
        let output = self.run(&format!("ytsearch1:{}", text)).await?;
        if !output.status.success() {
            return Err(unavailable(stderr_summary(&output)));
        }
        parse_entry(&output.stdout)
    }

    async fn lookup(&self, url: &str) -> Result<VideoInfo, ResolutionError> {
        info!("Fetching YouTube metadata for URL: {}", url);
        let output = self.run(url).await?;
        if !output.status.success() {
            let stderr = stderr_summary(&output);
            if MISSING_VIDEO_MARKERS
                .iter()
                .any(|marker| stderr.contains(marker))
            {
                return Err(ResolutionError::not_found(url));
            }
            return Err(unavailable(stderr));
        }
        parse_entry(&output.stdout)?.ok_or_else(|| ResolutionError::not_found(url))
    }
}

/// Arguments for a single-entry JSON dump. The `--` keeps a target that
/// starts with a dash from being read as an option.
fn ytdlp_args(target: &str) -> [&str; 5] {
    [
        "-j",            // Output as JSON
        "--no-playlist", // Don't process playlists
        "--no-warnings",
        "--",
        target,
    ]
}

/// Parse the first JSON line of `yt-dlp -j` output. Empty output means the
/// search had no results.
pub(crate) fn parse_entry(stdout: &[u8]) -> Result<Option<VideoInfo>, ResolutionError> {
    let text = String::from_utf8_lossy(stdout);
    let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Ok(None);
    };
    let entry: YtDlpEntry = serde_json::from_str(line)
        .map_err(|e| unavailable(format!("Failed to parse video metadata: {}", e)))?;
    VideoInfo::try_from(entry).map(Some)
}

fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let summary = stderr.trim();
    if summary.is_empty() {
        format!("yt-dlp exited with {}", output.status)
    } else {
        summary.to_string()
    }
}

fn unavailable(reason: impl std::fmt::Display) -> ResolutionError {
    ResolutionError::unavailable(Provider::Youtube, reason)
}
