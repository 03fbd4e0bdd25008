use std::collections::VecDeque;
use std::time::Duration;

use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;

/// Where a guild's player is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    /// Joining the requester's voice channel for the first track.
    Connecting,
    Playing,
    Paused,
}

/// Identifies one start of a track. Songbird events carry the token of the
/// track they belong to so late events for a replaced track can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackToken(pub u64);

/// The track currently streaming in a guild
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: TrackDescriptor,
    pub token: TrackToken,
}

/// Upcoming tracks and the "now playing" slot of one guild.
///
/// The current track is never part of `tracks`: it leaves the queue at the
/// moment it starts.
#[derive(Debug, Default)]
pub struct GuildQueue {
    tracks: VecDeque<TrackDescriptor>,
    current: Option<NowPlaying>,
    status: PlaybackStatus,
}

impl GuildQueue {
    /// Create an empty, idle queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track and return its 1-based position among the upcoming tracks
    pub fn enqueue(&mut self, track: TrackDescriptor) -> usize {
        self.tracks.push_back(track);
        self.tracks.len()
    }

    /// Remove and return the head of the queue
    pub fn pop_next(&mut self) -> Option<TrackDescriptor> {
        self.tracks.pop_front()
    }

    /// Drop every upcoming track and the current one. Returns how many
    /// upcoming tracks were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.tracks.len();
        self.tracks.clear();
        self.current = None;
        self.status = PlaybackStatus::Idle;
        removed
    }

    /// Snapshot of the upcoming tracks in play order
    pub fn peek_all(&self) -> Vec<TrackDescriptor> {
        self.tracks.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Sum of the known durations of the upcoming tracks
    pub fn total_duration(&self) -> Duration {
        self.tracks.iter().filter_map(|track| track.duration).sum()
    }

    pub fn current(&self) -> Option<&NowPlaying> {
        self.current.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Mark `track` as the one streaming under `token`
    pub(crate) fn start(&mut self, track: TrackDescriptor, token: TrackToken) {
        self.current = Some(NowPlaying { track, token });
        self.status = PlaybackStatus::Playing;
    }

    /// Take the current track out of the "now playing" slot
    pub(crate) fn finish_current(&mut self) -> Option<NowPlaying> {
        let finished = self.current.take();
        self.status = PlaybackStatus::Idle;
        finished
    }

    pub(crate) fn set_connecting(&mut self) {
        self.status = PlaybackStatus::Connecting;
    }

    /// Return to idle after a failed first start. The upcoming tracks are kept.
    pub(crate) fn set_idle(&mut self) {
        self.current = None;
        self.status = PlaybackStatus::Idle;
    }

    /// Switch between `Playing` and `Paused`. Without a current track the
    /// status stays as it is.
    pub(crate) fn set_paused(&mut self, paused: bool) {
        if self.current.is_none() {
            return;
        }
        self.status = if paused {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Playing
        };
    }
}
