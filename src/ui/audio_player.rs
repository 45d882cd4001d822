use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Ready,
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("no audio source loaded")]
    NoSource,
}

/// Playback state of a single audio element
#[derive(Debug)]
pub struct AudioPlayer {
    source: Option<Url>,
    state: PlaybackState,
    position: Duration,
    duration: Option<Duration>,
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self {
            source: None,
            state: PlaybackState::Idle,
            position: Duration::ZERO,
            duration: None,
        }
    }
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    /// Load a new source; playback restarts from the beginning
    pub fn load(&mut self, source: Url, duration: Option<Duration>) {
        tracing::debug!(%source, "audio source loaded");
        self.source = Some(source);
        self.duration = duration;
        self.position = Duration::ZERO;
        self.state = PlaybackState::Ready;
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.source.is_none() {
            return Err(PlayerError::NoSource);
        }
        if self.state == PlaybackState::Ended {
            self.position = Duration::ZERO;
        }
        self.state = PlaybackState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn seek(&mut self, position: Duration) {
        self.position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
    }

    /// Advance the playhead while playing
    pub fn tick(&mut self, elapsed: Duration) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.position += elapsed;
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                self.state = PlaybackState::Ended;
            }
        }
    }
}
