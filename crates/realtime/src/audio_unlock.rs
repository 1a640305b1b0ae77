//! Best-effort unlocking of remote audio playback on mobile hosts.
//!
//! Mobile browsers refuse to play audio until a user gesture has
//! happened, and what satisfies them varies by device. [`MobileAudioUnlock`]
//! therefore runs every known remediation step in turn, logs each outcome
//! and never fails. Its result is an indicator for the UI, nothing more.
//!
//! Host access (Web Audio in a wasm build, a native audio stack
//! elsewhere) sits behind [`AudioPlatform`].

use async_trait::async_trait;
use chrono::Local;
use std::fmt;
use tracing::{debug, info, warn};

/// Number of hidden playback elements used for the silent clip.
pub const AUDIO_ELEMENT_POOL: usize = 3;

/// A short 8 kHz mono WAV of silence.
pub const SILENT_CLIP_DATA_URI: &str = "data:audio/wav;base64,UklGRjQAAABXQVZFZm10IBAAAAABAAEAQB8AAEAfAAABAAgAZGF0YRAAAACAgICAgICAgICAgICAgICA";

#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    #[error("audio context unavailable: {0}")]
    AudioContext(String),
    #[error("microphone capture refused: {0}")]
    Microphone(String),
    #[error("playback refused: {0}")]
    Playback(String),
}

/// Audio primitives of the host.
///
/// Every call must be made from within a user gesture handler for the
/// browser to honour it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioPlatform: Send {
    /// Creates the shared audio context if needed and resumes it.
    async fn resume_audio_context(&mut self) -> Result<(), UnlockError>;
    /// Acquires a microphone capture handle and releases it immediately.
    async fn probe_microphone(&mut self) -> Result<(), UnlockError>;
    /// Plays a zero-gain tone through the audio context.
    async fn play_silent_tone(&mut self) -> Result<(), UnlockError>;
    /// Plays `data_uri` at near-zero volume on pool element `element`.
    /// `Ok` means the element's `play` resolved.
    async fn play_silent_clip(&mut self, element: usize, data_uri: &str) -> Result<(), UnlockError>;
    /// Starts the remote-audio element directly.
    async fn play_remote(&mut self) -> Result<(), UnlockError>;
    /// Routes the remote stream through the audio context instead of the
    /// element.
    async fn route_remote_through_context(&mut self) -> Result<(), UnlockError>;
}

/// One rung of the unlock ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationStep {
    AudioContext,
    Microphone,
    SilentTone,
    SilentClip(usize),
}

impl fmt::Display for RemediationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationStep::AudioContext => write!(f, "audio context"),
            RemediationStep::Microphone => write!(f, "microphone probe"),
            RemediationStep::SilentTone => write!(f, "silent tone"),
            RemediationStep::SilentClip(idx) => write!(f, "silent clip on element {idx}"),
        }
    }
}

pub struct MobileAudioUnlock<P> {
    platform: P,
    audio_ready: bool,
    debug_log: Vec<String>,
}

impl<P: AudioPlatform> MobileAudioUnlock<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            audio_ready: false,
            debug_log: Vec::new(),
        }
    }

    fn log(&mut self, message: String) {
        debug!(%message, "Mobile audio unlock");
        self.debug_log
            .push(format!("{}: {message}", Local::now().to_rfc3339()));
    }

    fn record(&mut self, step: RemediationStep, outcome: Result<(), UnlockError>) -> bool {
        match outcome {
            Ok(()) => {
                self.log(format!("{step} succeeded"));
                true
            }
            Err(e) => {
                warn!(%step, error = %e, "Audio unlock step failed");
                self.log(format!("{step} failed: {e}"));
                false
            }
        }
    }

    /// Runs the whole ladder. No step's failure stops the next one.
    ///
    /// Returns whether audio is likely unlocked: true once any element
    /// reported a `play`, here or through [`Self::on_play_event`].
    pub async fn unlock(&mut self) -> bool {
        self.log("Starting mobile audio unlock".to_string());

        let outcome = self.platform.resume_audio_context().await;
        self.record(RemediationStep::AudioContext, outcome);

        let outcome = self.platform.probe_microphone().await;
        self.record(RemediationStep::Microphone, outcome);

        let outcome = self.platform.play_silent_tone().await;
        self.record(RemediationStep::SilentTone, outcome);

        for element in 0..AUDIO_ELEMENT_POOL {
            let outcome = self
                .platform
                .play_silent_clip(element, SILENT_CLIP_DATA_URI)
                .await;
            if self.record(RemediationStep::SilentClip(element), outcome) {
                self.audio_ready = true;
            }
        }

        info!(audio_ready = self.audio_ready, "Mobile audio unlock complete");
        self.log(format!("Unlock complete, audio ready: {}", self.audio_ready));
        self.audio_ready
    }

    /// Tries to start the remote-audio element, falling back to routing
    /// the stream through the audio context.
    pub async fn force_play(&mut self) -> bool {
        match self.platform.play_remote().await {
            Ok(()) => {
                self.log("Direct play successful".to_string());
                self.audio_ready = true;
                return true;
            }
            Err(e) => self.log(format!("Direct play failed: {e}")),
        }

        match self.platform.route_remote_through_context().await {
            Ok(()) => {
                self.log("Routed remote audio through the audio context".to_string());
                true
            }
            Err(e) => {
                self.log(format!("Audio context routing failed: {e}"));
                false
            }
        }
    }

    /// The host's remote-audio element fired `play`.
    pub fn on_play_event(&mut self) {
        self.log("Play event fired".to_string());
        self.audio_ready = true;
    }

    /// The host's remote-audio element fired `error`.
    pub fn on_playback_error(&mut self, error: &str) {
        warn!(%error, "Remote audio playback error");
        self.log(format!("Audio error: {error}"));
    }

    pub fn audio_ready(&self) -> bool {
        self.audio_ready
    }

    /// Timestamped record of every step, for on-device diagnostics.
    pub fn debug_log(&self) -> &[String] {
        &self.debug_log
    }
}
