use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Connection status of the realtime session, as surfaced to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Disconnected => write!(f, "DISCONNECTED"),
            SessionStatus::Connecting => write!(f, "CONNECTING"),
            SessionStatus::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// Audio codec negotiated with the backend.
///
/// The narrow-band G.711 codecs simulate how the assistant sounds over a
/// phone line; everything else falls back to Opus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Opus,
    Pcmu,
    Pcma,
}

impl AudioCodec {
    /// The realtime API audio format matching this codec.
    pub fn audio_format(&self) -> &'static str {
        match self {
            AudioCodec::Pcmu => "g711_ulaw",
            AudioCodec::Pcma => "g711_alaw",
            AudioCodec::Opus => "pcm16",
        }
    }
}

impl FromStr for AudioCodec {
    type Err = std::convert::Infallible;

    /// Unknown codec names select Opus rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "pcmu" => AudioCodec::Pcmu,
            "pcma" => AudioCodec::Pcma,
            _ => AudioCodec::Opus,
        })
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCodec::Opus => write!(f, "opus"),
            AudioCodec::Pcmu => write!(f, "pcmu"),
            AudioCodec::Pcma => write!(f, "pcma"),
        }
    }
}

/// Display language selected by the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "FR")]
    Fr,
    #[serde(rename = "KH")]
    Kh,
    #[serde(rename = "EN")]
    En,
}

impl Language {
    /// Short code forwarded to the agents as `selectedLanguage`.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Fr => "FR",
            Language::Kh => "KH",
            Language::En => "EN",
        }
    }

    /// Locale used by the message catalogs.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Kh => "km",
            Language::En => "en",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language '{0}', expected one of FR, KH, EN")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FR" | "fr" => Ok(Language::Fr),
            "KH" | "kh" | "km" => Ok(Language::Kh),
            "EN" | "en" => Ok(Language::En),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
