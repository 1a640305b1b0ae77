use clap::Parser;
use ifc_realtime::openai::DEFAULT_REALTIME_URL;
use ifc_voice_core::{AudioCodec, Language, scenario::ScenarioVariant};
use tracing::Level;

/// Terminal client for the Institut français du Cambodge voice assistant.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
pub struct Args {
    /// Same-origin endpoint that mints ephemeral keys.
    #[arg(long, env = "IFC_SESSION_URL", default_value = "http://localhost:3000/api/session")]
    pub session_url: String,

    /// Use an already minted ephemeral key instead of the session endpoint.
    #[arg(long, env = "IFC_EPHEMERAL_KEY", hide_env_values = true)]
    pub ephemeral_key: Option<String>,

    #[arg(long, env = "IFC_REALTIME_URL", default_value = DEFAULT_REALTIME_URL)]
    pub realtime_url: String,

    #[arg(long, default_value = "gpt-4o-realtime-preview-2025-06-03")]
    pub model: String,

    #[arg(long, default_value = "gpt-4o-mini-transcribe")]
    pub transcription_model: String,

    /// Greeting language: FR, KH or EN.
    #[arg(long, default_value = "FR")]
    pub language: Language,

    /// Start the session at this agent instead of the receptionist.
    #[arg(long)]
    pub agent: Option<String>,

    #[arg(long, default_value = "optimized")]
    pub variant: ScenarioVariant,

    /// pcmu or pcma simulate a phone line; anything else means opus.
    #[arg(long, env = "IFC_CODEC", default_value = "opus")]
    pub codec: AudioCodec,

    #[arg(long, env = "IFC_LOG_LEVEL", default_value = "INFO")]
    pub log_level: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["ifc-voice"]).unwrap();
        assert_eq!(args.language, Language::Fr);
        assert_eq!(args.codec, AudioCodec::Opus);
        assert_eq!(args.variant, ScenarioVariant::Optimized);
        assert_eq!(args.agent, None);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "ifc-voice",
            "--language",
            "km",
            "--codec",
            "pcmu",
            "--variant",
            "legacy",
            "--agent",
            "events",
            "--ephemeral-key",
            "ek_test",
        ])
        .unwrap();
        assert_eq!(args.language, Language::Kh);
        assert_eq!(args.codec, AudioCodec::Pcmu);
        assert_eq!(args.variant, ScenarioVariant::Legacy);
        assert_eq!(args.agent.as_deref(), Some("events"));
        assert_eq!(args.ephemeral_key.as_deref(), Some("ek_test"));
    }

    #[test]
    fn test_rejects_unknown_language() {
        assert!(Args::try_parse_from(["ifc-voice", "--language", "DE"]).is_err());
    }
}
