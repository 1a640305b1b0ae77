//! Terminal client driving a full voice-assistant session.
//!
//! Reads commands from stdin, forwards them to the session coordinator and
//! prints finished transcript items and session signals as they arrive.

mod cli;
mod repl;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use ifc_realtime::{
    ConnectOptions, CredentialProvider, HttpCredentialProvider, OpenAiRealtimeBackend,
    SessionCoordinator, SessionSettings, StaticCredentialProvider,
};
use ifc_voice_core::{
    guardrail::ForbiddenTopicGuardrail,
    scenario::{COMPANY_NAME, institut_francais_cambodge},
};
use repl::{Command, HELP, Renderer, format_item, format_signal};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let mut scenario =
        institut_francais_cambodge(args.variant).context("Failed to build the agent scenario")?;
    if let Some(agent) = &args.agent {
        scenario = scenario
            .rooted_at(agent)
            .with_context(|| format!("Cannot start the session at '{agent}'"))?;
    }

    let backend = Arc::new(OpenAiRealtimeBackend::new(args.realtime_url.clone()));
    let settings = SessionSettings {
        model: args.model.clone(),
        transcription_model: args.transcription_model.clone(),
        codec: args.codec,
    };
    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
    let mut coordinator = SessionCoordinator::new(backend, settings).with_signals(signal_tx);

    let credentials: Arc<dyn CredentialProvider> = match &args.ephemeral_key {
        Some(key) => Arc::new(StaticCredentialProvider::new(SecretString::from(key.clone()))),
        None => Arc::new(HttpCredentialProvider::new(args.session_url.clone())),
    };
    let options = ConnectOptions::new(credentials, scenario)
        .with_language(args.language)
        .with_guardrail(Arc::new(ForbiddenTopicGuardrail::for_company(COMPANY_NAME)));

    info!(
        variant = %args.variant,
        language = %args.language,
        locale = args.language.locale(),
        codec = %args.codec,
        "Connecting to the realtime backend..."
    );
    coordinator
        .connect(options)
        .await
        .context("Failed to connect")?;
    println!("{HELP}");

    let mut renderer = Renderer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Command::Say(text) => coordinator.send_user_text(&text)?,
                    Command::Talk => coordinator.push_to_talk_start(),
                    Command::Stop => coordinator.push_to_talk_stop(),
                    Command::Cancel => coordinator.push_to_talk_cancel(),
                    Command::Interrupt => coordinator.interrupt(),
                    Command::Transcript => {
                        for item in coordinator.transcript().visible() {
                            println!("{}", format_item(item));
                        }
                    }
                    Command::Help => println!("{HELP}"),
                    Command::Quit => break,
                    Command::Empty => {}
                    Command::Unknown(command) => warn!(%command, "Unknown command, try /help"),
                }
            }
            event = coordinator.next_event() => {
                match event {
                    Some(event) => {
                        coordinator.handle_event(event);
                        for line in renderer.flush(coordinator.transcript()) {
                            println!("{line}");
                        }
                    }
                    None => {
                        println!("Session closed by the server.");
                        break;
                    }
                }
            }
            Some(signal) = signal_rx.recv() => println!("{}", format_signal(&signal)),
        }
    }

    coordinator.disconnect().await;
    while let Ok(signal) = signal_rx.try_recv() {
        println!("{}", format_signal(&signal));
    }
    info!("Goodbye.");
    Ok(())
}
