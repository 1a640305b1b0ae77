use ifc_realtime::SessionSignal;
use ifc_voice_core::transcript::{ItemStatus, ItemType, Role, TranscriptItem, TranscriptStore};
use std::collections::HashSet;

pub const HELP: &str = "\
Commands:
  <text>        send a typed message
  /talk         press push-to-talk
  /stop         release push-to-talk
  /cancel       leave push-to-talk without asking for a response
  /interrupt    stop the assistant
  /transcript   print the whole transcript
  /quit         disconnect and exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Talk,
    Stop,
    Cancel,
    Interrupt,
    Transcript,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "/talk" => Command::Talk,
            "/stop" => Command::Stop,
            "/cancel" => Command::Cancel,
            "/interrupt" => Command::Interrupt,
            "/transcript" => Command::Transcript,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other if other.starts_with('/') => Command::Unknown(other.to_string()),
            text => Command::Say(text.to_string()),
        }
    }
}

pub fn format_item(item: &TranscriptItem) -> String {
    match item.item_type {
        ItemType::Breadcrumb => format!("  · {}", item.title),
        ItemType::Message => format!("[{}] {}", role_label(item.role), item.title),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "ifc",
        Role::System => "system",
    }
}

pub fn format_signal(signal: &SessionSignal) -> String {
    match signal {
        SessionSignal::StatusChanged(status) => format!("-- {status}"),
        SessionSignal::AgentChanged(agent) => format!("-- now speaking: {agent}"),
    }
}

/// Prints each finished transcript item exactly once.
#[derive(Debug, Default)]
pub struct Renderer {
    printed: HashSet<String>,
}

impl Renderer {
    /// Lines for visible, finished items not printed yet.
    pub fn flush(&mut self, transcript: &TranscriptStore) -> Vec<String> {
        transcript
            .visible()
            .into_iter()
            .filter(|item| item.status == ItemStatus::Done)
            .filter(|item| self.printed.insert(item.item_id.clone()))
            .map(format_item)
            .collect()
    }
}
