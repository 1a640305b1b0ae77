//! The visible conversation: messages and system breadcrumbs.
//!
//! Items are keyed by a unique id, mutated in place while their text
//! streams in, and never deleted. Hidden items stay in the store.

use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, time::Instant};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Message,
    Breadcrumb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Parses a backend role string. Unknown roles are treated as system.
    pub fn from_backend(role: &str) -> Self {
        match role {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptItem {
    pub item_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub role: Role,
    pub title: String,
    /// Payload attached to breadcrumbs (tool arguments, guardrail verdicts).
    pub data: Option<Value>,
    /// Assigned by the store on append when absent.
    pub created_at_ms: Option<u64>,
    pub is_hidden: bool,
    pub status: ItemStatus,
}

impl TranscriptItem {
    pub fn message(item_id: impl Into<String>, role: Role, title: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_type: ItemType::Message,
            role,
            title: title.into(),
            data: None,
            created_at_ms: None,
            is_hidden: false,
            status: ItemStatus::InProgress,
        }
    }

    pub fn breadcrumb(item_id: impl Into<String>, title: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            item_id: item_id.into(),
            item_type: ItemType::Breadcrumb,
            role: Role::System,
            title: title.into(),
            data,
            created_at_ms: None,
            is_hidden: false,
            status: ItemStatus::Done,
        }
    }
}

/// Ordered, append-only transcript.
#[derive(Debug)]
pub struct TranscriptStore {
    items: Vec<TranscriptItem>,
    index: HashMap<String, usize>,
    epoch: Instant,
    last_ms: u64,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            epoch: Instant::now(),
            last_ms: 0,
        }
    }

    /// Monotonic milliseconds since the store was created.
    fn now_ms(&mut self) -> u64 {
        let elapsed = self.epoch.elapsed().as_millis() as u64;
        self.last_ms = self.last_ms.max(elapsed);
        self.last_ms
    }

    /// Adds an item. Returns `false` if the id is already present, in
    /// which case the store is left untouched.
    pub fn append(&mut self, mut item: TranscriptItem) -> bool {
        if self.index.contains_key(&item.item_id) {
            warn!(item_id = %item.item_id, "Ignoring transcript item with duplicate id");
            return false;
        }
        if item.created_at_ms.is_none() {
            item.created_at_ms = Some(self.now_ms());
        }
        self.index.insert(item.item_id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Logs a local system breadcrumb and returns its generated id.
    pub fn add_breadcrumb(&mut self, title: impl Into<String>, data: Option<Value>) -> String {
        let item_id = Uuid::new_v4().to_string();
        self.append(TranscriptItem::breadcrumb(item_id.clone(), title, data));
        item_id
    }

    fn get_mut(&mut self, item_id: &str) -> Option<&mut TranscriptItem> {
        let idx = *self.index.get(item_id)?;
        self.items.get_mut(idx)
    }

    pub fn get(&self, item_id: &str) -> Option<&TranscriptItem> {
        self.index.get(item_id).and_then(|idx| self.items.get(*idx))
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.index.contains_key(item_id)
    }

    /// Appends a streamed fragment to an item's title.
    ///
    /// Deltas may race ahead of item creation; unknown ids are dropped.
    pub fn apply_delta(&mut self, item_id: &str, fragment: &str) -> bool {
        match self.get_mut(item_id) {
            Some(item) => {
                item.title.push_str(fragment);
                true
            }
            None => {
                debug!(item_id, "Dropping delta for unknown transcript item");
                false
            }
        }
    }

    /// Replaces an item's title. Unknown ids are ignored.
    pub fn set_title(&mut self, item_id: &str, title: impl Into<String>) -> bool {
        match self.get_mut(item_id) {
            Some(item) => {
                item.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, item_id: &str, status: ItemStatus) -> bool {
        match self.get_mut(item_id) {
            Some(item) => {
                item.status = status;
                true
            }
            None => false,
        }
    }

    /// Sets the visibility flag. Setting the same value twice is a no-op.
    pub fn set_hidden(&mut self, item_id: &str, hidden: bool) -> bool {
        match self.get_mut(item_id) {
            Some(item) => {
                item.is_hidden = hidden;
                true
            }
            None => false,
        }
    }

    /// All items ordered by creation time, ties in insertion order.
    pub fn list(&self) -> Vec<&TranscriptItem> {
        let mut items: Vec<&TranscriptItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.created_at_ms.unwrap_or_default());
        items
    }

    /// Items the UI should render.
    pub fn visible(&self) -> Vec<&TranscriptItem> {
        self.list().into_iter().filter(|item| !item.is_hidden).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
