use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Key that closes the chat widget and the search overlay.
pub const DISMISS_KEY: &str = "Escape";

/// Follow-up option attached to a bot reply.
///
/// Each kind carries only the payload it needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Re-enter resolution with `text`.
    Query { text: String },
    /// Close the widget, scroll to the anchor and highlight it.
    Scroll { anchor: String },
    /// Close the widget and open the consultation entry point.
    OpenModal { subject: Option<String> },
    OpenLink { url: String },
    CloseChat,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QuickAction {
    pub label: String,
    #[serde(flatten)]
    pub action: Action,
}

impl QuickAction {
    pub fn query(label: &str, text: &str) -> Self {
        Self {
            label: label.to_string(),
            action: Action::Query {
                text: text.to_string(),
            },
        }
    }

    pub fn scroll(label: &str, anchor: &str) -> Self {
        Self {
            label: label.to_string(),
            action: Action::Scroll {
                anchor: anchor.to_string(),
            },
        }
    }

    pub fn open_modal(label: &str, subject: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            action: Action::OpenModal {
                subject: subject.map(str::to_string),
            },
        }
    }

    pub fn open_link(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            action: Action::OpenLink {
                url: url.to_string(),
            },
        }
    }

    pub fn close_chat(label: &str) -> Self {
        Self {
            label: label.to_string(),
            action: Action::CloseChat,
        }
    }
}

/// A record may ask for data collection; the assistant always turns this into
/// a single external hand-off chip instead of rendering a form.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandOff {
    Consultation,
}

/// One retrievable assistant topic.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KnowledgeRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    /// Stored lower-cased.
    pub keywords: Vec<String>,
    pub details: String,
    pub target_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<QuickAction>,
    pub hand_off: Option<HandOff>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CourseRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl CourseRecord {
    /// Page anchor of the course card.
    pub fn anchor(&self) -> String {
        format!("kurs-{}", self.id)
    }
}

/// One searchable entity for the site search overlay.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchRecord {
    pub title: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub description: String,
    pub target_id: String,
    pub is_active: bool,
}

/// A search record with the score it earned for one query evaluation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: SearchRecord,
    pub score: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn short_name(&self) -> &'static str {
        match self {
            Sender::User => "Siz",
            Sender::Bot => "Bot",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversationMessage {
    /// Creation-order sortable: millisecond timestamp, bumped to stay unique.
    pub id: i64,
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuickAction>,
}

impl ConversationMessage {
    pub fn user(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::User,
            options: Vec::new(),
        }
    }

    pub fn bot(id: i64, text: impl Into<String>, options: Vec<QuickAction>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::Bot,
            options,
        }
    }
}

/// Hands out strictly increasing message ids seeded from the wall clock.
#[derive(Debug, Default)]
pub struct MessageIds {
    last: i64,
}

impl MessageIds {
    pub fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}
