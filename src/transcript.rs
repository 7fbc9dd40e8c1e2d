//! Append-only conversation transcript

use crate::provider::{FinalRecord, MenuOption, OrderRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Customer,
    Provider,
}

/// Structured data carried by an entry, tagged by display kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Payload {
    Text,
    MenuListing { options: Vec<MenuOption> },
    SubstitutionOffer { candidates: Vec<String> },
    OrderConfirmation { order: OrderRecord },
    FinalConfirmation { receipt: FinalRecord },
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text => "text",
            Payload::MenuListing { .. } => "menu-listing",
            Payload::SubstitutionOffer { .. } => "substitution-offer",
            Payload::OrderConfirmation { .. } => "order-confirmation",
            Payload::FinalConfirmation { .. } => "final-confirmation",
        }
    }
}

/// An entry before it is stamped and stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub sender: Sender,
    pub text: String,
    pub payload: Payload,
}

impl EntryDraft {
    pub fn customer(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Customer,
            text: text.into(),
            payload: Payload::Text,
        }
    }

    pub fn provider(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Provider,
            text: text.into(),
            payload: Payload::Text,
        }
    }

    pub fn provider_with(text: impl Into<String>, payload: Payload) -> Self {
        Self {
            sender: Sender::Provider,
            text: text.into(),
            payload,
        }
    }
}

/// A stored transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(flatten)]
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of one session's exchange
///
/// Entries are only ever appended; `clear` is reserved for session reset.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp and store a draft, returning the stored entry
    pub fn append(&mut self, draft: EntryDraft) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry {
            id: uuid::Uuid::new_v4().to_string(),
            sender: draft.sender,
            text: draft.text,
            payload: draft.payload,
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }
}
