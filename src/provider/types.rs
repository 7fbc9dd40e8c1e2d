//! Domain types produced by the provider client

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a menu listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub item: String,
    pub stock: u32,
    /// Opaque display string, e.g. "45 menit"
    pub estimated_time: String,
    pub delivery_fee: u64,
}

/// Result of an info query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuListing {
    pub conversation_id: String,
    pub options: Vec<MenuOption>,
}

/// Authoritative order record returned when the provider accepts an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub item: String,
    pub quantity: u32,
    pub estimated_time: String,
    pub address: String,
    pub time_window: String,
    pub delivery_fee: u64,
}

/// Finalization payload returned by the confirm call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecord {
    pub conversation_id: String,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
}

/// Provider answer to a place-order request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Accepted(OrderRecord),
    RejectedWithAlternatives {
        reason: String,
        candidates: Vec<String>,
    },
    RejectedFinal {
        reason: String,
    },
}

/// Provider answer to a substitution choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionOutcome {
    Accepted(OrderRecord),
    RejectedFinal { reason: String },
}

/// Fields of a place-order request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub conversation_id: String,
    pub item: String,
    pub quantity: u32,
    pub address: String,
    pub time_window: TimeWindow,
}

/// Speech-act tag on a provider message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performative {
    Request,
    Inform,
    Confirm,
    Disconfirm,
    #[serde(other)]
    Other,
}

impl Performative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Performative::Request => "request",
            Performative::Inform => "inform",
            Performative::Confirm => "confirm",
            Performative::Disconfirm => "disconfirm",
            Performative::Other => "other",
        }
    }
}

/// Row of the provider-side audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub sender: String,
    #[serde(default)]
    pub receiver: Option<String>,
    pub performative: Performative,
    pub conversation_id: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub reply_with: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
}

/// Delivery slots the provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "12:00-13:00")]
    Noon,
    #[serde(rename = "13:00-14:00")]
    OnePm,
    #[serde(rename = "14:00-15:00")]
    TwoPm,
    #[serde(rename = "15:00-16:00")]
    ThreePm,
    #[serde(rename = "16:00-17:00")]
    FourPm,
    #[serde(rename = "17:00-18:00")]
    FivePm,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::Noon,
        TimeWindow::OnePm,
        TimeWindow::TwoPm,
        TimeWindow::ThreePm,
        TimeWindow::FourPm,
        TimeWindow::FivePm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Noon => "12:00-13:00",
            TimeWindow::OnePm => "13:00-14:00",
            TimeWindow::TwoPm => "14:00-15:00",
            TimeWindow::ThreePm => "15:00-16:00",
            TimeWindow::FourPm => "16:00-17:00",
            TimeWindow::FivePm => "17:00-18:00",
        }
    }

    /// Parse a slot label; surrounding whitespace is ignored
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|slot| slot.as_str() == label)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
