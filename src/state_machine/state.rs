//! Ordering session state types

use crate::provider::{FinalRecord, MenuOption, OrderRecord, TimeWindow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10;

// ============================================================================
// Draft Order
// ============================================================================

/// The in-progress order the customer is assembling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub item: String,
    pub quantity: u32,
    pub address: String,
    pub time_window: Option<TimeWindow>,
}

impl Default for DraftOrder {
    fn default() -> Self {
        Self {
            item: String::new(),
            quantity: MIN_QUANTITY,
            address: String::new(),
            time_window: None,
        }
    }
}

impl DraftOrder {
    /// Names the first missing field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.item.trim().is_empty() {
            Some("item")
        } else if self.address.trim().is_empty() {
            Some("address")
        } else if self.time_window.is_none() {
            Some("time window")
        } else {
            None
        }
    }
}

/// Coerce raw quantity input from its leading integer, clamped to 1..=10.
/// Input without leading digits becomes 1.
pub fn coerce_quantity(raw: &str) -> u32 {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if negative || digits.is_empty() {
        return MIN_QUANTITY;
    }
    // Digits only, so the sole parse failure is overflow
    digits
        .parse::<u32>()
        .map_or(MAX_QUANTITY, |n| n.clamp(MIN_QUANTITY, MAX_QUANTITY))
}

/// A local change to the draft order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    /// Choose a menu item by name
    Item(String),
    /// Raw quantity input, coerced on application
    Quantity(String),
    Address(String),
    /// Slot label; an empty label clears the selection
    TimeWindow(String),
}

/// Why an intent or edit was refused without contacting the provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please complete the order first: {0} is missing")]
    IncompleteDraft(&'static str),
    #[error("Cannot {intent} in the {step} step")]
    IllegalIntent {
        intent: &'static str,
        step: &'static str,
    },
    #[error("{0} is not on the menu")]
    UnknownItem(String),
    #[error("{0} is not one of the offered substitutes")]
    UnknownSubstitute(String),
    #[error("Unknown delivery slot: {0}")]
    UnknownTimeWindow(String),
    #[error("Another request is still in progress")]
    RequestInFlight,
}

// ============================================================================
// Step and in-flight call
// ============================================================================

/// Where the session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Before the first request; `greeted` once the welcome entry is out
    Welcome { greeted: bool },

    /// Menu fetched, customer filling in the draft
    Ordering,

    /// Provider offered alternatives for an unavailable item
    Negotiating { substitutions: Vec<String> },

    /// Provider accepted an order, waiting for the customer's confirmation
    Confirming { order: OrderRecord },

    /// Order finalized; resets back to Welcome after a delay
    Completed {
        order: OrderRecord,
        receipt: FinalRecord,
    },
}

impl Default for Step {
    fn default() -> Self {
        Step::Welcome { greeted: false }
    }
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Welcome { .. } => "welcome",
            Step::Ordering => "ordering",
            Step::Negotiating { .. } => "negotiating",
            Step::Confirming { .. } => "confirming",
            Step::Completed { .. } => "completed",
        }
    }
}

/// The single provider call a session may have outstanding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PendingCall {
    Menu,
    Order,
    Substitution { item: String },
    Confirm,
}

impl PendingCall {
    pub fn name(&self) -> &'static str {
        match self {
            PendingCall::Menu => "menu query",
            PendingCall::Order => "order",
            PendingCall::Substitution { .. } => "substitution",
            PendingCall::Confirm => "confirmation",
        }
    }
}

// ============================================================================
// Conversation Session
// ============================================================================

/// State of one ordering flow
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Assigned by the provider on first contact
    pub conversation_id: Option<String>,
    pub step: Step,
    pub draft: DraftOrder,
    pub last_menu: Vec<MenuOption>,
    pub in_flight: Option<PendingCall>,
    /// Bumped on every reset; replies and timers from older generations are dropped
    pub generation: u64,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending_substitutions(&self) -> &[String] {
        match &self.step {
            Step::Negotiating { substitutions } => substitutions,
            _ => &[],
        }
    }

    pub fn confirmed_order(&self) -> Option<&OrderRecord> {
        match &self.step {
            Step::Confirming { order } | Step::Completed { order, .. } => Some(order),
            _ => None,
        }
    }

    pub fn final_record(&self) -> Option<&FinalRecord> {
        match &self.step {
            Step::Completed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }

    /// Fresh session for the next generation, greeting already sent
    pub fn reset(&self) -> Self {
        Self {
            step: Step::Welcome { greeted: true },
            generation: self.generation + 1,
            ..Self::default()
        }
    }

    /// Apply a local draft edit
    ///
    /// Only allowed while ordering and with nothing in flight.
    pub fn edit_draft(&mut self, edit: DraftEdit) -> Result<(), ValidationError> {
        if self.is_busy() {
            return Err(ValidationError::RequestInFlight);
        }
        if self.step != Step::Ordering {
            return Err(ValidationError::IllegalIntent {
                intent: "edit the order",
                step: self.step.name(),
            });
        }

        match edit {
            DraftEdit::Item(name) => {
                let name = name.trim();
                if !self.last_menu.is_empty() && !self.last_menu.iter().any(|o| o.item == name) {
                    return Err(ValidationError::UnknownItem(name.to_string()));
                }
                self.draft.item = name.to_string();
            }
            DraftEdit::Quantity(raw) => {
                self.draft.quantity = coerce_quantity(&raw);
            }
            DraftEdit::Address(address) => {
                self.draft.address = address.trim().to_string();
            }
            DraftEdit::TimeWindow(label) => {
                if label.trim().is_empty() {
                    self.draft.time_window = None;
                } else {
                    self.draft.time_window = Some(
                        TimeWindow::parse(&label)
                            .ok_or_else(|| ValidationError::UnknownTimeWindow(label.clone()))?,
                    );
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Context
// ============================================================================

/// Fixed configuration for a session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// How long Completed lingers before the session resets
    pub reset_delay: Duration,
}

pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(4000);

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}
