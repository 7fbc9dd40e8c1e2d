//! Effects produced by state transitions

use crate::provider::OrderRequest;
use crate::transcript::{EntryDraft, Payload};
use std::time::Duration;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append one entry to the transcript
    Append(EntryDraft),

    /// Drop every transcript entry (session reset only)
    ClearTranscript,

    /// Issue a provider request; its reply comes back as `Event::Provider`
    CallProvider(ProviderCall),

    /// Arm the Completed → Welcome timer
    ScheduleReset { delay: Duration, generation: u64 },

    /// Disarm a pending reset timer
    CancelReset,
}

/// A provider request with everything needed to send it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    QueryMenu { conversation_id: Option<String> },
    PlaceOrder(OrderRequest),
    ChooseSubstitution { conversation_id: String, item: String },
    ConfirmOrder { conversation_id: String },
}

impl Effect {
    pub fn customer_says(text: impl Into<String>) -> Self {
        Effect::Append(EntryDraft::customer(text))
    }

    pub fn provider_says(text: impl Into<String>) -> Self {
        Effect::Append(EntryDraft::provider(text))
    }

    pub fn provider_shows(text: impl Into<String>, payload: Payload) -> Self {
        Effect::Append(EntryDraft::provider_with(text, payload))
    }

    #[cfg(test)]
    pub fn is_append(&self) -> bool {
        matches!(self, Effect::Append(_))
    }
}
