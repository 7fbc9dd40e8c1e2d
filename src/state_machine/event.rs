//! Events that drive the ordering session

use super::state::PendingCall;
use crate::provider::{
    FinalRecord, MenuListing, OrderOutcome, SubstitutionOutcome, TransportError,
};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Emit the welcome entry for a brand-new session
    Greet,

    // User intents
    StartOrdering,
    SubmitOrder,
    ChooseSubstitution { item: String },
    ConfirmOrder,

    /// A provider call finished; `generation` is the session generation it was issued in
    Provider { generation: u64, reply: ProviderReply },

    /// The Completed-state reset delay elapsed
    ResetTimeout { generation: u64 },
}

/// Typed result of a provider call
#[derive(Debug, Clone)]
pub enum ProviderReply {
    Menu(MenuListing),
    Order(OrderOutcome),
    Substitution {
        item: String,
        outcome: SubstitutionOutcome,
    },
    Confirmed(FinalRecord),
    Failed {
        call: PendingCall,
        error: TransportError,
    },
}

impl ProviderReply {
    /// Which outstanding call this reply answers
    pub fn answers(&self, call: &PendingCall) -> bool {
        match (self, call) {
            (ProviderReply::Menu(_), PendingCall::Menu)
            | (ProviderReply::Order(_), PendingCall::Order)
            | (ProviderReply::Confirmed(_), PendingCall::Confirm) => true,
            (ProviderReply::Substitution { item, .. }, PendingCall::Substitution { item: want }) => {
                item == want
            }
            (ProviderReply::Failed { call: failed, .. }, pending) => failed == pending,
            _ => false,
        }
    }
}

/// What a customer can ask the session to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    StartOrdering,
    SubmitOrder,
    ChooseSubstitution(String),
    ConfirmOrder,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::StartOrdering => "start ordering",
            Intent::SubmitOrder => "submit the order",
            Intent::ChooseSubstitution(_) => "choose a substitute",
            Intent::ConfirmOrder => "confirm the order",
        }
    }
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::StartOrdering => Event::StartOrdering,
            Intent::SubmitOrder => Event::SubmitOrder,
            Intent::ChooseSubstitution(item) => Event::ChooseSubstitution { item },
            Intent::ConfirmOrder => Event::ConfirmOrder,
        }
    }
}
