//! Ordering session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, ProviderCall};
pub use event::{Event, Intent, ProviderReply};
pub use state::{
    ConversationSession, DraftEdit, PendingCall, SessionContext, Step, ValidationError,
};
pub use transition::{transition, TransitionError};
