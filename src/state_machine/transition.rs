//! Pure state transition function
//!
//! Given the same session, context and event it always produces the same
//! result. No I/O happens here: provider calls, transcript writes and timers
//! are returned as effects for the runtime to carry out.

use super::effect::ProviderCall;
use super::event::ProviderReply;
use super::state::{ConversationSession, PendingCall, SessionContext, Step, ValidationError};
use super::{Effect, Event};
use crate::provider::{OrderOutcome, OrderRequest, SubstitutionOutcome};
use crate::transcript::Payload;
use thiserror::Error;

const WELCOME_TEXT: &str = "Welcome to our restaurant! 🍕🍔";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: ConversationSession,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: ConversationSession) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Still waiting for the {0} reply, please wait")]
    Busy(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Stale provider reply for generation {0}")]
    StaleReply(u64),
    #[error("Stale reset timer for generation {0}")]
    StaleReset(u64),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    session: &ConversationSession,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    // At most one provider call per session; intents are refused, not queued
    if let Some(pending) = &session.in_flight {
        if is_intent(&event) {
            return Err(TransitionError::Busy(pending.name()));
        }
    }

    match (&session.step, event) {
        // ============================================================
        // Greeting
        // ============================================================
        (Step::Welcome { greeted: false }, Event::Greet) => {
            let mut next = session.clone();
            next.step = Step::Welcome { greeted: true };
            Ok(TransitionResult::new(next).with_effect(Effect::provider_says(WELCOME_TEXT)))
        }

        // ============================================================
        // User intents
        // ============================================================

        // Welcome + StartOrdering -> menu query in flight
        (Step::Welcome { .. }, Event::StartOrdering) => {
            let mut next = session.clone();
            next.step = Step::Welcome { greeted: true };
            next.in_flight = Some(PendingCall::Menu);
            let call = ProviderCall::QueryMenu {
                conversation_id: session.conversation_id.clone(),
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::customer_says(MENU_REQUEST_TEXT))
                .with_effect(Effect::CallProvider(call)))
        }

        // Completed + StartOrdering -> drop the pending reset and begin a new session now
        (Step::Completed { .. }, Event::StartOrdering) => {
            let mut next = session.reset();
            next.in_flight = Some(PendingCall::Menu);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::CancelReset)
                .with_effect(Effect::ClearTranscript)
                .with_effect(Effect::customer_says(MENU_REQUEST_TEXT))
                .with_effect(Effect::CallProvider(ProviderCall::QueryMenu {
                    conversation_id: None,
                })))
        }

        // Ordering + SubmitOrder -> order in flight (complete drafts only)
        (Step::Ordering, Event::SubmitOrder) => {
            let request = build_order_request(session)?;
            let summary = format!(
                "I'd like to order {}x {}\n📍 {}\n⏰ {}",
                request.quantity, request.item, request.address, request.time_window
            );
            let mut next = session.clone();
            next.in_flight = Some(PendingCall::Order);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::customer_says(summary))
                .with_effect(Effect::CallProvider(ProviderCall::PlaceOrder(request))))
        }

        // Negotiating + ChooseSubstitution -> substitution in flight
        (Step::Negotiating { substitutions }, Event::ChooseSubstitution { item }) => {
            let item = item.trim().to_string();
            if !substitutions.contains(&item) {
                return Err(ValidationError::UnknownSubstitute(item).into());
            }
            let conversation_id = require_conversation_id(session)?;
            let mut next = session.clone();
            next.in_flight = Some(PendingCall::Substitution { item: item.clone() });
            Ok(TransitionResult::new(next)
                .with_effect(Effect::customer_says(format!(
                    "OK, I'll take {item} instead. 👍"
                )))
                .with_effect(Effect::CallProvider(ProviderCall::ChooseSubstitution {
                    conversation_id,
                    item,
                })))
        }

        // Confirming + ConfirmOrder -> confirmation in flight
        (Step::Confirming { .. }, Event::ConfirmOrder) => {
            let conversation_id = require_conversation_id(session)?;
            let mut next = session.clone();
            next.in_flight = Some(PendingCall::Confirm);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::customer_says("Yes, I confirm this order! ✅"))
                .with_effect(Effect::CallProvider(ProviderCall::ConfirmOrder {
                    conversation_id,
                })))
        }

        // Any other intent is illegal in this step
        (
            step,
            event @ (Event::StartOrdering
            | Event::SubmitOrder
            | Event::ChooseSubstitution { .. }
            | Event::ConfirmOrder),
        ) => Err(ValidationError::IllegalIntent {
            intent: intent_name(&event),
            step: step.name(),
        }
        .into()),

        // ============================================================
        // Provider replies
        // ============================================================
        (_, Event::Provider { generation, reply }) => {
            let answers_pending = session
                .in_flight
                .as_ref()
                .is_some_and(|pending| reply.answers(pending));
            if generation != session.generation || !answers_pending {
                return Err(TransitionError::StaleReply(generation));
            }
            apply_reply(session, context, reply)
        }

        // ============================================================
        // Reset timer
        // ============================================================
        (Step::Completed { .. }, Event::ResetTimeout { generation })
            if generation == session.generation =>
        {
            Ok(TransitionResult::new(session.reset())
                .with_effect(Effect::ClearTranscript)
                .with_effect(Effect::provider_says(WELCOME_TEXT)))
        }

        (_, Event::ResetTimeout { generation }) => Err(TransitionError::StaleReset(generation)),

        (step, Event::Greet) => Err(TransitionError::InvalidTransition(format!(
            "No greeting in the {} step",
            step.name()
        ))),
    }
}

const MENU_REQUEST_TEXT: &str = "Could I see today's menu? 📋";

fn apply_reply(
    session: &ConversationSession,
    context: &SessionContext,
    reply: ProviderReply,
) -> Result<TransitionResult, TransitionError> {
    let mut next = session.clone();
    next.in_flight = None;

    match reply {
        // Menu arrived -> Ordering
        ProviderReply::Menu(listing) => {
            next.conversation_id = Some(listing.conversation_id);
            next.last_menu = listing.options.clone();
            next.step = Step::Ordering;
            Ok(TransitionResult::new(next).with_effect(Effect::provider_shows(
                "Here is what's available today:",
                Payload::MenuListing {
                    options: listing.options,
                },
            )))
        }

        ProviderReply::Order(outcome) => match outcome {
            OrderOutcome::Accepted(order) => {
                next.step = Step::Confirming {
                    order: order.clone(),
                };
                Ok(TransitionResult::new(next).with_effect(Effect::provider_shows(
                    "Your order has been processed! 🎉",
                    Payload::OrderConfirmation { order },
                )))
            }
            OrderOutcome::RejectedWithAlternatives { reason, candidates }
                if !candidates.is_empty() =>
            {
                next.step = Step::Negotiating {
                    substitutions: candidates.clone(),
                };
                Ok(TransitionResult::new(next).with_effect(Effect::provider_shows(
                    format!("Sorry, {reason}. 😞 But I have alternatives for you:"),
                    Payload::SubstitutionOffer { candidates },
                )))
            }
            OrderOutcome::RejectedWithAlternatives { reason, .. }
            | OrderOutcome::RejectedFinal { reason } => {
                next.step = Step::Ordering;
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::provider_says(format!("Sorry, {reason} 😔"))))
            }
        },

        ProviderReply::Substitution { item, outcome } => match outcome {
            SubstitutionOutcome::Accepted(order) => {
                next.draft.item = item;
                next.step = Step::Confirming {
                    order: order.clone(),
                };
                Ok(TransitionResult::new(next).with_effect(Effect::provider_shows(
                    "Substitution accepted! 🎉",
                    Payload::OrderConfirmation { order },
                )))
            }
            SubstitutionOutcome::RejectedFinal { reason } => {
                next.step = Step::Ordering;
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::provider_says(format!("Sorry, {reason} 😔"))))
            }
        },

        ProviderReply::Confirmed(receipt) => {
            let Step::Confirming { order } = &session.step else {
                return Err(TransitionError::InvalidTransition(format!(
                    "Confirmation reply in the {} step",
                    session.step.name()
                )));
            };
            next.step = Step::Completed {
                order: order.clone(),
                receipt: receipt.clone(),
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::provider_shows(
                    "Thank you! Your order is confirmed. 🎊",
                    Payload::FinalConfirmation { receipt },
                ))
                .with_effect(Effect::ScheduleReset {
                    delay: context.reset_delay,
                    generation: session.generation,
                }))
        }

        // Transport failures leave the step alone; the customer retries
        ProviderReply::Failed { call, error } => {
            tracing::debug!(call = call.name(), error = %error, "Provider call failed");
            Ok(TransitionResult::new(next).with_effect(Effect::provider_says(format!(
                "Sorry, the {} failed ({}). Please try again. 😔",
                call.name(),
                error.message
            ))))
        }
    }
}

fn build_order_request(session: &ConversationSession) -> Result<OrderRequest, TransitionError> {
    let draft = &session.draft;
    if let Some(field) = draft.missing_field() {
        return Err(ValidationError::IncompleteDraft(field).into());
    }
    let Some(time_window) = draft.time_window else {
        return Err(ValidationError::IncompleteDraft("time window").into());
    };
    Ok(OrderRequest {
        conversation_id: require_conversation_id(session)?,
        item: draft.item.clone(),
        quantity: draft.quantity,
        address: draft.address.clone(),
        time_window,
    })
}

fn require_conversation_id(session: &ConversationSession) -> Result<String, TransitionError> {
    session.conversation_id.clone().ok_or_else(|| {
        TransitionError::InvalidTransition(format!(
            "No conversation id in the {} step",
            session.step.name()
        ))
    })
}

fn is_intent(event: &Event) -> bool {
    matches!(
        event,
        Event::StartOrdering
            | Event::SubmitOrder
            | Event::ChooseSubstitution { .. }
            | Event::ConfirmOrder
    )
}

fn intent_name(event: &Event) -> &'static str {
    match event {
        Event::StartOrdering => "start ordering",
        Event::SubmitOrder => "submit the order",
        Event::ChooseSubstitution { .. } => "choose a substitute",
        Event::ConfirmOrder => "confirm the order",
        _ => "do that",
    }
}
