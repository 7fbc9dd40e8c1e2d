//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::effect::ProviderCall;
use super::event::ProviderReply;
use super::state::*;
use super::transition::*;
use super::*;
use crate::provider::{
    FinalRecord, MenuListing, MenuOption, OrderOutcome, OrderRecord, SubstitutionOutcome,
    TimeWindow, TransportError,
};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::default()
}

fn record_for(item: &str) -> OrderRecord {
    OrderRecord {
        item: item.to_string(),
        quantity: 1,
        estimated_time: "30 menit".to_string(),
        address: "Jl. Merdeka 1".to_string(),
        time_window: "12:00-13:00".to_string(),
        delivery_fee: 5000,
    }
}

fn receipt_for(id: &str) -> FinalRecord {
    FinalRecord {
        conversation_id: id.to_string(),
        order_number: id.to_uppercase(),
        status: "confirmed".to_string(),
        payment_status: "pending".to_string(),
    }
}

fn count_appends(result: &TransitionResult) -> usize {
    result.effects.iter().filter(|e| e.is_append()).count()
}

fn has_provider_call(result: &TransitionResult) -> bool {
    result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::CallProvider(_)))
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_item() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,8}"
}

fn arb_menu() -> impl Strategy<Value = MenuListing> {
    ("info[0-9]{5}", proptest::collection::vec(arb_item(), 1..4)).prop_map(|(id, items)| {
        MenuListing {
            conversation_id: id,
            options: items
                .into_iter()
                .map(|item| MenuOption {
                    item,
                    stock: 3,
                    estimated_time: "30 menit".to_string(),
                    delivery_fee: 5000,
                })
                .collect(),
        }
    })
}

fn arb_pending_call() -> impl Strategy<Value = PendingCall> {
    prop_oneof![
        Just(PendingCall::Menu),
        Just(PendingCall::Order),
        arb_item().prop_map(|item| PendingCall::Substitution { item }),
        Just(PendingCall::Confirm),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<bool>().prop_map(|greeted| Step::Welcome { greeted }),
        Just(Step::Ordering),
        proptest::collection::vec(arb_item(), 1..4)
            .prop_map(|substitutions| Step::Negotiating { substitutions }),
        arb_item().prop_map(|item| Step::Confirming {
            order: record_for(&item)
        }),
        arb_item().prop_map(|item| Step::Completed {
            order: record_for(&item),
            receipt: receipt_for("info00001"),
        }),
    ]
}

fn arb_draft() -> impl Strategy<Value = DraftOrder> {
    (
        prop_oneof![Just(String::new()), arb_item()],
        1u32..=10,
        prop_oneof![Just(String::new()), "Jl\\. [A-Z][a-z]{3,8}"],
        proptest::option::of(proptest::sample::select(TimeWindow::ALL.to_vec())),
    )
        .prop_map(|(item, quantity, address, time_window)| DraftOrder {
            item,
            quantity,
            address,
            time_window,
        })
}

/// Sessions that satisfy the id invariant: every non-Welcome step has an id
fn arb_session() -> impl Strategy<Value = ConversationSession> {
    (
        arb_step(),
        arb_draft(),
        proptest::option::of(arb_pending_call()),
        0u64..5,
    )
        .prop_map(|(step, draft, in_flight, generation)| {
            let conversation_id = match step {
                Step::Welcome { .. } => None,
                _ => Some("info00001".to_string()),
            };
            ConversationSession {
                conversation_id,
                step,
                draft,
                last_menu: vec![],
                in_flight,
                generation,
            }
        })
}

fn arb_busy_session() -> impl Strategy<Value = ConversationSession> {
    (arb_session(), arb_pending_call()).prop_map(|(mut session, call)| {
        session.in_flight = Some(call);
        session
    })
}

fn arb_intent() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::StartOrdering),
        Just(Event::SubmitOrder),
        arb_item().prop_map(|item| Event::ChooseSubstitution { item }),
        Just(Event::ConfirmOrder),
    ]
}

fn arb_reply() -> impl Strategy<Value = ProviderReply> {
    prop_oneof![
        arb_menu().prop_map(ProviderReply::Menu),
        arb_item().prop_map(|item| ProviderReply::Order(OrderOutcome::Accepted(record_for(&item)))),
        proptest::collection::vec(arb_item(), 0..4).prop_map(|candidates| {
            ProviderReply::Order(OrderOutcome::RejectedWithAlternatives {
                reason: "item unavailable".to_string(),
                candidates,
            })
        }),
        Just(ProviderReply::Order(OrderOutcome::RejectedFinal {
            reason: "Slot waktu 12:00-13:00 penuh".to_string()
        })),
        arb_item().prop_map(|item| ProviderReply::Substitution {
            outcome: SubstitutionOutcome::Accepted(record_for(&item)),
            item,
        }),
        arb_item().prop_map(|item| ProviderReply::Substitution {
            item,
            outcome: SubstitutionOutcome::RejectedFinal {
                reason: "Substitusi tidak tersedia".to_string()
            },
        }),
        Just(ProviderReply::Confirmed(receipt_for("info00001"))),
        arb_pending_call().prop_map(|call| ProviderReply::Failed {
            call,
            error: TransportError::network("connection reset"),
        }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Greet),
        arb_intent(),
        (0u64..5, arb_reply()).prop_map(|(generation, reply)| Event::Provider { generation, reply }),
        (0u64..5).prop_map(|generation| Event::ResetTimeout { generation }),
    ]
}

/// Drive a session through menu, order and confirmation with a given reset
fn run_full_cycle(session: ConversationSession, item: &str) -> ConversationSession {
    let ctx = test_context();
    let step = |session: &ConversationSession, event: Event| {
        transition(session, &ctx, event)
            .expect("cycle transition should succeed")
            .new_session
    };

    let mut s = step(&session, Event::StartOrdering);
    s = step(
        &s,
        Event::Provider {
            generation: s.generation,
            reply: ProviderReply::Menu(MenuListing {
                conversation_id: format!("info{:05}", s.generation + 1),
                options: vec![MenuOption {
                    item: item.to_string(),
                    stock: 5,
                    estimated_time: "30 menit".to_string(),
                    delivery_fee: 5000,
                }],
            }),
        },
    );
    s.edit_draft(DraftEdit::Item(item.to_string())).unwrap();
    s.edit_draft(DraftEdit::Address("Jl. Merdeka 1".to_string()))
        .unwrap();
    s.edit_draft(DraftEdit::TimeWindow("12:00-13:00".to_string()))
        .unwrap();
    s = step(&s, Event::SubmitOrder);
    s = step(
        &s,
        Event::Provider {
            generation: s.generation,
            reply: ProviderReply::Order(OrderOutcome::Accepted(record_for(item))),
        },
    );
    s = step(&s, Event::ConfirmOrder);
    let id = s.conversation_id.clone().unwrap_or_default();
    s = step(
        &s,
        Event::Provider {
            generation: s.generation,
            reply: ProviderReply::Confirmed(receipt_for(&id)),
        },
    );
    step(
        &s,
        Event::ResetTimeout {
            generation: s.generation,
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any intent while a call is in flight is refused with Busy
    #[test]
    fn prop_busy_rejects_intents(session in arb_busy_session(), intent in arb_intent()) {
        let result = transition(&session, &test_context(), intent);
        prop_assert!(matches!(result, Err(TransitionError::Busy(_))));
    }

    /// Submitting an incomplete draft never reaches the provider
    #[test]
    fn prop_incomplete_draft_never_calls_provider(draft in arb_draft()) {
        prop_assume!(draft.missing_field().is_some());
        let session = ConversationSession {
            conversation_id: Some("info00001".to_string()),
            step: Step::Ordering,
            draft,
            ..ConversationSession::default()
        };
        match transition(&session, &test_context(), Event::SubmitOrder) {
            Err(TransitionError::Validation(ValidationError::IncompleteDraft(_))) => {}
            other => prop_assert!(false, "Expected IncompleteDraft, got {:?}", other.map(|r| r.effects)),
        }
    }

    /// Every successful transition appends exactly one transcript entry
    #[test]
    fn prop_one_append_per_transition(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, &test_context(), event) {
            prop_assert_eq!(count_appends(&result), 1);
        }
    }

    /// Outside Welcome, the session always carries a conversation id
    #[test]
    fn prop_id_present_outside_welcome(events in proptest::collection::vec(arb_event(), 0..25)) {
        let ctx = test_context();
        let mut session = ConversationSession::new();
        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                session = result.new_session;
            }
            if !matches!(session.step, Step::Welcome { .. }) {
                prop_assert!(session.conversation_id.is_some(), "No id in {:?}", session.step);
            }
        }
    }

    /// Intents only produce a provider call when they also mark the session busy
    #[test]
    fn prop_provider_call_marks_busy(session in arb_session(), event in arb_intent()) {
        if let Ok(result) = transition(&session, &test_context(), event) {
            prop_assert_eq!(has_provider_call(&result), result.new_session.is_busy());
        }
    }

    /// Alternatives enter Negotiating with a non-empty list; an empty list is final
    #[test]
    fn prop_rejections_route_correctly(
        candidates in proptest::collection::vec(arb_item(), 0..4),
    ) {
        let session = ConversationSession {
            conversation_id: Some("info00001".to_string()),
            step: Step::Ordering,
            in_flight: Some(PendingCall::Order),
            ..ConversationSession::default()
        };
        let event = Event::Provider {
            generation: 0,
            reply: ProviderReply::Order(OrderOutcome::RejectedWithAlternatives {
                reason: "item unavailable".to_string(),
                candidates: candidates.clone(),
            }),
        };
        let next = transition(&session, &test_context(), event).unwrap().new_session;
        if candidates.is_empty() {
            prop_assert_eq!(next.step, Step::Ordering);
        } else {
            prop_assert_eq!(next.pending_substitutions(), candidates.as_slice());
        }
    }

    /// Replies from an older generation never change the session
    #[test]
    fn prop_stale_generation_ignored(session in arb_session(), reply in arb_reply()) {
        prop_assume!(session.generation > 0);
        let event = Event::Provider { generation: session.generation - 1, reply };
        prop_assert!(matches!(
            transition(&session, &test_context(), event),
            Err(TransitionError::StaleReply(_))
        ));
    }

    /// Complete cycles always land back in an equivalent Welcome session
    #[test]
    fn prop_cycles_are_idempotent(items in proptest::collection::vec(arb_item(), 1..5)) {
        let mut session = ConversationSession::new();
        for item in &items {
            let before = session.generation;
            session = run_full_cycle(session, item);
            prop_assert_eq!(session.generation, before + 1);
            prop_assert_eq!(&session.step, &Step::Welcome { greeted: true });
            prop_assert!(session.conversation_id.is_none());
            prop_assert_eq!(&session.draft, &DraftOrder::default());
            prop_assert!(session.in_flight.is_none());
        }
    }

    /// A provider call carries the id of the current session (or none in Welcome)
    #[test]
    fn prop_calls_use_session_id(session in arb_session(), event in arb_intent()) {
        if let Ok(result) = transition(&session, &test_context(), event) {
            for effect in &result.effects {
                if let Effect::CallProvider(call) = effect {
                    let id = match call {
                        ProviderCall::QueryMenu { conversation_id } => conversation_id.clone(),
                        ProviderCall::PlaceOrder(req) => Some(req.conversation_id.clone()),
                        ProviderCall::ChooseSubstitution { conversation_id, .. }
                        | ProviderCall::ConfirmOrder { conversation_id } => Some(conversation_id.clone()),
                    };
                    prop_assert_eq!(id, result.new_session.conversation_id.clone());
                }
            }
        }
    }
}
