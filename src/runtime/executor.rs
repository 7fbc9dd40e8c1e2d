//! Session runtime executor

use super::{Command, DispatchError, SessionSnapshot, SessionUpdate};

use crate::provider::ProviderClient;
use crate::state_machine::{
    transition, ConversationSession, DraftEdit, Effect, Event, Intent, PendingCall,
    ProviderCall, ProviderReply, SessionContext, TransitionError, ValidationError,
};
use crate::transcript::{EntryDraft, Transcript};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Actor that owns one ordering session
pub struct SessionRuntime<C>
where
    C: ProviderClient + 'static,
{
    context: SessionContext,
    session: ConversationSession,
    transcript: Transcript,
    client: Arc<C>,
    command_rx: mpsc::Receiver<Command>,
    /// Provider replies and timer expiries come back through here
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    /// Token to disarm the pending Completed → Welcome reset
    reset_cancel_token: Option<CancellationToken>,
}

impl<C> SessionRuntime<C>
where
    C: ProviderClient + 'static,
{
    pub fn new(
        context: SessionContext,
        client: C,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            context,
            session: ConversationSession::new(),
            transcript: Transcript::new(),
            client: Arc::new(client),
            command_rx,
            event_rx,
            event_tx,
            broadcast_tx,
            reset_cancel_token: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        if let Err(e) = self.process_event(Event::Greet) {
            tracing::error!(error = %e, "Failed to greet");
        }

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::error!(error = %e, "Error handling event");
                    }
                }
            }
        }

        if let Some(token) = self.reset_cancel_token.take() {
            token.cancel();
        }
        tracing::info!("Session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Intent { intent, reply } => {
                let _ = reply.send(self.handle_intent(intent));
            }
            Command::Edit { edit, reply } => {
                let _ = reply.send(self.handle_edit(edit));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot {
                    session: self.session.clone(),
                    transcript: self.transcript.entries().to_vec(),
                });
            }
        }
    }

    fn handle_intent(&mut self, intent: Intent) -> Result<(), DispatchError> {
        let name = intent.name();
        match self.process_event(intent.into()) {
            Ok(()) => Ok(()),
            // Busy leaves no trace in the transcript
            Err(e @ TransitionError::Busy(_)) => {
                tracing::debug!(intent = name, "Intent refused while busy");
                Err(DispatchError::Busy(e.to_string()))
            }
            Err(e) => {
                tracing::info!(intent = name, error = %e, "Intent rejected");
                let message = e.to_string();
                self.append(EntryDraft::provider(message.clone()));
                Err(DispatchError::Invalid(message))
            }
        }
    }

    fn handle_edit(&mut self, edit: DraftEdit) -> Result<(), DispatchError> {
        match self.session.edit_draft(edit) {
            Ok(()) => {
                self.broadcast_state();
                Ok(())
            }
            Err(ValidationError::RequestInFlight) => Err(DispatchError::Busy(
                ValidationError::RequestInFlight.to_string(),
            )),
            Err(e) => Err(DispatchError::Invalid(e.to_string())),
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = match transition(&self.session, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::StaleReply(generation)) => {
                tracing::debug!(
                    generation,
                    current = self.session.generation,
                    "Ignoring stale provider reply"
                );
                return Ok(());
            }
            Err(TransitionError::StaleReset(generation)) => {
                tracing::debug!(generation, "Ignoring stale reset timer");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let old_step = self.session.step.name();
        self.session = result.new_session;
        if old_step != self.session.step.name() {
            tracing::info!(
                from = old_step,
                to = self.session.step.name(),
                conversation_id = self.session.conversation_id.as_deref().unwrap_or("-"),
                "Session step changed"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
        self.broadcast_state();
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Append(draft) => self.append(draft),

            Effect::ClearTranscript => {
                self.transcript.clear();
                let _ = self.broadcast_tx.send(SessionUpdate::Cleared);
            }

            Effect::CallProvider(call) => {
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                let generation = self.session.generation;

                tokio::spawn(async move {
                    let reply = perform_call(client.as_ref(), call).await;
                    let _ = event_tx.send(Event::Provider { generation, reply }).await;
                });
            }

            Effect::ScheduleReset { delay, generation } => {
                if let Some(previous) = self.reset_cancel_token.take() {
                    previous.cancel();
                }
                tracing::info!(
                    generation,
                    delay_ms = %delay.as_millis(),
                    "Scheduling session reset"
                );
                let cancel_token = CancellationToken::new();
                self.reset_cancel_token = Some(cancel_token.clone());
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::debug!(generation, "Reset timer cancelled");
                        }

                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx.send(Event::ResetTimeout { generation }).await;
                        }
                    }
                });
            }

            Effect::CancelReset => {
                if let Some(token) = self.reset_cancel_token.take() {
                    tracing::info!("Cancelling pending session reset");
                    token.cancel();
                }
            }
        }
    }

    fn append(&mut self, draft: EntryDraft) {
        let entry = self.transcript.append(draft).clone();
        let _ = self.broadcast_tx.send(SessionUpdate::Appended { entry });
    }

    fn broadcast_state(&self) {
        let _ = self.broadcast_tx.send(SessionUpdate::StateChange {
            session: self.session.clone(),
        });
    }
}

/// Run one provider call to completion and wrap the result as a reply
async fn perform_call<C: ProviderClient + ?Sized>(client: &C, call: ProviderCall) -> ProviderReply {
    match call {
        ProviderCall::QueryMenu { conversation_id } => {
            match client.query_menu(conversation_id.as_deref()).await {
                Ok(listing) => ProviderReply::Menu(listing),
                Err(error) => ProviderReply::Failed {
                    call: PendingCall::Menu,
                    error,
                },
            }
        }
        ProviderCall::PlaceOrder(request) => match client.place_order(&request).await {
            Ok(outcome) => ProviderReply::Order(outcome),
            Err(error) => ProviderReply::Failed {
                call: PendingCall::Order,
                error,
            },
        },
        ProviderCall::ChooseSubstitution {
            conversation_id,
            item,
        } => match client.choose_substitution(&conversation_id, &item).await {
            Ok(outcome) => ProviderReply::Substitution { item, outcome },
            Err(error) => ProviderReply::Failed {
                call: PendingCall::Substitution { item },
                error,
            },
        },
        ProviderCall::ConfirmOrder { conversation_id } => {
            match client.confirm_order(&conversation_id).await {
                Ok(record) => ProviderReply::Confirmed(record),
                Err(error) => ProviderReply::Failed {
                    call: PendingCall::Confirm,
                    error,
                },
            }
        }
    }
}
