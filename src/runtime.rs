//! Runtime for executing an ordering session
//!
//! One actor task owns the session, its transcript and the reset timer.
//! Callers talk to it through a cloneable [`SessionHandle`].

mod executor;


pub use executor::SessionRuntime;

use crate::provider::ProviderClient;
use crate::state_machine::{ConversationSession, DraftEdit, Intent, SessionContext};
use crate::transcript::TranscriptEntry;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Requests from the front end to the session actor
#[derive(Debug)]
pub enum Command {
    Intent {
        intent: Intent,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    Edit {
        edit: DraftEdit,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Why the session refused a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A provider call is outstanding; nothing was recorded
    #[error("{0}")]
    Busy(String),
    /// Rejected locally; the reason is also in the transcript for intents
    #[error("{0}")]
    Invalid(String),
    #[error("Session runtime has stopped")]
    Closed,
}

/// Point-in-time copy of the session and its transcript
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: ConversationSession,
    pub transcript: Vec<TranscriptEntry>,
}

/// Events sent to subscribers
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Appended { entry: TranscriptEntry },
    Cleared,
    StateChange { session: ConversationSession },
}

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    /// Submit a customer intent; returns once the transition has been applied
    pub async fn dispatch(&self, intent: Intent) -> Result<(), DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Intent { intent, reply }).await?;
        rx.await.map_err(|_| DispatchError::Closed)?
    }

    /// Apply a local draft edit
    pub async fn edit(&self, edit: DraftEdit) -> Result<(), DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Edit { edit, reply }).await?;
        rx.await.map_err(|_| DispatchError::Closed)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Subscribe to transcript and state updates
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), DispatchError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| DispatchError::Closed)
    }
}

/// Start a session actor in the background and return its handle
///
/// The actor stops once every handle has been dropped.
pub fn spawn_session<C>(client: C, context: SessionContext) -> SessionHandle
where
    C: ProviderClient + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);

    let runtime = SessionRuntime::new(context, client, command_rx, broadcast_tx.clone());
    tokio::spawn(runtime.run());

    SessionHandle {
        command_tx,
        broadcast_tx,
    }
}
