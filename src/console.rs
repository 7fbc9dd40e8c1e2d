//! Line-oriented console front end
//!
//! Reads one command per line from stdin and prints every transcript entry the
//! session broadcasts. The console never mutates session state itself; it only
//! dispatches intents and edits through the [`SessionHandle`].

use crate::provider::{LogEntry, ProviderClient, TimeWindow};
use crate::runtime::{DispatchError, SessionHandle, SessionUpdate};
use crate::state_machine::{ConversationSession, DraftEdit, Intent};
use crate::transcript::{Payload, Sender, TranscriptEntry};
use std::fmt::Write as _;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

pub const HELP: &str = "\
Commands:
  menu               ask the provider for today's menu
  item <name>        choose a menu item
  qty <n>            set the quantity (1-10)
  address <text>     set the delivery address
  slot [window]      pick a delivery slot, e.g. 13:00-14:00 (empty clears)
  order              submit the order
  pick <item>        accept one of the offered substitutes
  confirm            confirm the accepted order
  show               show the draft and current step
  logs [id]          show provider logs, optionally for one conversation
  help               show this help
  quit               exit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Menu,
    Item(String),
    Quantity(String),
    Address(String),
    Slot(String),
    Order,
    Pick(String),
    Confirm,
    Show,
    Logs(Option<String>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let required = |name: &'static str| {
        if rest.is_empty() {
            Err(ParseError::MissingArgument(name))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_lowercase().as_str() {
        "menu" | "start" => ConsoleCommand::Menu,
        "item" => ConsoleCommand::Item(required("item")?),
        "qty" | "quantity" => ConsoleCommand::Quantity(rest.to_string()),
        "address" => ConsoleCommand::Address(required("address")?),
        "slot" => ConsoleCommand::Slot(rest.to_string()),
        "order" | "submit" => ConsoleCommand::Order,
        "pick" => ConsoleCommand::Pick(required("pick")?),
        "confirm" => ConsoleCommand::Confirm,
        "show" => ConsoleCommand::Show,
        "logs" => ConsoleCommand::Logs((!rest.is_empty()).then(|| rest.to_string())),
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_entry(entry: &TranscriptEntry) -> String {
    let who = match entry.sender {
        Sender::Customer => "you",
        Sender::Provider => "restaurant",
    };
    let mut out = format!(
        "[{}] {who}: {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.text
    );

    match &entry.payload {
        Payload::Text => {}
        Payload::MenuListing { options } => {
            for option in options {
                let _ = write!(
                    out,
                    "\n  - {} (stock {}, {}, fee Rp {})",
                    option.item, option.stock, option.estimated_time, option.delivery_fee
                );
            }
        }
        Payload::SubstitutionOffer { candidates } => {
            for candidate in candidates {
                let _ = write!(out, "\n  * {candidate}");
            }
            out.push_str("\n  (use 'pick <item>')");
        }
        Payload::OrderConfirmation { order } => {
            let _ = write!(
                out,
                "\n  {}x {}\n  address: {}\n  slot: {}\n  estimated: {}\n  delivery fee: Rp {}\n  (use 'confirm')",
                order.quantity,
                order.item,
                order.address,
                order.time_window,
                order.estimated_time,
                order.delivery_fee
            );
        }
        Payload::FinalConfirmation { receipt } => {
            let _ = write!(
                out,
                "\n  order number: {}\n  status: {}\n  payment: {}",
                receipt.order_number, receipt.status, receipt.payment_status
            );
        }
    }
    out
}

pub fn render_session(session: &ConversationSession) -> String {
    let draft = &session.draft;
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    let mut out = format!(
        "step: {}{}\nconversation: {}\nitem: {}\nquantity: {}\naddress: {}\nslot: {}",
        session.step.name(),
        session
            .in_flight
            .as_ref()
            .map(|call| format!(" (waiting for {})", call.name()))
            .unwrap_or_default(),
        session.conversation_id.as_deref().unwrap_or("-"),
        or_dash(&draft.item),
        draft.quantity,
        or_dash(&draft.address),
        draft.time_window.map_or("-", TimeWindow::as_str),
    );
    let substitutes = session.pending_substitutions();
    if !substitutes.is_empty() {
        let _ = write!(out, "\nsubstitutes: {}", substitutes.join(", "));
    }
    if let Some(order) = session.confirmed_order() {
        let _ = write!(
            out,
            "\naccepted: {}x {} for {}",
            order.quantity, order.item, order.time_window
        );
    }
    if let Some(receipt) = session.final_record() {
        let _ = write!(out, "\norder number: {}", receipt.order_number);
    }
    out
}

pub fn render_logs(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "No log entries".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{} {} -> {} [{}] {} {}",
                e.timestamp,
                e.sender,
                e.receiver.as_deref().unwrap_or("-"),
                e.performative.as_str(),
                e.conversation_id,
                e.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Driver
// ============================================================================

/// Run the console until `quit` or end of input
pub async fn run<C>(handle: SessionHandle, client: C) -> std::io::Result<()>
where
    C: ProviderClient,
{
    if let Ok(snapshot) = handle.snapshot().await {
        for entry in &snapshot.transcript {
            println!("{}", render_entry(entry));
        }
    }
    let printer = tokio::spawn(print_updates(handle.subscribe()));
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        execute(&handle, &client, command).await;
    }

    printer.abort();
    Ok(())
}

async fn execute<C: ProviderClient>(handle: &SessionHandle, client: &C, command: ConsoleCommand) {
    let is_intent = matches!(
        command,
        ConsoleCommand::Menu | ConsoleCommand::Order | ConsoleCommand::Pick(_) | ConsoleCommand::Confirm
    );
    let result = match command {
        ConsoleCommand::Menu => handle.dispatch(Intent::StartOrdering).await,
        ConsoleCommand::Order => handle.dispatch(Intent::SubmitOrder).await,
        ConsoleCommand::Pick(item) => handle.dispatch(Intent::ChooseSubstitution(item)).await,
        ConsoleCommand::Confirm => handle.dispatch(Intent::ConfirmOrder).await,
        ConsoleCommand::Item(name) => handle.edit(DraftEdit::Item(name)).await,
        ConsoleCommand::Quantity(raw) => handle.edit(DraftEdit::Quantity(raw)).await,
        ConsoleCommand::Address(text) => handle.edit(DraftEdit::Address(text)).await,
        ConsoleCommand::Slot(label) => handle.edit(DraftEdit::TimeWindow(label)).await,
        ConsoleCommand::Show => handle.snapshot().await.map(|snapshot| {
            println!("{}", render_session(&snapshot.session));
        }),
        ConsoleCommand::Logs(filter) => {
            match client.query_logs(filter.as_deref()).await {
                Ok(entries) => println!("{}", render_logs(&entries)),
                Err(e) => println!("Could not fetch logs: {e}"),
            }
            Ok(())
        }
        ConsoleCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    match result {
        Ok(()) => {}
        // Intent rejections are already in the transcript
        Err(DispatchError::Invalid(_)) if is_intent => {}
        Err(e) => println!("{e}"),
    }
}

async fn print_updates(mut rx: broadcast::Receiver<SessionUpdate>) {
    loop {
        match rx.recv().await {
            Ok(SessionUpdate::Appended { entry }) => println!("{}", render_entry(&entry)),
            Ok(SessionUpdate::Cleared) => println!("--- new session ---"),
            Ok(SessionUpdate::StateChange { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind session updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
