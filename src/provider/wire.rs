//! Provider wire format
//!
//! Request bodies and response envelopes as the provider speaks them, plus the
//! normalization into domain outcomes. The `/order` reply nests its payload
//! under a performative-tagged `content`, while `/order/substitute` returns
//! either a bare order record or a bare `{ alasan }` object. Both end up as the
//! same outcome types here so nothing upstream looks at raw shapes.

use super::types::{
    FinalRecord, MenuListing, MenuOption, OrderOutcome, OrderRecord, OrderRequest, Performative,
    SubstitutionOutcome,
};
use super::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_UNAVAILABLE_REASON: &str = "Requested item is not available";
const DEFAULT_REJECTION_REASON: &str = "Provider declined the order without a reason";

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct InfoRequestBody<'a> {
    pub conversation_id: Option<&'a str>,
    pub slot: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderRequestBody<'a> {
    pub conversation_id: &'a str,
    pub item_menu: &'a str,
    pub jumlah: u32,
    pub alamat_pengiriman: &'a str,
    pub time_window: &'a str,
}

impl<'a> From<&'a OrderRequest> for OrderRequestBody<'a> {
    fn from(req: &'a OrderRequest) -> Self {
        Self {
            conversation_id: &req.conversation_id,
            item_menu: &req.item,
            jumlah: req.quantity,
            alamat_pengiriman: &req.address,
            time_window: req.time_window.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubstituteRequestBody<'a> {
    pub conversation_id: &'a str,
    pub substitusi: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfirmRequestBody<'a> {
    pub conversation_id: &'a str,
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InfoResponse {
    pub conversation_id: String,
    pub provider_response: InfoMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InfoMessage {
    #[serde(default)]
    pub performative: Option<Performative>,
    pub content: InfoContent,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InfoContent {
    pub opsi: Vec<WireMenuOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMenuOption {
    pub item_menu: String,
    pub stok: u32,
    pub estimasi_waktu: String,
    pub biaya_pengiriman: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderResponse {
    pub provider_response: OrderMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderMessage {
    pub performative: Performative,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireOrderRecord {
    pub item_menu: String,
    pub jumlah: u32,
    pub estimasi_waktu: String,
    #[serde(default)]
    pub alamat_pengiriman: String,
    #[serde(default)]
    pub time_window: String,
    pub biaya_pengiriman: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubstituteResponse {
    pub provider_response: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConfirmResponse {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub provider_response: WireFinalRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireFinalRecord {
    pub nomor_order: String,
    pub status: String,
    pub payment_status: String,
}

// ============================================================================
// Normalization
// ============================================================================

pub(crate) fn normalize_menu(resp: InfoResponse) -> Result<MenuListing, TransportError> {
    if resp.conversation_id.trim().is_empty() {
        return Err(TransportError::protocol(
            "Provider did not assign a conversation id",
        ));
    }
    if let Some(p) = &resp.provider_response.performative {
        if *p != Performative::Inform {
            tracing::debug!(performative = ?p, "Unexpected performative on menu reply");
        }
    }

    let options = resp
        .provider_response
        .content
        .opsi
        .into_iter()
        .map(|o| {
            Ok(MenuOption {
                delivery_fee: normalize_fee(o.biaya_pengiriman)?,
                item: o.item_menu,
                stock: o.stok,
                estimated_time: o.estimasi_waktu,
            })
        })
        .collect::<Result<Vec<_>, TransportError>>()?;

    Ok(MenuListing {
        conversation_id: resp.conversation_id,
        options,
    })
}

pub(crate) fn normalize_order(resp: OrderResponse) -> Result<OrderOutcome, TransportError> {
    let OrderMessage {
        performative,
        content,
    } = resp.provider_response;

    match performative {
        Performative::Confirm => {
            let record: WireOrderRecord = serde_json::from_value(content)
                .map_err(|e| TransportError::decode(format!("Invalid order record: {e}")))?;
            Ok(OrderOutcome::Accepted(record_from_wire(record)?))
        }
        Performative::Disconfirm => Ok(normalize_disconfirm(&content)),
        other => Err(TransportError::protocol(format!(
            "Unexpected performative on order reply: {other:?}"
        ))),
    }
}

/// A `disconfirm` never vanishes: anything that is not a usable alternatives
/// list becomes a final rejection.
fn normalize_disconfirm(content: &Value) -> OrderOutcome {
    let reason = content
        .get("alasan")
        .and_then(Value::as_str)
        .map(str::to_string);

    match content.get("substitusi") {
        Some(Value::Array(items)) => {
            let candidates: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if candidates.is_empty() {
                OrderOutcome::RejectedFinal {
                    reason: reason.unwrap_or_else(|| DEFAULT_UNAVAILABLE_REASON.to_string()),
                }
            } else {
                OrderOutcome::RejectedWithAlternatives {
                    reason: reason.unwrap_or_else(|| DEFAULT_UNAVAILABLE_REASON.to_string()),
                    candidates,
                }
            }
        }
        // The provider sends a sentence here when nothing can be offered
        Some(Value::String(text)) if reason.is_none() => OrderOutcome::RejectedFinal {
            reason: text.clone(),
        },
        _ => OrderOutcome::RejectedFinal {
            reason: reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
        },
    }
}

pub(crate) fn normalize_substitution(
    resp: SubstituteResponse,
) -> Result<SubstitutionOutcome, TransportError> {
    let body = resp.provider_response;
    if let Some(reason) = body.get("alasan").and_then(rejection_reason) {
        return Ok(SubstitutionOutcome::RejectedFinal { reason });
    }

    let record: WireOrderRecord = serde_json::from_value(body)
        .map_err(|e| TransportError::decode(format!("Invalid substitution record: {e}")))?;
    Ok(SubstitutionOutcome::Accepted(record_from_wire(record)?))
}

/// Null, false, zero and the empty string do not count as a rejection
fn rejection_reason(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn normalize_final(resp: ConfirmResponse, requested_id: &str) -> FinalRecord {
    let conversation_id = resp
        .conversation_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| requested_id.to_string());
    FinalRecord {
        conversation_id,
        order_number: resp.provider_response.nomor_order,
        status: resp.provider_response.status,
        payment_status: resp.provider_response.payment_status,
    }
}

fn record_from_wire(record: WireOrderRecord) -> Result<OrderRecord, TransportError> {
    Ok(OrderRecord {
        delivery_fee: normalize_fee(record.biaya_pengiriman)?,
        item: record.item_menu,
        quantity: record.jumlah,
        estimated_time: record.estimasi_waktu,
        address: record.alamat_pengiriman,
        time_window: record.time_window,
    })
}

/// Fees arrive as JSON numbers (often `5000.0`); rounded to whole units
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)] // range checked above the cast
fn normalize_fee(raw: f64) -> Result<u64, TransportError> {
    if !raw.is_finite() || raw < 0.0 || raw > u64::MAX as f64 {
        return Err(TransportError::protocol(format!(
            "Delivery fee out of range: {raw}"
        )));
    }
    Ok(raw.round() as u64)
}
