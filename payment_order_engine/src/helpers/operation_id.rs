use blake2::{Blake2b512, Digest};

use crate::{
    db_types::{OrderId, OrderStatusType},
    order_objects::TransitionData,
};

const OPERATION_ID_PREFIX: &str = "op_";

/// Derives the idempotency key for a status update when the caller did not supply one.
///
/// The key is a hash of the order id, the target status and the canonical JSON of the payload. There is no timestamp in
/// the mix, so a retry of the same logical update produces the same key and is recognised as a replay. JSON objects
/// serialise with sorted keys, which makes the payload encoding canonical.
///
/// Note that two *distinct* updates with identical content also share a key. Callers that need to apply the same update
/// twice on purpose must supply their own operation ids.
pub fn derive_operation_id(order_id: &OrderId, to_status: OrderStatusType, data: &TransitionData) -> String {
    let payload = serde_json::to_vec(data).unwrap_or_default();
    let mut hasher = Blake2b512::new();
    hasher.update(order_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(to_status.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(&payload);
    let hash = hasher.finalize();
    let hex = hash[..16].iter().map(|b| format!("{b:02x}")).collect::<String>();
    format!("{OPERATION_ID_PREFIX}{hex}")
}

/// The operation id used by the expiry sweep to move a stale order to `status`. It is fixed per order and target, so a
/// sweep that is re-run after a crash is a no-op.
pub fn sweep_operation_id(order_id: &OrderId, status: OrderStatusType) -> String {
    match status {
        OrderStatusType::Expired => format!("expire:{}", order_id.as_str()),
        OrderStatusType::Timeout => format!("timeout:{}", order_id.as_str()),
        other => format!("{}:{}", other.as_str().to_ascii_lowercase(), order_id.as_str()),
    }
}
