//! Best-effort fanout of dispense events to all connected clients.

use axum::extract::ws::Message;

use crate::dispense::event::DispenseEvent;
use crate::ws::ConnectionRegistry;

/// Broadcast a dispense event to every registered connection.
///
/// The event is serialized exactly once; the identical payload goes to each
/// connection in a registry snapshot taken at call time. Delivery is
/// attempted independently per connection — a dead connection is unregistered
/// and does not abort delivery to the others. No retry, no queuing, no
/// delivery acknowledgment.
///
/// Only serialization failure is an error; the dispense request handler must
/// surface it, since a garbled broadcast must not be attempted.
pub fn broadcast(
    registry: &ConnectionRegistry,
    event: &DispenseEvent,
) -> Result<(), serde_json::Error> {
    let payload = serde_json::to_string(event)?;
    let targets = registry.snapshot();

    tracing::info!(
        prescription_id = event.prescription_id,
        clients = targets.len(),
        "Broadcasting dispense event"
    );

    // Iterate the snapshot, collect failures, then apply removals against
    // the live registry — never mutate the structure being iterated.
    let mut failed = Vec::new();
    for (id, sender) in &targets {
        if sender.send(Message::Text(payload.clone().into())).is_err() {
            failed.push(*id);
        }
    }

    for id in failed {
        tracing::debug!(conn_id = %id, "Removed dead connection during fanout");
        registry.unregister(id);
    }

    Ok(())
}
