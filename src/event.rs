// MIT License - Copyright (c) 2026 the hms2mqtt authors

use crate::state::SecurityState;

/// Events emitted by a security-state adapter.
///
/// The hosting process subscribes via `adapter.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<AccessoryEvent>`.
#[derive(Debug, Clone)]
pub enum AccessoryEvent {
    /// A refresh completed and the current state was recomputed
    StateRefreshed { current: SecurityState },
    /// The device reported disconnected; the accessory is unavailable
    NoResponse,
    /// A target-state push was accepted by the cloud
    TargetPushed { target: SecurityState },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<AccessoryEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<AccessoryEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
