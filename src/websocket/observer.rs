use crate::websocket::channel::{MessageDto, ProxyHandle};
use crate::websocket::types::ProxyState;

/// Callbacks the proxy layer invokes for every channel it handles.
///
/// Calls arrive on the proxy's I/O threads. Implementations must not panic or
/// block for long: the proxy keeps forwarding frames regardless of what the
/// observer does.
pub trait WebSocketObserver: Send + Sync {
    /// Observers are notified in ascending order.
    fn observing_order(&self) -> i32;

    /// Called for every frame. Returning `false` stops the frame from being
    /// forwarded to later observers.
    fn on_message_frame(&self, channel_id: i64, message: &MessageDto) -> bool;

    fn on_state_change(&self, state: ProxyState, proxy: &dyn ProxyHandle);
}
