//! Bridge notifications for external collaborators.

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::InboundMessage;

// ============================================================================
// Types
// ============================================================================

/// Notification handler callback type.
///
/// Called synchronously for each notification the bridge emits.
pub type NotificationHandler = Box<dyn Fn(&BridgeNotification) + Send + Sync>;

/// Observable side effects of bridge operations.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeNotification {
    /// A domain was newly enabled.
    DomainEnabled(String),

    /// A previously enabled domain was disabled.
    DomainDisabled(String),

    /// A client command passed domain gating and awaits device dispatch.
    Incoming(IncomingCommand),
}

/// A gated client command.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCommand {
    /// Domain part of the method.
    pub domain: String,
    /// Method name without the domain.
    pub method: String,
    /// The client message as received.
    pub message: InboundMessage,
}

// ============================================================================
// Subscribers
// ============================================================================

/// Registered notification handlers, called in subscription order.
#[derive(Default)]
pub(crate) struct Subscribers {
    handlers: Vec<NotificationHandler>,
}

impl Subscribers {
    pub(crate) fn push(&mut self, handler: NotificationHandler) {
        self.handlers.push(handler);
    }

    pub(crate) fn emit(&self, notification: &BridgeNotification) {
        for handler in &self.handlers {
            handler(notification);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_every_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut subscribers = Subscribers::default();

        for _ in 0..3 {
            let count = Arc::clone(&count);
            subscribers.push(Box::new(move |_: &BridgeNotification| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        subscribers.emit(&BridgeNotification::DomainEnabled("Network".into()));
        assert_eq!(subscribers.len(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
