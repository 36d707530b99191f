//! Lifecycle events published by resources and collections.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceEvent {
    #[serde(rename = "didCreate")]
    DidCreate,
    #[serde(rename = "didUpdate")]
    DidUpdate,
    #[serde(rename = "didDelete")]
    DidDelete,
    #[serde(rename = "didLoad")]
    DidLoad,
}

impl ResourceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceEvent::DidCreate => "didCreate",
            ResourceEvent::DidUpdate => "didUpdate",
            ResourceEvent::DidDelete => "didDelete",
            ResourceEvent::DidLoad => "didLoad",
        }
    }
}

impl fmt::Display for ResourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-instance broadcast of [`ResourceEvent`]s.
///
/// Emitting with no subscribers is not an error. Closing drops the sender so
/// every receiver observes `RecvError::Closed` after draining.
#[derive(Debug)]
pub(crate) struct EventEmitter {
    sender: Mutex<Option<broadcast::Sender<ResourceEvent>>>,
}

impl EventEmitter {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    pub(crate) fn emit(&self, event: ResourceEvent) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = sender.as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Once closed, returns a receiver that reports `Closed` immediately.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub(crate) fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_emit_and_close() {
        let emitter = EventEmitter::new();
        emitter.emit(ResourceEvent::DidLoad);

        let mut rx = emitter.subscribe();
        emitter.emit(ResourceEvent::DidCreate);
        assert_eq!(rx.try_recv(), Ok(ResourceEvent::DidCreate));

        emitter.close();
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
        let mut late = emitter.subscribe();
        assert_eq!(late.try_recv(), Err(TryRecvError::Closed));
        emitter.emit(ResourceEvent::DidDelete);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ResourceEvent::DidCreate.to_string(), "didCreate");
        assert_eq!(
            serde_json::to_value(ResourceEvent::DidLoad).unwrap(),
            serde_json::json!("didLoad")
        );
    }
}
