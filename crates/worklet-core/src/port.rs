//! Per-instance message ports.
//!
//! Each processor gets its own port, separate from the runtime's control
//! channel, for module-specific messages (preset changes, meter readouts,
//! ...). The runtime hands the port to the constructor and never looks at
//! what travels over it.

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use serde_json::Value;

/// One end of a bidirectional, ordered message channel.
#[derive(Debug)]
pub struct MessagePort {
    tx: Sender<Value>,
    rx: Receiver<Value>,
}

impl MessagePort {
    /// Create two connected ends.
    ///
    /// Messages posted on one end are received on the other, in order.
    pub fn pair() -> (MessagePort, MessagePort) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (
            MessagePort { tx: a_tx, rx: a_rx },
            MessagePort { tx: b_tx, rx: b_rx },
        )
    }

    /// Post a message to the other end.
    ///
    /// Returns false if the other end has been dropped.
    pub fn post(&self, message: Value) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Take the next pending message without blocking.
    pub fn try_recv(&self) -> Option<Value> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Iterate over every message pending right now.
    pub fn drain(&self) -> impl Iterator<Item = Value> + '_ {
        self.rx.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_cross_in_order() {
        let (host, processor) = MessagePort::pair();
        assert!(host.post(json!({"gain": 0.5})));
        assert!(host.post(json!({"gain": 0.25})));

        let received: Vec<Value> = processor.drain().collect();
        assert_eq!(received, vec![json!({"gain": 0.5}), json!({"gain": 0.25})]);
        assert!(processor.try_recv().is_none());
    }

    #[test]
    fn both_directions_work() {
        let (host, processor) = MessagePort::pair();
        processor.post(json!("peak"));
        assert_eq!(host.try_recv(), Some(json!("peak")));
    }

    #[test]
    fn post_fails_after_other_end_dropped() {
        let (host, processor) = MessagePort::pair();
        drop(processor);
        assert!(!host.post(json!(1)));
    }
}
