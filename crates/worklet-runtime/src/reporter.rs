//! Lifecycle reporter: the processing thread's outbound voice.

use crossbeam_channel::Sender;
use worklet_registry::ModuleDescriptor;

use crate::message::{Event, LifecycleState, NodeId, ProcessorId};

/// Posts [`Event`]s to the control thread.
///
/// Sending never blocks and never fails from the caller's point of view: if
/// the control side has hung up, the event is discarded.
#[derive(Debug, Clone)]
pub struct LifecycleReporter {
    tx: Sender<Event>,
}

impl LifecycleReporter {
    /// Wrap the outbound end of the event channel.
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }

    /// Post an event.
    pub fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("reporter: control side gone, event dropped");
        }
    }

    /// A module was bound.
    pub fn registered(&self, descriptor: &ModuleDescriptor) {
        self.emit(Event::Register {
            name: descriptor.name().to_string(),
            descriptor: descriptor.parameter_descriptors().to_vec(),
        });
    }

    /// An instance is ready.
    pub fn running(&self, node: NodeId, processor: ProcessorId) {
        self.emit(Event::State {
            node: Some(node),
            processor: Some(processor),
            state: LifecycleState::Running,
        });
    }

    /// Registration or construction failed.
    pub fn error(&self, node: Option<NodeId>) {
        self.emit(Event::State {
            node,
            processor: None,
            state: LifecycleState::Error,
        });
    }

    /// An import completed.
    pub fn loaded(&self, url: &str) {
        self.emit(Event::Load {
            url: url.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use worklet_registry::modules::gain_module;

    #[test]
    fn events_arrive_in_order() {
        let (tx, rx) = unbounded();
        let reporter = LifecycleReporter::new(tx);
        reporter.registered(&gain_module());
        reporter.running(NodeId(4), ProcessorId(0));
        reporter.error(None);

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Event::Register { name, descriptor } if name == "Gain" && descriptor.len() == 1));
        assert_eq!(events[1].lifecycle_state(), Some(LifecycleState::Running));
        assert_eq!(
            events[2],
            Event::State {
                node: None,
                processor: None,
                state: LifecycleState::Error
            }
        );
    }

    #[test]
    fn emit_after_hangup_is_silent() {
        let (tx, rx) = unbounded();
        drop(rx);
        let reporter = LifecycleReporter::new(tx);
        reporter.loaded("modules/gain.js");
    }
}
