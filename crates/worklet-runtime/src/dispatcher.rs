//! Instance table and per-tick dispatch.
//!
//! The [`Dispatcher`] owns every live [`ProcessorInstance`]. A tick names an
//! instance by id; the dispatcher runs that instance's `process` once per
//! slice, in ascending slice order, and either leaves the results in shared
//! memory or hands the transferred buffers back.
//!
//! Nothing on the tick path reports an error. Ticks for unknown ids, or copy
//! ticks with no usable payload, are dropped without a trace on the event
//! channel.

use worklet_config::TransportMode;
use worklet_core::{FrameLayout, ParamSet, Processor, Slice, for_each_local_slice};
use worklet_registry::ConstructedProcessor;

use crate::message::{NodeId, ProcessorId};

/// How an instance exchanges samples with the host.
#[derive(Debug)]
pub enum Transport {
    /// Zero-copy: slices built once at construction over shared channels.
    SharedMemory {
        /// One entry per slice, in slice order.
        slices: Vec<Slice<'static>>,
    },
    /// Copy: buffers transferred in with each tick and handed back after it.
    Copy,
}

impl Transport {
    /// The configuration-level mode of this transport.
    pub fn mode(&self) -> TransportMode {
        match self {
            Transport::SharedMemory { .. } => TransportMode::Shared,
            Transport::Copy => TransportMode::Copy,
        }
    }
}

/// A live processor and the geometry it is driven with.
pub struct ProcessorInstance {
    id: ProcessorId,
    module_name: String,
    node: NodeId,
    input_channel_count: usize,
    layout: FrameLayout,
    transport: Transport,
    processor: Box<dyn Processor>,
}

impl ProcessorInstance {
    /// Instance id.
    pub fn id(&self) -> ProcessorId {
        self.id
    }

    /// Name of the module it was built from.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Owning host node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Buffers treated as inputs in copy mode.
    pub fn input_channel_count(&self) -> usize {
        self.input_channel_count
    }

    /// Samples per `process` call.
    pub fn render_quantum(&self) -> usize {
        self.layout.render_quantum()
    }

    /// `process` calls per tick.
    pub fn num_slices(&self) -> usize {
        self.layout.num_slices()
    }

    /// Slice geometry.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Transport mode.
    pub fn transport(&self) -> TransportMode {
        self.transport.mode()
    }
}

impl std::fmt::Debug for ProcessorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorInstance")
            .field("id", &self.id)
            .field("module_name", &self.module_name)
            .field("node", &self.node)
            .field("input_channel_count", &self.input_channel_count)
            .field("layout", &self.layout)
            .field("transport", &self.transport.mode())
            .finish_non_exhaustive()
    }
}

/// Outcome of one tick.
#[derive(Debug, PartialEq)]
pub enum TickResult {
    /// Nothing ran: unknown id, or a copy tick without usable buffers.
    Dropped,
    /// Zero-copy tick: results are in shared memory.
    Rendered {
        /// `process` calls made.
        slices: usize,
    },
    /// Copy tick: buffers to post back to `node`.
    Returned {
        /// Owning node.
        node: NodeId,
        /// The transferred buffers.
        buf: Vec<Vec<f32>>,
        /// `process` calls made (0 if the buffers were too short).
        slices: usize,
    },
}

/// Table of live instances, indexed by [`ProcessorId`].
#[derive(Debug, Default)]
pub struct Dispatcher {
    instances: Vec<ProcessorInstance>,
}

impl Dispatcher {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    /// Id the next inserted instance will receive.
    pub fn next_id(&self) -> ProcessorId {
        ProcessorId(self.instances.len())
    }

    /// Store a constructed processor and assign it the next id.
    pub fn insert(
        &mut self,
        module_name: impl Into<String>,
        node: NodeId,
        constructed: ConstructedProcessor,
        layout: FrameLayout,
        transport: Transport,
    ) -> ProcessorId {
        let id = self.next_id();
        self.instances.push(ProcessorInstance {
            id,
            module_name: module_name.into(),
            node,
            input_channel_count: constructed.input_channel_count,
            layout,
            transport,
            processor: constructed.processor,
        });
        id
    }

    /// Look up an instance.
    pub fn get(&self, id: ProcessorId) -> Option<&ProcessorInstance> {
        self.instances.get(id.0)
    }

    /// Instances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessorInstance> {
        self.instances.iter()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if no instance exists.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Run one tick on instance `id`.
    ///
    /// Zero-copy instances ignore `buf`. Copy instances need `buf` with a
    /// non-empty first buffer; the first `input_channel_count` buffers are
    /// inputs, the rest outputs, and all are returned after processing.
    pub fn process_tick(&mut self, id: ProcessorId, buf: Option<Vec<Vec<f32>>>) -> TickResult {
        let Some(instance) = self.instances.get_mut(id.0) else {
            return TickResult::Dropped;
        };
        let ProcessorInstance {
            node,
            input_channel_count,
            layout,
            transport,
            processor,
            ..
        } = instance;

        match transport {
            Transport::SharedMemory { slices } => {
                if buf.is_some() {
                    tracing::trace!("dispatch: {id} is zero-copy, discarding transferred buffers");
                }
                for slice in slices.iter_mut() {
                    processor.process(&slice.inputs, &mut slice.outputs, ParamSet::empty());
                }
                TickResult::Rendered {
                    slices: slices.len(),
                }
            }
            Transport::Copy => {
                let Some(mut buf) = buf else {
                    return TickResult::Dropped;
                };
                if buf.first().is_none_or(Vec::is_empty) {
                    return TickResult::Dropped;
                }

                let processor = processor.as_mut();
                let slices = match for_each_local_slice(
                    layout,
                    &mut buf,
                    *input_channel_count,
                    |_, slice| {
                        processor.process(&slice.inputs, &mut slice.outputs, ParamSet::empty());
                    },
                ) {
                    Ok(n) => n,
                    Err(err) => {
                        tracing::warn!("dispatch: {id} tick skipped: {err}");
                        0
                    }
                };

                TickResult::Returned {
                    node: *node,
                    buf,
                    slices,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use worklet_core::{Bus, SharedChannel, shared_slices};

    /// Records the first sample of the first input channel on each call.
    struct Probe {
        seen: Arc<Mutex<Vec<f32>>>,
    }

    impl Processor for Probe {
        fn process(&mut self, inputs: &[Bus<'_>], outputs: &mut [Bus<'_>], _params: &ParamSet) {
            let first = inputs
                .first()
                .and_then(|bus| bus.first())
                .map_or(f32::NAN, |ch| ch.get(0));
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(first);
            }
            for bus in outputs.iter_mut() {
                for ch in bus.iter_mut() {
                    ch.fill(first);
                }
            }
        }
    }

    fn probe(input_channel_count: usize) -> (ConstructedProcessor, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            ConstructedProcessor {
                processor: Box::new(Probe {
                    seen: Arc::clone(&seen),
                }),
                input_channel_count,
            },
            seen,
        )
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    #[test]
    fn unknown_id_is_dropped() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.process_tick(ProcessorId(999), Some(vec![vec![1.0]])),
            TickResult::Dropped
        );
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn ids_are_dense() {
        let mut dispatcher = Dispatcher::new();
        let layout = FrameLayout::new(4, 4).unwrap();
        for expected in 0..3 {
            let (built, _) = probe(1);
            let id = dispatcher.insert("Probe", NodeId(9), built, layout, Transport::Copy);
            assert_eq!(id, ProcessorId(expected));
        }
        assert_eq!(dispatcher.next_id(), ProcessorId(3));
        assert_eq!(dispatcher.len(), 3);
    }

    #[test]
    fn copy_tick_visits_slices_in_order() {
        let mut dispatcher = Dispatcher::new();
        let layout = FrameLayout::new(32, 128).unwrap();
        let (built, seen) = probe(1);
        let id = dispatcher.insert("Probe", NodeId(2), built, layout, Transport::Copy);

        let result = dispatcher.process_tick(id, Some(vec![ramp(128), vec![0.0; 128]]));
        let TickResult::Returned { node, buf, slices } = result else {
            panic!("expected returned buffers, got {result:?}");
        };
        assert_eq!(node, NodeId(2));
        assert_eq!(slices, 4);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 32.0, 64.0, 96.0]);
        assert_eq!(buf[0], ramp(128));
        assert_eq!(buf[1][31], 0.0);
        assert_eq!(buf[1][32], 32.0);
        assert_eq!(buf[1][127], 96.0);
    }

    #[test]
    fn copy_tick_without_payload_is_dropped() {
        let mut dispatcher = Dispatcher::new();
        let (built, seen) = probe(1);
        let id = dispatcher.insert(
            "Probe",
            NodeId(1),
            built,
            FrameLayout::new(4, 4).unwrap(),
            Transport::Copy,
        );
        assert_eq!(dispatcher.process_tick(id, None), TickResult::Dropped);
        assert_eq!(
            dispatcher.process_tick(id, Some(vec![Vec::new(), vec![0.0; 4]])),
            TickResult::Dropped
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn short_copy_buffers_come_back_untouched() {
        let mut dispatcher = Dispatcher::new();
        let (built, seen) = probe(1);
        let id = dispatcher.insert(
            "Probe",
            NodeId(1),
            built,
            FrameLayout::new(32, 128).unwrap(),
            Transport::Copy,
        );
        let sent = vec![ramp(128), vec![7.0; 64]];
        let result = dispatcher.process_tick(id, Some(sent.clone()));
        assert_eq!(
            result,
            TickResult::Returned {
                node: NodeId(1),
                buf: sent,
                slices: 0
            }
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_copy_tick_writes_shared_memory() {
        let layout = FrameLayout::new(2, 6).unwrap();
        let input = SharedChannel::from_samples(&[1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        let output = SharedChannel::new(6);
        let slices = shared_slices(&layout, &[vec![input]], &[vec![output.clone()]]).unwrap();

        let mut dispatcher = Dispatcher::new();
        let (built, seen) = probe(0);
        let id = dispatcher.insert(
            "Probe",
            NodeId(5),
            built,
            layout,
            Transport::SharedMemory { slices },
        );
        assert_eq!(
            dispatcher.get(id).map(ProcessorInstance::transport),
            Some(TransportMode::Shared)
        );

        let result = dispatcher.process_tick(id, Some(vec![vec![9.0; 6]]));
        assert_eq!(result, TickResult::Rendered { slices: 3 });
        assert_eq!(*seen.lock().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(output.to_vec(), vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }
}
