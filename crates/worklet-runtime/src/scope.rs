//! The processing thread's context object.
//!
//! [`WorkletScope`] holds everything the processing thread knows about the
//! session: sample rate, origin, the module registry, the instance table, and
//! the reporter. It is created when the thread starts and dropped when it
//! exits, taking every instance with it.
//!
//! # Failure reporting
//!
//! Registration and construction failures are reported on the event channel
//! as `State { state: Error }` and *then* returned to the caller, exactly one
//! error event per failure. Tick problems are never reported.

use worklet_config::RuntimeConfig;
use worklet_core::{BusLayout, FrameLayout, ProcessorInit, RemainderPolicy, shared_slices};
use worklet_registry::{
    ModuleDescriptor, ModuleLibrary, ModuleRegistry, RegistryError, resolve_url,
};

use crate::dispatcher::{Dispatcher, ProcessorInstance, TickResult, Transport};
use crate::error::RuntimeError;
use crate::message::{ControlMessage, CreateProcessorArgs, Event, NodeId, ProcessorId};
use crate::reporter::LifecycleReporter;

/// Append `/` to a non-empty origin that lacks one.
fn normalize_origin(origin: &str) -> String {
    if origin.is_empty() || origin.ends_with('/') {
        origin.to_string()
    } else {
        format!("{origin}/")
    }
}

/// Session state owned by the processing thread.
#[derive(Debug)]
pub struct WorkletScope {
    sample_rate: f32,
    origin: String,
    remainder_policy: RemainderPolicy,
    library: ModuleLibrary,
    registry: ModuleRegistry,
    dispatcher: Dispatcher,
    reporter: LifecycleReporter,
}

impl WorkletScope {
    /// Create a scope with an empty registry and instance table.
    pub fn new(config: &RuntimeConfig, library: ModuleLibrary, reporter: LifecycleReporter) -> Self {
        Self {
            sample_rate: config.sample_rate,
            origin: normalize_origin(&config.origin),
            remainder_policy: config.remainder_policy,
            library,
            registry: ModuleRegistry::new(),
            dispatcher: Dispatcher::new(),
            reporter,
        }
    }

    /// Session sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Base URL for relative imports.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Registered modules.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Live instances.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one control message.
    pub fn handle(&mut self, message: ControlMessage) -> Result<(), RuntimeError> {
        match message {
            ControlMessage::Init {
                sample_rate,
                origin,
            } => {
                self.init(sample_rate, &origin);
                Ok(())
            }
            ControlMessage::Import { url } => self.import(&url).map(|_| ()),
            ControlMessage::CreateProcessor(args) => self.create_processor(*args).map(|_| ()),
            ControlMessage::Process { processor, buf } => {
                self.process(processor, buf);
                Ok(())
            }
            ControlMessage::Fence { token } => {
                self.reporter.emit(Event::Fence { token });
                Ok(())
            }
        }
    }

    /// Set the sample rate and origin.
    ///
    /// A non-finite or non-positive rate is ignored and the previous one kept.
    pub fn init(&mut self, sample_rate: f32, origin: &str) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        } else {
            tracing::warn!(
                "scope: ignoring sample rate {sample_rate}, keeping {} Hz",
                self.sample_rate
            );
        }
        self.origin = normalize_origin(origin);
        tracing::info!(
            "scope: session at {} Hz, origin '{}'",
            self.sample_rate,
            self.origin
        );
    }

    /// Resolve `url`, run the matching module script, and register what it
    /// defines. Acks with `Load { url }` carrying `url` as given.
    ///
    /// Returns the number of modules registered.
    pub fn import(&mut self, url: &str) -> Result<usize, RuntimeError> {
        let resolved = resolve_url(&self.origin, url);
        let Some(script) = self.library.lookup(&resolved) else {
            return Err(RuntimeError::ImportFailed {
                url: url.to_string(),
                resolved,
            });
        };

        let descriptors = script();
        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        tracing::debug!("scope: imported '{resolved}' ({count} modules)");
        self.reporter.loaded(url);
        Ok(count)
    }

    /// Bind a module and announce it.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<(), RuntimeError> {
        match self.registry.register(descriptor) {
            Ok(bound) => {
                self.reporter.registered(bound);
                Ok(())
            }
            Err(err) => {
                self.reporter.error(None);
                Err(err.into())
            }
        }
    }

    /// Construct a processor and add it to the instance table.
    ///
    /// Unregistered names fail with `NotSupported` before anything else is
    /// checked. For registered names the slice layout is fixed before the
    /// constructor runs; zero-copy instances get their slices built here, once.
    pub fn create_processor(
        &mut self,
        args: CreateProcessorArgs,
    ) -> Result<ProcessorId, RuntimeError> {
        let node = args.node;
        match self.try_create(args) {
            Ok(id) => {
                self.reporter.running(node, id);
                Ok(id)
            }
            Err(err) => {
                tracing::debug!("scope: {node} construction failed: {err}");
                self.reporter.error(Some(node));
                Err(err)
            }
        }
    }

    fn try_create(&mut self, args: CreateProcessorArgs) -> Result<ProcessorId, RuntimeError> {
        let CreateProcessorArgs {
            name,
            node,
            options,
            audio,
            has_sab,
            port,
        } = args;

        if !self.registry.contains(&name) {
            return Err(RegistryError::NotSupported(name).into());
        }

        let layout =
            FrameLayout::with_policy(options.buflen_awp, options.buflen_spn, self.remainder_policy)?;
        if layout.remainder() != 0 {
            tracing::warn!(
                "scope: {node} outer block {} is not a multiple of {}, last {} samples of every tick are left untouched",
                layout.outer_block(),
                layout.render_quantum(),
                layout.remainder()
            );
        }

        let (transport, bus_layout) = if has_sab {
            let slices = shared_slices(&layout, &audio.input, &audio.output)?;
            (
                Transport::SharedMemory { slices },
                BusLayout::new(audio.input.len(), audio.output.len()),
            )
        } else {
            (Transport::Copy, BusLayout::new(1, 1))
        };

        let init = ProcessorInit {
            options,
            sample_rate: self.sample_rate,
            port,
        };
        let constructed = self.registry.construct(&name, init, bus_layout)?;

        let id = self
            .dispatcher
            .insert(name, node, constructed, layout, transport);
        if let Some(instance) = self.dispatcher.get(id) {
            tracing::debug!(
                "scope: {id} '{}' for {node}: {} x {} samples, {:?}",
                instance.module_name(),
                instance.num_slices(),
                instance.render_quantum(),
                instance.transport()
            );
        }
        Ok(id)
    }

    /// Run one tick, posting copy-mode buffers back to their node.
    ///
    /// Returns the number of `process` calls made, or `None` if the tick was
    /// dropped.
    pub fn process(&mut self, id: ProcessorId, buf: Option<Vec<Vec<f32>>>) -> Option<usize> {
        match self.dispatcher.process_tick(id, buf) {
            TickResult::Dropped => None,
            TickResult::Rendered { slices } => Some(slices),
            TickResult::Returned { node, buf, slices } => {
                self.reporter.emit(Event::Process { buf, node });
                Some(slices)
            }
        }
    }

    /// Node of instance `id`, if it exists.
    pub fn node_of(&self, id: ProcessorId) -> Option<NodeId> {
        self.dispatcher.get(id).map(ProcessorInstance::node)
    }
}
