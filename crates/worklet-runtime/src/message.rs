//! Control-thread ↔ processing-thread protocol.
//!
//! Inbound traffic is [`ControlMessage`]: it carries live resources (shared
//! channels, message ports, owned buffers) and therefore never leaves the
//! process. Outbound traffic is [`Event`], which is plain data and serializes
//! to the same JSON shape a browser host would see:
//!
//! ```json
//! {"type":"register","name":"Gain","descriptor":[{"name":"gain", ...}]}
//! {"type":"load","url":"modules/gain.js"}
//! {"type":"state","node":1,"processor":0,"state":"running"}
//! {"type":"process","buf":[[0.0, ...]],"node":1}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use worklet_core::{MessagePort, ParameterDescriptor, ProcessorOptions, SharedChannel};

/// Host-side identifier of the node a processor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Index of a processor instance in the instance table.
///
/// Dense, assigned in creation order starting at 0, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorId(pub usize);

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc#{}", self.0)
    }
}

/// Shared-memory buses for a zero-copy processor.
///
/// `input[b][c]` is channel `c` of input bus `b`. Ignored in copy mode.
#[derive(Debug, Clone, Default)]
pub struct AudioBuses {
    /// Input buses.
    pub input: Vec<Vec<SharedChannel>>,
    /// Output buses.
    pub output: Vec<Vec<SharedChannel>>,
}

impl AudioBuses {
    /// One input bus and one output bus of `channels` channels each, every
    /// channel `len` samples long.
    pub fn io_pair(channels: usize, len: usize) -> Self {
        let bus = || -> Vec<SharedChannel> {
            (0..channels).map(|_| SharedChannel::new(len)).collect()
        };
        Self {
            input: vec![bus()],
            output: vec![bus()],
        }
    }
}

/// Arguments of a `createProcessor` request.
#[derive(Debug)]
pub struct CreateProcessorArgs {
    /// Registered module name.
    pub name: String,
    /// Host node the instance belongs to.
    pub node: NodeId,
    /// Render quantum, outer block, channel counts, module options.
    pub options: ProcessorOptions,
    /// Shared buses (zero-copy only).
    pub audio: AudioBuses,
    /// Selects the zero-copy transport.
    pub has_sab: bool,
    /// Processor end of the instance's private port.
    pub port: MessagePort,
}

impl CreateProcessorArgs {
    /// Copy-mode request with no shared buses.
    pub fn copy(name: impl Into<String>, node: NodeId, options: ProcessorOptions) -> Self {
        let (_host, port) = MessagePort::pair();
        Self {
            name: name.into(),
            node,
            options,
            audio: AudioBuses::default(),
            has_sab: false,
            port,
        }
    }

    /// Zero-copy request over `audio`.
    pub fn shared(
        name: impl Into<String>,
        node: NodeId,
        options: ProcessorOptions,
        audio: AudioBuses,
    ) -> Self {
        let (_host, port) = MessagePort::pair();
        Self {
            name: name.into(),
            node,
            options,
            audio,
            has_sab: true,
            port,
        }
    }

    /// Replace the instance port.
    pub fn with_port(mut self, port: MessagePort) -> Self {
        self.port = port;
        self
    }
}

/// Messages from the control thread, handled strictly in arrival order.
#[derive(Debug)]
pub enum ControlMessage {
    /// Set the session sample rate and base URL.
    Init {
        /// Sample rate in Hz.
        sample_rate: f32,
        /// Base URL for relative imports.
        origin: String,
    },
    /// Load a module script and register what it defines.
    Import {
        /// Script URL, relative to the origin unless it starts with `http`.
        url: String,
    },
    /// Instantiate a registered module.
    CreateProcessor(Box<CreateProcessorArgs>),
    /// Run one tick on a processor.
    Process {
        /// Target instance.
        processor: ProcessorId,
        /// Transferred buffers (copy mode only).
        buf: Option<Vec<Vec<f32>>>,
    },
    /// Echo `token` back once every earlier message has been handled.
    Fence {
        /// Opaque token returned in [`Event::Fence`].
        token: u64,
    },
}

impl ControlMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Init { .. } => "init",
            ControlMessage::Import { .. } => "import",
            ControlMessage::CreateProcessor(_) => "createProcessor",
            ControlMessage::Process { .. } => "process",
            ControlMessage::Fence { .. } => "fence",
        }
    }

    /// Shorthand for a `createProcessor` message.
    pub fn create(args: CreateProcessorArgs) -> Self {
        ControlMessage::CreateProcessor(Box::new(args))
    }
}

/// Lifecycle state carried by [`Event::State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// A module was bound in the registry.
    Registered,
    /// A processor instance is ready for ticks.
    Running,
    /// Registration or construction failed.
    Error,
}

/// Notifications from the processing thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A module was registered.
    Register {
        /// Module name.
        name: String,
        /// Its parameter descriptors.
        descriptor: Vec<ParameterDescriptor>,
    },
    /// An import finished; `url` is the url as requested.
    Load {
        /// Requested url.
        url: String,
    },
    /// Instance lifecycle change.
    State {
        /// Node concerned, if any.
        node: Option<NodeId>,
        /// Instance id, present once one was assigned.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        processor: Option<ProcessorId>,
        /// New state.
        state: LifecycleState,
    },
    /// Copy-mode buffers returned after a tick.
    Process {
        /// The transferred buffers, processed in place.
        buf: Vec<Vec<f32>>,
        /// Node that owns them.
        node: NodeId,
    },
    /// Reply to [`ControlMessage::Fence`].
    Fence {
        /// Token from the request.
        token: u64,
    },
}

impl Event {
    /// Lifecycle state this event reports, if it is a lifecycle notification.
    pub fn lifecycle_state(&self) -> Option<LifecycleState> {
        match self {
            Event::Register { .. } => Some(LifecycleState::Registered),
            Event::State { state, .. } => Some(*state),
            _ => None,
        }
    }
}
