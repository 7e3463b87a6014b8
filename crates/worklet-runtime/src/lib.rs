//! Worklet runtime - the processing thread and everything it owns.
//!
//! A control thread talks to one processing thread through a
//! [`ControlHandle`]. Messages create the session ([`ControlMessage::Init`]),
//! load modules ([`ControlMessage::Import`]), instantiate processors
//! ([`ControlMessage::CreateProcessor`]) and drive them one tick at a time
//! ([`ControlMessage::Process`]). The processing thread answers with
//! [`Event`]s.
//!
//! # Components
//!
//! - [`WorkletScope`] - session context: sample rate, origin, registry, instances
//! - [`Dispatcher`] - instance table and the per-tick slice loop
//! - [`LifecycleReporter`] - outbound `register` / `load` / `state` / `process` events
//! - [`ProcessingThread`] - named worker thread hosting the scope
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use worklet_config::RuntimeConfig;
//! use worklet_core::ProcessorOptions;
//! use worklet_registry::ModuleLibrary;
//! use worklet_runtime::{
//!     ControlMessage, CreateProcessorArgs, Event, LifecycleState, NodeId, ProcessingThread,
//!     ProcessorId,
//! };
//!
//! let (control, thread) =
//!     ProcessingThread::spawn(&RuntimeConfig::default(), ModuleLibrary::builtin()).unwrap();
//!
//! control.post(ControlMessage::Import { url: "modules/gain.js".into() }).unwrap();
//! control
//!     .post(ControlMessage::create(CreateProcessorArgs::copy(
//!         "Gain",
//!         NodeId(1),
//!         ProcessorOptions::new(32, 128).with_input_channels(1),
//!     )))
//!     .unwrap();
//! control
//!     .post(ControlMessage::Process {
//!         processor: ProcessorId(0),
//!         buf: Some(vec![vec![0.5; 128], vec![0.0; 128]]),
//!     })
//!     .unwrap();
//!
//! let events = control.sync(0, Duration::from_secs(5)).unwrap();
//! assert!(events.iter().any(|e| e.lifecycle_state() == Some(LifecycleState::Running)));
//! let Some(Event::Process { buf, .. }) = events.last() else { panic!() };
//! assert_eq!(buf[1], vec![0.5; 128]);
//!
//! drop(control);
//! thread.join().unwrap();
//! ```

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod reporter;
pub mod scope;
pub mod thread;

pub use dispatcher::{Dispatcher, ProcessorInstance, TickResult, Transport};
pub use error::RuntimeError;
pub use message::{
    AudioBuses, ControlMessage, CreateProcessorArgs, Event, LifecycleState, NodeId, ProcessorId,
};
pub use reporter::LifecycleReporter;
pub use scope::WorkletScope;
pub use thread::{ControlHandle, ProcessingThread};
