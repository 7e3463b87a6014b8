//! Module registry and processor factory for the worklet runtime.
//!
//! This crate binds module names to constructors and turns a name plus host
//! options into a validated processor instance.
//!
//! # Features
//!
//! - **Registration**: Append-only name → constructor bindings, one per name
//! - **Factory**: Construct by name with the capability check applied
//! - **Parameter Info**: Descriptors published alongside each registration
//! - **Built-in Modules**: [`Gain`] and [`Bypass`], plus the [`ModuleLibrary`]
//!   that `import` resolves against
//!
//! # Example
//!
//! ```rust
//! use worklet_core::{BusLayout, MessagePort, ProcessorInit, ProcessorOptions};
//! use worklet_registry::{ModuleRegistry, RegistryError, modules};
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register(modules::gain_module()).unwrap();
//!
//! // A second registration under the same name is refused.
//! let err = registry.register(modules::gain_module()).unwrap_err();
//! assert_eq!(err, RegistryError::AlreadyRegistered("Gain".into()));
//!
//! let (_host, port) = MessagePort::pair();
//! let init = ProcessorInit {
//!     options: ProcessorOptions::new(128, 128).with_input_channels(2),
//!     sample_rate: 44100.0,
//!     port,
//! };
//! let built = registry.construct("Gain", init, BusLayout::new(1, 1)).unwrap();
//! assert_eq!(built.input_channel_count, 2);
//! ```

pub mod library;
pub mod modules;

use std::fmt;

use thiserror::Error;
use worklet_core::{
    BusLayout, ConstructError, ParameterDescriptor, Processor, ProcessorInit,
};

pub use library::{ModuleLibrary, ModuleScript, resolve_url};
pub use modules::{Bypass, Gain};

/// Errors raised by registration and construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A module with this name is already bound.
    #[error("module '{0}' is already registered")]
    AlreadyRegistered(String),

    /// No module with this name is bound.
    #[error("module '{0}' is not registered")]
    NotSupported(String),

    /// The constructor failed or its processor cannot be driven as requested.
    #[error("module '{name}' did not produce a usable processor: {reason}")]
    InvalidState {
        /// Module name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Constructor function bound to a module name.
pub type ModuleConstructor =
    Box<dyn Fn(ProcessorInit) -> Result<Box<dyn Processor>, ConstructError> + Send + Sync>;

/// A registered module: name, constructor and parameter descriptors.
///
/// Immutable once registered.
pub struct ModuleDescriptor {
    name: String,
    parameter_descriptors: Vec<ParameterDescriptor>,
    constructor: ModuleConstructor,
}

impl ModuleDescriptor {
    /// Create a descriptor with no parameters.
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(ProcessorInit) -> Result<Box<dyn Processor>, ConstructError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameter_descriptors: Vec::new(),
            constructor: Box::new(constructor),
        }
    }

    /// Attach parameter descriptors.
    pub fn with_parameters(mut self, descriptors: Vec<ParameterDescriptor>) -> Self {
        self.parameter_descriptors = descriptors;
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter descriptors, in declaration order.
    pub fn parameter_descriptors(&self) -> &[ParameterDescriptor] {
        &self.parameter_descriptors
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("parameter_descriptors", &self.parameter_descriptors)
            .finish_non_exhaustive()
    }
}

/// A processor that passed construction, with the configuration it was built for.
pub struct ConstructedProcessor {
    /// The validated processor.
    pub processor: Box<dyn Processor>,
    /// First entry of the options' `input_channel_count` (0 when absent).
    pub input_channel_count: usize,
}

impl fmt::Debug for ConstructedProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructedProcessor")
            .field("input_channel_count", &self.input_channel_count)
            .finish_non_exhaustive()
    }
}

/// Registry of modules available in a session.
///
/// Append-only: there is no way to unregister a module.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind a module under its name.
    ///
    /// Fails with [`RegistryError::AlreadyRegistered`] if the name is taken;
    /// the existing binding is left untouched.
    pub fn register(
        &mut self,
        descriptor: ModuleDescriptor,
    ) -> Result<&ModuleDescriptor, RegistryError> {
        if self.contains(descriptor.name()) {
            return Err(RegistryError::AlreadyRegistered(descriptor.name));
        }
        tracing::debug!(
            "registry: bound '{}' ({} params)",
            descriptor.name,
            descriptor.parameter_descriptors.len()
        );
        self.entries.push(descriptor);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Get a module by name.
    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns true if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Instantiate a module by name.
    ///
    /// Runs the bound constructor, then checks that the processor accepts
    /// `layout`. Returns [`RegistryError::NotSupported`] for unknown names and
    /// [`RegistryError::InvalidState`] when the constructor fails or the
    /// capability check does not pass.
    pub fn construct(
        &self,
        name: &str,
        init: ProcessorInit,
        layout: BusLayout,
    ) -> Result<ConstructedProcessor, RegistryError> {
        let entry = self
            .get(name)
            .ok_or_else(|| RegistryError::NotSupported(name.to_string()))?;

        let input_channel_count = init.options.input_channels();
        let processor = (entry.constructor)(init).map_err(|e| RegistryError::InvalidState {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let arity = processor.arity();
        if !arity.accepts(layout) {
            return Err(RegistryError::InvalidState {
                name: name.to_string(),
                reason: format!(
                    "processor accepts {arity:?} but would be driven with {} input / {} output buses",
                    layout.inputs, layout.outputs
                ),
            });
        }

        Ok(ConstructedProcessor {
            processor,
            input_channel_count,
        })
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
