//! The processing capability every module instance must provide.
//!
//! A module's constructor returns a `Box<dyn Processor>`. The only thing the
//! dispatcher ever asks of it is [`Processor::process`], called once per
//! slice with that slice's input and output buses.
//!
//! ## Capability check
//!
//! Whether an object *can* process is settled by the type system. What is
//! left to check at construction time is whether it can process the bus
//! layout it is about to be driven with. A processor declares that through
//! [`Processor::arity`]; the factory compares it against the [`BusLayout`] and
//! rejects the instance before it ever sees a tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::Bus;
use crate::port::MessagePort;

static EMPTY_PARAMS: ParamSet = ParamSet::new();

/// Per-slice parameter values, keyed by parameter name.
///
/// The dispatcher always passes [`ParamSet::empty`]: automation curves are a
/// host concern. Processors fall back to their own state when a name is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: BTreeMap<String, Vec<f32>>,
}

impl ParamSet {
    /// The empty set handed to every processor by the dispatcher.
    pub fn empty() -> &'static ParamSet {
        &EMPTY_PARAMS
    }

    /// Create an empty set.
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Insert values for a parameter, replacing any previous ones.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.values.insert(name.into(), values);
    }

    /// Values for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Number of input and output buses a processor is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusLayout {
    /// Input bus count.
    pub inputs: usize,
    /// Output bus count.
    pub outputs: usize,
}

impl BusLayout {
    /// Create a layout.
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

/// Bus counts a processor accepts. `None` accepts any count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusArity {
    /// Required input bus count.
    pub inputs: Option<usize>,
    /// Required output bus count.
    pub outputs: Option<usize>,
}

impl BusArity {
    /// Accepts every layout.
    pub const ANY: Self = Self {
        inputs: None,
        outputs: None,
    };

    /// Accepts exactly `inputs` input buses and `outputs` output buses.
    pub const fn exact(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs: Some(inputs),
            outputs: Some(outputs),
        }
    }

    /// Returns true if `layout` satisfies this arity.
    pub fn accepts(&self, layout: BusLayout) -> bool {
        self.inputs.is_none_or(|n| n == layout.inputs)
            && self.outputs.is_none_or(|n| n == layout.outputs)
    }
}

/// Real-time processing capability.
///
/// Implementations must not block, perform I/O, or allocate inside
/// [`process`](Self::process): it runs inside the processing thread's tick
/// deadline.
pub trait Processor: Send {
    /// Render one slice.
    ///
    /// Every view in `inputs` and `outputs` has the processor's render quantum
    /// length. Results are written into `outputs` in place.
    fn process(&mut self, inputs: &[Bus<'_>], outputs: &mut [Bus<'_>], params: &ParamSet);

    /// Bus layouts this processor can be driven with. Defaults to any.
    fn arity(&self) -> BusArity {
        BusArity::ANY
    }
}

/// Options supplied by the host when it asks for a processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorOptions {
    /// Render quantum: samples per `process` call.
    #[serde(rename = "buflenAWP")]
    pub buflen_awp: usize,
    /// Outer block: samples per processing tick.
    #[serde(rename = "buflenSPN")]
    pub buflen_spn: usize,
    /// Input channel counts per input bus; only the first entry is used.
    #[serde(default)]
    pub input_channel_count: Vec<usize>,
    /// Module-specific configuration, opaque to the runtime.
    #[serde(default)]
    pub processor_options: serde_json::Value,
}

impl ProcessorOptions {
    /// Options with the given render quantum and outer block length.
    pub fn new(render_quantum: usize, outer_block: usize) -> Self {
        Self {
            buflen_awp: render_quantum,
            buflen_spn: outer_block,
            input_channel_count: Vec::new(),
            processor_options: serde_json::Value::Null,
        }
    }

    /// Set the input channel count.
    pub fn with_input_channels(mut self, count: usize) -> Self {
        self.input_channel_count = vec![count];
        self
    }

    /// Set module-specific configuration.
    pub fn with_processor_options(mut self, value: serde_json::Value) -> Self {
        self.processor_options = value;
        self
    }

    /// First input channel count, or 0 when none was given.
    pub fn input_channels(&self) -> usize {
        self.input_channel_count.first().copied().unwrap_or(0)
    }
}

/// Everything a module constructor receives.
#[derive(Debug)]
pub struct ProcessorInit {
    /// Host-supplied options.
    pub options: ProcessorOptions,
    /// Session sample rate in Hz.
    pub sample_rate: f32,
    /// This instance's private port to the host.
    pub port: MessagePort,
}

/// A module constructor refused to build an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConstructError(pub String);

impl ConstructError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_param_set() {
        assert!(ParamSet::empty().is_empty());
        assert_eq!(ParamSet::empty().get("gain"), None);
    }

    #[test]
    fn param_set_insert_and_get() {
        let mut params = ParamSet::new();
        params.insert("gain", vec![0.5]);
        assert_eq!(params.get("gain"), Some(&[0.5][..]));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn any_arity_accepts_everything() {
        assert!(BusArity::ANY.accepts(BusLayout::new(0, 0)));
        assert!(BusArity::ANY.accepts(BusLayout::new(3, 7)));
    }

    #[test]
    fn exact_arity_rejects_mismatch() {
        let arity = BusArity::exact(1, 1);
        assert!(arity.accepts(BusLayout::new(1, 1)));
        assert!(!arity.accepts(BusLayout::new(0, 1)));
        assert!(!arity.accepts(BusLayout::new(1, 2)));
    }

    #[test]
    fn options_deserialize_from_host_payload() {
        let json = r#"{"buflenAWP":32,"buflenSPN":128,"inputChannelCount":[2,1]}"#;
        let opts: ProcessorOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.buflen_awp, 32);
        assert_eq!(opts.buflen_spn, 128);
        assert_eq!(opts.input_channels(), 2);
        assert!(opts.processor_options.is_null());
    }

    #[test]
    fn missing_input_channel_count_is_zero() {
        let opts = ProcessorOptions::new(128, 128);
        assert_eq!(opts.input_channels(), 0);
    }
}
