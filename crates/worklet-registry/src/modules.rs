//! Built-in modules.
//!
//! Two deliberately trivial processors, enough to exercise the runtime end to
//! end without any real DSP:
//!
//! - [`Gain`] scales every input channel into the matching output channel.
//! - [`Bypass`] copies its single input bus to its single output bus.

use serde_json::Value;
use worklet_core::{
    AutomationRate, Bus, BusArity, MessagePort, ParamSet, ParameterDescriptor, Processor,
    ProcessorInit,
};

use crate::ModuleDescriptor;

/// Minimum gain factor.
pub const GAIN_MIN: f32 = 0.0;

/// Maximum gain factor.
pub const GAIN_MAX: f32 = 4.0;

/// Copy `src` into `dst` channel by channel, scaling by `gain`.
///
/// Extra channels on either side are left alone.
#[inline]
fn copy_scaled(src: &Bus<'_>, dst: &mut Bus<'_>, gain: f32) {
    for (inp, out) in src.iter().zip(dst.iter_mut()) {
        let n = inp.len().min(out.len());
        for i in 0..n {
            out.set(i, inp.get(i) * gain);
        }
    }
}

/// Linear gain stage.
///
/// The gain comes from, in order of precedence: a `gain` entry in the
/// per-slice [`ParamSet`], the last `{"gain": x}` message received on the
/// instance port, or `processorOptions.gain` at construction (default 1.0).
/// Accepts any bus layout; bus `n` feeds bus `n`.
#[derive(Debug)]
pub struct Gain {
    gain: f32,
    port: MessagePort,
}

impl Gain {
    /// Parameter descriptor for the `gain` parameter.
    pub fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new("gain", 1.0)
            .with_range(GAIN_MIN, GAIN_MAX)
            .with_automation_rate(AutomationRate::KRate)
    }

    /// Build from constructor input.
    pub fn new(init: ProcessorInit) -> Self {
        let gain = read_gain(&init.options.processor_options).unwrap_or(1.0);
        Self {
            gain,
            port: init.port,
        }
    }

    /// Current gain factor.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn drain_port(&mut self) {
        while let Some(msg) = self.port.try_recv() {
            if let Some(gain) = read_gain(&msg) {
                self.gain = gain;
            }
        }
    }
}

fn read_gain(value: &Value) -> Option<f32> {
    value
        .get("gain")
        .and_then(Value::as_f64)
        .map(|g| (g as f32).clamp(GAIN_MIN, GAIN_MAX))
}

impl Processor for Gain {
    fn process(&mut self, inputs: &[Bus<'_>], outputs: &mut [Bus<'_>], params: &ParamSet) {
        self.drain_port();
        let gain = params
            .get("gain")
            .and_then(|v| v.first())
            .map_or(self.gain, |g| g.clamp(GAIN_MIN, GAIN_MAX));

        for (src, dst) in inputs.iter().zip(outputs.iter_mut()) {
            copy_scaled(src, dst, gain);
        }
    }
}

/// Unity copy from one input bus to one output bus.
#[derive(Debug, Default)]
pub struct Bypass;

impl Processor for Bypass {
    fn process(&mut self, inputs: &[Bus<'_>], outputs: &mut [Bus<'_>], _params: &ParamSet) {
        copy_scaled(&inputs[0], &mut outputs[0], 1.0);
    }

    fn arity(&self) -> BusArity {
        BusArity::exact(1, 1)
    }
}

/// Registration entry for [`Gain`], named `"Gain"`.
pub fn gain_module() -> ModuleDescriptor {
    ModuleDescriptor::new("Gain", |init| {
        Ok(Box::new(Gain::new(init)) as Box<dyn Processor>)
    })
    .with_parameters(vec![Gain::descriptor()])
}

/// Registration entry for [`Bypass`], named `"Bypass"`.
pub fn bypass_module() -> ModuleDescriptor {
    ModuleDescriptor::new("Bypass", |_| Ok(Box::new(Bypass) as Box<dyn Processor>))
}
