//! Parameter descriptors published by modules at registration time.
//!
//! Every module declares an ordered list of [`ParameterDescriptor`]s. The
//! list travels to the control thread inside the `register` notification so
//! the host can build its own parameter objects before any processor exists.
//!
//! The runtime itself never automates parameters: processors always receive
//! an empty [`ParamSet`](crate::ParamSet) from the dispatcher. Descriptors
//! exist so that the host and the processor agree on names and ranges.
//!
//! # Example
//!
//! ```rust
//! use worklet_core::{AutomationRate, ParameterDescriptor};
//!
//! let gain = ParameterDescriptor::new("gain", 1.0)
//!     .with_range(0.0, 4.0)
//!     .with_automation_rate(AutomationRate::KRate);
//!
//! assert_eq!(gain.clamp(9.0), 4.0);
//! ```

use serde::{Deserialize, Serialize};

/// How often a parameter value may change.
///
/// `ARate` parameters carry one value per sample, `KRate` parameters one value
/// per render quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomationRate {
    /// One value per sample.
    #[default]
    #[serde(rename = "a-rate")]
    ARate,
    /// One value per render quantum.
    #[serde(rename = "k-rate")]
    KRate,
}

/// Metadata for a single module parameter.
///
/// Serialized in camelCase so the payload matches what hosts expect from an
/// audio worklet parameter descriptor (`defaultValue`, `minValue`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter name, unique within a module.
    pub name: String,
    /// Value used until the host changes it.
    pub default_value: f32,
    /// Smallest accepted value.
    pub min_value: f32,
    /// Largest accepted value.
    pub max_value: f32,
    /// Update granularity.
    #[serde(default)]
    pub automation_rate: AutomationRate,
}

impl ParameterDescriptor {
    /// Create a descriptor with an unbounded range.
    pub fn new(name: impl Into<String>, default_value: f32) -> Self {
        Self {
            name: name.into(),
            default_value,
            min_value: f32::MIN,
            max_value: f32::MAX,
            automation_rate: AutomationRate::ARate,
        }
    }

    /// Set the accepted range.
    ///
    /// A reversed or NaN range is a programming error; in release builds
    /// [`clamp`](Self::clamp) still returns a value without panicking.
    pub fn with_range(mut self, min_value: f32, max_value: f32) -> Self {
        debug_assert!(
            min_value <= max_value,
            "parameter '{}' has range [{min_value}, {max_value}]",
            self.name
        );
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// Set the automation rate.
    pub fn with_automation_rate(mut self, rate: AutomationRate) -> Self {
        self.automation_rate = rate;
        self
    }

    /// Clamp a value into this descriptor's range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min_value).min(self.max_value)
    }
}
