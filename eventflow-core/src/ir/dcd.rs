//! Device Capability Descriptor (`spec.md` §6 "Device Capability
//! Descriptor", §4.5), grounded on
//! `original_source/eventflow-sal/eventflow_sal/api/dcd.py`'s
//! `DeviceCapabilityDescriptor` dataclass.

use serde::{Deserialize, Serialize};

use crate::ir::types::{Profile, TimeMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowBehavior {
    DropHead,
    DropTail,
    Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub drift_ppm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sync_method: Option<String>,
    #[serde(default)]
    pub deterministic_fixed_step_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Limits {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_neurons: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_synapses: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_fanout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_delay_us: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_delay_us: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCapabilityDescriptor {
    pub name: String,
    pub vendor: String,
    pub family: String,
    pub version: String,
    pub time_resolution_ns: u64,
    pub deterministic_modes: Vec<TimeMode>,
    pub supported_ops: Vec<String>,
    pub conformance_profiles: Vec<Profile>,
    #[serde(default)]
    pub clock: ClockInfo,
    #[serde(default)]
    pub limits: Limits,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub overflow_behavior: Option<OverflowBehavior>,
}

impl DeviceCapabilityDescriptor {
    pub fn supports_op(&self, op: &str) -> bool {
        self.supported_ops.iter().any(|o| o == op)
    }

    pub fn supports_profile(&self, profile: Profile) -> bool {
        self.conformance_profiles.contains(&profile)
    }

    pub fn supports_mode(&self, mode: TimeMode) -> bool {
        self.deterministic_modes.contains(&mode)
    }

    pub fn resolution_us(&self) -> f64 {
        self.time_resolution_ns as f64 / 1000.0
    }
}
