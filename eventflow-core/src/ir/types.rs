//! EIR typed data model (`spec.md` §3, C2).
//!
//! One Rust enum per node kind with its own strongly-typed parameter struct,
//! replacing the duck-typed dispatch the original implementation does on a
//! free-form `params` dict (`spec.md` §9 REDESIGN FLAGS).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time::TimeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Profile {
    Base,
    Realtime,
    Learning,
    Lowpower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnitName {
    Ns,
    #[serde(rename = "us")]
    Us,
    Ms,
}

impl TimeUnitName {
    pub const fn ns_per_unit(self) -> i64 {
        match self {
            TimeUnitName::Ns => 1,
            TimeUnitName::Us => 1_000,
            TimeUnitName::Ms => 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    ExactEvent,
    FixedStep,
}

/// `EIR.time`. `fixed_step_dt_us` is required iff `mode == FixedStep`; this
/// is checked by the validator (C3), not by the type itself, since schema
/// validation must report a path-qualified issue rather than panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    pub unit: TimeUnitName,
    pub mode: TimeMode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fixed_step_dt_us: Option<f64>,
    #[serde(default)]
    pub epsilon_time_us: f64,
    #[serde(default)]
    pub epsilon_numeric: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    SpikingNeuron,
    Synapse,
    DelayLine,
    Kernel,
    Group,
    Route,
    Probe,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hann,
    Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifParams {
    pub tau_m: TimeValue,
    pub v_th: f32,
    pub v_reset: f32,
    pub r_m: f32,
    #[serde(default = "zero_time")]
    pub refractory: TimeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpSynParams {
    pub tau_s: TimeValue,
    pub weight: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayParams {
    pub delay: TimeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuseParams {
    pub window: TimeValue,
    pub min_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StftParams {
    pub n_fft: usize,
    pub hop: TimeValue,
    pub sample_rate_hz: f64,
    #[serde(default = "default_window")]
    pub window: WindowKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MelParams {
    pub n_fft: usize,
    pub n_mels: usize,
    pub sample_rate_hz: f64,
    pub fmin_hz: f64,
    #[serde(default)]
    pub fmax_hz: Option<f64>,
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XyToChParams {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftXyParams {
    pub dx: i32,
    pub dy: i32,
    pub width: u32,
    pub height: u32,
}

fn zero_time() -> TimeValue {
    TimeValue::Ns(0)
}

fn default_window() -> WindowKind {
    WindowKind::Hann
}

/// Tagged union of operator parameter records, one variant per `op` name in
/// `spec.md` §3's "Operator parameter schemas". Nodes whose `kind` does not
/// name an operator (`group`, `route`, `probe`, `custom`) carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpParams {
    Lif(LifParams),
    ExpSyn(ExpSynParams),
    Delay(DelayParams),
    Fuse(FuseParams),
    Stft(StftParams),
    Mel(MelParams),
    XyToCh(XyToChParams),
    ShiftXy(ShiftXyParams),
}

impl OpParams {
    pub fn op_name(&self) -> &'static str {
        match self {
            OpParams::Lif(_) => "lif",
            OpParams::ExpSyn(_) => "exp_syn",
            OpParams::Delay(_) => "delay",
            OpParams::Fuse(_) => "fuse",
            OpParams::Stft(_) => "stft",
            OpParams::Mel(_) => "mel",
            OpParams::XyToCh(_) => "xy_to_ch",
            OpParams::ShiftXy(_) => "shift_xy",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub trusted: bool,
    /// Requested overflow policy, reconciled against the device's
    /// `overflow_behavior` by the planner (`spec.md` §4.5 step 4).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub overflow_policy: Option<crate::ir::dcd::OverflowBehavior>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingConstraints {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_latency_us: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub op: Option<OpParams>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub state: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timing_constraints: Option<TimingConstraints>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub delay_us: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plasticity: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub name: String,
    pub target_node: String,
    #[serde(default)]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMeta {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eir {
    pub version: String,
    pub profile: Profile,
    #[serde(default)]
    pub seed: u64,
    pub time: TimeConfig,
    pub graph: GraphMeta,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub probes: Vec<Probe>,
}
