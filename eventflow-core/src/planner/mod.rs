//! Capability negotiator / planner (`spec.md` §4.5, C7).
//!
//! Grounded on `original_source/eventflow-backends/cpu_sim/executor.py::plan_cpu_sim`:
//! profile check first (fatal), then time-mode/quantization, then per-node
//! operator support, then overflow-policy substitution, finally plan
//! assembly. The planner never runs the graph — it only shapes it
//! (`spec.md` §4.5 closing line).

use serde::{Deserialize, Serialize};

use crate::error::{EventFlowError, PlannerError};
use crate::ir::dcd::{DeviceCapabilityDescriptor, OverflowBehavior};
use crate::ir::types::{Eir, NodeKind, Profile, TimeMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    Fixed,
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub id: String,
    pub nodes: Vec<String>,
    pub emulated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub partition_id: String,
    pub policy: SchedulePolicy,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dt_us: Option<i64>,
    pub priority: i32,
    pub affinity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatedNode {
    pub id: String,
    pub kind: NodeKind,
    pub op: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub device_name: String,
    pub device_version: String,
    pub supported_ops: Vec<String>,
    pub deterministic_modes: Vec<TimeMode>,
    pub conformance_profiles: Vec<Profile>,
    pub emulated_nodes: Vec<EmulatedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeNegotiation {
    pub device_resolution_ns: u64,
    pub resolution_us: f64,
    pub mode: TimeMode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dt_us_requested: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dt_us_selected: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quantization_error_us: Option<f64>,
    pub meets_epsilon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Match,
    Substitute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNegotiation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub requested: Option<OverflowBehavior>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub device: Option<OverflowBehavior>,
    pub action: PolicyAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsNegotiation {
    pub total_nodes: usize,
    pub unsupported_ops: Vec<String>,
    pub emulated_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationReport {
    pub time: TimeNegotiation,
    pub profile_supported: bool,
    pub ops: OpsNegotiation,
    pub policy: PolicyNegotiation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epsilons {
    pub time_us: f64,
    pub numeric: f64,
}

/// The planner's output: partitions, schedule, capability summary,
/// warnings, and a negotiation report — never an executable artifact,
/// only a shaped description the runtime façade (C10) consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub backend_name: String,
    pub backend_version: String,
    pub graph_name: String,
    pub profile: Profile,
    pub seed: u64,
    pub partitions: Vec<Partition>,
    pub schedule: Vec<ScheduleEntry>,
    pub epsilons: Epsilons,
    pub warnings: Vec<String>,
    pub capabilities: Capabilities,
    pub negotiation: NegotiationReport,
}

impl Plan {
    pub fn dt_us(&self) -> Option<i64> {
        self.schedule.first().and_then(|s| s.dt_us)
    }

    pub fn any_emulated(&self) -> bool {
        self.partitions.iter().any(|p| p.emulated)
    }
}

/// Runs the five-step negotiation algorithm of `spec.md` §4.5 against a
/// concrete device. `backend_name`/`backend_version` identify the backend
/// running the plan (e.g. `"cpu-sim"`), not the device itself.
pub fn plan(
    eir: &Eir,
    dcd: &DeviceCapabilityDescriptor,
    backend_name: &str,
) -> Result<Plan, EventFlowError> {
    let mut warnings = Vec::new();

    // Step 1: profile compatibility (fatal).
    let profile_supported = dcd.supports_profile(eir.profile);
    if !profile_supported {
        return Err(PlannerError::UnsupportedProfile {
            profile: format!("{:?}", eir.profile),
        }
        .into());
    }

    // Step 2: time mode / quantization.
    let mode = eir.time.mode;
    let resolution_us = dcd.resolution_us();
    let mode_unsupported =
        !dcd.supports_mode(mode) || (mode == TimeMode::ExactEvent && dcd.clock.deterministic_fixed_step_only);
    if mode_unsupported {
        warnings.push(format!(
            "backend does not support time.mode={mode:?} deterministically; will emulate"
        ));
    }

    let (time_neg, dt_us_final) = match mode {
        TimeMode::FixedStep => {
            let dt_req = eir.time.fixed_step_dt_us.ok_or_else(|| PlannerError::TimeConfigInvalid {
                detail: "fixed_step requires fixed_step_dt_us".into(),
            })?;
            if dt_req <= 0.0 {
                return Err(PlannerError::TimeConfigInvalid {
                    detail: "fixed_step_dt_us must be positive".into(),
                }
                .into());
            }
            let q = if resolution_us > 0.0 {
                (dt_req / resolution_us).round().max(1.0)
            } else {
                1.0
            };
            let dt_us_sel = q * resolution_us;
            let quant_err = (dt_us_sel - dt_req).abs();
            let meets = quant_err <= eir.time.epsilon_time_us;
            if !meets {
                return Err(PlannerError::TimeQuantizationViolation {
                    detail: format!(
                        "fixed_step dt quantization error {quant_err}us exceeds epsilon_time_us {}us",
                        eir.time.epsilon_time_us
                    ),
                }
                .into());
            }
            let dt_selected = dt_us_sel.round() as i64;
            (
                TimeNegotiation {
                    device_resolution_ns: dcd.time_resolution_ns,
                    resolution_us,
                    mode,
                    dt_us_requested: Some(dt_req),
                    dt_us_selected: Some(dt_selected),
                    quantization_error_us: Some(quant_err),
                    meets_epsilon: meets,
                },
                Some(dt_selected),
            )
        }
        TimeMode::ExactEvent => {
            let worst_case = resolution_us / 2.0;
            let meets = worst_case <= eir.time.epsilon_time_us;
            if !meets {
                return Err(PlannerError::TimeQuantizationViolation {
                    detail: format!(
                        "exact_event worst-case quantization {worst_case}us exceeds epsilon_time_us {}us",
                        eir.time.epsilon_time_us
                    ),
                }
                .into());
            }
            (
                TimeNegotiation {
                    device_resolution_ns: dcd.time_resolution_ns,
                    resolution_us,
                    mode,
                    dt_us_requested: None,
                    dt_us_selected: None,
                    quantization_error_us: None,
                    meets_epsilon: meets,
                },
                None,
            )
        }
    };

    // Step 3: per-node operator support.
    let mut emulated_nodes = Vec::new();
    for node in &eir.nodes {
        if let Some(op) = &node.op {
            let op_name = op.op_name();
            if !dcd.supports_op(op_name) {
                emulated_nodes.push(EmulatedNode {
                    id: node.id.clone(),
                    kind: node.kind,
                    op: op_name.to_string(),
                });
            }
        }
    }
    let mut unsupported_ops: Vec<String> = emulated_nodes.iter().map(|n| n.op.clone()).collect();
    unsupported_ops.sort();
    unsupported_ops.dedup();

    // Step 4: overflow policy substitution.
    let requested_policy = eir.nodes.iter().find_map(|n| {
        n.security.as_ref().and_then(|s| s.overflow_policy)
    });
    let policy = match (requested_policy, dcd.overflow_behavior) {
        (Some(req), Some(dev)) if req != dev => {
            warnings.push(format!(
                "overflow policy {req:?} not supported; substituting {dev:?}"
            ));
            PolicyNegotiation {
                requested: Some(req),
                device: Some(dev),
                action: PolicyAction::Substitute,
            }
        }
        _ => PolicyNegotiation {
            requested: requested_policy,
            device: dcd.overflow_behavior,
            action: PolicyAction::Match,
        },
    };

    let any_emulated = !emulated_nodes.is_empty() || mode_unsupported;
    let node_ids: Vec<String> = eir.nodes.iter().map(|n| n.id.clone()).collect();

    Ok(Plan {
        backend_name: backend_name.to_string(),
        backend_version: dcd.version.clone(),
        graph_name: eir.graph.name.clone(),
        profile: eir.profile,
        seed: eir.seed,
        partitions: vec![Partition {
            id: "p0".to_string(),
            nodes: node_ids,
            emulated: any_emulated,
        }],
        schedule: vec![ScheduleEntry {
            partition_id: "p0".to_string(),
            policy: match mode {
                TimeMode::FixedStep => SchedulePolicy::Fixed,
                TimeMode::ExactEvent => SchedulePolicy::Event,
            },
            dt_us: dt_us_final,
            priority: 0,
            affinity: 0,
        }],
        epsilons: Epsilons {
            time_us: eir.time.epsilon_time_us,
            numeric: eir.time.epsilon_numeric,
        },
        warnings,
        capabilities: Capabilities {
            device_name: dcd.name.clone(),
            device_version: dcd.version.clone(),
            supported_ops: dcd.supported_ops.clone(),
            deterministic_modes: dcd.deterministic_modes.clone(),
            conformance_profiles: dcd.conformance_profiles.clone(),
            emulated_nodes,
        },
        negotiation: NegotiationReport {
            time: time_neg,
            profile_supported,
            ops: OpsNegotiation {
                total_nodes: eir.nodes.len(),
                unsupported_ops,
                emulated_count: eir
                    .nodes
                    .iter()
                    .filter(|n| {
                        n.op.as_ref()
                            .map(|op| !dcd.supports_op(op.op_name()))
                            .unwrap_or(false)
                    })
                    .count(),
            },
            policy,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{GraphMeta, TimeConfig, TimeUnitName};

    fn minimal_eir(mode: TimeMode, dt_us: Option<f64>, eps_time_us: f64) -> Eir {
        Eir {
            version: "1.0".into(),
            profile: Profile::Base,
            seed: 0,
            time: TimeConfig {
                unit: TimeUnitName::Us,
                mode,
                fixed_step_dt_us: dt_us,
                epsilon_time_us: eps_time_us,
                epsilon_numeric: 0.0,
            },
            graph: GraphMeta { name: "g".into() },
            nodes: vec![],
            edges: vec![],
            probes: vec![],
        }
    }

    fn minimal_dcd(resolution_ns: u64) -> DeviceCapabilityDescriptor {
        DeviceCapabilityDescriptor {
            name: "sim".into(),
            vendor: "acme".into(),
            family: "cpu".into(),
            version: "0.1.0".into(),
            time_resolution_ns: resolution_ns,
            deterministic_modes: vec![TimeMode::ExactEvent, TimeMode::FixedStep],
            supported_ops: vec![],
            conformance_profiles: vec![Profile::Base],
            clock: Default::default(),
            limits: Default::default(),
            overflow_behavior: None,
        }
    }

    #[test]
    fn rejects_unsupported_profile() {
        let mut eir = minimal_eir(TimeMode::ExactEvent, None, 1.0);
        eir.profile = Profile::Realtime;
        let dcd = minimal_dcd(1_000);
        let err = plan(&eir, &dcd, "cpu-sim").unwrap_err();
        assert_eq!(err.code(), "backend.unsupported_profile");
    }

    #[test]
    fn fixed_step_quantization_violation() {
        // spec.md §8 scenario 6.
        let eir = minimal_eir(TimeMode::FixedStep, Some(100.0), 0.0);
        let dcd = minimal_dcd(1_500);
        let err = plan(&eir, &dcd, "cpu-sim").unwrap_err();
        assert_eq!(err.code(), "backend.time_quantization_violation");
    }

    #[test]
    fn fixed_step_within_epsilon_selects_quantized_dt() {
        let eir = minimal_eir(TimeMode::FixedStep, Some(1000.0), 50.0);
        let dcd = minimal_dcd(1_000);
        let p = plan(&eir, &dcd, "cpu-sim").unwrap();
        assert_eq!(p.dt_us(), Some(1000));
    }

    #[test]
    fn exact_event_on_fixed_only_device_emulates_with_warning() {
        let eir = minimal_eir(TimeMode::ExactEvent, None, 1.0);
        let mut dcd = minimal_dcd(1);
        dcd.clock.deterministic_fixed_step_only = true;
        let p = plan(&eir, &dcd, "cpu-sim").unwrap();
        assert!(p.any_emulated());
        assert!(!p.warnings.is_empty());
    }
}
