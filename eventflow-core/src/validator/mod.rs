//! EIR/Event-Tensor/DCD/package validator (`spec.md` §4.2, C3).
//!
//! Two layers, both accumulating: structural (required fields, enum
//! domains, numeric ranges) and semantic (duplicate ids, dangling edges,
//! `kind`↔`op` compatibility, schema version compatibility). Never mutates
//! its input, never stops at the first issue — matching the teacher's
//! `compiler::verifier::verify(graph) -> Vec<VerifyError>` shape.

use std::path::Path;

use crate::error::ValidationIssue;
use crate::ir::dcd::DeviceCapabilityDescriptor;
use crate::ir::event_tensor;
use crate::ir::graph::EirGraph;
use crate::ir::types::{Eir, NodeKind, OpParams, TimeMode};

/// Major version this validator implements. A mismatch against `Eir::version`'s
/// leading component is fatal; any other difference is accepted (the schema
/// is considered forward/backward compatible within a major version).
pub const SCHEMA_MAJOR_VERSION: &str = "1";

pub fn validate_eir(eir: &Eir) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_version(eir, &mut issues);
    validate_time_config(eir, &mut issues);
    validate_nodes(eir, &mut issues);
    validate_graph_name(eir, &mut issues);

    let (graph, graph_issues) = EirGraph::build(eir);
    issues.extend(graph_issues);
    if issues.is_empty() {
        if let Err(cycle_issue) = graph.topo_order_with_feedback() {
            issues.push(cycle_issue);
        }
    }

    validate_probes(eir, &mut issues);

    issues
}

fn validate_version(eir: &Eir, issues: &mut Vec<ValidationIssue>) {
    let major = eir.version.split('.').next().unwrap_or("");
    if major != SCHEMA_MAJOR_VERSION {
        issues.push(ValidationIssue::new(
            "/version",
            format!(
                "schema version {:?} has major version {major:?}, incompatible with validator major version {SCHEMA_MAJOR_VERSION:?}",
                eir.version
            ),
        ));
    }
}

fn validate_time_config(eir: &Eir, issues: &mut Vec<ValidationIssue>) {
    if eir.time.epsilon_time_us < 0.0 {
        issues.push(ValidationIssue::new(
            "/time/epsilon_time_us",
            "must be >= 0",
        ));
    }
    if eir.time.epsilon_numeric < 0.0 {
        issues.push(ValidationIssue::new("/time/epsilon_numeric", "must be >= 0"));
    }
    match eir.time.mode {
        TimeMode::FixedStep => match eir.time.fixed_step_dt_us {
            Some(dt) if dt > 0.0 => {}
            Some(_) => issues.push(ValidationIssue::new(
                "/time/fixed_step_dt_us",
                "must be positive when time.mode is fixed_step",
            )),
            None => issues.push(ValidationIssue::new(
                "/time/fixed_step_dt_us",
                "required when time.mode is fixed_step",
            )),
        },
        TimeMode::ExactEvent => {
            if eir.time.fixed_step_dt_us.is_some() {
                issues.push(ValidationIssue::new(
                    "/time/fixed_step_dt_us",
                    "must be absent when time.mode is exact_event",
                ));
            }
        }
    }
}

fn validate_graph_name(eir: &Eir, issues: &mut Vec<ValidationIssue>) {
    if eir.graph.name.trim().is_empty() {
        issues.push(ValidationIssue::new("/graph/name", "must be non-empty"));
    }
}

fn expected_op_kind(op: &OpParams) -> &'static str {
    op.op_name()
}

fn validate_nodes(eir: &Eir, issues: &mut Vec<ValidationIssue>) {
    for (i, node) in eir.nodes.iter().enumerate() {
        let path = format!("/nodes/{i}");
        if node.id.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{path}/id"), "must be non-empty"));
        }

        let requires_op = matches!(
            node.kind,
            NodeKind::SpikingNeuron | NodeKind::Synapse | NodeKind::DelayLine | NodeKind::Kernel
        );
        match (&node.op, requires_op) {
            (None, true) => issues.push(ValidationIssue::new(
                format!("{path}/op"),
                format!("node kind {:?} requires an op", node.kind),
            )),
            (Some(op), _) => validate_kind_op_match(&path, node.kind, op, issues),
            (None, false) => {}
        }

        if let Some(op) = &node.op {
            validate_op_params(&path, op, issues);
        }
    }
}

fn validate_kind_op_match(
    path: &str,
    kind: NodeKind,
    op: &OpParams,
    issues: &mut Vec<ValidationIssue>,
) {
    let compatible = match kind {
        NodeKind::SpikingNeuron => matches!(op, OpParams::Lif(_)),
        NodeKind::Synapse => matches!(op, OpParams::ExpSyn(_)),
        NodeKind::DelayLine => matches!(op, OpParams::Delay(_)),
        NodeKind::Kernel => matches!(
            op,
            OpParams::Fuse(_)
                | OpParams::Stft(_)
                | OpParams::Mel(_)
                | OpParams::XyToCh(_)
                | OpParams::ShiftXy(_)
        ),
        NodeKind::Group | NodeKind::Route | NodeKind::Probe | NodeKind::Custom => true,
    };
    if !compatible {
        issues.push(ValidationIssue::new(
            format!("{path}/op"),
            format!("op {:?} is not valid for node kind {:?}", expected_op_kind(op), kind),
        ));
    }
}

fn validate_op_params(path: &str, op: &OpParams, issues: &mut Vec<ValidationIssue>) {
    match op {
        OpParams::Lif(p) => {
            if p.v_th <= 0.0 {
                issues.push(ValidationIssue::new(format!("{path}/op/v_th"), "must be > 0"));
            }
        }
        OpParams::Fuse(p) => {
            if p.min_count < 1 {
                issues.push(ValidationIssue::new(
                    format!("{path}/op/min_count"),
                    "must be >= 1",
                ));
            }
        }
        OpParams::Stft(p) => {
            if p.n_fft < 2 {
                issues.push(ValidationIssue::new(format!("{path}/op/n_fft"), "must be >= 2"));
            } else if !p.n_fft.is_power_of_two() {
                issues.push(ValidationIssue::new(
                    format!("{path}/op/n_fft"),
                    "should be a power of two",
                ));
            }
            if p.sample_rate_hz <= 0.0 {
                issues.push(ValidationIssue::new(
                    format!("{path}/op/sample_rate_hz"),
                    "must be > 0",
                ));
            }
        }
        OpParams::Mel(p) => {
            if p.n_mels < 1 {
                issues.push(ValidationIssue::new(format!("{path}/op/n_mels"), "must be >= 1"));
            }
            if p.sample_rate_hz <= 0.0 {
                issues.push(ValidationIssue::new(
                    format!("{path}/op/sample_rate_hz"),
                    "must be > 0",
                ));
            }
        }
        OpParams::XyToCh(p) => {
            if p.width == 0 || p.height == 0 {
                issues.push(ValidationIssue::new(
                    format!("{path}/op"),
                    "width and height must be > 0",
                ));
            }
        }
        OpParams::ShiftXy(p) => {
            if p.width == 0 || p.height == 0 {
                issues.push(ValidationIssue::new(
                    format!("{path}/op"),
                    "width and height must be > 0",
                ));
            }
        }
        OpParams::ExpSyn(_) | OpParams::Delay(_) => {}
    }
}

fn validate_probes(eir: &Eir, issues: &mut Vec<ValidationIssue>) {
    for (i, probe) in eir.probes.iter().enumerate() {
        if !eir.nodes.iter().any(|n| n.id == probe.target_node) {
            issues.push(ValidationIssue::new(
                format!("/probes/{i}/target_node"),
                format!("unknown node id {:?}", probe.target_node),
            ));
        }
    }
}

pub fn validate_dcd(dcd: &DeviceCapabilityDescriptor) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if dcd.name.trim().is_empty() {
        issues.push(ValidationIssue::new("/name", "must be non-empty"));
    }
    if dcd.time_resolution_ns == 0 {
        issues.push(ValidationIssue::new(
            "/time_resolution_ns",
            "must be > 0",
        ));
    }
    if dcd.deterministic_modes.is_empty() {
        issues.push(ValidationIssue::new(
            "/deterministic_modes",
            "must be non-empty",
        ));
    }
    if dcd.conformance_profiles.is_empty() {
        issues.push(ValidationIssue::new(
            "/conformance_profiles",
            "must be non-empty",
        ));
    }
    issues
}

/// Streams an Event Tensor JSONL file, reporting every `idx` arity or
/// non-decreasing-`ts` violation with a line reference rather than failing
/// on the first one — unlike [`crate::ir::event_tensor::read_jsonl`], which
/// is the fail-fast path used by the runtime.
pub fn validate_event_tensor_jsonl_path(path: &Path) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            issues.push(ValidationIssue::new("/", format!("cannot read file: {e}")));
            return issues;
        }
    };
    let mut lines = contents.lines().enumerate();

    let header = match lines.find(|(_, l)| !l.trim().is_empty()) {
        Some((_, line)) => match serde_json::from_str::<serde_json::Value>(line) {
            Ok(v) => v,
            Err(e) => {
                issues.push(ValidationIssue::new("/header", format!("malformed JSON: {e}")));
                return issues;
            }
        },
        None => {
            issues.push(ValidationIssue::new("/", "file is empty"));
            return issues;
        }
    };
    let dims_len = header["header"]["dims"]
        .as_array()
        .map(|a| a.len())
        .unwrap_or_else(|| {
            issues.push(ValidationIssue::new("/header/dims", "missing or not an array"));
            0
        });

    let mut last_ts: Option<i64> = None;
    for (i, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        let record: event_tensor::Record = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                issues.push(ValidationIssue::new(
                    format!("/records/{line_no}"),
                    format!("malformed JSON: {e}"),
                ));
                continue;
            }
        };
        if record.idx.len() != dims_len {
            issues.push(ValidationIssue::new(
                format!("/records/{line_no}/idx"),
                format!("arity {} does not match header dims arity {dims_len}", record.idx.len()),
            ));
        }
        if let Some(prev) = last_ts {
            if record.ts < prev {
                issues.push(ValidationIssue::new(
                    format!("/records/{line_no}/ts"),
                    format!("{} is less than previous ts {prev}", record.ts),
                ));
            }
        }
        last_ts = Some(record.ts);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{GraphMeta, Node, Profile, TimeConfig, TimeUnitName};

    fn minimal_eir() -> Eir {
        Eir {
            version: "1.0".into(),
            profile: Profile::Base,
            seed: 0,
            time: TimeConfig {
                unit: TimeUnitName::Ns,
                mode: TimeMode::ExactEvent,
                fixed_step_dt_us: None,
                epsilon_time_us: 0.0,
                epsilon_numeric: 0.0,
            },
            graph: GraphMeta { name: "g".into() },
            nodes: vec![],
            edges: vec![],
            probes: vec![],
        }
    }

    #[test]
    fn minimal_eir_is_valid() {
        let issues = validate_eir(&minimal_eir());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn fixed_step_without_dt_is_rejected() {
        let mut eir = minimal_eir();
        eir.time.mode = TimeMode::FixedStep;
        let issues = validate_eir(&eir);
        assert!(issues.iter().any(|i| i.path.contains("fixed_step_dt_us")));
    }

    #[test]
    fn incompatible_major_version_is_rejected() {
        let mut eir = minimal_eir();
        eir.version = "2.0".into();
        let issues = validate_eir(&eir);
        assert!(issues.iter().any(|i| i.path == "/version"));
    }

    #[test]
    fn node_missing_required_op_is_rejected() {
        let mut eir = minimal_eir();
        eir.nodes.push(Node {
            id: "n1".into(),
            kind: NodeKind::SpikingNeuron,
            op: None,
            state: Default::default(),
            timing_constraints: None,
            security: None,
        });
        let issues = validate_eir(&eir);
        assert!(issues.iter().any(|i| i.path.contains("/op")));
    }
}
