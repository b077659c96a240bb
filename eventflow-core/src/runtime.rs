//! Runtime façade (`spec.md` §4 C10, §2 "Runtime façade"): load an EIR,
//! select a backend, run it, and return a report.
//!
//! Grounded on `bpmn-lite-core::engine::BpmnLiteEngine`, the teacher's
//! top-level facade that "wires together the compiler, VM, and store" —
//! here the equivalents are the validator/planner, the scheduler, and the
//! Event Tensor writer. The backend lookup is a static registry (REDESIGN
//! FLAGS "dynamic module loading / plugin discovery → static registry"):
//! an explicit name→function mapping populated at compile time, not a
//! runtime plugin loader.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::error::{ConfigError, EventFlowError, IoError, PlannerError};
use crate::event::Event;
use crate::ir::dcd::DeviceCapabilityDescriptor;
use crate::ir::event_tensor::{write_jsonl, Dtype, Header, Layout, Record, Units};
use crate::ir::types::Eir;
use crate::planner::{self, Plan, SchedulePolicy};
use crate::scheduler::build::{build_exec_order, ExecPlan};
use crate::scheduler::event_mode::run_event_mode;
use crate::scheduler::fixed_step::run_fixed_step;

pub type BackendFn = fn(
    &ExecPlan,
    &BTreeMap<String, Vec<Event>>,
    &Plan,
    Option<&CancellationToken>,
) -> Result<BTreeMap<String, Vec<Event>>, EventFlowError>;

/// One entry in the static backend registry: a name plus the function that
/// runs an already-built exec plan under a negotiated schedule.
pub struct BackendEntry {
    pub name: &'static str,
    pub run: BackendFn,
}

fn run_cpu_sim(
    exec_plan: &ExecPlan,
    inputs: &BTreeMap<String, Vec<Event>>,
    negotiated: &Plan,
    cancel: Option<&CancellationToken>,
) -> Result<BTreeMap<String, Vec<Event>>, EventFlowError> {
    match negotiated.schedule.first().map(|s| s.policy) {
        Some(SchedulePolicy::Fixed) => {
            let dt_us = negotiated.dt_us().ok_or_else(|| {
                EventFlowError::Planner(PlannerError::TimeConfigInvalid {
                    detail: "fixed schedule is missing dt_us".to_string(),
                })
            })?;
            run_fixed_step(exec_plan, inputs, dt_us * 1_000, cancel)
        }
        _ => run_event_mode(exec_plan, inputs, cancel),
    }
}

/// The one backend this core ships. Additional deterministic backends
/// register here at compile time by adding a `BackendEntry` — never by
/// loading a shared object at runtime.
pub const BACKENDS: &[BackendEntry] = &[BackendEntry {
    name: "cpu-sim",
    run: run_cpu_sim,
}];

pub fn select_backend(name: &str) -> Result<&'static BackendEntry, EventFlowError> {
    BACKENDS
        .iter()
        .find(|b| b.name == name)
        .ok_or_else(|| ConfigError::UnknownBackend(name.to_string()).into())
}

/// Reads and parses an EIR JSON document. Callers that need accumulated
/// issues rather than a fail-fast parse error should run
/// [`crate::validator::validate_eir`] on the result.
pub fn load_eir(path: &Path) -> Result<Eir, EventFlowError> {
    let path_str = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|source| IoError::Json { path: path_str, source }.into())
}

/// Reads and parses a Device Capability Descriptor JSON document.
pub fn load_dcd(path: &Path) -> Result<DeviceCapabilityDescriptor, EventFlowError> {
    let path_str = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|source| IoError::Json { path: path_str, source }.into())
}

/// Negotiates a plan (C7) for `eir` against `dcd` on the named backend.
/// The planner never runs the graph — it only shapes it (`spec.md` §4.5).
pub fn build(eir: &Eir, dcd: &DeviceCapabilityDescriptor, backend_name: &str) -> Result<Plan, EventFlowError> {
    select_backend(backend_name)?;
    planner::plan(eir, dcd, backend_name)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: String,
    pub trace_path: String,
    pub count: usize,
}

/// Runs `eir` under a plan already negotiated for it, writing the merged,
/// canonically ordered (`spec.md` §3 "Order across a stream") output of
/// every probed node to `trace_out` as an Event Tensor JSONL trace. With
/// no declared probes, every node is traced. Returns the `{status,
/// trace_path, count}` report the `run` CLI command surfaces (`spec.md`
/// §6).
pub fn run(
    eir: &Eir,
    negotiated: &Plan,
    external_inputs: &BTreeMap<String, Vec<Event>>,
    trace_out: &Path,
    cancel: Option<&CancellationToken>,
) -> Result<RunReport, EventFlowError> {
    let backend = select_backend(&negotiated.backend_name)?;
    let exec_plan = build_exec_order(eir)?;
    let outputs = (backend.run)(&exec_plan, external_inputs, negotiated, cancel)?;

    let traced_ids: Vec<&str> = if eir.probes.is_empty() {
        outputs.keys().map(|s| s.as_str()).collect()
    } else {
        eir.probes.iter().map(|p| p.target_node.as_str()).collect()
    };

    let mut records: Vec<Record> = Vec::new();
    for node_id in traced_ids {
        if let Some(events) = outputs.get(node_id) {
            records.extend(events.iter().map(|e| Record {
                ts: e.t,
                idx: vec![e.c],
                val: e.v,
                meta: None,
            }));
        }
    }
    // Canonical order: (t, idx_lex), stable on ties (`spec.md` §3).
    records.sort_by(|a, b| (a.ts, &a.idx).cmp(&(b.ts, &b.idx)));

    let header = Header {
        schema_version: "1.0".to_string(),
        dims: vec!["c".to_string()],
        units: Units {
            time: eir.time.unit,
            value: "dimensionless".to_string(),
        },
        dtype: Dtype::F32,
        layout: Layout::Coo,
        metadata: serde_json::json!({
            "backend": negotiated.backend_name,
            "graph": eir.graph.name,
            "seed": eir.seed,
        }),
    };
    write_jsonl(trace_out, &header, &records).map_err(EventFlowError::Io)?;

    Ok(RunReport {
        status: "ok".to_string(),
        trace_path: trace_out.display().to_string(),
        count: records.len(),
    })
}
