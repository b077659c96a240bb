//! Scheduler (`spec.md` §4.4, C6): topological build plus the event-mode
//! and fixed-step runners. Modeled as pull-based iterators over exec slots
//! rather than the teacher's async VM-tick model — BPMN's multi-fiber
//! process semantics don't fit a DAG of pure per-node transforms
//! (`SPEC_FULL.md` §4.4) — but the teacher's *topological build + typed
//! dispatch + owned per-node state* shape carries over directly.

pub mod build;
pub mod event_mode;
pub mod fixed_step;

pub use build::{build_exec_order, ExecPlan};
pub use event_mode::run_event_mode;
pub use fixed_step::run_fixed_step;
