//! Error taxonomy for eventflow-core (`spec.md` §7).
//!
//! Every fallible core operation returns `Result<T, EventFlowError>`. The
//! validator is the one exception: it accumulates `ValidationIssue`s rather
//! than failing on the first problem, per the propagation policy in §7.

use std::fmt;

/// Bad time literal, schema mismatch, or missing required configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("bad time literal: {0:?}")]
    BadTimeLiteral(String),
    #[error("schema version {found:?} incompatible with validator major version {expected:?}")]
    IncompatibleSchemaVersion { found: String, expected: String },
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("unknown backend: {0:?}")]
    UnknownBackend(String),
}

/// One structural or semantic issue found by the validator. Validators
/// collect these into a `Vec` rather than stopping at the first one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationIssue {
    /// JSON-pointer-like path to the offending value, e.g. `/nodes/3/params/tau_m`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = if self.path.is_empty() { "$" } else { &self.path };
        write!(f, "{p}: {}", self.message)
    }
}

/// Aggregate of structural/semantic EIR, Event Tensor, DCD, and package
/// validation failures. Carries the full issue list when non-empty.
#[derive(Debug, Clone, thiserror::Error)]
pub struct ValidationError(pub Vec<ValidationIssue>);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: Vec<String> = self.0.iter().take(3).map(|i| i.to_string()).collect();
        write!(
            f,
            "validation failed with {} issue(s): {}",
            self.0.len(),
            preview.join("; ")
        )
    }
}

/// Planner failures. `UnsupportedOp` is informational unless the planner
/// marks the run fatal (only `UnsupportedProfile` and
/// `TimeQuantizationViolation` are fatal per `spec.md` §4.5).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlannerError {
    #[error("backend.unsupported_profile: profile {profile:?} not in device conformance_profiles")]
    UnsupportedProfile { profile: String },
    #[error("backend.time_quantization_violation: {detail}")]
    TimeQuantizationViolation { detail: String },
    #[error("backend.time_config_invalid: {detail}")]
    TimeConfigInvalid { detail: String },
}

/// Operator invariant violations surfaced during execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("non-finite value produced by node {node_id:?}: {value}")]
    NonFinite { node_id: String, value: f32 },
    #[error("node {node_id:?} evaluated more than once in a single run")]
    DoubleEvaluation { node_id: String },
    #[error("unknown node id referenced: {0}")]
    UnknownNode(String),
}

/// Errors from the acceleration kernels (`spec.md` §4.7), aliased to the
/// same caller-observable kinds regardless of whether a native backend
/// is ever substituted in.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum KernelError {
    #[error("bucket_sum: dt_ns must be > 0, got {0}")]
    BucketBadDt(i64),
    #[error("bucket_sum: t and v length mismatch ({t_len} vs {v_len})")]
    BucketLengthMismatch { t_len: usize, v_len: usize },
    #[error("fuse_coincidence: window_ns must be > 0, got {0}")]
    FuseBadWindow(i64),
    #[error("vision pipeline: {0:?}")]
    Vision(VisionErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionErrorKind {
    OutOfBounds,
    EmptyFrame,
}

/// Missing files, parse errors, truncated JSONL.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("{path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: malformed JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}:{line}: truncated or malformed record")]
    TruncatedRecord { path: String, line: usize },
    #[error("{path}:{line}: {message}")]
    Invariant {
        path: String,
        line: usize,
        message: String,
    },
}

/// Top-level error aggregating every kind in `spec.md` §7, with a stable
/// machine-readable `code()` for callers that match on it programmatically
/// (e.g. the CLI's `--json` mode, or scenario 6 in `spec.md` §8).
#[derive(Debug, thiserror::Error)]
pub enum EventFlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("run cancelled")]
    Cancelled,
}

impl EventFlowError {
    /// Stable machine-readable code, e.g. `"backend.time_quantization_violation"`.
    pub fn code(&self) -> &'static str {
        match self {
            EventFlowError::Config(ConfigError::BadTimeLiteral(_)) => "config.bad_time_literal",
            EventFlowError::Config(ConfigError::IncompatibleSchemaVersion { .. }) => {
                "config.incompatible_schema_version"
            }
            EventFlowError::Config(ConfigError::MissingField(_)) => "config.missing_field",
            EventFlowError::Config(ConfigError::UnknownBackend(_)) => "config.unknown_backend",
            EventFlowError::Validation(_) => "validation.failed",
            EventFlowError::Planner(PlannerError::UnsupportedProfile { .. }) => {
                "backend.unsupported_profile"
            }
            EventFlowError::Planner(PlannerError::TimeQuantizationViolation { .. }) => {
                "backend.time_quantization_violation"
            }
            EventFlowError::Planner(PlannerError::TimeConfigInvalid { .. }) => {
                "backend.time_config_invalid"
            }
            EventFlowError::Runtime(RuntimeError::NonFinite { .. }) => "runtime.non_finite",
            EventFlowError::Runtime(RuntimeError::DoubleEvaluation { .. }) => {
                "runtime.double_evaluation"
            }
            EventFlowError::Runtime(RuntimeError::UnknownNode(_)) => "runtime.unknown_node",
            EventFlowError::Kernel(KernelError::BucketBadDt(_))
            | EventFlowError::Kernel(KernelError::BucketLengthMismatch { .. }) => {
                "kernel.bucket_error"
            }
            EventFlowError::Kernel(KernelError::FuseBadWindow(_)) => "kernel.fuse_error",
            EventFlowError::Kernel(KernelError::Vision(_)) => "kernel.vision_error",
            EventFlowError::Io(IoError::Read { .. }) => "io.read_error",
            EventFlowError::Io(IoError::Json { .. }) => "io.parse_error",
            EventFlowError::Io(IoError::TruncatedRecord { .. }) => "io.truncated_record",
            EventFlowError::Io(IoError::Invariant { .. }) => "io.invariant_violation",
            EventFlowError::Cancelled => "runtime.cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, EventFlowError>;
