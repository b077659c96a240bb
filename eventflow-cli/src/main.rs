//! `ef`: thin command-line front end over the `eventflow-core` runtime
//! façade (`spec.md` §6 "CLI surface"). Owns none of the core logic —
//! every subcommand parses its arguments, calls into `eventflow-core`,
//! and renders the result as text or (with `--json`) a structured object,
//! matching the bit-exact contract in `spec.md` §6's command table.
//!
//! Grounded on the `clap`-derive pattern used by `dsl_cli` in the example
//! pack: a top-level `Cli` with a `#[command(subcommand)]` enum, a global
//! `--json` flag, and `std::process::ExitCode` carrying the exit-code
//! contract (0 OK, 1 validation/comparison/runtime failure, 2 I/O/usage
//! error) instead of `main`'s default `Result`-to-101 mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eventflow_core::comparator::compare_traces;
use eventflow_core::error::EventFlowError;
use eventflow_core::event::Event;
use eventflow_core::ir::event_tensor::read_jsonl;
use eventflow_core::ir::package::{load_manifest, validate_efpkg};
use eventflow_core::runtime;
use eventflow_core::validator::{
    validate_dcd, validate_eir, validate_event_tensor_jsonl_path,
};

#[derive(Parser)]
#[command(name = "ef")]
#[command(author = "EventFlow Team")]
#[command(version)]
#[command(about = "EventFlow: deterministic, event-driven signal processing toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit a structured `{ok: bool, ...}` JSON object instead of text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an EIR JSON document.
    ValidateEir {
        #[arg(long)]
        path: PathBuf,
    },
    /// Validate an Event Tensor JSONL trace.
    ValidateEvent {
        #[arg(long)]
        path: PathBuf,
    },
    /// Validate a Device Capability Descriptor JSON document.
    ValidateDcd {
        #[arg(long)]
        path: PathBuf,
    },
    /// Validate a package manifest against its referenced files.
    ValidateEfpkg {
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Build a plan for an EIR against a backend's device capabilities.
    Build {
        #[arg(long)]
        eir: PathBuf,
        /// Device Capability Descriptor JSON path.
        #[arg(long)]
        dcd: PathBuf,
        #[arg(long)]
        backend: String,
        #[arg(long = "plan-out")]
        plan_out: Option<PathBuf>,
    },
    /// Run an EIR against inputs and write the resulting trace.
    Run {
        #[arg(long)]
        eir: PathBuf,
        #[arg(long)]
        dcd: PathBuf,
        #[arg(long)]
        backend: String,
        /// `<node_id>=<path>` binding an Event Tensor file to a source node.
        /// May be given more than once.
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "trace-out")]
        trace_out: PathBuf,
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Compare two Event Tensor traces under time/numeric epsilons.
    CompareTraces {
        #[arg(long)]
        golden: PathBuf,
        #[arg(long)]
        candidate: PathBuf,
        #[arg(long = "eps-time-us", default_value_t = 100.0)]
        eps_time_us: f64,
        #[arg(long = "eps-numeric", default_value_t = 1e-5)]
        eps_numeric: f64,
    },
}

fn main() -> ExitCode {
    eventflow_core::log::attach().ok();
    let cli = Cli::parse();
    match dispatch(&cli) {
        Ok(code) => code,
        Err(CliError::Usage(msg)) => {
            eprintln!("usage error: {msg}");
            ExitCode::from(2)
        }
        Err(CliError::Core(e)) => {
            print_error(&cli, &e);
            match e {
                EventFlowError::Io(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

enum CliError {
    Usage(String),
    Core(EventFlowError),
}

impl From<EventFlowError> for CliError {
    fn from(e: EventFlowError) -> Self {
        CliError::Core(e)
    }
}

fn print_error(cli: &Cli, e: &EventFlowError) {
    if cli.json {
        let obj = serde_json::json!({ "ok": false, "error": e.to_string(), "code": e.code() });
        println!("{obj}");
    } else {
        eprintln!("error [{}]: {e}", e.code());
    }
}

fn dispatch(cli: &Cli) -> Result<ExitCode, CliError> {
    match &cli.command {
        Commands::ValidateEir { path } => cmd_validate_eir(cli, path),
        Commands::ValidateEvent { path } => cmd_validate_event(cli, path),
        Commands::ValidateDcd { path } => cmd_validate_dcd(cli, path),
        Commands::ValidateEfpkg { manifest, root } => cmd_validate_efpkg(cli, manifest, root.as_deref()),
        Commands::Build { eir, dcd, backend, plan_out } => cmd_build(cli, eir, dcd, backend, plan_out.as_deref()),
        Commands::Run { eir, dcd, backend, inputs, trace_out, plan } => {
            cmd_run(cli, eir, dcd, backend, inputs, trace_out, plan.as_deref())
        }
        Commands::CompareTraces { golden, candidate, eps_time_us, eps_numeric } => {
            cmd_compare_traces(cli, golden, candidate, *eps_time_us, *eps_numeric)
        }
    }
}

fn cmd_validate_eir(cli: &Cli, path: &Path) -> Result<ExitCode, CliError> {
    let eir = runtime::load_eir(path)?;
    let issues = validate_eir(&eir);
    report_issues(cli, &issues)
}

fn cmd_validate_event(cli: &Cli, path: &Path) -> Result<ExitCode, CliError> {
    let issues = validate_event_tensor_jsonl_path(path);
    report_issues(cli, &issues)
}

fn cmd_validate_dcd(cli: &Cli, path: &Path) -> Result<ExitCode, CliError> {
    let dcd = runtime::load_dcd(path)?;
    let issues = validate_dcd(&dcd);
    report_issues(cli, &issues)
}

fn cmd_validate_efpkg(cli: &Cli, manifest_path: &Path, root: Option<&Path>) -> Result<ExitCode, CliError> {
    let manifest = load_manifest(manifest_path).map_err(EventFlowError::from)?;
    let root = root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_path.parent().map(Path::to_path_buf).unwrap_or_default());
    let eir = runtime::load_eir(&root.join(&manifest.eir.path))?;
    let issues = validate_efpkg(&manifest, &root, &eir);
    report_issues(cli, &issues)
}

fn report_issues(
    cli: &Cli,
    issues: &[eventflow_core::error::ValidationIssue],
) -> Result<ExitCode, CliError> {
    let ok = issues.is_empty();
    if cli.json {
        let obj = serde_json::json!({
            "ok": ok,
            "issues": issues.iter().map(|i| serde_json::json!({"path": i.path, "message": i.message})).collect::<Vec<_>>(),
        });
        println!("{obj}");
    } else if ok {
        println!("OK");
    } else {
        for issue in issues {
            println!("{issue}");
        }
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_build(
    cli: &Cli,
    eir_path: &Path,
    dcd_path: &Path,
    backend: &str,
    plan_out: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let eir = runtime::load_eir(eir_path)?;
    let dcd = runtime::load_dcd(dcd_path)?;
    let plan = runtime::build(&eir, &dcd, backend)?;
    let plan_json = serde_json::to_string_pretty(&plan).expect("Plan always serializes");
    if let Some(out) = plan_out {
        std::fs::write(out, &plan_json).map_err(|source| {
            CliError::Core(eventflow_core::error::IoError::Read {
                path: out.display().to_string(),
                source,
            }.into())
        })?;
    }
    if cli.json {
        println!("{plan_json}");
    } else {
        println!("plan built for backend {backend:?}: {} partition(s), {} warning(s)", plan.partitions.len(), plan.warnings.len());
        for w in &plan.warnings {
            println!("warning: {w}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Parses `<node_id>=<path>` input bindings and reads each Event Tensor
/// file into the `external_inputs` map `runtime::run` expects.
fn load_inputs(bindings: &[String]) -> Result<BTreeMap<String, Vec<Event>>, CliError> {
    let mut out = BTreeMap::new();
    for binding in bindings {
        let (node_id, path) = binding.split_once('=').ok_or_else(|| {
            CliError::Usage(format!("--input {binding:?} must be of the form <node_id>=<path>"))
        })?;
        let (_, records) = read_jsonl(Path::new(path)).map_err(EventFlowError::from)?;
        let events = records
            .into_iter()
            .map(|r| Event::new(r.ts, r.idx.first().copied().unwrap_or(0), r.val))
            .collect();
        out.insert(node_id.to_string(), events);
    }
    Ok(out)
}

fn cmd_run(
    cli: &Cli,
    eir_path: &Path,
    dcd_path: &Path,
    backend: &str,
    inputs: &[String],
    trace_out: &Path,
    plan_path: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let eir = runtime::load_eir(eir_path)?;
    let plan = match plan_path {
        Some(p) => {
            let bytes = std::fs::read(p).map_err(|source| {
                CliError::Core(eventflow_core::error::IoError::Read { path: p.display().to_string(), source }.into())
            })?;
            serde_json::from_slice(&bytes).map_err(|source| {
                CliError::Core(eventflow_core::error::IoError::Json { path: p.display().to_string(), source }.into())
            })?
        }
        None => {
            let dcd = runtime::load_dcd(dcd_path)?;
            runtime::build(&eir, &dcd, backend)?
        }
    };
    let external_inputs = load_inputs(inputs)?;
    let report = runtime::run(&eir, &plan, &external_inputs, trace_out, None)?;

    if cli.json {
        println!("{}", serde_json::to_string(&report).expect("RunReport always serializes"));
    } else {
        println!(
            "status={} trace_path={} count={}",
            report.status, report.trace_path, report.count
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_compare_traces(
    cli: &Cli,
    golden: &Path,
    candidate: &Path,
    eps_time_us: f64,
    eps_numeric: f64,
) -> Result<ExitCode, CliError> {
    let result = compare_traces(golden, candidate, eps_time_us, eps_numeric).map_err(EventFlowError::from)?;
    if cli.json {
        println!("{}", serde_json::to_string(&result).expect("ComparisonResult always serializes"));
    } else {
        print!("{result}");
    }
    Ok(if result.ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
