//! Process-wide structured logging sink (`spec.md` §5, §11b).
//!
//! `tracing` is the bridge; this module owns the one permitted global — an
//! atomically guarded attach/detach of a subscriber — so that both the CLI
//! binary and library callers embedding `eventflow-core` can opt in without
//! double-initializing a global subscriber (which `tracing` panics on).

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::subscriber::SetGlobalDefaultError;

static ATTACHED: AtomicBool = AtomicBool::new(false);

/// Attaches a default `tracing-subscriber` formatting layer honoring
/// `RUST_LOG`. Idempotent: a second call while already attached is a no-op
/// that returns `Ok(())` rather than erroring, since callers (library and
/// CLI) may both attempt to attach during startup.
pub fn attach() -> Result<(), SetGlobalDefaultError> {
    if ATTACHED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Another crate in the same process already installed a
            // subscriber; treat that as already-attached rather than fatal.
            ATTACHED.store(true, Ordering::SeqCst);
            Err(e)
        }
    }
}

/// Marks the sink detached so a later `attach()` in the same process (e.g.
/// between independent test runs sharing a process) is willing to try again.
/// Does not uninstall the global `tracing` dispatcher — `tracing` has no
/// supported API to do that — it only resets this crate's own guard.
pub fn detach() {
    ATTACHED.store(false, Ordering::SeqCst);
}

pub fn is_attached() -> bool {
    ATTACHED.load(Ordering::SeqCst)
}
