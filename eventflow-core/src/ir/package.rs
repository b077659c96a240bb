//! Package manifest (EFPKG) — references to EIR/golden trace/inputs with
//! integrity hashes (`spec.md` §6 "Package manifest", §3 "Package manifest
//! (EFPKG)"). Only manifest validation is in scope; the on-disk hub/registry
//! that manages packages is out of scope per `spec.md` §1.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{IoError, ValidationIssue};
use crate::ir::types::{TimeMode, TimeUnitName};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismBlock {
    pub time_unit: TimeUnitName,
    pub time_mode: TimeMode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fixed_step_dt_us: Option<f64>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub eir: FileRef,
    pub golden_trace: FileRef,
    #[serde(default)]
    pub inputs: Vec<FileRef>,
    pub determinism: DeterminismBlock,
}

/// Checks that every referenced file exists under `root` and its `sha256`
/// and `size_bytes` match, and that `determinism` agrees with `eir.time`.
/// Accumulates every mismatch rather than stopping at the first, matching
/// the C3 validator's propagation policy.
pub fn validate_efpkg(
    manifest: &PackageManifest,
    root: &Path,
    eir: &crate::ir::types::Eir,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (field, file_ref) in [
        ("eir", &manifest.eir),
        ("golden_trace", &manifest.golden_trace),
    ]
    .into_iter()
    .chain(manifest.inputs.iter().enumerate().map(|(i, f)| {
        let _ = i;
        ("inputs", f)
    })) {
        check_file_ref(root, field, file_ref, &mut issues);
    }

    if manifest.determinism.time_unit != eir.time.unit {
        issues.push(ValidationIssue::new(
            "/determinism/time_unit",
            format!(
                "manifest declares {:?} but eir.time.unit is {:?}",
                manifest.determinism.time_unit, eir.time.unit
            ),
        ));
    }
    if manifest.determinism.time_mode != eir.time.mode {
        issues.push(ValidationIssue::new(
            "/determinism/time_mode",
            format!(
                "manifest declares {:?} but eir.time.mode is {:?}",
                manifest.determinism.time_mode, eir.time.mode
            ),
        ));
    }
    if manifest.determinism.seed != eir.seed {
        issues.push(ValidationIssue::new(
            "/determinism/seed",
            format!(
                "manifest declares seed {} but eir.seed is {}",
                manifest.determinism.seed, eir.seed
            ),
        ));
    }
    if manifest.determinism.fixed_step_dt_us != eir.time.fixed_step_dt_us {
        issues.push(ValidationIssue::new(
            "/determinism/fixed_step_dt_us",
            "manifest fixed_step_dt_us does not match eir.time.fixed_step_dt_us",
        ));
    }

    issues
}

fn check_file_ref(root: &Path, field: &str, file_ref: &FileRef, issues: &mut Vec<ValidationIssue>) {
    let full = root.join(&file_ref.path);
    let bytes = match std::fs::read(&full) {
        Ok(b) => b,
        Err(_) => {
            issues.push(ValidationIssue::new(
                format!("/{field}"),
                format!("referenced file does not exist: {}", full.display()),
            ));
            return;
        }
    };
    if bytes.len() as u64 != file_ref.size_bytes {
        issues.push(ValidationIssue::new(
            format!("/{field}/size_bytes"),
            format!(
                "size mismatch for {}: manifest says {}, actual {}",
                file_ref.path,
                file_ref.size_bytes,
                bytes.len()
            ),
        ));
    }
    let digest = hex::encode(Sha256::digest(&bytes));
    if digest != file_ref.sha256 {
        issues.push(ValidationIssue::new(
            format!("/{field}/sha256"),
            format!(
                "sha256 mismatch for {}: manifest says {}, actual {digest}",
                file_ref.path, file_ref.sha256
            ),
        ));
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Reads and parses a manifest file.
pub fn load_manifest(path: &Path) -> Result<PackageManifest, IoError> {
    let path_str = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| IoError::Json {
        path: path_str,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_stable() {
        let a = sha256_hex(b"hello");
        let b = sha256_hex(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
