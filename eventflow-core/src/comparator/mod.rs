//! Trace equivalence comparator (`spec.md` §4.6, C9).
//!
//! Grounded on `original_source/eventflow-core/conformance/comparator.py`:
//! `compare_traces_jsonl` reads both headers, checks `units.time` for an
//! exact match (a header error otherwise), then compares records 1:1 up to
//! `min(len)`, retaining the first 20 mismatches with per-field deltas, and
//! reports a length mismatch in the summary even when every shared record
//! agrees.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IoError;
use crate::ir::event_tensor::{read_jsonl, Record};
use crate::ir::types::TimeUnitName;

const MAX_FIRST_MISMATCHES: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mismatch {
    pub index: usize,
    pub ts_golden: i64,
    pub ts_candidate: i64,
    pub dt_us: f64,
    pub idx_golden: Vec<i64>,
    pub idx_candidate: Vec<i64>,
    pub val_golden: f32,
    pub val_candidate: f32,
    pub rel_err: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub count_golden: usize,
    pub count_candidate: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub ok: bool,
    pub eps_time_us: f64,
    pub eps_numeric: f64,
    pub mismatch_count: usize,
    pub first_mismatches: Vec<Mismatch>,
    pub summary: Summary,
    /// Set when the headers disagree on `units.time`; fatal regardless of
    /// `eps_time_us`/`eps_numeric`, since no conversion can reconcile it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub header_error: Option<String>,
}

fn to_us(ts: i64, unit: TimeUnitName) -> f64 {
    ts as f64 * unit.ns_per_unit() as f64 / 1000.0
}

/// Compares two Event Tensor JSONL traces under bounded time and numeric
/// tolerances (`spec.md` §4.6). Both files are read via the fail-fast
/// reader, so a malformed or non-monotonic trace surfaces as an `IoError`
/// rather than a comparison mismatch.
pub fn compare_traces(
    golden_path: &Path,
    candidate_path: &Path,
    eps_time_us: f64,
    eps_numeric: f64,
) -> Result<ComparisonResult, IoError> {
    let (golden_header, golden_records) = read_jsonl(golden_path)?;
    let (candidate_header, candidate_records) = read_jsonl(candidate_path)?;

    if golden_header.units.time != candidate_header.units.time {
        return Ok(ComparisonResult {
            ok: false,
            eps_time_us,
            eps_numeric,
            mismatch_count: 0,
            first_mismatches: Vec::new(),
            summary: Summary {
                count_golden: golden_records.len(),
                count_candidate: candidate_records.len(),
            },
            header_error: Some(format!(
                "units.time mismatch: golden={:?} candidate={:?}",
                golden_header.units.time, candidate_header.units.time
            )),
        });
    }

    let unit = golden_header.units.time;
    let n = golden_records.len().min(candidate_records.len());
    let mut mismatches = Vec::new();
    let mut mismatch_count = 0usize;

    for i in 0..n {
        if let Some(m) = compare_record(&golden_records[i], &candidate_records[i], unit, eps_time_us, eps_numeric, i) {
            mismatch_count += 1;
            if mismatches.len() < MAX_FIRST_MISMATCHES {
                mismatches.push(m);
            }
        }
    }

    let length_mismatch = golden_records.len() != candidate_records.len();
    let ok = mismatch_count == 0 && !length_mismatch;

    Ok(ComparisonResult {
        ok,
        eps_time_us,
        eps_numeric,
        mismatch_count,
        first_mismatches: mismatches,
        summary: Summary {
            count_golden: golden_records.len(),
            count_candidate: candidate_records.len(),
        },
        header_error: None,
    })
}

fn compare_record(
    golden: &Record,
    candidate: &Record,
    unit: TimeUnitName,
    eps_time_us: f64,
    eps_numeric: f64,
    index: usize,
) -> Option<Mismatch> {
    let ts_golden_us = to_us(golden.ts, unit);
    let ts_candidate_us = to_us(candidate.ts, unit);
    let dt_us = (ts_candidate_us - ts_golden_us).abs();

    let denom = 1.0f64.max(golden.val.abs() as f64);
    let rel_err = (candidate.val as f64 - golden.val as f64).abs() / denom;

    let idx_equal = golden.idx == candidate.idx;

    if dt_us > eps_time_us || rel_err > eps_numeric || !idx_equal {
        Some(Mismatch {
            index,
            ts_golden: golden.ts,
            ts_candidate: candidate.ts,
            dt_us,
            idx_golden: golden.idx.clone(),
            idx_candidate: candidate.idx.clone(),
            val_golden: golden.val,
            val_candidate: candidate.val,
            rel_err,
        })
    } else {
        None
    }
}

impl std::fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Trace equivalence: {}", if self.ok { "OK" } else { "FAIL" })?;
        if let Some(err) = &self.header_error {
            writeln!(f, "header error: {err}")?;
            return Ok(());
        }
        writeln!(
            f,
            "eps_time_us={} eps_numeric={}",
            self.eps_time_us, self.eps_numeric
        )?;
        writeln!(
            f,
            "counts: golden={} candidate={}",
            self.summary.count_golden, self.summary.count_candidate
        )?;
        writeln!(f, "mismatches: {}", self.mismatch_count)?;
        for m in &self.first_mismatches {
            writeln!(
                f,
                " - [{}] ts {}/{} (dt_us={:.3}) idx {:?}/{:?} val {}/{} (rel_err={:.6})",
                m.index, m.ts_golden, m.ts_candidate, m.dt_us, m.idx_golden, m.idx_candidate, m.val_golden, m.val_candidate, m.rel_err
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::event_tensor::{write_jsonl, Header, Units};
    use crate::ir::types::TimeUnitName;

    fn header() -> Header {
        Header {
            schema_version: "1.0".into(),
            dims: vec!["c".into()],
            units: Units {
                time: TimeUnitName::Us,
                value: "dimensionless".into(),
            },
            dtype: crate::ir::event_tensor::Dtype::F32,
            layout: crate::ir::event_tensor::Layout::Coo,
            metadata: serde_json::json!({}),
        }
    }

    fn write_trace(name: &str, records: Vec<Record>) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ef_comparator_{name}_{}.jsonl", std::process::id()));
        write_jsonl(&path, &header(), &records).unwrap();
        path
    }

    #[test]
    fn within_time_epsilon_is_ok() {
        // spec.md §8 scenario 5, first half.
        let golden = write_trace(
            "golden_a",
            vec![
                Record { ts: 0, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 100, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 200, idx: vec![0], val: 1.0, meta: None },
            ],
        );
        let candidate = write_trace(
            "candidate_a",
            vec![
                Record { ts: 1, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 101, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 199, idx: vec![0], val: 1.0, meta: None },
            ],
        );
        let result = compare_traces(&golden, &candidate, 1.0, 0.0).unwrap();
        assert!(result.ok);
        std::fs::remove_file(golden).ok();
        std::fs::remove_file(candidate).ok();
    }

    #[test]
    fn zero_time_epsilon_reports_every_shifted_record() {
        // spec.md §8 scenario 5, second half.
        let golden = write_trace(
            "golden_b",
            vec![
                Record { ts: 0, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 100, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 200, idx: vec![0], val: 1.0, meta: None },
            ],
        );
        let candidate = write_trace(
            "candidate_b",
            vec![
                Record { ts: 1, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 101, idx: vec![0], val: 1.0, meta: None },
                Record { ts: 199, idx: vec![0], val: 1.0, meta: None },
            ],
        );
        let result = compare_traces(&golden, &candidate, 0.0, 0.0).unwrap();
        assert!(!result.ok);
        assert_eq!(result.mismatch_count, 3);
        std::fs::remove_file(golden).ok();
        std::fs::remove_file(candidate).ok();
    }

    #[test]
    fn differing_time_units_is_a_header_error() {
        let golden = write_trace("golden_c", vec![]);
        let mut h = header();
        h.units.time = TimeUnitName::Ms;
        let candidate_path = std::env::temp_dir().join(format!("ef_comparator_candidate_c_{}.jsonl", std::process::id()));
        write_jsonl(&candidate_path, &h, &[]).unwrap();
        let result = compare_traces(&golden, &candidate_path, 1.0, 0.0).unwrap();
        assert!(!result.ok);
        assert!(result.header_error.is_some());
        std::fs::remove_file(golden).ok();
        std::fs::remove_file(candidate_path).ok();
    }
}
