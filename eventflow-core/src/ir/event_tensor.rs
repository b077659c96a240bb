//! Event Tensor JSONL I/O (`spec.md` §3 "Event Tensor (external)", §6, C4).
//!
//! Line 1 is a header record; every subsequent non-blank line is an event
//! record. Readers ignore blank lines; writers emit without trailing
//! whitespace, matching `spec.md` §6.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IoError;
use crate::ir::types::TimeUnitName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    F32,
    F16,
    I16,
    U8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Coo,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Units {
    pub time: TimeUnitName,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub schema_version: String,
    pub dims: Vec<String>,
    pub units: Units,
    pub dtype: Dtype,
    pub layout: Layout,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HeaderLine {
    header: Header,
}

/// One on-the-wire event record: `{"ts": <int>, "idx": [<int>...], "val": <number>, "meta": {...}?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub ts: i64,
    pub idx: Vec<i64>,
    pub val: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<BTreeMap<String, serde_json::Value>>,
}

/// Reads the full header plus all records, enforcing the two invariants a
/// non-validating caller still needs to trust: `idx` length equals
/// `|dims|`, and `ts` is non-decreasing. Violations fail fast with a line
/// number; a caller that wants every violation collected (not just the
/// first) should use the validator (C3) instead.
pub fn read_jsonl(path: &Path) -> Result<(Header, Vec<Record>), IoError> {
    let path_str = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    let mut lines = BufReader::new(file).lines();

    let header_line = loop {
        let line = lines
            .next()
            .ok_or_else(|| IoError::TruncatedRecord {
                path: path_str.clone(),
                line: 1,
            })?
            .map_err(|source| IoError::Read {
                path: path_str.clone(),
                source,
            })?;
        if !line.trim().is_empty() {
            break line;
        }
    };
    let header: HeaderLine = serde_json::from_str(&header_line).map_err(|source| IoError::Json {
        path: path_str.clone(),
        source,
    })?;

    let mut records = Vec::new();
    let mut last_ts: Option<i64> = None;
    for (i, line) in lines.enumerate() {
        let line_no = i + 2;
        let line = line.map_err(|source| IoError::Read {
            path: path_str.clone(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|source| IoError::Json {
            path: path_str.clone(),
            source,
        })?;
        if record.idx.len() != header.header.dims.len() {
            return Err(IoError::Invariant {
                path: path_str.clone(),
                line: line_no,
                message: format!(
                    "idx arity {} does not match dims arity {}",
                    record.idx.len(),
                    header.header.dims.len()
                ),
            });
        }
        if let Some(prev) = last_ts {
            if record.ts < prev {
                return Err(IoError::Invariant {
                    path: path_str.clone(),
                    line: line_no,
                    message: format!("ts {} is less than previous ts {prev}", record.ts),
                });
            }
        }
        last_ts = Some(record.ts);
        records.push(record);
    }

    Ok((header.header, records))
}

/// Writes a header followed by records, one JSON object per line, no
/// trailing whitespace.
pub fn write_jsonl(path: &Path, header: &Header, records: &[Record]) -> Result<(), IoError> {
    let path_str = path.display().to_string();
    let mut file = std::fs::File::create(path).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    let header_line = HeaderLine {
        header: header.clone(),
    };
    let header_json = serde_json::to_string(&header_line).map_err(|source| IoError::Json {
        path: path_str.clone(),
        source,
    })?;
    writeln!(file, "{header_json}").map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| IoError::Json {
            path: path_str.clone(),
            source,
        })?;
        writeln!(file, "{line}").map_err(|source| IoError::Read {
            path: path_str.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            schema_version: "1.0".into(),
            dims: vec!["c".into()],
            units: Units {
                time: TimeUnitName::Ns,
                value: "volts".into(),
            },
            dtype: Dtype::F32,
            layout: Layout::Coo,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ef_event_tensor_test_{}.jsonl", std::process::id()));
        let header = sample_header();
        let records = vec![
            Record { ts: 0, idx: vec![0], val: 1.0, meta: None },
            Record { ts: 10, idx: vec![1], val: 2.0, meta: None },
        ];
        write_jsonl(&path, &header, &records).unwrap();
        let (read_header, read_records) = read_jsonl(&path).unwrap();
        assert_eq!(read_header.dims, header.dims);
        assert_eq!(read_records.len(), 2);
        assert_eq!(read_records[0].ts, 0);
        assert_eq!(read_records[1].val, 2.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_decreasing_timestamps() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ef_event_tensor_bad_{}.jsonl", std::process::id()));
        let header = sample_header();
        let body = format!(
            "{}\n{{\"ts\":10,\"idx\":[0],\"val\":1.0}}\n{{\"ts\":5,\"idx\":[0],\"val\":1.0}}\n",
            serde_json::to_string(&HeaderLine { header }).unwrap()
        );
        std::fs::write(&path, body).unwrap();
        let err = read_jsonl(&path).unwrap_err();
        assert!(matches!(err, IoError::Invariant { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn ignores_blank_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("ef_event_tensor_blank_{}.jsonl", std::process::id()));
        let header = sample_header();
        let body = format!(
            "{}\n\n{{\"ts\":0,\"idx\":[0],\"val\":1.0}}\n\n",
            serde_json::to_string(&HeaderLine { header }).unwrap()
        );
        std::fs::write(&path, body).unwrap();
        let (_, records) = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
