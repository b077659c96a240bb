//! Temporal coincidence fuse acceleration kernel (`spec.md` §4.7
//! "fuse_coincidence"), the array-oriented counterpart to
//! [`crate::ops::FuseOp`] — identical semantics, pinned by
//! `python_fuse_ref` in
//! `original_source/eventflow-core/tests/test_native_parity.py`.

use std::collections::VecDeque;

use crate::error::KernelError;

pub fn fuse_coincidence(
    t_a: &[i64],
    t_b: &[i64],
    window_ns: i64,
    min_count: i64,
) -> Result<Vec<i64>, KernelError> {
    if window_ns <= 0 {
        return Err(KernelError::FuseBadWindow(window_ns));
    }

    let mut out = Vec::new();
    let mut buf_a: VecDeque<i64> = VecDeque::new();
    let mut buf_b: VecDeque<i64> = VecDeque::new();
    let (mut i, mut j) = (0usize, 0usize);

    while i < t_a.len() || j < t_b.len() {
        let take_a = match (t_a.get(i), t_b.get(j)) {
            (Some(&a), Some(&b)) => a <= b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let t = if take_a {
            let t = t_a[i];
            i += 1;
            buf_a.push_back(t);
            t
        } else {
            let t = t_b[j];
            j += 1;
            buf_b.push_back(t);
            t
        };

        let floor = t - window_ns;
        while matches!(buf_a.front(), Some(&f) if f < floor) {
            buf_a.pop_front();
        }
        while matches!(buf_b.front(), Some(&f) if f < floor) {
            buf_b.pop_front();
        }

        if !buf_a.is_empty() && !buf_b.is_empty() && (buf_a.len() + buf_b.len()) as i64 >= min_count {
            out.push(t);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_operator_semantics_on_identical_streams() {
        let out = fuse_coincidence(&[0, 100, 200], &[0, 100, 200], 50, 2).unwrap();
        assert_eq!(out, vec![0, 100, 200]);
    }

    #[test]
    fn rejects_non_positive_window() {
        assert!(matches!(
            fuse_coincidence(&[0], &[0], 0, 1),
            Err(KernelError::FuseBadWindow(0))
        ));
    }

    #[test]
    fn disjoint_streams_emit_nothing() {
        let out = fuse_coincidence(&[0], &[10_000], 10, 1).unwrap();
        assert!(out.is_empty());
    }
}
