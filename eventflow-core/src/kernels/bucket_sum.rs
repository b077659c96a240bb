//! Bucketed sum acceleration kernel (`spec.md` §4.7 "bucket_sum"). Bit-exact
//! semantics pinned by `python_bucket_ref` in
//! `original_source/eventflow-core/tests/test_native_parity.py`: key is
//! floor division (`t.div_euclid(dt_ns)` for the non-negative timestamps
//! the contract requires), summed in input order, emitted at `key*dt + dt`
//! on every key change and once more at stream end.

use crate::error::KernelError;

pub fn bucket_sum(t: &[i64], v: &[f32], dt_ns: i64) -> Result<(Vec<i64>, Vec<f32>), KernelError> {
    if dt_ns <= 0 {
        return Err(KernelError::BucketBadDt(dt_ns));
    }
    if t.len() != v.len() {
        return Err(KernelError::BucketLengthMismatch {
            t_len: t.len(),
            v_len: v.len(),
        });
    }
    if t.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut t_out = Vec::new();
    let mut v_out = Vec::new();

    let mut current_key = t[0].div_euclid(dt_ns);
    let mut acc = 0.0f32;

    for (&ti, &vi) in t.iter().zip(v.iter()) {
        let key = ti.div_euclid(dt_ns);
        if key != current_key {
            t_out.push(current_key * dt_ns + dt_ns);
            v_out.push(acc);
            current_key = key;
            acc = 0.0;
        }
        acc += vi;
    }
    t_out.push(current_key * dt_ns + dt_ns);
    v_out.push(acc);

    Ok((t_out, v_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_one_is_identity_shifted_by_one() {
        // spec.md §8 invariant: dt_ns=1 => v_out[i]==v[i], t_out[i]==t[i]+1.
        let t = vec![0, 1, 2, 3];
        let v = vec![1.0, 2.0, 3.0, 4.0];
        let (t_out, v_out) = bucket_sum(&t, &v, 1).unwrap();
        assert_eq!(t_out, vec![1, 2, 3, 4]);
        assert_eq!(v_out, v);
    }

    #[test]
    fn fixed_step_bucketing_scenario() {
        // spec.md §8 scenario 2.
        let t = vec![1_000_000, 2_000_000, 3_000_000];
        let v = vec![1.0, 1.0, 1.0];
        let (t_out, v_out) = bucket_sum(&t, &v, 1_000_000).unwrap();
        assert_eq!(t_out, vec![2_000_000, 3_000_000, 4_000_000]);
        assert_eq!(v_out, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let (t_out, v_out) = bucket_sum(&[], &[], 10).unwrap();
        assert!(t_out.is_empty());
        assert!(v_out.is_empty());
    }

    #[test]
    fn rejects_non_positive_dt() {
        assert!(matches!(
            bucket_sum(&[0], &[1.0], 0),
            Err(KernelError::BucketBadDt(0))
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(matches!(
            bucket_sum(&[0, 1], &[1.0], 10),
            Err(KernelError::BucketLengthMismatch { .. })
        ));
    }

    #[test]
    fn sums_multiple_events_in_same_bucket_in_order() {
        let t = vec![0, 1, 5, 6];
        let v = vec![1.0, 2.0, 3.0, 4.0];
        let (t_out, v_out) = bucket_sum(&t, &v, 5).unwrap();
        // bucket 0: [0,5) -> t=0,1 sum=3, emitted at 5
        // bucket 1: [5,10) -> t=5,6 sum=7, emitted at 10
        assert_eq!(t_out, vec![5, 10]);
        assert_eq!(v_out, vec![3.0, 7.0]);
    }
}
