//! Fixed-step runner (`spec.md` §4.4 "Fixed-step mode").
//!
//! Upstream source-node inputs are bucketed into `[k*dt, (k+1)*dt)`
//! intervals, summed by channel in input order, and emitted at the
//! interval's closing boundary `(k+1)*dt` — the same half-open convention
//! and per-channel summation as [`crate::kernels::bucket_sum`], just keyed
//! on `Event::c` instead of a single flat array (`SPEC_FULL.md` §4.7).
//! The bucketed streams are then run through [`super::event_mode`]
//! unchanged, since bucketing only transforms the source events.

use std::collections::{BTreeMap, HashMap};

use crate::cancel::CancellationToken;
use crate::error::EventFlowError;
use crate::event::Event;
use crate::scheduler::build::ExecPlan;
use crate::scheduler::event_mode::run_event_mode;

/// Buckets one source stream by `[k*dt, (k+1)*dt)`, summing values per
/// channel in arrival order, and emitting one event per `(key, channel)`
/// at `t = (key+1)*dt`. Channels are emitted in ascending order within a
/// bucket so output stays deterministic regardless of input interleaving.
pub fn bucket_stream(events: &[Event], dt_ns: i64) -> Vec<Event> {
    let mut out = Vec::new();
    if events.is_empty() {
        return out;
    }

    let mut current_key = events[0].t.div_euclid(dt_ns);
    let mut acc: BTreeMap<i64, f32> = BTreeMap::new();

    let flush = |key: i64, acc: &mut BTreeMap<i64, f32>, out: &mut Vec<Event>| {
        let t = key * dt_ns + dt_ns;
        for (&c, &v) in acc.iter() {
            out.push(Event::new(t, c, v));
        }
        acc.clear();
    };

    for e in events {
        let key = e.t.div_euclid(dt_ns);
        if key != current_key {
            flush(current_key, &mut acc, &mut out);
            current_key = key;
        }
        *acc.entry(e.c).or_insert(0.0) += e.v;
    }
    flush(current_key, &mut acc, &mut out);

    out
}

/// Runs the plan in fixed-step mode: every external source input is
/// bucketed at `dt_ns` before the single-pass event-mode walk in
/// `spec.md` §4.4 runs over it. Downstream operators see exact multiples
/// of `dt_ns` as their upstream timestamps.
pub fn run_fixed_step(
    plan: &ExecPlan,
    external_inputs: &BTreeMap<String, Vec<Event>>,
    dt_ns: i64,
    cancel: Option<&CancellationToken>,
) -> Result<BTreeMap<String, Vec<Event>>, EventFlowError> {
    let bucketed: BTreeMap<String, Vec<Event>> = external_inputs
        .iter()
        .map(|(id, events)| (id.clone(), bucket_stream(events, dt_ns)))
        .collect::<HashMap<_, _>>()
        .into_iter()
        .collect();

    run_event_mode(plan, &bucketed, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_timestamps_are_exact_multiples_of_dt() {
        // spec.md §8 scenario 2.
        let events = vec![
            Event::new(1_000_000, 0, 1.0),
            Event::new(2_000_000, 0, 1.0),
            Event::new(3_000_000, 0, 1.0),
        ];
        let out = bucket_stream(&events, 1_000_000);
        let ts: Vec<i64> = out.iter().map(|e| e.t).collect();
        let vs: Vec<f32> = out.iter().map(|e| e.v).collect();
        assert_eq!(ts, vec![2_000_000, 3_000_000, 4_000_000]);
        assert_eq!(vs, vec![1.0, 1.0, 1.0]);
        assert!(ts.iter().all(|t| t % 1_000_000 == 0));
    }

    #[test]
    fn sums_multiple_channels_within_a_bucket() {
        let events = vec![
            Event::new(0, 0, 1.0),
            Event::new(1, 1, 2.0),
            Event::new(2, 0, 3.0),
        ];
        let out = bucket_stream(&events, 5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].c, 0);
        assert_eq!(out[0].v, 4.0);
        assert_eq!(out[1].c, 1);
        assert_eq!(out[1].v, 2.0);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(bucket_stream(&[], 10).is_empty());
    }
}
