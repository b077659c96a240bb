//! Event-mode runner (`spec.md` §4.4 "Event mode").
//!
//! Visits nodes in topological order; for each, materializes the output as
//! the ordered sequence obtained by applying the operator to its bound
//! input iterators, then fans it out to downstream input ports. Each node
//! is evaluated exactly once per run — the scheduler's single-pass
//! guarantee (`spec.md` §4.4, §5 "Ordering guarantees").

use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::cancel::CancellationToken;
use crate::error::{EventFlowError, RuntimeError};
use crate::event::{drain, Event, EventIter, VecEventIter};
use crate::ir::types::{Node, OpParams};
use crate::ops;
use crate::scheduler::build::ExecPlan;

/// Applies an edge's `delay_us` shift and optional `weight` scale to a
/// materialized event stream before it becomes a downstream input.
fn apply_edge(events: &[Event], delay_us: f64, weight: Option<f32>) -> Vec<Event> {
    let delay_ns = (delay_us * 1000.0).round() as i64;
    events
        .iter()
        .map(|e| {
            let v = match weight {
                Some(w) => e.v * w,
                None => e.v,
            };
            Event {
                t: e.t + delay_ns,
                c: e.c,
                v,
                meta: e.meta.clone(),
            }
        })
        .collect()
}

/// Stably merges several already time-ordered streams into one, preserving
/// the relative order of equal timestamps by the order the streams are
/// given in (`spec.md` §3 "Ordering within equal keys is preserved").
fn merge_streams(streams: Vec<Vec<Event>>) -> Vec<Event> {
    let mut merged: Vec<Event> = streams.into_iter().flatten().collect();
    merged.sort_by_key(|e| e.t);
    merged
}

fn boxed(events: Vec<Event>) -> Box<dyn EventIter> {
    Box::new(VecEventIter::new(events))
}

/// Collapses however many input streams a node received into the single
/// stream a single-input operator expects, preserving time order and the
/// edge-order tie-break (`merge_streams` is a no-op when there is exactly
/// one stream).
fn single_input(inputs: Vec<Vec<Event>>) -> Vec<Event> {
    merge_streams(inputs)
}

fn instantiate(node: &Node, mut inputs: Vec<Vec<Event>>) -> Result<Vec<Event>, EventFlowError> {
    let op = match &node.op {
        Some(op) => op,
        None => return Ok(merge_streams(inputs)),
    };

    let out = match op {
        OpParams::Lif(p) => {
            let input = single_input(std::mem::take(&mut inputs));
            let it = ops::LifOp::new(
                boxed(input),
                p.tau_m.to_ns()?,
                p.v_th,
                p.v_reset,
                p.r_m,
                p.refractory.to_ns()?,
            );
            drain(it)
        }
        OpParams::ExpSyn(p) => {
            let input = inputs.pop().unwrap_or_default();
            let it = ops::ExpSynOp::new(boxed(input), p.weight, p.tau_s.to_ns()?);
            drain(it)
        }
        OpParams::Delay(p) => {
            let input = inputs.pop().unwrap_or_default();
            let it = ops::DelayOp::new(boxed(input), p.delay.to_ns()?);
            drain(it)
        }
        OpParams::Fuse(p) => {
            let b = inputs.pop().unwrap_or_default();
            let a = inputs.pop().unwrap_or_default();
            let it = ops::FuseOp::new(boxed(a), boxed(b), p.window.to_ns()?, p.min_count);
            drain(it)
        }
        OpParams::Stft(p) => {
            let input = single_input(std::mem::take(&mut inputs));
            let hop_ns = p.hop.to_ns()?;
            let hop_samples = ((hop_ns as f64 / 1e9) * p.sample_rate_hz).round().max(1.0) as usize;
            let it = ops::StftOp::new(boxed(input), p.n_fft, hop_samples, p.sample_rate_hz, p.window);
            drain(it)
        }
        OpParams::Mel(p) => {
            let input = inputs.pop().unwrap_or_default();
            let fmax = p.fmax_hz.unwrap_or(p.sample_rate_hz / 2.0);
            let it = ops::MelOp::new(
                boxed(input),
                p.n_fft,
                p.n_mels,
                p.sample_rate_hz,
                p.fmin_hz,
                fmax,
                p.log,
            );
            drain(it)
        }
        OpParams::XyToCh(p) => {
            let input = inputs.pop().unwrap_or_default();
            let it = ops::XyToChOp::new(boxed(input), p.width, p.height);
            drain(it)
        }
        OpParams::ShiftXy(p) => {
            let input = inputs.pop().unwrap_or_default();
            let it = ops::ShiftXyOp::new(boxed(input), p.dx, p.dy, p.width, p.height);
            drain(it)
        }
    };

    for e in &out {
        if !e.v.is_finite() {
            return Err(RuntimeError::NonFinite {
                node_id: node.id.clone(),
                value: e.v,
            }
            .into());
        }
    }
    Ok(out)
}

/// Runs the plan in event mode. `external_inputs` supplies the raw event
/// stream for every source node (a node with no incoming edges) that has
/// one; source nodes absent from the map run with an empty input.
///
/// `cancel`, if given, is checked after each node completes (`spec.md` §5
/// "A run is cancellable between nodes"); when set, the run stops and
/// returns `EventFlowError::Cancelled` without evaluating the remaining
/// nodes, releasing whatever per-node state had been materialized so far.
pub fn run_event_mode(
    plan: &ExecPlan,
    external_inputs: &BTreeMap<String, Vec<Event>>,
    cancel: Option<&CancellationToken>,
) -> Result<BTreeMap<String, Vec<Event>>, EventFlowError> {
    let mut outputs: BTreeMap<petgraph::graph::NodeIndex, Vec<Event>> = BTreeMap::new();

    for &node_idx in &plan.order {
        if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
            return Err(EventFlowError::Cancelled);
        }

        let node = &plan.graph.graph[node_idx];

        let mut incoming: Vec<_> = plan
            .graph
            .graph
            .edges_directed(node_idx, Direction::Incoming)
            .filter(|e| !plan.feedback.contains(&(e.source(), e.target())))
            .collect();
        incoming.sort_by_key(|e| e.id().index());

        let inputs: Vec<Vec<Event>> = if incoming.is_empty() {
            vec![external_inputs.get(&node.id).cloned().unwrap_or_default()]
        } else {
            incoming
                .iter()
                .map(|e| {
                    let src_out = outputs.get(&e.source()).cloned().unwrap_or_default();
                    apply_edge(&src_out, e.weight().delay_us, e.weight().weight)
                })
                .collect()
        };

        let out = instantiate(node, inputs)?;
        outputs.insert(node_idx, out);
    }

    Ok(outputs
        .into_iter()
        .map(|(idx, events)| (plan.graph.graph[idx].id.clone(), events))
        .collect())
}
