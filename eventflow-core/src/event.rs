//! The internal event representation operators consume and produce
//! (`spec.md` §3 "Event", §9 REDESIGN FLAGS).
//!
//! Core operators need only `(t, c, v)`; metadata is an optional small
//! side-channel for the two operators that read or write it (`xy_to_ch`,
//! `shift_xy`). Keeping `Event` plain-old-data (no heap allocation in the
//! common case) is what lets the pull-iterator pipeline stay allocation-free
//! for the bulk of operators.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Int(i64),
    Str(String),
    Bool(bool),
}

pub type EventMeta = BTreeMap<String, MetaValue>;

/// `(t, c, v, meta)`. `t` is nanoseconds, non-negative. `c` is a
/// non-negative channel index. `v` must be finite; producing a non-finite
/// value is a `RuntimeError::NonFinite`, checked by the scheduler at node
/// boundaries rather than by every operator individually.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub t: i64,
    pub c: i64,
    pub v: f32,
    pub meta: Option<EventMeta>,
}

impl Event {
    pub fn new(t: i64, c: i64, v: f32) -> Self {
        Self { t, c, v, meta: None }
    }

    pub fn with_meta(t: i64, c: i64, v: f32, meta: EventMeta) -> Self {
        Self {
            t,
            c,
            v,
            meta: Some(meta),
        }
    }

    pub fn meta_int(&self, key: &str) -> Option<i64> {
        match self.meta.as_ref()?.get(key)? {
            MetaValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        match self.meta.as_ref()?.get(key)? {
            MetaValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A pull-based operator iterator: owned state plus `next()`, replacing
/// the original generator/coroutine pipelines (`spec.md` §9 REDESIGN
/// FLAGS). Every operator in C5 implements this trait over its bound
/// upstream iterator(s).
pub trait EventIter {
    fn next_event(&mut self) -> Option<Event>;
}

/// Adapts a plain in-memory `Vec<Event>` (already time-ordered) into an
/// `EventIter`, the common case for feeding recorded input streams into a
/// pipeline.
pub struct VecEventIter {
    events: std::vec::IntoIter<Event>,
}

impl VecEventIter {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}

impl EventIter for VecEventIter {
    fn next_event(&mut self) -> Option<Event> {
        self.events.next()
    }
}

/// Drains an `EventIter` to a `Vec`, the shape the scheduler materializes
/// each node's output into before fanning it out to downstream ports
/// (`spec.md` §4.4 "Event mode").
pub fn drain(mut it: impl EventIter) -> Vec<Event> {
    let mut out = Vec::new();
    while let Some(e) = it.next_event() {
        out.push(e);
    }
    out
}
