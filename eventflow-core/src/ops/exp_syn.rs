//! Exponential synapse (`spec.md` §4.3 "Exponential synapse") — stateless
//! scaling, carried through as a pure map over the upstream iterator.

use crate::event::{Event, EventIter, EventMeta, MetaValue};

pub struct ExpSynOp {
    upstream: Box<dyn EventIter>,
    weight: f32,
    tau_s_ns: i64,
}

impl ExpSynOp {
    pub fn new(upstream: Box<dyn EventIter>, weight: f32, tau_s_ns: i64) -> Self {
        Self {
            upstream,
            weight,
            tau_s_ns,
        }
    }
}

impl EventIter for ExpSynOp {
    fn next_event(&mut self) -> Option<Event> {
        let input = self.upstream.next_event()?;
        let mut meta = input.meta.unwrap_or_default();
        meta.insert("syn".to_string(), MetaValue::Str("exp".to_string()));
        meta.insert("tau_s".to_string(), MetaValue::Int(self.tau_s_ns));
        Some(Event::with_meta(
            input.t,
            input.c,
            self.weight * input.v,
            meta,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecEventIter;

    #[test]
    fn scales_value_and_tags_meta() {
        let mut op = ExpSynOp::new(
            Box::new(VecEventIter::new(vec![Event::new(5, 0, 2.0)])),
            1.5,
            5_000_000,
        );
        let out = op.next_event().unwrap();
        assert_eq!(out.v, 3.0);
        assert_eq!(out.t, 5);
        assert_eq!(out.meta_str("syn"), Some("exp"));
    }
}
