//! Coincidence fuse (`spec.md` §4.3 "Coincidence fuse") — temporal AND of
//! two streams within a sliding window. On exact time ties, stream `a` is
//! processed before stream `b` (`spec.md` §5 "Ordering guarantees").

use std::collections::VecDeque;

use crate::event::{Event, EventIter, EventMeta, MetaValue};

enum Side {
    A,
    B,
}

pub struct FuseOp {
    a: Box<dyn EventIter>,
    b: Box<dyn EventIter>,
    peek_a: Option<Event>,
    peek_b: Option<Event>,
    window_ns: i64,
    min_count: u32,
    buf_a: VecDeque<i64>,
    buf_b: VecDeque<i64>,
}

impl FuseOp {
    pub fn new(a: Box<dyn EventIter>, b: Box<dyn EventIter>, window_ns: i64, min_count: u32) -> Self {
        Self {
            a,
            b,
            peek_a: None,
            peek_b: None,
            window_ns,
            min_count,
            buf_a: VecDeque::new(),
            buf_b: VecDeque::new(),
        }
    }

    fn pull(&mut self) -> Option<(Side, Event)> {
        if self.peek_a.is_none() {
            self.peek_a = self.a.next_event();
        }
        if self.peek_b.is_none() {
            self.peek_b = self.b.next_event();
        }
        match (&self.peek_a, &self.peek_b) {
            (Some(ea), Some(eb)) => {
                if ea.t <= eb.t {
                    Some((Side::A, self.peek_a.take().unwrap()))
                } else {
                    Some((Side::B, self.peek_b.take().unwrap()))
                }
            }
            (Some(_), None) => Some((Side::A, self.peek_a.take().unwrap())),
            (None, Some(_)) => Some((Side::B, self.peek_b.take().unwrap())),
            (None, None) => None,
        }
    }
}

impl EventIter for FuseOp {
    fn next_event(&mut self) -> Option<Event> {
        loop {
            let (side, event) = self.pull()?;
            let t = event.t;
            match side {
                Side::A => self.buf_a.push_back(t),
                Side::B => self.buf_b.push_back(t),
            }
            let floor = t - self.window_ns;
            while matches!(self.buf_a.front(), Some(&front) if front < floor) {
                self.buf_a.pop_front();
            }
            while matches!(self.buf_b.front(), Some(&front) if front < floor) {
                self.buf_b.pop_front();
            }
            if !self.buf_a.is_empty()
                && !self.buf_b.is_empty()
                && (self.buf_a.len() + self.buf_b.len()) as u32 >= self.min_count
            {
                let mut meta = EventMeta::new();
                meta.insert(
                    "unit".to_string(),
                    MetaValue::Str("coincidence".to_string()),
                );
                return Some(Event::with_meta(t, 0, 1.0, meta));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecEventIter;

    fn stream(ts: &[i64]) -> Box<dyn EventIter> {
        Box::new(VecEventIter::new(
            ts.iter().map(|&t| Event::new(t, 0, 1.0)).collect(),
        ))
    }

    #[test]
    fn identical_streams_emit_at_every_shared_timestamp() {
        // spec.md §8 scenario 3.
        let mut op = FuseOp::new(stream(&[0, 100, 200]), stream(&[0, 100, 200]), 50, 2);
        let mut out = Vec::new();
        while let Some(e) = op.next_event() {
            out.push(e.t);
        }
        assert_eq!(out, vec![0, 100, 200]);
    }

    #[test]
    fn disjoint_streams_wider_than_window_emit_nothing() {
        let mut op = FuseOp::new(stream(&[0]), stream(&[1000]), 10, 1);
        assert!(op.next_event().is_none());
    }

    #[test]
    fn min_count_one_with_single_simultaneous_event_emits_once() {
        let mut op = FuseOp::new(stream(&[5]), stream(&[5]), 50, 1);
        assert!(op.next_event().is_some());
        assert!(op.next_event().is_none());
    }
}
