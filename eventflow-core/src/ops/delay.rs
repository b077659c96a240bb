//! Delay line (`spec.md` §4.3 "Delay") — shifts every timestamp by a fixed
//! offset; order is preserved because the shift is constant.

use crate::event::{Event, EventIter};

pub struct DelayOp {
    upstream: Box<dyn EventIter>,
    delay_ns: i64,
}

impl DelayOp {
    pub fn new(upstream: Box<dyn EventIter>, delay_ns: i64) -> Self {
        Self { upstream, delay_ns }
    }
}

impl EventIter for DelayOp {
    fn next_event(&mut self) -> Option<Event> {
        let input = self.upstream.next_event()?;
        Some(Event {
            t: input.t + self.delay_ns,
            ..input
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecEventIter;

    #[test]
    fn shifts_every_timestamp() {
        let mut op = DelayOp::new(
            Box::new(VecEventIter::new(vec![
                Event::new(0, 0, 1.0),
                Event::new(10, 0, 2.0),
            ])),
            5,
        );
        assert_eq!(op.next_event().unwrap().t, 5);
        assert_eq!(op.next_event().unwrap().t, 15);
        assert!(op.next_event().is_none());
    }
}
