//! XY→channel mapping (`spec.md` §4.3 "XY→channel"). Reads `x`/`y` from the
//! event metadata; events without in-bounds coordinates are dropped.

use crate::event::{Event, EventIter, MetaValue};

pub struct XyToChOp {
    upstream: Box<dyn EventIter>,
    width: i64,
    height: i64,
}

impl XyToChOp {
    pub fn new(upstream: Box<dyn EventIter>, width: u32, height: u32) -> Self {
        Self {
            upstream,
            width: width as i64,
            height: height as i64,
        }
    }
}

impl EventIter for XyToChOp {
    fn next_event(&mut self) -> Option<Event> {
        loop {
            let input = self.upstream.next_event()?;
            let x = input.meta_int("x");
            let y = input.meta_int("y");
            let (x, y) = match (x, y) {
                (Some(x), Some(y)) => (x, y),
                _ => continue,
            };
            if x < 0 || x >= self.width || y < 0 || y >= self.height {
                continue;
            }
            let mut meta = input.meta.clone().unwrap_or_default();
            meta.insert("w".to_string(), MetaValue::Int(self.width));
            meta.insert("h".to_string(), MetaValue::Int(self.height));
            let channel = y * self.width + x;
            return Some(Event::with_meta(input.t, channel, input.v, meta));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventMeta, VecEventIter};

    fn xy_event(t: i64, x: i64, y: i64) -> Event {
        let mut meta = EventMeta::new();
        meta.insert("x".to_string(), MetaValue::Int(x));
        meta.insert("y".to_string(), MetaValue::Int(y));
        Event::with_meta(t, 0, 1.0, meta)
    }

    #[test]
    fn maps_in_bounds_coordinates() {
        let mut op = XyToChOp::new(Box::new(VecEventIter::new(vec![xy_event(0, 2, 1)])), 4, 4);
        let out = op.next_event().unwrap();
        assert_eq!(out.c, 1 * 4 + 2);
    }

    #[test]
    fn drops_out_of_bounds_coordinates() {
        let mut op = XyToChOp::new(Box::new(VecEventIter::new(vec![xy_event(0, 10, 10)])), 4, 4);
        assert!(op.next_event().is_none());
    }
}
