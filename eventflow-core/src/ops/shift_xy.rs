//! Spatial shift (`spec.md` §4.3 "ShiftXY"). The channel is decoded back to
//! `(x, y) = (c mod w, c div w)`, shifted, clamped into bounds, and
//! re-encoded.

use crate::event::{Event, EventIter};

pub struct ShiftXyOp {
    upstream: Box<dyn EventIter>,
    dx: i64,
    dy: i64,
    width: i64,
    height: i64,
}

impl ShiftXyOp {
    pub fn new(upstream: Box<dyn EventIter>, dx: i32, dy: i32, width: u32, height: u32) -> Self {
        Self {
            upstream,
            dx: dx as i64,
            dy: dy as i64,
            width: width as i64,
            height: height as i64,
        }
    }
}

impl EventIter for ShiftXyOp {
    fn next_event(&mut self) -> Option<Event> {
        let input = self.upstream.next_event()?;
        let x = input.c % self.width;
        let y = input.c / self.width;
        let shifted_x = (x + self.dx).clamp(0, self.width - 1);
        let shifted_y = (y + self.dy).clamp(0, self.height - 1);
        let channel = shifted_y * self.width + shifted_x;
        Some(Event {
            c: channel,
            ..input
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecEventIter;

    #[test]
    fn shifts_within_bounds() {
        // width=4, c=5 => x=1,y=1; shift (+1,0) => x=2,y=1 => c=6.
        let mut op = ShiftXyOp::new(
            Box::new(VecEventIter::new(vec![Event::new(0, 5, 1.0)])),
            1,
            0,
            4,
            4,
        );
        assert_eq!(op.next_event().unwrap().c, 6);
    }

    #[test]
    fn clamps_to_bounds() {
        // width=4,height=4, c=3 => x=3,y=0; shift (+1,0) clamps x to 3.
        let mut op = ShiftXyOp::new(
            Box::new(VecEventIter::new(vec![Event::new(0, 3, 1.0)])),
            1,
            0,
            4,
            4,
        );
        assert_eq!(op.next_event().unwrap().c, 3);

        // c=0 => x=0,y=0; shift (-1,-1) clamps both to 0.
        let mut op2 = ShiftXyOp::new(
            Box::new(VecEventIter::new(vec![Event::new(0, 0, 1.0)])),
            -1,
            -1,
            4,
            4,
        );
        assert_eq!(op2.next_event().unwrap().c, 0);
    }
}
