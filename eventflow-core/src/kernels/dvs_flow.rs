//! Columnar DVS flow kernel (`spec.md` §4.7 "DVS columnar flow (optional)").
//!
//! Behavior-equivalent to running `xy_to_ch → shift_xy(±1,0) → delay → fuse`
//! through the scheduler, but operating on struct-of-arrays per pixel
//! channel instead of materializing intermediate per-node event iterators —
//! the fast path this kernel exists for.

use std::collections::{BTreeMap, HashMap};

use crate::error::KernelError;
use crate::kernels::fuse_coincidence::fuse_coincidence;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DvsEvent {
    pub ts: i64,
    pub x: i32,
    pub y: i32,
    pub polarity: i8,
}

fn channel_of(x: i32, y: i32, width: i32) -> i64 {
    (y as i64) * width as i64 + x as i64
}

/// Runs the columnar DVS pipeline. `events` must be in non-decreasing `ts`
/// order (the same precondition the scheduler's input streams carry).
pub fn dvs_flow(
    events: &[DvsEvent],
    width: u32,
    height: u32,
    dx: i32,
    dy: i32,
    delay_ns: i64,
    window_ns: i64,
    min_count: i64,
) -> Result<Vec<DvsEvent>, KernelError> {
    let width = width as i32;
    let height = height as i32;

    // "a" branch: xy_to_ch with in-bounds events only (the original pixel).
    let mut a_by_channel: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    let mut a_polarity: HashMap<(i64, i64), i8> = HashMap::new();

    // "b" branch: xy_to_ch -> shift_xy(dx,dy) -> delay.
    let mut b_by_channel: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    let mut b_polarity: HashMap<(i64, i64), i8> = HashMap::new();

    for e in events {
        if e.x >= 0 && e.x < width && e.y >= 0 && e.y < height {
            let ch = channel_of(e.x, e.y, width);
            a_by_channel.entry(ch).or_default().push(e.ts);
            a_polarity.insert((ch, e.ts), e.polarity);
        }

        let shifted_x = (e.x + dx).clamp(0, width - 1);
        let shifted_y = (e.y + dy).clamp(0, height - 1);
        let ch = channel_of(shifted_x, shifted_y, width);
        let delayed_ts = e.ts + delay_ns;
        b_by_channel.entry(ch).or_default().push(delayed_ts);
        b_polarity.insert((ch, delayed_ts), e.polarity);
    }

    let mut channels: Vec<i64> = a_by_channel.keys().chain(b_by_channel.keys()).copied().collect();
    channels.sort_unstable();
    channels.dedup();

    let mut out = Vec::new();
    for ch in channels {
        let empty = Vec::new();
        let a_times = a_by_channel.get(&ch).unwrap_or(&empty);
        let b_times = b_by_channel.get(&ch).unwrap_or(&empty);
        // `b_times` is sorted because `delay` preserves order and events
        // are consumed in non-decreasing `ts`; same for `a_times`.
        let fused = fuse_coincidence(a_times, b_times, window_ns, min_count)?;
        let x = (ch % width as i64) as i32;
        let y = (ch / width as i64) as i32;
        for ts in fused {
            let polarity = a_polarity
                .get(&(ch, ts))
                .or_else(|| b_polarity.get(&(ch, ts)))
                .copied()
                .unwrap_or(0);
            out.push(DvsEvent { ts, x, y, polarity });
        }
    }

    out.sort_by(|l, r| (l.ts, l.x, l.y, l.polarity).cmp(&(r.ts, r.x, r.y, r.polarity)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_pixel_self_coincidence_with_zero_shift() {
        let events = vec![
            DvsEvent { ts: 0, x: 1, y: 1, polarity: 1 },
            DvsEvent { ts: 100, x: 1, y: 1, polarity: 1 },
        ];
        let out = dvs_flow(&events, 4, 4, 0, 0, 0, 50, 2).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| e.x == 1 && e.y == 1));
    }

    #[test]
    fn output_is_sorted_lexicographically() {
        let events = vec![
            DvsEvent { ts: 10, x: 0, y: 0, polarity: 1 },
            DvsEvent { ts: 0, x: 1, y: 1, polarity: -1 },
            DvsEvent { ts: 10, x: 0, y: 0, polarity: 1 },
            DvsEvent { ts: 0, x: 1, y: 1, polarity: -1 },
        ];
        let out = dvs_flow(&events, 4, 4, 0, 0, 0, 5, 2).unwrap();
        let mut sorted = out.clone();
        sorted.sort_by(|l, r| (l.ts, l.x, l.y, l.polarity).cmp(&(r.ts, r.x, r.y, r.polarity)));
        assert_eq!(out, sorted);
    }
}
