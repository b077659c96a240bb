//! Mel filterbank (`spec.md` §4.3 "Mel filterbank"). Triangular filters are
//! left unnormalized — the mel-normalization Open Question is decided "no"
//! (`SPEC_FULL.md` §4.3, confirmed by `build_mel_filters` in the original).

use std::collections::VecDeque;

use crate::event::{Event, EventIter, EventMeta, MetaValue};

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Builds `n_mels` triangular filters over `n_bins = n_fft/2 + 1` STFT
/// magnitude bins, each a plain linear ramp (no area normalization).
fn build_filters(n_fft: usize, n_mels: usize, sr: f64, fmin_hz: f64, fmax_hz: f64) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let mel_lo = hz_to_mel(fmin_hz);
    let mel_hi = hz_to_mel(fmax_hz);
    let points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_lo + (mel_hi - mel_lo) * i as f64 / (n_mels + 1) as f64)
        .map(mel_to_hz)
        .map(|hz| (n_fft + 1) as f64 * hz / sr)
        .collect();

    (0..n_mels)
        .map(|m| {
            let left = points[m];
            let center = points[m + 1];
            let right = points[m + 2];
            (0..n_bins)
                .map(|k| {
                    let k = k as f64;
                    if k <= left || k >= right {
                        0.0
                    } else if k <= center {
                        if center > left {
                            ((k - left) / (center - left)) as f32
                        } else {
                            0.0
                        }
                    } else if right > center {
                        ((right - k) / (right - center)) as f32
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

pub struct MelOp {
    upstream: Box<dyn EventIter>,
    filters: Vec<Vec<f32>>,
    n_bins: usize,
    log: bool,
    frame_t: Option<i64>,
    frame_bins: Vec<f32>,
    pending: VecDeque<Event>,
    done: bool,
}

impl MelOp {
    pub fn new(
        upstream: Box<dyn EventIter>,
        n_fft: usize,
        n_mels: usize,
        sample_rate_hz: f64,
        fmin_hz: f64,
        fmax_hz: f64,
        log: bool,
    ) -> Self {
        let n_bins = n_fft / 2 + 1;
        Self {
            upstream,
            filters: build_filters(n_fft, n_mels, sample_rate_hz, fmin_hz, fmax_hz),
            n_bins,
            log,
            frame_t: None,
            frame_bins: vec![0.0; n_bins],
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn emit_frame(&mut self, t: i64) {
        for (m, filter) in self.filters.iter().enumerate() {
            let mut energy = 0.0f32;
            for (k, &w) in filter.iter().enumerate() {
                energy += self.frame_bins[k] * w;
            }
            if self.log {
                energy = energy.max(1e-12).ln();
            }
            let mut meta = EventMeta::new();
            meta.insert("unit".to_string(), MetaValue::Str("mel".to_string()));
            self.pending.push_back(Event::with_meta(t, m as i64, energy, meta));
        }
        self.frame_bins = vec![0.0; self.n_bins];
    }

    fn fill_pending(&mut self) {
        while self.pending.is_empty() && !self.done {
            match self.upstream.next_event() {
                Some(e) => {
                    match self.frame_t {
                        None => {
                            self.frame_t = Some(e.t);
                        }
                        Some(t) if t != e.t => {
                            self.emit_frame(t);
                            self.frame_t = Some(e.t);
                        }
                        _ => {}
                    }
                    let bin = e.c as usize;
                    if bin < self.frame_bins.len() {
                        self.frame_bins[bin] = e.v;
                    }
                }
                None => {
                    if let Some(t) = self.frame_t.take() {
                        self.emit_frame(t);
                    }
                    self.done = true;
                }
            }
        }
    }
}

impl EventIter for MelOp {
    fn next_event(&mut self) -> Option<Event> {
        if self.pending.is_empty() {
            self.fill_pending();
        }
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecEventIter;

    #[test]
    fn one_frame_of_bins_produces_n_mels_events() {
        let n_fft = 16;
        let n_bins = n_fft / 2 + 1;
        let bins: Vec<Event> = (0..n_bins as i64).map(|k| Event::new(1000, k, 1.0)).collect();
        let mut op = MelOp::new(
            Box::new(VecEventIter::new(bins)),
            n_fft,
            4,
            8000.0,
            0.0,
            4000.0,
            false,
        );
        let mut count = 0;
        while let Some(e) = op.next_event() {
            assert_eq!(e.t, 1000);
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn log_flag_applies_floor() {
        let n_fft = 16;
        let bins = vec![Event::new(0, 0, 0.0), Event::new(0, 1, 0.0)];
        let mut op = MelOp::new(Box::new(VecEventIter::new(bins)), n_fft, 1, 8000.0, 0.0, 4000.0, true);
        let e = op.next_event().unwrap();
        assert!(e.v.is_finite());
    }
}
