//! Short-time Fourier transform (`spec.md` §4.3 "STFT (deterministic
//! software)"). A direct DFT, not an FFT — the original implementation has
//! no FFT dependency either and the `n_fft` sizes in scope stay small
//! (`SPEC_FULL.md` §4.3).

use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::event::{Event, EventIter};
use crate::ir::types::WindowKind;

pub struct StftOp {
    upstream: Box<dyn EventIter>,
    n_fft: usize,
    hop_samples: usize,
    sample_rate_hz: f64,
    window: Vec<f64>,
    samples: Vec<f32>,
    next_start: usize,
    pending: VecDeque<Event>,
    exhausted: bool,
}

fn window_coeffs(kind: WindowKind, n: usize) -> Vec<f64> {
    match kind {
        WindowKind::Rect => vec![1.0; n],
        WindowKind::Hann => {
            if n <= 1 {
                vec![1.0; n]
            } else {
                (0..n)
                    .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n as f64 - 1.0)).cos())
                    .collect()
            }
        }
    }
}

impl StftOp {
    pub fn new(
        upstream: Box<dyn EventIter>,
        n_fft: usize,
        hop_samples: usize,
        sample_rate_hz: f64,
        window: WindowKind,
    ) -> Self {
        Self {
            upstream,
            n_fft,
            hop_samples: hop_samples.max(1),
            sample_rate_hz,
            window: window_coeffs(window, n_fft),
            samples: Vec::new(),
            next_start: 0,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Pulls upstream samples until either a complete frame is ready or
    /// the upstream is exhausted. No partial frames are ever emitted — the
    /// STFT partial-frame Open Question is decided "no" (`SPEC_FULL.md` §4.3).
    fn fill_pending(&mut self) {
        while self.pending.is_empty() && !self.exhausted {
            while self.samples.len() < self.next_start + self.n_fft {
                match self.upstream.next_event() {
                    Some(e) => self.samples.push(e.v),
                    None => {
                        self.exhausted = true;
                        return;
                    }
                }
            }
            let start = self.next_start;
            let frame = &self.samples[start..start + self.n_fft];
            let t_frame =
                ((start + self.n_fft) as f64 * 1e9 / self.sample_rate_hz).round() as i64;

            for k in 0..=(self.n_fft / 2) {
                let mut re = 0.0f64;
                let mut im = 0.0f64;
                for (n, &sample) in frame.iter().enumerate() {
                    let windowed = sample as f64 * self.window[n];
                    let angle = -2.0 * PI * k as f64 * n as f64 / self.n_fft as f64;
                    re += windowed * angle.cos();
                    im += windowed * angle.sin();
                }
                let magnitude = (re * re + im * im).sqrt() as f32;
                self.pending.push_back(Event::new(t_frame, k as i64, magnitude));
            }
            self.next_start += self.hop_samples;
        }
    }
}

impl EventIter for StftOp {
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

    fn sine_samples(freq_hz: f64, sr: f64, n: usize) -> Vec<Event> {
        (0..n)
            .map(|i| {
                let t = (i as f64 * 1e9 / sr).round() as i64;
                let v = (2.0 * PI * freq_hz * i as f64 / sr).sin() as f32;
                Event::new(t, 0, v)
            })
            .collect()
    }

    #[test]
    fn peak_bin_matches_expected_frequency() {
        // spec.md §8 scenario 4.
        let sr = 16_000.0;
        let n_fft = 128;
        let samples = sine_samples(1_000.0, sr, n_fft);
        let mut op = StftOp::new(
            Box::new(VecEventIter::new(samples)),
            n_fft,
            n_fft,
            sr,
            WindowKind::Rect,
        );
        let mut bins = vec![0.0f32; n_fft / 2 + 1];
        let mut any = false;
        while let Some(e) = op.next_event() {
            bins[e.c as usize] = e.v;
            any = true;
        }
        assert!(any);
        let peak = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let expected = (1000.0 * 128.0 / 16000.0_f64).round() as i64;
        assert!((peak as i64 - expected).abs() <= 1);
    }

    #[test]
    fn fewer_samples_than_n_fft_emits_no_frames() {
        let samples = vec![Event::new(0, 0, 1.0); 4];
        let mut op = StftOp::new(
            Box::new(VecEventIter::new(samples)),
            128,
            128,
            16_000.0,
            WindowKind::Hann,
        );
        assert!(op.next_event().is_none());
    }
}
