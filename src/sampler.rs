//! Signal sampler: frame-rate snapshots of the waveform tap.
//!
//! A sampler is a read-only view over [`EngineShared::tap`]. Each `sample`
//! call refreshes an internal scratch buffer and hands out a borrow of it,
//! so snapshots cannot be retained across frames and no per-frame
//! allocation happens.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::audio::{EngineShared, TAP_LEN};

/// Number of frequency bins in a spectrum snapshot.
pub const SPECTRUM_BINS: usize = TAP_LEN / 2;

/// Which domain a snapshot represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Time-domain amplitudes, `TAP_LEN` values in [-1, 1].
    Waveform,
    /// Hann-windowed FFT magnitudes, `SPECTRUM_BINS` values.
    Spectrum,
}

pub struct Sampler {
    shared: Arc<EngineShared>,
    kind: SampleKind,
    scratch: Vec<f32>,
    fft: Option<FftState>,
}

struct FftState {
    plan: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
}

impl Sampler {
    pub fn new(shared: Arc<EngineShared>, kind: SampleKind) -> Self {
        let (scratch_len, fft) = match kind {
            SampleKind::Waveform => (TAP_LEN, None),
            SampleKind::Spectrum => {
                let plan = FftPlanner::new().plan_fft_forward(TAP_LEN);
                (
                    SPECTRUM_BINS,
                    Some(FftState {
                        plan,
                        buffer: vec![Complex::new(0.0, 0.0); TAP_LEN],
                        window: (0..TAP_LEN).map(|i| hann(i, TAP_LEN)).collect(),
                    }),
                )
            }
        };
        Self {
            shared,
            kind,
            scratch: vec![0.0; scratch_len],
            fft,
        }
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Takes a fresh fixed-length snapshot of whatever is currently playing.
    /// Before any note has sounded this is all zeros.
    pub fn sample(&mut self) -> &[f32] {
        match self.kind {
            SampleKind::Waveform => {
                let tap = self.shared.tap.lock().unwrap();
                self.scratch.copy_from_slice(&tap);
            }
            SampleKind::Spectrum => {
                let fft = self.fft.as_mut().expect("spectrum sampler has a plan");
                {
                    let tap = self.shared.tap.lock().unwrap();
                    for (slot, (&value, &window)) in
                        fft.buffer.iter_mut().zip(tap.iter().zip(&fft.window))
                    {
                        *slot = Complex::new(value * window, 0.0);
                    }
                }
                fft.plan.process(&mut fft.buffer);
                for (bin, value) in self.scratch.iter_mut().zip(&fft.buffer) {
                    *bin = value.norm() / TAP_LEN as f32;
                }
            }
        }
        &self.scratch
    }
}

/// Hann window coefficient.
fn hann(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * std::f32::consts::PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_tap_gives_zero_snapshots() {
        let shared = EngineShared::new();
        let mut waveform = Sampler::new(shared.clone(), SampleKind::Waveform);
        let mut spectrum = Sampler::new(shared, SampleKind::Spectrum);

        assert_eq!(waveform.sample().len(), TAP_LEN);
        assert!(waveform.sample().iter().all(|&v| v == 0.0));
        assert_eq!(spectrum.sample().len(), SPECTRUM_BINS);
        assert!(spectrum.sample().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn waveform_snapshot_tracks_the_tap() {
        let shared = EngineShared::new();
        shared.tap.lock().unwrap()[7] = 0.25;
        let mut sampler = Sampler::new(shared.clone(), SampleKind::Waveform);
        assert_eq!(sampler.sample()[7], 0.25);

        // A later write shows up on the next read; snapshots are never stale.
        shared.tap.lock().unwrap()[7] = -0.5;
        assert_eq!(sampler.sample()[7], -0.5);
    }

    #[test]
    fn spectrum_peaks_at_the_driving_frequency() {
        let shared = EngineShared::new();
        {
            let mut tap = shared.tap.lock().unwrap();
            // 16 full cycles across the tap puts the peak in bin 16.
            for (i, slot) in tap.iter_mut().enumerate() {
                *slot =
                    (2.0 * std::f32::consts::PI * 16.0 * i as f32 / TAP_LEN as f32).sin();
            }
        }
        let mut sampler = Sampler::new(shared, SampleKind::Spectrum);
        let bins = sampler.sample();
        let peak = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
    }
}
