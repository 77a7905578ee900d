//! Visualizer descriptors and the built-in visualizer catalogue.
//!
//! A visualizer pairs a display name with a pure draw step: a function from
//! one sample snapshot to plot geometry. Keeping the draw step free of UI
//! types makes every visualizer testable without a window, and lets the
//! render loop stop a failing one without touching the frontend.

use crate::error::Error;
use crate::registry::{Descriptor, Registry};
use crate::sampler::SampleKind;

/// Reusable plot geometry filled by a draw step each frame.
#[derive(Debug, Clone, Default)]
pub struct PlotShape {
    pub points: Vec<[f64; 2]>,
    /// Plot bounds as `[min_x, min_y, max_x, max_y]`.
    pub bounds: [f64; 4],
}

pub type DrawFn = fn(&[f32], &mut PlotShape) -> Result<(), Error>;

#[derive(Debug, Clone, Copy)]
pub struct Visualizer {
    pub name: &'static str,
    /// Which snapshot domain this visualizer consumes.
    pub kind: SampleKind,
    pub draw: DrawFn,
}

impl Descriptor for Visualizer {
    fn name(&self) -> &str {
        self.name
    }
}

/// Amplitudes over sample index. Idle state: a flat line at zero.
fn draw_waveform(snapshot: &[f32], shape: &mut PlotShape) -> Result<(), Error> {
    shape.points.clear();
    shape
        .points
        .extend(snapshot.iter().enumerate().map(|(i, &v)| [i as f64, v as f64]));
    shape.bounds = [0.0, -1.1, snapshot.len() as f64, 1.1];
    Ok(())
}

/// The waveform bent around a unit circle, radius modulated by amplitude.
/// Idle state: the unit circle itself.
fn draw_circle(snapshot: &[f32], shape: &mut PlotShape) -> Result<(), Error> {
    shape.points.clear();
    let n = snapshot.len().max(1) as f64;
    for (i, &v) in snapshot.iter().enumerate() {
        let angle = std::f64::consts::TAU * i as f64 / n;
        let radius = 1.0 + 0.5 * v as f64;
        shape.points.push([radius * angle.cos(), radius * angle.sin()]);
    }
    // Close the ring.
    if let Some(&first) = shape.points.first() {
        shape.points.push(first);
    }
    shape.bounds = [-1.6, -1.6, 1.6, 1.6];
    Ok(())
}

/// Frequency bins over bin index. Idle state: all-zero bins.
fn draw_spectrum(snapshot: &[f32], shape: &mut PlotShape) -> Result<(), Error> {
    shape.points.clear();
    shape
        .points
        .extend(snapshot.iter().enumerate().map(|(i, &v)| [i as f64, v as f64]));
    let peak = snapshot.iter().fold(0.0f32, |acc, &v| acc.max(v)) as f64;
    shape.bounds = [0.0, 0.0, snapshot.len() as f64, peak.max(0.05) * 1.1];
    Ok(())
}

pub const WAVEFORM: Visualizer = Visualizer {
    name: "Waveform",
    kind: SampleKind::Waveform,
    draw: draw_waveform,
};

pub const CIRCLE: Visualizer = Visualizer {
    name: "Circle",
    kind: SampleKind::Waveform,
    draw: draw_circle,
};

pub const SPECTRUM: Visualizer = Visualizer {
    name: "Spectrum",
    kind: SampleKind::Spectrum,
    draw: draw_spectrum,
};

/// The startup catalogue. Extending it means editing this list.
pub fn builtin_visualizers() -> Registry<Visualizer> {
    let mut registry = Registry::new();
    for visualizer in [WAVEFORM, CIRCLE, SPECTRUM] {
        registry
            .register(visualizer)
            .expect("built-in visualizer names are unique");
    }
    registry
}
