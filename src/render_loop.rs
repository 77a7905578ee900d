//! Render loop controller.
//!
//! Exactly one (sampler, visualizer) pair is attached at a time. The UI
//! calls `tick` once per repaint; a tick samples first and draws second,
//! and a failing draw step detaches the pair so no further draws can fire.
//! All of this runs on the frame thread; `swap` carries a re-entrancy guard
//! since swapping is the only mutation path.

use tracing::{debug, warn};

use crate::error::Error;
use crate::sampler::Sampler;
use crate::visualizer::{PlotShape, Visualizer};

struct Attachment {
    sampler: Sampler,
    visualizer: Visualizer,
    shape: PlotShape,
    frames: u64,
}

#[derive(Default)]
pub struct RenderLoop {
    attached: Option<Attachment>,
    swapping: bool,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a pair and begins ticking. Any previously attached pair is
    /// detached first.
    pub fn start(&mut self, sampler: Sampler, visualizer: Visualizer) {
        self.stop();
        debug!(visualizer = visualizer.name, "render loop started");
        self.attached = Some(Attachment {
            sampler,
            visualizer,
            shape: PlotShape::default(),
            frames: 0,
        });
    }

    /// Detaches the current pair. Idempotent: stopping a stopped loop is a
    /// no-op. After this returns, no draw step of the old pair can run.
    pub fn stop(&mut self) {
        if let Some(attachment) = self.attached.take() {
            debug!(
                visualizer = attachment.visualizer.name,
                frames = attachment.frames,
                "render loop stopped"
            );
        }
    }

    /// Stop-then-start as one operation. Guarded against re-entry; a nested
    /// swap is rejected and logged rather than observed half-attached.
    pub fn swap(&mut self, sampler: Sampler, visualizer: Visualizer) {
        if self.swapping {
            warn!("render loop swap re-entered; ignoring nested swap");
            return;
        }
        self.swapping = true;
        self.start(sampler, visualizer);
        self.swapping = false;
    }

    pub fn is_running(&self) -> bool {
        self.attached.is_some()
    }

    /// Ticks completed since the current pair was attached.
    pub fn frames(&self) -> u64 {
        self.attached.as_ref().map_or(0, |a| a.frames)
    }

    /// One frame: take a snapshot, then run the draw step, strictly in that
    /// order. A no-op while stopped. A draw failure stops the loop and is
    /// returned for the store to surface.
    pub fn tick(&mut self) -> Result<(), Error> {
        let Some(attachment) = self.attached.as_mut() else {
            return Ok(());
        };
        let Attachment {
            sampler,
            visualizer,
            shape,
            frames,
        } = attachment;

        let snapshot = sampler.sample();
        match (visualizer.draw)(snapshot, shape) {
            Ok(()) => {
                *frames += 1;
                Ok(())
            }
            Err(err) => {
                let failure = Error::DrawFailure(format!(
                    "visualizer '{}' failed: {err}",
                    visualizer.name
                ));
                self.attached = None;
                Err(failure)
            }
        }
    }

    /// Geometry produced by the most recent tick, while attached.
    pub fn shape(&self) -> Option<&PlotShape> {
        self.attached.as_ref().map(|a| &a.shape)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::audio::EngineShared;
    use crate::sampler::SampleKind;
    use crate::visualizer::{DrawFn, WAVEFORM};

    static DRAWS_A: AtomicUsize = AtomicUsize::new(0);
    static DRAWS_B: AtomicUsize = AtomicUsize::new(0);

    fn counting_a(_: &[f32], _: &mut PlotShape) -> Result<(), Error> {
        DRAWS_A.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn counting_b(_: &[f32], _: &mut PlotShape) -> Result<(), Error> {
        DRAWS_B.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn failing(_: &[f32], _: &mut PlotShape) -> Result<(), Error> {
        Err(Error::DrawFailure("boom".into()))
    }

    fn visualizer(name: &'static str, draw: DrawFn) -> Visualizer {
        Visualizer {
            name,
            kind: SampleKind::Waveform,
            draw,
        }
    }

    fn sampler() -> Sampler {
        Sampler::new(EngineShared::new(), SampleKind::Waveform)
    }

    #[test]
    fn tick_while_stopped_is_a_noop() {
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.tick().is_ok());
        assert!(render_loop.shape().is_none());
        assert!(!render_loop.is_running());
    }

    #[test]
    fn stop_twice_is_idempotent() {
        let mut render_loop = RenderLoop::new();
        render_loop.start(sampler(), WAVEFORM);
        render_loop.stop();
        render_loop.stop();
        assert!(!render_loop.is_running());
        assert!(render_loop.tick().is_ok());
        assert!(render_loop.shape().is_none());
    }

    #[test]
    fn ticks_sample_then_draw_and_count_frames() {
        let mut render_loop = RenderLoop::new();
        render_loop.start(sampler(), WAVEFORM);
        for _ in 0..3 {
            render_loop.tick().unwrap();
            let shape = render_loop.shape().unwrap();
            assert_eq!(shape.points.len(), crate::audio::TAP_LEN);
        }
        assert_eq!(render_loop.frames(), 3);
    }

    #[test]
    fn swap_detaches_the_old_draw_step() {
        let mut render_loop = RenderLoop::new();
        render_loop.start(sampler(), visualizer("A", counting_a));
        for _ in 0..3 {
            render_loop.tick().unwrap();
        }
        let before = DRAWS_A.load(Ordering::SeqCst);
        assert_eq!(before, 3);

        render_loop.swap(sampler(), visualizer("B", counting_b));
        for _ in 0..5 {
            render_loop.tick().unwrap();
        }
        // The old pair's counter stopped incrementing after the swap.
        assert_eq!(DRAWS_A.load(Ordering::SeqCst), before);
        assert_eq!(DRAWS_B.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn draw_failure_stops_the_loop() {
        let mut render_loop = RenderLoop::new();
        render_loop.start(sampler(), visualizer("Broken", failing));
        let err = render_loop.tick().unwrap_err();
        assert!(matches!(err, Error::DrawFailure(_)));
        assert!(!render_loop.is_running());
        // Not retried indefinitely: further ticks are no-ops.
        assert!(render_loop.tick().is_ok());
        assert!(render_loop.shape().is_none());
    }
}
