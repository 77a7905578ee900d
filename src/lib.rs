//! Synthboard: virtual instruments with live audio visualization.
//!
//! The core is a small signal pipeline: a sound source ([`synth::Synth`])
//! renders audio through the cpal engine ([`audio`]), a sampler
//! ([`sampler::Sampler`]) taps the output at frame rate, and the render
//! loop ([`render_loop::RenderLoop`]) feeds snapshots to the active
//! visualizer's draw step. The store ([`state::Store`]) holds the
//! instrument/visualizer registries and orchestrates selections so that at
//! most one sound source and one render loop are ever live.

pub mod audio;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod music;
pub mod registry;
pub mod render_loop;
pub mod sampler;
pub mod state;
pub mod synth;
pub mod ui;
pub mod visualizer;
