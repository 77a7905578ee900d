//! Application state store.
//!
//! Single source of truth for the registries, the active selections, and
//! the live sound source. Every successful mutation publishes a new
//! immutable [`StateSnapshot`] behind an `Arc`, so UI layers detect change
//! with `Arc::ptr_eq`. Failed operations publish nothing and leave all
//! state untouched.
//!
//! The sound-source slot in [`EngineShared`] is the only place a synth can
//! live, which structurally enforces the single-live-source invariant; the
//! store is the only writer of that slot.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audio::EngineShared;
use crate::error::Error;
use crate::instrument::Instrument;
use crate::registry::Registry;
use crate::render_loop::RenderLoop;
use crate::sampler::Sampler;
use crate::synth::{Oscillator, Synth};
use crate::visualizer::{PlotShape, Visualizer};

/// Fixed decay delay applied when a key or MIDI note is let go, matching
/// the instruments' short release tail.
pub const RELEASE_SECS: f32 = 0.30;

/// Immutable view of the application state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub instruments: Vec<String>,
    pub visualizers: Vec<String>,
    pub active_instrument: Option<String>,
    pub active_visualizer: Option<String>,
    pub active_oscillator: Option<Oscillator>,
    pub has_sound_source: bool,
    /// Set when a visualizer draw step failed and the render loop stopped;
    /// cleared by the next visualizer selection.
    pub draw_error: Option<String>,
}

pub struct Store {
    instruments: Registry<Instrument>,
    visualizers: Registry<Visualizer>,
    shared: Arc<EngineShared>,
    render_loop: RenderLoop,

    active_instrument: Option<usize>,
    active_visualizer: Option<usize>,
    active_oscillator: Option<Oscillator>,
    draw_error: Option<String>,

    snapshot: Arc<StateSnapshot>,
}

impl Store {
    /// Builds the store and default-selects the first entry of each
    /// registry, creating the initial sound source.
    pub fn new(
        instruments: Registry<Instrument>,
        visualizers: Registry<Visualizer>,
        shared: Arc<EngineShared>,
    ) -> Self {
        let mut store = Self {
            instruments,
            visualizers,
            shared,
            render_loop: RenderLoop::new(),
            active_instrument: None,
            active_visualizer: None,
            active_oscillator: None,
            draw_error: None,
            snapshot: Arc::new(StateSnapshot {
                instruments: Vec::new(),
                visualizers: Vec::new(),
                active_instrument: None,
                active_visualizer: None,
                active_oscillator: None,
                has_sound_source: false,
                draw_error: None,
            }),
        };
        if !store.instruments.is_empty() {
            let name = store.instruments.list()[0].name.to_string();
            // Built-in descriptors always mount cleanly.
            if let Err(err) = store.select_instrument(&name) {
                error!("default instrument '{name}' failed to mount: {err}");
            }
        }
        if !store.visualizers.is_empty() {
            let name = store.visualizers.list()[0].name.to_string();
            if let Err(err) = store.select_visualizer(&name) {
                error!("default visualizer '{name}' failed to mount: {err}");
            }
        }
        store.publish();
        store
    }

    /// The current immutable state snapshot.
    pub fn state(&self) -> Arc<StateSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn instruments(&self) -> &Registry<Instrument> {
        &self.instruments
    }

    pub fn visualizers(&self) -> &Registry<Visualizer> {
        &self.visualizers
    }

    /// Selects an instrument by display name, retiring the previous sound
    /// source and mounting a fresh one built from the instrument's default
    /// configuration. `NotFound` leaves everything unchanged.
    pub fn select_instrument(&mut self, name: &str) -> Result<(), Error> {
        let index = self
            .instruments
            .position(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let instrument = self.instruments.list()[index];
        let oscillator = instrument.default_oscillator();
        let synth = Synth::new((instrument.build_config)(oscillator), instrument.polyphony)?;

        self.retire_source();
        self.set_sound_source(synth);
        self.active_instrument = Some(index);
        self.active_oscillator = Some(oscillator);
        info!(instrument = name, "instrument selected");

        // The sound source changed, so rebind the render loop to it.
        self.restart_render_loop();
        self.publish();
        Ok(())
    }

    /// Selects a visualizer by display name and swaps the render loop to a
    /// sampler of the matching kind. Works with or without a live sound
    /// source; an idle source just yields baseline snapshots.
    pub fn select_visualizer(&mut self, name: &str) -> Result<(), Error> {
        let index = self
            .visualizers
            .position(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.active_visualizer = Some(index);
        self.draw_error = None;
        info!(visualizer = name, "visualizer selected");

        self.restart_render_loop();
        self.publish();
        Ok(())
    }

    /// Rebuilds the active instrument's sound source around a different
    /// oscillator shape, releasing the previous source first.
    pub fn set_oscillator(&mut self, oscillator: Oscillator) -> Result<(), Error> {
        let index = self
            .active_instrument
            .ok_or_else(|| Error::NotFound("no instrument selected".to_string()))?;
        let instrument = self.instruments.list()[index];
        if !instrument.oscillators.contains(&oscillator) {
            return Err(Error::InvalidConfig(format!(
                "{} does not offer the {} oscillator",
                instrument.name,
                oscillator.label()
            )));
        }
        let synth = Synth::new((instrument.build_config)(oscillator), instrument.polyphony)?;

        self.retire_source();
        self.set_sound_source(synth);
        self.active_oscillator = Some(oscillator);
        self.publish();
        Ok(())
    }

    /// Installs a sound source into the live slot and returns the displaced
    /// occupant, if any. The caller must retire the previous source first; a
    /// still-connected occupant is a resource leak, which is logged and then
    /// force-disconnected before it is handed back.
    pub fn set_sound_source(&mut self, synth: Synth) -> Option<Synth> {
        let mut slot = self.shared.source.lock().unwrap();
        let stale = slot.take().map(|mut stale| {
            if stale.is_connected() {
                warn!("sound source replaced without release; disconnecting stale instance");
                stale.disconnect();
            }
            stale
        });
        *slot = Some(synth);
        stale
    }

    /// Disconnects and drops the live sound source, if any.
    fn retire_source(&mut self) {
        if let Some(mut old) = self.shared.source.lock().unwrap().take() {
            old.disconnect();
        }
    }

    /// Begins sounding a pitch on the live source. A missing source (no
    /// instrument mounted yet) is a guarded no-op, never a crash.
    pub fn note_on(&mut self, pitch: &str) {
        match self.shared.source.lock().unwrap().as_mut() {
            Some(synth) => synth.attack(pitch),
            None => debug!(pitch, "note_on with no live sound source"),
        }
    }

    /// Schedules the end of a pitch with the fixed release delay.
    pub fn note_off(&mut self, pitch: &str) {
        if let Some(synth) = self.shared.source.lock().unwrap().as_mut() {
            synth.release(pitch, RELEASE_SECS);
        }
    }

    /// Per-frame entry point. Returns the plot geometry to render, or
    /// `None` while the loop is stopped. A draw failure is recorded in the
    /// snapshot and the loop stays stopped until the next selection.
    pub fn tick_frame(&mut self) -> Option<&PlotShape> {
        if let Err(err) = self.render_loop.tick() {
            error!("render loop stopped: {err}");
            self.draw_error = Some(err.to_string());
            self.publish();
            return None;
        }
        self.render_loop.shape()
    }

    /// Frames ticked by the currently attached pair, for diagnostics.
    pub fn frames(&self) -> u64 {
        self.render_loop.frames()
    }

    /// Tears everything down: render loop stopped, sound source retired.
    pub fn shutdown(&mut self) {
        self.render_loop.stop();
        self.retire_source();
        self.publish();
        info!("store shut down");
    }

    fn restart_render_loop(&mut self) {
        let Some(index) = self.active_visualizer else {
            return;
        };
        let visualizer = self.visualizers.list()[index];
        let sampler = Sampler::new(Arc::clone(&self.shared), visualizer.kind);
        self.render_loop.swap(sampler, visualizer);
        self.draw_error = None;
    }

    fn publish(&mut self) {
        let name_of_instrument =
            |index: usize| self.instruments.list()[index].name.to_string();
        let name_of_visualizer =
            |index: usize| self.visualizers.list()[index].name.to_string();
        self.snapshot = Arc::new(StateSnapshot {
            instruments: self
                .instruments
                .list()
                .iter()
                .map(|i| i.name.to_string())
                .collect(),
            visualizers: self
                .visualizers
                .list()
                .iter()
                .map(|v| v.name.to_string())
                .collect(),
            active_instrument: self.active_instrument.map(name_of_instrument),
            active_visualizer: self.active_visualizer.map(name_of_visualizer),
            active_oscillator: self.active_oscillator,
            has_sound_source: self.shared.source.lock().unwrap().is_some(),
            draw_error: self.draw_error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::builtin_instruments;
    use crate::visualizer::builtin_visualizers;

    fn test_store() -> Store {
        Store::new(
            builtin_instruments(),
            builtin_visualizers(),
            EngineShared::new(),
        )
    }

    #[test]
    fn defaults_select_the_first_of_each_registry() {
        let store = test_store();
        let state = store.state();
        assert_eq!(state.active_instrument.as_deref(), Some("Piano"));
        assert_eq!(state.active_visualizer.as_deref(), Some("Waveform"));
        assert!(state.has_sound_source);
    }

    #[test]
    fn selections_publish_new_snapshots() {
        let mut store = test_store();
        let before = store.state();
        store.select_instrument("Flute").unwrap();
        let after = store.state();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.active_instrument.as_deref(), Some("Flute"));
    }

    #[test]
    fn unknown_names_change_nothing() {
        let mut store = test_store();
        let before = store.state();
        assert!(matches!(
            store.select_instrument("Theremin"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.select_visualizer("Lava Lamp"),
            Err(Error::NotFound(_))
        ));
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn oscillator_change_rebuilds_the_source() {
        let mut store = test_store();
        store.set_oscillator(Oscillator::Square).unwrap();
        assert_eq!(
            store.state().active_oscillator,
            Some(Oscillator::Square)
        );
        // The flute panel does not offer a square oscillator.
        store.select_instrument("Flute").unwrap();
        assert!(matches!(
            store.set_oscillator(Oscillator::Square),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn replacing_a_connected_source_disconnects_the_stale_one() {
        use crate::synth::{Polyphony, SynthConfig};

        let mut store = test_store();
        store.note_on("C4");

        // Install over the live source without retiring it first. The
        // occupant counts as a leak: it must come back disconnected and
        // silenced, and the new source must be the only one live.
        let replacement =
            Synth::new(SynthConfig::default(), Polyphony::LastNoteWins).unwrap();
        let stale = store.set_sound_source(replacement).expect("slot was occupied");
        assert!(!stale.is_connected());
        assert!(stale.is_silent());

        let slot = store.shared.source.lock().unwrap();
        let live = slot.as_ref().expect("replacement is live");
        assert!(live.is_connected());
        assert_eq!(live.polyphony(), Polyphony::LastNoteWins);
    }

    #[test]
    fn notes_are_guarded_against_a_missing_source() {
        let mut store = Store::new(
            Registry::new(),
            builtin_visualizers(),
            EngineShared::new(),
        );
        assert!(!store.state().has_sound_source);
        store.note_on("C4"); // no-op, no panic
        store.note_off("C4");
    }

    #[test]
    fn shutdown_retires_everything() {
        let mut store = test_store();
        store.shutdown();
        let state = store.state();
        assert!(!state.has_sound_source);
        assert_eq!(store.frames(), 0);
        assert!(store.tick_frame().is_none());
    }
}
