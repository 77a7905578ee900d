//! Instrument descriptors and the built-in instrument catalogue.
//!
//! An instrument is a plain value descriptor: a display name, a voice
//! policy, the oscillator shapes its panel offers, the octave span of its
//! keyboard, and a config builder that gives the instrument its envelope
//! character. Selecting an instrument never creates a sound source by
//! itself; the store does that when it mounts the selection.

use crate::registry::{Descriptor, Registry};
use crate::synth::{Curve, Oscillator, Polyphony, SynthConfig};

#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub name: &'static str,
    pub polyphony: Polyphony,
    /// Oscillator options shown by the instrument panel; the first one is
    /// the default.
    pub oscillators: &'static [Oscillator],
    /// Inclusive octave span of the on-screen keyboard.
    pub octave_start: u8,
    pub octave_end: u8,
    /// Builds the sound-source configuration for a chosen oscillator.
    pub build_config: fn(Oscillator) -> SynthConfig,
}

impl Descriptor for Instrument {
    fn name(&self) -> &str {
        self.name
    }
}

impl Instrument {
    pub fn default_oscillator(&self) -> Oscillator {
        self.oscillators[0]
    }

    pub fn default_config(&self) -> SynthConfig {
        (self.build_config)(self.default_oscillator())
    }
}

fn piano_config(oscillator: Oscillator) -> SynthConfig {
    // Percussive: instant attack, long exponential decay, no sustain.
    SynthConfig {
        oscillator,
        volume: 0.6,
        attack: 0.005,
        attack_curve: Curve::Linear,
        decay: 1.2,
        decay_curve: Curve::Exponential,
        sustain: 0.0,
        release: 0.3,
        release_curve: Curve::Exponential,
    }
}

fn flute_config(oscillator: Oscillator) -> SynthConfig {
    // Breathy: slow cosine attack, exponential decay down to silence.
    SynthConfig {
        oscillator,
        volume: 0.8,
        attack: 0.8,
        attack_curve: Curve::Cosine,
        decay: 1.0,
        decay_curve: Curve::Exponential,
        sustain: 0.0,
        release: 0.5,
        release_curve: Curve::Exponential,
    }
}

pub const PIANO: Instrument = Instrument {
    name: "Piano",
    polyphony: Polyphony::Polyphonic,
    oscillators: &[
        Oscillator::Sine,
        Oscillator::Triangle,
        Oscillator::Square,
        Oscillator::Sawtooth,
        Oscillator::Fat,
    ],
    octave_start: 2,
    octave_end: 5,
    build_config: piano_config,
};

pub const FLUTE: Instrument = Instrument {
    name: "Flute",
    // The flute reuses one voice across all keys.
    polyphony: Polyphony::LastNoteWins,
    oscillators: &[Oscillator::Fat, Oscillator::Sine, Oscillator::Triangle],
    octave_start: 2,
    octave_end: 4,
    build_config: flute_config,
};

/// The startup catalogue. Extending it means editing this list.
pub fn builtin_instruments() -> Registry<Instrument> {
    let mut registry = Registry::new();
    for instrument in [PIANO, FLUTE] {
        registry
            .register(instrument)
            .expect("built-in instrument names are unique");
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_in_order() {
        let registry = builtin_instruments();
        let names: Vec<_> = registry.list().iter().map(|i| i.name).collect();
        assert_eq!(names, ["Piano", "Flute"]);
    }

    #[test]
    fn builtin_configs_validate() {
        for instrument in builtin_instruments().list() {
            for &oscillator in instrument.oscillators {
                (instrument.build_config)(oscillator)
                    .validate()
                    .expect("built-in config is valid");
            }
        }
    }
}
