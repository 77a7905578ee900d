//! Sound source: a small polyphonic synthesizer controlled through
//! attack/release on named pitches.
//!
//! A [`Synth`] is the live sound-source instance owned by the application
//! store. The audio engine pulls one mono sample at a time from it inside
//! the output-stream callback; nothing here blocks or allocates per sample.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use tracing::debug;

use crate::error::Error;
use crate::music;

/// Oscillator shapes selectable per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Three slightly detuned sines summed, for a thicker tone.
    Fat,
}

impl Oscillator {
    pub fn label(&self) -> &'static str {
        match self {
            Oscillator::Sine => "sine",
            Oscillator::Square => "square",
            Oscillator::Sawtooth => "sawtooth",
            Oscillator::Triangle => "triangle",
            Oscillator::Fat => "fat",
        }
    }
}

/// Envelope segment shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Exponential,
    Cosine,
}

/// Maps linear progress in [0, 1] onto the curve.
fn shaped(x: f32, curve: Curve) -> f32 {
    let x = x.clamp(0.0, 1.0);
    match curve {
        Curve::Linear => x,
        Curve::Exponential => x * x,
        Curve::Cosine => 0.5 * (1.0 - (PI * x).cos()),
    }
}

/// Sound-source configuration: oscillator shape, envelope timings and curve
/// shapes, and output volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub oscillator: Oscillator,
    /// Output volume in [0, 1].
    pub volume: f32,
    /// Attack time in seconds.
    pub attack: f32,
    pub attack_curve: Curve,
    /// Decay time in seconds.
    pub decay: f32,
    pub decay_curve: Curve,
    /// Sustain level in [0, 1].
    pub sustain: f32,
    /// Default release time in seconds, used when a release is not given an
    /// explicit decay delay.
    pub release: f32,
    pub release_curve: Curve,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            oscillator: Oscillator::Sine,
            volume: 0.5,
            attack: 0.01,
            attack_curve: Curve::Linear,
            decay: 0.2,
            decay_curve: Curve::Exponential,
            sustain: 0.7,
            release: 0.3,
            release_curve: Curve::Exponential,
        }
    }
}

impl SynthConfig {
    /// Checks timings and levels. Timings must be finite and non-negative;
    /// sustain and volume must lie in [0, 1].
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        for (name, value) in [("sustain", self.sustain), ("volume", self.volume)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Voice allocation policy for overlapping attacks on different pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polyphony {
    /// Independent voice per simultaneously held pitch.
    Polyphonic,
    /// A single voice reused across all keys; a new attack cuts the old
    /// note. Known limitation of instruments built around one shared voice.
    LastNoteWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Done,
}

/// One sounding pitch: oscillator phase plus envelope state machine.
#[derive(Debug, Clone)]
struct Voice {
    frequency: f32,
    phases: [f32; 3],
    stage: Stage,
    /// Linear progress through the current stage, in [0, 1].
    progress: f32,
    /// Envelope level at the last rendered sample.
    level: f32,
    /// Level captured when the release started.
    release_from: f32,
    release_secs: f32,
}

/// Frequency ratios for the `Fat` oscillator's detuned sine stack
/// (roughly -5/0/+5 cents).
const FAT_DETUNE: [f32; 3] = [0.9972, 1.0, 1.0028];

impl Voice {
    fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phases: [0.0; 3],
            stage: Stage::Attack,
            progress: 0.0,
            level: 0.0,
            release_from: 0.0,
            release_secs: 0.0,
        }
    }

    fn retrigger(&mut self) {
        self.stage = Stage::Attack;
        self.progress = 0.0;
    }

    fn release(&mut self, release_secs: f32) {
        if self.stage == Stage::Release || self.stage == Stage::Done {
            return;
        }
        self.release_from = self.level;
        self.release_secs = release_secs.max(0.001);
        self.stage = Stage::Release;
        self.progress = 0.0;
    }

    fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Advances the envelope by one sample and returns its current level.
    fn envelope(&mut self, config: &SynthConfig, sample_rate: f32) -> f32 {
        let step = |secs: f32| 1.0 / (secs.max(0.001) * sample_rate);
        self.level = match self.stage {
            Stage::Attack => {
                self.progress += step(config.attack);
                let level = shaped(self.progress, config.attack_curve);
                if self.progress >= 1.0 {
                    self.stage = Stage::Decay;
                    self.progress = 0.0;
                }
                level
            }
            Stage::Decay => {
                self.progress += step(config.decay);
                let fall = shaped(self.progress, config.decay_curve);
                let level = 1.0 - (1.0 - config.sustain) * fall;
                if self.progress >= 1.0 {
                    self.stage = Stage::Sustain;
                }
                level
            }
            Stage::Sustain => config.sustain,
            Stage::Release => {
                self.progress += step(self.release_secs);
                let fall = shaped(self.progress, config.release_curve);
                let level = self.release_from * (1.0 - fall);
                if self.progress >= 1.0 {
                    self.stage = Stage::Done;
                }
                level
            }
            Stage::Done => 0.0,
        };
        self.level
    }

    /// Advances oscillator phase and returns one raw waveform sample.
    fn oscillate(&mut self, oscillator: Oscillator, sample_rate: f32) -> f32 {
        let increment = self.frequency / sample_rate;
        for (phase, detune) in self.phases.iter_mut().zip(FAT_DETUNE) {
            *phase = (*phase + increment * detune) % 1.0;
        }
        let phase = self.phases[1];
        match oscillator {
            Oscillator::Sine => (2.0 * PI * phase).sin(),
            Oscillator::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Oscillator::Sawtooth => 2.0 * phase - 1.0,
            Oscillator::Triangle => (2.0 * phase - 1.0).abs() * 2.0 - 1.0,
            Oscillator::Fat => {
                self.phases
                    .iter()
                    .map(|p| (2.0 * PI * p).sin())
                    .sum::<f32>()
                    / 3.0
            }
        }
    }
}

/// The live sound-source instance. Construction validates the configuration;
/// `disconnect` retires it, after which attacks are ignored.
#[derive(Debug, Clone)]
pub struct Synth {
    config: SynthConfig,
    polyphony: Polyphony,
    voices: BTreeMap<String, Voice>,
    connected: bool,
}

impl Synth {
    pub fn new(config: SynthConfig, polyphony: Polyphony) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            polyphony,
            voices: BTreeMap::new(),
            connected: true,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn polyphony(&self) -> Polyphony {
        self.polyphony
    }

    /// True until `disconnect` is called.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True when no voice is sounding.
    pub fn is_silent(&self) -> bool {
        self.voices.is_empty()
    }

    /// Begins sounding the named pitch. Attacking an already-sounding pitch
    /// retriggers its envelope. Ignored after `disconnect` and for pitch
    /// names that do not parse.
    pub fn attack(&mut self, pitch: &str) {
        if !self.connected {
            debug!(pitch, "attack on retired sound source ignored");
            return;
        }
        let Some(frequency) = music::pitch_to_hz(pitch) else {
            debug!(pitch, "attack on unparseable pitch ignored");
            return;
        };
        if self.polyphony == Polyphony::LastNoteWins {
            self.voices.retain(|name, _| name.as_str() == pitch);
        }
        match self.voices.get_mut(pitch) {
            Some(voice) => voice.retrigger(),
            None => {
                self.voices.insert(pitch.to_string(), Voice::new(frequency));
            }
        }
    }

    /// Schedules the end of the named pitch over `release_secs`; a
    /// non-positive value falls back to the configured release time.
    /// Releasing an unknown or already-releasing pitch is a no-op.
    pub fn release(&mut self, pitch: &str, release_secs: f32) {
        let release_secs = if release_secs > 0.0 {
            release_secs
        } else {
            self.config.release
        };
        match self.polyphony {
            Polyphony::Polyphonic => {
                if let Some(voice) = self.voices.get_mut(pitch) {
                    voice.release(release_secs);
                }
            }
            // The single shared voice releases whatever is sounding, which
            // matches how the one-synth instruments behave.
            Polyphony::LastNoteWins => {
                for voice in self.voices.values_mut() {
                    voice.release(release_secs);
                }
            }
        }
    }

    /// Releases audio resources. Idempotent; the instance stays usable only
    /// as an inert handle (attacks are ignored, output is silence).
    pub fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.voices.clear();
        }
    }

    /// Renders the next mono output sample, mixing all active voices and
    /// clamping to [-1, 1]. Finished voices are dropped as they end.
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        if self.voices.is_empty() {
            return 0.0;
        }
        let mut mixed = 0.0;
        for voice in self.voices.values_mut() {
            let level = voice.envelope(&self.config, sample_rate);
            mixed += voice.oscillate(self.config.oscillator, sample_rate) * level;
        }
        self.voices.retain(|_, voice| !voice.is_done());
        (mixed * self.config.volume).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn test_synth(polyphony: Polyphony) -> Synth {
        let config = SynthConfig {
            attack: 0.01,
            decay: 0.05,
            sustain: 0.5,
            release: 0.1,
            ..SynthConfig::default()
        };
        Synth::new(config, polyphony).unwrap()
    }

    fn run(synth: &mut Synth, samples: usize) -> f32 {
        let mut peak: f32 = 0.0;
        for _ in 0..samples {
            peak = peak.max(synth.next_sample(SR).abs());
        }
        peak
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = SynthConfig::default();
        config.attack = -1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SynthConfig::default();
        config.sustain = 1.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SynthConfig::default();
        config.volume = f32::NAN;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        assert!(SynthConfig::default().validate().is_ok());
    }

    #[test]
    fn attack_then_release_produces_then_ends_sound() {
        let mut synth = test_synth(Polyphony::Polyphonic);
        synth.attack("C4");
        assert!(run(&mut synth, 4800) > 0.0);

        synth.release("C4", 0.05);
        // Past the release tail the voice is gone and output is silent.
        run(&mut synth, 4800);
        assert!(synth.is_silent());
        assert_eq!(synth.next_sample(SR), 0.0);
    }

    #[test]
    fn double_attack_and_double_release_are_harmless() {
        let mut synth = test_synth(Polyphony::Polyphonic);
        synth.attack("C4");
        synth.attack("C4");
        synth.release("C4", 0.3);
        synth.release("C4", 0.3);
        synth.release("G7", 0.3); // never attacked
        assert!(run(&mut synth, 100) >= 0.0);
    }

    #[test]
    fn polyphonic_synth_tracks_overlapping_pitches() {
        let mut synth = test_synth(Polyphony::Polyphonic);
        synth.attack("C4");
        synth.attack("E4");
        synth.attack("G4");
        assert_eq!(synth.voices.len(), 3);
        synth.release("E4", 0.01);
        run(&mut synth, 2400);
        assert_eq!(synth.voices.len(), 2);
    }

    #[test]
    fn last_note_wins_keeps_a_single_voice() {
        let mut synth = test_synth(Polyphony::LastNoteWins);
        synth.attack("C4");
        synth.attack("D4");
        synth.attack("E4");
        assert_eq!(synth.voices.len(), 1);
        assert!(synth.voices.contains_key("E4"));
    }

    #[test]
    fn disconnect_retires_the_source() {
        let mut synth = test_synth(Polyphony::Polyphonic);
        synth.attack("C4");
        synth.disconnect();
        assert!(!synth.is_connected());
        assert!(synth.is_silent());
        synth.attack("C4"); // ignored
        assert!(synth.is_silent());
        synth.disconnect(); // idempotent
    }

    #[test]
    fn envelope_reaches_sustain_level() {
        let config = SynthConfig {
            oscillator: Oscillator::Square,
            attack: 0.001,
            decay: 0.001,
            sustain: 0.5,
            volume: 1.0,
            ..SynthConfig::default()
        };
        let mut synth = Synth::new(config, Polyphony::Polyphonic).unwrap();
        synth.attack("A4");
        // Run well past attack+decay; a square wave's magnitude then equals
        // the sustain level on every sample.
        let mut last = 0.0;
        for _ in 0..4800 {
            last = synth.next_sample(SR).abs();
        }
        assert!((last - 0.5).abs() < 0.05, "sustained magnitude {last}");
    }
}
