//! Audio output engine.
//!
//! Owns the cpal output stream. Each stream callback pulls samples from the
//! live sound source (if any) and mirrors the first `TAP_LEN` mono samples
//! into the shared waveform tap that samplers read at frame rate.

use std::sync::{Arc, Mutex};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Sample, StreamConfig,
};
use tracing::{error, info};

use crate::synth::Synth;

/// Length of the waveform tap, in mono samples.
pub const TAP_LEN: usize = 1024;

/// Audio-side state shared between the store, the samplers, and the output
/// stream callback.
#[derive(Debug)]
pub struct EngineShared {
    /// The live sound source. `None` until an instrument is selected.
    pub source: Mutex<Option<Synth>>,

    /// Most recent mono output samples, for visualization.
    pub tap: Mutex<Vec<f32>>,
}

impl EngineShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            source: Mutex::new(None),
            tap: Mutex::new(vec![0.0; TAP_LEN]),
        })
    }
}

/// Starts the audio engine task.
pub async fn run_audio_engine(shared: Arc<EngineShared>) {
    tokio::task::spawn_blocking(move || {
        // Initialize the audio host and device
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(device) => {
                info!(
                    "Default output device found: {}",
                    device.name().unwrap_or_else(|_| "Unknown".to_string())
                );
                device
            }
            None => {
                error!("No output device found");
                return;
            }
        };

        // Get supported stream configuration
        let supported_config = match device.default_output_config() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to get default output config: {}", e);
                return;
            }
        };

        let config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: supported_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        info!("Audio stream configuration: {:?}", config);

        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0 as f32;

        // Start the audio stream
        let stream = match device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_stream(data, &shared, channels, sample_rate);
            },
            |err| {
                error!("An error occurred on the audio stream: {}", err);
            },
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to build audio stream: {}", e);
                return;
            }
        };

        info!("Starting audio stream...");
        if let Err(e) = stream.play() {
            error!("Failed to play audio stream: {}", e);
            return;
        }

        // Keep the thread alive to play audio indefinitely
        loop {
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    })
    .await
    .expect("Failed to run audio engine");
}

/// Fills one output buffer from the live sound source and refreshes the
/// waveform tap. With no source (or a silent one) the output is zeroed, so
/// samplers see a baseline snapshot rather than stale data.
fn render_stream(data: &mut [f32], shared: &EngineShared, channels: usize, sample_rate: f32) {
    let mut source = shared.source.lock().unwrap();
    let mut tap = shared.tap.lock().unwrap();

    tap.fill(0.0);
    let mut tap_index = 0;

    for frame in data.chunks_mut(channels.max(1)) {
        let value = match source.as_mut() {
            Some(synth) => synth.next_sample(sample_rate),
            None => 0.0,
        };

        for sample in frame.iter_mut() {
            *sample = Sample::from_sample(value);
        }

        if tap_index < tap.len() {
            tap[tap_index] = value;
            tap_index += 1;
        }
    }
}
