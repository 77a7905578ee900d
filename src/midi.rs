//! MIDI input: note on/off messages drive the live sound source.

use std::sync::Arc;

use midir::{Ignore, MidiInput};
use tracing::{debug, error, info, warn};

use crate::audio::EngineShared;
use crate::music;
use crate::state::RELEASE_SECS;

/// Starts the MIDI listener task. Notes land on whatever sound source is
/// live; with none mounted they are ignored.
pub async fn run_midi_listener(shared: Arc<EngineShared>) {
    tokio::task::spawn_blocking(move || {
        // Initialize MIDI input
        let mut midi_input = match MidiInput::new("MIDI Input") {
            Ok(input) => input,
            Err(e) => {
                error!("Failed to create MIDI input: {}", e);
                return;
            }
        };
        midi_input.ignore(Ignore::None); // Capture all MIDI events

        // List available MIDI ports
        let in_ports = midi_input.ports();
        if in_ports.is_empty() {
            warn!("No MIDI input devices found!");
            return;
        }

        info!("Available MIDI input ports:");
        for (i, port) in in_ports.iter().enumerate() {
            info!(
                "Port {}: {}",
                i,
                midi_input.port_name(port).unwrap_or_else(|_| "Unknown".to_string())
            );
        }

        // Select the first available port
        let in_port = &in_ports[0];
        info!(
            "Using MIDI input: {}",
            midi_input.port_name(in_port).unwrap_or_else(|_| "Unknown".to_string())
        );

        // Connect to the selected MIDI port
        let conn = midi_input.connect(
            in_port,
            "MIDI Listener",
            move |_, message, shared| {
                if message.len() >= 3 {
                    let status = message[0] & 0xF0;
                    let note = message[1];
                    let velocity = message[2];
                    let pitch = music::midi_to_pitch(note);
                    let mut source = shared.source.lock().unwrap();

                    match (status, velocity) {
                        (0x90, v) if v > 0 => {
                            // Note On
                            if let Some(synth) = source.as_mut() {
                                synth.attack(&pitch);
                            }
                            debug!("Note On: pitch={}, velocity={}", pitch, velocity);
                        }
                        (0x80, _) | (0x90, 0) => {
                            // Note Off
                            if let Some(synth) = source.as_mut() {
                                synth.release(&pitch, RELEASE_SECS);
                            }
                            debug!("Note Off: pitch={}", pitch);
                        }
                        _ => {
                            debug!("Unhandled MIDI message: {:?}", message);
                        }
                    }
                }
            },
            shared,
        );

        let _conn = match conn {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to MIDI input device: {}", e);
                return;
            }
        };

        info!("MIDI listener connected and running");

        // Keep the thread alive to listen for MIDI events
        loop {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    })
    .await
    .expect("Failed to run MIDI listener");
}
