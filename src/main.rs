use anyhow::Context;
use clap::Parser;
use tracing::info;

use synthboard::audio::{run_audio_engine, EngineShared};
use synthboard::instrument::builtin_instruments;
use synthboard::midi::run_midi_listener;
use synthboard::state::Store;
use synthboard::ui::run_ui;
use synthboard::visualizer::builtin_visualizers;

#[derive(Debug, Parser)]
#[command(about = "Virtual instruments with live audio visualization")]
struct Args {
    /// Instrument to select at startup (defaults to the first registered).
    #[arg(long)]
    instrument: Option<String>,

    /// Visualizer to select at startup (defaults to the first registered).
    #[arg(long)]
    visualizer: Option<String>,

    /// List registered instruments and visualizers, then exit.
    #[arg(long)]
    list: bool,

    /// Run without the MIDI listener.
    #[arg(long)]
    no_midi: bool,

    /// Run without audio output (visualizers idle on silence).
    #[arg(long)]
    no_audio: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let instruments = builtin_instruments();
    let visualizers = builtin_visualizers();

    if args.list {
        println!("Instruments:");
        for instrument in instruments.list() {
            println!("  {}", instrument.name);
        }
        println!("Visualizers:");
        for visualizer in visualizers.list() {
            println!("  {}", visualizer.name);
        }
        return Ok(());
    }

    let shared = EngineShared::new();
    let mut store = Store::new(instruments, visualizers, shared.clone());

    if let Some(name) = &args.instrument {
        store
            .select_instrument(name)
            .with_context(|| format!("selecting instrument '{name}'"))?;
    }
    if let Some(name) = &args.visualizer {
        store
            .select_visualizer(name)
            .with_context(|| format!("selecting visualizer '{name}'"))?;
    }

    if !args.no_audio {
        tokio::spawn(run_audio_engine(shared.clone()));
    } else {
        info!("audio output disabled");
    }
    if !args.no_midi {
        tokio::spawn(run_midi_listener(shared.clone()));
    } else {
        info!("MIDI input disabled");
    }

    run_ui(store).map_err(|e| anyhow::anyhow!("UI error: {e}"))?;
    Ok(())
}
