//! egui front end: pickers, on-screen keyboard, oscillator buttons, and the
//! plot surface for the active visualizer.

use std::collections::HashSet;

use eframe::{App, CreationContext};
use egui::{CentralPanel, Color32, Context, TopBottomPanel};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};
use tracing::warn;

use crate::instrument::Instrument;
use crate::music;
use crate::registry::Selector;
use crate::state::{StateSnapshot, Store};

pub struct PlaygroundApp {
    store: Store,
    /// Keys currently held down on the on-screen keyboard.
    held: HashSet<String>,
}

impl PlaygroundApp {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            held: HashSet::new(),
        }
    }

    fn active_instrument(&self, state: &StateSnapshot) -> Option<Instrument> {
        let name = state.active_instrument.as_deref()?;
        self.store
            .instruments()
            .select(Selector::Name(name))
            .ok()
            .copied()
    }

    fn pickers(&mut self, ui: &mut egui::Ui, state: &StateSnapshot) {
        ui.horizontal(|ui| {
            let mut instrument = state.active_instrument.clone().unwrap_or_default();
            egui::ComboBox::from_label("Instrument")
                .selected_text(instrument.clone())
                .show_ui(ui, |ui| {
                    for name in &state.instruments {
                        ui.selectable_value(&mut instrument, name.clone(), name);
                    }
                });
            if !instrument.is_empty() && Some(instrument.as_str()) != state.active_instrument.as_deref()
            {
                if let Err(err) = self.store.select_instrument(&instrument) {
                    warn!("instrument selection rejected: {err}");
                }
                self.held.clear();
            }

            ui.separator();

            let mut visualizer = state.active_visualizer.clone().unwrap_or_default();
            egui::ComboBox::from_label("Visualizer")
                .selected_text(visualizer.clone())
                .show_ui(ui, |ui| {
                    for name in &state.visualizers {
                        ui.selectable_value(&mut visualizer, name.clone(), name);
                    }
                });
            if !visualizer.is_empty() && Some(visualizer.as_str()) != state.active_visualizer.as_deref()
            {
                if let Err(err) = self.store.select_visualizer(&visualizer) {
                    warn!("visualizer selection rejected: {err}");
                }
            }
        });
    }

    fn keyboard(&mut self, ui: &mut egui::Ui, state: &StateSnapshot) {
        let Some(instrument) = self.active_instrument(state) else {
            ui.label("No instrument selected");
            return;
        };
        ui.horizontal_wrapped(|ui| {
            for octave in instrument.octave_start..=instrument.octave_end {
                for note in music::FLAT_NAMES {
                    let pitch = format!("{note}{octave}");
                    let accidental = music::is_accidental(&pitch);
                    let fill = if accidental {
                        Color32::DARK_GRAY
                    } else {
                        Color32::from_gray(230)
                    };
                    let text = egui::RichText::new(&pitch).color(if accidental {
                        Color32::WHITE
                    } else {
                        Color32::BLACK
                    });
                    let response = ui.add(egui::Button::new(text).fill(fill));

                    // Attack on press, release (with the fixed decay delay)
                    // on let-go, tracked per key.
                    let down = response.is_pointer_button_down_on();
                    let was_down = self.held.contains(&pitch);
                    if down && !was_down {
                        self.store.note_on(&pitch);
                        self.held.insert(pitch);
                    } else if !down && was_down {
                        self.store.note_off(&pitch);
                        self.held.remove(&pitch);
                    }
                }
            }
        });
    }

    fn oscillator_row(&mut self, ui: &mut egui::Ui, state: &StateSnapshot) {
        let Some(instrument) = self.active_instrument(state) else {
            return;
        };
        ui.horizontal(|ui| {
            ui.label("Oscillator:");
            for &oscillator in instrument.oscillators {
                let active = state.active_oscillator == Some(oscillator);
                if ui.selectable_label(active, oscillator.label()).clicked() && !active {
                    if let Err(err) = self.store.set_oscillator(oscillator) {
                        warn!("oscillator change rejected: {err}");
                    }
                    self.held.clear();
                }
            }
        });
    }
}

impl App for PlaygroundApp {
    /// The update method is called every frame to update and render the UI.
    fn update(&mut self, ctx: &Context, _: &mut eframe::Frame) {
        ctx.request_repaint();
        let state = self.store.state();

        TopBottomPanel::top("pickers").show(ctx, |ui| {
            self.pickers(ui, &state);
        });

        TopBottomPanel::bottom("keyboard").show(ctx, |ui| {
            self.keyboard(ui, &state);
            self.oscillator_row(ui, &state);
        });

        // One render-loop tick per repaint: sample, then draw.
        let plotted = self
            .store
            .tick_frame()
            .map(|shape| (shape.points.clone(), shape.bounds));

        CentralPanel::default().show(ctx, |ui| {
            match state.active_visualizer.as_deref() {
                Some(name) => ui.heading(name),
                None => ui.heading("No visualizer selected"),
            };
            if let Some(err) = &state.draw_error {
                ui.colored_label(Color32::RED, err);
            }

            if let Some((points, bounds)) = plotted {
                let plot = Plot::new("visualizer")
                    .view_aspect(2.0)
                    .show_axes([false, false]);
                plot.show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [bounds[0], bounds[1]],
                        [bounds[2], bounds[3]],
                    ));
                    plot_ui.line(Line::new(PlotPoints::from(points)));
                });
            }
        });
    }
}

impl Drop for PlaygroundApp {
    fn drop(&mut self) {
        self.store.shutdown();
    }
}

/// Initializes and runs the eframe application.
pub fn run_ui(store: Store) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Synthboard",
        options,
        Box::new(|_cc: &CreationContext| Ok(Box::new(PlaygroundApp::new(store)))),
    )
}
