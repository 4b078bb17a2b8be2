use egui::{Align2, CentralPanel, Color32, FontId, RichText, Ui, Vec2};

use illusion::analysis::summary::summarize_by_level;
use illusion::config::{DisplayConfig, RatingScale};
use illusion::experiment::session::{Phase, Session, SessionEvent, TrialState};

use crate::ui::plots::level_plot;
use crate::ui::stimulus::draw_stimulus;

pub const SEIZURE_WARNING: &str = "WARNING: participating may potentially trigger seizures for \
people with photosensitive epilepsy. If you suspect you have photosensitive epilepsy or have a \
history of photosensitive epilepsy, please press the [No] button now.\n\nDo you wish to proceed?";

const INSTRUCTIONS: &str = "Keep your eyes on the black dot in the centre of the screen.\n\
A ring of lines will move for a few seconds.\n\
Afterwards, rate how strongly the ring appeared to rotate.\n\n\
Press [Space] to begin.";

const TEXT_SIZE: f32 = 24.0;

/// Widget state owned by the app between frames.
#[derive(Debug, Clone)]
pub struct UiState {
    pub initials: String,
    pub slider: f32,
    pub slider_touched: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            initials: String::new(),
            slider: 50.0,
            slider_touched: false,
        }
    }
}

impl UiState {
    pub fn reset_slider(&mut self) {
        self.slider = 50.0;
        self.slider_touched = false;
    }
}

fn centered_text(ui: &Ui, text: &str) {
    ui.painter().text(
        ui.max_rect().center(),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(TEXT_SIZE),
        Color32::BLACK,
    );
}

fn corner_note(ui: &Ui, text: &str) {
    let rect = ui.max_rect();
    ui.painter().text(
        rect.left_top() + Vec2::new(12.0, 12.0),
        Align2::LEFT_TOP,
        text,
        FontId::proportional(14.0),
        Color32::GRAY,
    );
}

/// Draw the screen for the current phase. Returns the events raised by
/// widgets this frame.
pub fn main_window(
    ctx: &egui::Context,
    session: &Session,
    display: &DisplayConfig,
    state: &mut UiState,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();

    CentralPanel::default()
        .frame(egui::Frame::default().fill(Color32::WHITE))
        .show(ctx, |ui| match session.phase() {
            Phase::Warning => warning_dialog(ctx, &mut events),
            Phase::Initials => initials_dialog(ctx, state, &mut events),
            Phase::Intro { block } => {
                let text = if block == 0 {
                    INSTRUCTIONS.to_string()
                } else {
                    format!(
                        "Part {} of {}.\n\nPress [Space] to continue.",
                        block + 1,
                        session.block_count()
                    )
                };
                centered_text(ui, &text);
            }
            Phase::Practice { .. } | Phase::Experimental { .. } => {
                trial_screen(ui, session, display, state, &mut events);
            }
            Phase::Rest { block } => {
                centered_text(
                    ui,
                    &format!(
                        "Part {} of {} complete. Take a short break.\n\nPress [Space] to continue.",
                        block + 1,
                        session.block_count()
                    ),
                );
            }
            Phase::Finished => finished_screen(ui, session),
            Phase::Aborted => {}
        });

    events
}

fn warning_dialog(ctx: &egui::Context, events: &mut Vec<SessionEvent>) {
    egui::Window::new("Epilepsy warning")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .show(ctx, |ui| {
            ui.set_max_width(420.0);
            ui.label(SEIZURE_WARNING);
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    events.push(SessionEvent::WarningAnswered(true));
                }
                if ui.button("No").clicked() {
                    events.push(SessionEvent::WarningAnswered(false));
                }
            });
        });
}

fn initials_dialog(ctx: &egui::Context, state: &mut UiState, events: &mut Vec<SessionEvent>) {
    egui::Window::new("Logging")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("Please enter your initials:");
            let response = ui.text_edit_singleline(&mut state.initials);
            response.request_focus();
            ui.label("Leaving this blank exits the experiment.");
            ui.label("During the experiment, you may press [Esc] to stop at any time.");
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Done").clicked() || submitted {
                events.push(SessionEvent::InitialsSubmitted(state.initials.clone()));
            }
        });
}

fn trial_screen(
    ui: &mut Ui,
    session: &Session,
    display: &DisplayConfig,
    state: &mut UiState,
    events: &mut Vec<SessionEvent>,
) {
    let (done, total) = session.progress();
    let label = match session.phase() {
        Phase::Practice { .. } => "Practice",
        _ => "Trial",
    };
    corner_note(ui, &format!("{label} {}/{}", (done + 1).min(total), total));

    if let Some((params, frame)) = session.stimulus() {
        draw_stimulus(ui.painter(), ui.max_rect(), &params, frame, display);
        return;
    }
    if session.trial_state() != TrialState::Rate {
        return;
    }

    match session.rating_scale() {
        RatingScale::Keys => centered_text(ui, "Rate the illusion. Number keys 1–7"),
        RatingScale::Slider => {
            let rect = ui.max_rect();
            let panel = egui::Rect::from_center_size(rect.center(), Vec2::new(520.0, 180.0));
            ui.scope_builder(egui::UiBuilder::new().max_rect(panel), |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new("How strong was the illusion?")
                            .size(TEXT_SIZE)
                            .color(Color32::BLACK),
                    );
                    ui.add_space(16.0);
                    ui.spacing_mut().slider_width = 440.0;
                    let response =
                        ui.add(egui::Slider::new(&mut state.slider, 0.0..=100.0).show_value(false));
                    if response.changed() || response.drag_stopped() || response.clicked() {
                        state.slider_touched = true;
                    }
                    ui.horizontal(|ui| {
                        ui.label("none");
                        ui.add_space(380.0);
                        ui.label("very strong");
                    });
                    ui.add_space(12.0);
                    if ui
                        .add_enabled(state.slider_touched, egui::Button::new("Confirm"))
                        .clicked()
                    {
                        events.push(SessionEvent::Rating(state.slider.round() as u8));
                    }
                });
            });
        }
    }
}

fn finished_screen(ui: &mut Ui, session: &Session) {
    ui.vertical_centered(|ui| {
        ui.add_space(40.0);
        let message = if session.saved_path().is_some() {
            "Your data has been saved. Press [Esc] to exit."
        } else {
            "No data was saved. Press [Esc] to exit."
        };
        ui.label(RichText::new(message).size(TEXT_SIZE).color(Color32::BLACK));
        ui.add_space(24.0);
    });

    let y_max = *session.rating_scale().range().end() as f64;
    let records = session.results().records();
    ui.horizontal_wrapped(|ui| {
        for (i, block) in session.completed_blocks().iter().enumerate() {
            let Some(&var) = block.spec.varied().first() else {
                continue;
            };
            let points: Vec<[f64; 2]> = summarize_by_level(&records[block.records.clone()], var)
                .iter()
                .map(|s| [s.level as f64, s.mean])
                .collect();
            level_plot(
                ui,
                &format!("Part {}: {}", i + 1, var.title()),
                var.unit(),
                &points,
                y_max,
            );
        }
    });
}
