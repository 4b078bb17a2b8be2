use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use egui::{Key, ViewportCommand};
use tracing::{debug, info};

use illusion::config::{DisplayConfig, RatingScale};
use illusion::experiment::session::{Phase, Session, SessionEvent, Transition, TrialState};

use crate::ui::windows::{UiState, main_window};

const DIGIT_KEYS: [(Key, u8); 7] = [
    (Key::Num1, 1),
    (Key::Num2, 2),
    (Key::Num3, 3),
    (Key::Num4, 4),
    (Key::Num5, 5),
    (Key::Num6, 6),
    (Key::Num7, 7),
];

pub struct App {
    session: Session,
    display: DisplayConfig,
    ui_state: UiState,
    epoch: Instant,
    last_trial_state: TrialState,
    exiting: Arc<AtomicBool>,
}

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        session: Session,
        display: DisplayConfig,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        let last_trial_state = session.trial_state();
        Self {
            session,
            display,
            ui_state: UiState::default(),
            epoch: Instant::now(),
            last_trial_state,
            exiting: stop_flag,
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, event: SessionEvent) {
        let transition = self.session.handle(event);
        match &transition {
            Transition::Advanced(phase) => debug!("Now in {:?}", phase),
            Transition::Finished(path) => match path {
                Some(p) => info!("Experiment finished; data in {}", p.display()),
                None => info!("Experiment finished; nothing saved"),
            },
            Transition::Aborted => ctx.send_viewport_cmd(ViewportCommand::Close),
            Transition::Ignored | Transition::Stayed => {}
        }
    }

    /// Keyboard events for this frame.
    fn key_events(&self, ctx: &egui::Context) -> Vec<SessionEvent> {
        let keys_scale = self.session.rating_scale() == RatingScale::Keys;
        ctx.input(|i| {
            let mut out = Vec::new();
            if i.key_pressed(Key::Escape) {
                out.push(SessionEvent::Escape);
            }
            if i.key_pressed(Key::Space) {
                out.push(SessionEvent::Continue);
            }
            if keys_scale {
                for (key, rating) in DIGIT_KEYS {
                    if i.key_pressed(key) {
                        out.push(SessionEvent::Rating(rating));
                        break;
                    }
                }
            }
            out
        })
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.exiting.load(Ordering::SeqCst) {
            info!("SIGINT received: closing window.");
            if !self.session.phase().is_terminal() {
                self.session.handle(SessionEvent::Escape);
            }
            ctx.send_viewport_cmd(ViewportCommand::Close);
            return;
        }

        let now_sec = self.epoch.elapsed().as_secs_f64();
        self.dispatch(ctx, SessionEvent::Tick { now_sec });

        for event in self.key_events(ctx) {
            if event == SessionEvent::Escape && self.session.phase() == Phase::Finished {
                ctx.send_viewport_cmd(ViewportCommand::Close);
                return;
            }
            self.dispatch(ctx, event);
        }

        let trial_state = self.session.trial_state();
        if trial_state == TrialState::Rate && self.last_trial_state != TrialState::Rate {
            self.ui_state.reset_slider();
        }
        self.last_trial_state = trial_state;

        let widget_events = main_window(ctx, &self.session, &self.display, &mut self.ui_state);
        for event in widget_events {
            self.dispatch(ctx, event);
        }

        ctx.request_repaint();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if !self.session.phase().is_terminal() {
            info!("Experiment was closed early.");
        }
    }
}
