//! Participant state machine.
//!
//! A `Session` owns every piece of mutable experiment state. The runner feeds
//! it `SessionEvent`s (key presses, button clicks, frame ticks) and redraws
//! from its accessors; nothing else mutates the experiment.
//!
//! Phase chain:
//! `Warning -> Initials -> Intro(b) -> Practice(b) -> Experimental(b) -> Rest(b) -> Intro(b+1) ... -> Finished`,
//! with `Aborted` reachable from any phase before `Finished`.

use std::ops::Range;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::config::{AppConfig, RatingScale};
use crate::error::Result;
use crate::experiment::best_level::BlockTally;
use crate::experiment::results::{ResultLog, normalize_initials};
use crate::experiment::stimulus::frame_index;
use crate::experiment::trials::{
    BlockSpec, TrialDescriptor, TrialQueue, block_order, combinations, practice_series,
    shuffled_series,
};
use crate::experiment::variables::{LevelTables, StimulusParams, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warning,
    Initials,
    Intro { block: usize },
    Practice { block: usize },
    Experimental { block: usize },
    Rest { block: usize },
    Finished,
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialState {
    /// Stimulus on screen. The clock starts at the first tick.
    Play { started_at: Option<f64>, frame: u64 },
    /// Waiting for the single rating of this trial.
    Rate,
}

impl TrialState {
    fn fresh() -> Self {
        TrialState::Play {
            started_at: None,
            frame: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    WarningAnswered(bool),
    InitialsSubmitted(String),
    Continue,
    Tick { now_sec: f64 },
    Rating(u8),
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ignored,
    Stayed,
    Advanced(Phase),
    /// Path of the saved result file, if one was written.
    Finished(Option<PathBuf>),
    Aborted,
}

/// Default level replaced after a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adaptation {
    pub block: usize,
    pub variable: Variable,
    pub level: usize,
    pub value: u32,
}

/// Experimental records produced by one block.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedBlock {
    pub spec: BlockSpec,
    pub records: Range<usize>,
}

#[derive(Debug, Clone)]
struct Settings {
    tables: LevelTables,
    reps: usize,
    practice_trials: usize,
    adaptive: bool,
    play_seconds: f64,
    fps: f32,
    rating_scale: RatingScale,
    data_dir: PathBuf,
}

#[derive(Debug)]
pub struct Session {
    settings: Settings,
    blocks: Vec<BlockSpec>,
    defaults: [usize; 4],
    phase: Phase,
    combos: Vec<TrialDescriptor>,
    queue: TrialQueue,
    trial_state: TrialState,
    tally: BlockTally,
    results: ResultLog,
    block_start: usize,
    completed: Vec<CompletedBlock>,
    adaptations: Vec<Adaptation>,
    initials: Option<String>,
    started: Option<NaiveDateTime>,
    save_attempted: bool,
    saved_path: Option<PathBuf>,
    rng: StdRng,
}

impl Session {
    pub fn new(cfg: &AppConfig, participant: usize, mut rng: StdRng) -> Result<Self> {
        cfg.validate()?;
        let defaults = cfg.defaults.resolve(&cfg.levels)?;
        let specs = cfg.design.block_specs();
        let order = block_order(specs.len(), cfg.design.counterbalance, participant, &mut rng);
        let blocks: Vec<BlockSpec> = order.iter().map(|&i| specs[i].clone()).collect();
        info!(
            "Session prepared: {} blocks, order {:?}, {} reps",
            blocks.len(),
            order,
            cfg.design.reps
        );
        Ok(Self {
            settings: Settings {
                tables: cfg.levels.clone(),
                reps: cfg.design.reps,
                practice_trials: cfg.design.practice_trials,
                adaptive: cfg.design.adaptive,
                play_seconds: cfg.trial.play_seconds as f64,
                fps: cfg.display.frames_per_second,
                rating_scale: cfg.trial.rating_scale,
                data_dir: PathBuf::from(&cfg.output.data_dir),
            },
            blocks,
            defaults,
            phase: Phase::Warning,
            combos: Vec::new(),
            queue: TrialQueue::default(),
            trial_state: TrialState::fresh(),
            tally: BlockTally::default(),
            results: ResultLog::default(),
            block_start: 0,
            completed: Vec::new(),
            adaptations: Vec::new(),
            initials: None,
            started: None,
            save_attempted: false,
            saved_path: None,
            rng,
        })
    }

    /// Dispatch one event against the current phase.
    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        if event == SessionEvent::Escape {
            return if self.phase.is_terminal() {
                Transition::Ignored
            } else {
                self.abort()
            };
        }
        match (self.phase, event) {
            (Phase::Warning, SessionEvent::WarningAnswered(true)) => self.enter(Phase::Initials),
            (Phase::Warning, SessionEvent::WarningAnswered(false)) => self.abort(),
            (Phase::Initials, SessionEvent::InitialsSubmitted(raw)) => {
                match normalize_initials(&raw) {
                    Some(initials) => {
                        info!("Participant `{initials}` starting");
                        self.initials = Some(initials);
                        self.started = Some(Local::now().naive_local());
                        self.start_block(0)
                    }
                    None => self.abort(),
                }
            }
            (Phase::Intro { block }, SessionEvent::Continue) => self.start_practice(block),
            (Phase::Rest { block }, SessionEvent::Continue) => self.start_block(block + 1),
            (Phase::Practice { .. } | Phase::Experimental { .. }, SessionEvent::Tick { now_sec }) => {
                self.tick(now_sec)
            }
            (Phase::Practice { block }, SessionEvent::Rating(r)) => self.rate(block, r, false),
            (Phase::Experimental { block }, SessionEvent::Rating(r)) => self.rate(block, r, true),
            _ => Transition::Ignored,
        }
    }

    fn enter(&mut self, phase: Phase) -> Transition {
        debug!("Phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        Transition::Advanced(phase)
    }

    fn abort(&mut self) -> Transition {
        info!("Experiment was closed early.");
        self.phase = Phase::Aborted;
        Transition::Aborted
    }

    fn start_block(&mut self, block: usize) -> Transition {
        let varied = self.blocks[block].varied();
        self.combos = combinations(&varied, &self.settings.tables, self.defaults);
        self.tally = BlockTally::new(&varied);
        info!(
            "Block {}/{}: varying {:?} over {} combinations",
            block + 1,
            self.blocks.len(),
            varied,
            self.combos.len()
        );
        self.enter(Phase::Intro { block })
    }

    fn start_practice(&mut self, block: usize) -> Transition {
        let trials = practice_series(&self.combos, self.settings.practice_trials, &mut self.rng);
        self.queue = TrialQueue::new(trials);
        if self.queue.is_empty() {
            return self.start_experimental(block);
        }
        self.trial_state = TrialState::fresh();
        self.enter(Phase::Practice { block })
    }

    fn start_experimental(&mut self, block: usize) -> Transition {
        let trials = shuffled_series(&self.combos, self.settings.reps, &mut self.rng);
        self.queue = TrialQueue::new(trials);
        self.trial_state = TrialState::fresh();
        self.block_start = self.results.len();
        self.enter(Phase::Experimental { block })
    }

    fn tick(&mut self, now_sec: f64) -> Transition {
        match self.trial_state {
            TrialState::Play { started_at: None, .. } => {
                self.trial_state = TrialState::Play {
                    started_at: Some(now_sec),
                    frame: 0,
                };
                Transition::Stayed
            }
            TrialState::Play {
                started_at: Some(t0),
                ..
            } => {
                let elapsed = now_sec - t0;
                self.trial_state = if elapsed >= self.settings.play_seconds {
                    TrialState::Rate
                } else {
                    TrialState::Play {
                        started_at: Some(t0),
                        frame: frame_index(elapsed, self.settings.fps),
                    }
                };
                Transition::Stayed
            }
            TrialState::Rate => Transition::Ignored,
        }
    }

    fn rate(&mut self, block: usize, rating: u8, record: bool) -> Transition {
        if self.trial_state != TrialState::Rate || !self.settings.rating_scale.accepts(rating) {
            return Transition::Ignored;
        }
        let Some(trial) = self.queue.current().copied() else {
            return Transition::Ignored;
        };
        if record {
            let params = trial.params(&self.settings.tables);
            let rec = self.results.push(&params, rating);
            self.tally.record(&trial, rating);
            debug!("Trial {} rated {} ({:?})", rec.trial, rating, params);
        } else {
            debug!("Practice trial rated {rating}");
        }

        if self.queue.advance() {
            self.trial_state = TrialState::fresh();
            return Transition::Stayed;
        }
        if record {
            self.end_block(block)
        } else {
            self.start_experimental(block)
        }
    }

    fn end_block(&mut self, block: usize) -> Transition {
        self.completed.push(CompletedBlock {
            spec: self.blocks[block].clone(),
            records: self.block_start..self.results.len(),
        });
        if self.settings.adaptive {
            for (variable, level) in self.tally.best_levels() {
                let value = self.settings.tables.get(variable)[level];
                info!("Block {}: best {} = {}", block + 1, variable, value);
                self.defaults[variable.index()] = level;
                self.adaptations.push(Adaptation {
                    block,
                    variable,
                    level,
                    value,
                });
            }
        }
        if block + 1 < self.blocks.len() {
            self.enter(Phase::Rest { block })
        } else {
            self.finish()
        }
    }

    fn finish(&mut self) -> Transition {
        self.phase = Phase::Finished;
        if !self.save_attempted {
            self.save_attempted = true;
            if let (Some(initials), Some(started)) = (self.initials.as_deref(), self.started) {
                match self
                    .results
                    .save(&self.settings.data_dir, initials, started)
                {
                    Ok(path) => self.saved_path = Some(path),
                    Err(err) => error!("Failed to save results: {err}"),
                }
            }
        }
        Transition::Finished(self.saved_path.clone())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn trial_state(&self) -> TrialState {
        self.trial_state
    }

    /// Parameters and frame to draw, while a stimulus is playing.
    pub fn stimulus(&self) -> Option<(StimulusParams, u64)> {
        if !matches!(
            self.phase,
            Phase::Practice { .. } | Phase::Experimental { .. }
        ) {
            return None;
        }
        match self.trial_state {
            TrialState::Play { frame, .. } => self
                .queue
                .current()
                .map(|t| (t.params(&self.settings.tables), frame)),
            TrialState::Rate => None,
        }
    }

    /// (trials done, trials in the current sub-phase)
    pub fn progress(&self) -> (usize, usize) {
        (self.queue.position(), self.queue.len())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Level index per variable used outside the varied set.
    pub fn defaults(&self) -> [usize; 4] {
        self.defaults
    }

    pub fn rating_scale(&self) -> RatingScale {
        self.settings.rating_scale
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn completed_blocks(&self) -> &[CompletedBlock] {
        &self.completed
    }

    pub fn adaptations(&self) -> &[Adaptation] {
        &self.adaptations
    }

    pub fn saved_path(&self) -> Option<&PathBuf> {
        self.saved_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.levels.line_length = vec![30, 60, 90];
        cfg.design.blocks = vec![vec![Variable::LineLength]];
        cfg.design.reps = 2;
        cfg.design.practice_trials = 1;
        cfg.trial.play_seconds = 1.0;
        cfg.output.data_dir = std::env::temp_dir()
            .join("illusion_session_unit")
            .to_string_lossy()
            .to_string();
        cfg
    }

    fn session(cfg: &AppConfig) -> Session {
        Session::new(cfg, 0, StdRng::seed_from_u64(1)).unwrap()
    }

    fn play_out(s: &mut Session, t: &mut f64) {
        s.handle(SessionEvent::Tick { now_sec: *t });
        *t += 2.0;
        s.handle(SessionEvent::Tick { now_sec: *t });
        assert_eq!(s.trial_state(), TrialState::Rate);
    }

    #[test]
    fn declining_the_warning_aborts() {
        let mut s = session(&small_config());
        assert_eq!(s.handle(SessionEvent::WarningAnswered(false)), Transition::Aborted);
        assert_eq!(s.phase(), Phase::Aborted);
        assert_eq!(s.handle(SessionEvent::Continue), Transition::Ignored);
    }

    #[test]
    fn blank_initials_abort() {
        let mut s = session(&small_config());
        s.handle(SessionEvent::WarningAnswered(true));
        assert_eq!(
            s.handle(SessionEvent::InitialsSubmitted("   ".into())),
            Transition::Aborted
        );
    }

    #[test]
    fn rating_before_play_ends_is_ignored() {
        let mut s = session(&small_config());
        s.handle(SessionEvent::WarningAnswered(true));
        s.handle(SessionEvent::InitialsSubmitted("ab".into()));
        s.handle(SessionEvent::Continue);
        assert_eq!(s.phase(), Phase::Practice { block: 0 });
        s.handle(SessionEvent::Tick { now_sec: 10.0 });
        s.handle(SessionEvent::Tick { now_sec: 10.5 });
        assert!(matches!(s.trial_state(), TrialState::Play { frame: 50, .. }));
        assert_eq!(s.handle(SessionEvent::Rating(40)), Transition::Ignored);
        assert!(s.stimulus().is_some());
    }

    #[test]
    fn practice_ratings_are_not_recorded() {
        let mut s = session(&small_config());
        s.handle(SessionEvent::WarningAnswered(true));
        s.handle(SessionEvent::InitialsSubmitted("ab".into()));
        s.handle(SessionEvent::Continue);
        let mut t = 0.0;
        play_out(&mut s, &mut t);
        assert_eq!(
            s.handle(SessionEvent::Rating(55)),
            Transition::Advanced(Phase::Experimental { block: 0 })
        );
        assert!(s.results().is_empty());
        assert_eq!(s.progress(), (0, 6));
    }

    #[test]
    fn out_of_scale_rating_is_ignored() {
        let mut cfg = small_config();
        cfg.trial.rating_scale = RatingScale::Keys;
        cfg.design.practice_trials = 0;
        let mut s = session(&cfg);
        s.handle(SessionEvent::WarningAnswered(true));
        s.handle(SessionEvent::InitialsSubmitted("ab".into()));
        s.handle(SessionEvent::Continue);
        let mut t = 0.0;
        play_out(&mut s, &mut t);
        assert_eq!(s.handle(SessionEvent::Rating(0)), Transition::Ignored);
        assert_eq!(s.handle(SessionEvent::Rating(9)), Transition::Ignored);
        assert_eq!(s.handle(SessionEvent::Rating(4)), Transition::Stayed);
        assert_eq!(s.results().len(), 1);
    }

    #[test]
    fn escape_after_finish_is_ignored() {
        let mut cfg = small_config();
        cfg.design.practice_trials = 0;
        cfg.design.reps = 1;
        cfg.levels.line_length = vec![30];
        let mut s = session(&cfg);
        s.handle(SessionEvent::WarningAnswered(true));
        s.handle(SessionEvent::InitialsSubmitted("zz".into()));
        s.handle(SessionEvent::Continue);
        let mut t = 0.0;
        play_out(&mut s, &mut t);
        assert!(matches!(s.handle(SessionEvent::Rating(70)), Transition::Finished(_)));
        assert_eq!(s.handle(SessionEvent::Escape), Transition::Ignored);
        assert_eq!(s.phase(), Phase::Finished);
        if let Some(path) = s.saved_path() {
            let _ = std::fs::remove_file(path);
        }
    }
}
