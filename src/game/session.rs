//! Game session state machine
//!
//! Owns score, phase, best score and the obstacle field. The render loop
//! calls [`GameSession::frame`] once per frame and reacts to the returned
//! events (HUD refresh, local best persistence, score submission).

use tracing::{debug, info};

use super::layout::{difficulty_for_score, speed_for_score, MAX_FRAME_DELTA};
use super::obstacles::{FieldOptions, Judgement, ObstacleField};
use super::physics::{PlayerController, SteerInput};
use super::pool::Scene;

/// Session phase; exactly one holds at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Before the first start
    Idle,
    Running,
    GameOver,
}

/// A finished run waiting to be sent to the score API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub score: u32,
    /// Session generation the score belongs to
    pub generation: u64,
}

/// Score API answer for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionResult {
    pub generation: u64,
    pub best_score: u32,
}

/// Things the driver has to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A gate was passed
    Scored { score: u32 },
    /// Best improved; persist it locally
    NewBest { best: u32 },
    /// Run ended; show the terminal screen
    GameOver { score: u32, best: u32, new_best: bool },
    /// Fire-and-forget submission to the score API
    Submit(ScoreSubmission),
}

pub struct GameSession<S: Scene> {
    phase: SessionPhase,
    score: u32,
    best: u32,
    generation: u64,
    player: PlayerController,
    field: ObstacleField<S>,
}

impl<S: Scene> GameSession<S> {
    /// `best` is the locally cached best score
    pub fn new(scene: S, best: u32, seed: u64) -> Self {
        Self {
            phase: SessionPhase::Idle,
            score: 0,
            best,
            generation: 0,
            player: PlayerController::new(),
            field: ObstacleField::new(scene, FieldOptions::default(), seed),
        }
    }

    /// Begin a run. Allowed from Idle or GameOver.
    pub fn start(&mut self) -> bool {
        if self.phase == SessionPhase::Running {
            return false;
        }

        self.score = 0;
        self.player.reset();
        self.field.reset();
        self.generation += 1;
        self.phase = SessionPhase::Running;

        info!(generation = self.generation, best = self.best, "Run started");
        true
    }

    /// Start again after a game over
    pub fn restart(&mut self) -> bool {
        if self.phase != SessionPhase::GameOver {
            return false;
        }
        self.start()
    }

    /// Advance one rendered frame
    pub fn frame(&mut self, raw_dt: f32, input: &SteerInput) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase != SessionPhase::Running {
            return events;
        }

        let dt = if raw_dt.is_finite() {
            raw_dt.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };

        self.player.update(input, dt);

        self.field.set_speed(speed_for_score(self.score));
        self.field.set_difficulty(difficulty_for_score(self.score));

        for judgement in self.field.update(dt, self.player.position) {
            match judgement {
                Judgement::Pass => {
                    self.score += 1;
                    events.push(SessionEvent::Scored { score: self.score });
                }
                Judgement::Miss => {
                    debug!(score = self.score, "Gate missed");
                    events.extend(self.game_over());
                    return events;
                }
            }
        }

        if self.field.check_collision(&self.player.hit_box()) {
            debug!(score = self.score, "Hazard collision");
            events.extend(self.game_over());
        }

        events
    }

    /// End the run. No-op unless running.
    pub fn game_over(&mut self) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Running {
            return Vec::new();
        }
        self.phase = SessionPhase::GameOver;

        let mut events = Vec::with_capacity(3);
        let new_best = self.score > self.best;
        if new_best {
            self.best = self.score;
            events.push(SessionEvent::NewBest { best: self.best });
        }

        info!(
            generation = self.generation,
            score = self.score,
            best = self.best,
            new_best,
            "Game over"
        );

        events.push(SessionEvent::GameOver {
            score: self.score,
            best: self.best,
            new_best,
        });
        events.push(SessionEvent::Submit(ScoreSubmission {
            score: self.score,
            generation: self.generation,
        }));
        events
    }

    /// Reconcile with the server's best. Results from an earlier run are
    /// dropped. Returns true if the local best went up.
    pub fn apply_submission(&mut self, result: SubmissionResult) -> bool {
        if result.generation != self.generation {
            debug!(
                result_generation = result.generation,
                current_generation = self.generation,
                "Discarding stale submission result"
            );
            return false;
        }
        if result.best_score > self.best {
            self.best = result.best_score;
            return true;
        }
        false
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn field(&self) -> &ObstacleField<S> {
        &self.field
    }
}
