//! Scenario driver: a seeded synthetic player.
//!
//! Each simulated day the player may skip training, otherwise logs a few
//! sessions, then works the base: finishes due constructions, places new
//! structures, starts planned ones and tries upgrades. Every action goes
//! through `ProgressionCoordinator::handle`, exactly like a transport would,
//! and the authority stand-in accepts every pending token at day end.
//!
//! Choices are made over structures ordered by cell, never by id, so the
//! same seed always produces the same summaries.

use crate::{
    channel::Channel,
    command::{ExerciseAmount, Request, RequestKind, Response},
    coordinator::ProgressionCoordinator,
    error::CoreResult,
    exercise::EXERCISES,
    grid::StructureState,
    planner::PlacementTarget,
    rng::ScenarioRng,
    rules::{Currency, StructureType},
    types::{StructureId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Stream indexes. Append only.
const STREAM_TRAINING: u64 = 0;
const STREAM_BUILDING: u64 = 1;

/// Probability of a rest day.
const SKIP_CHANCE: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day:            u32,
    pub requests:       usize,
    pub accepted:       usize,
    pub rejected:       usize,
    pub completed:      usize,
    pub streak_days:    u32,
    pub recovery_score: u8,
    pub currency:       Currency,
    pub structures:     usize,
    pub total_levels:   u32,
}

pub struct Scenario {
    training: ScenarioRng,
    building: ScenarioRng,
    session:  ProgressionCoordinator,
    now:      Timestamp,
    day:      u32,
    tally:    Tally,
}

#[derive(Default)]
struct Tally {
    requests: usize,
    accepted: usize,
}

impl Scenario {
    pub fn new(seed: u64, session: ProgressionCoordinator, start: Timestamp) -> Self {
        Self {
            training: ScenarioRng::for_stream(seed, STREAM_TRAINING),
            building: ScenarioRng::for_stream(seed, STREAM_BUILDING),
            session,
            now: start,
            day: 0,
            tally: Tally::default(),
        }
    }

    pub fn session(&self) -> &ProgressionCoordinator {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ProgressionCoordinator {
        &mut self.session
    }

    pub fn into_session(self) -> ProgressionCoordinator {
        self.session
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Simulate one day and advance the clock to the next morning.
    pub fn run_day(&mut self) -> CoreResult<DaySummary> {
        self.tally = Tally::default();
        let day_start = self.now;

        if !self.training.chance(SKIP_CHANCE) {
            let sessions = self.training.between(1, 3);
            for _ in 0..sessions {
                let kind = self.training_request();
                self.submit(kind);
            }
        }

        let completed = self.session.complete_due(self.now)?.len();
        self.build();

        let tokens: Vec<String> = self.session.pending_tokens().map(|t| t.token.clone()).collect();
        for token in tokens {
            self.session.acknowledge(&token, true)?;
        }

        let summary = self.summary(completed);
        log::debug!(
            "day {}: {}/{} accepted, streak={} recovery={}",
            summary.day,
            summary.accepted,
            summary.requests,
            summary.streak_days,
            summary.recovery_score
        );
        self.day += 1;
        self.now = day_start + Duration::days(1);
        Ok(summary)
    }

    fn training_request(&mut self) -> RequestKind {
        if self.training.chance(0.3) {
            if let Some((name, channel)) = self.training.pick(EXERCISES).copied() {
                let amount = if channel.is_endurance() {
                    ExerciseAmount::Minutes { minutes: f64::from(self.training.between(10, 60)) }
                } else {
                    ExerciseAmount::Set {
                        weight: (self.training.uniform(20.0, 120.0) / 2.5).round() * 2.5,
                        reps:   self.training.between(5, 12),
                        sets:   self.training.between(3, 5),
                    }
                };
                return RequestKind::LogExercise { exercise: name.to_string(), amount };
            }
        }
        let channel = *self.training.pick(&Channel::ALL).unwrap_or(&Channel::Endurance);
        if channel.is_endurance() {
            let minutes = f64::from(self.training.between(10, 60));
            return RequestKind::LogEffort { channel, magnitude: minutes };
        }
        if self.training.chance(0.5) {
            let weight = (self.training.uniform(20.0, 120.0) / 2.5).round() * 2.5;
            RequestKind::LogSet {
                channel,
                weight,
                reps: self.training.between(5, 12),
                sets: self.training.between(3, 5),
            }
        } else {
            RequestKind::LogEffort { channel, magnitude: self.training.uniform(50.0, 800.0).round() }
        }
    }

    fn build(&mut self) {
        if self.building.chance(0.5) {
            let structure_type = *self.building.pick(&StructureType::ALL).unwrap_or(&StructureType::Wall);
            let count = if structure_type.is_linear() { self.building.between(2, 5) } else { 1 };
            for _ in 0..count {
                self.submit(RequestKind::Place { structure_type, target: PlacementTarget::Auto });
            }
            self.session.reset_chain(structure_type);
        }

        for structure_id in self.structures_in(|s| s == &StructureState::Planned) {
            self.submit(RequestKind::StartConstruction { structure_id });
        }

        let idle = self.structures_in(|s| s == &StructureState::Idle);
        if let Some(structure_id) = self.building.pick(&idle).cloned() {
            self.submit(RequestKind::Upgrade { structure_id });
        }
    }

    /// Ids of structures in a matching state, ordered by cell.
    fn structures_in(&self, state: impl Fn(&StructureState) -> bool) -> Vec<StructureId> {
        let mut matching: Vec<_> = self.session.grid().instances().filter(|s| state(&s.state)).collect();
        matching.sort_by_key(|s| s.cell);
        matching.into_iter().map(|s| s.id.clone()).collect()
    }

    fn submit(&mut self, kind: RequestKind) -> Response {
        let request = Request {
            request_id: self.building.uuid().to_string(),
            player_id:  self.session.player_id().to_string(),
            kind,
        };
        self.now += Duration::minutes(5);
        let response = self.session.handle(request, self.now);
        self.tally.requests += 1;
        if response.accepted {
            self.tally.accepted += 1;
        }
        response
    }

    fn summary(&self, completed: usize) -> DaySummary {
        let ledger = self.session.ledger();
        let grid = self.session.grid();
        DaySummary {
            day:            self.day,
            requests:       self.tally.requests,
            accepted:       self.tally.accepted,
            rejected:       self.tally.requests - self.tally.accepted,
            completed,
            streak_days:    ledger.streak_days(),
            recovery_score: ledger.recovery_score(),
            currency:       self.session.currency(),
            structures:     grid.len(),
            total_levels:   grid.instances().map(|s| s.level).sum(),
        }
    }
}
