//! Progression coordinator. One player's session over an injected ledger
//! and grid.
//!
//! Structure lifecycle:
//!   Planned → UnderConstruction → Idle → UnderConstruction → Idle → …
//!
//! RULES:
//!   - Every mutation validates first; a rejected call changes nothing.
//!   - Every structure mutation stamps `pending_since = now` and issues a
//!     `PendingToken` until the authority acknowledges it.
//!   - Upgrades are re-gated here even if the caller already checked.
//!   - Any handled request counts as activity for the player's local day.

use crate::{
    channel::Channel,
    clock::DayClock,
    command::{
        ChannelReport, ExerciseAmount, LedgerView, PendingToken, Request, RequestKind, Response, ResultingState,
    },
    config::{ConstructionConfig, CoreConfig},
    error::{CoreError, CoreResult},
    event::CoreEvent,
    exercise::{detect_channel, ExerciseMatch},
    gating::{GatingEngine, UpgradeProgress},
    grid::{GridStore, StructureInstance, StructureState},
    ledger::{ChannelLedger, LogOutcome},
    planner::{PlacementPlanner, PlacementTarget},
    rules::{Currency, ProgressionRules, StructureType},
    snapshot::{AuthoritativeSnapshot, ReconcileReport},
    types::{Cell, PlayerId, StructureId, Timestamp},
};
use chrono::Duration;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// `max(min_duration, base × (1 − recovery / divisor))`.
pub fn construction_duration(base_secs: i64, recovery_score: u8, config: &ConstructionConfig) -> Duration {
    let scale = (1.0 - f64::from(recovery_score) / config.recovery_divisor).max(0.0);
    let secs = (base_secs as f64 * scale).round() as i64;
    Duration::seconds(secs.max(config.min_duration_secs))
}

/// A placed structure plus the token confirming it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementReceipt {
    pub instance: StructureInstance,
    pub token:    PendingToken,
}

/// A local mutation awaiting acknowledgement.
/// `previous` is the instance before the mutation; `None` for placements.
#[derive(Debug, Clone)]
struct PendingMutation {
    token:    PendingToken,
    previous: Option<StructureInstance>,
}

pub struct ProgressionCoordinator {
    player_id: PlayerId,
    config:    CoreConfig,
    clock:     DayClock,
    gating:    GatingEngine,
    planner:   PlacementPlanner,
    ledger:    ChannelLedger,
    grid:      GridStore,
    /// Time of the latest unconfirmed ledger change.
    ledger_pending_since: Option<Timestamp>,
    /// Keyed by issue order so rollbacks can unwind newest-first.
    pending:   BTreeMap<u64, PendingMutation>,
    next_seq:  u64,
    handled:       HashMap<String, Response>,
    handled_order: VecDeque<String>,
    events:    Vec<CoreEvent>,
}

impl ProgressionCoordinator {
    pub fn new(player_id: PlayerId, config: CoreConfig, ledger: ChannelLedger, grid: GridStore) -> Self {
        let gating = GatingEngine::new(ProgressionRules::new(config.economy.clone()), &config.construction);
        Self {
            clock: DayClock::new(config.session.utc_offset_minutes),
            gating,
            planner: PlacementPlanner::new(),
            ledger,
            grid,
            ledger_pending_since: None,
            pending: BTreeMap::new(),
            next_seq: 0,
            handled: HashMap::new(),
            handled_order: VecDeque::new(),
            events: Vec::new(),
            player_id,
            config,
        }
    }

    /// A new player: empty ledger, empty grid of the configured size.
    pub fn fresh(player_id: PlayerId, config: CoreConfig) -> Self {
        let ledger = ChannelLedger::new(&config.ledger);
        let grid = GridStore::new(config.grid.width, config.grid.height);
        Self::new(player_id, config, ledger, grid)
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn player_id(&self) -> &str            { &self.player_id }
    pub fn config(&self) -> &CoreConfig        { &self.config }
    pub fn ledger(&self) -> &ChannelLedger     { &self.ledger }
    pub fn grid(&self) -> &GridStore           { &self.grid }
    pub fn planner(&self) -> &PlacementPlanner { &self.planner }
    pub fn gating(&self) -> &GatingEngine      { &self.gating }

    pub fn ledger_pending_since(&self) -> Option<Timestamp> {
        self.ledger_pending_since
    }

    /// Outstanding tokens, oldest first.
    pub fn pending_tokens(&self) -> impl Iterator<Item = &PendingToken> {
        self.pending.values().map(|m| &m.token)
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Hand the ledger and grid back for persistence.
    pub fn into_parts(self) -> (ChannelLedger, GridStore) {
        (self.ledger, self.grid)
    }

    // ── Ledger ────────────────────────────────────────────────────

    /// Register activity at `now`; rolls the ledger over on a new local day.
    pub fn activate(&mut self, now: Timestamp) -> bool {
        let day = self.clock.local_day(now);
        let rolled = self.ledger.rollover_if_new_day(day, &self.config.ledger);
        if rolled {
            self.events.push(CoreEvent::DayRolledOver {
                day,
                recovery_score: self.ledger.recovery_score(),
            });
        }
        rolled
    }

    pub fn log_effort(&mut self, channel: Channel, magnitude: f64, now: Timestamp) -> CoreResult<LogOutcome> {
        self.activate(now);
        let day = self.clock.local_day(now);
        let outcome = self.ledger.log_effort(channel, magnitude, day, &self.config.ledger)?;
        self.record_log(&outcome, now);
        Ok(outcome)
    }

    pub fn log_set(
        &mut self,
        channel: Channel,
        weight: f64,
        reps: u32,
        sets: u32,
        now: Timestamp,
    ) -> CoreResult<LogOutcome> {
        self.activate(now);
        let day = self.clock.local_day(now);
        let outcome = self.ledger.log_set(channel, weight, reps, sets, day, &self.config.ledger)?;
        self.record_log(&outcome, now);
        Ok(outcome)
    }

    /// Log an exercise by name; the name decides the channel.
    pub fn log_exercise(
        &mut self,
        exercise: &str,
        amount: ExerciseAmount,
        now: Timestamp,
    ) -> CoreResult<(ExerciseMatch, LogOutcome)> {
        let found = detect_channel(exercise).ok_or_else(|| {
            log::warn!("unknown exercise '{exercise}'");
            CoreError::UnknownExercise { name: exercise.to_string() }
        })?;
        if !found.exact {
            log::debug!("'{exercise}' matched '{}'", found.matched);
        }
        let outcome = match (amount, found.channel.is_endurance()) {
            (ExerciseAmount::Minutes { minutes }, true) => self.log_effort(found.channel, minutes, now)?,
            (ExerciseAmount::Set { weight, reps, sets }, false) => {
                self.log_set(found.channel, weight, reps, sets, now)?
            }
            _ => {
                return Err(CoreError::ExerciseMismatch {
                    exercise: exercise.to_string(),
                    channel:  found.channel,
                })
            }
        };
        Ok((found, outcome))
    }

    fn record_log(&mut self, outcome: &LogOutcome, now: Timestamp) {
        self.ledger_pending_since = Some(now);
        self.events.push(CoreEvent::EffortLogged {
            at:             now,
            channel:        outcome.channel,
            magnitude:      outcome.magnitude,
            streak_days:    outcome.streak_days,
            recovery_score: outcome.recovery_after,
        });
        if let Some(estimate) = outcome.new_personal_record {
            self.events.push(CoreEvent::PersonalRecordSet { at: now, channel: outcome.channel, estimate });
        }
    }

    // ── Derived reads ─────────────────────────────────────────────

    pub fn currency(&self) -> Currency  { self.gating.currency(&self.ledger) }
    pub fn attack_power(&self) -> f64   { self.gating.attack_power(&self.ledger) }
    pub fn defense_power(&self) -> f64  { self.gating.defense_power(&self.ledger) }

    pub fn ledger_view(&self) -> LedgerView {
        LedgerView {
            streak_days:    self.ledger.streak_days(),
            recovery_score: self.ledger.recovery_score(),
            currency:       self.currency(),
            attack_power:   self.attack_power(),
            defense_power:  self.defense_power(),
        }
    }

    /// Level a channel has reached from its cumulative volume alone.
    pub fn channel_level(&self, channel: Channel) -> u32 {
        self.gating.rules().channel_level(&self.ledger, channel)
    }

    pub fn channel_report(&self, channel: Channel, now: Timestamp) -> ChannelReport {
        let today = self.clock.local_day(now);
        let config = &self.config.ledger;
        ChannelReport {
            channel,
            level:                self.channel_level(channel),
            cumulative:           self.ledger.cumulative(channel),
            personal_record:      self.ledger.personal_record(channel),
            weekly_volume:        self.ledger.weekly_volume(channel, today),
            weekly_target:        config.weekly_targets[channel],
            weekly_progress:      self.ledger.weekly_progress(channel, today, config),
            progressive_overload: self.ledger.is_progressive_overload(channel, today, config),
        }
    }

    pub fn upgrade_progress(&self, structure_id: &str) -> CoreResult<UpgradeProgress> {
        let instance = self.instance(structure_id)?;
        Ok(self.gating.upgrade_progress(&self.ledger, instance.structure_type, instance.level))
    }

    /// Gate check for the next level of an existing structure.
    pub fn check_upgrade(&self, structure_id: &str) -> CoreResult<()> {
        let instance = self.instance(structure_id)?;
        self.gating.check_upgrade(&self.ledger, instance.structure_type, instance.level)
    }

    // ── Workers ───────────────────────────────────────────────────

    /// Base workers plus one per finished builder hut.
    pub fn worker_capacity(&self) -> usize {
        let huts = self
            .grid
            .instances()
            .filter(|s| s.structure_type.provides_worker() && s.is_built())
            .count();
        self.config.construction.base_workers + huts
    }

    pub fn busy_workers(&self) -> usize {
        self.grid.instances().filter(|s| s.is_building()).count()
    }

    fn ensure_worker(&self) -> CoreResult<()> {
        let capacity = self.worker_capacity();
        if self.busy_workers() >= capacity {
            return Err(CoreError::NoWorkerAvailable { capacity });
        }
        Ok(())
    }

    // ── Structure lifecycle ───────────────────────────────────────

    pub fn place(
        &mut self,
        structure_type: StructureType,
        target: PlacementTarget,
        now: Timestamp,
    ) -> CoreResult<PlacementReceipt> {
        let placed = self.planner.place(&mut self.grid, structure_type, target)?;
        let instance = self.grid.modify(&placed.id, |s| {
            s.pending_since = Some(now);
            s.clone()
        })?;
        let token = self.track(&instance.id, None, now);
        self.events.push(CoreEvent::StructurePlaced {
            at:             now,
            structure_id:   instance.id.clone(),
            structure_type,
            cell:           instance.cell,
        });
        Ok(PlacementReceipt { instance, token })
    }

    /// End the current wall chain; the next auto placement starts fresh.
    pub fn reset_chain(&mut self, structure_type: StructureType) {
        self.planner.reset_chain(structure_type);
    }

    /// Planned → UnderConstruction toward level 1.
    pub fn start_construction(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<PendingToken> {
        let instance = self.instance(structure_id)?.clone();
        if instance.state != StructureState::Planned {
            return Err(invalid(&instance, "start construction"));
        }
        self.ensure_worker()?;
        self.begin_construction(instance.clone(), instance.level, now)
    }

    /// Idle → UnderConstruction toward `level + 1`, if the gate is open.
    pub fn request_upgrade(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<PendingToken> {
        let instance = self.instance(structure_id)?.clone();
        if instance.construction_in_progress() {
            return Err(invalid(&instance, "upgrade"));
        }
        if let Err(e) = self.gating.check_upgrade(&self.ledger, instance.structure_type, instance.level) {
            log::warn!("upgrade of {} rejected: {e}", instance.id);
            return Err(e);
        }
        self.ensure_worker()?;
        self.begin_construction(instance.clone(), instance.level + 1, now)
    }

    fn begin_construction(
        &mut self,
        previous: StructureInstance,
        target_level: u32,
        now: Timestamp,
    ) -> CoreResult<PendingToken> {
        let base = self.gating.rules().base_build_seconds(previous.structure_type, target_level);
        let finishes_at = now + construction_duration(base, self.ledger.recovery_score(), &self.config.construction);

        self.grid.modify(&previous.id, |s| {
            s.state = StructureState::UnderConstruction { target_level, started_at: now, finishes_at };
            s.pending_since = Some(now);
        })?;
        log::debug!(
            "{} {} building to level {target_level}, done at {finishes_at}",
            previous.structure_type.name(),
            previous.id
        );
        self.events.push(CoreEvent::ConstructionStarted {
            at:           now,
            structure_id: previous.id.clone(),
            target_level,
            finishes_at,
        });
        let id = previous.id.clone();
        Ok(self.track(&id, Some(previous), now))
    }

    /// UnderConstruction → Idle at the target level, once the timer is up.
    pub fn complete_construction(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<StructureInstance> {
        let instance = self.instance(structure_id)?;
        let StructureState::UnderConstruction { target_level, finishes_at, .. } = instance.state else {
            return Err(invalid(instance, "complete construction"));
        };
        if now < finishes_at {
            return Err(CoreError::ConstructionNotDue { id: instance.id.clone(), finishes_at });
        }
        let done = self.grid.modify(structure_id, |s| {
            s.level = target_level;
            s.state = StructureState::Idle;
            s.clone()
        })?;
        log::info!("{} {} reached level {}", done.structure_type.name(), done.id, done.level);
        self.events.push(CoreEvent::ConstructionCompleted {
            at:           now,
            structure_id: done.id.clone(),
            level:        done.level,
        });
        Ok(done)
    }

    /// Complete every construction whose timer has run out.
    pub fn complete_due(&mut self, now: Timestamp) -> CoreResult<Vec<StructureInstance>> {
        let due: Vec<StructureId> = self
            .grid
            .instances()
            .filter(|s| matches!(s.state, StructureState::UnderConstruction { finishes_at, .. } if finishes_at <= now))
            .map(|s| s.id.clone())
            .collect();
        due.iter().map(|id| self.complete_construction(id, now)).collect()
    }

    /// Remove a structure whose construction never started.
    pub fn cancel_placement(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<PendingToken> {
        let instance = self.instance(structure_id)?;
        if instance.state != StructureState::Planned {
            return Err(invalid(instance, "cancel placement"));
        }
        let removed = self.remove_tracked(structure_id, now)?;
        self.planner.prune(&self.grid);
        self.events.push(CoreEvent::PlacementCancelled { structure_id: structure_id.to_string() });
        Ok(removed)
    }

    /// Remove a structure that is not being built.
    pub fn demolish(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<PendingToken> {
        let instance = self.instance(structure_id)?;
        if instance.is_building() {
            return Err(invalid(instance, "be demolished"));
        }
        let removed = self.remove_tracked(structure_id, now)?;
        self.planner.prune(&self.grid);
        self.events.push(CoreEvent::StructureDemolished { structure_id: structure_id.to_string() });
        Ok(removed)
    }

    fn remove_tracked(&mut self, structure_id: &str, now: Timestamp) -> CoreResult<PendingToken> {
        let previous = self
            .grid
            .remove(structure_id)
            .ok_or_else(|| CoreError::StructureNotFound { id: structure_id.to_string() })?;
        Ok(self.track(structure_id, Some(previous), now))
    }

    pub fn move_structure(&mut self, structure_id: &str, to: Cell, now: Timestamp) -> CoreResult<PendingToken> {
        let previous = self.instance(structure_id)?.clone();
        self.grid.move_structure(structure_id, to)?;
        self.grid.modify(structure_id, |s| s.pending_since = Some(now))?;
        self.planner.prune(&self.grid);
        self.events.push(CoreEvent::StructureMoved {
            at:           now,
            structure_id: structure_id.to_string(),
            from:         previous.cell,
            to,
        });
        Ok(self.track(structure_id, Some(previous), now))
    }

    fn instance(&self, structure_id: &str) -> CoreResult<&StructureInstance> {
        self.grid
            .get(structure_id)
            .ok_or_else(|| CoreError::StructureNotFound { id: structure_id.to_string() })
    }

    // ── Confirmation ──────────────────────────────────────────────

    fn track(&mut self, structure_id: &str, previous: Option<StructureInstance>, now: Timestamp) -> PendingToken {
        let token = PendingToken {
            token:        Uuid::new_v4().to_string(),
            structure_id: structure_id.to_string(),
            issued_at:    now,
        };
        self.pending.insert(self.next_seq, PendingMutation { token: token.clone(), previous });
        self.next_seq += 1;
        token
    }

    /// Apply the authority's verdict on a pending mutation.
    ///
    /// Accepted: the token is retired, and `pending_since` clears once the
    /// structure has no other outstanding token. Rejected: the mutation and
    /// every later pending mutation of the same structure are unwound back
    /// to the instance as it was before the rejected one. If that instance
    /// no longer fits on the grid, nothing changes and `RollbackBlocked` is
    /// returned with the token still pending.
    pub fn acknowledge(&mut self, token: &str, accepted: bool) -> CoreResult<()> {
        let (seq, structure_id) = self
            .pending
            .iter()
            .find(|(_, m)| m.token.token == token)
            .map(|(seq, m)| (*seq, m.token.structure_id.clone()))
            .ok_or_else(|| CoreError::UnknownToken { token: token.to_string() })?;

        if accepted {
            self.pending.remove(&seq);
            let outstanding = self.pending.values().any(|m| m.token.structure_id == structure_id);
            if !outstanding && self.grid.get(&structure_id).is_some() {
                self.grid.modify(&structure_id, |s| s.pending_since = None)?;
            }
        } else {
            let previous = self.pending.get(&seq).and_then(|m| m.previous.clone());
            self.restore(&structure_id, previous)?;
            let unwound: Vec<u64> = self
                .pending
                .range(seq..)
                .filter(|(_, m)| m.token.structure_id == structure_id)
                .map(|(s, _)| *s)
                .collect();
            for s in unwound {
                self.pending.remove(&s);
            }
            self.planner.prune(&self.grid);
            log::warn!("mutation {token} on {structure_id} rejected, rolled back");
        }

        self.events.push(CoreEvent::MutationAcknowledged {
            token: token.to_string(),
            structure_id,
            accepted,
        });
        Ok(())
    }

    /// Put `previous` back, or remove the structure when it had no previous
    /// copy. Fails without touching the grid if `previous` no longer fits.
    fn restore(&mut self, structure_id: &str, previous: Option<StructureInstance>) -> CoreResult<()> {
        let Some(previous) = previous else {
            self.grid.remove(structure_id);
            return Ok(());
        };
        if let Err(reason) = self.grid.check_place(previous.cell, previous.footprint, Some(structure_id)) {
            log::warn!("cannot restore {structure_id}: {reason}");
            return Err(CoreError::RollbackBlocked { id: structure_id.to_string(), reason });
        }
        self.grid.upsert(previous)
    }

    /// Merge an authoritative snapshot into the local state.
    ///
    /// A local value with `pending_since = t` is kept while
    /// `last_synced_at <= t`; everything else takes the snapshot's value.
    /// The grid is rebuilt in one step, so a failed merge changes nothing.
    pub fn reconcile(&mut self, snapshot: AuthoritativeSnapshot) -> CoreResult<ReconcileReport> {
        if snapshot.player_id != self.player_id {
            return Err(CoreError::WrongPlayer {
                expected: self.player_id.clone(),
                got:      snapshot.player_id,
            });
        }
        let synced = snapshot.last_synced_at;
        let local_wins = |pending_since: Option<Timestamp>| pending_since.is_some_and(|t| synced <= t);
        let mut report = ReconcileReport::default();

        // Removals still awaiting confirmation.
        let mut tombstones: HashMap<&str, Timestamp> = HashMap::new();
        for m in self.pending.values() {
            if m.previous.is_some() && self.grid.get(&m.token.structure_id).is_none() {
                let at = tombstones.entry(m.token.structure_id.as_str()).or_insert(m.token.issued_at);
                *at = (*at).max(m.token.issued_at);
            }
        }

        let authority: BTreeMap<&str, &StructureInstance> =
            snapshot.structures.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut from_authority: Vec<StructureInstance> = Vec::new();
        let mut preserved: Vec<StructureInstance> = Vec::new();

        for local in self.grid.instances() {
            let keep = local_wins(local.pending_since);
            match (authority.get(local.id.as_str()), keep) {
                (_, true) => preserved.push(local.clone()),
                (Some(remote), false) => {
                    report.overwritten += 1;
                    from_authority.push(confirmed(remote));
                }
                (None, false) => report.dropped += 1,
            }
        }

        let mut kept: HashSet<StructureId> = HashSet::new();
        for (id, remote) in &authority {
            if self.grid.get(id).is_some() {
                continue;
            }
            if tombstones.get(id).is_some_and(|t| local_wins(Some(*t))) {
                report.preserved += 1;
                kept.insert(id.to_string());
                continue;
            }
            report.added += 1;
            from_authority.push(confirmed(remote));
        }

        let mut next = GridStore::new(self.grid.width(), self.grid.height());
        for instance in from_authority {
            next.add(instance)?;
        }
        for instance in preserved {
            let id = instance.id.clone();
            match next.add(instance) {
                Ok(()) => {
                    report.preserved += 1;
                    kept.insert(id);
                }
                Err(e) => {
                    log::warn!("pending {id} conflicts with authoritative state, dropped: {e}");
                    report.dropped += 1;
                }
            }
        }
        // Tombstones for structures the authority no longer has stay pending too.
        for id in tombstones.keys() {
            if !authority.contains_key(id) && local_wins(tombstones.get(id).copied()) {
                kept.insert(id.to_string());
            }
        }

        self.grid = next;
        self.pending.retain(|_, m| kept.contains(&m.token.structure_id));
        self.planner.prune(&self.grid);

        if let Some(remote_ledger) = snapshot.ledger {
            if !local_wins(self.ledger_pending_since) {
                self.ledger = remote_ledger;
                self.ledger_pending_since = None;
                report.ledger_overwritten = true;
            }
        }

        log::info!(
            "reconciled {} at {synced}: overwritten={} preserved={} added={} dropped={}",
            self.player_id,
            report.overwritten,
            report.preserved,
            report.added,
            report.dropped
        );
        self.events.push(CoreEvent::SnapshotReconciled {
            last_synced_at: synced,
            overwritten:    report.overwritten,
            preserved:      report.preserved,
            added:          report.added,
            dropped:        report.dropped,
        });
        Ok(report)
    }

    // ── Transport entry point ─────────────────────────────────────

    /// Apply one request. A repeated `request_id` gets the first response
    /// back without being applied again.
    pub fn handle(&mut self, request: Request, now: Timestamp) -> Response {
        if request.player_id != self.player_id {
            let error = CoreError::WrongPlayer { expected: self.player_id.clone(), got: request.player_id };
            log::warn!("request {} rejected: {error}", request.request_id);
            return Response::rejected(request.request_id, &error);
        }
        if let Some(previous) = self.handled.get(&request.request_id) {
            log::debug!("duplicate request {}, replaying response", request.request_id);
            return previous.clone();
        }

        self.activate(now);
        let response = match self.apply(&request.kind, now) {
            Ok((token, state)) => Response::accepted(request.request_id.clone(), token, state),
            Err(e) => {
                log::warn!("request {} rejected: {e}", request.request_id);
                self.events.push(CoreEvent::RequestRejected {
                    request_id: request.request_id.clone(),
                    reason:     e.reason_code().to_string(),
                });
                Response::rejected(request.request_id.clone(), &e)
            }
        };
        self.remember(request.request_id, response.clone());
        response
    }

    fn apply(&mut self, kind: &RequestKind, now: Timestamp) -> CoreResult<(Option<PendingToken>, ResultingState)> {
        match kind {
            RequestKind::LogEffort { channel, magnitude } => {
                self.log_effort(*channel, *magnitude, now)?;
                Ok((None, ResultingState::Ledger { ledger: self.ledger_view() }))
            }
            RequestKind::LogSet { channel, weight, reps, sets } => {
                self.log_set(*channel, *weight, *reps, *sets, now)?;
                Ok((None, ResultingState::Ledger { ledger: self.ledger_view() }))
            }
            RequestKind::Place { structure_type, target } => {
                let receipt = self.place(*structure_type, *target, now)?;
                Ok((Some(receipt.token), ResultingState::Structure { structure: receipt.instance }))
            }
            RequestKind::StartConstruction { structure_id } => {
                let token = self.start_construction(structure_id, now)?;
                self.structure_state(structure_id, Some(token))
            }
            RequestKind::Upgrade { structure_id } => {
                let token = self.request_upgrade(structure_id, now)?;
                self.structure_state(structure_id, Some(token))
            }
            RequestKind::Complete { structure_id } => {
                let structure = self.complete_construction(structure_id, now)?;
                Ok((None, ResultingState::Structure { structure }))
            }
            RequestKind::CancelPlacement { structure_id } => {
                let token = self.cancel_placement(structure_id, now)?;
                Ok((Some(token), ResultingState::Removed { structure_id: structure_id.clone() }))
            }
            RequestKind::Demolish { structure_id } => {
                let token = self.demolish(structure_id, now)?;
                Ok((Some(token), ResultingState::Removed { structure_id: structure_id.clone() }))
            }
            RequestKind::Move { structure_id, to } => {
                let token = self.move_structure(structure_id, *to, now)?;
                self.structure_state(structure_id, Some(token))
            }
            RequestKind::LogExercise { exercise, amount } => {
                let (found, _) = self.log_exercise(exercise, *amount, now)?;
                Ok((None, ResultingState::Exercise {
                    channel: found.channel,
                    matched: found.matched.to_string(),
                    ledger:  self.ledger_view(),
                }))
            }
        }
    }

    fn structure_state(
        &self,
        structure_id: &str,
        token: Option<PendingToken>,
    ) -> CoreResult<(Option<PendingToken>, ResultingState)> {
        let structure = self.instance(structure_id)?.clone();
        Ok((token, ResultingState::Structure { structure }))
    }

    fn remember(&mut self, request_id: String, response: Response) {
        let window = self.config.session.dedupe_window;
        if window == 0 {
            return;
        }
        self.handled_order.push_back(request_id.clone());
        self.handled.insert(request_id, response);
        while self.handled_order.len() > window {
            if let Some(evicted) = self.handled_order.pop_front() {
                self.handled.remove(&evicted);
            }
        }
    }
}

fn confirmed(remote: &StructureInstance) -> StructureInstance {
    StructureInstance { pending_since: None, ..remote.clone() }
}

fn invalid(instance: &StructureInstance, action: &'static str) -> CoreError {
    CoreError::InvalidTransition {
        id:    instance.id.clone(),
        action,
        state: instance.state.name(),
    }
}
