//! The timing session: gesture, history, scramble and persistence behind one
//! set of explicit operations. Owned by the UI thread.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::cube::Cube;
use crate::gesture::{GestureOutcome, GestureState, HoldGesture, Signal};
use crate::history::History;
use crate::remote::{SolvePatch, SolveRemote};
use crate::scramble::Scrambler;
use crate::solve::{Penalty, PuzzleType, Solve};
use crate::stats::Summary;
use crate::store::SolveStore;
use crate::sync::{SyncHealth, SyncOp, SyncReport, SyncWorker, SHUTDOWN_GRACE};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub puzzle_type: PuzzleType,
    pub hold_duration_ms: u64,
    pub average_windows: Vec<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            puzzle_type: PuzzleType::Cube3,
            hold_duration_ms: 300,
            average_windows: vec![5, 12],
        }
    }
}

pub struct Session {
    config: SessionConfig,
    history: History,
    gesture: HoldGesture,
    clock: Box<dyn Clock>,
    scrambler: Box<dyn Scrambler>,
    store: Box<dyn SolveStore>,
    sync: Option<SyncWorker>,
    health: SyncHealth,
    puzzle: PuzzleType,
    scramble: String,
    store_error: Option<String>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        clock: Box<dyn Clock>,
        mut scrambler: Box<dyn Scrambler>,
        store: Box<dyn SolveStore>,
    ) -> Self {
        let puzzle = config.puzzle_type;
        let scramble = scrambler.generate(puzzle);
        Self {
            gesture: HoldGesture::new(config.hold_duration_ms),
            config,
            history: History::new(),
            clock,
            scrambler,
            store,
            sync: None,
            health: SyncHealth::Local,
            puzzle,
            scramble,
            store_error: None,
        }
    }

    /// Replaces the in-memory history with whatever the local store holds
    pub fn load(&mut self) -> crate::error::Result<usize> {
        let solves = self.store.load()?;
        let count = solves.len();
        self.history = History::from_solves(solves);
        info!(count, "loaded local history");
        Ok(count)
    }

    /// Signs the session in: the remote list becomes the history (cached
    /// locally) and later mutations are mirrored to it in the background.
    /// Local solves the server has never seen are kept and uploaded. When the
    /// list call fails the local history stays and the session reports itself
    /// offline.
    pub fn attach_remote<R: SolveRemote + 'static>(&mut self, remote: R) {
        let listed = remote.list();
        let sync = SyncWorker::spawn(remote);
        match listed {
            Ok(solves) => {
                let known: HashSet<&str> = solves.iter().map(|s| s.id.as_str()).collect();
                let pending: Vec<Solve> = self
                    .history
                    .as_slice()
                    .iter()
                    .filter(|s| !known.contains(s.id.as_str()))
                    .cloned()
                    .collect();
                info!(
                    count = solves.len(),
                    pending = pending.len(),
                    "loaded remote history"
                );

                let mut merged = solves;
                merged.extend(pending.iter().cloned());
                self.history = History::from_solves(merged);
                self.persist();
                self.health = SyncHealth::Synced;
                for solve in pending {
                    sync.submit(SyncOp::Create(solve));
                }
            }
            Err(e) => {
                warn!(error = %e, "remote unavailable, using local history");
                self.health = SyncHealth::Offline { failures: 1 };
            }
        }
        self.sync = Some(sync);
    }

    pub fn on_press(&mut self) -> GestureOutcome {
        self.press_at(self.clock.now_ms())
    }

    pub fn on_release(&mut self) -> GestureOutcome {
        self.release_at(self.clock.now_ms())
    }

    /// Same as `on_press`, at a timestamp the caller observed
    pub fn press_at(&mut self, now: i64) -> GestureOutcome {
        let outcome = self.gesture.press(now);
        if let GestureOutcome::Stopped { elapsed_ms } = outcome {
            self.record(elapsed_ms);
        }
        outcome
    }

    pub fn release_at(&mut self, now: i64) -> GestureOutcome {
        self.gesture.release(now)
    }

    /// Drops a hold or a running attempt without recording anything
    pub fn abort(&mut self) {
        if self.gesture.state() != GestureState::Idle {
            debug!("attempt aborted");
        }
        self.gesture.abort();
    }

    /// Stores a finished attempt against the current scramble and deals the next one
    pub fn record(&mut self, elapsed_ms: i64) -> Solve {
        let solve = Solve::new(elapsed_ms.max(0) as u64, self.scramble.clone(), self.puzzle);
        info!(
            id = %solve.id,
            ms = solve.raw_time_ms,
            puzzle = %solve.puzzle_type,
            "solve recorded"
        );

        self.history.push(solve.clone());
        self.persist();
        self.mirror(SyncOp::Create(solve.clone()));
        self.scramble = self.scrambler.generate(self.puzzle);
        solve
    }

    /// Unknown ids are ignored and return false
    pub fn set_penalty(&mut self, id: &str, penalty: Penalty) -> bool {
        if !self.history.set_penalty(id, penalty) {
            debug!(id, "penalty for unknown solve ignored");
            return false;
        }
        self.persist();
        self.mirror(SyncOp::Update {
            id: id.to_string(),
            patch: SolvePatch::penalty(penalty),
        });
        true
    }

    pub fn toggle_plus_two(&mut self, id: &str) -> bool {
        match self.history.get(id).map(|s| s.penalty.toggled_plus_two()) {
            Some(penalty) => self.set_penalty(id, penalty),
            None => false,
        }
    }

    pub fn toggle_dnf(&mut self, id: &str) -> bool {
        match self.history.get(id).map(|s| s.penalty.toggled_dnf()) {
            Some(penalty) => self.set_penalty(id, penalty),
            None => false,
        }
    }

    pub fn toggle_plus_two_last(&mut self) -> bool {
        match self.last_id() {
            Some(id) => self.toggle_plus_two(&id),
            None => false,
        }
    }

    pub fn toggle_dnf_last(&mut self) -> bool {
        match self.last_id() {
            Some(id) => self.toggle_dnf(&id),
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        if self.history.remove(id).is_none() {
            debug!(id, "delete of unknown solve ignored");
            return false;
        }
        self.persist();
        self.mirror(SyncOp::Delete(id.to_string()));
        true
    }

    pub fn delete_last(&mut self) -> bool {
        match self.last_id() {
            Some(id) => self.delete(&id),
            None => false,
        }
    }

    /// Removes every solve of every puzzle
    pub fn clear(&mut self) {
        let ids: Vec<String> = self.history.as_slice().iter().map(|s| s.id.clone()).collect();
        if ids.is_empty() {
            return;
        }
        self.history.clear();
        info!(count = ids.len(), "history cleared");
        self.persist();
        self.mirror(SyncOp::Clear(ids));
    }

    pub fn set_puzzle(&mut self, puzzle: PuzzleType) {
        self.gesture.abort();
        self.puzzle = puzzle;
        self.scramble = self.scrambler.generate(puzzle);
        debug!(%puzzle, "puzzle selected");
    }

    pub fn next_puzzle(&mut self) {
        self.set_puzzle(self.puzzle.next());
    }

    pub fn previous_puzzle(&mut self) {
        self.set_puzzle(self.puzzle.previous());
    }

    /// Deals a fresh scramble; refused while an attempt is in progress
    pub fn new_scramble(&mut self) -> bool {
        if self.gesture.state() != GestureState::Idle {
            return false;
        }
        self.scramble = self.scrambler.generate(self.puzzle);
        true
    }

    /// Statistics of the active puzzle
    pub fn summary(&self) -> Summary {
        Summary::compute(&self.solves(), &self.config.average_windows)
    }

    /// Chronological solves of the active puzzle
    pub fn solves(&self) -> Vec<Solve> {
        self.history.for_puzzle(self.puzzle)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_solve(&self) -> Option<&Solve> {
        self.history.last_for(self.puzzle)
    }

    pub fn puzzle(&self) -> PuzzleType {
        self.puzzle
    }

    pub fn scramble(&self) -> &str {
        &self.scramble
    }

    /// Facelet preview of the current scramble, NxN cubes only
    pub fn scramble_preview(&self) -> Option<Cube> {
        Cube::scrambled(self.puzzle.cube_size()?, &self.scramble)
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn is_running(&self) -> bool {
        self.gesture.is_running()
    }

    pub fn is_busy(&self) -> bool {
        self.gesture.state() != GestureState::Idle
    }

    pub fn live_elapsed(&self) -> Option<i64> {
        self.gesture.elapsed(self.clock.now_ms())
    }

    pub fn signal(&self) -> Signal {
        self.gesture.signal(self.clock.now_ms())
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn average_windows(&self) -> &[usize] {
        &self.config.average_windows
    }

    /// Folds finished background writes into the sync health
    pub fn poll_sync(&mut self) -> SyncHealth {
        let reports = match &self.sync {
            Some(sync) => sync.drain_reports(),
            None => return self.health,
        };
        self.absorb(reports);
        self.health
    }

    pub fn sync_health(&self) -> SyncHealth {
        self.health
    }

    /// Last local write failure, cleared by the next successful write
    pub fn store_error(&self) -> Option<&str> {
        self.store_error.as_deref()
    }

    fn last_id(&self) -> Option<String> {
        self.history.last_for(self.puzzle).map(|s| s.id.clone())
    }

    fn persist(&mut self) {
        match self.store.save(self.history.as_slice()) {
            Ok(()) => self.store_error = None,
            Err(e) => {
                warn!(error = %e, "failed to save history");
                self.store_error = Some(e.to_string());
            }
        }
    }

    /// Created solves are re-keyed under their server id so the next
    /// sign-in recognizes them
    fn absorb(&mut self, reports: Vec<SyncReport>) {
        let mut renamed = false;
        for report in reports {
            if let SyncReport::Created { local, remote } = &report {
                if local != remote {
                    renamed |= self.history.rename(local, remote);
                }
            }
            self.health = self.health.absorb(&report);
        }
        if renamed {
            self.persist();
        }
    }

    fn mirror(&self, op: SyncOp) {
        if let Some(sync) = &self.sync {
            sync.submit(op);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut sync) = self.sync.take() {
            let reports = sync.finish(SHUTDOWN_GRACE);
            self.absorb(reports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{PrismError, Result};
    use crate::scramble::RandomMoveScrambler;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    struct FailingStore;

    impl SolveStore for FailingStore {
        fn load(&self) -> Result<Vec<Solve>> {
            Ok(vec![])
        }

        fn save(&mut self, _solves: &[Solve]) -> Result<()> {
            Err(PrismError::Config("disk full".into()))
        }
    }

    fn session() -> (Session, ManualClock, MemoryStore) {
        let clock = ManualClock::new(0);
        let store = MemoryStore::new();
        let session = Session::new(
            SessionConfig::default(),
            Box::new(clock.clone()),
            Box::new(RandomMoveScrambler::with_seed(1)),
            Box::new(store.clone()),
        );
        (session, clock, store)
    }

    fn solve_once(session: &mut Session, clock: &ManualClock, hold: i64, run: i64) -> GestureOutcome {
        session.on_press();
        clock.advance(hold);
        session.on_release();
        clock.advance(run);
        let outcome = session.on_press();
        session.on_release();
        outcome
    }

    #[test]
    fn hold_release_press_records_one_solve() {
        let (mut s, clock, store) = session();
        let scramble = s.scramble().to_string();

        let outcome = solve_once(&mut s, &clock, 500, 12_000);

        assert_eq!(outcome, GestureOutcome::Stopped { elapsed_ms: 12_000 });
        assert_eq!(s.history().len(), 1);
        let solve = s.last_solve().unwrap();
        assert_eq!(solve.raw_time_ms, 12_000);
        assert_eq!(solve.penalty, Penalty::None);
        assert_eq!(solve.scramble, scramble);
        assert_ne!(s.scramble(), scramble);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn early_release_records_nothing() {
        let (mut s, clock, _) = session();
        s.on_press();
        clock.advance(100);
        assert_eq!(s.on_release(), GestureOutcome::Cancelled);
        assert!(s.history().is_empty());
        assert_eq!(s.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn negative_elapsed_is_clamped() {
        let (mut s, _, _) = session();
        let solve = s.record(-50);
        assert_eq!(solve.raw_time_ms, 0);
    }

    #[test]
    fn penalties_toggle_on_the_last_solve() {
        let (mut s, clock, store) = session();
        solve_once(&mut s, &clock, 300, 10_000);

        assert!(s.toggle_plus_two_last());
        assert_eq!(s.last_solve().unwrap().effective_ms(), Some(12_000));
        assert!(s.toggle_dnf_last());
        assert_eq!(s.last_solve().unwrap().penalty, Penalty::Dnf);
        assert!(s.toggle_dnf_last());
        assert_eq!(s.last_solve().unwrap().penalty, Penalty::None);
        assert_eq!(store.snapshot()[0].penalty, Penalty::None);
    }

    #[test]
    fn stale_ids_are_silent_noops() {
        let (mut s, clock, _) = session();
        solve_once(&mut s, &clock, 300, 1_000);
        let before = s.history().clone();

        assert!(!s.set_penalty("gone", Penalty::Dnf));
        assert!(!s.toggle_plus_two("gone"));
        assert!(!s.delete("gone"));
        assert_eq!(s.history(), &before);
    }

    #[test]
    fn set_penalty_is_idempotent() {
        let (mut s, clock, _) = session();
        solve_once(&mut s, &clock, 300, 1_000);
        let id = s.last_solve().unwrap().id.clone();

        s.set_penalty(&id, Penalty::PlusTwo);
        let once = s.history().clone();
        s.set_penalty(&id, Penalty::PlusTwo);
        assert_eq!(s.history(), &once);
    }

    #[test]
    fn delete_last_removes_exactly_one() {
        let (mut s, clock, store) = session();
        for run in [1_000, 2_000, 3_000] {
            solve_once(&mut s, &clock, 300, run);
        }
        assert!(s.delete_last());
        let times: Vec<u64> = s.solves().iter().map(|x| x.raw_time_ms).collect();
        assert_eq!(times, vec![1_000, 2_000]);
        assert_eq!(store.snapshot().len(), 2);

        s.clear();
        assert!(s.history().is_empty());
        assert!(!s.delete_last());
    }

    #[test]
    fn statistics_follow_the_active_puzzle() {
        let (mut s, clock, _) = session();
        for run in [1_000, 2_000, 3_000, 4_000, 5_000] {
            solve_once(&mut s, &clock, 300, run);
        }
        assert_eq!(s.summary().averages[0], (5, Some(3_000.0)));

        s.set_puzzle(PuzzleType::Cube2);
        let summary = s.summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.best, None);
        assert!(!s.toggle_dnf_last());
    }

    #[test]
    fn switching_puzzle_aborts_the_attempt() {
        let (mut s, clock, _) = session();
        s.on_press();
        clock.advance(400);
        s.on_release();
        assert!(s.is_running());
        assert!(!s.new_scramble());

        s.next_puzzle();
        assert_eq!(s.puzzle(), PuzzleType::Cube4);
        assert!(!s.is_running());
        assert!(s.history().is_empty());
    }

    #[test]
    fn live_elapsed_tracks_the_clock() {
        let (mut s, clock, _) = session();
        assert_eq!(s.live_elapsed(), None);
        s.on_press();
        assert_eq!(s.signal(), Signal::Neutral);
        clock.advance(300);
        assert_eq!(s.signal(), Signal::Ready);
        s.on_release();
        clock.advance(1_234);
        assert_eq!(s.live_elapsed(), Some(1_234));
    }

    #[test]
    fn store_failure_keeps_the_solve_in_memory() {
        let clock = ManualClock::new(0);
        let mut s = Session::new(
            SessionConfig::default(),
            Box::new(clock.clone()),
            Box::new(RandomMoveScrambler::with_seed(2)),
            Box::new(FailingStore),
        );
        solve_once(&mut s, &clock, 300, 7_000);

        assert_eq!(s.history().len(), 1);
        assert_matches!(s.store_error(), Some(msg) if msg.contains("disk full"));
    }

    #[test]
    fn load_orders_stored_history() {
        let mut older = Solve::new(1, "R".into(), PuzzleType::Cube3);
        older.created_at = chrono::DateTime::from_timestamp_millis(1_000).unwrap();
        let mut newer = Solve::new(2, "U".into(), PuzzleType::Cube3);
        newer.created_at = chrono::DateTime::from_timestamp_millis(2_000).unwrap();

        let mut s = Session::new(
            SessionConfig::default(),
            Box::new(ManualClock::new(0)),
            Box::new(RandomMoveScrambler::with_seed(3)),
            Box::new(MemoryStore::with_solves(vec![newer, older])),
        );
        assert_eq!(s.load().unwrap(), 2);
        assert_eq!(s.last_solve().unwrap().raw_time_ms, 2);
    }
}
