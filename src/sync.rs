//! Fire-and-forget remote writes.
//!
//! The session applies every mutation locally first and then queues the
//! matching remote call here. A single worker thread drains the queue in
//! order, so remote writes are serialized and never touch session state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::PrismError;
use crate::remote::{SolvePatch, SolveRemote};
use crate::solve::Solve;

/// How long closing the session waits for queued remote writes
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    Create(Solve),
    Update { id: String, patch: SolvePatch },
    Delete(String),
    Clear(Vec<String>),
}

impl SyncOp {
    fn name(&self) -> &'static str {
        match self {
            SyncOp::Create(_) => "create",
            SyncOp::Update { .. } => "update",
            SyncOp::Delete(_) => "delete",
            SyncOp::Clear(_) => "clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport {
    Done(&'static str),
    /// A create went through; the server knows the solve as `remote`
    Created { local: String, remote: String },
    Failed { op: &'static str, error: String },
}

/// Remote state as shown in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncHealth {
    /// Not signed in
    #[default]
    Local,
    Synced,
    Offline { failures: usize },
}

impl SyncHealth {
    pub fn absorb(self, report: &SyncReport) -> Self {
        match (self, report) {
            (_, SyncReport::Done(_) | SyncReport::Created { .. }) => SyncHealth::Synced,
            (SyncHealth::Offline { failures }, SyncReport::Failed { .. }) => SyncHealth::Offline {
                failures: failures + 1,
            },
            (_, SyncReport::Failed { .. }) => SyncHealth::Offline { failures: 1 },
        }
    }

    pub fn label(&self) -> String {
        match self {
            SyncHealth::Local => "local".to_string(),
            SyncHealth::Synced => "synced".to_string(),
            SyncHealth::Offline { failures } => format!("offline ({failures} failed)"),
        }
    }
}

pub struct SyncWorker {
    tx: Option<Sender<SyncOp>>,
    reports: Receiver<SyncReport>,
    handle: Option<JoinHandle<()>>,
    abandon: Arc<AtomicBool>,
}

impl SyncWorker {
    pub fn spawn<R: SolveRemote + 'static>(remote: R) -> Self {
        let (tx, rx) = mpsc::channel::<SyncOp>();
        let (report_tx, reports) = mpsc::channel();
        let abandon = Arc::new(AtomicBool::new(false));
        let abandoned = abandon.clone();

        let handle = thread::spawn(move || {
            // server ids for solves created in this run
            let mut remote_ids: HashMap<String, String> = HashMap::new();
            for op in rx {
                let name = op.name();
                if abandoned.load(Ordering::Relaxed) {
                    debug!(op = name, "shutdown grace over, remote write skipped");
                    continue;
                }
                let report = match apply(&remote, &mut remote_ids, op) {
                    Ok(Some((local, remote))) => {
                        debug!(op = name, "remote sync ok");
                        SyncReport::Created { local, remote }
                    }
                    Ok(None) => {
                        debug!(op = name, "remote sync ok");
                        SyncReport::Done(name)
                    }
                    Err(e) => {
                        warn!(op = name, error = %e, "remote sync failed, local copy kept");
                        SyncReport::Failed {
                            op: name,
                            error: e.to_string(),
                        }
                    }
                };
                if report_tx.send(report).is_err() {
                    break;
                }
            }
        });

        Self {
            tx: Some(tx),
            reports,
            handle: Some(handle),
            abandon,
        }
    }

    /// Queues a remote write; never blocks the caller
    pub fn submit(&self, op: SyncOp) {
        if let Some(tx) = &self.tx {
            if tx.send(op).is_err() {
                warn!("sync worker is gone, remote write dropped");
            }
        }
    }

    pub fn drain_reports(&self) -> Vec<SyncReport> {
        self.reports.try_iter().collect()
    }

    /// Closes the queue and waits at most `grace` for pending writes. Whatever
    /// is still queued after that is skipped and the worker is detached.
    pub fn finish(&mut self, grace: Duration) -> Vec<SyncReport> {
        if self.tx.take().is_none() && self.handle.is_none() {
            return self.drain_reports();
        }
        let deadline = Instant::now() + grace;
        let mut reports = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.reports.recv_timeout(left) {
                Ok(report) => reports.push(report),
                Err(RecvTimeoutError::Disconnected) => {
                    if let Some(handle) = self.handle.take() {
                        let _ = handle.join();
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.handle.take().is_some() {
                        warn!("remote writes still pending at exit, giving up on them");
                        self.abandon.store(true, Ordering::Relaxed);
                    }
                    break;
                }
            }
        }
        reports
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.finish(SHUTDOWN_GRACE);
    }
}

/// A solve the server does not have is already gone
fn delete_remote<R: SolveRemote>(remote: &R, id: &str) -> crate::error::Result<()> {
    match remote.delete(id) {
        Err(PrismError::Remote { status: 404, .. }) => {
            debug!(id, "remote delete of unknown solve");
            Ok(())
        }
        other => other,
    }
}

/// Runs one op; a create returns the local and server ids of the new solve
fn apply<R: SolveRemote>(
    remote: &R,
    remote_ids: &mut HashMap<String, String>,
    op: SyncOp,
) -> crate::error::Result<Option<(String, String)>> {
    let resolve = |ids: &HashMap<String, String>, id: &str| -> String {
        ids.get(id).cloned().unwrap_or_else(|| id.to_string())
    };

    match op {
        SyncOp::Create(solve) => {
            let created = remote.create(&solve)?;
            if created.id != solve.id {
                remote_ids.insert(solve.id.clone(), created.id.clone());
            }
            return Ok(Some((solve.id, created.id)));
        }
        SyncOp::Update { id, patch } => {
            remote.update(&resolve(remote_ids, &id), &patch)?;
        }
        SyncOp::Delete(id) => {
            delete_remote(remote, &resolve(remote_ids, &id))?;
            remote_ids.remove(&id);
        }
        SyncOp::Clear(ids) => {
            // every id gets its delete; the first failure is reported after
            let mut first_error = None;
            let mut failed = 0;
            for id in ids {
                match delete_remote(remote, &resolve(remote_ids, &id)) {
                    Ok(()) => {
                        remote_ids.remove(&id);
                    }
                    Err(e) => {
                        failed += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                warn!(failed, "clear left solves on the server");
                return Err(e);
            }
        }
    }
    Ok(None)
}
