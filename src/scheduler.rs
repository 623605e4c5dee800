//! SchedulerActor - Drives the periodic execution of one probe
//!
//! Each registered probe gets its own actor. The actor arms a timer at the
//! probe's interval and runs one execution per tick until it is shut down.
//!
//! ## Tick policy
//!
//! 1. **Delayed start** - the first execution happens one full interval after start
//! 2. **Skip if busy** - a tick that fires while the previous execution is still
//!    running is dropped, not queued, and logs nothing
//! 3. **No retries** - a failed execution is the outcome of that tick
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → busy? ──yes──→ (dropped)
//!                 └──no───→ spawn Execute() → log outcome under the probe span
//!     ↑
//!     └─── Commands (CheckNow, Shutdown)
//! ```
//!
//! Executions run on their own task, so a shutdown is observed right away
//! while an in-flight execution still completes and logs its outcome.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::probes::Probe;

/// Longest period the timer is armed with. Any longer interval never fires
/// in practice, and instant arithmetic overflows past a point.
const MAX_PERIOD: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Lifecycle of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, timer not armed yet
    Idle,
    /// Timer armed, ticking
    Running,
    /// Stopped for good
    Cancelled,
}

/// Commands that can be sent to a SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one execution now, through the same busy gate as timer ticks
    ///
    /// Answers `None` when an execution is already in flight.
    CheckNow {
        respond_to: oneshot::Sender<Option<ProbeResult<()>>>,
    },

    /// Stop scheduling new executions
    Shutdown,
}

/// Clears the busy flag when an execution ends, even if it panicked
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Actor that schedules a single probe
pub struct SchedulerActor {
    probe: Arc<dyn Probe>,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    state_tx: watch::Sender<SchedulerState>,

    /// Set while an execution of this probe is in flight
    busy: Arc<AtomicBool>,
}

impl SchedulerActor {
    pub fn new(
        probe: Arc<dyn Probe>,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        state_tx: watch::Sender<SchedulerState>,
    ) -> Self {
        Self {
            probe,
            command_rx,
            state_tx,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    pub async fn run(mut self) {
        let span = self.probe.span().clone();
        debug!(parent: &span, "starting scheduler");

        // tokio intervals panic on a zero period
        let period = self
            .probe
            .interval()
            .clamp(Duration::from_millis(1), MAX_PERIOD);
        let now = Instant::now();
        let start = now
            .checked_add(period)
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365));
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.state_tx.send_replace(SchedulerState::Running);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.try_execute();
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::CheckNow { respond_to }) => {
                        debug!(parent: &span, "received CheckNow command");
                        match self.try_execute() {
                            Some(execution) => {
                                tokio::spawn(async move {
                                    let outcome = execution.await.unwrap_or_else(|e| {
                                        Err(ProbeError::Execution(anyhow::anyhow!(
                                            "execution task failed: {e}"
                                        )))
                                    });
                                    let _ = respond_to.send(Some(outcome));
                                });
                            }
                            None => {
                                let _ = respond_to.send(None);
                            }
                        }
                    }

                    Some(SchedulerCommand::Shutdown) => {
                        debug!(parent: &span, "received shutdown command");
                        break;
                    }

                    None => {
                        warn!(parent: &span, "command channel closed, shutting down");
                        break;
                    }
                }
            }
        }

        self.state_tx.send_replace(SchedulerState::Cancelled);
        debug!(parent: &span, "scheduler stopped");
    }

    /// Starts one execution unless another one is still running
    fn try_execute(&self) -> Option<JoinHandle<ProbeResult<()>>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let guard = BusyGuard(self.busy.clone());
        let probe = self.probe.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            let result = probe.execute().await;
            log_outcome(probe.as_ref(), &result);
            result
        }))
    }
}

fn log_outcome(probe: &dyn Probe, result: &ProbeResult<()>) {
    match result {
        Ok(()) => info!(parent: probe.span(), "health check succeeded"),
        Err(e) => error!(parent: probe.span(), "health check failed: {e}"),
    }
}

/// Handle for controlling a SchedulerActor
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    state_rx: watch::Receiver<SchedulerState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Spawn a new scheduler for the given probe
    pub fn spawn(probe: Arc<dyn Probe>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);

        let actor = SchedulerActor::new(probe, cmd_rx, state_tx);
        let task = tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            state_rx,
            task,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Trigger an immediate execution
    ///
    /// The returned future does not borrow the handle. It resolves to `None`
    /// when the probe was busy.
    pub fn check_now(
        &self,
    ) -> impl Future<Output = Result<Option<ProbeResult<()>>>> + Send + use<> {
        let sender = self.sender.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            sender
                .send(SchedulerCommand::CheckNow { respond_to: tx })
                .await?;
            Ok(rx.await?)
        }
    }

    /// Stop the scheduler and wait until it no longer ticks
    ///
    /// An execution already in flight keeps running and still logs its outcome.
    pub async fn cancel(self) {
        let _ = self.sender.send(SchedulerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            error!("scheduler task failed: {e}");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
