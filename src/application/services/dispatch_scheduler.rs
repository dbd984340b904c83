use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::{
    handlers::message_dispatcher::MessageDispatchHandler, services::stop_signal::StopSignal,
};

enum SchedulerState {
    Stopped,
    Running {
        stop: StopSignal,
        task: JoinHandle<()>,
    },
}

/// Drives [`MessageDispatchHandler::tick`] on a fixed interval.
///
/// `start` and `stop` may be called from any task; transitions are
/// serialised by one lock, and each run gets its own [`StopSignal`].
pub struct DispatchScheduler {
    handler: Arc<MessageDispatchHandler>,
    interval: Duration,
    state: Mutex<SchedulerState>,
}

impl DispatchScheduler {
    pub fn new(handler: Arc<MessageDispatchHandler>, interval: Duration) -> Self {
        Self {
            handler,
            // tokio intervals reject a zero period
            interval: interval.max(Duration::from_millis(1)),
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    /// Spawns the tick loop under a child of `parent`. No-op when running.
    pub fn start(&self, parent: &CancellationToken) {
        let mut state = self.lock_state();
        if let SchedulerState::Running { task, .. } = &*state {
            if !task.is_finished() {
                info!("scheduler already running");
                return;
            }
            // The loop ended on its own (parent cancelled); start afresh.
        }

        let stop = StopSignal::child_of(parent);
        let task = tokio::spawn(run_loop(self.handler.clone(), self.interval, stop.clone()));
        *state = SchedulerState::Running { stop, task };

        info!(
            interval_ms = self.interval.as_millis() as u64,
            batch_size = self.handler.config().batch_size,
            "scheduler started"
        );
    }

    /// Cancels the current run with `reason`. No-op when stopped.
    ///
    /// A send already in flight completes; nothing after it is processed.
    pub fn stop(&self, reason: impl Into<String>) {
        if self.take_running(reason).is_none() {
            info!("scheduler not running");
        }
    }

    /// Like [`stop`](Self::stop), then waits for the loop to wind down.
    pub async fn shutdown(&self, reason: impl Into<String>) {
        let Some(task) = self.take_running(reason) else {
            return;
        };
        if let Err(err) = task.await {
            error!(error = %err, "scheduler task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lock_state(), SchedulerState::Running { task, .. } if !task.is_finished())
    }

    fn take_running(&self, reason: impl Into<String>) -> Option<JoinHandle<()>> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, SchedulerState::Stopped) {
            SchedulerState::Stopped => None,
            // The loop already exited because the parent was cancelled.
            SchedulerState::Running { task, .. } if task.is_finished() => None,
            SchedulerState::Running { stop, task } => {
                let reason = reason.into();
                info!(reason = %reason, "scheduler stopping");
                stop.cancel(reason);
                Some(task)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_loop(handler: Arc<MessageDispatchHandler>, period: Duration, stop: StopSignal) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                info!(
                    reason = stop.reason().unwrap_or("parent cancelled"),
                    "scheduler loop exiting"
                );
                return;
            }
            _ = ticker.tick() => {
                let report = handler.tick(&stop).await;
                debug!(?report, "tick finished");
            }
        }
    }
}
