use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::models::OwnerId;
use crate::repository::SubscriptionRepository;
use crate::tick::FeedMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Stopped => "stopped",
            SchedulerState::Running => "running",
            SchedulerState::Paused => "paused",
        }
    }
}

struct Control {
    shutdown: CancellationToken,
    abort: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    monitor: Arc<FeedMonitor>,
    interval: Duration,
    first_run_delay: Duration,
    state: watch::Sender<SchedulerState>,
    control: Mutex<Option<Control>>,
    tick_lock: tokio::sync::Mutex<()>,
}

/// Recurring monitor job.
///
/// One task drives the ticks, so ticks never overlap. While paused the task
/// keeps its timer and waits to be resumed; a tick that fell due during the
/// pause runs right after resuming. A tick in which nothing was polled
/// pauses the scheduler.
#[derive(Clone)]
pub struct MonitorScheduler {
    inner: Arc<Inner>,
}

impl MonitorScheduler {
    pub fn new(monitor: Arc<FeedMonitor>, config: &MonitorConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            inner: Arc::new(Inner {
                monitor,
                interval: config.interval(),
                first_run_delay: config.first_run_delay(),
                state,
                control: Mutex::new(None),
                tick_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state.subscribe()
    }

    pub fn monitor(&self) -> &Arc<FeedMonitor> {
        &self.inner.monitor
    }

    /// Start the timer. Only a stopped scheduler can be started.
    pub fn start(&self) -> bool {
        let mut control = self.inner.control.lock();
        if control.is_some() {
            return false;
        }

        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        self.inner.state.send_replace(SchedulerState::Running);

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.inner),
            shutdown.clone(),
            abort.clone(),
        ));
        *control = Some(Control {
            shutdown,
            abort,
            task,
        });

        tracing::info!(
            "Monitor started, first tick in {:?}, then every {:?}",
            self.inner.first_run_delay,
            self.inner.interval
        );
        true
    }

    pub fn pause(&self) -> bool {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == SchedulerState::Running {
                *state = SchedulerState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!("Monitor paused");
        }
        changed
    }

    pub fn resume(&self) -> bool {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == SchedulerState::Paused {
                *state = SchedulerState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!("Monitor resumed");
        }
        changed
    }

    /// Resume a paused scheduler, or start a stopped one when `may_start`.
    ///
    /// Called after a subscription is added or resumed.
    pub fn wake(&self, may_start: bool) -> bool {
        match self.state() {
            SchedulerState::Paused => self.resume(),
            SchedulerState::Stopped if may_start => self.start(),
            _ => false,
        }
    }

    /// Stop the timer after the in-flight tick, if any, finishes.
    pub fn shutdown(&self) -> bool {
        self.take_control(false).is_some()
    }

    /// Stop the timer and abort every in-flight poll.
    pub fn shutdown_now(&self) -> bool {
        self.take_control(true).is_some()
    }

    /// Stop and wait for the scheduler task to exit.
    pub async fn shutdown_and_wait(&self, abort: bool) -> bool {
        match self.take_control(abort) {
            Some(task) => {
                if let Err(e) = task.await {
                    tracing::error!("Monitor task ended abnormally: {}", e);
                }
                true
            }
            None => false,
        }
    }

    pub fn cancel_poll(&self, owner: OwnerId, title: &str) -> bool {
        self.inner.monitor.cancel_poll(owner, title)
    }

    fn take_control(&self, abort: bool) -> Option<JoinHandle<()>> {
        let control = self.inner.control.lock().take()?;

        if abort {
            control.abort.cancel();
        }
        control.shutdown.cancel();
        self.inner.state.send_replace(SchedulerState::Stopped);

        tracing::info!("Monitor stopped");
        Some(control.task)
    }
}

async fn run_loop(inner: Arc<Inner>, shutdown: CancellationToken, abort: CancellationToken) {
    let mut state = inner.state.subscribe();
    let mut timer =
        tokio::time::interval_at(Instant::now() + inner.first_run_delay, inner.interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            changed = state.wait_for(|s| *s != SchedulerState::Paused) => {
                if changed.is_err() {
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = state.changed() => continue,
            _ = timer.tick() => {}
        }

        let report = {
            let _guard = inner.tick_lock.lock().await;
            inner.monitor.tick(&abort).await
        };

        if report.aborted || shutdown.is_cancelled() {
            break;
        }

        if report.idle && pause_when_idle(&inner.state, inner.monitor.repository()) {
            tracing::info!("No active subscriptions, monitor paused");
        }
    }

    tracing::debug!("Monitor task exited");
}

/// Pause a running scheduler when no subscription is active. The check runs
/// under the state lock, so a subscribe that wakes the scheduler either sees
/// `Paused` or has already made its subscription visible here.
fn pause_when_idle(
    state: &watch::Sender<SchedulerState>,
    repository: &SubscriptionRepository,
) -> bool {
    state.send_if_modified(|s| {
        if *s == SchedulerState::Running && !repository.has_active() {
            *s = SchedulerState::Paused;
            true
        } else {
            false
        }
    })
}
