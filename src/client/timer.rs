use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use super::{ClientError, DraftBuffer, SessionActions};

/// Source of wall-clock time for the countdown.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Deadline arithmetic for one session. Remaining time is always derived from the two
/// authoritative values, never decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: OffsetDateTime,
    time_limit: Duration,
}

impl Countdown {
    pub fn new(started_at: OffsetDateTime, time_limit_minutes: i32) -> Self {
        Self { started_at, time_limit: Duration::minutes(i64::from(time_limit_minutes.max(0))) }
    }

    pub fn deadline(&self) -> OffsetDateTime {
        self.started_at + self.time_limit
    }

    pub fn remaining(&self, now: OffsetDateTime) -> Duration {
        (self.deadline() - now).max(Duration::ZERO)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.remaining(now).is_zero()
    }
}

const MIN_PERIOD: std::time::Duration = std::time::Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    pub tick: std::time::Duration,
    pub autosave_every: std::time::Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: std::time::Duration::from_secs(1),
            autosave_every: std::time::Duration::from_secs(30),
        }
    }
}

impl TimerConfig {
    /// Uses the autosave cadence the server advertises for the session.
    pub fn with_autosave_seconds(seconds: u64) -> Self {
        Self { autosave_every: std::time::Duration::from_secs(seconds.max(1)), ..Self::default() }
    }

    /// Periods the task actually runs with; zero would make `interval` panic.
    fn clamped(self) -> Self {
        Self {
            tick: self.tick.max(MIN_PERIOD),
            autosave_every: self.autosave_every.max(MIN_PERIOD),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expired,
}

#[derive(Debug)]
pub enum TimerOutcome {
    Submitted { total_points: i32, is_late: bool, trigger: SubmitTrigger },
    /// The exam did NOT submit; the UI must tell the student.
    SubmitFailed { error: ClientError, trigger: SubmitTrigger },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Submit,
    Cancel,
}

/// Background countdown with autosave and a single submit.
pub struct SessionTimer {
    control: watch::Sender<Control>,
    remaining: watch::Receiver<Duration>,
    submitted: Arc<AtomicBool>,
    handle: JoinHandle<TimerOutcome>,
}

impl SessionTimer {
    pub fn spawn<A, C>(
        countdown: Countdown,
        drafts: Arc<DraftBuffer>,
        actions: Arc<A>,
        clock: C,
        config: TimerConfig,
    ) -> Self
    where
        A: SessionActions + 'static,
        C: Clock,
    {
        let (control_tx, control_rx) = watch::channel(Control::Run);
        let (remaining_tx, remaining_rx) = watch::channel(countdown.remaining(clock.now()));
        let submitted = Arc::new(AtomicBool::new(false));

        let task = TimerTask {
            countdown,
            drafts,
            actions,
            clock,
            config,
            submitted: submitted.clone(),
            remaining: remaining_tx,
        };
        let handle = tokio::spawn(task.run(control_rx));

        Self { control: control_tx, remaining: remaining_rx, submitted, handle }
    }

    /// Latest remaining time, updated every tick.
    pub fn remaining(&self) -> watch::Receiver<Duration> {
        self.remaining.clone()
    }

    /// True once a submit has been attempted, whichever path triggered it.
    pub fn has_submitted(&self) -> bool {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Flushes drafts and submits now. If expiry already fired, returns that outcome instead.
    pub async fn submit(self) -> TimerOutcome {
        let _ = self.control.send(Control::Submit);
        self.join().await
    }

    /// Stops the countdown without submitting.
    pub async fn cancel(self) -> TimerOutcome {
        let _ = self.control.send(Control::Cancel);
        self.join().await
    }

    /// Waits for expiry (or a failure) to end the timer.
    pub async fn finished(self) -> TimerOutcome {
        self.join().await
    }

    async fn join(self) -> TimerOutcome {
        let Self { control, handle, .. } = self;
        let outcome = handle.await;
        drop(control);
        outcome.unwrap_or_else(|err| {
            tracing::error!(error = %err, "Session timer task failed");
            TimerOutcome::Cancelled
        })
    }
}

struct TimerTask<A: ?Sized, C> {
    countdown: Countdown,
    drafts: Arc<DraftBuffer>,
    actions: Arc<A>,
    clock: C,
    config: TimerConfig,
    submitted: Arc<AtomicBool>,
    remaining: watch::Sender<Duration>,
}

impl<A, C> TimerTask<A, C>
where
    A: SessionActions + ?Sized,
    C: Clock,
{
    async fn run(self, mut control: watch::Receiver<Control>) -> TimerOutcome {
        let config = self.config.clamped();
        let mut tick = interval(config.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut autosave = interval_at(Instant::now() + config.autosave_every, config.autosave_every);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = control.changed() => {
                    if changed.is_err() {
                        return TimerOutcome::Cancelled;
                    }
                    let requested = *control.borrow_and_update();
                    match requested {
                        Control::Cancel => return TimerOutcome::Cancelled,
                        Control::Submit => return self.finish(SubmitTrigger::Manual).await,
                        Control::Run => {}
                    }
                }
                _ = tick.tick() => {
                    let remaining = self.countdown.remaining(self.clock.now());
                    let _ = self.remaining.send(remaining);
                    if remaining.is_zero() {
                        return self.finish(SubmitTrigger::Expired).await;
                    }
                }
                _ = autosave.tick() => {
                    let report = self.drafts.flush(self.actions.as_ref()).await;
                    if report.failed > 0 {
                        tracing::warn!(failed = report.failed, "Autosave left unsaved answers");
                    }
                }
            }
        }
    }

    async fn finish(&self, trigger: SubmitTrigger) -> TimerOutcome {
        if self.submitted.swap(true, Ordering::SeqCst) {
            return TimerOutcome::Cancelled;
        }

        self.drafts.flush(self.actions.as_ref()).await;

        match self.actions.submit().await {
            Ok(receipt) => TimerOutcome::Submitted {
                total_points: receipt.total_points,
                is_late: receipt.is_late,
                trigger,
            },
            Err(error) => {
                tracing::error!(error = %error, ?trigger, "Exam submission failed");
                TimerOutcome::SubmitFailed { error, trigger }
            }
        }
    }
}
