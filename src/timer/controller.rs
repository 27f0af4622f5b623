use std::{sync::Arc, time::Duration};

use log::{debug, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex, MutexGuard},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    notifications::{Notifier, Permission},
    settings::TimerSettings,
    storage::KeyValueStore,
};
use crate::log_error;

use super::{
    persistence::SessionStorage,
    state::{ActiveSession, TaskId, TickOutcome, TimerPhase},
};

const ENABLE_LOGS: bool = true;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub session: Option<ActiveSession>,
    pub remaining_seconds: u64,
}

impl TimerSnapshot {
    fn of(phase: &TimerPhase) -> Self {
        Self {
            session: phase.session().cloned(),
            remaining_seconds: phase.remaining_seconds(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    #[serde(rename_all = "camelCase")]
    Completed { task_id: TaskId, task_title: String },
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Owns the single timer session. Every action takes the state lock for the
/// whole transition, including the storage write and the ticker swap.
///
/// Lock order is state then ticker. The ticker task only ever takes the
/// state lock.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerPhase>>,
    storage: SessionStorage,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<TimerEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Option<Duration>,
}

impl TimerController {
    /// Builds the controller from whatever session was persisted, resuming
    /// the ticker when that session was running.
    pub async fn restore(
        clock: Arc<dyn Clock>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        settings: &TimerSettings,
    ) -> Self {
        let storage = SessionStorage::new(store, settings.storage_key.clone());
        let phase = storage.load(clock.now());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let controller = Self {
            state: Arc::new(Mutex::new(phase)),
            storage,
            clock,
            notifier,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: settings.tick_interval(),
        };

        {
            let guard = controller.state.lock().await;
            controller.persist(&guard);
            if guard.is_running() {
                let mut ticker = controller.ticker.lock().await;
                controller.spawn_ticker(&mut ticker);
            }
        }

        controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::of(&*self.state.lock().await)
    }

    pub async fn active_session(&self) -> Option<ActiveSession> {
        self.state.lock().await.session().cloned()
    }

    pub async fn remaining_seconds(&self) -> u64 {
        self.state.lock().await.remaining_seconds()
    }

    pub async fn start(&self, task_id: TaskId, task_title: impl Into<String>, duration_minutes: u32) -> TimerSnapshot {
        if self.notifier.permission() == Permission::NotAsked {
            let answer = self.notifier.request_permission();
            debug!("Notification permission after prompt: {answer:?}");
        }

        let task_title = task_title.into();
        let snapshot = {
            let mut guard = self.state.lock().await;
            if let Some(previous) = guard.session() {
                info!("Replacing timer for task {} with task {task_id}", previous.task_id);
            }
            guard.start(task_id, task_title, duration_minutes, self.clock.now());
            self.persist(&guard);
            let mut ticker = self.ticker.lock().await;
            self.spawn_ticker(&mut ticker);
            TimerSnapshot::of(&guard)
        };

        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Returns false when there was no running session to pause.
    pub async fn pause(&self) -> bool {
        let snapshot = {
            let mut guard = self.state.lock().await;
            if !guard.pause(self.clock.now()) {
                return false;
            }
            self.persist(&guard);
            Self::cancel_ticker(&mut *self.ticker.lock().await);
            TimerSnapshot::of(&guard)
        };

        self.emit(TimerEvent::StateChanged(snapshot));
        true
    }

    pub async fn resume(&self) -> bool {
        let snapshot = {
            let mut guard = self.state.lock().await;
            if !guard.resume(self.clock.now()) {
                return false;
            }
            self.persist(&guard);
            let mut ticker = self.ticker.lock().await;
            self.spawn_ticker(&mut ticker);
            TimerSnapshot::of(&guard)
        };

        self.emit(TimerEvent::StateChanged(snapshot));
        true
    }

    /// One second of work. Driven by the background ticker, or by callers
    /// when the ticker is disabled.
    pub async fn tick(&self) -> TickOutcome {
        self.advance(true).await
    }

    pub async fn complete_now(&self) -> bool {
        let snapshot = {
            let mut guard = self.state.lock().await;
            if !guard.complete_now() {
                return false;
            }
            self.persist(&guard);
            Self::cancel_ticker(&mut *self.ticker.lock().await);
            TimerSnapshot::of(&guard)
        };

        self.emit(TimerEvent::StateChanged(snapshot));
        true
    }

    /// Clears the session from memory and storage. Safe from any state.
    pub async fn stop(&self) -> bool {
        let (was_active, snapshot) = {
            let mut guard = self.state.lock().await;
            let was_active = guard.stop();
            self.persist(&guard);
            Self::cancel_ticker(&mut *self.ticker.lock().await);
            (was_active, TimerSnapshot::of(&guard))
        };

        if was_active {
            self.emit(TimerEvent::StateChanged(snapshot));
        }
        was_active
    }

    /// `cancel_on_complete` is false inside the ticker task, which ends its
    /// own loop instead of aborting itself.
    async fn advance(&self, cancel_on_complete: bool) -> TickOutcome {
        let (outcome, snapshot) = {
            let mut guard = self.state.lock().await;
            let outcome = guard.tick(self.clock.now());
            if outcome == TickOutcome::Ignored {
                return outcome;
            }
            self.persist(&guard);
            if outcome == TickOutcome::Completed && cancel_on_complete {
                Self::cancel_ticker(&mut *self.ticker.lock().await);
            }
            (outcome, TimerSnapshot::of(&guard))
        };

        if outcome == TickOutcome::Completed {
            if let Some(session) = snapshot.session.as_ref() {
                info!(
                    "Timer for task {} completed after {}s",
                    session.task_id, session.elapsed_seconds
                );
                self.notify_completed(&session.task_title);
                self.emit(TimerEvent::Completed {
                    task_id: session.task_id,
                    task_title: session.task_title.clone(),
                });
            }
        }
        self.emit(TimerEvent::StateChanged(snapshot));
        outcome
    }

    fn notify_completed(&self, task_title: &str) {
        if self.notifier.permission() != Permission::Granted {
            debug!("Skipping completion notification; permission not granted");
            return;
        }
        self.notifier
            .show("Timer complete!", &format!("Time's up for \"{task_title}\""));
    }

    fn persist(&self, phase: &TimerPhase) {
        if let Err(err) = self.storage.save(phase) {
            log_error!("Failed to persist timer under '{}': {err}", self.storage.key());
        }
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Callers hold the state lock, so no other transition can slip in
    /// between the state change and the ticker swap.
    fn spawn_ticker(&self, ticker_guard: &mut MutexGuard<'_, Option<Ticker>>) {
        if let Some(previous) = ticker_guard.take() {
            previous.stop();
        }
        let Some(period) = self.tick_interval else {
            return;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match controller.advance(false).await {
                    TickOutcome::Counted => {}
                    TickOutcome::Completed | TickOutcome::Ignored => break,
                }
            }
        });

        **ticker_guard = Some(Ticker { handle, cancel });
    }

    fn cancel_ticker(slot: &mut Option<Ticker>) {
        if let Some(ticker) = slot.take() {
            ticker.stop();
        }
    }

    #[cfg(test)]
    async fn ticker_active(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|ticker| !ticker.handle.is_finished())
    }
}
