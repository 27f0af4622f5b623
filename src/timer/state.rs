use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TaskId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

/// The one timed work session. Serialized as-is under the storage key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub task_id: TaskId,
    pub task_title: String,
    pub duration_minutes: u32,
    /// Start of the current run segment.
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub status: SessionStatus,
    /// When `elapsed_seconds` was last brought current. Falls back to
    /// `started_at` for values written without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl ActiveSession {
    pub fn begin(task_id: TaskId, task_title: String, duration_minutes: u32, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            task_title,
            duration_minutes,
            started_at: now,
            paused_at: None,
            elapsed_seconds: 0,
            status: SessionStatus::Running,
            synced_at: Some(now),
        }
    }

    pub fn ceiling_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.ceiling_seconds().saturating_sub(self.elapsed_seconds)
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    fn last_synced(&self) -> DateTime<Utc> {
        self.synced_at.unwrap_or(self.started_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No running session; nothing counted.
    Ignored,
    Counted,
    /// This tick reached the planned duration.
    Completed,
}

/// Idle is a real state rather than a missing session.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TimerPhase {
    #[default]
    Idle,
    Active(ActiveSession),
}

impl TimerPhase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        match self {
            TimerPhase::Idle => None,
            TimerPhase::Active(session) => Some(session),
        }
    }

    pub fn status(&self) -> Option<SessionStatus> {
        self.session().map(|session| session.status)
    }

    pub fn is_running(&self) -> bool {
        self.session().is_some_and(ActiveSession::is_running)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session().map_or(0, ActiveSession::remaining_seconds)
    }

    /// Replaces whatever session existed, discarding its progress.
    pub fn start(&mut self, task_id: TaskId, task_title: String, duration_minutes: u32, now: DateTime<Utc>) {
        *self = TimerPhase::Active(ActiveSession::begin(task_id, task_title, duration_minutes, now));
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        match self {
            TimerPhase::Active(session) if session.status == SessionStatus::Running => {
                session.status = SessionStatus::Paused;
                session.paused_at = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        match self {
            TimerPhase::Active(session) if session.status == SessionStatus::Paused => {
                session.status = SessionStatus::Running;
                session.started_at = now;
                session.paused_at = None;
                session.synced_at = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let TimerPhase::Active(session) = self else {
            return TickOutcome::Ignored;
        };
        if session.status != SessionStatus::Running {
            return TickOutcome::Ignored;
        }

        session.synced_at = Some(now);
        let ceiling = session.ceiling_seconds();
        let next = session.elapsed_seconds.saturating_add(1);
        if next >= ceiling {
            session.elapsed_seconds = ceiling;
            session.status = SessionStatus::Completed;
            TickOutcome::Completed
        } else {
            session.elapsed_seconds = next;
            TickOutcome::Counted
        }
    }

    /// Manual early completion; leaves the elapsed count as it is.
    pub fn complete_now(&mut self) -> bool {
        match self {
            TimerPhase::Active(session) if session.status != SessionStatus::Completed => {
                session.status = SessionStatus::Completed;
                session.paused_at = None;
                true
            }
            _ => false,
        }
    }

    /// Returns whether a session was cleared.
    pub fn stop(&mut self) -> bool {
        let was_active = matches!(self, TimerPhase::Active(_));
        *self = TimerPhase::Idle;
        was_active
    }

    /// Restores a persisted session. Running sessions are credited with the
    /// whole seconds that passed since they were last synced, capped at the
    /// planned duration; paused and completed sessions come back unchanged.
    pub fn rehydrate(mut session: ActiveSession, now: DateTime<Utc>) -> Self {
        if session.status == SessionStatus::Running {
            let gap = (now - session.last_synced()).num_seconds().max(0) as u64;
            session.elapsed_seconds = session
                .elapsed_seconds
                .saturating_add(gap)
                .min(session.ceiling_seconds());
            session.started_at = now;
            session.synced_at = Some(now);
        }
        TimerPhase::Active(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 8, 30, 0).unwrap()
    }

    fn started(minutes: u32) -> TimerPhase {
        let mut phase = TimerPhase::new();
        phase.start(1, "Write report".into(), minutes, t0());
        phase
    }

    #[test]
    fn start_runs_from_zero() {
        let phase = started(25);
        let session = phase.session().unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.elapsed_seconds, 0);
        assert_eq!(session.started_at, t0());
        assert_eq!(phase.remaining_seconds(), 1500);
    }

    #[test]
    fn start_replaces_existing_session() {
        let mut phase = started(25);
        for _ in 0..30 {
            phase.tick(t0());
        }
        phase.start(2, "Review".into(), 10, t0() + Duration::minutes(1));

        let session = phase.session().unwrap();
        assert_eq!(session.task_id, 2);
        assert_eq!(session.elapsed_seconds, 0);
        assert_eq!(phase.remaining_seconds(), 600);
    }

    #[test]
    fn full_run_completes_without_overshoot() {
        let mut phase = started(25);
        let mut outcomes = Vec::new();
        for _ in 0..1500 {
            outcomes.push(phase.tick(t0()));
        }
        assert_eq!(outcomes.last(), Some(&TickOutcome::Completed));
        assert_eq!(
            outcomes.iter().filter(|o| **o == TickOutcome::Completed).count(),
            1
        );

        let session = phase.session().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.elapsed_seconds, 1500);

        assert_eq!(phase.tick(t0()), TickOutcome::Ignored);
        assert_eq!(phase.session().unwrap().elapsed_seconds, 1500);
    }

    #[test]
    fn zero_duration_completes_on_first_tick() {
        let mut phase = started(0);
        assert_eq!(phase.tick(t0()), TickOutcome::Completed);
        assert_eq!(phase.session().unwrap().elapsed_seconds, 0);
    }

    #[test]
    fn pause_freezes_elapsed_and_is_idempotent() {
        let mut phase = started(25);
        for _ in 0..10 {
            phase.tick(t0());
        }
        let paused_at = t0() + Duration::seconds(10);
        assert!(phase.pause(paused_at));
        let after_first = phase.clone();

        assert!(!phase.pause(paused_at + Duration::seconds(5)));
        assert_eq!(phase, after_first);

        assert_eq!(phase.tick(t0()), TickOutcome::Ignored);
        let session = phase.session().unwrap();
        assert_eq!(session.elapsed_seconds, 10);
        assert_eq!(session.paused_at, Some(paused_at));
    }

    #[test]
    fn resume_restarts_the_segment() {
        let mut phase = started(25);
        assert!(!phase.resume(t0()));

        phase.pause(t0() + Duration::seconds(3));
        let resumed_at = t0() + Duration::minutes(2);
        assert!(phase.resume(resumed_at));

        let session = phase.session().unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.started_at, resumed_at);
        assert_eq!(session.paused_at, None);
    }

    #[test]
    fn complete_now_keeps_elapsed() {
        let mut phase = started(25);
        for _ in 0..42 {
            phase.tick(t0());
        }
        phase.pause(t0());
        assert!(phase.complete_now());
        let session = phase.session().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.elapsed_seconds, 42);
        assert!(!phase.complete_now());

        assert!(!TimerPhase::Idle.complete_now());
    }

    #[test]
    fn stop_returns_to_idle_from_any_state() {
        let mut phase = started(5);
        assert!(phase.stop());
        assert_eq!(phase, TimerPhase::Idle);
        assert!(!phase.stop());
        assert_eq!(phase.remaining_seconds(), 0);
    }

    #[test]
    fn transitions_from_idle_are_ignored() {
        let mut phase = TimerPhase::Idle;
        assert!(!phase.pause(t0()));
        assert!(!phase.resume(t0()));
        assert_eq!(phase.tick(t0()), TickOutcome::Ignored);
        assert_eq!(phase, TimerPhase::Idle);
    }

    #[test]
    fn rehydrating_paused_session_adds_no_gap() {
        let mut phase = started(25);
        for _ in 0..10 {
            phase.tick(t0());
        }
        phase.pause(t0() + Duration::seconds(10));
        let stored = phase.session().unwrap().clone();

        let restored = TimerPhase::rehydrate(stored.clone(), t0() + Duration::seconds(60));
        assert_eq!(restored.session(), Some(&stored));
        assert_eq!(restored.session().unwrap().elapsed_seconds, 10);
    }

    #[test]
    fn rehydrating_caps_at_the_planned_duration() {
        let stored = ActiveSession::begin(1, "Write report".into(), 1, t0());
        let restored = TimerPhase::rehydrate(stored, t0() + Duration::hours(3));
        let session = restored.session().unwrap();
        assert_eq!(session.elapsed_seconds, 60);
        assert_eq!(session.status, SessionStatus::Running);
    }

    #[test]
    fn ticks_already_counted_are_not_credited_twice() {
        let mut phase = started(25);
        for second in 1..=10 {
            phase.tick(t0() + Duration::seconds(second));
        }
        let stored = phase.session().unwrap().clone();
        let restored = TimerPhase::rehydrate(stored, t0() + Duration::seconds(15));
        assert_eq!(restored.session().unwrap().elapsed_seconds, 15);
    }

    #[test]
    fn legacy_values_without_sync_marker_use_segment_start() {
        let json = r#"{"taskId":3,"taskTitle":"Plan","durationMinutes":10,
            "startedAt":"2026-02-10T08:30:00Z","elapsedSeconds":0,"status":"running"}"#;
        let stored: ActiveSession = serde_json::from_str(json).unwrap();
        assert_eq!(stored.synced_at, None);

        let restored = TimerPhase::rehydrate(stored, t0() + Duration::seconds(45));
        assert_eq!(restored.session().unwrap().elapsed_seconds, 45);
    }

    proptest! {
        #[test]
        fn rehydration_adds_exactly_the_gap(
            minutes in 1u32..120,
            already in 0u64..3_600,
            gap in 0i64..20_000,
        ) {
            let mut stored = ActiveSession::begin(9, "Focus".into(), minutes, t0());
            stored.elapsed_seconds = already.min(stored.ceiling_seconds());
            let before = stored.elapsed_seconds;
            let ceiling = stored.ceiling_seconds();
            let now = t0() + Duration::seconds(gap);

            let restored = TimerPhase::rehydrate(stored, now);
            let session = restored.session().unwrap();
            prop_assert_eq!(session.elapsed_seconds, (before + gap as u64).min(ceiling));
            prop_assert_eq!(session.started_at, now);
        }
    }
}
