use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::{ActiveSession, SessionStatus};

use super::{
    arithmetic::{
        format_countdown, format_duration, format_timer_display, time_block_progress, time_until,
        timer_progress, urgency, TimeUntil, Urgency,
    },
    classifier::{classify, ScheduleKind, TaskSchedule},
};

/// What a countdown/progress widget needs to render one task at `now`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScheduleView {
    #[serde(rename_all = "camelCase")]
    TimeBlock {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        length_label: String,
        progress: u8,
        /// Present until the block begins.
        starts_in: Option<TimeUntil>,
    },
    #[serde(rename_all = "camelCase")]
    Timer {
        duration_label: String,
        elapsed_seconds: u64,
        remaining_display: String,
        progress: u8,
        /// Status of the live session when it belongs to this task.
        session_status: Option<SessionStatus>,
    },
    #[serde(rename_all = "camelCase")]
    Deadline {
        due: DateTime<Utc>,
        until: TimeUntil,
        countdown_label: String,
        urgency: Urgency,
    },
    None,
}

pub fn schedule_view(
    task: &TaskSchedule,
    session: Option<&ActiveSession>,
    now: DateTime<Utc>,
) -> ScheduleView {
    match (classify(task), task.start, task.due) {
        (ScheduleKind::TimeBlock, Some(start), Some(end)) => {
            let minutes = (end - start).num_minutes().max(0);
            ScheduleView::TimeBlock {
                start,
                end,
                length_label: format_duration(u32::try_from(minutes).unwrap_or(u32::MAX)),
                progress: time_block_progress(start, end, now),
                starts_in: (now < start).then(|| time_until(start, now)),
            }
        }
        (ScheduleKind::Timer, _, _) => {
            let planned = task.duration_minutes.unwrap_or_default();
            let live = session.filter(|s| s.task_id == task.id);
            let (elapsed, ceiling, status) = match live {
                Some(s) => (s.elapsed_seconds, s.ceiling_seconds(), Some(s.status)),
                None => (0, u64::from(planned) * 60, None),
            };
            let minutes = live.map(|s| s.duration_minutes).unwrap_or(planned);
            ScheduleView::Timer {
                duration_label: format_duration(minutes),
                elapsed_seconds: elapsed,
                remaining_display: format_timer_display(ceiling.saturating_sub(elapsed)),
                progress: timer_progress(elapsed, minutes),
                session_status: status,
            }
        }
        (ScheduleKind::Deadline, _, Some(due)) => {
            let until = time_until(due, now);
            ScheduleView::Deadline {
                due,
                countdown_label: format_countdown(&until),
                until,
                urgency: urgency(due, now),
            }
        }
        _ => ScheduleView::None,
    }
}
