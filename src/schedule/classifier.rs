use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleKind {
    TimeBlock,
    Timer,
    Deadline,
    None,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::TimeBlock => "time-block",
            ScheduleKind::Timer => "timer",
            ScheduleKind::Deadline => "deadline",
            ScheduleKind::None => "none",
        }
    }
}

/// Read-only scheduling view of a task as delivered by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSchedule {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub due: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub recurring: bool,
}

impl TaskSchedule {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            start: None,
            due: None,
            duration_minutes: None,
            recurring: false,
        }
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn kind(&self) -> ScheduleKind {
        classify(self)
    }

    /// Instant at which the scheduled work is expected to end.
    pub fn planned_end(&self) -> Option<DateTime<Utc>> {
        match self.kind() {
            ScheduleKind::TimeBlock | ScheduleKind::Deadline => self.due,
            ScheduleKind::Timer => {
                let start = self.start?;
                let minutes = self.duration_minutes?;
                Some(start + Duration::minutes(i64::from(minutes)))
            }
            ScheduleKind::None => None,
        }
    }
}

/// First match wins: start+due, then start+duration, then due alone.
/// Duration is ignored whenever due is also present.
pub fn classify(task: &TaskSchedule) -> ScheduleKind {
    match (task.start, task.due, task.duration_minutes) {
        (Some(_), Some(_), _) => ScheduleKind::TimeBlock,
        (Some(_), None, Some(_)) => ScheduleKind::Timer,
        (_, Some(_), _) => ScheduleKind::Deadline,
        _ => ScheduleKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn start_due_and_duration_is_a_time_block() {
        let task = TaskSchedule::new(1, "Deep work")
            .with_start(at(9))
            .with_due(at(11))
            .with_duration(45);
        assert_eq!(classify(&task), ScheduleKind::TimeBlock);
        assert_eq!(task.planned_end(), Some(at(11)));
    }

    #[test]
    fn start_and_duration_is_a_timer() {
        let task = TaskSchedule::new(2, "Pomodoro").with_start(at(9)).with_duration(25);
        assert_eq!(classify(&task), ScheduleKind::Timer);
        assert_eq!(
            task.planned_end(),
            Some(at(9) + Duration::minutes(25))
        );
    }

    #[test]
    fn due_alone_is_a_deadline() {
        let task = TaskSchedule::new(3, "File taxes").with_due(at(17));
        assert_eq!(classify(&task), ScheduleKind::Deadline);
    }

    #[test]
    fn partial_inputs_fall_through_to_none() {
        assert_eq!(classify(&TaskSchedule::new(4, "Inbox")), ScheduleKind::None);
        assert_eq!(
            classify(&TaskSchedule::new(5, "Start only").with_start(at(8))),
            ScheduleKind::None
        );
        assert_eq!(
            classify(&TaskSchedule::new(6, "Duration only").with_duration(30)),
            ScheduleKind::None
        );
    }

    #[test]
    fn due_with_duration_but_no_start_is_still_a_deadline() {
        let task = TaskSchedule::new(7, "Essay").with_due(at(20)).with_duration(90);
        assert_eq!(classify(&task), ScheduleKind::Deadline);
    }

    #[test]
    fn kind_serializes_in_kebab_case() {
        let json = serde_json::to_string(&ScheduleKind::TimeBlock).unwrap();
        assert_eq!(json, "\"time-block\"");
        assert_eq!(ScheduleKind::TimeBlock.as_str(), "time-block");
    }

    proptest! {
        #[test]
        fn start_and_due_always_win(
            start_offset in -10_000i64..10_000,
            due_offset in -10_000i64..10_000,
            duration in prop::option::of(0u32..1_000),
        ) {
            let mut task = TaskSchedule::new(1, "any")
                .with_start(at(12) + Duration::minutes(start_offset))
                .with_due(at(12) + Duration::minutes(due_offset));
            task.duration_minutes = duration;
            prop_assert_eq!(classify(&task), ScheduleKind::TimeBlock);
        }

        #[test]
        fn classification_matches_field_presence(
            has_start in any::<bool>(),
            has_due in any::<bool>(),
            has_duration in any::<bool>(),
        ) {
            let mut task = TaskSchedule::new(1, "any");
            if has_start { task.start = Some(at(9)); }
            if has_due { task.due = Some(at(10)); }
            if has_duration { task.duration_minutes = Some(30); }

            let expected = if has_start && has_due {
                ScheduleKind::TimeBlock
            } else if has_start && has_duration {
                ScheduleKind::Timer
            } else if has_due {
                ScheduleKind::Deadline
            } else {
                ScheduleKind::None
            };
            prop_assert_eq!(classify(&task), expected);
        }
    }
}
