use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Calendar-agnostic breakdown of the time left until a target instant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeUntil {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub is_past: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Critical,
    Urgent,
    Soon,
    Normal,
}

pub fn time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> TimeUntil {
    let total_ms = (target - now).num_milliseconds();
    if total_ms <= 0 {
        return TimeUntil {
            is_past: true,
            ..TimeUntil::default()
        };
    }

    TimeUntil {
        days: (total_ms / MS_PER_DAY) as u64,
        hours: ((total_ms / MS_PER_HOUR) % 24) as u64,
        minutes: ((total_ms / MS_PER_MINUTE) % 60) as u64,
        seconds: ((total_ms / MS_PER_SECOND) % 60) as u64,
        is_past: false,
    }
}

/// Past targets count as critical. All boundaries are strict.
pub fn urgency(target: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let remaining_ms = (target - now).num_milliseconds();
    if remaining_ms < MS_PER_HOUR {
        Urgency::Critical
    } else if remaining_ms < MS_PER_DAY {
        Urgency::Urgent
    } else if remaining_ms < 3 * MS_PER_DAY {
        Urgency::Soon
    } else {
        Urgency::Normal
    }
}

pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}m")
    }
}

/// `MM:SS` under an hour, `HH:MM:SS` otherwise.
pub fn format_timer_display(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Short label for a deadline countdown, keeping only the two largest units.
pub fn format_countdown(until: &TimeUntil) -> String {
    if until.is_past {
        "Overdue".to_string()
    } else if until.days > 0 {
        format!("{}d {}h", until.days, until.hours)
    } else if until.hours > 0 {
        format!("{}h {}m", until.hours, until.minutes)
    } else if until.minutes > 0 {
        format!("{}m {}s", until.minutes, until.seconds)
    } else {
        format!("{}s", until.seconds)
    }
}

pub fn time_block_progress(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    if now < start {
        return 0;
    }
    if now > end {
        return 100;
    }

    let total_ms = (end - start).num_milliseconds();
    if total_ms <= 0 {
        return 100;
    }
    let elapsed_ms = (now - start).num_milliseconds();
    percent(elapsed_ms as f64 / total_ms as f64)
}

pub fn timer_progress(elapsed_seconds: u64, duration_minutes: u32) -> u8 {
    let total_seconds = u64::from(duration_minutes) * 60;
    if total_seconds == 0 {
        return 100;
    }
    percent(elapsed_seconds as f64 / total_seconds as f64)
}

fn percent(ratio: f64) -> u8 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}
