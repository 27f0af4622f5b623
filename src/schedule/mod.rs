pub mod arithmetic;
pub mod classifier;
pub mod view;

pub use arithmetic::{
    format_countdown, format_duration, format_timer_display, time_block_progress, time_until,
    timer_progress, TimeUntil, Urgency,
};
pub use classifier::{classify, ScheduleKind, TaskSchedule};
pub use view::{schedule_view, ScheduleView};
