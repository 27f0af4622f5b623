pub mod controller;
pub mod persistence;
pub mod state;

pub use controller::{TimerController, TimerEvent, TimerSnapshot};
pub use persistence::{SessionStorage, DEFAULT_STORAGE_KEY};
pub use state::{ActiveSession, SessionStatus, TaskId, TickOutcome, TimerPhase};
