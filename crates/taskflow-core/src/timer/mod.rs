mod engine;
mod phase;
mod session;

pub use engine::{ActiveTimer, FocusTimer, NO_TASK_TITLE};
pub use phase::{CycleCounting, Phase, SettingsPatch, TimerSettings};
pub use session::Session;
