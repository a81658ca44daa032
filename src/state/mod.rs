//! State management module
//!
//! The countdown's observable state, its persisted deadline, and the
//! application state that wires the pipeline together.

pub mod app_state;
pub mod deadline;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppSettings, AppState, Platform};
pub use deadline::TimerDeadline;
pub use timer_state::{TimerEvent, TimerState};
