pub mod display;
mod engine;
mod mode;

pub use engine::{TimerEngine, TimerState};
pub use mode::{Durations, TimerMode};
