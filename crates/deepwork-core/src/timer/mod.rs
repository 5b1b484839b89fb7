mod controller;
mod engine;

pub use controller::{SaveOutcome, TimerController};
pub use engine::{FinishedInterval, TimerEngine, TimerPhase, TimerSnapshot, TimerStatus};
