//! Workout execution: session model, rest timer and the controller that
//! walks a session from planning to finish

pub mod controller;
pub mod model;
pub mod timer;

pub use controller::{Completion, Executing, ExerciseStep, Phase, StartOutcome, WorkoutController};
pub use model::{ExerciseExecution, SeriesDraft, SeriesExecution, SeriesSlot, WorkoutSession, WorkoutStatus};
pub use timer::{RestTimer, TimerEvent};
