//! treino - Workout execution client
//!
//! Start a session, pick exercises, plan and log series with a rest timer,
//! all against a remote workout API that owns the data.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod stats;
pub mod tui;
pub mod workout;

pub use api::ApiClient;
pub use db::Database;
pub use workout::WorkoutController;
