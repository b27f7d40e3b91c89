//! Remote workout API - the system of record for sessions and catalog
//!
//! The controller only talks to [`WorkoutService`]; [`ApiClient`] is the
//! HTTP implementation used by the binaries.

pub mod auth;
pub mod client;
pub mod history;
pub mod reports;

use chrono::NaiveDate;

use crate::error::ServiceError;
use crate::exercises::Exercise;
use crate::workout::model::{RegisterSeries, SeriesExecution, StartWorkout, WorkoutSession, WorkoutStatus};

pub use auth::{AuthResponse, Login, Registration, User};
pub use client::ApiClient;
pub use history::{DateRange, HistoryFilter, StatsPeriod, StatsQuery};
pub use reports::{Metric, ReportQuery, SeriesType};

/// Source of the bearer credential attached to every request
pub trait CredentialProvider {
    fn bearer_token(&self) -> Option<String>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for &T {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }
}

/// Fixed token, or none for anonymous calls
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Operations of the workout execution endpoints
#[allow(async_fn_in_trait)]
pub trait WorkoutService {
    /// Fails with [`ServiceError::Conflict`] when a session already exists today
    async fn start_workout(&self, request: &StartWorkout) -> Result<WorkoutSession, ServiceError>;

    async fn available_exercises(&self, workout_id: &str) -> Result<Vec<Exercise>, ServiceError>;

    async fn select_exercises(&self, workout_id: &str, exercise_ids: &[String]) -> Result<(), ServiceError>;

    async fn define_series_count(
        &self,
        workout_id: &str,
        exercise_execution_id: &str,
        count: u8,
    ) -> Result<(), ServiceError>;

    async fn register_series(
        &self,
        workout_id: &str,
        exercise_execution_id: &str,
        series_number: u8,
        data: &RegisterSeries,
    ) -> Result<SeriesExecution, ServiceError>;

    async fn complete_exercise(&self, workout_id: &str, exercise_execution_id: &str) -> Result<(), ServiceError>;

    async fn finish_workout(&self, workout_id: &str, notes: Option<&str>) -> Result<(), ServiceError>;

    async fn workout_details(&self, workout_id: &str) -> Result<WorkoutSession, ServiceError>;

    async fn list_workouts(&self) -> Result<Vec<WorkoutSession>, ServiceError>;

    async fn delete_workout(&self, workout_id: &str) -> Result<(), ServiceError>;

    /// In-progress session dated `today` (UTC calendar day), if any
    async fn active_workout(&self, today: NaiveDate) -> Result<Option<WorkoutSession>, ServiceError> {
        let workouts = self.list_workouts().await?;
        Ok(workouts.into_iter().find(|w| {
            w.status == WorkoutStatus::InProgress && w.date.date_naive() == today
        }))
    }
}
