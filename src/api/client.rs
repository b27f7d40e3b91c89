//! HTTP client for the workout API

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::auth::{AuthResponse, Login, Registration};
use super::history::{
    DateRange, DuplicatedWorkout, HistoryFilter, HistoryPage, HistoryStats, MuscleGroupShare, StatsQuery,
    WeekdayShare,
};
use super::reports::{ExerciseEvolution, PersonalRecord, ReportQuery, WorkoutOverview};
use super::{CredentialProvider, StaticToken, WorkoutService};
use crate::error::ServiceError;
use crate::exercises::{Exercise, MuscleGroup, NewExercise};
use crate::workout::model::{FinishWorkout, RegisterSeries, SeriesExecution, StartWorkout, WorkoutSession};

/// reqwest-backed API client with an injected credential source
pub struct ApiClient<P = StaticToken> {
    http: reqwest::Client,
    base_url: String,
    credentials: P,
}

impl<P: CredentialProvider> ApiClient<P> {
    pub fn new(base_url: &str, timeout: Duration, credentials: P) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &P {
        &self.credentials
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = self.credentials.bearer_token() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ServiceError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify(status.as_u16(), &body);
        warn!("API call failed: {}", err);
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ServiceError> {
        let response = self.send(req).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn send_unit(&self, req: RequestBuilder) -> Result<(), ServiceError> {
        self.send(req).await?;
        Ok(())
    }

    pub async fn login(&self, login: &Login) -> Result<AuthResponse, ServiceError> {
        debug!("POST /sessions for {}", login.email);
        self.send_json(self.request(Method::POST, "/sessions").json(login)).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ServiceError> {
        self.send_unit(self.request(Method::POST, "/accounts").json(registration))
            .await
    }

    /// Catalog, optionally narrowed server-side to some muscle groups
    pub async fn list_exercises(&self, groups: &[MuscleGroup]) -> Result<Vec<Exercise>, ServiceError> {
        self.send_json(self.list_exercises_request(groups)).await
    }

    fn list_exercises_request(&self, groups: &[MuscleGroup]) -> RequestBuilder {
        let path = if groups.is_empty() {
            "/exercises".to_string()
        } else {
            let keys: Vec<&str> = groups.iter().map(|g| g.as_str()).collect();
            format!("/exercises?muscleGroups={}", keys.join(","))
        };
        self.request(Method::GET, &path)
    }

    pub async fn exercise(&self, id: &str) -> Result<Exercise, ServiceError> {
        self.send_json(self.request(Method::GET, &format!("/exercises/{id}")))
            .await
    }

    pub async fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise, ServiceError> {
        self.send_json(self.request(Method::POST, "/exercises").json(exercise))
            .await
    }

    pub async fn update_exercise(&self, id: &str, exercise: &NewExercise) -> Result<Exercise, ServiceError> {
        self.send_json(self.request(Method::PUT, &format!("/exercises/{id}")).json(exercise))
            .await
    }

    pub async fn delete_exercise(&self, id: &str) -> Result<(), ServiceError> {
        self.send_unit(self.request(Method::DELETE, &format!("/exercises/{id}")))
            .await
    }

    /// One page of past workouts, filtered server-side
    pub async fn history(&self, filter: &HistoryFilter) -> Result<HistoryPage, ServiceError> {
        self.send_json(self.history_request("", filter)).await
    }

    fn history_request<Q: Serialize + ?Sized>(&self, rest: &str, query: &Q) -> RequestBuilder {
        self.request(Method::GET, &format!("/history{rest}")).query(query)
    }

    pub async fn history_stats(&self, query: &StatsQuery) -> Result<HistoryStats, ServiceError> {
        self.send_json(self.stats_request("overview", query)).await
    }

    pub async fn weekly_pattern(&self, range: &DateRange) -> Result<Vec<WeekdayShare>, ServiceError> {
        self.send_json(self.stats_request("weekly-pattern", range)).await
    }

    pub async fn muscle_group_stats(&self, range: &DateRange) -> Result<Vec<MuscleGroupShare>, ServiceError> {
        self.send_json(self.stats_request("muscle-groups", range)).await
    }

    fn stats_request<Q: Serialize + ?Sized>(&self, endpoint: &str, query: &Q) -> RequestBuilder {
        self.history_request(&format!("/stats/{endpoint}"), query)
    }

    /// Copy a past workout into a new in-progress one
    pub async fn duplicate_workout(&self, workout_id: &str) -> Result<DuplicatedWorkout, ServiceError> {
        self.send_json(self.duplicate_request(workout_id)).await
    }

    fn duplicate_request(&self, workout_id: &str) -> RequestBuilder {
        self.request(Method::GET, &format!("/history/{workout_id}/duplicate"))
    }

    pub async fn report_overview(&self, query: &ReportQuery) -> Result<WorkoutOverview, ServiceError> {
        self.send_json(self.report_request("overview", query)).await
    }

    /// Expects `query.exercise_id` to be set, see [`ReportQuery::evolution`]
    pub async fn exercise_evolution(&self, query: &ReportQuery) -> Result<ExerciseEvolution, ServiceError> {
        self.send_json(self.report_request("evolution", query)).await
    }

    pub async fn personal_records(&self, query: &ReportQuery) -> Result<Vec<PersonalRecord>, ServiceError> {
        self.send_json(self.report_request("personal-records", query))
            .await
    }

    fn report_request(&self, endpoint: &str, query: &ReportQuery) -> RequestBuilder {
        self.request(Method::GET, &format!("/reports/{endpoint}"))
            .query(query)
    }

    fn execution(&self, method: Method, workout_id: &str, rest: &str) -> RequestBuilder {
        self.request(method, &format!("/workout-executions/{workout_id}{rest}"))
    }

    fn start_request(&self, request: &StartWorkout) -> RequestBuilder {
        self.request(Method::POST, "/workout-executions/start").json(request)
    }

    fn select_request(&self, workout_id: &str, exercise_ids: &[String]) -> RequestBuilder {
        self.execution(Method::POST, workout_id, "/select-exercises")
            .json(&json!({ "exerciseIds": exercise_ids }))
    }

    fn series_count_request(&self, workout_id: &str, exercise_execution_id: &str, count: u8) -> RequestBuilder {
        let rest = format!("/exercises/{exercise_execution_id}/series-count");
        self.execution(Method::PUT, workout_id, &rest)
            .json(&json!({ "plannedSeries": count }))
    }

    fn series_request(
        &self,
        workout_id: &str,
        exercise_execution_id: &str,
        series_number: u8,
        data: &RegisterSeries,
    ) -> RequestBuilder {
        let rest = format!("/exercises/{exercise_execution_id}/series/{series_number}");
        self.execution(Method::POST, workout_id, &rest).json(data)
    }

    fn complete_request(&self, workout_id: &str, exercise_execution_id: &str) -> RequestBuilder {
        let rest = format!("/exercises/{exercise_execution_id}/complete");
        self.execution(Method::PUT, workout_id, &rest)
    }

    fn finish_request(&self, workout_id: &str, notes: Option<&str>) -> RequestBuilder {
        self.execution(Method::POST, workout_id, "/finish")
            .json(&FinishWorkout { notes })
    }
}

impl<P: CredentialProvider> WorkoutService for ApiClient<P> {
    async fn start_workout(&self, request: &StartWorkout) -> Result<WorkoutSession, ServiceError> {
        self.send_json(self.start_request(request)).await
    }

    async fn available_exercises(&self, workout_id: &str) -> Result<Vec<Exercise>, ServiceError> {
        self.send_json(self.execution(Method::GET, workout_id, "/available-exercises"))
            .await
    }

    async fn select_exercises(&self, workout_id: &str, exercise_ids: &[String]) -> Result<(), ServiceError> {
        self.send_unit(self.select_request(workout_id, exercise_ids)).await
    }

    async fn define_series_count(
        &self,
        workout_id: &str,
        exercise_execution_id: &str,
        count: u8,
    ) -> Result<(), ServiceError> {
        self.send_unit(self.series_count_request(workout_id, exercise_execution_id, count))
            .await
    }

    async fn register_series(
        &self,
        workout_id: &str,
        exercise_execution_id: &str,
        series_number: u8,
        data: &RegisterSeries,
    ) -> Result<SeriesExecution, ServiceError> {
        self.send_json(self.series_request(workout_id, exercise_execution_id, series_number, data))
            .await
    }

    async fn complete_exercise(&self, workout_id: &str, exercise_execution_id: &str) -> Result<(), ServiceError> {
        self.send_unit(self.complete_request(workout_id, exercise_execution_id))
            .await
    }

    async fn finish_workout(&self, workout_id: &str, notes: Option<&str>) -> Result<(), ServiceError> {
        self.send_unit(self.finish_request(workout_id, notes)).await
    }

    async fn workout_details(&self, workout_id: &str) -> Result<WorkoutSession, ServiceError> {
        self.send_json(self.execution(Method::GET, workout_id, "")).await
    }

    async fn list_workouts(&self) -> Result<Vec<WorkoutSession>, ServiceError> {
        self.send_json(self.request(Method::GET, "/workout-executions"))
            .await
    }

    async fn delete_workout(&self, workout_id: &str) -> Result<(), ServiceError> {
        self.send_unit(self.execution(Method::DELETE, workout_id, "")).await
    }
}

/// Map a non-2xx response to the error taxonomy
pub(crate) fn classify(status: u16, body: &str) -> ServiceError {
    let message = error_message(body);
    match status {
        401 | 403 => ServiceError::Unauthorized(message),
        409 => ServiceError::Conflict(message),
        _ if mentions_existing(&message) => ServiceError::Conflict(message),
        _ => ServiceError::Api { status, message },
    }
}

/// The API answers `{"message": "..."}` or `{"message": ["...", ...]}`
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("message") {
            Some(Value::String(msg)) => return msg.clone(),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no details".to_string()
    } else {
        trimmed.to_string()
    }
}

fn mentions_existing(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists") || lower.contains("já existe")
}
