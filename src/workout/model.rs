//! Session data model: a workout execution and the series logged in it

use std::num::NonZeroU8;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Rest time applied to a series when the user does not pick one
pub const DEFAULT_REST_SECS: u32 = 90;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkoutStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl WorkoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutStatus::InProgress => "IN_PROGRESS",
            WorkoutStatus::Completed => "COMPLETED",
            WorkoutStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkoutStatus::InProgress)
    }
}

/// One workout-execution instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub day_of_week: String,
    pub muscle_groups: Vec<String>,
    pub status: WorkoutStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercise_executions: Vec<ExerciseExecution>,
}

impl WorkoutSession {
    /// Move out of IN_PROGRESS. Terminal statuses never change again.
    pub fn close(&mut self, status: WorkoutStatus, at: DateTime<Utc>) -> Result<(), ModelError> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(ModelError::IllegalTransition {
                from: self.status.as_str(),
                to: status.as_str(),
            });
        }
        self.status = status;
        self.end_time = Some(at);
        Ok(())
    }

    /// Restore execution order after rehydration
    pub fn sort_exercises(&mut self) {
        self.exercise_executions.sort_by_key(|e| e.order);
        for exercise in &mut self.exercise_executions {
            exercise.series_executions.sort_by_key(|s| s.series_number);
        }
    }

    pub fn completed_exercises(&self) -> usize {
        self.exercise_executions.iter().filter(|e| e.is_completed).count()
    }
}

/// Exercise reference embedded in an execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

/// One catalog exercise attached to a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseExecution {
    pub id: String,
    #[serde(default)]
    pub workout_execution_id: String,
    #[serde(default)]
    pub exercise_id: String,
    pub exercise_name: String,
    pub order: u32,
    /// `None` until the user plans the series count
    #[serde(default, with = "planned_series")]
    pub planned_series: Option<NonZeroU8>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<ExerciseRef>,
    #[serde(default)]
    pub series_executions: Vec<SeriesExecution>,
}

impl ExerciseExecution {
    pub fn planned(&self) -> Option<u8> {
        self.planned_series.map(NonZeroU8::get)
    }

    pub fn registered_count(&self) -> usize {
        self.series_executions.len()
    }

    pub fn is_registered(&self, series_number: u8) -> bool {
        self.series_executions
            .iter()
            .any(|s| s.series_number == series_number)
    }

    /// Lowest planned series number without a confirmed registration
    pub fn next_series(&self) -> Option<u8> {
        let planned = self.planned()?;
        (1..=planned).find(|n| !self.is_registered(*n))
    }

    pub fn is_completion_eligible(&self) -> bool {
        match self.planned() {
            Some(planned) => self.registered_count() == planned as usize,
            None => false,
        }
    }

    /// Insert a confirmed series, keeping series-number order
    pub fn record(&mut self, series: SeriesExecution) {
        self.series_executions
            .retain(|s| s.series_number != series.series_number);
        let pos = self
            .series_executions
            .iter()
            .position(|s| s.series_number > series.series_number)
            .unwrap_or(self.series_executions.len());
        self.series_executions.insert(pos, series);
    }

    pub fn muscle_groups(&self) -> &[String] {
        self.exercise
            .as_ref()
            .map(|e| e.muscle_groups.as_slice())
            .unwrap_or(&[])
    }

    pub fn equipment(&self) -> Option<&str> {
        self.exercise.as_ref().and_then(|e| e.equipment.as_deref())
    }
}

/// One logged set, as confirmed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesExecution {
    pub id: String,
    #[serde(default)]
    pub exercise_execution_id: String,
    pub series_number: u8,
    pub weight: f64,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SeriesExecution {
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }
}

/// Local placeholder for a planned series the user is still filling in
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDraft {
    pub series_number: u8,
    pub weight: f64,
    pub reps: u32,
    pub rest_time: u32,
    pub difficulty: Option<u8>,
    pub notes: Option<String>,
}

impl SeriesDraft {
    pub fn new(series_number: u8) -> Self {
        Self {
            series_number,
            weight: 0.0,
            reps: 0,
            rest_time: DEFAULT_REST_SECS,
            difficulty: None,
            notes: None,
        }
    }
}

/// Planned series as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSlot {
    Pending(SeriesDraft),
    Registered(SeriesExecution),
}

impl SeriesSlot {
    pub fn series_number(&self) -> u8 {
        match self {
            SeriesSlot::Pending(draft) => draft.series_number,
            SeriesSlot::Registered(series) => series.series_number,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, SeriesSlot::Registered(_))
    }
}

/// Body of a register-series request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSeries {
    pub weight: f64,
    pub reps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&SeriesDraft> for RegisterSeries {
    fn from(draft: &SeriesDraft) -> Self {
        Self {
            weight: draft.weight,
            reps: draft.reps,
            rest_time: Some(draft.rest_time),
            difficulty: draft.difficulty,
            notes: draft.notes.clone(),
        }
    }
}

/// Body of a start-workout request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkout {
    pub muscle_groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of a finish request; the key is left out when there are no notes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FinishWorkout<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

/// `plannedSeries` travels as a plain integer where 0 means unplanned
mod planned_series {
    use std::num::NonZeroU8;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NonZeroU8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(value.map(NonZeroU8::get).unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NonZeroU8>, D::Error> {
        let raw = Option::<u8>::deserialize(d)?;
        Ok(raw.and_then(NonZeroU8::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_json() -> serde_json::Value {
        json!({
            "id": "w1",
            "userId": "u1",
            "date": "2026-10-19T00:00:00.000Z",
            "dayOfWeek": "Monday",
            "muscleGroups": ["chest"],
            "status": "IN_PROGRESS",
            "startTime": "2026-10-19T18:00:00.000Z",
            "exerciseExecutions": [
                {
                    "id": "e2",
                    "exerciseName": "Fly",
                    "order": 2,
                    "plannedSeries": 0,
                    "isCompleted": false
                },
                {
                    "id": "e1",
                    "exerciseName": "Bench Press",
                    "order": 1,
                    "plannedSeries": 3,
                    "isCompleted": false,
                    "seriesExecutions": [
                        { "id": "s2", "seriesNumber": 2, "weight": 60, "reps": 8 },
                        { "id": "s1", "seriesNumber": 1, "weight": 60, "reps": 10, "restTime": 90 }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_decode_and_sort_session() {
        let mut session: WorkoutSession = serde_json::from_value(session_json()).unwrap();
        session.sort_exercises();

        assert_eq!(session.status, WorkoutStatus::InProgress);
        assert_eq!(session.exercise_executions[0].id, "e1");
        assert_eq!(session.exercise_executions[0].planned(), Some(3));
        assert_eq!(session.exercise_executions[0].series_executions[0].id, "s1");
        assert_eq!(session.exercise_executions[1].planned_series, None);
    }

    #[test]
    fn test_planned_series_encodes_zero_for_unplanned() {
        let session: WorkoutSession = serde_json::from_value(session_json()).unwrap();
        let value = serde_json::to_value(&session.exercise_executions[0]).unwrap();
        assert_eq!(value["plannedSeries"], json!(0));
    }

    #[test]
    fn test_next_series_is_lowest_unregistered() {
        let mut session: WorkoutSession = serde_json::from_value(session_json()).unwrap();
        session.sort_exercises();
        let exercise = &session.exercise_executions[0];

        assert_eq!(exercise.next_series(), Some(3));
        assert!(!exercise.is_completion_eligible());
        assert_eq!(session.exercise_executions[1].next_series(), None);
    }

    #[test]
    fn test_close_only_from_in_progress() {
        let mut session: WorkoutSession = serde_json::from_value(session_json()).unwrap();
        let now = Utc::now();

        assert!(session.close(WorkoutStatus::InProgress, now).is_err());
        session.close(WorkoutStatus::Completed, now).unwrap();
        assert_eq!(session.end_time, Some(now));

        let err = session.close(WorkoutStatus::Cancelled, now).unwrap_err();
        assert_eq!(
            err,
            ModelError::IllegalTransition { from: "COMPLETED", to: "CANCELLED" }
        );
        assert_eq!(session.status, WorkoutStatus::Completed);
    }

    #[test]
    fn test_record_keeps_order_and_replaces() {
        let mut session: WorkoutSession = serde_json::from_value(session_json()).unwrap();
        session.sort_exercises();
        let exercise = &mut session.exercise_executions[0];

        exercise.record(SeriesExecution {
            id: "s3".into(),
            exercise_execution_id: "e1".into(),
            series_number: 3,
            weight: 65.0,
            reps: 6,
            rest_time: None,
            difficulty: Some(4),
            notes: None,
        });

        let numbers: Vec<u8> = exercise.series_executions.iter().map(|s| s.series_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(exercise.is_completion_eligible());
    }

    #[test]
    fn test_register_body_skips_empty_fields() {
        let mut draft = SeriesDraft::new(1);
        draft.weight = 40.0;
        draft.reps = 12;

        let value = serde_json::to_value(RegisterSeries::from(&draft)).unwrap();
        assert_eq!(value, json!({ "weight": 40.0, "reps": 12, "restTime": 90 }));
    }
}
