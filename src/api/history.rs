//! Workout history listing, its aggregate statistics and duplication

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::exercises::MuscleGroup;
use crate::workout::model::WorkoutStatus;

/// Page size the history screen asks for
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Query of `GET /history`; unset and blank fields are left off the URL
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkoutStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<MuscleGroup>,
    #[serde(skip_serializing_if = "is_blank")]
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page == Some(0) {
            return Err(ValidationError::ZeroPage);
        }
        DateRange::new(self.start_date, self.end_date).validate()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Optional `startDate`/`endDate` pair shared by the stats and report queries
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self { start_date, end_date }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => {
                Err(ValidationError::InvertedDateRange { start, end })
            }
            _ => Ok(()),
        }
    }
}

/// Window of `GET /history/stats/overview`
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Week,
    #[default]
    Month,
    Year,
    All,
}

/// Query of `GET /history/stats/overview`
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub period: StatsPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl StatsQuery {
    pub fn new(period: StatsPeriod, range: DateRange) -> Self {
        Self {
            period,
            start_date: range.start_date,
            end_date: range.end_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub data: Vec<HistoryItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

/// One row of the history list, with the server's per-workout totals
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    pub status: WorkoutStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercise_executions: Vec<HistoryExercise>,
    #[serde(default)]
    pub stats: WorkoutTotals,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExercise {
    pub id: String,
    pub exercise_name: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub series_executions: Vec<LoggedSet>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct LoggedSet {
    pub weight: f64,
    pub reps: u32,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutTotals {
    pub total_exercises: u32,
    pub completed_exercises: u32,
    pub total_series: u32,
    pub total_volume: f64,
    /// Minutes
    pub duration: f64,
    pub completion_rate: f64,
}

/// Response of `GET /history/stats/overview`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub period: String,
    pub totals: StatsTotals,
    pub averages: StatsAverages,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsTotals {
    pub workouts: u32,
    pub completed_workouts: u32,
    pub cancelled_workouts: u32,
    pub in_progress_workouts: u32,
    pub exercises: u32,
    pub series: u32,
    pub volume: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsAverages {
    pub workouts_per_week: f64,
    pub exercises_per_workout: f64,
    pub series_per_workout: f64,
    pub volume_per_workout: f64,
    pub duration_per_workout: f64,
}

/// Workouts per weekday, from `GET /history/stats/weekly-pattern`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayShare {
    pub day_of_week: String,
    pub count: u32,
    pub percentage: f64,
}

/// Workouts per muscle group, from `GET /history/stats/muscle-groups`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MuscleGroupShare {
    pub name: String,
    pub count: u32,
    pub percentage: f64,
}

/// The copy created by `GET /history/{id}/duplicate`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DuplicatedWorkout {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_filter_rejects_page_zero_and_inverted_dates() {
        let filter = HistoryFilter { page: Some(0), ..Default::default() };
        assert_eq!(filter.validate(), Err(ValidationError::ZeroPage));

        let filter = HistoryFilter {
            start_date: Some(date("2024-03-10")),
            end_date: Some(date("2024-03-01")),
            ..Default::default()
        };
        assert_eq!(
            filter.validate(),
            Err(ValidationError::InvertedDateRange { start: date("2024-03-10"), end: date("2024-03-01") })
        );

        let filter = HistoryFilter {
            page: Some(2),
            start_date: Some(date("2024-03-01")),
            end_date: Some(date("2024-03-01")),
            ..Default::default()
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_blank_search_is_dropped() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".into())));
        assert!(!is_blank(&Some("supino".into())));
    }

    #[test]
    fn test_decode_history_page() {
        let body = r#"{
            "data": [{
                "id": "w1",
                "date": "2024-03-04T00:00:00.000Z",
                "dayOfWeek": "Monday",
                "muscleGroups": ["chest", "triceps"],
                "status": "COMPLETED",
                "startTime": "2024-03-04T18:00:00.000Z",
                "endTime": "2024-03-04T19:05:00.000Z",
                "exerciseExecutions": [{
                    "id": "ee1",
                    "exerciseName": "Supino reto",
                    "isCompleted": true,
                    "seriesExecutions": [{"weight": 60, "reps": 10}, {"weight": 62.5, "reps": 8}]
                }],
                "stats": {
                    "totalExercises": 1,
                    "completedExercises": 1,
                    "totalSeries": 2,
                    "totalVolume": 1100,
                    "duration": 65,
                    "completionRate": 100
                }
            }],
            "pagination": {"page": 1, "limit": 10, "total": 11, "totalPages": 2, "hasNext": true, "hasPrev": false}
        }"#;

        let page: HistoryPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_next);

        let item = &page.data[0];
        assert_eq!(item.status, WorkoutStatus::Completed);
        assert_eq!(item.muscle_groups, vec!["chest", "triceps"]);
        assert_eq!(item.exercise_executions[0].series_executions[1].weight, 62.5);
        assert_eq!(item.stats.total_volume, 1100.0);
        assert_eq!(item.stats.duration, 65.0);
        assert_eq!(item.notes, None);
    }

    #[test]
    fn test_decode_stats_responses() {
        let body = r#"{
            "period": "month",
            "totals": {"workouts": 12, "completedWorkouts": 10, "cancelledWorkouts": 1,
                       "inProgressWorkouts": 1, "exercises": 48, "series": 150,
                       "volume": 54200.5, "duration": 720},
            "averages": {"workoutsPerWeek": 2.8, "exercisesPerWorkout": 4,
                         "seriesPerWorkout": 12.5, "volumePerWorkout": 4516.7,
                         "durationPerWorkout": 60},
            "completionRate": 83.3
        }"#;
        let stats: HistoryStats = serde_json::from_str(body).unwrap();
        assert_eq!(stats.totals.completed_workouts, 10);
        assert_eq!(stats.averages.workouts_per_week, 2.8);

        let days: Vec<WeekdayShare> =
            serde_json::from_str(r#"[{"dayOfWeek": "Monday", "count": 4, "percentage": 33.3}]"#).unwrap();
        assert_eq!(days[0].day_of_week, "Monday");

        let groups: Vec<MuscleGroupShare> =
            serde_json::from_str(r#"[{"name": "chest", "count": 5, "percentage": 41.7}]"#).unwrap();
        assert_eq!(groups[0].count, 5);

        let copy: DuplicatedWorkout =
            serde_json::from_str(r#"{"id": "w9", "status": "IN_PROGRESS", "muscleGroups": ["back"]}"#).unwrap();
        assert_eq!(copy.id, "w9");
    }
}
