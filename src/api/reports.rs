//! Performance reports computed by the API: overview, exercise evolution
//! and personal records

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::history::DateRange;

/// Which series of a session an evolution point is built from
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    #[default]
    Max,
    Average,
    All,
}

/// Quantity a personal record is ranked by
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Weight,
    Reps,
    Volume,
}

impl Metric {
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Weight | Metric::Volume => "kg",
            Metric::Reps => "reps",
        }
    }
}

/// Query string shared by the `/reports/*` endpoints
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_type: Option<SeriesType>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
}

impl ReportQuery {
    pub fn within(range: DateRange) -> Self {
        Self {
            start_date: range.start_date,
            end_date: range.end_date,
            ..Default::default()
        }
    }

    pub fn evolution(exercise_id: &str, series_type: SeriesType, range: DateRange) -> Self {
        Self {
            exercise_id: Some(exercise_id.to_string()),
            series_type: Some(series_type),
            ..Self::within(range)
        }
    }

    pub fn records(metric: Metric, range: DateRange) -> Self {
        Self {
            metric: Some(metric),
            ..Self::within(range)
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub total_sessions: Option<u32>,
}

/// Response of `GET /reports/overview`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutOverview {
    pub period: ReportPeriod,
    pub totals: OverviewTotals,
    pub averages: OverviewAverages,
    #[serde(default)]
    pub workout_dates: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverviewTotals {
    pub workouts: u32,
    pub exercises: u32,
    pub series: u32,
    pub volume: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OverviewAverages {
    pub exercises_per_workout: f64,
    pub series_per_workout: f64,
    pub duration_minutes: f64,
}

/// Response of `GET /reports/evolution`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEvolution {
    pub exercise_name: String,
    pub exercise_id: String,
    #[serde(default)]
    pub series_type: String,
    pub period: ReportPeriod,
    #[serde(default)]
    pub data: Vec<EvolutionPoint>,
    pub analysis: EvolutionAnalysis,
}

/// Best series of one session
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionPoint {
    pub date: String,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default)]
    pub max_weight: Option<SeriesMark>,
    #[serde(default)]
    pub max_reps: Option<SeriesMark>,
    #[serde(default)]
    pub best_volume: Option<SeriesMark>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct SeriesMark {
    pub weight: f64,
    pub reps: u32,
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionAnalysis {
    pub weight_progress: Progress,
    pub reps_progress: Progress,
    pub volume_progress: Progress,
    pub overall_trend: Trend,
    pub sessions_analyzed: u32,
}

/// First against latest session
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Progress {
    pub initial: f64,
    pub current: f64,
    pub difference: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Mixed,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Mixed => "mixed",
            Trend::Declining => "declining",
        }
    }
}

/// One entry of `GET /reports/personal-records`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub record: RecordValue,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordValue {
    pub value: f64,
    pub date: String,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub based_on: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_constructors_keep_range() {
        let range = DateRange::new(Some("2024-01-01".parse().unwrap()), None);

        let q = ReportQuery::evolution("ex1", SeriesType::Max, range);
        assert_eq!(q.exercise_id.as_deref(), Some("ex1"));
        assert_eq!(q.series_type, Some(SeriesType::Max));
        assert_eq!(q.start_date, range.start_date);
        assert_eq!(q.metric, None);

        let q = ReportQuery::records(Metric::Reps, DateRange::default());
        assert_eq!(q.metric, Some(Metric::Reps));
        assert_eq!(q.exercise_id, None);
        assert_eq!(Metric::Reps.unit(), "reps");
    }

    #[test]
    fn test_decode_overview() {
        let body = r#"{
            "period": {"startDate": "2024-02-01", "endDate": "2024-02-29"},
            "totals": {"workouts": 9, "exercises": 36, "series": 110, "volume": 40210.5},
            "averages": {"exercisesPerWorkout": 4, "seriesPerWorkout": 12.2, "durationMinutes": 58},
            "workoutDates": ["2024-02-01", "2024-02-03"]
        }"#;
        let overview: WorkoutOverview = serde_json::from_str(body).unwrap();
        assert_eq!(overview.totals.workouts, 9);
        assert_eq!(overview.averages.series_per_workout, 12.2);
        assert_eq!(overview.workout_dates.len(), 2);
        assert_eq!(overview.period.total_sessions, None);
    }

    #[test]
    fn test_decode_evolution() {
        let body = r#"{
            "exerciseName": "Agachamento",
            "exerciseId": "ex7",
            "seriesType": "max",
            "period": {"startDate": "2024-01-01", "endDate": "2024-03-01", "totalSessions": 2},
            "data": [
                {"date": "2024-01-08", "dayOfWeek": "Monday",
                 "maxWeight": {"weight": 80, "reps": 8, "volume": 640}},
                {"date": "2024-02-26", "dayOfWeek": "Monday",
                 "maxWeight": {"weight": 90, "reps": 6, "volume": 540},
                 "bestVolume": {"weight": 85, "reps": 8, "volume": 680}}
            ],
            "analysis": {
                "weightProgress": {"initial": 80, "current": 90, "difference": 10, "percentage": 12.5},
                "repsProgress": {"initial": 8, "current": 6, "difference": -2, "percentage": -25},
                "volumeProgress": {"initial": 640, "current": 540, "difference": -100, "percentage": -15.6},
                "overallTrend": "mixed",
                "sessionsAnalyzed": 2
            }
        }"#;
        let evolution: ExerciseEvolution = serde_json::from_str(body).unwrap();
        assert_eq!(evolution.period.total_sessions, Some(2));
        assert_eq!(evolution.data[1].max_weight.map(|m| m.weight), Some(90.0));
        assert_eq!(evolution.data[0].best_volume, None);
        assert_eq!(evolution.analysis.overall_trend, Trend::Mixed);
        assert_eq!(evolution.analysis.reps_progress.difference, -2.0);
    }

    #[test]
    fn test_decode_personal_records() {
        let body = r#"[
            {"exerciseName": "Supino reto", "type": "weight",
             "record": {"value": 100, "date": "2024-02-20T18:30:00.000Z", "reps": 3}},
            {"exerciseName": "Remada", "type": "volume",
             "record": {"value": 960, "date": "2024-02-22T18:30:00.000Z", "weight": 80, "reps": 12}}
        ]"#;
        let records: Vec<PersonalRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records[0].record.value, 100.0);
        assert_eq!(records[0].record.weight, None);
        assert_eq!(records[1].kind, "volume");
        assert_eq!(records[1].record.reps, Some(12));
    }
}
