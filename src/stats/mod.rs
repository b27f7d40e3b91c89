//! Stats module - dashboard numbers over the user's workout history
//!
//! Features:
//! - Completed totals for the last week and month
//! - Day-to-day training streak
//! - Per-session summary (series, volume, duration)

use chrono::{DateTime, Duration, Utc};

use crate::workout::model::{WorkoutSession, WorkoutStatus};

const RECENT_LIMIT: usize = 5;

/// Dashboard over every session the API returned
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub total_completed: usize,
    pub last_7_days: usize,
    pub last_30_days: usize,
    pub streak: u32,
    pub active: Option<WorkoutSession>,
    pub recent: Vec<WorkoutSession>,
}

impl Dashboard {
    pub fn from_workouts(mut workouts: Vec<WorkoutSession>, now: DateTime<Utc>) -> Self {
        workouts.sort_by(|a, b| b.date.cmp(&a.date));

        let completed: Vec<&WorkoutSession> = workouts
            .iter()
            .filter(|w| w.status == WorkoutStatus::Completed)
            .collect();
        let since = |days: i64| {
            let cutoff = now - Duration::days(days);
            completed.iter().filter(|w| w.date >= cutoff).count()
        };

        Self {
            total_completed: completed.len(),
            last_7_days: since(7),
            last_30_days: since(30),
            streak: streak(&completed, now),
            active: workouts
                .iter()
                .find(|w| w.status == WorkoutStatus::InProgress)
                .cloned(),
            recent: workouts.iter().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}

/// Consecutive completed sessions, newest first, each at most one day
/// before the previous one (the first is measured against `now`).
/// `completed` must be sorted by date descending.
fn streak(completed: &[&WorkoutSession], now: DateTime<Utc>) -> u32 {
    let mut reference = now;
    let mut count = 0;
    for workout in completed {
        if (reference - workout.date).num_days() > 1 {
            break;
        }
        count += 1;
        reference = workout.date;
    }
    count
}

/// Totals for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub exercises: usize,
    pub completed_exercises: usize,
    pub series: usize,
    pub volume: f64,
    pub duration_minutes: Option<i64>,
}

impl SessionSummary {
    pub fn of(session: &WorkoutSession) -> Self {
        let series = session
            .exercise_executions
            .iter()
            .flat_map(|e| e.series_executions.iter());

        Self {
            exercises: session.exercise_executions.len(),
            completed_exercises: session.completed_exercises(),
            series: series.clone().count(),
            volume: series.map(|s| s.volume()).sum(),
            duration_minutes: session
                .end_time
                .map(|end| (end - session.start_time).num_minutes()),
        }
    }

    /// Completed exercises as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.exercises == 0 {
            return 0.0;
        }
        self.completed_exercises as f64 / self.exercises as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::model::{ExerciseExecution, SeriesExecution};
    use std::num::NonZeroU8;

    fn create_workout(id: &str, days_ago: i64, status: WorkoutStatus) -> WorkoutSession {
        let date = Utc::now() - Duration::days(days_ago);
        WorkoutSession {
            id: id.to_string(),
            user_id: "u1".into(),
            date,
            day_of_week: String::new(),
            muscle_groups: vec!["chest".into()],
            status,
            start_time: date,
            end_time: None,
            notes: None,
            exercise_executions: Vec::new(),
        }
    }

    fn series(n: u8, weight: f64, reps: u32) -> SeriesExecution {
        SeriesExecution {
            id: format!("s{n}"),
            exercise_execution_id: "e1".into(),
            series_number: n,
            weight,
            reps,
            rest_time: Some(90),
            difficulty: None,
            notes: None,
        }
    }

    #[test]
    fn test_dashboard_empty() {
        let dashboard = Dashboard::from_workouts(vec![], Utc::now());
        assert_eq!(dashboard.total_completed, 0);
        assert_eq!(dashboard.streak, 0);
        assert!(dashboard.active.is_none());
        assert!(dashboard.recent.is_empty());
    }

    #[test]
    fn test_dashboard_counts() {
        let workouts = vec![
            create_workout("a", 0, WorkoutStatus::InProgress),
            create_workout("b", 1, WorkoutStatus::Completed),
            create_workout("c", 10, WorkoutStatus::Completed),
            create_workout("d", 40, WorkoutStatus::Completed),
            create_workout("e", 2, WorkoutStatus::Cancelled),
        ];
        let dashboard = Dashboard::from_workouts(workouts, Utc::now());

        assert_eq!(dashboard.total_completed, 3);
        assert_eq!(dashboard.last_7_days, 1);
        assert_eq!(dashboard.last_30_days, 2);
        assert_eq!(dashboard.active.unwrap().id, "a");
    }

    #[test]
    fn test_recent_is_newest_five() {
        let workouts: Vec<_> = (0..8)
            .map(|i| create_workout(&format!("w{i}"), 8 - i, WorkoutStatus::Completed))
            .collect();
        let dashboard = Dashboard::from_workouts(workouts, Utc::now());

        let ids: Vec<&str> = dashboard.recent.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w7", "w6", "w5", "w4", "w3"]);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let workouts = vec![
            create_workout("a", 0, WorkoutStatus::Completed),
            create_workout("b", 1, WorkoutStatus::Completed),
            create_workout("c", 2, WorkoutStatus::Completed),
            create_workout("d", 5, WorkoutStatus::Completed),
        ];
        let dashboard = Dashboard::from_workouts(workouts, Utc::now());
        assert_eq!(dashboard.streak, 3);
    }

    #[test]
    fn test_streak_broken_by_gap_from_now() {
        let workouts = vec![create_workout("a", 3, WorkoutStatus::Completed)];
        let dashboard = Dashboard::from_workouts(workouts, Utc::now());
        assert_eq!(dashboard.streak, 0);
    }

    #[test]
    fn test_streak_ignores_unfinished() {
        let workouts = vec![
            create_workout("a", 0, WorkoutStatus::InProgress),
            create_workout("b", 1, WorkoutStatus::Completed),
        ];
        let dashboard = Dashboard::from_workouts(workouts, Utc::now());
        assert_eq!(dashboard.streak, 1);
    }

    #[test]
    fn test_session_summary() {
        let mut workout = create_workout("a", 0, WorkoutStatus::Completed);
        workout.end_time = Some(workout.start_time + Duration::minutes(45));
        workout.exercise_executions = vec![
            ExerciseExecution {
                id: "e1".into(),
                workout_execution_id: "a".into(),
                exercise_id: "bench".into(),
                exercise_name: "Bench Press".into(),
                order: 1,
                planned_series: NonZeroU8::new(2),
                is_completed: true,
                exercise: None,
                series_executions: vec![series(1, 60.0, 10), series(2, 60.0, 8)],
            },
            ExerciseExecution {
                id: "e2".into(),
                workout_execution_id: "a".into(),
                exercise_id: "fly".into(),
                exercise_name: "Fly".into(),
                order: 2,
                planned_series: None,
                is_completed: false,
                exercise: None,
                series_executions: vec![],
            },
        ];

        let summary = SessionSummary::of(&workout);
        assert_eq!(summary.exercises, 2);
        assert_eq!(summary.completed_exercises, 1);
        assert_eq!(summary.series, 2);
        assert_eq!(summary.volume, 1080.0);
        assert_eq!(summary.duration_minutes, Some(45));
        assert!((summary.completion_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_of_open_session_has_no_duration() {
        let workout = create_workout("a", 0, WorkoutStatus::InProgress);
        let summary = SessionSummary::of(&workout);
        assert_eq!(summary.duration_minutes, None);
        assert_eq!(summary.completion_rate(), 0.0);
    }
}
