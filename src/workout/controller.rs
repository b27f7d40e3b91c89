//! Workout execution state machine
//!
//! Drives one session from muscle-group choice to the last completed
//! exercise. Local state only changes after the service acknowledges a call;
//! a failed call leaves the phase exactly as it was.

use std::collections::BTreeMap;
use std::num::NonZeroU8;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::model::{
    ExerciseExecution, RegisterSeries, SeriesDraft, SeriesSlot, StartWorkout, WorkoutSession, WorkoutStatus,
};
use super::timer::{Clock, RestTimer, SystemClock};
use crate::api::WorkoutService;
use crate::error::{ExecutionError, ServiceError, ValidationError};
use crate::exercises::{Exercise, ExerciseFilter, MuscleGroup, Selection};

/// Series-count selector value when an exercise is reached
pub const DEFAULT_SERIES_COUNT: u8 = 3;
pub const MAX_SERIES: u8 = 10;
const FINISH_NOTE: &str = "Workout completed";

/// Outcome of asking the service for a new session
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started,
    /// A session already exists today; offer to resume `existing` if known
    Conflict { existing: Option<WorkoutSession> },
}

/// What happened after an exercise was completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    NextExercise { cursor: usize },
    WorkoutFinished,
}

/// Exercise-selection step: catalog, filter and picked ids
#[derive(Debug, Clone)]
pub struct Selecting {
    session: WorkoutSession,
    catalog: Vec<Exercise>,
    filter: ExerciseFilter,
    selection: Selection,
}

impl Selecting {
    fn new(session: WorkoutSession, catalog: Vec<Exercise>) -> Self {
        Self {
            session,
            catalog,
            filter: ExerciseFilter::default(),
            selection: Selection::new(),
        }
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn catalog(&self) -> &[Exercise] {
        &self.catalog
    }

    pub fn filter(&self) -> &ExerciseFilter {
        &self.filter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn filtered(&self) -> Vec<&Exercise> {
        self.filter.apply(&self.catalog)
    }
}

/// Sub-state of the exercise under the cursor
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseStep {
    /// Series count not defined yet; `count` is the selector value
    PlanningSeries { count: u8 },
    /// Drafts for every planned series without a confirmed registration
    Registering { drafts: BTreeMap<u8, SeriesDraft> },
}

impl ExerciseStep {
    fn for_exercise(exercise: &ExerciseExecution) -> Self {
        match exercise.planned() {
            None => ExerciseStep::PlanningSeries {
                count: DEFAULT_SERIES_COUNT,
            },
            Some(planned) => ExerciseStep::Registering {
                drafts: (1..=planned)
                    .filter(|n| !exercise.is_registered(*n))
                    .map(|n| (n, SeriesDraft::new(n)))
                    .collect(),
            },
        }
    }
}

/// Executing step. The session always holds at least one exercise and
/// `cursor` indexes into it.
#[derive(Debug, Clone)]
pub struct Executing {
    session: WorkoutSession,
    cursor: usize,
    step: ExerciseStep,
}

impl Executing {
    fn at(session: WorkoutSession, cursor: usize) -> Self {
        let step = ExerciseStep::for_exercise(&session.exercise_executions[cursor]);
        Self { session, cursor, step }
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn step(&self) -> &ExerciseStep {
        &self.step
    }

    pub fn current(&self) -> &ExerciseExecution {
        &self.session.exercise_executions[self.cursor]
    }

    fn current_mut(&mut self) -> &mut ExerciseExecution {
        &mut self.session.exercise_executions[self.cursor]
    }

    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.session.exercise_executions.len()
    }

    /// Planned series `1..=planned`, registered or pending
    pub fn slots(&self) -> Vec<SeriesSlot> {
        let exercise = self.current();
        let Some(planned) = exercise.planned() else {
            return Vec::new();
        };
        let drafts = match &self.step {
            ExerciseStep::Registering { drafts } => Some(drafts),
            ExerciseStep::PlanningSeries { .. } => None,
        };

        (1..=planned)
            .map(|n| {
                match exercise.series_executions.iter().find(|s| s.series_number == n) {
                    Some(series) => SeriesSlot::Registered(series.clone()),
                    None => SeriesSlot::Pending(
                        drafts
                            .and_then(|d| d.get(&n))
                            .cloned()
                            .unwrap_or_else(|| SeriesDraft::new(n)),
                    ),
                }
            })
            .collect()
    }
}

/// Session phases
#[derive(Debug, Clone)]
pub enum Phase {
    Planning,
    Selecting(Selecting),
    Executing(Executing),
    Finished(WorkoutSession),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Selecting(_) => "selecting exercises",
            Phase::Executing(_) => "executing",
            Phase::Finished(_) => "finished",
        }
    }
}

fn check_series_count(count: u8) -> Result<u8, ValidationError> {
    if (1..=MAX_SERIES).contains(&count) {
        Ok(count)
    } else {
        Err(ValidationError::SeriesCountOutOfRange(count))
    }
}

fn check_draft(draft: &SeriesDraft) -> Result<(), ValidationError> {
    if !draft.weight.is_finite() || draft.weight <= 0.0 {
        return Err(ValidationError::NonPositiveWeight);
    }
    if draft.reps == 0 {
        return Err(ValidationError::NonPositiveReps);
    }
    if let Some(difficulty) = draft.difficulty
        && !(1..=5).contains(&difficulty)
    {
        return Err(ValidationError::DifficultyOutOfRange(difficulty));
    }
    Ok(())
}

/// Owns one session's state, its rest timer and the service handle
pub struct WorkoutController<S, C = SystemClock> {
    service: S,
    phase: Phase,
    timer: RestTimer<C>,
}

impl<S: WorkoutService> WorkoutController<S> {
    pub fn new(service: S) -> Self {
        Self::with_timer(service, RestTimer::default())
    }
}

impl<S: WorkoutService, C: Clock> WorkoutController<S, C> {
    pub fn with_timer(service: S, timer: RestTimer<C>) -> Self {
        Self {
            service,
            phase: Phase::Planning,
            timer,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn timer(&self) -> &RestTimer<C> {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut RestTimer<C> {
        &mut self.timer
    }

    pub fn session(&self) -> Option<&WorkoutSession> {
        match &self.phase {
            Phase::Planning => None,
            Phase::Selecting(s) => Some(&s.session),
            Phase::Executing(e) => Some(&e.session),
            Phase::Finished(session) => Some(session),
        }
    }

    pub fn selecting(&self) -> Option<&Selecting> {
        match &self.phase {
            Phase::Selecting(s) => Some(s),
            _ => None,
        }
    }

    pub fn executing(&self) -> Option<&Executing> {
        match &self.phase {
            Phase::Executing(e) => Some(e),
            _ => None,
        }
    }

    pub fn current_exercise(&self) -> Option<&ExerciseExecution> {
        self.executing().map(Executing::current)
    }

    /// The only series number the user may register next
    pub fn current_series_number(&self) -> Option<u8> {
        let exec = self.executing()?;
        match exec.step {
            ExerciseStep::Registering { .. } => exec.current().next_series(),
            ExerciseStep::PlanningSeries { .. } => None,
        }
    }

    pub fn series_slots(&self) -> Vec<SeriesSlot> {
        self.executing().map(Executing::slots).unwrap_or_default()
    }

    pub fn registered_count(&self) -> usize {
        self.current_exercise()
            .map(ExerciseExecution::registered_count)
            .unwrap_or(0)
    }

    pub fn is_completion_eligible(&self) -> bool {
        self.current_exercise()
            .is_some_and(ExerciseExecution::is_completion_eligible)
    }

    /// 1-based position of the current exercise and the total
    pub fn progress(&self) -> (usize, usize) {
        match &self.phase {
            Phase::Executing(e) => (e.cursor + 1, e.session.exercise_executions.len()),
            Phase::Finished(s) => (s.exercise_executions.len(), s.exercise_executions.len()),
            _ => (0, 0),
        }
    }

    fn wrong_phase(&self, action: &'static str) -> ExecutionError {
        ExecutionError::WrongPhase {
            action,
            phase: self.phase.name(),
        }
    }

    /// Today's in-progress session, if the user left one open
    pub async fn find_resumable(&self, today: NaiveDate) -> Result<Option<WorkoutSession>, ExecutionError> {
        Ok(self.service.active_workout(today).await?)
    }

    pub async fn start(
        &mut self,
        muscle_groups: &[MuscleGroup],
        notes: Option<String>,
    ) -> Result<StartOutcome, ExecutionError> {
        if !matches!(self.phase, Phase::Planning) {
            return Err(self.wrong_phase("start a workout"));
        }
        if muscle_groups.is_empty() {
            return Err(ValidationError::NoMuscleGroups.into());
        }

        let request = StartWorkout {
            muscle_groups: muscle_groups.iter().map(|g| g.as_str().to_string()).collect(),
            notes: notes.filter(|n| !n.trim().is_empty()),
        };

        let session = match self.service.start_workout(&request).await {
            Ok(session) => session,
            Err(ServiceError::Conflict(msg)) => {
                info!("Workout already exists today: {}", msg);
                let existing = match self.service.active_workout(Utc::now().date_naive()).await {
                    Ok(existing) => existing,
                    Err(err) => {
                        warn!("Could not look up the existing workout: {}", err);
                        None
                    }
                };
                return Ok(StartOutcome::Conflict { existing });
            }
            Err(err) => return Err(err.into()),
        };

        info!("Workout {} started ({})", session.id, session.muscle_groups.join(", "));
        self.phase = Phase::Selecting(Selecting::new(session, Vec::new()));
        self.load_catalog().await?;
        Ok(StartOutcome::Started)
    }

    /// Rehydrate from the server and derive the phase from what it reports
    pub async fn resume(&mut self, workout_id: &str) -> Result<(), ExecutionError> {
        let mut session = self.service.workout_details(workout_id).await?;
        session.sort_exercises();

        let phase = if session.status.is_terminal() {
            Phase::Finished(session)
        } else if session.exercise_executions.is_empty() {
            let catalog = self.service.available_exercises(&session.id).await?;
            Phase::Selecting(Selecting::new(session, catalog))
        } else {
            let cursor = session
                .exercise_executions
                .iter()
                .position(|e| !e.is_completed)
                .unwrap_or(session.exercise_executions.len() - 1);
            Phase::Executing(Executing::at(session, cursor))
        };

        info!("Resumed workout {} ({})", workout_id, phase.name());
        self.timer.clear();
        self.phase = phase;
        Ok(())
    }

    /// Re-read the current session from the server
    pub async fn refresh(&mut self) -> Result<(), ExecutionError> {
        let Some(id) = self.session().map(|s| s.id.clone()) else {
            return Err(self.wrong_phase("refresh"));
        };
        self.resume(&id).await
    }

    pub async fn load_catalog(&mut self) -> Result<(), ExecutionError> {
        let phase = self.phase.name();
        let Phase::Selecting(selecting) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "load the exercise catalog",
                phase,
            });
        };

        let catalog = self.service.available_exercises(&selecting.session.id).await?;
        debug!("Loaded {} available exercises", catalog.len());
        selecting.catalog = catalog;
        Ok(())
    }

    fn selecting_mut(&mut self, action: &'static str) -> Result<&mut Selecting, ExecutionError> {
        let phase = self.phase.name();
        match &mut self.phase {
            Phase::Selecting(s) => Ok(s),
            _ => Err(ExecutionError::WrongPhase { action, phase }),
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) -> Result<(), ExecutionError> {
        self.selecting_mut("search exercises")?.filter.search = term.into();
        Ok(())
    }

    pub fn set_muscle_filter(&mut self, group: Option<String>) -> Result<(), ExecutionError> {
        self.selecting_mut("filter exercises")?.filter.muscle_group = group;
        Ok(())
    }

    pub fn toggle_exercise(&mut self, exercise_id: &str) -> Result<(), ExecutionError> {
        let selecting = self.selecting_mut("select exercises")?;
        if !selecting.catalog.iter().any(|e| e.id == exercise_id) {
            return Err(ValidationError::UnknownExercise(exercise_id.to_string()).into());
        }
        selecting.selection.toggle(exercise_id);
        Ok(())
    }

    /// Select-all against the current filtered view
    pub fn toggle_all(&mut self) -> Result<(), ExecutionError> {
        let Selecting {
            catalog,
            filter,
            selection,
            ..
        } = self.selecting_mut("select exercises")?;
        let filtered = filter.apply(catalog);
        selection.toggle_all(&filtered);
        Ok(())
    }

    pub async fn submit_selection(&mut self) -> Result<(), ExecutionError> {
        let phase = self.phase.name();
        let Phase::Selecting(selecting) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "submit the selection",
                phase,
            });
        };
        if selecting.selection.is_empty() {
            return Err(ValidationError::NoExercisesSelected.into());
        }

        let workout_id = selecting.session.id.clone();
        let ids = selecting.selection.ids().to_vec();
        self.service.select_exercises(&workout_id, &ids).await?;

        let mut session = self.service.workout_details(&workout_id).await?;
        session.sort_exercises();
        if session.exercise_executions.is_empty() {
            return Err(ServiceError::Decode("selection produced no exercises".to_string()).into());
        }

        info!("Selected {} exercises for workout {}", session.exercise_executions.len(), workout_id);
        self.phase = Phase::Executing(Executing::at(session, 0));
        Ok(())
    }

    fn executing_mut(&mut self, action: &'static str) -> Result<&mut Executing, ExecutionError> {
        let phase = self.phase.name();
        match &mut self.phase {
            Phase::Executing(e) => Ok(e),
            _ => Err(ExecutionError::WrongPhase { action, phase }),
        }
    }

    /// Adjust the series-count selector before confirming it
    pub fn set_series_count(&mut self, count: u8) -> Result<(), ExecutionError> {
        let count = check_series_count(count)?;
        let exec = self.executing_mut("choose a series count")?;
        match &mut exec.step {
            ExerciseStep::PlanningSeries { count: selector } => {
                *selector = count;
                Ok(())
            }
            ExerciseStep::Registering { .. } => {
                let planned = exec.current().planned().unwrap_or(0);
                Err(ValidationError::SeriesAlreadyPlanned(planned).into())
            }
        }
    }

    /// Confirm the value currently in the selector
    pub async fn confirm_series_count(&mut self) -> Result<(), ExecutionError> {
        let count = match self.executing().map(Executing::step) {
            Some(ExerciseStep::PlanningSeries { count }) => *count,
            Some(ExerciseStep::Registering { .. }) => {
                let planned = self.current_exercise().and_then(ExerciseExecution::planned).unwrap_or(0);
                return Err(ValidationError::SeriesAlreadyPlanned(planned).into());
            }
            None => return Err(self.wrong_phase("define the series count")),
        };
        self.define_series(count).await
    }

    pub async fn define_series(&mut self, count: u8) -> Result<(), ExecutionError> {
        let count = check_series_count(count)?;
        let phase = self.phase.name();
        let Phase::Executing(exec) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "define the series count",
                phase,
            });
        };

        let exercise = exec.current();
        if let Some(planned) = exercise.planned() {
            return Err(ValidationError::SeriesAlreadyPlanned(planned).into());
        }

        let workout_id = exec.session.id.clone();
        let execution_id = exercise.id.clone();
        self.service
            .define_series_count(&workout_id, &execution_id, count)
            .await?;

        exec.current_mut().planned_series = NonZeroU8::new(count);
        exec.step = ExerciseStep::for_exercise(exec.current());
        info!("Planned {} series for {}", count, exec.current().exercise_name);
        Ok(())
    }

    /// Editable draft of a planned, unregistered series
    pub fn draft_mut(&mut self, series_number: u8) -> Result<&mut SeriesDraft, ExecutionError> {
        let exec = self.executing_mut("edit a series")?;
        let exercise = &exec.session.exercise_executions[exec.cursor];
        if exercise.is_registered(series_number) {
            return Err(ValidationError::SeriesAlreadyRegistered(series_number).into());
        }
        match &mut exec.step {
            ExerciseStep::PlanningSeries { .. } => Err(ValidationError::SeriesNotPlanned.into()),
            ExerciseStep::Registering { drafts } => drafts
                .get_mut(&series_number)
                .ok_or_else(|| ValidationError::UnknownSeries(series_number).into()),
        }
    }

    pub async fn register_current(&mut self) -> Result<(), ExecutionError> {
        match self.current_series_number() {
            Some(n) => self.register_series(n).await,
            None if self.executing().is_some() => match self.current_exercise().and_then(ExerciseExecution::planned) {
                None => Err(ValidationError::SeriesNotPlanned.into()),
                Some(planned) => Err(ValidationError::UnknownSeries(planned.saturating_add(1)).into()),
            },
            None => Err(self.wrong_phase("register a series")),
        }
    }

    pub async fn register_series(&mut self, series_number: u8) -> Result<(), ExecutionError> {
        let phase = self.phase.name();
        let Phase::Executing(exec) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "register a series",
                phase,
            });
        };

        let exercise = exec.current();
        let planned = exercise.planned().ok_or(ValidationError::SeriesNotPlanned)?;
        if series_number == 0 || series_number > planned {
            return Err(ValidationError::UnknownSeries(series_number).into());
        }
        if exercise.is_registered(series_number) {
            return Err(ValidationError::SeriesAlreadyRegistered(series_number).into());
        }
        if let Some(expected) = exercise.next_series()
            && expected != series_number
        {
            return Err(ValidationError::OutOfOrderSeries {
                expected,
                got: series_number,
            }
            .into());
        }

        let ExerciseStep::Registering { drafts } = &exec.step else {
            return Err(ValidationError::SeriesNotPlanned.into());
        };
        let draft = drafts
            .get(&series_number)
            .ok_or(ValidationError::UnknownSeries(series_number))?;
        check_draft(draft)?;

        let body = RegisterSeries::from(draft);
        let workout_id = exec.session.id.clone();
        let execution_id = exercise.id.clone();
        let series = self
            .service
            .register_series(&workout_id, &execution_id, series_number, &body)
            .await?;
        if series.series_number != series_number {
            return Err(ServiceError::Decode(format!(
                "asked to register series {} but got series {}",
                series_number, series.series_number
            ))
            .into());
        }

        let rest = series.rest_time.or(body.rest_time).unwrap_or(0);
        debug!("Series {} registered as {}", series_number, series.id);
        exec.current_mut().record(series);
        if let ExerciseStep::Registering { drafts } = &mut exec.step {
            drafts.remove(&series_number);
        }

        if series_number < planned && rest > 0 {
            self.timer.start(rest);
        }
        Ok(())
    }

    pub async fn complete_exercise(&mut self) -> Result<Completion, ExecutionError> {
        let phase = self.phase.name();
        let Phase::Executing(exec) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "complete the exercise",
                phase,
            });
        };

        let exercise = exec.current();
        let planned = exercise.planned().ok_or(ValidationError::SeriesNotPlanned)?;
        if !exercise.is_completion_eligible() {
            return Err(ValidationError::ExerciseIncomplete {
                registered: exercise.registered_count(),
                planned,
            }
            .into());
        }

        let workout_id = exec.session.id.clone();
        if !exercise.is_completed {
            let execution_id = exercise.id.clone();
            self.service
                .complete_exercise(&workout_id, &execution_id)
                .await?;
            exec.current_mut().is_completed = true;
            info!("Exercise {} completed", exec.current().exercise_name);
        }

        if !exec.is_last() {
            exec.cursor += 1;
            exec.step = ExerciseStep::for_exercise(exec.current());
            self.timer.clear();
            return Ok(Completion::NextExercise { cursor: exec.cursor });
        }

        self.finish(Some(FINISH_NOTE.to_string())).await?;
        Ok(Completion::WorkoutFinished)
    }

    /// Close the session as COMPLETED, also usable to stop early
    pub async fn finish(&mut self, notes: Option<String>) -> Result<(), ExecutionError> {
        let phase = self.phase.name();
        let Phase::Executing(exec) = &mut self.phase else {
            return Err(ExecutionError::WrongPhase {
                action: "finish the workout",
                phase,
            });
        };

        let workout_id = exec.session.id.clone();
        self.service
            .finish_workout(&workout_id, notes.as_deref())
            .await?;

        exec.session.close(WorkoutStatus::Completed, Utc::now())?;
        if notes.is_some() {
            exec.session.notes = notes;
        }
        self.timer.clear();
        self.phase = match std::mem::replace(&mut self.phase, Phase::Planning) {
            Phase::Executing(exec) => Phase::Finished(exec.session),
            other => other,
        };
        info!("Workout {} finished", workout_id);
        Ok(())
    }
}
