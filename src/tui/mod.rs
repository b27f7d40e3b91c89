//! TUI module - Interactive workout execution with ratatui

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table},
};
use std::io::{Stdout, stdout};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::WorkoutService;
use crate::error::{ErrorKind, ExecutionError, ValidationError};
use crate::exercises::{MuscleGroup, muscle_groups_in};
use crate::stats::SessionSummary;
use crate::workout::controller::MAX_SERIES;
use crate::workout::timer::{TimerEvent, format_rest};
use crate::workout::{
    Completion, Executing, ExerciseStep, Phase, SeriesDraft, SeriesSlot, StartOutcome, WorkoutController,
    WorkoutSession,
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// How the app ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    /// The API rejected the stored credential
    CredentialRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Search,
    Weight,
    Reps,
    Rest,
    Difficulty,
}

impl Field {
    fn label(&self) -> &'static str {
        match self {
            Field::Search => "search",
            Field::Weight => "weight",
            Field::Reps => "reps",
            Field::Rest => "rest time",
            Field::Difficulty => "difficulty",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Screen {
    Planning,
    Selecting,
    Executing,
    Finished,
}

struct Input {
    field: Field,
    buffer: String,
}

/// App state for TUI
pub struct App<S: WorkoutService> {
    controller: WorkoutController<S>,
    cursor: usize,
    groups: Vec<MuscleGroup>,
    prompt: Option<WorkoutSession>,
    input: Option<Input>,
    status: String,
    exit: Exit,
    should_quit: bool,
}

impl<S: WorkoutService> App<S> {
    pub fn new(controller: WorkoutController<S>) -> Self {
        Self {
            controller,
            cursor: 0,
            groups: Vec::new(),
            prompt: None,
            input: None,
            status: String::new(),
            exit: Exit::Quit,
            should_quit: false,
        }
    }

    /// Open a given session, or offer today's unfinished one
    pub async fn prepare(&mut self, workout_id: Option<&str>) {
        let result = match workout_id {
            Some(id) => self.controller.resume(id).await,
            None => match self.controller.find_resumable(chrono::Utc::now().date_naive()).await {
                Ok(Some(existing)) => {
                    self.status = "You have a workout in progress today. Resume it? (y/n)".into();
                    self.prompt = Some(existing);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
        };
        self.report(result);
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<Exit> {
        let mut terminal = init_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        restore_terminal()?;
        result.map(|_| self.exit)
    }

    async fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            if self.controller.timer_mut().poll() == TimerEvent::Finished {
                self.status = "Rest over, next series".into();
            }
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events().await?;
        }
        Ok(())
    }

    fn screen(&self) -> Screen {
        match self.controller.phase() {
            Phase::Planning => Screen::Planning,
            Phase::Selecting(_) => Screen::Selecting,
            Phase::Executing(_) => Screen::Executing,
            Phase::Finished(_) => Screen::Finished,
        }
    }

    fn report(&mut self, result: Result<(), ExecutionError>) {
        let Err(err) = result else {
            return;
        };
        warn!("{}", err);
        if err.kind() == ErrorKind::Fatal {
            self.exit = Exit::CredentialRejected;
            self.should_quit = true;
        }
        self.status = match err.kind() {
            ErrorKind::Transient => format!("{err} (try again)"),
            _ => err.to_string(),
        };
    }

    async fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if self.input.is_some() {
                let result = self.on_input(key.code);
                self.report(result);
                return Ok(());
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::F(5) if self.controller.session().is_some() => {
                    let result = self.controller.refresh().await;
                    self.report(result);
                }
                code => {
                    let result = match self.screen() {
                        Screen::Planning => self.on_planning(code).await,
                        Screen::Selecting => self.on_selecting(code).await,
                        Screen::Executing => self.on_executing(code).await,
                        Screen::Finished => Ok(()),
                    };
                    self.report(result);
                }
            }
        }
        Ok(())
    }

    fn on_input(&mut self, code: KeyCode) -> Result<(), ExecutionError> {
        let Some(input) = self.input.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::Esc => {
                self.input = None;
            }
            KeyCode::Enter => {
                if let Some(input) = self.input.take()
                    && input.field != Field::Search
                {
                    let n = self
                        .controller
                        .current_series_number()
                        .ok_or(ValidationError::SeriesNotPlanned)?;
                    apply_value(self.controller.draft_mut(n)?, input.field, &input.buffer)?;
                    self.status.clear();
                }
            }
            KeyCode::Backspace => {
                input.buffer.pop();
                if input.field == Field::Search {
                    let term = input.buffer.clone();
                    self.controller.set_search(term)?;
                    self.cursor = 0;
                }
            }
            KeyCode::Char(c) => {
                input.buffer.push(c);
                if input.field == Field::Search {
                    let term = input.buffer.clone();
                    self.controller.set_search(term)?;
                    self.cursor = 0;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_planning(&mut self, code: KeyCode) -> Result<(), ExecutionError> {
        if let Some(existing) = &self.prompt {
            match code {
                KeyCode::Char('y') => {
                    let id = existing.id.clone();
                    self.prompt = None;
                    self.cursor = 0;
                    self.status.clear();
                    self.controller.resume(&id).await?;
                }
                KeyCode::Char('n') => {
                    self.prompt = None;
                    self.status.clear();
                }
                _ => {}
            }
            return Ok(());
        }

        let all = MuscleGroup::all();
        match code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = (self.cursor + 1).min(all.len() - 1),
            KeyCode::Char(' ') => {
                let group = all[self.cursor];
                match self.groups.iter().position(|g| *g == group) {
                    Some(pos) => {
                        self.groups.remove(pos);
                    }
                    None => self.groups.push(group),
                }
            }
            KeyCode::Enter => match self.controller.start(&self.groups, None).await? {
                StartOutcome::Started => {
                    self.cursor = 0;
                    self.status = "Workout started, pick your exercises".into();
                }
                StartOutcome::Conflict { existing: Some(existing) } => {
                    self.status = "A workout is already in progress today. Resume it? (y/n)".into();
                    self.prompt = Some(existing);
                }
                StartOutcome::Conflict { existing: None } => {
                    self.status = "You already have a workout today".into();
                }
            },
            _ => {}
        }
        Ok(())
    }

    async fn on_selecting(&mut self, code: KeyCode) -> Result<(), ExecutionError> {
        let Some(selecting) = self.controller.selecting() else {
            return Ok(());
        };
        let visible: Vec<String> = selecting.filtered().iter().map(|e| e.id.clone()).collect();
        let groups = muscle_groups_in(selecting.catalog());
        let current_group = selecting.filter().muscle_group.clone();
        let search = selecting.filter().search.clone();

        match code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = (self.cursor + 1).min(visible.len().saturating_sub(1)),
            KeyCode::Char(' ') => {
                if let Some(id) = visible.get(self.cursor) {
                    self.controller.toggle_exercise(id)?;
                }
            }
            KeyCode::Char('a') => self.controller.toggle_all()?,
            KeyCode::Char('/') => {
                self.input = Some(Input {
                    field: Field::Search,
                    buffer: search,
                });
            }
            KeyCode::Char('m') => {
                self.controller
                    .set_muscle_filter(next_group(&groups, current_group.as_deref()))?;
                self.cursor = 0;
            }
            KeyCode::Char('r') => self.controller.load_catalog().await?,
            KeyCode::Enter => {
                self.controller.submit_selection().await?;
                self.cursor = 0;
                self.status.clear();
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_executing(&mut self, code: KeyCode) -> Result<(), ExecutionError> {
        let selector = match self.controller.executing().map(Executing::step) {
            Some(ExerciseStep::PlanningSeries { count }) => Some(*count),
            Some(ExerciseStep::Registering { .. }) => None,
            None => return Ok(()),
        };

        if let Some(count) = selector {
            match code {
                KeyCode::Left | KeyCode::Char('-') if count > 1 => self.controller.set_series_count(count - 1)?,
                KeyCode::Right | KeyCode::Char('+') if count < MAX_SERIES => {
                    self.controller.set_series_count(count + 1)?
                }
                KeyCode::Enter => self.controller.confirm_series_count().await?,
                KeyCode::Char('f') => self.controller.finish(None).await?,
                _ => {}
            }
            return Ok(());
        }

        match code {
            KeyCode::Char('w') => self.edit(Field::Weight)?,
            KeyCode::Char('r') => self.edit(Field::Reps)?,
            KeyCode::Char('t') => self.edit(Field::Rest)?,
            KeyCode::Char('d') => self.edit(Field::Difficulty)?,
            KeyCode::Enter => {
                self.controller.register_current().await?;
                self.status = match self.controller.current_series_number() {
                    Some(n) => format!("Registered, series {n} is next"),
                    None => "All series registered, press c to complete".into(),
                };
            }
            KeyCode::Char('s') => self.controller.timer_mut().skip(),
            KeyCode::Char('c') => match self.controller.complete_exercise().await? {
                Completion::NextExercise { .. } => self.status = "Exercise completed".into(),
                Completion::WorkoutFinished => {
                    info!("Workout finished from the TUI");
                    self.status = "Workout finished".into();
                }
            },
            KeyCode::Char('f') => self.controller.finish(None).await?,
            _ => {}
        }
        Ok(())
    }

    fn edit(&mut self, field: Field) -> Result<(), ExecutionError> {
        let n = self
            .controller
            .current_series_number()
            .ok_or(ValidationError::SeriesNotPlanned)?;
        let draft = self.controller.draft_mut(n)?;
        self.input = Some(Input {
            field,
            buffer: current_value(draft, field),
        });
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let (position, total) = self.controller.progress();
        let mut title = format!("treino - {}", self.controller.phase().name());
        if total > 0 {
            title.push_str(&format!("  [exercise {position}/{total}]"));
        }
        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        match self.controller.phase() {
            Phase::Planning => self.render_planning(frame, chunks[1]),
            Phase::Selecting(_) => self.render_selecting(frame, chunks[1]),
            Phase::Executing(exec) => self.render_executing(frame, chunks[1], exec),
            Phase::Finished(session) => render_finished(frame, chunks[1], session),
        }

        let status = match &self.input {
            Some(input) => format!("{}: {}_", input.field.label(), input.buffer),
            None => self.status.clone(),
        };
        let status = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, chunks[2]);

        // Footer
        let footer = Paragraph::new(self.help())
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn help(&self) -> &'static str {
        if self.input.is_some() {
            return "enter: apply | esc: cancel";
        }
        match self.controller.phase() {
            Phase::Planning if self.prompt.is_some() => "y: resume | n: dismiss | q: quit",
            Phase::Planning => "space: toggle group | enter: start | q: quit",
            Phase::Selecting(_) => "space: toggle | a: all | /: search | m: muscle | enter: confirm | F5: reload | q: quit",
            Phase::Executing(exec) => match exec.step() {
                ExerciseStep::PlanningSeries { .. } => "-/+: series | enter: confirm | f: finish | q: quit",
                ExerciseStep::Registering { .. } => {
                    "w/r/t/d: edit | enter: register | s: skip rest | c: complete | f: finish | F5: reload | q: quit"
                }
            },
            Phase::Finished(_) => "q: quit",
        }
    }

    fn render_planning(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = MuscleGroup::all()
            .iter()
            .map(|g| {
                let mark = if self.groups.contains(g) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {}", mark, g.label()))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Muscle groups"))
            .highlight_style(Style::default().fg(Color::Yellow).bold());
        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_selecting(&self, frame: &mut Frame, area: Rect) {
        let Some(selecting) = self.controller.selecting() else {
            return;
        };
        let filtered = selecting.filtered();
        let items: Vec<ListItem> = filtered
            .iter()
            .map(|e| {
                let mark = if selecting.selection().contains(&e.id) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {} ({})", mark, e.name, e.muscle_groups.join(", ")))
            })
            .collect();

        let title = format!(
            "Exercises {}/{} | {} selected | muscle: {}",
            filtered.len(),
            selecting.catalog().len(),
            selecting.selection().len(),
            selecting.filter().muscle_group.as_deref().unwrap_or("all")
        );
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().fg(Color::Yellow).bold());
        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_executing(&self, frame: &mut Frame, area: Rect, exec: &Executing) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(5)])
            .split(area);

        let exercise = exec.current();
        let rest = if self.controller.timer().is_running() {
            format!("Rest: {}", format_rest(self.controller.timer().remaining()))
        } else {
            "Rest: -".to_string()
        };
        let info = vec![
            Line::from(Span::from(exercise.exercise_name.clone()).bold()),
            Line::from(format!(
                "{} | {}",
                exercise.muscle_groups().join(", "),
                exercise.equipment().unwrap_or("no equipment")
            )),
            Line::from(rest),
        ];
        let info = Paragraph::new(info).block(Block::default().borders(Borders::ALL));
        frame.render_widget(info, chunks[0]);

        match exec.step() {
            ExerciseStep::PlanningSeries { count } => {
                let selector = Paragraph::new(format!("How many series?  < {count} >"))
                    .style(Style::default().fg(Color::Yellow))
                    .block(Block::default().borders(Borders::ALL).title("Plan"));
                frame.render_widget(selector, chunks[1]);
            }
            ExerciseStep::Registering { .. } => {
                let current = self.controller.current_series_number();
                let rows: Vec<Row> = exec.slots().iter().map(|slot| series_row(slot, current)).collect();
                let table = Table::new(
                    rows,
                    [
                        Constraint::Length(4),
                        Constraint::Length(10),
                        Constraint::Length(6),
                        Constraint::Length(8),
                        Constraint::Length(10),
                        Constraint::Min(10),
                    ],
                )
                .header(Row::new(vec!["#", "Weight", "Reps", "Rest", "Difficulty", ""]).style(Style::default().bold()))
                .block(Block::default().borders(Borders::ALL).title(format!(
                    "Series {}/{}",
                    exercise.registered_count(),
                    exercise.planned().unwrap_or(0)
                )));
                frame.render_widget(table, chunks[1]);
            }
        }
    }
}

fn series_row(slot: &SeriesSlot, current: Option<u8>) -> Row<'static> {
    match slot {
        SeriesSlot::Registered(s) => Row::new(vec![
            Cell::from(s.series_number.to_string()),
            Cell::from(format!("{} kg", s.weight)),
            Cell::from(s.reps.to_string()),
            Cell::from(s.rest_time.map(format_rest).unwrap_or_default()),
            Cell::from(s.difficulty.map(|d| d.to_string()).unwrap_or_default()),
            Cell::from("done"),
        ])
        .style(Style::default().fg(Color::Green)),
        SeriesSlot::Pending(d) => {
            let row = Row::new(vec![
                Cell::from(d.series_number.to_string()),
                Cell::from(format!("{} kg", d.weight)),
                Cell::from(d.reps.to_string()),
                Cell::from(format_rest(d.rest_time)),
                Cell::from(d.difficulty.map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(""),
            ]);
            if current == Some(d.series_number) {
                row.style(Style::default().fg(Color::Yellow).bold())
            } else {
                row.style(Style::default().fg(Color::DarkGray))
            }
        }
    }
}

fn render_finished(frame: &mut Frame, area: Rect, session: &WorkoutSession) {
    let summary = SessionSummary::of(session);
    let lines = vec![
        Line::from("Workout complete".bold()),
        Line::from(format!(
            "Exercises: {}/{} ({:.0}%)",
            summary.completed_exercises,
            summary.exercises,
            summary.completion_rate()
        )),
        Line::from(format!("Series: {}", summary.series)),
        Line::from(format!("Volume: {:.1} kg", summary.volume)),
        Line::from(format!(
            "Duration: {}",
            summary
                .duration_minutes
                .map(|m| format!("{m} min"))
                .unwrap_or_else(|| "-".into())
        )),
    ];
    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Summary"));
    frame.render_widget(body, area);
}

/// Cycle: all groups, then each group in catalog order, then back to all
fn next_group(groups: &[String], current: Option<&str>) -> Option<String> {
    let next = match current {
        None => 0,
        Some(group) => match groups.iter().position(|g| g == group) {
            Some(pos) => pos + 1,
            None => 0,
        },
    };
    groups.get(next).cloned()
}

fn current_value(draft: &SeriesDraft, field: Field) -> String {
    match field {
        Field::Weight if draft.weight > 0.0 => draft.weight.to_string(),
        Field::Reps if draft.reps > 0 => draft.reps.to_string(),
        Field::Rest => draft.rest_time.to_string(),
        Field::Difficulty => draft.difficulty.map(|d| d.to_string()).unwrap_or_default(),
        _ => String::new(),
    }
}

fn apply_value(draft: &mut SeriesDraft, field: Field, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidNumber {
        field: field.label(),
        value: value.to_string(),
    };
    match field {
        Field::Weight => {
            let weight: f64 = value.replace(',', ".").parse().map_err(|_| invalid())?;
            if !weight.is_finite() {
                return Err(invalid());
            }
            draft.weight = weight;
        }
        Field::Reps => draft.reps = value.parse().map_err(|_| invalid())?,
        Field::Rest => draft.rest_time = value.parse().map_err(|_| invalid())?,
        Field::Difficulty if value.is_empty() => draft.difficulty = None,
        Field::Difficulty => draft.difficulty = Some(value.parse().map_err(|_| invalid())?),
        Field::Search => {}
    }
    Ok(())
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_group_cycles() {
        let groups = vec!["chest".to_string(), "legs".to_string()];
        assert_eq!(next_group(&groups, None).as_deref(), Some("chest"));
        assert_eq!(next_group(&groups, Some("chest")).as_deref(), Some("legs"));
        assert_eq!(next_group(&groups, Some("legs")), None);
        assert_eq!(next_group(&[], None), None);
    }

    #[test]
    fn test_apply_value_parses_fields() {
        let mut draft = SeriesDraft::new(1);
        apply_value(&mut draft, Field::Weight, "42,5").unwrap();
        apply_value(&mut draft, Field::Reps, "12").unwrap();
        apply_value(&mut draft, Field::Rest, "60").unwrap();
        apply_value(&mut draft, Field::Difficulty, "4").unwrap();

        assert_eq!(draft.weight, 42.5);
        assert_eq!(draft.reps, 12);
        assert_eq!(draft.rest_time, 60);
        assert_eq!(draft.difficulty, Some(4));

        apply_value(&mut draft, Field::Difficulty, "").unwrap();
        assert_eq!(draft.difficulty, None);
    }

    #[test]
    fn test_apply_value_rejects_garbage() {
        let mut draft = SeriesDraft::new(1);
        let err = apply_value(&mut draft, Field::Reps, "ten").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNumber { field: "reps", value: "ten".into() }
        );
        assert_eq!(draft.reps, 0);
    }

    #[test]
    fn test_apply_value_rejects_infinite_weight() {
        let mut draft = SeriesDraft::new(1);
        for text in ["inf", "-inf", "NaN"] {
            let err = apply_value(&mut draft, Field::Weight, text).unwrap_err();
            assert_eq!(err, ValidationError::InvalidNumber { field: "weight", value: text.into() });
        }
        assert_eq!(draft.weight, 0.0);
    }

    #[test]
    fn test_current_value_leaves_zero_blank() {
        let draft = SeriesDraft::new(1);
        assert_eq!(current_value(&draft, Field::Weight), "");
        assert_eq!(current_value(&draft, Field::Rest), "90");
    }
}
