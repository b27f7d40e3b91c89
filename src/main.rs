//! treino - Workout execution client
//!
//! Every stepwise command reloads the session from the API first, so the
//! terminal can be closed between series without losing anything.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use treino::api::history::DEFAULT_PAGE_SIZE;
use treino::api::{
    ApiClient, CredentialProvider, DateRange, HistoryFilter, Login, Metric, Registration, ReportQuery, SeriesType,
    StatsPeriod, StatsQuery, WorkoutService,
};
use treino::config::Config;
use treino::db::Database;
use treino::error::{ErrorKind, ExecutionError, ServiceError};
use treino::exercises::{MuscleGroup, NewExercise};
use treino::stats::{Dashboard, SessionSummary};
use treino::tui::{App, Exit};
use treino::workout::model::DEFAULT_REST_SECS;
use treino::workout::{Completion, SeriesSlot, StartOutcome, WorkoutController, WorkoutSession, WorkoutStatus};

#[derive(Parser)]
#[command(name = "treino")]
#[command(author, version, about = "Workout execution client")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        email: String,
        #[arg(short, long, env = "TREINO_PASSWORD")]
        password: String,
    },

    /// Create an account
    Register {
        name: String,
        email: String,
        #[arg(short, long, env = "TREINO_PASSWORD")]
        password: String,
    },

    /// Forget the stored token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage the exercise catalog
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommand,
    },

    /// Start today's workout
    Start {
        /// Muscle groups to train (repeatable)
        #[arg(short, long = "muscle", required = true)]
        muscles: Vec<MuscleGroup>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Choose the exercises of a workout, in execution order
    Select {
        workout: String,
        #[arg(required = true)]
        exercises: Vec<String>,
    },

    /// Plan the series count of the current exercise
    Plan { workout: String, series: u8 },

    /// Register the next series of the current exercise
    Log {
        workout: String,

        #[arg(short, long)]
        weight: f64,

        #[arg(short, long)]
        reps: u32,

        /// Rest after this series, in seconds
        #[arg(short = 't', long, default_value_t = DEFAULT_REST_SECS)]
        rest: u32,

        /// Perceived effort, 1 to 5
        #[arg(short, long)]
        difficulty: Option<u8>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Complete the current exercise
    Complete { workout: String },

    /// Finish a workout, even with exercises left
    Finish {
        workout: String,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show a workout with every series
    Show { workout: String },

    /// List workout history
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Browse past workouts with server-side filters
    History {
        #[arg(short, long, value_enum)]
        status: Option<WorkoutStatus>,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(short, long)]
        muscle: Option<MuscleGroup>,

        /// Text matched against notes and exercise names
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },

    /// Start a new workout copied from a past one
    Duplicate { workout: String },

    /// Performance reports computed by the API
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },

    /// Show training statistics
    Stats,

    /// Delete a workout
    Delete { workout: String },

    /// Open the interactive workout screen
    Run {
        /// Workout to resume, defaults to today's open one
        workout: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// List the catalog
    List {
        #[arg(short, long = "muscle")]
        muscles: Vec<MuscleGroup>,
    },

    /// Add an exercise to the catalog
    Add {
        name: String,
        #[arg(short, long = "muscle", required = true)]
        muscles: Vec<MuscleGroup>,
        #[arg(short, long)]
        equipment: Option<String>,
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Replace an exercise's details
    Edit {
        id: String,
        name: String,
        #[arg(short, long = "muscle", required = true)]
        muscles: Vec<MuscleGroup>,
        #[arg(short, long)]
        equipment: Option<String>,
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Show one exercise
    Show { id: String },

    /// Remove an exercise
    Rm { id: String },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Totals and averages over a period
    Overview {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Progress of one exercise session by session
    Evolution {
        exercise: String,

        #[arg(short, long, value_enum, default_value_t = SeriesType::Max)]
        series: SeriesType,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Best marks per exercise
    Records {
        #[arg(short, long, value_enum, default_value_t = Metric::Weight)]
        metric: Metric,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Workout counts, weekday pattern and muscle-group split
    Habits {
        #[arg(short, long, value_enum, default_value_t = StatsPeriod::Month)]
        period: StatsPeriod,

        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn range(&self) -> Result<DateRange> {
        let range = DateRange::new(self.from, self.to);
        range.validate()?;
        Ok(range)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = match (&cli.command, cli.verbose) {
        (_, true) => Level::DEBUG,
        (Some(Commands::Run { .. }) | None, false) => Level::ERROR,
        _ => Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    cli.config.validate()?;
    let db = Database::open(&cli.config.db)?;

    let result = run(cli, &db).await;
    if let Err(err) = &result {
        match error_kind(err) {
            Some(ErrorKind::Fatal) => {
                db.clear()?;
                eprintln!("Your session is no longer valid. Run `treino login` again.");
            }
            Some(ErrorKind::Transient) => eprintln!("The API could not be reached. Try again."),
            _ => {}
        }
    }
    result
}

/// On login and register a 401 means bad input, not an expired session
fn rejected_credentials(err: ServiceError) -> anyhow::Error {
    match err {
        ServiceError::Unauthorized(_) => anyhow!("invalid email or password"),
        other => other.into(),
    }
}

fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(err) = err.downcast_ref::<ExecutionError>() {
        return Some(err.kind());
    }
    err.downcast_ref::<ServiceError>().map(ServiceError::kind)
}

async fn run(cli: Cli, db: &Database) -> Result<()> {
    let api = ApiClient::new(&cli.config.api_url, cli.config.timeout(), db)?;

    match cli.command {
        Some(Commands::Login { email, password }) => {
            let login = Login { email, password };
            login.validate()?;
            let auth = api.login(&login).await.map_err(rejected_credentials)?;
            db.save_login(&auth)?;
            println!("Logged in as {} <{}>", auth.user.name, auth.user.email);
        }

        Some(Commands::Register { name, email, password }) => {
            let registration = Registration { name, email, password };
            registration.validate()?;
            api.register(&registration).await.map_err(rejected_credentials)?;
            println!("Account created for {}. Run `treino login` next.", registration.email);
        }

        Some(Commands::Logout) => {
            db.clear()?;
            println!("Logged out");
        }

        Some(Commands::Whoami) => match db.current_user()? {
            Some(user) => println!("{} <{}> ({})", user.name, user.email, user.role.as_str()),
            None => println!("Not logged in"),
        },

        Some(Commands::Exercise { command }) => exercise_command(&api, command).await?,

        Some(Commands::Start { muscles, notes }) => {
            let mut controller = WorkoutController::new(api);
            match controller.start(&muscles, notes).await? {
                StartOutcome::Started => {
                    let selecting = controller
                        .selecting()
                        .context("workout started without a selection step")?;
                    println!("Started workout {}", selecting.session().id);
                    println!("Available exercises:");
                    for exercise in selecting.catalog() {
                        println!("  {:28} {:24} {}", exercise.id, exercise.name, exercise.muscle_groups.join(", "));
                    }
                }
                StartOutcome::Conflict { existing: Some(existing) } => {
                    println!("A workout is already in progress today: {}", existing.id);
                    println!("Continue it with `treino run {}`", existing.id);
                }
                StartOutcome::Conflict { existing: None } => {
                    println!("You already have a workout today");
                }
            }
        }

        Some(Commands::Select { workout, exercises }) => {
            let mut controller = resume(api, &workout).await?;
            for id in &exercises {
                controller.toggle_exercise(id)?;
            }
            controller.submit_selection().await?;
            print_current(&controller);
        }

        Some(Commands::Plan { workout, series }) => {
            let mut controller = resume(api, &workout).await?;
            controller.define_series(series).await?;
            print_current(&controller);
        }

        Some(Commands::Log { workout, weight, reps, rest, difficulty, notes }) => {
            let mut controller = resume(api, &workout).await?;
            let n = match controller.current_series_number() {
                Some(n) => n,
                None if controller.current_exercise().is_some_and(|e| e.planned().is_none()) => {
                    bail!("plan the series count first with `treino plan {workout} <N>`")
                }
                None => bail!("every planned series is registered, run `treino complete {workout}`"),
            };

            let draft = controller.draft_mut(n)?;
            draft.weight = weight;
            draft.reps = reps;
            draft.rest_time = rest;
            draft.difficulty = difficulty;
            draft.notes = notes;
            controller.register_series(n).await?;

            println!("Series {} registered: {} kg x {}", n, weight, reps);
            if controller.timer().is_running() {
                println!("Rest {}s before the next series", controller.timer().remaining());
            }
        }

        Some(Commands::Complete { workout }) => {
            let mut controller = resume(api, &workout).await?;
            match controller.complete_exercise().await? {
                Completion::NextExercise { .. } => print_current(&controller),
                Completion::WorkoutFinished => {
                    println!("Workout finished");
                    if let Some(session) = controller.session() {
                        print_summary(session);
                    }
                }
            }
        }

        Some(Commands::Finish { workout, notes }) => {
            let mut controller = resume(api, &workout).await?;
            controller.finish(notes).await?;
            if let Some(session) = controller.session() {
                print_summary(session);
            }
        }

        Some(Commands::Show { workout }) => {
            let mut session = api.workout_details(&workout).await?;
            session.sort_exercises();
            print_session(&session);
        }

        Some(Commands::List { limit }) => {
            let mut workouts = api.list_workouts().await?;
            workouts.sort_by(|a, b| b.date.cmp(&a.date));
            println!("Recent workouts:");
            println!("{:-<72}", "");
            for w in workouts.iter().take(limit) {
                println!(
                    "{} | {:11} | {:24} | {}",
                    w.date.format("%Y-%m-%d"),
                    w.status.as_str(),
                    w.muscle_groups.join(", "),
                    w.id
                );
            }
        }

        Some(Commands::History { status, range, muscle, search, page, limit }) => {
            let range = range.range()?;
            let filter = HistoryFilter {
                page: Some(page),
                limit: Some(limit),
                status,
                start_date: range.start_date,
                end_date: range.end_date,
                muscle_group: muscle,
                search,
            };
            filter.validate()?;
            print_history(&api, &filter).await?;
        }

        Some(Commands::Duplicate { workout }) => {
            let copy = api.duplicate_workout(&workout).await?;
            println!("Created workout {} from {}", copy.id, workout);
            println!("Pick its exercises with `treino run {}`", copy.id);
        }

        Some(Commands::Report { command }) => report_command(&api, command).await?,

        Some(Commands::Stats) => {
            let dashboard = Dashboard::from_workouts(api.list_workouts().await?, Utc::now());

            println!("Training Statistics");
            println!("{:-<40}", "");
            println!("Completed workouts: {}", dashboard.total_completed);
            println!("Last 7 days:        {}", dashboard.last_7_days);
            println!("Last 30 days:       {}", dashboard.last_30_days);
            println!("Current streak:     {}", dashboard.streak);
            if let Some(active) = &dashboard.active {
                println!("In progress:        {} ({})", active.id, active.muscle_groups.join(", "));
            }
        }

        Some(Commands::Delete { workout }) => {
            api.delete_workout(&workout).await?;
            println!("Deleted workout {}", workout);
        }

        Some(Commands::Run { workout }) => run_tui(api, workout.as_deref(), db).await?,

        None => {
            // Default: show TUI
            run_tui(api, None, db).await?;
        }
    }

    Ok(())
}

async fn run_tui<S: WorkoutService>(api: S, workout: Option<&str>, db: &Database) -> Result<()> {
    if db.current_user()?.is_none() {
        bail!("not logged in, run `treino login <EMAIL>` first");
    }

    let mut app = App::new(WorkoutController::new(api));
    app.prepare(workout).await;
    if app.run().await? == Exit::CredentialRejected {
        db.clear()?;
        eprintln!("Your session is no longer valid. Run `treino login` again.");
    }
    Ok(())
}

async fn resume<S: WorkoutService>(api: S, workout: &str) -> Result<WorkoutController<S>> {
    let mut controller = WorkoutController::new(api);
    controller.resume(workout).await?;
    Ok(controller)
}

async fn exercise_command<P: CredentialProvider>(
    api: &ApiClient<P>,
    command: ExerciseCommand,
) -> Result<()> {
    match command {
        ExerciseCommand::List { muscles } => {
            for exercise in api.list_exercises(&muscles).await? {
                println!(
                    "{:28} | {:24} | {:20} | {}",
                    exercise.id,
                    exercise.name,
                    exercise.muscle_groups.join(", "),
                    exercise.equipment.as_deref().unwrap_or("-")
                );
            }
        }
        ExerciseCommand::Add { name, muscles, equipment, instructions } => {
            let exercise = NewExercise {
                name,
                muscle_groups: muscles,
                equipment,
                instructions,
            };
            exercise.validate()?;
            let created = api.create_exercise(&exercise).await?;
            println!("Added {} (id: {})", created.name, created.id);
        }
        ExerciseCommand::Edit { id, name, muscles, equipment, instructions } => {
            let exercise = NewExercise {
                name,
                muscle_groups: muscles,
                equipment,
                instructions,
            };
            exercise.validate()?;
            let updated = api.update_exercise(&id, &exercise).await?;
            println!("Updated {} (id: {})", updated.name, updated.id);
        }
        ExerciseCommand::Show { id } => {
            let exercise = api.exercise(&id).await?;
            println!("{}", exercise.name);
            println!("Muscle groups: {}", exercise.muscle_groups.join(", "));
            println!("Equipment:     {}", exercise.equipment.as_deref().unwrap_or("-"));
            if let Some(instructions) = &exercise.instructions {
                println!("\n{}", instructions);
            }
        }
        ExerciseCommand::Rm { id } => {
            api.delete_exercise(&id).await?;
            println!("Removed exercise {}", id);
        }
    }
    Ok(())
}

async fn print_history<P: CredentialProvider>(api: &ApiClient<P>, filter: &HistoryFilter) -> Result<()> {
    let history = api.history(filter).await?;
    println!(
        "Page {} of {} ({} workouts)",
        history.pagination.page,
        history.pagination.total_pages.max(1),
        history.pagination.total
    );
    println!("{:-<88}", "");
    for w in &history.data {
        println!(
            "{} {:9} | {:11} | {:24} | {}/{} ex | {:>8.1} kg | {}",
            w.date.format("%Y-%m-%d"),
            w.day_of_week,
            w.status.as_str(),
            w.muscle_groups.join(", "),
            w.stats.completed_exercises,
            w.stats.total_exercises,
            w.stats.total_volume,
            w.id
        );
    }
    if history.pagination.has_next {
        println!("More with `--page {}`", history.pagination.page + 1);
    }
    Ok(())
}

async fn report_command<P: CredentialProvider>(api: &ApiClient<P>, command: ReportCommand) -> Result<()> {
    match command {
        ReportCommand::Overview { range } => {
            let overview = api.report_overview(&ReportQuery::within(range.range()?)).await?;
            println!("Overview {} to {}", overview.period.start_date, overview.period.end_date);
            println!("{:-<40}", "");
            println!("Workouts:              {}", overview.totals.workouts);
            println!("Exercises:             {}", overview.totals.exercises);
            println!("Series:                {}", overview.totals.series);
            println!("Volume:                {:.1} kg", overview.totals.volume);
            println!("Exercises per workout: {:.1}", overview.averages.exercises_per_workout);
            println!("Series per workout:    {:.1}", overview.averages.series_per_workout);
            println!("Average duration:      {:.0} min", overview.averages.duration_minutes);
        }
        ReportCommand::Evolution { exercise, series, range } => {
            let query = ReportQuery::evolution(&exercise, series, range.range()?);
            let evolution = api.exercise_evolution(&query).await?;
            println!("{} ({} sessions)", evolution.exercise_name, evolution.analysis.sessions_analyzed);
            println!("{:-<56}", "");
            for point in &evolution.data {
                let best = point.max_weight.or(point.best_volume).or(point.max_reps);
                match best {
                    Some(mark) => println!(
                        "{} {:9} | {:>6.1} kg x {:>3} | {:>7.1} kg",
                        point.date, point.day_of_week, mark.weight, mark.reps, mark.volume
                    ),
                    None => println!("{} {:9} | -", point.date, point.day_of_week),
                }
            }
            let a = &evolution.analysis;
            println!("{:-<56}", "");
            println!("Weight: {:+.1} kg ({:+.1}%)", a.weight_progress.difference, a.weight_progress.percentage);
            println!("Reps:   {:+.0} ({:+.1}%)", a.reps_progress.difference, a.reps_progress.percentage);
            println!("Volume: {:+.1} kg ({:+.1}%)", a.volume_progress.difference, a.volume_progress.percentage);
            println!("Trend:  {}", a.overall_trend.as_str());
        }
        ReportCommand::Records { metric, range } => {
            let records = api.personal_records(&ReportQuery::records(metric, range.range()?)).await?;
            if records.is_empty() {
                println!("No records yet");
            }
            for pr in &records {
                let reps = pr.record.reps.map(|r| format!(" x {r}")).unwrap_or_default();
                println!(
                    "{:28} | {:>8.1} {}{} | {}",
                    pr.exercise_name,
                    pr.record.value,
                    metric.unit(),
                    reps,
                    pr.record.date.get(..10).unwrap_or(&pr.record.date)
                );
            }
        }
        ReportCommand::Habits { period, range } => {
            let range = range.range()?;
            let stats = api.history_stats(&StatsQuery::new(period, range)).await?;
            println!("Workouts ({})", stats.period);
            println!("{:-<40}", "");
            println!(
                "Total: {} | completed {} | cancelled {} | in progress {}",
                stats.totals.workouts,
                stats.totals.completed_workouts,
                stats.totals.cancelled_workouts,
                stats.totals.in_progress_workouts
            );
            println!("Per week:        {:.1}", stats.averages.workouts_per_week);
            println!("Volume/workout:  {:.1} kg", stats.averages.volume_per_workout);
            println!("Completion rate: {:.0}%", stats.completion_rate);

            println!("\nBy weekday:");
            for day in api.weekly_pattern(&range).await? {
                println!("  {:10} {:>3} ({:.0}%)", day.day_of_week, day.count, day.percentage);
            }
            println!("\nBy muscle group:");
            for group in api.muscle_group_stats(&range).await?.iter().take(5) {
                println!("  {:10} {:>3} ({:.0}%)", group.name, group.count, group.percentage);
            }
        }
    }
    Ok(())
}

fn print_current<S: WorkoutService>(controller: &WorkoutController<S>) {
    let Some(exercise) = controller.current_exercise() else {
        return;
    };
    let (position, total) = controller.progress();
    println!("Exercise {}/{}: {}", position, total, exercise.exercise_name);
    match exercise.planned() {
        None => println!("  Plan the series count next (1-10)"),
        Some(planned) => {
            for slot in controller.series_slots() {
                match slot {
                    SeriesSlot::Registered(s) => {
                        println!("  #{} {} kg x {}", s.series_number, s.weight, s.reps)
                    }
                    SeriesSlot::Pending(d) => println!("  #{} pending", d.series_number),
                }
            }
            println!("  {}/{} series registered", exercise.registered_count(), planned);
        }
    }
}

fn print_session(session: &WorkoutSession) {
    println!(
        "Workout {} | {} | {} | {}",
        session.id,
        session.date.format("%Y-%m-%d"),
        session.status.as_str(),
        session.muscle_groups.join(", ")
    );
    for exercise in &session.exercise_executions {
        let mark = if exercise.is_completed { "x" } else { " " };
        let planned = exercise
            .planned()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".into());
        println!(
            "[{}] {} ({}/{} series)",
            mark,
            exercise.exercise_name,
            exercise.registered_count(),
            planned
        );
        for s in &exercise.series_executions {
            println!(
                "      #{} {} kg x {}{}",
                s.series_number,
                s.weight,
                s.reps,
                s.difficulty.map(|d| format!(" (difficulty {d})")).unwrap_or_default()
            );
        }
    }
    print_summary(session);
}

fn print_summary(session: &WorkoutSession) {
    let summary = SessionSummary::of(session);
    println!("{:-<40}", "");
    println!(
        "Exercises: {}/{} | Series: {} | Volume: {:.1} kg",
        summary.completed_exercises, summary.exercises, summary.series, summary.volume
    );
    if let Some(minutes) = summary.duration_minutes {
        println!("Duration: {} min", minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_login_is_not_a_lost_session() {
        let err = rejected_credentials(ServiceError::Unauthorized("Invalid credentials".into()));
        assert_eq!(err.to_string(), "invalid email or password");
        assert_eq!(error_kind(&err), None);

        let err = rejected_credentials(ServiceError::Network("timed out".into()));
        assert_eq!(error_kind(&err), Some(ErrorKind::Transient));
    }

    #[test]
    fn test_history_flags() {
        let cli = Cli::try_parse_from([
            "treino", "history", "--status", "completed", "--from", "2024-03-01", "--to", "2024-03-31",
            "--muscle", "back", "--search", "remada", "--page", "2",
        ])
        .unwrap();
        let Some(Commands::History { status, range, muscle, search, page, limit }) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(status, Some(WorkoutStatus::Completed));
        assert_eq!(muscle, Some(MuscleGroup::Back));
        assert_eq!(search.as_deref(), Some("remada"));
        assert_eq!((page, limit), (2, DEFAULT_PAGE_SIZE));
        assert_eq!(range.range().unwrap().end_date, "2024-03-31".parse().ok());
    }

    #[test]
    fn test_report_flags_and_inverted_range() {
        let cli = Cli::try_parse_from(["treino", "report", "evolution", "ex7", "--series", "average"]).unwrap();
        let Some(Commands::Report { command: ReportCommand::Evolution { exercise, series, .. } }) = cli.command else {
            panic!("expected report evolution");
        };
        assert_eq!(exercise, "ex7");
        assert_eq!(series, SeriesType::Average);

        let cli = Cli::try_parse_from(["treino", "report", "records", "--from", "2024-05-01", "--to", "2024-04-01"])
            .unwrap();
        let Some(Commands::Report { command: ReportCommand::Records { metric, range } }) = cli.command else {
            panic!("expected report records");
        };
        assert_eq!(metric, Metric::Weight);
        assert!(range.range().is_err());
    }
}
