// Task board CLI - lists, creates, edits and deletes tasks on a remote board
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use task_board::board::{TaskCard, COLUMN_ORDER};
use task_board::config::AppConfig;
use task_board::datetime::{build_time_options, local_now, DuePreset, LocalParts};
use task_board::handlers::{BoardHandlers, HandlerError};
use task_board::models::{Status, TaskId};
use task_board::services::{AppState, HttpTaskApi};
use task_board::validation::TaskDraft;

#[derive(Parser)]
#[command(name = "task-board")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the board grouped by column
    List,

    /// Show every field of one task
    Show { id: TaskId },

    /// Create a task
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due_date: Option<String>,

        /// Due time, HH:mm (midnight when omitted)
        #[arg(long)]
        due_time: Option<String>,

        /// Due preset: today18, tomorrow09, none
        #[arg(long, conflicts_with_all = ["due_date", "due_time"])]
        due: Option<DuePreset>,
    },

    /// Edit a task; omitted fields keep their value
    Edit {
        id: TaskId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// todo, in-progress, done (or 0, 1, 2)
        #[arg(short, long)]
        status: Option<Status>,

        #[arg(long)]
        due_date: Option<String>,

        #[arg(long)]
        due_time: Option<String>,

        #[arg(long, conflicts_with_all = ["due_date", "due_time"])]
        due: Option<DuePreset>,
    },

    /// Delete a task
    Delete {
        id: TaskId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the selectable due times
    Times {
        /// Minutes between options (default from config)
        #[arg(long)]
        step: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr, board output to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("task_board=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::new()?;

    let time_step = config.board.time_step_minutes;
    let state = AppState::new(config)?;
    let handlers = BoardHandlers::new(state.repository, state.offset);

    match run(&handlers, cli.command, time_step).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(HandlerError::Invalid(errors)) => {
            eprintln!("Please fix the following errors:");
            for message in errors.summary() {
                eprintln!("  - {message}");
            }
            Ok(ExitCode::from(2))
        }
        Err(HandlerError::Cancelled) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(
    handlers: &BoardHandlers<HttpTaskApi>,
    command: Commands,
    time_step: u32,
) -> Result<(), HandlerError> {
    match command {
        Commands::List => {
            let buckets = handlers.load().await?;
            let now = Utc::now();
            for column in COLUMN_ORDER {
                let tasks = buckets.get(column);
                println!("== {} ({})", column.title(), tasks.len());
                for task in tasks {
                    let card = TaskCard::new(task, now, handlers.offset());
                    let due = match (&card.due, card.overdue) {
                        (Some(due), true) => format!("  [overdue {due}]"),
                        (Some(due), false) => format!("  [due {due}]"),
                        (None, _) => String::new(),
                    };
                    println!("  #{} {}{}", card.id, card.title, due);
                    println!("      {}", card.summary);
                }
            }
        }

        Commands::Show { id } => {
            handlers.load().await?;
            for (label, value) in handlers.details(id)?.rows {
                println!("{label:<12} {value}");
            }
        }

        Commands::Create {
            title,
            description,
            due_date,
            due_time,
            due,
        } => {
            handlers.load().await?;
            let parts = due_parts(handlers, due, due_date, due_time, LocalParts::default());
            let draft = TaskDraft {
                title,
                description,
                due_date: parts.to_wire(),
            };
            let task = handlers.create(&draft).await?;
            println!("Created task #{}", task.id);
        }

        Commands::Edit {
            id,
            title,
            description,
            status,
            due_date,
            due_time,
            due,
        } => {
            handlers.load().await?;
            let mut draft = handlers.begin_edit(id)?;
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(status) = status {
                draft.status = status;
            }
            draft.due = due_parts(handlers, due, due_date, due_time, draft.due.clone());
            let task = handlers.submit_edit(&draft).await?;
            println!("Updated task #{} ({})", task.id, task.status);
        }

        Commands::Delete { id, yes } => {
            handlers.load().await?;
            handlers.delete(id, |prompt| yes || confirm(prompt)).await?;
            println!("Deleted task #{id}");
        }

        Commands::Times { step } => {
            for option in build_time_options(step.unwrap_or(time_step)) {
                println!("{option}");
            }
        }
    }

    Ok(())
}

/// Resolves the due-date flags against the current form value.
fn due_parts(
    handlers: &BoardHandlers<HttpTaskApi>,
    preset: Option<DuePreset>,
    date: Option<String>,
    time: Option<String>,
    current: LocalParts,
) -> LocalParts {
    if let Some(preset) = preset {
        return preset.apply(local_now(handlers.offset()));
    }
    match (date, time) {
        (None, None) => current,
        (date, time) => LocalParts::new(
            date.unwrap_or(current.date),
            time.unwrap_or(current.time),
        ),
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}
