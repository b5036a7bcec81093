use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use recall_core::time::parse_deadline;
use recall_core::{
    JsonFileStore, NewTask, RetrainOutcome, Session, Task, estimation_summary, minutes_by_subject,
    tasks_due_per_day,
};
use tracing_subscriber::EnvFilter;

mod config;
mod outbox;
mod state;

use outbox::OutboxSink;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RECALL_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "recall", version = VERSION, about = "Adaptive study planner")]
struct Cli {
    /// Debug logging (overrides RECALL_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a study task
    Add {
        subject: String,

        /// RFC 3339, or "YYYY-MM-DD HH:MM" in the configured timezone
        #[arg(long)]
        deadline: String,

        /// Estimated study time
        #[arg(long, default_value_t = 30.0)]
        minutes: f64,

        /// 1 (easy) to 5 (hard)
        #[arg(long, default_value_t = 3)]
        difficulty: i32,

        /// Schedule spaced-repetition reviews for this task
        #[arg(long, default_value_t = false)]
        review: bool,
    },

    /// List tasks in store order
    List,

    /// Ranked study plan
    Plan {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Record a finished study session
    Done {
        id: String,

        /// Actual minutes spent
        #[arg(long)]
        minutes: f64,
    },

    /// Grade a review (0-5)
    Review {
        id: String,

        #[arg(long)]
        quality: i32,

        /// Also record study time
        #[arg(long)]
        minutes: Option<f64>,
    },

    /// Move a deadline
    Move {
        id: String,

        #[arg(long)]
        deadline: String,
    },

    /// Delete a task
    Delete { id: String },

    /// Study analytics
    Stats,

    /// Show queued reminders
    Reminders {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write default ~/.recall/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("recall=debug,recall_core=debug")
    } else {
        EnvFilter::try_from_env("RECALL_LOG")
            .unwrap_or_else(|_| EnvFilter::new("recall=info,recall_core=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.command {
        Command::Config { command } => {
            match command {
                ConfigCommand::Init => config::init_config()?,
            }
            return Ok(());
        }
        other => other,
    };

    let cfg = config::load_config()?;
    let outbox = OutboxSink::new(state::outbox_path()?);
    let store = JsonFileStore::new(state::tasks_path()?);
    let mut session = Session::open(store, outbox, cfg)?;
    let tz = session.timezone();
    let now = Utc::now();

    match command {
        Command::Add {
            subject,
            deadline,
            minutes,
            difficulty,
            review,
        } => {
            let task = session.add_task(
                NewTask {
                    subject,
                    duration_minutes: minutes,
                    deadline: parse_deadline(&deadline, tz)?,
                    difficulty,
                    is_review_task: review,
                },
                now,
            )?;
            println!("Added {}", task.id);
            print_task(&task, tz);
        }

        Command::List => {
            if session.tasks().is_empty() {
                println!("No tasks. Add one with: recall add <subject> --deadline <when>");
            }
            for t in session.tasks() {
                print_task(t, tz);
            }
        }

        Command::Plan { limit } => {
            report_retrain(&session.warm_model(now).await);
            let plan = session.plan(now).await;
            if plan.is_empty() {
                println!("Nothing to plan.");
            }
            for (i, p) in plan.iter().take(limit).enumerate() {
                let marker = if p.review_due { " [review due]" } else { "" };
                println!(
                    "{}. {:.3} {} ({}) due {}{}",
                    i + 1,
                    p.score,
                    p.task.subject,
                    p.task.id,
                    p.task.deadline.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
                    marker
                );
            }
        }

        Command::Done { id, minutes } => {
            let (task, outcome) = session.complete_task(&id, minutes, now).await?;
            report_retrain(&outcome);
            println!(
                "Recorded {:.0} min on {} ({} sessions)",
                minutes,
                task.subject,
                task.history.len()
            );
        }

        Command::Review {
            id,
            quality,
            minutes,
        } => {
            let out = session.review_task(&id, quality, minutes, now).await?;
            if let Some(outcome) = &out.retrain {
                report_retrain(outcome);
            }
            let rs = &out.task.review_state;
            match rs.next_review_at {
                Some(at) => println!(
                    "Next review of {} in {} day(s): {} (ef {:.2})",
                    out.task.subject,
                    rs.interval_days,
                    at.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
                    rs.easiness_factor
                ),
                None => println!("Review recorded for {}", out.task.subject),
            }
        }

        Command::Move { id, deadline } => {
            let task = session.move_deadline(&id, parse_deadline(&deadline, tz)?, now)?;
            println!(
                "Moved {} to {}",
                task.id,
                task.deadline.with_timezone(&tz).format("%Y-%m-%d %H:%M")
            );
        }

        Command::Delete { id } => {
            session.delete_task(&id)?;
            println!("Deleted {id}");
        }

        Command::Stats => {
            let tasks = session.tasks();
            println!("## Minutes by subject\n");
            for (subject, minutes) in minutes_by_subject(tasks) {
                println!("- {subject}: {minutes:.0}");
            }
            println!("\n## Tasks due per day\n");
            for (day, count) in tasks_due_per_day(tasks, tz) {
                println!("- {day}: {count}");
            }
            let est = estimation_summary(tasks);
            println!("\n## Estimates\n");
            println!(
                "- {} sessions across {} tasks, actual/estimated = {:.2}",
                est.completions, est.tasks_completed, est.mean_ratio
            );
        }

        Command::Reminders { limit } => {
            outbox::print_outbox(session.notifier(), now, tz, limit)?;
        }

        Command::Config { .. } => {}
    }

    Ok(())
}

fn print_task(t: &Task, tz: chrono_tz::Tz) {
    let review = if t.review_state.is_review_task {
        match t.review_state.next_review_at {
            Some(at) => format!(" review {}", at.with_timezone(&tz).format("%Y-%m-%d")),
            None => " review".to_string(),
        }
    } else {
        String::new()
    };
    println!(
        "{}  {} | {:.0} min | d{} | due {}{}",
        t.id,
        t.subject,
        t.duration_estimate_minutes,
        t.difficulty,
        t.deadline.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
        review
    );
}

fn report_retrain(outcome: &RetrainOutcome) {
    match outcome {
        RetrainOutcome::Refit { summary, initialized } => tracing::debug!(
            examples = summary.examples,
            loss = ?summary.loss,
            initialized,
            "model updated"
        ),
        RetrainOutcome::Superseded => tracing::debug!("refit superseded"),
        RetrainOutcome::Failed(err) => tracing::warn!(error = %err, "model not updated"),
    }
}
