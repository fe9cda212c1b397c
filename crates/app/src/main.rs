use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use quiz_core::model::{
    CertificationId, QuestionId, QuizDraft, QuizId, SubmittedAnswer, SubmittedAnswers, UserId,
};
use services::{AppServices, Clock, DEFAULT_HISTORY_LIMIT, QuizDetail};

mod config;
mod db;

use config::Config;

#[derive(Parser)]
#[command(name = "quiz", version, about = "Certification quiz evaluation and progress tracking")]
struct Cli {
    /// Database URL or path (overrides QUIZ_DB_URL)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter, e.g. "debug" or "services=trace" (overrides QUIZ_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Store a generated quiz read from a JSON file
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// Grade a quiz and record progress
    Evaluate {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        quiz: QuizId,

        /// JSON object mapping question ids to answers
        #[arg(long)]
        answers: PathBuf,
    },

    /// List a user's quizzes, newest first
    History {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        certification: Option<CertificationId>,

        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one quiz with its questions
    Show {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        quiz: QuizId,
    },

    /// Totals over a user's evaluated quizzes
    Stats {
        #[arg(long)]
        user: UserId,
    },

    /// XP, level, streak, and per-certification progress
    Dashboard {
        #[arg(long)]
        user: UserId,
    },

    /// Progress on a single certification
    Progress {
        #[arg(long)]
        user: UserId,

        #[arg(long)]
        certification: CertificationId,
    },

    /// Achievements a user holds
    Achievements {
        #[arg(long)]
        user: UserId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.database_url = db::normalize_sqlite_url(db);
    }
    if let Some(log) = cli.log {
        config.log_filter = log;
    }

    let env_filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    db::prepare_sqlite_file(&config.database_url)?;
    let app = AppServices::new_sqlite(
        &config.database_url,
        config.pool,
        Clock::system(),
        config.max_commit_attempts,
    )
    .await
    .with_context(|| format!("opening {}", config.database_url))?;
    tracing::debug!(db = %config.database_url, "storage ready");

    match cli.command {
        Commands::Migrate => {
            tracing::info!("schema is up to date");
        }
        Commands::Import { file } => {
            let draft: QuizDraft = read_json(&file)?;
            let quiz = app.quizzes().import_draft(draft).await?;
            print_json(&QuizDetail::from(&quiz))?;
        }
        Commands::Evaluate {
            user,
            quiz,
            answers,
        } => {
            let answers = load_answers(&answers)?;
            let result = app.evaluation().evaluate(user, quiz, &answers).await?;
            print_json(&result)?;
        }
        Commands::History {
            user,
            certification,
            limit,
            offset,
        } => {
            let items = app
                .quizzes()
                .history(user, certification, limit, offset)
                .await?;
            print_json(&items)?;
        }
        Commands::Show { user, quiz } => {
            let quiz = app.quizzes().quiz_detail(quiz, user).await?;
            print_json(&QuizDetail::from(&quiz))?;
        }
        Commands::Stats { user } => {
            print_json(&app.quizzes().stats(user).await?)?;
        }
        Commands::Dashboard { user } => {
            print_json(&app.progress().dashboard(user).await?)?;
        }
        Commands::Progress {
            user,
            certification,
        } => {
            let progress = app
                .progress()
                .certification_progress(user, certification)
                .await?;
            print_json(&progress)?;
        }
        Commands::Achievements { user } => {
            print_json(&app.progress().achievements(user).await?)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Answers file: `{"<question id>": answer}`. A `null` answer counts as
/// not submitted.
fn load_answers(path: &Path) -> anyhow::Result<SubmittedAnswers> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_answers(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn parse_answers(raw: &str) -> serde_json::Result<SubmittedAnswers> {
    let answers: HashMap<QuestionId, Option<SubmittedAnswer>> = serde_json::from_str(raw)?;
    Ok(answers
        .into_iter()
        .filter_map(|(id, answer)| answer.map(|a| (id, a)))
        .collect())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
