use std::fmt;
use std::path::PathBuf;

use exam_core::model::{ExamId, ParseIdError};
use services::{AppServices, Clock, ExamQuery, ExamSort, format_duration};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { command: Command, flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidSort(services::UnknownSort),
    InvalidExamId(ParseIdError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => {
                write!(f, "{command} requires {flag}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidSort(err) => write!(f, "invalid --sort value: {err}"),
            ArgsError::InvalidExamId(err) => write!(f, "invalid --exam value: {err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or(ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- list     [--search <text>] [--sort <key>]");
    eprintln!("  cargo run -p app -- import   --file <json> --name <name> --subject <subject> [--time-limit <minutes>]");
    eprintln!("  cargo run -p app -- attempts [--exam <id>] [--limit <n>]");
    eprintln!("  cargo run -p app -- stats");
    eprintln!("  cargo run -p app -- seed");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://exams.sqlite3)");
    eprintln!();
    eprintln!("Sort keys: recent, oldest, name-asc, name-desc, attempts, score");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Import,
    Attempts,
    Stats,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "import" => Some(Self::Import),
            "attempts" => Some(Self::Attempts),
            "stats" => Some(Self::Stats),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::List => "list",
            Command::Import => "import",
            Command::Attempts => "attempts",
            Command::Stats => "stats",
            Command::Seed => "seed",
        };
        f.write_str(name)
    }
}

struct Args {
    db_url: String,
    file: Option<PathBuf>,
    name: Option<String>,
    subject: Option<String>,
    time_limit_minutes: u32,
    query: ExamQuery,
    exam: Option<ExamId>,
    limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("EXAM_DB_URL")
                .ok()
                .map_or_else(|| normalize_sqlite_url("exams.sqlite3".into()), normalize_sqlite_url),
            file: None,
            name: None,
            subject: None,
            time_limit_minutes: 30,
            query: ExamQuery::default(),
            exam: None,
            limit: 10,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--file" => parsed.file = Some(require_value(args, "--file")?.into()),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--subject" => parsed.subject = Some(require_value(args, "--subject")?),
                "--time-limit" => {
                    let value = require_value(args, "--time-limit")?;
                    parsed.time_limit_minutes = parse_number("--time-limit", value)?;
                }
                "--search" => parsed.query.search = Some(require_value(args, "--search")?),
                "--sort" => {
                    let value = require_value(args, "--sort")?;
                    parsed.query.sort = value.parse::<ExamSort>().map_err(ArgsError::InvalidSort)?;
                }
                "--exam" => {
                    let value = require_value(args, "--exam")?;
                    parsed.exam = Some(value.parse().map_err(ArgsError::InvalidExamId)?);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    parsed.limit = parse_number("--limit", value)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("app=info".parse()?)
        .add_directive("services=info".parse()?)
        .add_directive("storage=info".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

const SAMPLE_QUESTIONS: &str = r#"[
    {"question":"Which budget is usually prepared first?","option_1":"Cash budget","option_2":"Sales budget","option_3":"Capital budget","option_4":"Labour budget","correct_answer":"Sales budget"},
    {"question":"A budget that adjusts to the actual level of activity is a","option_1":"Static budget","option_2":"Master budget","option_3":"Flexible budget","option_4":"Zero-based budget","correct_answer":"Flexible budget"},
    {"question":"Which forecasting method weights recent data most heavily?","option_1":"Exponential smoothing","option_2":"Simple average","option_3":"Delphi method","option_4":"Scenario planning","correct_answer":"Exponential smoothing","question_year":"2023"},
    {"question":"Variance analysis compares","option_1":"Two budgets","option_2":"Actual and budgeted results","option_3":"Assets and liabilities","option_4":"Revenue and tax","correct_answer":"Actual and budgeted results"}
]"#;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::List,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing()?;
    tracing::debug!(command = %cmd, db_url = %parsed.db_url, "starting");

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;
    let catalog = app.catalog();

    match cmd {
        Command::List => {
            let exams = catalog.list_exams(&parsed.query).await?;
            if exams.is_empty() {
                println!("no exams");
            }
            for exam in exams {
                let stats = exam.stats();
                println!(
                    "{:>4}  {:<40} {:<16} {:>3} q  {:>3} min  attempts {:>3}  best {:>3}%  avg {:>3}%{}",
                    exam.id().value(),
                    exam.name(),
                    exam.subject(),
                    exam.question_count(),
                    exam.time_limit_minutes(),
                    stats.total_attempts,
                    stats.best_score,
                    stats.avg_score,
                    if exam.is_bookmarked() { "  *" } else { "" },
                );
            }
        }
        Command::Import => {
            let file = parsed.file.ok_or(ArgsError::MissingFlag {
                command: cmd,
                flag: "--file",
            })?;
            let name = parsed.name.ok_or(ArgsError::MissingFlag {
                command: cmd,
                flag: "--name",
            })?;
            let subject = parsed.subject.ok_or(ArgsError::MissingFlag {
                command: cmd,
                flag: "--subject",
            })?;
            let json = std::fs::read_to_string(&file)?;
            let exam = catalog
                .import_exam(name, subject, parsed.time_limit_minutes, &json)
                .await?;
            println!(
                "Imported exam {} ({} questions) from {}",
                exam.id(),
                exam.question_count(),
                file.display()
            );
        }
        Command::Attempts => {
            let rows = match parsed.exam {
                Some(exam_id) => {
                    let exam = catalog.require_exam(exam_id).await?;
                    println!("{} ({})", exam.name(), exam.subject());
                    let mut rows = catalog.attempts_for_exam(exam_id).await?;
                    rows.truncate(usize::try_from(parsed.limit).unwrap_or(usize::MAX));
                    rows
                }
                None => catalog.recent_attempts(parsed.limit).await?,
            };
            if rows.is_empty() {
                println!("no attempts");
            }
            for row in rows {
                let attempt = &row.attempt;
                println!(
                    "{:>4}  exam {:>4}  {}  {:>3}%  {}/{} answered  {}",
                    row.id.value(),
                    attempt.exam_id().value(),
                    attempt.date().format("%Y-%m-%d %H:%M"),
                    attempt.score(),
                    attempt.answered_questions(),
                    attempt.total_questions(),
                    format_duration(attempt.time_spent_secs()),
                );
            }
        }
        Command::Stats => {
            let stats = catalog.dashboard_stats().await?;
            println!("exams:     {}", stats.total_exams);
            println!("attempts:  {}", stats.total_attempts);
            println!("average:   {}%", stats.avg_score);
            println!("bookmarks: {}", stats.total_bookmarks);
        }
        Command::Seed => {
            let exam = catalog
                .import_exam(
                    parsed
                        .name
                        .unwrap_or_else(|| "Business Budgeting and Forecasting Exam".into()),
                    parsed.subject.unwrap_or_else(|| "Finance".into()),
                    parsed.time_limit_minutes,
                    SAMPLE_QUESTIONS,
                )
                .await?;
            println!(
                "Seeded exam {} ({} questions) into {}",
                exam.id(),
                exam.question_count(),
                parsed.db_url
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
