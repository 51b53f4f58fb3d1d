use std::fmt;

use chrono::{DateTime, Duration, Utc};
use exam_core::model::{Exam, ExamAttempt, ExamId, ExamStats, Question, QuestionId, SubmittedAnswer};
use storage::repository::{NewExamRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    exam_name: String,
    attempts: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAttempts { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAttempts { raw } => write!(f, "invalid --attempts value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("EXAM_DB_URL").unwrap_or_else(|_| "sqlite:exams.sqlite3".into());
        let mut exam_name = std::env::var("EXAM_SEED_NAME")
            .unwrap_or_else(|_| "Business Budgeting and Forecasting Exam".into());
        let mut attempts = std::env::var("EXAM_SEED_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--name" => {
                    exam_name = require_value(&mut args, "--name")?;
                }
                "--attempts" => {
                    let value = require_value(&mut args, "--attempts")?;
                    attempts = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidAttempts { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            exam_name,
            attempts,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:exams.sqlite3)");
    eprintln!("  --name <name>             Exam name (default: Business Budgeting and Forecasting Exam)");
    eprintln!("  --attempts <n>            Number of sample attempts to append (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  EXAM_DB_URL, EXAM_SEED_NAME, EXAM_SEED_ATTEMPTS");
}

const SAMPLES: [(&str, [&str; 4], &str, &str); 4] = [
    (
        "Which budget is prepared first in the master budget?",
        ["Sales budget", "Cash budget", "Production budget", "Capital budget"],
        "Sales budget",
        "Budgeting",
    ),
    (
        "A budget that adjusts to actual activity levels is a",
        ["Static budget", "Flexible budget", "Zero-based budget", "Master budget"],
        "Flexible budget",
        "Budgeting",
    ),
    (
        "Which method weights recent observations most heavily?",
        ["Simple average", "Exponential smoothing", "Delphi method", "Judgmental"],
        "Exponential smoothing",
        "Forecasting",
    ),
    (
        "A rolling forecast is updated",
        ["Once a year", "Never", "Periodically as periods elapse", "Only on audit"],
        "Periodically as periods elapse",
        "Forecasting",
    ),
];

fn sample_questions() -> Result<Vec<Question>, exam_core::Error> {
    let mut questions = Vec::with_capacity(SAMPLES.len());
    for (i, (text, options, correct, category)) in SAMPLES.iter().enumerate() {
        questions.push(Question::new(
            QuestionId::new(format!("seed-q{}", i + 1)),
            *text,
            options.iter().map(|o| (*o).to_string()).collect(),
            *correct,
            *category,
            Some("2024".to_string()),
        )?);
    }
    Ok(questions)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let draft = Exam::new(
        ExamId::new(0),
        args.exam_name.clone(),
        "Finance",
        30,
        sample_questions()?,
        now,
    )?;
    let exam_id = storage
        .exams
        .insert_new_exam(NewExamRecord::from_exam(&draft))
        .await?;

    let mut scores = Vec::with_capacity(args.attempts as usize);
    for i in 0..args.attempts {
        let correct = (i % 4) + 1;
        let score = correct * 25;
        let answers = draft
            .questions()
            .iter()
            .enumerate()
            .map(|(idx, q)| SubmittedAnswer {
                question_id: q.id().clone(),
                answer: (idx < correct as usize).then(|| q.correct_answer().to_string()),
            })
            .collect();
        let date = now - Duration::days(i64::from(args.attempts - i));
        let attempt =
            ExamAttempt::from_persisted(exam_id, date, score, 240.0, correct, 4, answers)?;
        storage.attempts.append_attempt(&attempt).await?;
        scores.push(score);
    }

    if let Some(mut exam) = storage.exams.get_exam(exam_id).await? {
        exam.set_stats(ExamStats::from_scores(&scores));
        storage.exams.upsert_exam(&exam).await?;
    }

    println!(
        "Seeded exam {} with {} questions and {} attempts into {}",
        exam_id.value(),
        draft.question_count(),
        args.attempts,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
