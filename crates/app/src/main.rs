use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::engine::{GameError, QuizGame};
use quiz_core::model::{Category, Mode};
use services::{BankIngest, Clock, GameFlow, GameOutcome, ScoreLedger};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

struct Args {
    db_url: String,
    data_dir: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--data-dir <dir>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --data-dir data   (question bank files named CSC_111.tsv etc.)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_DATA_DIR");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut data_dir = std::env::var("QUIZ_DATA_DIR").ok().map(PathBuf::from);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--data-dir" => {
                    let value = require_value(args, "--data-dir")?;
                    data_dir = Some(PathBuf::from(value));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, data_dir })
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
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

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        // EOF behaves like an empty answer so piped input terminates cleanly.
        return Ok(String::new());
    }
    Ok(line.trim().to_string())
}

fn choose_mode() -> io::Result<Mode> {
    loop {
        println!("Select a mode:");
        for (i, mode) in Mode::ALL.iter().enumerate() {
            println!("  {}) {mode}", i + 1);
        }
        let answer = prompt("> ")?;
        match answer
            .parse::<usize>()
            .ok()
            .and_then(|n| Mode::ALL.get(n.checked_sub(1)?))
        {
            Some(mode) => return Ok(*mode),
            None => println!("Please enter a number between 1 and {}.", Mode::ALL.len()),
        }
    }
}

fn choose_category() -> io::Result<Category> {
    loop {
        println!("Select a category:");
        for (i, category) in Category::ALL.iter().enumerate() {
            println!("  {}) {category}", i + 1);
        }
        let answer = prompt("> ")?;
        match answer
            .parse::<usize>()
            .ok()
            .and_then(|n| Category::ALL.get(n.checked_sub(1)?))
        {
            Some(category) => return Ok(*category),
            None => println!(
                "Please enter a number between 1 and {}.",
                Category::ALL.len()
            ),
        }
    }
}

fn show_status(game: &QuizGame) {
    match game.mode() {
        Mode::Classic => println!(
            "\nRound {} of 10 | score {:.0} | {} attempt(s) left",
            game.round(),
            game.score(),
            game.remaining_attempts()
        ),
        Mode::Timed => println!(
            "\nRound {} of 10 | score {:.0} | {}s remaining",
            game.round(),
            game.score(),
            game.remaining_time().num_seconds()
        ),
    }
}

/// Runs the per-round prompt loop. Returns false if the player quit
/// mid-game, in which case nothing is recorded.
fn play_rounds(game: &mut QuizGame) -> io::Result<bool> {
    println!("Type your answer, or 'quit' to abandon the game.");

    while !game.is_finished() {
        show_status(game);
        let Some(question) = game.current_question() else {
            break;
        };
        println!("{}", question.prompt());

        let guess = prompt("> ")?;
        if guess.eq_ignore_ascii_case("quit") {
            let confirm = prompt("Abandon this game? The score will not be saved. [y/N] ")?;
            if confirm.eq_ignore_ascii_case("y") {
                return Ok(false);
            }
            continue;
        }

        match game.guess(&guess) {
            // Timed mode gives no per-guess feedback; the answer sheet
            // comes out only with the final score.
            Ok(_) if game.mode() == Mode::Timed => {}
            Ok(true) => println!("Correct!"),
            Ok(false) if !game.is_finished() => {
                println!("Wrong. {} attempt(s) left.", game.remaining_attempts());
            }
            Ok(false) => println!("Wrong."),
            Err(err @ (GameError::EmptyGuess | GameError::GuessTooLong { .. })) => {
                println!("{err}");
            }
            Err(err) => {
                println!("{err}");
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn report_outcome(outcome: &GameOutcome) {
    println!();
    if outcome.won {
        println!("You won! Final score: {:.0}", outcome.score);
    } else {
        println!("Game over. Final score: {:.0}", outcome.score);
    }
    if outcome.new_high_score {
        println!("New personal best!");
    }
    if let Some(err) = &outcome.save_error {
        println!("Your score could not be saved: {err}");
    }
}

async fn play(flow: &GameFlow) -> Result<(), Box<dyn std::error::Error>> {
    let name = prompt("Player name (leave blank to play anonymously): ")?;
    let mode = choose_mode()?;
    let category = choose_category()?;

    let mut game = match flow.start_game(mode, category).await {
        Ok(game) => game,
        Err(err) => {
            println!("Cannot start a game: {err}");
            return Ok(());
        }
    };

    if !play_rounds(&mut game)? {
        println!("Game abandoned.");
        return Ok(());
    }

    let name = (!name.is_empty()).then_some(name.as_str());
    let outcome = flow.finish_game(&game, name).await;
    report_outcome(&outcome);
    Ok(())
}

async fn show_high_scores(ledger: &ScoreLedger) -> Result<(), Box<dyn std::error::Error>> {
    let mode = choose_mode()?;
    let category = choose_category()?;

    let board = ledger.leaderboard(category, mode, 10).await?;
    if board.is_empty() {
        println!("\nNo scores recorded yet for {category} ({mode}).");
        return Ok(());
    }

    println!("\nTop scores for {category} ({mode}):");
    for (position, entry) in board.iter().enumerate() {
        println!(
            "  {:>2}. {:<20} {:>5.0}",
            position + 1,
            entry.player_name,
            entry.score
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let parsed = Args::parse(&mut args).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let data_dir = parsed.data_dir.unwrap_or_else(|| PathBuf::from("data"));
    if data_dir.is_dir() {
        let ingest = BankIngest::new(storage.questions.clone());
        let inserted = ingest.load_dir(&data_dir).await?;
        if inserted > 0 {
            println!("Loaded {inserted} new question(s) from {}.", data_dir.display());
        }
    }

    let clock = Clock::default_clock();
    let ledger = ScoreLedger::new(clock, storage.players.clone(), storage.scores.clone());
    let flow = GameFlow::new(clock, Arc::clone(&storage.questions), ledger);

    println!("Quiz");
    loop {
        println!("\n  1) Play");
        println!("  2) High scores");
        println!("  3) Quit");
        let choice = prompt("> ")?;
        match choice.as_str() {
            "1" => play(&flow).await?,
            "2" => show_high_scores(flow.ledger()).await?,
            "3" | "q" | "quit" | "" => break,
            other => println!("Unknown option: {other}"),
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
