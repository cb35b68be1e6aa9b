//! Battle Dice CLI
//!
//! Rolls a collection once, applies the requested rerolls and prints the
//! final results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use battledice::dicebox::{
    AppConfig, CollectionKey, DiceBoxError, DieSummary, Frame, Notice, Presenter,
    RollEngineAdapter, RollEvent, Standing, ViewController,
};
use battledice::logging::{init_logging, LogConfig};

/// Battle Dice - roll a dice collection from the command line
#[derive(Parser)]
#[command(name = "battledice-roll")]
#[command(author, version, about = "Battle Dice - roll a dice collection once")]
struct Cli {
    /// Collection to roll (A: d4 d8 d12, B: d6 d10 d20)
    collection: CollectionKey,

    /// Reroll the die at this position (1-based). Can be repeated.
    #[arg(
        short,
        long = "reroll",
        value_name = "POSITION",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    rerolls: Vec<u32>,

    /// Refuse rerolls beyond this many
    #[arg(long)]
    budget: Option<u32>,

    /// Roll the whole collection once more after the rerolls
    #[arg(long)]
    reroll_all: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// RON config file (engine setup, palette, seed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Keeps the last frame and any error notices for the final report.
#[derive(Default)]
struct ReportPresenter {
    last_frame: Option<Frame>,
    errors: Vec<String>,
}

impl Presenter for ReportPresenter {
    fn render(&mut self, frame: &Frame) {
        self.last_frame = Some(frame.clone());
    }

    fn notify(&mut self, notice: &Notice) {
        if let Notice::Error(message) = notice {
            self.errors.push(message.clone());
        }
    }
}

#[derive(Serialize)]
struct RollReport<'a> {
    collection: CollectionKey,
    dice: Vec<DieSummary>,
    total: u32,
    target: u32,
    bust: bool,
    /// The total, or -1 for a bust.
    score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rerolls_left: Option<u32>,
    errors: &'a [String],
    history: &'a [RollEvent],
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<bool, DiceBoxError> {
    let adapter = RollEngineAdapter::simulated(config)?;
    let controller =
        ViewController::new(adapter, ReportPresenter::default()).with_reroll_budget(cli.budget);

    // Roll and reroll failures are recorded and reported, not fatal.
    let mut ok = controller.choose(cli.collection).await.is_ok();
    for position in &cli.rerolls {
        // Positions start at 1; clap refuses 0.
        ok &= controller.reroll(*position as usize - 1).await.is_ok();
    }
    if cli.reroll_all {
        ok &= controller.reroll_all().await.is_ok();
    }

    let session = controller.session();
    let presenter = controller.presenter();
    let history = controller.history();
    let results = session.last_results();
    let standing = Standing::of(results, cli.collection);

    if cli.json {
        let report = RollReport {
            collection: cli.collection,
            dice: results.iter().map(DieSummary::from).collect(),
            total: results.total(),
            target: standing.target,
            bust: standing.is_bust(),
            score: standing.score(),
            rerolls_left: session.rerolls_left(),
            errors: &presenter.errors,
            history: history.events(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                return Ok(false);
            }
        }
    } else {
        println!("{}", cli.collection.label().bold());
        for (index, die) in results.iter().enumerate() {
            println!(
                "  #{} {}: {}",
                index + 1,
                format!("d{}", die.sides()).cyan(),
                die.value().to_string().bold()
            );
        }
        match presenter.last_frame.as_ref().and_then(|f| f.total) {
            Some(total) => println!(
                "{} {}  (target {})",
                "Total:".green().bold(),
                total.to_string().green().bold(),
                standing.target
            ),
            None => println!("{}", "No results".yellow()),
        }
        if !results.is_empty() && standing.is_bust() {
            println!("{}", "Bust!".red().bold());
        }
        for message in &presenter.errors {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
    }

    info!(events = history.len(), "done");
    Ok(ok)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogConfig::from_verbosity(cli.verbose)) {
        eprintln!("{} could not start logging: {}", "Warning:".yellow(), e);
    }

    let mut config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    // Nobody is watching the animation here.
    config.engine.settle_ms = 0;

    match run(&cli, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
