//! Battle Dice terminal page
//!
//! Interactive terminal front end: choose a collection, roll it, reroll
//! single dice while others are still in the air, or play a two-player
//! match.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinHandle, LocalSet};
use tracing::{debug, error, info};

use battledice::dicebox::{
    Action, AppConfig, CollectionKey, Control, Frame, Notice, Presenter,
    RollEngineAdapter, Screen, SimulatedEngine, ViewController,
};
use battledice::logging::{init_logging, LogConfig};

/// Battle Dice - roll a dice collection, reroll single dice
#[derive(Parser)]
#[command(name = "battledice")]
#[command(author, version, about = "Battle Dice - roll a dice collection in the terminal")]
struct Cli {
    /// RON config file (engine setup, palette, seed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// How long a throw takes to settle, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Rerolls allowed per throw outside a match
    #[arg(long)]
    budget: Option<u32>,

    /// Write the game log of a finished match to this file
    #[arg(long)]
    match_log: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// One typed command on the page.
#[derive(Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct PageLine {
    #[command(subcommand)]
    command: PageCommand,
}

#[derive(Subcommand)]
enum PageCommand {
    /// Choose Collection A (d4, d8, d12)
    A,
    /// Choose Collection B (d6, d10, d20)
    B,
    /// Roll the whole collection
    #[command(visible_alias = "r")]
    Roll,
    /// Reroll the whole collection
    RerollAll,
    /// Reroll one die by its position (1-based)
    #[command(visible_alias = "rr")]
    Reroll {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
    /// Start a two-player match on a collection
    Match { collection: CollectionKey },
    /// End your match turn on the dice as they lie
    #[command(visible_alias = "s")]
    Stand,
    /// Back to collection select
    Back,
    /// Print the roll history as JSON
    History,
    /// Print the match score and game log as JSON
    Score,
    /// Leave the page
    #[command(visible_alias = "q")]
    Quit,
}

type Page = ViewController<SimulatedEngine, TerminalPresenter>;

struct TerminalPresenter;

impl TerminalPresenter {
    fn control(label: &str, key: &str, enabled: bool) -> String {
        let text = format!("[{key}] {label}");
        if enabled {
            text.cyan().to_string()
        } else {
            text.dimmed().to_string()
        }
    }
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, frame: &Frame) {
        match frame.screen {
            Screen::CollectionSelect => {
                println!();
                println!("{}", "Choose a Dice Collection".bold());
                for key in CollectionKey::ALL {
                    let dice: Vec<String> = key.notations().iter().map(ToString::to_string).collect();
                    println!(
                        "  {} {}",
                        format!("[{}]", key.to_string().to_lowercase()).cyan(),
                        format!("{} ({})", key.label(), dice.join(", "))
                    );
                }
            }
            Screen::Starting(key) => {
                println!("{}", format!("Starting dice engine for {}...", key.label()).yellow());
            }
            Screen::CollectionActive(key) => {
                println!();
                println!("{}", key.label().bold());
                if frame.rolling {
                    println!("{}", "Rolling...".yellow());
                } else if let Some(line) = &frame.results_line {
                    println!("{}", line.green().bold());
                }
                if let Some(turn) = frame.turn {
                    println!(
                        "{}",
                        format!("Round {}: {}'s turn", turn.round, turn.player).magenta().bold()
                    );
                }
                if let Some(target) = frame.target {
                    let mut line = format!("Target: {target}");
                    if let Some(left) = frame.rerolls_left {
                        line.push_str(&format!("   Rerolls left: {left}"));
                    }
                    println!("{line}");
                }
                if frame.bust {
                    println!("{}", "Bust!".red().bold());
                }
                for control in &frame.reroll_controls {
                    println!(
                        "  {}",
                        Self::control(
                            &control.label,
                            &format!("reroll {}", control.index + 1),
                            control.enabled
                        )
                    );
                }
                if frame.turn.is_some() {
                    println!(
                        "  {}  {}",
                        Self::control("Stand", "stand", frame.is_enabled(Control::Stand)),
                        Self::control("Back to Collection Select", "back", frame.is_enabled(Control::Back)),
                    );
                } else {
                    println!(
                        "  {}  {}  {}",
                        Self::control("Roll Dice", "roll", frame.is_enabled(Control::RollAll)),
                        Self::control("Reroll", "reroll-all", frame.is_enabled(Control::RerollAll)),
                        Self::control("Back to Collection Select", "back", frame.is_enabled(Control::Back)),
                    );
                }
                if let Some(score) = frame.score {
                    println!("  Score: Player 1 {}  Player 2 {}", score.one, score.two);
                }
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        match notice {
            Notice::Status(message) => println!("{}", message.bright_blue()),
            Notice::Error(message) => eprintln!("{} {}", "Error:".red().bold(), message),
        }
    }
}

fn action_for(command: &PageCommand) -> Option<Action> {
    match command {
        PageCommand::A => Some(Action::Choose(CollectionKey::A)),
        PageCommand::B => Some(Action::Choose(CollectionKey::B)),
        PageCommand::Roll => Some(Action::RollAll),
        PageCommand::RerollAll => Some(Action::RerollAll),
        // Positions start at 1; clap refuses 0.
        PageCommand::Reroll { position } => Some(Action::Reroll(*position as usize - 1)),
        PageCommand::Match { collection } => Some(Action::StartMatch(*collection)),
        PageCommand::Stand => Some(Action::Stand),
        PageCommand::Back => Some(Action::Back),
        PageCommand::History | PageCommand::Score | PageCommand::Quit => None,
    }
}

fn save_match_log(page: &Page, path: &Path) {
    let game = page.game();
    let Some(game) = game.as_ref().filter(|g| g.is_finished()) else {
        return;
    };
    let written = game
        .to_json()
        .map_err(std::io::Error::from)
        .and_then(|json| std::fs::write(path, json));
    match written {
        Ok(()) => {
            info!(path = %path.display(), "match log written");
            println!("Game log saved to {}", path.display());
        }
        Err(e) => eprintln!(
            "{} could not write {}: {}",
            "Error:".red().bold(),
            path.display(),
            e
        ),
    }
}

/// Run one action as its own task so a panic in it is reported, not fatal.
fn spawn_action(page: &Rc<Page>, action: Action, match_log: Option<PathBuf>) -> JoinHandle<()> {
    let task = {
        let page = Rc::clone(page);
        tokio::task::spawn_local(async move { page.dispatch(action).await })
    };
    let page = Rc::clone(page);
    tokio::task::spawn_local(async move {
        match task.await {
            Ok(Ok(())) => {
                if let (Action::Stand, Some(path)) = (action, match_log) {
                    save_match_log(&page, &path);
                }
            }
            // Already shown to the user by the controller.
            Ok(Err(err)) => debug!(?action, error = %err, "action finished with error"),
            Err(join_err) if join_err.is_panic() => {
                error!(?action, "action panicked");
                eprintln!(
                    "{} {:?} stopped unexpectedly; the page is still running",
                    "Diagnostic:".red().bold(),
                    action
                );
            }
            Err(join_err) => debug!(?action, error = %join_err, "action cancelled"),
        }
    })
}

async fn run_page(page: Rc<Page>, match_log: Option<PathBuf>) {
    page.render();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("{} failed to read input: {}", "Error:".red().bold(), e);
                break;
            }
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match PageLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                println!("{}", e.render());
                continue;
            }
        };

        match command {
            PageCommand::Quit => break,
            PageCommand::History => match page.history().to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
            },
            PageCommand::Score => match page.game().as_ref().map(|g| g.to_json()) {
                Some(Ok(json)) => println!("{json}"),
                Some(Err(e)) => eprintln!("{} {}", "Error:".red().bold(), e),
                None => println!("No match is being played. Start one with `match a`."),
            },
            other => {
                if let Some(action) = action_for(&other) {
                    in_flight.retain(|h| !h.is_finished());
                    in_flight.push(spawn_action(&page, action, match_log.clone()));
                }
            }
        }
    }

    // Let throws in the air land before leaving.
    for handle in in_flight {
        let _ = handle.await;
    }
}

fn install_panic_diagnostics() {
    std::panic::set_hook(Box::new(|info| {
        error!(panic = %info, "unhandled fault");
        eprintln!("{} {}", "Diagnostic:".red().bold(), info);
    }));
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    let log_config = LogConfig {
        with_ansi: !cli.no_color,
        ..LogConfig::from_verbosity(cli.verbose)
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("{} could not start logging: {}", "Warning:".yellow(), e);
    }
    install_panic_diagnostics();

    let mut config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(settle_ms) = cli.settle_ms {
        config.engine.settle_ms = settle_ms;
    }

    let adapter = match RollEngineAdapter::simulated(&config) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let page = Rc::new(ViewController::new(adapter, TerminalPresenter).with_reroll_budget(cli.budget));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let local = LocalSet::new();
    local.block_on(&runtime, run_page(page, cli.match_log));
}
