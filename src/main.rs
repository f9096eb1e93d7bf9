//! match3: plays a level headlessly by following hints and prints how it went.

use anyhow::{Context, Result};
use clap::Parser;
use match3::{BoardEvent, GameConfig, GameState, Grid, Outcome};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = game_config(&args);
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut game = match &args.board {
        Some(path) => {
            let grid = load_board(path)?;
            GameState::with_grid(config, grid, seed)
        }
        None => GameState::new(config, seed),
    }
    .context("invalid game configuration")?;

    info!(seed, "autoplay");
    let turn = Duration::from_millis(args.turn_ms);
    let mut turns = 0;
    let mut stuck = false;
    while game.outcome().is_none() && turns < args.turns {
        game.tick(turn);
        if game.is_busy() {
            continue;
        }
        if game.outcome().is_some() {
            break;
        }
        let Some(hint) = game.find_hints().into_iter().next() else {
            stuck = true;
            break;
        };
        let (a, b) = hint.swap;
        game.swap(a, b).with_context(|| format!("swap {a} <-> {b}"))?;
        turns += 1;
        if args.show_board {
            game.settle();
            println!("turn {turns}: {a} <-> {b}\n{}", game.grid());
        }
    }
    game.settle();

    let events = game.drain_events();
    let explosions = events
        .iter()
        .filter(|e| matches!(e, BoardEvent::Explosion { .. }))
        .count();
    println!("seed:       {seed}");
    println!("level:      {}", game.level());
    println!("turns:      {turns}");
    println!("score:      {} / {}", game.score(), game.goal());
    println!("moves left: {}", game.moves_left());
    println!("explosions: {explosions}");
    match game.outcome() {
        Some(Outcome::Won) => println!("result:     won"),
        Some(Outcome::Lost) => println!("result:     lost"),
        None if stuck => println!("result:     no moves left on the board"),
        None => println!("result:     stopped after {turns} turns"),
    }
    Ok(())
}

fn game_config(args: &Args) -> GameConfig {
    let defaults = GameConfig::default();
    GameConfig {
        width: args.width,
        height: args.height,
        symbol_count: args.symbols,
        level: args.level,
        base_moves: args.moves.unwrap_or(defaults.base_moves),
        start_goal: args.goal.unwrap_or(defaults.start_goal),
        points_per_cell: args.points,
        refill_special_chance: args.special_chance,
        step_delay: Duration::from_millis(args.step_delay_ms),
        ..defaults
    }
}

/// Reads a text layout (top row first, `.` for empty, `;` comments).
fn load_board(path: &Path) -> Result<Grid> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading board {}", path.display()))?;
    Grid::parse(&text).with_context(|| format!("parsing board {}", path.display()))
}

/// Headless match-3: generates (or loads) a board and plays it by following hints.
#[derive(Debug, Parser)]
#[command(
    name = "match3",
    version,
    about = "Engine-neutral match-3 core. Plays one level by always taking the first hint.",
    long_about = "Generates a match-3 level (or loads one with --board) and plays it headlessly, \
        always taking the first available hint, then prints the score and outcome.\n\n\
        BOARD FILES: one line per row, top row first. Plain symbols A..Z, specials \
        * (area bomb), + (cross bomb), @ (clock), x (double score), # (snowflake), \
        . for empty. Lines starting with ; are comments.\n\n\
        Set RUST_LOG=debug to trace every cascade step on stderr."
)]
pub struct Args {
    /// Board width in columns (ignored with --board).
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub width: usize,

    /// Board height in rows (ignored with --board).
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub height: usize,

    /// Number of distinct plain symbols (3..=26).
    #[arg(short, long, default_value = "5", value_name = "N")]
    pub symbols: u8,

    /// Level: the goal grows and the move budget shrinks with it.
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: u32,

    /// Base move budget before the per-level penalty. Default 35.
    #[arg(long, value_name = "N")]
    pub moves: Option<u32>,

    /// Level-1 score goal; 0 disables winning. Default 1000.
    #[arg(long, value_name = "POINTS")]
    pub goal: Option<u32>,

    /// Points per refilled cell.
    #[arg(long, default_value = "10", value_name = "POINTS")]
    pub points: u32,

    /// Chance (0..=1) that a refilled cell holds a special tile.
    #[arg(long, default_value = "0.05", value_name = "P")]
    pub special_chance: f64,

    /// Delay between cascade steps, in game-clock ms.
    #[arg(long, default_value = "200", value_name = "MS")]
    pub step_delay_ms: u64,

    /// Game-clock ms that pass per autoplay tick.
    #[arg(long, default_value = "250", value_name = "MS")]
    pub turn_ms: u64,

    /// RNG seed; random if not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Board layout file to play instead of a generated board.
    #[arg(short, long, value_name = "FILE")]
    pub board: Option<PathBuf>,

    /// Stop after this many swaps.
    #[arg(long, default_value = "200", value_name = "N")]
    pub turns: u32,

    /// Print the board after every swap.
    #[arg(long)]
    pub show_board: bool,
}
