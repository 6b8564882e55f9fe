//! Command-line companion for Tonegrid.
//!
//! Lists games and level tables, inspects and edits saved progress, and
//! plays levels headlessly for testing balance changes.

mod autoplay;
mod store;

use anyhow::{bail, Context};
use autoplay::Autoplayer;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;
use store::JsonFileStore;
use tonegrid_core::{
    levels, GameKey, GameRng, GameSession, LevelExtra, ModeKey, ProgressLedger, ResumePoint,
    Settings, ThemeLibrary, DEFAULT_THEME,
};

#[derive(Parser)]
#[command(name = "tonegrid")]
#[command(about = "Inspect Tonegrid levels and progress, or autoplay a level")]
struct Cli {
    /// Directory holding progress.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings JSON overriding prices and timings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// More log output (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List every game and the modes it supports
    Catalog,
    /// Print the level table of a game
    Levels {
        game: String,
    },
    /// Show tokens, wins and unlocked levels
    Progress {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear wins and unlocked levels (tokens are kept)
    Reset,
    /// Collect today's reward if it has not been taken
    Reward,
    /// Allow the daily reward to be collected again
    NewDay,
    /// Play a level automatically and record the result
    Autoplay {
        game: String,
        #[arg(short, long, default_value_t = 1)]
        level: u32,
        #[arg(short, long, default_value = "classic")]
        mode: String,
        #[arg(short, long, default_value = DEFAULT_THEME)]
        theme: String,
        /// Seed for a reproducible board
        #[arg(long)]
        seed: Option<u64>,
        /// Buy hints while tokens last
        #[arg(long)]
        hints: bool,
        /// Print each event as a JSON line
        #[arg(long)]
        trace: bool,
    },
    /// Autoplay the level the player last opened
    Resume {
        /// Play with this theme instead of the saved one
        #[arg(short, long)]
        theme: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let settings = load_settings(cli.settings.as_ref())?;
    let data_dir = cli.data_dir.unwrap_or_else(JsonFileStore::default_dir);

    match cli.command {
        Cmd::Catalog => print_catalog(),
        Cmd::Levels { game } => print_levels(parse_game(&game)?),
        Cmd::Progress { json } => {
            let ledger = open_ledger(&data_dir)?;
            print_progress(&ledger, json)?;
        }
        Cmd::Reset => {
            let mut ledger = open_ledger(&data_dir)?;
            ledger.reset_progress();
            println!("Progress cleared. {} tokens kept.", ledger.total_tokens());
        }
        Cmd::Reward => {
            let mut ledger = open_ledger(&data_dir)?;
            if ledger.collect_daily_reward(settings.pricing.daily_reward) {
                println!(
                    "Collected {} tokens. Balance: {}",
                    settings.pricing.daily_reward,
                    ledger.total_tokens()
                );
            } else {
                println!("Today's reward was already collected.");
            }
        }
        Cmd::NewDay => {
            let mut ledger = open_ledger(&data_dir)?;
            ledger.start_new_day();
            println!("Daily reward is available again.");
        }
        Cmd::Autoplay {
            game,
            level,
            mode,
            theme,
            seed,
            hints,
            trace,
        } => {
            let mut ledger = open_ledger(&data_dir)?;
            let game = parse_game(&game)?;
            let mode = parse_mode(&mode)?;
            play(&mut ledger, game, mode, level, &theme, settings, seed, hints, trace)?;
        }
        Cmd::Resume { theme, seed } => {
            let mut ledger = open_ledger(&data_dir)?;
            let point = resume_target(&ledger, theme)?;
            play(
                &mut ledger,
                point.game,
                point.mode,
                point.level,
                &point.theme,
                settings,
                seed,
                false,
                false,
            )?;
        }
    }
    Ok(())
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn open_ledger(dir: &std::path::Path) -> anyhow::Result<ProgressLedger> {
    let store = JsonFileStore::open(dir)?;
    info!("progress file: {}", store.path().display());
    Ok(ProgressLedger::open(store))
}

/// The saved level to resume, optionally with another theme
fn resume_target(ledger: &ProgressLedger, theme: Option<String>) -> anyhow::Result<ResumePoint> {
    let Some(mut point) = ResumePoint::load(ledger) else {
        bail!("no level to resume");
    };
    if let Some(theme) = theme {
        point.theme = theme;
    }
    Ok(point)
}

fn parse_game(id: &str) -> anyhow::Result<GameKey> {
    GameKey::from_id(id).with_context(|| {
        let known: Vec<_> = GameKey::all().iter().map(|g| g.id()).collect();
        format!("unknown game {:?}; expected one of {}", id, known.join(", "))
    })
}

fn parse_mode(id: &str) -> anyhow::Result<ModeKey> {
    ModeKey::from_id(id).with_context(|| {
        let known: Vec<_> = ModeKey::all().iter().map(|m| m.id()).collect();
        format!("unknown mode {:?}; expected one of {}", id, known.join(", "))
    })
}

fn print_catalog() {
    for game in GameKey::all() {
        let info = game.info();
        let modes: Vec<_> = info.supported_modes.iter().map(|m| m.id()).collect();
        let status = if info.is_active { "" } else { " (coming soon)" };
        println!("{:<10} {}{}", info.key.id(), info.title, status);
        println!("           {}", info.description);
        println!("           modes: {}", modes.join(", "));
    }
}

fn print_levels(game: GameKey) {
    if !game.is_active() {
        println!("{} has no levels yet.", game.title());
        return;
    }
    println!("{} ({} levels)", game.title(), game.level_count());
    for config in levels(game) {
        let extra = match config.extra {
            LevelExtra::Pairs => format!("{} pairs", config.total_cells() / 2),
            LevelExtra::Sequence { length, delay_ms } => {
                format!("{} cues, {} ms apart", length, delay_ms)
            }
            LevelExtra::Scramble { steps } => format!("{} scramble steps", steps),
        };
        println!(
            "  {:>2}  {}x{}  cell {:.0}x{:.0}  {}",
            config.level, config.rows, config.columns, config.cell_width, config.cell_height, extra
        );
    }
}

fn print_progress(ledger: &ProgressLedger, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ledger.record())?);
        return Ok(());
    }
    println!("Tokens: {}", ledger.total_tokens());
    println!("Wins:   {}", ledger.total_wins());
    println!(
        "Daily reward: {}",
        if ledger.can_collect_daily_reward() {
            "available"
        } else {
            "collected"
        }
    );
    for (game, modes) in &ledger.record().progress {
        for (mode, level) in modes {
            println!("  {:<10} {:<10} level {}", game.id(), mode.id(), level);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn play(
    ledger: &mut ProgressLedger,
    game: GameKey,
    mode: ModeKey,
    level: u32,
    theme: &str,
    settings: Settings,
    seed: Option<u64>,
    hints: bool,
    trace: bool,
) -> anyhow::Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut session = GameSession::start(
        game,
        mode,
        level,
        theme,
        &ThemeLibrary::builtin(),
        settings,
        GameRng::with_seed(seed),
    )?;
    session.remember(ledger);
    println!(
        "{} level {} ({}), {}x{}, seed {}",
        game.title(),
        level,
        mode.id(),
        session.config().rows,
        session.config().columns,
        seed
    );

    let report = Autoplayer::new(&mut session, ledger)
        .use_hints(hints)
        .on_event(|event| {
            if trace {
                if let Ok(line) = serde_json::to_string(event) {
                    println!("{}", line);
                }
            }
        })
        .run()?;

    println!(
        "{} after {} taps, {} hints, {} mistakes, {:.1}s of game time",
        if report.completed { "Solved" } else { "Stopped" },
        report.taps,
        report.hints,
        report.mistakes,
        report.elapsed_ms as f64 / 1000.0
    );
    if let Some(unlocked) = report.unlocked {
        println!("+{} tokens, level {} unlocked", report.tokens_earned, unlocked);
    }
    println!("Balance: {} tokens", ledger.total_tokens());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegrid_core::MemoryStore;

    fn started(ledger: &mut ProgressLedger, theme: &str) {
        let session = GameSession::start(
            GameKey::Seek,
            ModeKey::Ghost,
            21,
            theme,
            &ThemeLibrary::builtin(),
            Settings::default(),
            GameRng::with_seed(2),
        )
        .unwrap();
        session.remember(ledger);
    }

    #[test]
    fn test_resume_uses_saved_theme() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        assert!(resume_target(&ledger, None).is_err());
        started(&mut ledger, "retro");
        let point = resume_target(&ledger, None).unwrap();
        assert_eq!(point.theme, "retro");
        assert_eq!(point.mode, ModeKey::Ghost);
        assert_eq!(point.level, 21);
    }

    #[test]
    fn test_resume_theme_override() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        started(&mut ledger, "nature");
        let point = resume_target(&ledger, Some("instruments".to_string())).unwrap();
        assert_eq!(point.theme, "instruments");
        assert_eq!(point.game, GameKey::Seek);
    }
}
