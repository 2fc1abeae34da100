//! gesture_floor — interactive entry point.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use gesture_floor::app::{RunOptions, replay_headless, run};
use gesture_floor::config::AppConfig;
use gesture_floor::session::Mode;

#[derive(Parser, Debug)]
#[command(name = "gesture_floor", about = "Shared gesture-driven drawing floor")]
struct Cli {
    /// JSON config file (missing file means defaults)
    #[arg(long, default_value = "gesture_floor.json")]
    config: PathBuf,

    /// Skip the config file and start from defaults
    #[arg(long)]
    quick: bool,

    /// Owner id for circles drawn here
    #[arg(long)]
    user: Option<String>,

    /// Circle data file
    #[arg(long, conflicts_with = "memory")]
    data: Option<PathBuf>,

    /// Keep circles in memory only
    #[arg(long)]
    memory: bool,

    /// Replay a JSON-lines landmark recording instead of the simulated hand
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Run the replay without a window, then save and exit
    #[arg(long, requires = "replay")]
    headless: bool,

    /// Mode to start in: idle, connect or prayer
    #[arg(long, default_value = "idle")]
    mode: Mode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let cfg = build_config(&cli)?;

    if cli.headless {
        let Some(path) = cli.replay else { bail!("--headless needs --replay") };
        let app = replay_headless(cfg, path, cli.mode)?;
        let ledger = app.ledger();
        println!("{} circles from {} users", ledger.circle_count(), ledger.owners().len());
        let mine = ledger.circles_of(&app.config().user_id);
        for ix in mine.iter().flat_map(|c| ledger.find_intersections(c)) {
            let [p, q] = ix.points;
            println!(
                "  {} × {}: ({:.2}, {:.2}) ({:.2}, {:.2})",
                ix.owner_pair.0, ix.owner_pair.1, p.x, p.z, q.x, q.z,
            );
        }
        println!("{}", app.status());
        return Ok(());
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║      Gesture Floor — shared circles on a gestured floor      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    match &cli.replay {
        Some(p) => println!("  Input: recording {}", p.display()),
        None    => println!("  Input: simulated hand (mouse + P / Space)"),
    }
    println!("  User:  {}", cfg.user_id);
    match &cfg.data_path {
        Some(p) => println!("  Data:  {}", p.display()),
        None    => println!("  Data:  in memory"),
    }
    println!();

    run(cfg, RunOptions { replay: cli.replay, initial_mode: cli.mode })
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut cfg = if cli.quick {
        AppConfig::default()
    } else {
        AppConfig::load(&cli.config)
            .with_context(|| format!("failed to load config {}", cli.config.display()))?
    };

    if let Some(user) = &cli.user {
        cfg.user_id = user.clone();
    }
    if let Some(data) = &cli.data {
        cfg.data_path = Some(data.clone());
    }
    if cli.memory {
        cfg.data_path = None;
    }

    cfg.validate().context("invalid configuration")?;
    info!("user '{}', mode {}", cfg.user_id, cli.mode);
    Ok(cfg)
}
