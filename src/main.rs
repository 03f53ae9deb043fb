use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

use worm_dqn::capabilities::{Capabilities, CommentaryChoice};
use worm_dqn::modes::{TrainConfig, TrainMode};
use worm_dqn::rl::{ReplayKind, TrainingBackend, default_device};

#[derive(Parser)]
#[command(name = "worm_dqn")]
#[command(version, about = "Double-DQN worm that learns a grid game by self-play")]
struct Cli {
    /// Execution mode
    #[arg(long, default_value = "train")]
    mode: Mode,

    /// JSON training config; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Grid width
    #[arg(long)]
    width: Option<usize>,

    /// Grid height
    #[arg(long)]
    height: Option<usize>,

    /// Step cap per episode
    #[arg(long)]
    max_steps: Option<usize>,

    /// Replay memory implementation
    #[arg(long)]
    replay: Option<ReplayArg>,

    /// Commentary source (remote reads COMMENTARY_API_KEY)
    #[arg(long)]
    commentary: Option<CommentaryArg>,

    /// Move at random and skip learning
    #[arg(long)]
    no_learning: bool,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Headless training
    Train,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReplayArg {
    Standard,
    SumTree,
}

#[derive(Clone, Copy, ValueEnum)]
enum CommentaryArg {
    Off,
    Canned,
    Remote,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = log_level(cli.verbose);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
    info!("Logging initialized at level: {}", level);

    let mut config = match &cli.config {
        Some(path) => TrainConfig::from_json_file(path)?,
        None => TrainConfig::default(),
    };

    if let Some(episodes) = cli.episodes {
        config.num_episodes = episodes;
    }
    if let Some(width) = cli.width {
        config.game_config.grid_width = width;
    }
    if let Some(height) = cli.height {
        config.game_config.grid_height = height;
    }
    if let Some(max_steps) = cli.max_steps {
        config.max_steps_per_episode = max_steps;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(replay) = cli.replay {
        config.capabilities.replay = match replay {
            ReplayArg::Standard => ReplayKind::Standard,
            ReplayArg::SumTree => ReplayKind::SumTree,
        };
    }
    if let Some(commentary) = cli.commentary {
        config.capabilities.commentary = match commentary {
            CommentaryArg::Off => CommentaryChoice::Off,
            CommentaryArg::Canned => CommentaryChoice::Canned,
            CommentaryArg::Remote => CommentaryChoice::Remote,
        };
    }
    if cli.no_learning {
        config.capabilities.learning = false;
    }

    let capabilities = Capabilities::from_env(&config.capabilities);

    match cli.mode {
        Mode::Train => {
            let mut train_mode =
                TrainMode::<TrainingBackend>::new(config, &capabilities, default_device())?;
            train_mode.run()?;
        }
    }

    Ok(())
}
