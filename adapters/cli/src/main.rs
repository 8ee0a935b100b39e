#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Quiz Defence stage with a scripted player.

mod catalog;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use quiz_defence_core::{PlayerClass, StageId};
use quiz_defence_session::{next_uncleared, InMemoryProgression, Session};

use crate::{
    catalog::{Catalog, Loadout},
    simulation::Script,
};

/// Plays one stage attempt headlessly and prints the result.
#[derive(Debug, Parser)]
#[command(name = "quiz-defence", version, about, long_about = None)]
struct Cli {
    /// TOML catalog to load instead of the bundled one.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Stage to play. Defaults to the first stage in map order.
    #[arg(long)]
    stage: Option<u32>,

    /// Class of the player.
    #[arg(long, value_enum, default_value_t = ClassArg::Warrior)]
    class: ClassArg,

    /// Level of the player.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    level: u32,

    /// Weapon to equip, by item id.
    #[arg(long)]
    weapon: Option<String>,

    /// Armor to equip, by item id.
    #[arg(long)]
    armor: Option<String>,

    /// Accessory to equip, by item id.
    #[arg(long)]
    accessory: Option<String>,

    /// Abilities to equip, by id.
    #[arg(long = "ability", value_delimiter = ',')]
    abilities: Vec<String>,

    /// Brings the catalog's ally along.
    #[arg(long, default_value_t = false)]
    ally: bool,

    /// Probability that the scripted player answers correctly.
    #[arg(long, default_value_t = 0.8)]
    accuracy: f64,

    /// Milliseconds between two answers.
    #[arg(long, default_value_t = 1500)]
    answer_every_ms: u64,

    /// Milliseconds of simulated time per frame.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Seed for the scripted player and the combat rolls.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Seconds after which the attempt is abandoned.
    #[arg(long, default_value_t = 300)]
    time_limit_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ClassArg {
    Warrior,
    Mage,
    Merchant,
}

impl From<ClassArg> for PlayerClass {
    fn from(class: ClassArg) -> Self {
        match class {
            ClassArg::Warrior => Self::Warrior,
            ClassArg::Mage => Self::Mage,
            ClassArg::Merchant => Self::Merchant,
        }
    }
}

/// Entry point for the Quiz Defence command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let catalog = Catalog::load(cli.catalog.as_deref())?;
    let progression = catalog.progression(&Loadout {
        class: cli.class.into(),
        level: cli.level,
        weapon: cli.weapon,
        armor: cli.armor,
        accessory: cli.accessory,
        abilities: cli.abilities,
        ally: cli.ally,
    })?;
    let stage = match cli.stage {
        Some(id) => StageId::new(id),
        None => {
            next_uncleared(&catalog.data, &progression.cleared_stages)
                .context("every stage has already been cleared")?
                .id
        }
    };
    info!(
        "playing stage {} as a level {} {:?}",
        stage.get(),
        progression.level,
        progression.class
    );

    let mut session = Session::new(InMemoryProgression::new(progression), catalog.tuning, cli.seed);
    session
        .select_stage(&catalog.data, &catalog.data, stage)
        .with_context(|| format!("stage {} cannot be played", stage.get()))?;

    let summary = simulation::run(
        &mut session,
        &Script {
            frame: Duration::from_millis(cli.frame_ms),
            answer_every: Duration::from_millis(cli.answer_every_ms),
            accuracy: cli.accuracy,
            time_limit: Duration::from_secs(cli.time_limit_secs),
            seed: cli.seed,
        },
    )?;
    println!("{summary}");
    Ok(())
}
