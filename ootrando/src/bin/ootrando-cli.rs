use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use ootrando::generation::{
    playthrough_repeat, GenerationContext, GenerationOptions, GenerationOutput,
};
use ootrando::settings::{parse_settings_file, RawSettings, SettingsFile};
use ootrando_game::{GameData, LocationIdx, SettingKey};
use rand::{RngCore, SeedableRng};

#[derive(Parser)]
struct Args {
    #[arg(long)]
    seed: Option<u32>,

    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    world: Option<PathBuf>,

    #[arg(long)]
    exclude: Vec<String>,

    #[arg(long)]
    output_spoiler_log: Option<PathBuf>,

    #[arg(long)]
    repeat: Option<usize>,

    #[arg(long)]
    max_attempts: Option<usize>,

    #[arg(long)]
    logic: Option<String>,
}

fn load_settings(
    args: &Args,
    game_data: &GameData,
) -> Result<(RawSettings, BTreeSet<LocationIdx>)> {
    let settings_file = match &args.settings {
        Some(path) => {
            let settings_str = std::fs::read_to_string(path)
                .with_context(|| format!("Unable to read settings file at {}", path.display()))?;
            parse_settings_file(&settings_str)
                .with_context(|| format!("Unable to parse settings file at {}", path.display()))?
        }
        None => SettingsFile::default(),
    };
    let (mut raw, mut excluded) = settings_file.to_raw(game_data)?;
    if let Some(logic) = &args.logic {
        let Some(idx) = SettingKey::Logic.choice_index(logic) else {
            bail!(
                "Unknown logic '{}', expected one of {:?}",
                logic,
                SettingKey::Logic.choices()
            );
        };
        raw.insert(SettingKey::Logic, idx);
    }
    for name in &args.exclude {
        excluded.insert(game_data.location_idx(name)?);
    }
    Ok((raw, excluded))
}

fn get_generation(
    args: &Args,
    game_data: &GameData,
    raw: &RawSettings,
    excluded: &BTreeSet<LocationIdx>,
    root_seed: u32,
) -> Result<GenerationOutput> {
    let max_attempts = if args.seed.is_some() {
        1
    } else {
        args.max_attempts.unwrap_or(100)
    };
    let mut rng = rand::rngs::StdRng::seed_from_u64(root_seed as u64);
    let options = GenerationOptions {
        spoiler_log_path: args.output_spoiler_log.clone(),
    };
    let mut ctx = GenerationContext::new(game_data, options);
    for attempt_num in 1..=max_attempts {
        let seed = match args.seed {
            Some(s) => s,
            None => rng.next_u32(),
        };
        info!("Attempt {attempt_num}/{max_attempts}: seed={seed}");
        match ctx.generate(seed, raw, excluded) {
            Ok(output) => return Ok(output),
            Err(e) => {
                error!(
                    "Attempt {attempt_num}/{max_attempts}: Generation failed with status {}: {}",
                    e.code(),
                    e
                );
            }
        }
    }
    bail!("Exhausted generation attempts");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let game_data = match &args.world {
        Some(path) => GameData::load(path)?,
        None => GameData::load_builtin()?,
    };
    let (raw, excluded) = load_settings(&args, &game_data)?;
    let root_seed = match args.seed {
        Some(s) => s,
        None => rand::rngs::StdRng::from_entropy().next_u32(),
    };

    if let Some(count) = args.repeat {
        let summary = playthrough_repeat(&game_data, &raw, &excluded, count, root_seed);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let output = get_generation(&args, &game_data, &raw, &excluded, root_seed)?;
    println!("Seed: {}", output.seed);
    println!("Hash: {}", output.hash);
    println!(
        "Hash icons: {}",
        output
            .hash_icons
            .iter()
            .map(|&i| game_data.hash_icons[i].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Random calls: settings={}, fill={}",
        output.random_calls[0], output.random_calls[1]
    );
    if let Some(path) = &args.output_spoiler_log {
        if output.spoiler_log_written {
            println!("Spoiler log written to {}", path.display());
        } else if output.playthrough.is_some() {
            println!("Spoiler log could not be written to {}", path.display());
        } else {
            println!("Spoiler log generation is off in the settings");
        }
    }
    Ok(())
}
