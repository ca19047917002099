use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{info, warn};
use ootrando_game::options::LogicMode;
use ootrando_game::{GameData, LocationIdx};
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::hash::settings_hash;
use crate::playthrough::{PlaythroughAnalyzer, PlaythroughResult};
use crate::prng::SeedRng;
use crate::randomize::{fill, vanilla_fill, FillError, Overrides};
use crate::settings::{build_menus, resolve_settings, Menu, RawSettings, ResolvedSettings};
use crate::spoiler_log::{write_spoiler_log, SpoilerLog};

pub const STATUS_SUCCESS: i32 = 1;
pub const NUM_HASH_ICONS: usize = 5;

#[derive(Clone, Debug, Default)]
pub struct GenerationOptions {
    // Where to write the spoiler log, when the settings ask for one.
    pub spoiler_log_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct GenerationOutput {
    pub seed: u32,
    pub settings: ResolvedSettings,
    pub settings_string: String,
    pub hash_value: u32,
    pub hash: String,
    pub hash_icons: Vec<usize>,
    pub overrides: Overrides,
    pub playthrough: Option<PlaythroughResult>,
    pub spoiler_log_written: bool,
    // Draws spent resolving settings, then draws spent filling (hash icons included).
    pub random_calls: [u64; 2],
}

/// Owns all mutable state of a single generation.
pub struct GenerationContext<'a> {
    game_data: &'a GameData,
    menus: Vec<Menu>,
    options: GenerationOptions,
    rng: SeedRng,
}

impl<'a> GenerationContext<'a> {
    pub fn new(game_data: &'a GameData, options: GenerationOptions) -> Self {
        GenerationContext {
            game_data,
            menus: build_menus(game_data),
            options,
            rng: SeedRng::new(0),
        }
    }

    pub fn generate(
        &mut self,
        seed: u32,
        raw: &RawSettings,
        excluded: &BTreeSet<LocationIdx>,
    ) -> Result<GenerationOutput, FillError> {
        self.rng.init(seed);
        let settings = resolve_settings(raw, excluded, self.game_data, &self.menus, &mut self.rng);
        let settings_string = settings.settings_string(&self.menus);
        let settings_calls = self.rng.used_count(true);

        let hash_value = settings_hash(seed, &settings_string);
        let hash = hash_value.to_string();
        self.rng.init(hash_value);
        info!("Seed {seed}: hash {hash}, {settings_calls} settings draw(s)");

        let overrides = if settings.logic() == LogicMode::Vanilla {
            vanilla_fill(self.game_data)
        } else {
            fill(self.game_data, &settings, &mut self.rng)?
        };

        let num_icons = self.game_data.hash_icons.len();
        let hash_icons: Vec<usize> = (0..NUM_HASH_ICONS)
            .map(|_| self.rng.gen_range(0..num_icons))
            .collect();
        let fill_calls = self.rng.used_count(true);

        let mut output = GenerationOutput {
            seed,
            settings,
            settings_string,
            hash_value,
            hash,
            hash_icons,
            overrides,
            playthrough: None,
            spoiler_log_written: false,
            random_calls: [settings_calls, fill_calls],
        };

        if output.settings.generate_spoiler_log() {
            let analyzer =
                PlaythroughAnalyzer::new(self.game_data, &output.settings, &output.overrides);
            output.playthrough = Some(analyzer.analyze());
            if let Some(path) = &self.options.spoiler_log_path {
                let spoiler_log = SpoilerLog::new(self.game_data, &output);
                match write_spoiler_log(path, &spoiler_log) {
                    Ok(()) => output.spoiler_log_written = true,
                    Err(e) => warn!("Failed to write spoiler log: {e:#}"),
                }
            }
        }
        Ok(output)
    }
}

pub fn status_code<T>(result: &Result<T, FillError>) -> i32 {
    match result {
        Ok(_) => STATUS_SUCCESS,
        Err(e) => e.code(),
    }
}

/// Runs one generation in a fresh context.
pub fn playthrough_init(
    game_data: &GameData,
    seed: u32,
    raw: &RawSettings,
    excluded: &BTreeSet<LocationIdx>,
    options: GenerationOptions,
) -> Result<GenerationOutput, FillError> {
    GenerationContext::new(game_data, options).generate(seed, raw, excluded)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepeatSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(u32, i32)>,
}

/// Batch generation. Failed iterations are recorded and skipped.
pub fn playthrough_repeat(
    game_data: &GameData,
    raw: &RawSettings,
    excluded: &BTreeSet<LocationIdx>,
    count: usize,
    root_seed: u32,
) -> RepeatSummary {
    let mut seed_rng = SeedRng::new(root_seed);
    let mut summary = RepeatSummary::default();
    for i in 0..count {
        let seed = seed_rng.next_u32();
        summary.attempted += 1;
        let result = playthrough_init(game_data, seed, raw, excluded, GenerationOptions::default());
        match result {
            Ok(_) => summary.succeeded += 1,
            Err(e) => {
                warn!("Repeat {}/{count}: seed {seed} failed: {e}", i + 1);
                summary.failures.push((seed, e.code()));
            }
        }
    }
    info!(
        "Generated {}/{} seeds successfully",
        summary.succeeded, summary.attempted
    );
    summary
}
