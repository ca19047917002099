use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use ootrando_game::{GameData, LocationIdx};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::generation::GenerationOutput;
use ootrando_game::SettingKey;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpoilerLocation {
    pub location: String,
    pub item: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpoilerArea {
    pub area: String,
    pub locations: Vec<SpoilerLocation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpoilerRandomCalls {
    pub settings: u64,
    pub fill: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpoilerLog {
    pub version: String,
    pub seed: u32,
    pub hash: String,
    pub hash_icons: Vec<String>,
    pub settings_string: String,
    pub settings: BTreeMap<String, String>,
    pub excluded_locations: Vec<String>,
    pub locations: Vec<SpoilerArea>,
    pub playthrough: Vec<Vec<SpoilerLocation>>,
    pub way_of_the_hero: Vec<SpoilerLocation>,
    pub playthrough_beatable: bool,
    pub random_calls: SpoilerRandomCalls,
}

fn spoiler_location(
    game_data: &GameData,
    output: &GenerationOutput,
    loc: LocationIdx,
) -> SpoilerLocation {
    SpoilerLocation {
        location: game_data.location_name(loc).to_string(),
        item: output
            .overrides
            .get(&loc)
            .map(|&item| game_data.item_name(item).to_string())
            .unwrap_or_default(),
    }
}

impl SpoilerLog {
    pub fn new(game_data: &GameData, output: &GenerationOutput) -> Self {
        let settings = SettingKey::iter()
            .map(|key| {
                (
                    key.display_name().to_string(),
                    output.settings.choice_text(key).to_string(),
                )
            })
            .collect();

        let mut locations: Vec<SpoilerArea> = game_data
            .area_isv
            .keys
            .iter()
            .map(|area| SpoilerArea {
                area: area.clone(),
                locations: vec![],
            })
            .collect();
        for loc in 0..game_data.locations.len() {
            let area_idx = game_data.locations[loc].area_idx;
            locations[area_idx]
                .locations
                .push(spoiler_location(game_data, output, loc));
        }
        locations.retain(|x| !x.locations.is_empty());

        let playthrough = output.playthrough.clone().unwrap_or_default();
        SpoilerLog {
            version: env!("CARGO_PKG_VERSION").to_string(),
            seed: output.seed,
            hash: output.hash.clone(),
            hash_icons: output
                .hash_icons
                .iter()
                .map(|&i| game_data.hash_icons[i].clone())
                .collect(),
            settings_string: output.settings_string.clone(),
            settings,
            excluded_locations: output
                .settings
                .excluded_locations
                .iter()
                .map(|&loc| game_data.location_name(loc).to_string())
                .collect(),
            locations,
            playthrough: playthrough
                .playthrough_locations
                .iter()
                .map(|sphere| {
                    sphere
                        .iter()
                        .map(|&loc| spoiler_location(game_data, output, loc))
                        .collect()
                })
                .collect(),
            way_of_the_hero: playthrough
                .woth_locations
                .iter()
                .map(|&loc| spoiler_location(game_data, output, loc))
                .collect(),
            playthrough_beatable: playthrough.playthrough_beatable,
            random_calls: SpoilerRandomCalls {
                settings: output.random_calls[0],
                fill: output.random_calls[1],
            },
        }
    }
}

pub fn write_spoiler_log(path: &Path, spoiler_log: &SpoilerLog) -> Result<()> {
    let spoiler_str = serde_json::to_string_pretty(spoiler_log)?;
    std::fs::write(path, spoiler_str)
        .with_context(|| format!("Unable to write spoiler log to {}", path.display()))?;
    Ok(())
}
