use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use hashbrown::HashMap;
use log::warn;
use num_enum::TryFromPrimitive;
use ootrando_game::options::{
    DungeonRewardShuffle, IceTraps, ItemPoolValue, LogicMode, ProgressionRate, RainbowBridge,
    StartingAge,
};
use ootrando_game::{GameData, LocationIdx, LocationKind, SettingKey};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type RawSettings = HashMap<SettingKey, u8>;

pub const INCLUDE_CHOICE: &str = "Include";
pub const EXCLUDE_CHOICE: &str = "Exclude";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptionCategory {
    // Shapes the generated seed; part of the settings string.
    Setting,
    // Cosmetic or output-only.
    Toggle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuOption {
    Setting(SettingKey),
    Exclusion(LocationIdx),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuKind {
    SubMenu,
    Action,
}

#[derive(Clone, Debug)]
pub struct Menu {
    pub name: String,
    pub kind: MenuKind,
    pub category: OptionCategory,
    pub options: Vec<MenuOption>,
}

fn setting_menu(name: &str, category: OptionCategory, keys: &[SettingKey]) -> Menu {
    Menu {
        name: name.to_string(),
        kind: MenuKind::SubMenu,
        category,
        options: keys.iter().map(|&k| MenuOption::Setting(k)).collect(),
    }
}

/// Menus in their fixed display order. Both resolution and the settings string walk this list.
pub fn build_menus(game_data: &GameData) -> Vec<Menu> {
    use SettingKey::*;
    let mut menus = vec![
        setting_menu(
            "Open Settings",
            OptionCategory::Setting,
            &[
                OpenForest,
                OpenKakariko,
                OpenDoorOfTime,
                ZorasFountain,
                GerudoFortress,
                RainbowBridge,
            ],
        ),
        setting_menu("World Settings", OptionCategory::Setting, &[StartingAge]),
        setting_menu(
            "Shuffle Settings",
            OptionCategory::Setting,
            &[ShuffleKokiriSword, ShuffleOcarinas, ShuffleDungeonRewards],
        ),
        setting_menu(
            "Item Pool Settings",
            OptionCategory::Setting,
            &[ItemPoolValue, IceTraps, ProgressionRate],
        ),
        setting_menu("Logic Settings", OptionCategory::Setting, &[Logic]),
    ];
    for (area_idx, area) in game_data.area_isv.keys.iter().enumerate() {
        let options: Vec<MenuOption> = game_data
            .locations
            .iter()
            .enumerate()
            .filter(|(_, loc)| loc.area_idx == area_idx)
            .map(|(i, _)| MenuOption::Exclusion(i))
            .collect();
        if options.is_empty() {
            continue;
        }
        menus.push(Menu {
            name: format!("Exclude Locations: {area}"),
            kind: MenuKind::SubMenu,
            category: OptionCategory::Setting,
            options,
        });
    }
    menus.push(setting_menu(
        "Misc Settings",
        OptionCategory::Toggle,
        &[GenerateSpoilerLog, Language],
    ));
    menus.push(Menu {
        name: "Generate Randomizer".to_string(),
        kind: MenuKind::Action,
        category: OptionCategory::Toggle,
        options: vec![],
    });
    menus
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    pub values: BTreeMap<SettingKey, u8>,
    pub excluded_locations: BTreeSet<LocationIdx>,
}

impl ResolvedSettings {
    pub fn get(&self, key: SettingKey) -> u8 {
        self.values
            .get(&key)
            .copied()
            .unwrap_or(key.default_index())
    }

    pub fn choice_text(&self, key: SettingKey) -> &'static str {
        let choices = key.choices();
        choices
            .get(self.get(key) as usize)
            .copied()
            .unwrap_or(choices[key.default_index() as usize])
    }

    // For two-choice options ordered (Off, On) or (Closed, Open).
    pub fn is_enabled(&self, key: SettingKey) -> bool {
        self.get(key) == 1
    }

    fn typed<T: TryFromPrimitive<Primitive = u8>>(&self, key: SettingKey, default: T) -> T {
        T::try_from_primitive(self.get(key)).unwrap_or(default)
    }

    pub fn logic(&self) -> LogicMode {
        self.typed(SettingKey::Logic, LogicMode::Glitchless)
    }

    pub fn starting_age(&self) -> StartingAge {
        self.typed(SettingKey::StartingAge, StartingAge::Child)
    }

    pub fn rainbow_bridge(&self) -> RainbowBridge {
        self.typed(SettingKey::RainbowBridge, RainbowBridge::Vanilla)
    }

    pub fn dungeon_reward_shuffle(&self) -> DungeonRewardShuffle {
        self.typed(
            SettingKey::ShuffleDungeonRewards,
            DungeonRewardShuffle::EndOfDungeons,
        )
    }

    pub fn item_pool_value(&self) -> ItemPoolValue {
        self.typed(SettingKey::ItemPoolValue, ItemPoolValue::Balanced)
    }

    pub fn ice_traps(&self) -> IceTraps {
        self.typed(SettingKey::IceTraps, IceTraps::Normal)
    }

    pub fn progression_rate(&self) -> ProgressionRate {
        self.typed(SettingKey::ProgressionRate, ProgressionRate::Uniform)
    }

    pub fn generate_spoiler_log(&self) -> bool {
        self.is_enabled(SettingKey::GenerateSpoilerLog)
    }

    pub fn is_excluded(&self, loc: LocationIdx) -> bool {
        self.excluded_locations.contains(&loc)
    }

    /// Locations whose item is decided before the fill: boss rewards and unshuffled items.
    pub fn is_fixed_location(&self, game_data: &GameData, loc: LocationIdx) -> bool {
        let location = &game_data.locations[loc];
        if location.kind == LocationKind::Boss {
            return true;
        }
        let vanilla_name = game_data.item_name(location.vanilla_item);
        (vanilla_name == "Kokiri Sword" && !self.is_enabled(SettingKey::ShuffleKokiriSword))
            || (vanilla_name == "Ocarina" && !self.is_enabled(SettingKey::ShuffleOcarinas))
    }

    /// Text of every `Setting`-category option across all sub-menus, in menu order.
    pub fn settings_string(&self, menus: &[Menu]) -> String {
        let mut out = String::new();
        for menu in menus {
            if menu.kind != MenuKind::SubMenu || menu.category != OptionCategory::Setting {
                continue;
            }
            for option in &menu.options {
                match *option {
                    MenuOption::Setting(key) => out.push_str(self.choice_text(key)),
                    MenuOption::Exclusion(loc) => out.push_str(if self.is_excluded(loc) {
                        EXCLUDE_CHOICE
                    } else {
                        INCLUDE_CHOICE
                    }),
                }
            }
        }
        out
    }
}

fn force(values: &mut BTreeMap<SettingKey, u8>, key: SettingKey, value: u8) {
    values.insert(key, value);
}

/// Turns raw option indices into a consistent, fully populated settings descriptor.
///
/// Missing or out-of-range values fall back to the option default. Options set to their
/// "Random" choice draw a concrete value from `rng`, in menu order.
pub fn resolve_settings<R: Rng>(
    raw: &RawSettings,
    excluded: &BTreeSet<LocationIdx>,
    game_data: &GameData,
    menus: &[Menu],
    rng: &mut R,
) -> ResolvedSettings {
    let mut values: BTreeMap<SettingKey, u8> = BTreeMap::new();
    for menu in menus {
        for option in &menu.options {
            let MenuOption::Setting(key) = *option else {
                continue;
            };
            let num_choices = key.choices().len();
            let mut value = raw.get(&key).copied().unwrap_or(key.default_index());
            if value as usize >= num_choices {
                warn!("{key}: value {value} out of range, using default");
                value = key.default_index();
            }
            if key.is_random_choice(value) {
                value = rng.gen_range(0..num_choices - 1) as u8;
            }
            values.insert(key, value);
        }
    }

    if values.get(&SettingKey::StartingAge) == Some(&(StartingAge::Adult as u8)) {
        force(&mut values, SettingKey::OpenDoorOfTime, 1);
    }
    if values.get(&SettingKey::Logic) == Some(&(LogicMode::Vanilla as u8)) {
        force(&mut values, SettingKey::ShuffleKokiriSword, 0);
        force(&mut values, SettingKey::ShuffleOcarinas, 0);
        force(
            &mut values,
            SettingKey::ShuffleDungeonRewards,
            DungeonRewardShuffle::Vanilla as u8,
        );
        force(
            &mut values,
            SettingKey::ItemPoolValue,
            ItemPoolValue::Balanced as u8,
        );
        force(&mut values, SettingKey::IceTraps, IceTraps::Off as u8);
    }

    let mut resolved = ResolvedSettings {
        values,
        excluded_locations: BTreeSet::new(),
    };
    if resolved.logic() == LogicMode::Vanilla {
        if !excluded.is_empty() {
            warn!(
                "Dropped {} exclusion(s): vanilla logic places every vanilla item",
                excluded.len()
            );
        }
        return resolved;
    }
    resolved.excluded_locations = excluded
        .iter()
        .copied()
        .filter(|&loc| {
            loc < game_data.locations.len() && !resolved.is_fixed_location(game_data, loc)
        })
        .collect();
    let dropped = excluded.len() - resolved.excluded_locations.len();
    if dropped > 0 {
        warn!("Dropped {dropped} exclusion(s) of fixed or unknown locations");
    }
    resolved
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Index(u8),
    Choice(String),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
    #[serde(default)]
    pub excluded_locations: Vec<String>,
}

pub fn parse_settings_file(settings_json: &str) -> Result<SettingsFile> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings = serde_path_to_error::deserialize(&mut des)?;
    Ok(settings)
}

impl SettingsFile {
    pub fn to_raw(&self, game_data: &GameData) -> Result<(RawSettings, BTreeSet<LocationIdx>)> {
        let mut raw = RawSettings::new();
        for (name, value) in &self.settings {
            let key =
                SettingKey::from_str(name).with_context(|| format!("Unknown setting '{name}'"))?;
            let idx = match value {
                SettingValue::Index(i) => *i,
                SettingValue::Choice(choice) => match key.choice_index(choice) {
                    Some(i) => i,
                    None => bail!(
                        "Unknown choice '{}' for {}, expected one of {:?}",
                        choice,
                        key,
                        key.choices()
                    ),
                },
            };
            raw.insert(key, idx);
        }
        let excluded = self
            .excluded_locations
            .iter()
            .map(|name| game_data.location_idx(name))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok((raw, excluded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::SeedRng;

    fn resolve(raw: &RawSettings, excluded: &BTreeSet<LocationIdx>) -> ResolvedSettings {
        let game_data = GameData::load_builtin().unwrap();
        let menus = build_menus(&game_data);
        let mut rng = SeedRng::new(1);
        resolve_settings(raw, excluded, &game_data, &menus, &mut rng)
    }

    #[test]
    fn test_defaults_and_clamping() {
        let mut raw = RawSettings::new();
        raw.insert(SettingKey::ZorasFountain, 200);
        let resolved = resolve(&raw, &BTreeSet::new());
        assert_eq!(resolved.get(SettingKey::ZorasFountain), 0);
        assert_eq!(resolved.get(SettingKey::OpenForest), 1);
        assert_eq!(resolved.logic(), LogicMode::Glitchless);
        assert!(resolved.generate_spoiler_log());
    }

    #[test]
    fn test_random_choice_resolves() {
        let game_data = GameData::load_builtin().unwrap();
        let menus = build_menus(&game_data);
        let mut raw = RawSettings::new();
        raw.insert(SettingKey::RainbowBridge, 5);
        let mut rng = SeedRng::new(3);
        let resolved = resolve_settings(&raw, &BTreeSet::new(), &game_data, &menus, &mut rng);
        assert!(resolved.get(SettingKey::RainbowBridge) < 5);
        assert!(rng.used_count(false) > 0);
    }

    #[test]
    fn test_forced_options() {
        let mut raw = RawSettings::new();
        raw.insert(SettingKey::StartingAge, 1);
        raw.insert(SettingKey::OpenDoorOfTime, 0);
        raw.insert(SettingKey::Logic, 3);
        raw.insert(SettingKey::IceTraps, 4);
        let resolved = resolve(&raw, &BTreeSet::new());
        assert!(resolved.is_enabled(SettingKey::OpenDoorOfTime));
        assert_eq!(resolved.ice_traps(), IceTraps::Off);
        assert_eq!(
            resolved.dungeon_reward_shuffle(),
            DungeonRewardShuffle::Vanilla
        );
    }

    #[test]
    fn test_settings_string_skips_toggles() {
        let game_data = GameData::load_builtin().unwrap();
        let menus = build_menus(&game_data);
        let mut raw = RawSettings::new();
        let a = resolve(&raw, &BTreeSet::new()).settings_string(&menus);
        raw.insert(SettingKey::Language, 2);
        raw.insert(SettingKey::GenerateSpoilerLog, 0);
        let b = resolve(&raw, &BTreeSet::new()).settings_string(&menus);
        assert_eq!(a, b);
        assert!(a.starts_with("OpenClosedOpenNormalFastVanilla"));
    }

    #[test]
    fn test_fixed_exclusions_dropped() {
        let game_data = GameData::load_builtin().unwrap();
        let boss = game_data.location_idx("Queen Gohma").unwrap();
        let chest = game_data.location_idx("KF Mido Top Left Chest").unwrap();
        let excluded: BTreeSet<LocationIdx> = [boss, chest].into_iter().collect();
        let resolved = resolve(&RawSettings::new(), &excluded);
        assert!(!resolved.is_excluded(boss));
        assert!(resolved.is_excluded(chest));
    }

    #[test]
    fn test_vanilla_logic_drops_exclusions() {
        let game_data = GameData::load_builtin().unwrap();
        let chest = game_data.location_idx("KF Mido Top Left Chest").unwrap();
        let excluded: BTreeSet<LocationIdx> = [chest].into_iter().collect();
        let raw: RawSettings = [(SettingKey::Logic, LogicMode::Vanilla as u8)].into_iter().collect();
        let resolved = resolve(&raw, &excluded);
        assert!(resolved.excluded_locations.is_empty());
        assert_eq!(resolved.logic(), LogicMode::Vanilla);
    }

    #[test]
    fn test_parse_settings_file() {
        let game_data = GameData::load_builtin().unwrap();
        let file = parse_settings_file(
            r#"{"settings": {"Logic": "Glitched", "IceTraps": 0},
                "excluded_locations": ["LH Child Fishing"]}"#,
        )
        .unwrap();
        let (raw, excluded) = file.to_raw(&game_data).unwrap();
        assert_eq!(raw[&SettingKey::Logic], 1);
        assert_eq!(raw[&SettingKey::IceTraps], 0);
        assert_eq!(excluded.len(), 1);

        let err = parse_settings_file(r#"{"settings": {"Logic": [1]}}"#).unwrap_err();
        assert!(err.to_string().contains("settings.Logic"));
        let file = parse_settings_file(r#"{"settings": {"Logic": "Sideways"}}"#).unwrap();
        assert!(file.to_raw(&game_data).is_err());
    }
}
