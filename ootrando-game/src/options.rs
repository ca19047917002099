use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

// Choice text used by options that can resolve to a randomly drawn value.
pub const RANDOM_CHOICE: &str = "Random";

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    EnumIter,
    VariantNames,
    Display,
    Serialize,
    Deserialize,
)]
pub enum SettingKey {
    Logic,
    OpenForest,
    OpenKakariko,
    OpenDoorOfTime,
    ZorasFountain,
    GerudoFortress,
    RainbowBridge,
    StartingAge,
    ShuffleKokiriSword,
    ShuffleOcarinas,
    ShuffleDungeonRewards,
    ItemPoolValue,
    IceTraps,
    ProgressionRate,
    GenerateSpoilerLog,
    Language,
}

impl SettingKey {
    pub fn display_name(self) -> &'static str {
        match self {
            SettingKey::Logic => "Logic",
            SettingKey::OpenForest => "Forest",
            SettingKey::OpenKakariko => "Kakariko Gate",
            SettingKey::OpenDoorOfTime => "Door of Time",
            SettingKey::ZorasFountain => "Zora's Fountain",
            SettingKey::GerudoFortress => "Gerudo Fortress",
            SettingKey::RainbowBridge => "Rainbow Bridge",
            SettingKey::StartingAge => "Starting Age",
            SettingKey::ShuffleKokiriSword => "Shuffle Kokiri Sword",
            SettingKey::ShuffleOcarinas => "Shuffle Ocarinas",
            SettingKey::ShuffleDungeonRewards => "Shuffle Dungeon Rewards",
            SettingKey::ItemPoolValue => "Item Pool",
            SettingKey::IceTraps => "Ice Traps",
            SettingKey::ProgressionRate => "Progression Rate",
            SettingKey::GenerateSpoilerLog => "Generate Spoiler Log",
            SettingKey::Language => "Language",
        }
    }

    pub fn choices(self) -> &'static [&'static str] {
        match self {
            SettingKey::Logic => &["Glitchless", "Glitched", "No Logic", "Vanilla"],
            SettingKey::OpenForest => &["Closed", "Open"],
            SettingKey::OpenKakariko => &["Closed", "Open"],
            SettingKey::OpenDoorOfTime => &["Closed", "Open"],
            SettingKey::ZorasFountain => &["Normal", "Adult", "Open"],
            SettingKey::GerudoFortress => &["Normal", "Fast", "Open"],
            SettingKey::RainbowBridge => &[
                "Vanilla",
                "Always Open",
                "Stones",
                "Medallions",
                "Dungeon Rewards",
                RANDOM_CHOICE,
            ],
            SettingKey::StartingAge => &["Child", "Adult", RANDOM_CHOICE],
            SettingKey::ShuffleKokiriSword => &["Off", "On"],
            SettingKey::ShuffleOcarinas => &["Off", "On"],
            SettingKey::ShuffleDungeonRewards => &["End of Dungeons", "Vanilla"],
            SettingKey::ItemPoolValue => &["Plentiful", "Balanced", "Scarce", "Minimal"],
            SettingKey::IceTraps => &["Off", "Normal", "Extra", "Mayhem", "Onslaught"],
            SettingKey::ProgressionRate => &["Slow", "Uniform", "Fast"],
            SettingKey::GenerateSpoilerLog => &["Off", "On"],
            SettingKey::Language => &["English", "French", "Spanish"],
        }
    }

    pub fn default_index(self) -> u8 {
        match self {
            SettingKey::OpenForest => 1,
            SettingKey::OpenDoorOfTime => 1,
            SettingKey::GerudoFortress => 1,
            SettingKey::ShuffleKokiriSword => 1,
            SettingKey::ItemPoolValue => 1,
            SettingKey::IceTraps => 1,
            SettingKey::ProgressionRate => 1,
            SettingKey::GenerateSpoilerLog => 1,
            _ => 0,
        }
    }

    pub fn choice_index(self, choice: &str) -> Option<u8> {
        self.choices()
            .iter()
            .position(|&c| c == choice)
            .map(|i| i as u8)
    }

    pub fn has_random_choice(self) -> bool {
        self.choices().last() == Some(&RANDOM_CHOICE)
    }

    pub fn is_random_choice(self, value: u8) -> bool {
        self.has_random_choice() && value as usize == self.choices().len() - 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogicMode {
    Glitchless,
    Glitched,
    NoLogic,
    Vanilla,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum StartingAge {
    Child,
    Adult,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum RainbowBridge {
    Vanilla,
    AlwaysOpen,
    Stones,
    Medallions,
    DungeonRewards,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum DungeonRewardShuffle {
    EndOfDungeons,
    Vanilla,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemPoolValue {
    Plentiful,
    Balanced,
    Scarce,
    Minimal,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum IceTraps {
    Off,
    Normal,
    Extra,
    Mayhem,
    Onslaught,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProgressionRate {
    Slow,
    Uniform,
    Fast,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_defaults_in_range() {
        for key in SettingKey::iter() {
            let idx = key.default_index() as usize;
            assert!(idx < key.choices().len(), "{key} default out of range");
            assert!(!key.is_random_choice(idx as u8));
        }
    }

    #[test]
    fn test_choice_lookup() {
        let key = SettingKey::from_str("RainbowBridge").unwrap();
        assert_eq!(key.choice_index("Medallions"), Some(3));
        assert!(key.is_random_choice(5));
        assert!(!SettingKey::Logic.has_random_choice());
        assert_eq!(
            RainbowBridge::try_from(key.choice_index("Stones").unwrap()).unwrap(),
            RainbowBridge::Stones
        );
    }
}
