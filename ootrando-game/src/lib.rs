pub mod options;

use anyhow::{bail, ensure, Context, Result};
use hashbrown::HashMap;
use json::JsonValue;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::hash::Hash;
use std::path::Path;
use std::str::FromStr;
use strum_macros::{EnumString, VariantNames};

pub use options::SettingKey;

pub type ItemIdx = usize; // Index into GameData.item_isv.keys
pub type LocationIdx = usize; // Index into GameData.location_isv.keys (and GameData.locations)
pub type RegionIdx = usize; // Index into GameData.region_isv.keys (and GameData.regions)
pub type EventIdx = usize; // Index into GameData.event_isv.keys
pub type HelperIdx = usize; // Index into GameData.helper_isv.keys (and GameData.helpers)
pub type GlitchIdx = usize; // Index into GameData.glitch_isv.keys
pub type AreaIdx = usize; // Index into GameData.area_isv.keys

const BUILTIN_WORLD: &str = include_str!("../data/world.json");

#[derive(Default, Clone)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    Stone,
    Medallion,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum LocationKind {
    Chest,
    Npc,
    Song,
    Boss,
    Freestanding,
}

#[derive(Clone, Debug)]
pub struct ItemData {
    pub name: String,
    // Advancement items can unlock further locations; everything else is junk.
    pub advancement: bool,
    pub progressive: bool,
    pub reward: Option<RewardKind>,
}

#[derive(Clone, Debug)]
pub struct LocationData {
    pub name: String,
    pub region_idx: RegionIdx,
    pub area_idx: AreaIdx,
    pub kind: LocationKind,
    pub vanilla_item: ItemIdx,
    pub requires: Requirement,
}

#[derive(Clone, Debug)]
pub struct Exit {
    pub to: RegionIdx,
    pub requires: Requirement,
}

#[derive(Clone, Debug)]
pub struct RegionData {
    pub name: String,
    pub area_idx: AreaIdx,
    pub exits: Vec<Exit>,
    pub events: Vec<(EventIdx, Requirement)>,
    pub locations: Vec<LocationIdx>,
}

// Items with a special role when the item pool is assembled.
#[derive(Clone, Debug, Default)]
pub struct PoolConfig {
    pub filler_item: ItemIdx,
    pub heart_piece: ItemIdx,
    pub heart_replacement: ItemIdx,
    pub ice_trap: ItemIdx,
    pub rupees: Vec<ItemIdx>,
    pub plentiful: Vec<ItemIdx>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Requirement {
    Free,
    Never,
    Child,
    Adult,
    Item(ItemIdx, u8),
    Event(EventIdx),
    Helper(HelperIdx),
    Setting(SettingKey, u8),
    Glitch(GlitchIdx),
    Stones(u8),
    Medallions(u8),
    RainbowBridge,
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn make_and(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                return Requirement::Never;
            } else if let Requirement::Free = req {
                continue;
            } else if let Requirement::And(and_reqs) = req {
                out_reqs.extend(and_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::And(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Free)
        }
    }

    pub fn make_or(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                continue;
            } else if let Requirement::Free = req {
                return Requirement::Free;
            } else if let Requirement::Or(or_reqs) = req {
                out_reqs.extend(or_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::Or(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Never)
        }
    }
}

#[derive(Default, Clone)]
pub struct GameData {
    pub item_isv: IndexedVec<String>,
    pub items: Vec<ItemData>,
    pub event_isv: IndexedVec<String>,
    pub glitch_isv: IndexedVec<String>,
    pub helper_isv: IndexedVec<String>,
    pub helpers: Vec<Requirement>,
    pub area_isv: IndexedVec<String>,
    pub region_isv: IndexedVec<String>,
    pub regions: Vec<RegionData>,
    pub location_isv: IndexedVec<String>,
    pub locations: Vec<LocationData>,
    pub start_region: RegionIdx,
    pub time_travel_region: RegionIdx,
    pub time_travel_event: EventIdx,
    pub win_event: EventIdx,
    pub pool: PoolConfig,
    pub hash_icons: Vec<String>,
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let file = File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
    let json_str = std::io::read_to_string(file)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let json_data =
        json::parse(&json_str).with_context(|| format!("unable to parse {}", path.display()))?;
    Ok(json_data)
}

fn json_str<'a>(value: &'a JsonValue, field: &str) -> Result<&'a str> {
    value[field]
        .as_str()
        .with_context(|| format!("missing/invalid '{field}' in {value}"))
}

impl GameData {
    pub fn item_idx(&self, name: &str) -> Result<ItemIdx> {
        self.item_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("Unknown item '{name}'"))
    }

    pub fn location_idx(&self, name: &str) -> Result<LocationIdx> {
        self.location_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("Unknown location '{name}'"))
    }

    pub fn event_idx(&self, name: &str) -> Result<EventIdx> {
        self.event_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("Unknown event '{name}'"))
    }

    pub fn is_advancement(&self, item: ItemIdx) -> bool {
        self.items[item].advancement
    }

    pub fn item_name(&self, item: ItemIdx) -> &str {
        &self.items[item].name
    }

    pub fn location_name(&self, loc: LocationIdx) -> &str {
        &self.locations[loc].name
    }

    pub fn location_area(&self, loc: LocationIdx) -> &str {
        &self.area_isv.keys[self.locations[loc].area_idx]
    }

    fn parse_requirement_list(&self, value: &JsonValue) -> Result<Vec<Requirement>> {
        ensure!(value.is_array(), "Expected array in {}", value);
        value.members().map(|x| self.parse_requirement(x)).collect()
    }

    pub fn parse_requirement(&self, req_json: &JsonValue) -> Result<Requirement> {
        if let Some(value) = req_json.as_str() {
            if value == "free" {
                return Ok(Requirement::Free);
            } else if value == "never" {
                return Ok(Requirement::Never);
            } else if value == "child" {
                return Ok(Requirement::Child);
            } else if value == "adult" {
                return Ok(Requirement::Adult);
            } else if value == "canOpenBridge" {
                return Ok(Requirement::RainbowBridge);
            } else if let Some(&item_idx) = self.item_isv.index_by_key.get(value) {
                return Ok(Requirement::Item(item_idx, 1));
            } else if let Some(&event_idx) = self.event_isv.index_by_key.get(value) {
                return Ok(Requirement::Event(event_idx));
            } else if let Some(&helper_idx) = self.helper_isv.index_by_key.get(value) {
                return Ok(Requirement::Helper(helper_idx));
            }
            bail!("Unknown requirement name '{}'", value);
        } else if req_json.is_object() && req_json.len() == 1 {
            let Some((key, value)) = req_json.entries().next() else {
                bail!("Empty requirement object");
            };
            if key == "and" {
                return Ok(Requirement::make_and(self.parse_requirement_list(value)?));
            } else if key == "or" {
                return Ok(Requirement::make_or(self.parse_requirement_list(value)?));
            } else if key == "item" {
                let name = json_str(value, "name")?;
                let count = value["count"].as_u8().unwrap_or(1);
                ensure!(count >= 1, "Item count must be positive in {}", req_json);
                return Ok(Requirement::Item(self.item_idx(name)?, count));
            } else if key == "setting" {
                let key_name = json_str(value, "key")?;
                let setting_key = SettingKey::from_str(key_name)
                    .with_context(|| format!("Unknown setting '{key_name}'"))?;
                let choice = json_str(value, "value")?;
                let choice_idx = setting_key
                    .choice_index(choice)
                    .with_context(|| format!("Unknown choice '{choice}' for {setting_key}"))?;
                return Ok(Requirement::Setting(setting_key, choice_idx));
            } else if key == "glitch" {
                let name = value
                    .as_str()
                    .with_context(|| format!("Invalid glitch in {req_json}"))?;
                let glitch_idx = self
                    .glitch_isv
                    .index_by_key
                    .get(name)
                    .with_context(|| format!("Unknown glitch '{name}'"))?;
                return Ok(Requirement::Glitch(*glitch_idx));
            } else if key == "stones" {
                let count = value
                    .as_u8()
                    .with_context(|| format!("Invalid stone count in {req_json}"))?;
                return Ok(Requirement::Stones(count));
            } else if key == "medallions" {
                let count = value
                    .as_u8()
                    .with_context(|| format!("Invalid medallion count in {req_json}"))?;
                return Ok(Requirement::Medallions(count));
            }
        }
        bail!("Unable to parse requirement: {}", req_json);
    }

    fn load_items(&mut self, json: &JsonValue) -> Result<()> {
        for item_json in json["items"].members() {
            let name = json_str(item_json, "name")?;
            ensure!(
                !self.item_isv.index_by_key.contains_key(name),
                "Duplicate item '{}'",
                name
            );
            let reward = match item_json["reward"].as_str() {
                None => None,
                Some("stone") => Some(RewardKind::Stone),
                Some("medallion") => Some(RewardKind::Medallion),
                Some(x) => bail!("Unexpected reward kind '{}' for {}", x, name),
            };
            self.item_isv.add(name);
            self.items.push(ItemData {
                name: name.to_string(),
                advancement: item_json["advancement"].as_bool().unwrap_or(false),
                progressive: item_json["progressive"].as_bool().unwrap_or(false),
                reward,
            });
        }
        ensure!(!self.items.is_empty(), "No items defined");
        Ok(())
    }

    fn load_pool_config(&mut self, json: &JsonValue) -> Result<()> {
        let pool_json = &json["pool"];
        self.pool = PoolConfig {
            filler_item: self.item_idx(json_str(pool_json, "filler")?)?,
            heart_piece: self.item_idx(json_str(pool_json, "heartPiece")?)?,
            heart_replacement: self.item_idx(json_str(pool_json, "heartReplacement")?)?,
            ice_trap: self.item_idx(json_str(pool_json, "iceTrap")?)?,
            rupees: pool_json["rupees"]
                .members()
                .map(|x| self.item_idx(x.as_str().unwrap_or_default()))
                .collect::<Result<Vec<_>>>()?,
            plentiful: pool_json["plentiful"]
                .members()
                .map(|x| self.item_idx(x.as_str().unwrap_or_default()))
                .collect::<Result<Vec<_>>>()?,
        };
        for &item in [self.pool.filler_item, self.pool.heart_replacement, self.pool.ice_trap]
            .iter()
            .chain(&self.pool.rupees)
        {
            ensure!(
                !self.items[item].advancement,
                "Pool filler '{}' must not be an advancement item",
                self.items[item].name
            );
        }
        Ok(())
    }

    // Names are registered before any requirement is parsed, so that helpers, exits and
    // events may refer to each other regardless of the order they appear in.
    fn register_names(&mut self, json: &JsonValue) -> Result<()> {
        for glitch in json["glitches"].members() {
            let name = glitch
                .as_str()
                .with_context(|| format!("Invalid glitch name {glitch}"))?;
            self.glitch_isv.add(name);
        }
        for helper_json in json["helpers"].members() {
            let name = json_str(helper_json, "name")?;
            ensure!(
                !self.helper_isv.index_by_key.contains_key(name),
                "Duplicate helper '{}'",
                name
            );
            self.helper_isv.add(name);
        }
        for region_json in json["regions"].members() {
            let name = json_str(region_json, "name")?;
            ensure!(
                !self.region_isv.index_by_key.contains_key(name),
                "Duplicate region '{}'",
                name
            );
            self.region_isv.add(name);
            for event_json in region_json["events"].members() {
                self.event_isv.add(json_str(event_json, "name")?);
            }
        }
        Ok(())
    }

    fn load_helpers(&mut self, json: &JsonValue) -> Result<()> {
        for helper_json in json["helpers"].members() {
            let name = json_str(helper_json, "name")?;
            let req = self
                .parse_requirement(&helper_json["requires"])
                .with_context(|| format!("Parsing helper '{name}'"))?;
            self.helpers.push(req);
        }
        Ok(())
    }

    fn region_idx(&self, name: &str) -> Result<RegionIdx> {
        self.region_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("Unknown region '{name}'"))
    }

    fn load_regions(&mut self, json: &JsonValue) -> Result<()> {
        for (region_idx, region_json) in json["regions"].members().enumerate() {
            let region_name = json_str(region_json, "name")?;
            let area_idx = self.area_isv.add(json_str(region_json, "area")?);
            let mut region = RegionData {
                name: region_name.to_string(),
                area_idx,
                exits: vec![],
                events: vec![],
                locations: vec![],
            };
            for exit_json in region_json["exits"].members() {
                let to = self.region_idx(json_str(exit_json, "to")?)?;
                let requires = self
                    .parse_requirement(&exit_json["requires"])
                    .with_context(|| format!("Parsing exit from '{region_name}'"))?;
                region.exits.push(Exit { to, requires });
            }
            for event_json in region_json["events"].members() {
                let event_idx = self.event_idx(json_str(event_json, "name")?)?;
                let requires = self
                    .parse_requirement(&event_json["requires"])
                    .with_context(|| format!("Parsing event in '{region_name}'"))?;
                region.events.push((event_idx, requires));
            }
            for loc_json in region_json["locations"].members() {
                let loc_name = json_str(loc_json, "name")?;
                ensure!(
                    !self.location_isv.index_by_key.contains_key(loc_name),
                    "Duplicate location '{}'",
                    loc_name
                );
                let kind_str = json_str(loc_json, "kind")?;
                let kind = LocationKind::from_str(kind_str)
                    .with_context(|| format!("Unknown location kind '{kind_str}'"))?;
                let requires = self
                    .parse_requirement(&loc_json["requires"])
                    .with_context(|| format!("Parsing location '{loc_name}'"))?;
                let loc_idx = self.location_isv.add(loc_name);
                self.locations.push(LocationData {
                    name: loc_name.to_string(),
                    region_idx,
                    area_idx,
                    kind,
                    vanilla_item: self.item_idx(json_str(loc_json, "vanillaItem")?)?,
                    requires,
                });
                region.locations.push(loc_idx);
            }
            self.regions.push(region);
        }
        Ok(())
    }

    fn from_json(json: &JsonValue) -> Result<GameData> {
        let mut game_data = GameData::default();
        game_data.load_items(json)?;
        game_data.load_pool_config(json)?;
        game_data.register_names(json)?;
        game_data.load_helpers(json)?;
        game_data.load_regions(json)?;
        game_data.start_region = game_data.region_idx(json_str(json, "startRegion")?)?;
        game_data.time_travel_region =
            game_data.region_idx(json_str(&json["timeTravel"], "region")?)?;
        game_data.time_travel_event = game_data.event_idx(json_str(&json["timeTravel"], "event")?)?;
        game_data.win_event = game_data.event_idx(json_str(json, "winEvent")?)?;
        game_data.hash_icons = json["hashIcons"]
            .members()
            .filter_map(|x| x.as_str().map(|s| s.to_string()))
            .collect();
        ensure!(!game_data.locations.is_empty(), "No locations defined");
        ensure!(
            !game_data.hash_icons.is_empty(),
            "At least one hash icon is required"
        );
        Ok(game_data)
    }

    pub fn load(world_path: &Path) -> Result<GameData> {
        let json = read_json(world_path)?;
        Self::from_json(&json).with_context(|| format!("loading {}", world_path.display()))
    }

    pub fn load_builtin() -> Result<GameData> {
        let json = json::parse(BUILTIN_WORLD).context("unable to parse built-in world")?;
        Self::from_json(&json).context("loading built-in world")
    }
}
