use ootrando_game::options::{LogicMode, RainbowBridge, StartingAge};
use ootrando_game::{GameData, ItemIdx, LocationIdx, Requirement};
use ootrando_logic::helpers::{count_medallions, count_stones, has_named};
use ootrando_logic::{Age, GlobalState, Inventory};

use crate::settings::ResolvedSettings;

/// Per-age accessibility of the world for one inventory.
#[derive(Clone, Debug)]
pub struct TraverseResult {
    pub region_access: Vec<[bool; 2]>,
    pub helpers: Vec<[bool; 2]>,
    pub events: Vec<bool>,
    pub locations: Vec<bool>,
}

impl TraverseResult {
    pub fn is_location_reachable(&self, loc: LocationIdx) -> bool {
        self.locations[loc]
    }

    pub fn num_reachable_locations(&self) -> usize {
        self.locations.iter().filter(|&&x| x).count()
    }
}

pub struct TraversalContext<'a> {
    pub game_data: &'a GameData,
    pub settings: &'a ResolvedSettings,
    pub inventory: &'a Inventory,
    logic: LogicMode,
}

impl<'a> TraversalContext<'a> {
    pub fn new(
        game_data: &'a GameData,
        settings: &'a ResolvedSettings,
        inventory: &'a Inventory,
    ) -> Self {
        TraversalContext {
            game_data,
            settings,
            inventory,
            logic: settings.logic(),
        }
    }

    fn bridge_open(&self) -> bool {
        let inv = self.inventory;
        let gd = self.game_data;
        match self.settings.rainbow_bridge() {
            RainbowBridge::Vanilla => {
                has_named(inv, gd, "Shadow Medallion")
                    && has_named(inv, gd, "Spirit Medallion")
                    && has_named(inv, gd, "Light Arrows")
            }
            RainbowBridge::AlwaysOpen => true,
            RainbowBridge::Stones => count_stones(inv, gd) >= 3,
            RainbowBridge::Medallions => count_medallions(inv, gd) >= 6,
            RainbowBridge::DungeonRewards => count_stones(inv, gd) + count_medallions(inv, gd) >= 9,
        }
    }

    pub fn is_met(&self, req: &Requirement, age: Age, helpers: &[[bool; 2]], events: &[bool]) -> bool {
        if self.logic == LogicMode::NoLogic {
            return *req != Requirement::Never;
        }
        match req {
            Requirement::Free => true,
            Requirement::Never => false,
            Requirement::Child => age == Age::Child,
            Requirement::Adult => age == Age::Adult,
            Requirement::Item(item, count) => self.inventory.has(*item, *count),
            Requirement::Event(event) => events[*event],
            Requirement::Helper(helper) => helpers[*helper][age.index()],
            Requirement::Setting(key, value) => self.settings.get(*key) == *value,
            Requirement::Glitch(_) => self.logic == LogicMode::Glitched,
            Requirement::Stones(n) => count_stones(self.inventory, self.game_data) >= *n,
            Requirement::Medallions(n) => count_medallions(self.inventory, self.game_data) >= *n,
            Requirement::RainbowBridge => self.bridge_open(),
            Requirement::And(reqs) => reqs.iter().all(|r| self.is_met(r, age, helpers, events)),
            Requirement::Or(reqs) => reqs.iter().any(|r| self.is_met(r, age, helpers, events)),
        }
    }
}

fn set(flag: &mut bool) -> bool {
    if *flag {
        false
    } else {
        *flag = true;
        true
    }
}

/// Fixed-point propagation of helpers, exits, events and time travel.
pub fn traverse(
    game_data: &GameData,
    settings: &ResolvedSettings,
    inventory: &Inventory,
) -> TraverseResult {
    let ctx = TraversalContext::new(game_data, settings, inventory);
    let num_regions = game_data.regions.len();
    let mut region_access = vec![[false; 2]; num_regions];
    let mut helpers = vec![[false; 2]; game_data.helpers.len()];
    let mut events = vec![false; game_data.event_isv.len()];

    let start_age = match settings.starting_age() {
        StartingAge::Child => Age::Child,
        StartingAge::Adult => Age::Adult,
    };
    region_access[game_data.start_region][start_age.index()] = true;

    loop {
        let mut changed = false;
        for (h, req) in game_data.helpers.iter().enumerate() {
            for age in Age::ALL {
                if !helpers[h][age.index()] && ctx.is_met(req, age, &helpers, &events) {
                    helpers[h][age.index()] = true;
                    changed = true;
                }
            }
        }
        for (r, region) in game_data.regions.iter().enumerate() {
            for age in Age::ALL {
                if !region_access[r][age.index()] {
                    continue;
                }
                for exit in &region.exits {
                    if !region_access[exit.to][age.index()]
                        && ctx.is_met(&exit.requires, age, &helpers, &events)
                    {
                        region_access[exit.to][age.index()] = true;
                        changed = true;
                    }
                }
                for (event, req) in &region.events {
                    if !events[*event] && ctx.is_met(req, age, &helpers, &events) {
                        events[*event] = true;
                        changed = true;
                    }
                }
            }
        }
        if events[game_data.time_travel_event] {
            let access = &mut region_access[game_data.time_travel_region];
            if access[0] || access[1] {
                changed |= set(&mut access[0]);
                changed |= set(&mut access[1]);
            }
        }
        if !changed {
            break;
        }
    }

    let locations = game_data
        .locations
        .iter()
        .map(|loc| {
            Age::ALL.iter().any(|&age| {
                region_access[loc.region_idx][age.index()]
                    && ctx.is_met(&loc.requires, age, &helpers, &events)
            })
        })
        .collect();

    TraverseResult {
        region_access,
        helpers,
        events,
        locations,
    }
}

/// Repeatedly collects every reachable placed item until nothing new becomes reachable.
/// Items at locations rejected by `collectible` are never picked up.
pub fn sweep<F: Fn(LocationIdx) -> bool>(
    game_data: &GameData,
    settings: &ResolvedSettings,
    placements: &[Option<ItemIdx>],
    collectible: F,
) -> (GlobalState, TraverseResult) {
    let mut global_state = GlobalState::new(game_data);
    let mut collected = vec![false; placements.len()];
    loop {
        let result = traverse(game_data, settings, &global_state.inventory);
        let mut any_new = false;
        for (loc, item) in placements.iter().enumerate() {
            let Some(item) = item else {
                continue;
            };
            if !collected[loc] && result.locations[loc] && collectible(loc) {
                collected[loc] = true;
                global_state.collect(*item);
                any_new = true;
            }
        }
        if !any_new {
            return (global_state, result);
        }
    }
}

pub fn is_beatable<F: Fn(LocationIdx) -> bool>(
    game_data: &GameData,
    settings: &ResolvedSettings,
    placements: &[Option<ItemIdx>],
    collectible: F,
) -> bool {
    let (_, result) = sweep(game_data, settings, placements, collectible);
    result.events[game_data.win_event]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::SeedRng;
    use crate::settings::{build_menus, resolve_settings, RawSettings};
    use ootrando_game::SettingKey;
    use std::collections::BTreeSet;

    fn settings_with(game_data: &GameData, pairs: &[(SettingKey, u8)]) -> ResolvedSettings {
        let raw: RawSettings = pairs.iter().copied().collect();
        let menus = build_menus(game_data);
        resolve_settings(&raw, &BTreeSet::new(), game_data, &menus, &mut SeedRng::new(0))
    }

    #[test]
    fn test_empty_inventory() {
        let game_data = GameData::load_builtin().unwrap();
        let settings = settings_with(&game_data, &[]);
        let inventory = Inventory::new(game_data.items.len());
        let result = traverse(&game_data, &settings, &inventory);
        let gift = game_data.location_idx("LW Gift from Saria").unwrap();
        let ganon_chest = game_data
            .location_idx("Ganons Castle Golden Gauntlets Chest")
            .unwrap();
        assert!(result.is_location_reachable(gift));
        assert!(!result.is_location_reachable(ganon_chest));
        // Door of Time is open by default, so time travel is available from the start.
        let tot = game_data.time_travel_region;
        assert_eq!(result.region_access[tot], [true, true]);
        assert!(!result.events[game_data.win_event]);
    }

    #[test]
    fn test_closed_door_of_time() {
        let game_data = GameData::load_builtin().unwrap();
        let settings = settings_with(&game_data, &[(SettingKey::OpenDoorOfTime, 0)]);
        let inventory = Inventory::new(game_data.items.len());
        let result = traverse(&game_data, &settings, &inventory);
        let tot = game_data.time_travel_region;
        assert_eq!(result.region_access[tot], [true, false]);
    }

    #[test]
    fn test_no_logic_reaches_everything() {
        let game_data = GameData::load_builtin().unwrap();
        let settings = settings_with(&game_data, &[(SettingKey::Logic, 2)]);
        let inventory = Inventory::new(game_data.items.len());
        let result = traverse(&game_data, &settings, &inventory);
        assert_eq!(result.num_reachable_locations(), game_data.locations.len());
        assert!(result.events[game_data.win_event]);
    }

    #[test]
    fn test_glitch_only_in_glitched_logic() {
        let game_data = GameData::load_builtin().unwrap();
        let colossus = game_data.region_isv.index_by_key["Desert Colossus"];
        let mut inventory = Inventory::new(game_data.items.len());
        for name in [
            "Progressive Hookshot",
            "Progressive Hookshot",
            "Gerudo Membership Card",
        ] {
            inventory.items[game_data.item_idx(name).unwrap()] += 1;
        }
        let glitchless = settings_with(&game_data, &[]);
        let result = traverse(&game_data, &glitchless, &inventory);
        assert!(!result.region_access[colossus][Age::Adult.index()]);

        let glitched = settings_with(&game_data, &[(SettingKey::Logic, 1)]);
        let result = traverse(&game_data, &glitched, &inventory);
        assert!(result.region_access[colossus][Age::Adult.index()]);
    }

    #[test]
    fn test_vanilla_placement_beatable() {
        let game_data = GameData::load_builtin().unwrap();
        let settings = settings_with(&game_data, &[]);
        let placements: Vec<Option<ItemIdx>> = game_data
            .locations
            .iter()
            .map(|x| Some(x.vanilla_item))
            .collect();
        assert!(is_beatable(&game_data, &settings, &placements, |_| true));
        let light_arrows = game_data.location_idx("ToT Light Arrows Cutscene").unwrap();
        assert!(!is_beatable(&game_data, &settings, &placements, |loc| {
            loc != light_arrows
        }));
    }
}
