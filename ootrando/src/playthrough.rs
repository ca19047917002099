use hashbrown::HashSet;
use log::info;
use ootrando_game::{GameData, ItemIdx, LocationIdx};
use ootrando_logic::GlobalState;
use serde::Serialize;

use crate::randomize::Overrides;
use crate::settings::ResolvedSettings;
use crate::traverse::{is_beatable, traverse};

#[derive(Clone, Debug, Default, Serialize)]
pub struct PlaythroughResult {
    // Every placement, grouped by the sphere in which it first becomes reachable.
    pub spheres: Vec<Vec<LocationIdx>>,
    // Only the placements needed to win, regrouped into spheres.
    pub playthrough_locations: Vec<Vec<LocationIdx>>,
    pub woth_locations: Vec<LocationIdx>,
    pub playthrough_beatable: bool,
}

pub struct PlaythroughAnalyzer<'a> {
    game_data: &'a GameData,
    settings: &'a ResolvedSettings,
    placements: Vec<Option<ItemIdx>>,
}

impl<'a> PlaythroughAnalyzer<'a> {
    pub fn new(
        game_data: &'a GameData,
        settings: &'a ResolvedSettings,
        overrides: &Overrides,
    ) -> Self {
        let placements = (0..game_data.locations.len())
            .map(|loc| overrides.get(&loc).copied())
            .collect();
        PlaythroughAnalyzer {
            game_data,
            settings,
            placements,
        }
    }

    /// Sphere decomposition from the empty inventory. Items at locations rejected by
    /// `collectible` are neither collected nor listed. Returns the spheres and whether the win
    /// event was reached.
    pub fn compute_spheres<F: Fn(LocationIdx) -> bool>(
        &self,
        collectible: F,
    ) -> (Vec<Vec<LocationIdx>>, bool) {
        let mut global_state = GlobalState::new(self.game_data);
        let mut collected = vec![false; self.placements.len()];
        let mut spheres: Vec<Vec<LocationIdx>> = vec![];
        loop {
            let result = traverse(self.game_data, self.settings, &global_state.inventory);
            if result.events[self.game_data.win_event] {
                return (spheres, true);
            }
            let sphere: Vec<LocationIdx> = (0..self.placements.len())
                .filter(|&loc| {
                    !collected[loc]
                        && self.placements[loc].is_some()
                        && result.locations[loc]
                        && collectible(loc)
                })
                .collect();
            if sphere.is_empty() {
                return (spheres, false);
            }
            for &loc in &sphere {
                collected[loc] = true;
                if let Some(item) = self.placements[loc] {
                    global_state.collect(item);
                }
            }
            spheres.push(sphere);
        }
    }

    fn beatable_with<F: Fn(LocationIdx) -> bool>(&self, collectible: F) -> bool {
        is_beatable(self.game_data, self.settings, &self.placements, collectible)
    }

    fn is_advancement_at(&self, loc: LocationIdx) -> bool {
        self.placements[loc].is_some_and(|item| self.game_data.is_advancement(item))
    }

    pub fn analyze(&self) -> PlaythroughResult {
        let (spheres, playthrough_beatable) = self.compute_spheres(|_| true);
        if !playthrough_beatable {
            return PlaythroughResult {
                spheres,
                playthrough_beatable,
                ..Default::default()
            };
        }

        // Drop advancement placements latest first, as long as the game stays beatable.
        let candidates: Vec<LocationIdx> = spheres
            .iter()
            .flatten()
            .copied()
            .filter(|&loc| self.is_advancement_at(loc))
            .collect();
        let mut kept: HashSet<LocationIdx> = candidates.iter().copied().collect();
        for &loc in candidates.iter().rev() {
            kept.remove(&loc);
            if !self.beatable_with(|x| kept.contains(&x)) {
                kept.insert(loc);
            }
        }
        let (playthrough_locations, _) = self.compute_spheres(|x| kept.contains(&x));

        let woth_locations: Vec<LocationIdx> = playthrough_locations
            .iter()
            .flatten()
            .copied()
            .filter(|&loc| !self.beatable_with(|x| x != loc))
            .collect();
        info!(
            "Playthrough: {} spheres, {} required placements, {} way of the hero",
            playthrough_locations.len(),
            kept.len(),
            woth_locations.len()
        );

        PlaythroughResult {
            spheres,
            playthrough_locations,
            woth_locations,
            playthrough_beatable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::SeedRng;
    use crate::randomize::vanilla_fill;
    use crate::settings::{build_menus, resolve_settings, RawSettings};
    use std::collections::BTreeSet;

    #[test]
    fn test_vanilla_playthrough() {
        let game_data = GameData::load_builtin().unwrap();
        let menus = build_menus(&game_data);
        let settings = resolve_settings(
            &RawSettings::new(),
            &BTreeSet::new(),
            &game_data,
            &menus,
            &mut SeedRng::new(0),
        );
        let overrides = vanilla_fill(&game_data);
        let analyzer = PlaythroughAnalyzer::new(&game_data, &settings, &overrides);
        let result = analyzer.analyze();
        assert!(result.playthrough_beatable);

        let light_arrows = game_data.location_idx("ToT Light Arrows Cutscene").unwrap();
        let bow = game_data.location_idx("Forest Temple Bow Chest").unwrap();
        assert!(result.woth_locations.contains(&light_arrows));
        assert!(result.woth_locations.contains(&bow));
        for &loc in &result.woth_locations {
            assert!(game_data.is_advancement(overrides[&loc]));
        }
        let junk = game_data.location_idx("KF Mido Top Left Chest").unwrap();
        assert!(!result.playthrough_locations.iter().flatten().any(|&x| x == junk));
        assert!(result.spheres.iter().flatten().any(|&x| x == junk));
    }
}
