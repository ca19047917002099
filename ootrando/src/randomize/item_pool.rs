use log::info;
use ootrando_game::options::{IceTraps, ItemPoolValue};
use ootrando_game::{GameData, ItemIdx, LocationIdx, LocationKind};

use super::FillError;
use crate::settings::ResolvedSettings;

/// Everything the fill has to place, split into the part decided up front and the shuffled pool.
#[derive(Clone, Debug)]
pub struct ItemPool {
    // Unshuffled items, always at their vanilla location.
    pub fixed: Vec<(LocationIdx, ItemIdx)>,
    // Boss locations and the dungeon rewards that go to them.
    pub reward_locations: Vec<LocationIdx>,
    pub reward_items: Vec<ItemIdx>,
    // Copies of each item to be shuffled, indexed by ItemIdx.
    pub counts: Vec<usize>,
    // Locations filled by the shuffled pool.
    pub shuffled_locations: Vec<LocationIdx>,
}

impl ItemPool {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn junk_count(&self, game_data: &GameData) -> usize {
        self.counts
            .iter()
            .enumerate()
            .filter(|(i, _)| !game_data.is_advancement(*i))
            .map(|(_, &c)| c)
            .sum()
    }
}

// Swaps up to `n` junk copies (taken from `from`, in order) for `to`. Returns how many were swapped.
fn convert(counts: &mut [usize], from: &[ItemIdx], to: ItemIdx, n: usize) -> usize {
    let mut converted = 0;
    for &item in from {
        if item == to {
            continue;
        }
        while converted < n && counts[item] > 0 {
            counts[item] -= 1;
            counts[to] += 1;
            converted += 1;
        }
    }
    converted
}

pub fn build_item_pool(
    game_data: &GameData,
    settings: &ResolvedSettings,
) -> Result<ItemPool, FillError> {
    let mut pool = ItemPool {
        fixed: vec![],
        reward_locations: vec![],
        reward_items: vec![],
        counts: vec![0; game_data.items.len()],
        shuffled_locations: vec![],
    };
    for (loc_idx, loc) in game_data.locations.iter().enumerate() {
        if loc.kind == LocationKind::Boss {
            pool.reward_locations.push(loc_idx);
            pool.reward_items.push(loc.vanilla_item);
        } else if settings.is_fixed_location(game_data, loc_idx) {
            pool.fixed.push((loc_idx, loc.vanilla_item));
        } else {
            pool.shuffled_locations.push(loc_idx);
            pool.counts[loc.vanilla_item] += 1;
        }
    }

    let cfg = &game_data.pool;
    match settings.item_pool_value() {
        ItemPoolValue::Plentiful => {
            for &item in &cfg.plentiful {
                if convert(&mut pool.counts, &cfg.rupees, item, 1) == 0 {
                    pool.counts[item] += 1;
                }
            }
        }
        ItemPoolValue::Balanced => {}
        ItemPoolValue::Scarce => {
            let n = pool.counts[cfg.heart_piece] / 2;
            convert(&mut pool.counts, &[cfg.heart_piece], cfg.heart_replacement, n);
        }
        ItemPoolValue::Minimal => {
            let n = pool.counts[cfg.heart_piece];
            convert(&mut pool.counts, &[cfg.heart_piece], cfg.heart_replacement, n);
        }
    }

    let num_traps = match settings.ice_traps() {
        IceTraps::Off => 0,
        IceTraps::Normal => 1,
        IceTraps::Extra => 3,
        IceTraps::Mayhem => 6,
        IceTraps::Onslaught => usize::MAX,
    };
    if num_traps > 0 {
        let n = convert(&mut pool.counts, &cfg.rupees, cfg.ice_trap, num_traps);
        info!("Converted {n} rupee(s) to ice traps");
    }

    let num_slots = pool.shuffled_locations.len();
    let total = pool.total();
    if total > num_slots {
        return Err(FillError::PoolOverflow);
    }
    pool.counts[cfg.filler_item] += num_slots - total;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::SeedRng;
    use crate::settings::{build_menus, resolve_settings, RawSettings};
    use ootrando_game::SettingKey;
    use std::collections::BTreeSet;

    fn pool_with(pairs: &[(SettingKey, u8)]) -> (GameData, ItemPool) {
        let game_data = GameData::load_builtin().unwrap();
        let raw: RawSettings = pairs.iter().copied().collect();
        let menus = build_menus(&game_data);
        let settings =
            resolve_settings(&raw, &BTreeSet::new(), &game_data, &menus, &mut SeedRng::new(0));
        let pool = build_item_pool(&game_data, &settings).unwrap();
        (game_data, pool)
    }

    #[test]
    fn test_pool_matches_locations() {
        let (game_data, pool) = pool_with(&[(SettingKey::IceTraps, 0)]);
        assert_eq!(pool.total(), pool.shuffled_locations.len());
        assert_eq!(
            pool.total() + pool.fixed.len() + pool.reward_locations.len(),
            game_data.locations.len()
        );
        // Shuffle Ocarinas is off by default.
        let ocarina = game_data.item_idx("Ocarina").unwrap();
        assert_eq!(pool.counts[ocarina], 0);
        assert_eq!(pool.fixed.len(), 1);
    }

    #[test]
    fn test_item_pool_value() {
        let (game_data, balanced) = pool_with(&[(SettingKey::IceTraps, 0)]);
        let heart = game_data.pool.heart_piece;
        let (_, scarce) = pool_with(&[(SettingKey::IceTraps, 0), (SettingKey::ItemPoolValue, 2)]);
        assert_eq!(scarce.counts[heart], balanced.counts[heart] - balanced.counts[heart] / 2);
        let (_, minimal) = pool_with(&[(SettingKey::IceTraps, 0), (SettingKey::ItemPoolValue, 3)]);
        assert_eq!(minimal.counts[heart], 0);

        let (_, plentiful) =
            pool_with(&[(SettingKey::IceTraps, 0), (SettingKey::ItemPoolValue, 0)]);
        let hookshot = game_data.item_idx("Progressive Hookshot").unwrap();
        assert_eq!(plentiful.counts[hookshot], balanced.counts[hookshot] + 1);
        assert_eq!(plentiful.total(), balanced.total());
    }

    #[test]
    fn test_ice_traps() {
        let (game_data, pool) = pool_with(&[(SettingKey::IceTraps, 3)]);
        assert_eq!(pool.counts[game_data.pool.ice_trap], 6);
        let (game_data, pool) = pool_with(&[(SettingKey::IceTraps, 4)]);
        for &rupee in &game_data.pool.rupees {
            assert_eq!(pool.counts[rupee], 0);
        }
        assert_eq!(pool.total(), pool.shuffled_locations.len());
    }
}
