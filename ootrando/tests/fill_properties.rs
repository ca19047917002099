use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use ootrando::playthrough::PlaythroughAnalyzer;
use ootrando::prng::SeedRng;
use ootrando::randomize::item_pool::build_item_pool;
use ootrando::randomize::{fill, Overrides};
use ootrando::settings::{build_menus, resolve_settings, RawSettings, ResolvedSettings};
use ootrando::traverse::is_beatable;
use ootrando_game::options::LogicMode;
use ootrando_game::{GameData, ItemIdx, LocationIdx, SettingKey};

fn fill_seed(
    game_data: &GameData,
    raw: &RawSettings,
    excluded: &BTreeSet<LocationIdx>,
    seed: u32,
) -> Result<(ResolvedSettings, Overrides)> {
    let menus = build_menus(game_data);
    let mut rng = SeedRng::new(seed);
    let settings = resolve_settings(raw, excluded, game_data, &menus, &mut rng);
    match fill(game_data, &settings, &mut rng) {
        Ok(overrides) => Ok((settings, overrides)),
        Err(e) => bail!("seed {seed} failed with status {}: {e}", e.code()),
    }
}

fn placements(game_data: &GameData, overrides: &Overrides) -> Vec<Option<ItemIdx>> {
    (0..game_data.locations.len())
        .map(|loc| overrides.get(&loc).copied())
        .collect()
}

fn check_pool_conservation(
    game_data: &GameData,
    settings: &ResolvedSettings,
    overrides: &Overrides,
) -> Result<()> {
    let pool = build_item_pool(game_data, settings)?;
    assert_eq!(overrides.len(), game_data.locations.len());

    let mut counts = vec![0; game_data.items.len()];
    for loc in &pool.shuffled_locations {
        counts[overrides[loc]] += 1;
    }
    assert_eq!(counts, pool.counts);

    let mut rewards: Vec<ItemIdx> = pool.reward_locations.iter().map(|loc| overrides[loc]).collect();
    let mut expected_rewards = pool.reward_items.clone();
    rewards.sort();
    expected_rewards.sort();
    assert_eq!(rewards, expected_rewards);

    for (loc, item) in &pool.fixed {
        assert_eq!(overrides[loc], *item);
    }
    Ok(())
}

fn check_beatable(game_data: &GameData, settings: &ResolvedSettings, overrides: &Overrides) {
    let placements = placements(game_data, overrides);
    assert!(is_beatable(game_data, settings, &placements, |_| true));
}

#[test]
fn test_pool_conservation() -> Result<()> {
    let game_data = GameData::load_builtin()?;
    let pools: [&[(SettingKey, u8)]; 3] = [
        &[],
        &[(SettingKey::ItemPoolValue, 0), (SettingKey::IceTraps, 3)],
        &[
            (SettingKey::ItemPoolValue, 3),
            (SettingKey::ShuffleOcarinas, 1),
            (SettingKey::ShuffleKokiriSword, 0),
        ],
    ];
    for pairs in pools {
        let raw: RawSettings = pairs.iter().copied().collect();
        for seed in 1..=5 {
            let (settings, overrides) = fill_seed(&game_data, &raw, &BTreeSet::new(), seed)?;
            check_pool_conservation(&game_data, &settings, &overrides)?;
            check_beatable(&game_data, &settings, &overrides);
        }
    }
    Ok(())
}

#[test]
fn test_excluded_locations_hold_junk() -> Result<()> {
    let game_data = GameData::load_builtin()?;
    let excluded: BTreeSet<LocationIdx> = [
        "LH Child Fishing",
        "KF Mido Top Left Chest",
        "Forest Temple Bow Chest",
        "ToT Light Arrows Cutscene",
    ]
    .into_iter()
    .map(|name| game_data.location_idx(name))
    .collect::<Result<_>>()?;

    for seed in 1..=5 {
        let (settings, overrides) = fill_seed(&game_data, &RawSettings::new(), &excluded, seed)?;
        assert_eq!(settings.excluded_locations, excluded);
        for loc in &excluded {
            let item = overrides[loc];
            assert!(
                !game_data.is_advancement(item),
                "{} holds {}",
                game_data.location_name(*loc),
                game_data.item_name(item)
            );
        }
        check_pool_conservation(&game_data, &settings, &overrides)?;
        check_beatable(&game_data, &settings, &overrides);
    }
    Ok(())
}

#[test]
fn test_way_of_the_hero_soundness() -> Result<()> {
    let game_data = GameData::load_builtin()?;
    let raw: RawSettings = [(SettingKey::ProgressionRate, 2)].into_iter().collect();
    for seed in 1..=3 {
        let (settings, overrides) = fill_seed(&game_data, &raw, &BTreeSet::new(), seed)?;
        let result = PlaythroughAnalyzer::new(&game_data, &settings, &overrides).analyze();
        assert!(result.playthrough_beatable);

        let placements = placements(&game_data, &overrides);
        let woth: BTreeSet<LocationIdx> = result.woth_locations.iter().copied().collect();
        let playthrough: BTreeSet<LocationIdx> =
            result.playthrough_locations.iter().flatten().copied().collect();
        assert!(woth.is_subset(&playthrough));
        for loc in 0..game_data.locations.len() {
            if !game_data.is_advancement(overrides[&loc]) {
                assert!(!woth.contains(&loc));
                continue;
            }
            let beatable_without = is_beatable(&game_data, &settings, &placements, |x| x != loc);
            assert_eq!(
                beatable_without,
                !woth.contains(&loc),
                "{}",
                game_data.location_name(loc)
            );
        }
    }
    Ok(())
}

#[test]
fn test_logic_scenarios() -> Result<()> {
    let game_data = GameData::load_builtin()?;
    let scenarios: [&[(SettingKey, u8)]; 8] = [
        &[(SettingKey::Logic, 1)],
        &[(SettingKey::Logic, 2)],
        &[(SettingKey::StartingAge, 1), (SettingKey::OpenDoorOfTime, 0)],
        &[(SettingKey::RainbowBridge, 3), (SettingKey::ShuffleDungeonRewards, 0)],
        &[(SettingKey::ProgressionRate, 0), (SettingKey::ZorasFountain, 2)],
        &[(SettingKey::ProgressionRate, 0)],
        &[(SettingKey::OpenDoorOfTime, 0)],
        &[
            (SettingKey::OpenForest, 0),
            (SettingKey::OpenDoorOfTime, 0),
            (SettingKey::ProgressionRate, 0),
        ],
    ];
    for pairs in scenarios {
        let raw: RawSettings = pairs.iter().copied().collect();
        for seed in 1..=5 {
            let (settings, overrides) = fill_seed(&game_data, &raw, &BTreeSet::new(), seed)
                .with_context(|| format!("settings {pairs:?}"))?;
            check_pool_conservation(&game_data, &settings, &overrides)?;
            if settings.logic() != LogicMode::NoLogic {
                check_beatable(&game_data, &settings, &overrides);
            }
        }
    }
    Ok(())
}
