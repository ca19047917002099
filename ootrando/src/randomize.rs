pub mod item_pool;

use std::cmp::min;
use std::collections::BTreeMap;

use log::info;
use ootrando_game::options::{DungeonRewardShuffle, ProgressionRate};
use ootrando_game::{GameData, ItemIdx, LocationIdx};
use ootrando_logic::GlobalState;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::settings::ResolvedSettings;
use crate::traverse::traverse;
use item_pool::{build_item_pool, ItemPool};

pub type Overrides = BTreeMap<LocationIdx, ItemIdx>;

/// Number of attempts made by one call to `fill`, all drawing from the same generator.
pub const MAX_FILL_ATTEMPTS: usize = 5;

// Once this few key items remain, all of them are placed at once.
const KEY_ITEM_FINISH_THRESHOLD: usize = 5;

// Dungeon reward orders tried before falling back to the vanilla one.
const MAX_REWARD_SHUFFLES: usize = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum FillError {
    #[error("fill deadlock: key items remain but no reachable location is empty")]
    Deadlock,
    #[error("placed items do not make the game beatable")]
    NotBeatable,
    #[error("item pool is larger than the number of locations to fill")]
    PoolOverflow,
    #[error("not enough junk items to fill the excluded locations")]
    ExclusionConflict,
}

impl FillError {
    pub fn code(self) -> i32 {
        match self {
            FillError::Deadlock => -1,
            FillError::NotBeatable => -2,
            FillError::PoolOverflow => -3,
            FillError::ExclusionConflict => -4,
        }
    }
}

#[derive(Clone, Debug)]
struct ItemLocationState {
    placed_item: Option<ItemIdx>,
    collected: bool,
    reachable_step: Option<usize>,
}

#[derive(Clone)]
struct RandomizationState {
    step_num: usize,
    item_precedence: Vec<ItemIdx>, // Advancement items, in the order they should be placed
    item_location_state: Vec<ItemLocationState>,
    items_remaining: Vec<usize>, // Copies of each item not yet placed, indexed by ItemIdx
    global_state: GlobalState,
    win_reachable: bool,
}

struct SelectItemsOutput {
    key_items: Vec<ItemIdx>,
    filler_items: Vec<ItemIdx>,
}

pub struct Randomizer<'a> {
    game_data: &'a GameData,
    settings: &'a ResolvedSettings,
    pool: ItemPool,
}

/// Places every location's vanilla item. Draws nothing from the generator.
pub fn vanilla_fill(game_data: &GameData) -> Overrides {
    game_data
        .locations
        .iter()
        .enumerate()
        .map(|(i, loc)| (i, loc.vanilla_item))
        .collect()
}

/// Logic-based fill, with up to `MAX_FILL_ATTEMPTS` attempts.
pub fn fill<R: Rng>(
    game_data: &GameData,
    settings: &ResolvedSettings,
    rng: &mut R,
) -> Result<Overrides, FillError> {
    let randomizer = Randomizer::new(game_data, settings)?;
    let mut last_err = FillError::Deadlock;
    for attempt_num in 1..=MAX_FILL_ATTEMPTS {
        match randomizer.randomize(attempt_num, rng) {
            Ok(overrides) => return Ok(overrides),
            Err(e) => {
                info!("[attempt {attempt_num}] Attempt failed: {e}");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

impl<'a> Randomizer<'a> {
    pub fn new(game_data: &'a GameData, settings: &'a ResolvedSettings) -> Result<Self, FillError> {
        let pool = build_item_pool(game_data, settings)?;
        let num_excluded = pool
            .shuffled_locations
            .iter()
            .filter(|&&loc| settings.is_excluded(loc))
            .count();
        if num_excluded > pool.junk_count(game_data) {
            return Err(FillError::ExclusionConflict);
        }
        Ok(Randomizer {
            game_data,
            settings,
            pool,
        })
    }

    fn is_key_item(&self, item: ItemIdx) -> bool {
        self.game_data.is_advancement(item)
    }

    fn num_key_items_remaining(&self, state: &RandomizationState) -> usize {
        state
            .items_remaining
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_key_item(*i))
            .map(|(_, &c)| c)
            .sum()
    }

    fn num_junk_remaining(&self, state: &RandomizationState) -> usize {
        state.items_remaining.iter().sum::<usize>() - self.num_key_items_remaining(state)
    }

    fn update_reachability(&self, state: &mut RandomizationState) {
        let result = traverse(self.game_data, self.settings, &state.global_state.inventory);
        for (loc, loc_state) in state.item_location_state.iter_mut().enumerate() {
            if loc_state.reachable_step.is_none() && result.locations[loc] {
                loc_state.reachable_step = Some(state.step_num);
            }
        }
        state.win_reachable = result.events[self.game_data.win_event];
    }

    // Collects items that were placed earlier (or fixed up front) and have since become reachable.
    fn collect_placed_items(&self, state: &mut RandomizationState) {
        loop {
            self.update_reachability(state);
            let mut any_update = false;
            for loc_state in &mut state.item_location_state {
                if let Some(item) = loc_state.placed_item {
                    if !loc_state.collected && loc_state.reachable_step.is_some() {
                        loc_state.collected = true;
                        state.global_state.collect(item);
                        any_update = true;
                    }
                }
            }
            if !any_update {
                break;
            }
        }
    }

    // Number of key items to place this step. Open locations hold only key items until all of
    // them are placed; everything else waits for `finish`.
    fn determine_key_item_count(&self, state: &RandomizationState, num_open: usize) -> usize {
        let num_key_items_remaining = self.num_key_items_remaining(state);
        let num_items_remaining: usize = state.items_remaining.iter().sum();
        let key_fraction = num_key_items_remaining as f32 / num_items_remaining as f32;
        let num_key_items_to_place = match self.settings.progression_rate() {
            ProgressionRate::Slow => 1,
            ProgressionRate::Uniform => {
                usize::max(1, f32::round(key_fraction * num_open as f32) as usize)
            }
            ProgressionRate::Fast => {
                usize::max(1, f32::round(2.0 * key_fraction * num_open as f32) as usize)
            }
        };

        // If we're at the end, dump as many key items as possible:
        if num_key_items_remaining <= KEY_ITEM_FINISH_THRESHOLD {
            return min(num_open, num_key_items_remaining);
        }

        // Keep one open location in reserve, unless it's the only one:
        let max_to_place = usize::max(1, num_open.saturating_sub(1));
        min(num_key_items_to_place, min(max_to_place, num_key_items_remaining))
    }

    fn select_filler_items<R: Rng>(
        &self,
        state: &RandomizationState,
        num_filler_items_to_select: usize,
        rng: &mut R,
    ) -> Vec<ItemIdx> {
        let mut junk: Vec<ItemIdx> = vec![];
        for (item, &cnt) in state.items_remaining.iter().enumerate() {
            if !self.is_key_item(item) {
                junk.extend(std::iter::repeat(item).take(cnt));
            }
        }
        junk.shuffle(rng);
        junk.truncate(num_filler_items_to_select);
        junk
    }

    fn select_key_items(
        &self,
        state: &RandomizationState,
        num_key_items_to_select: usize,
        attempt_num: usize,
    ) -> Option<Vec<ItemIdx>> {
        if num_key_items_to_select == 0 {
            return if attempt_num > 0 { None } else { Some(vec![]) };
        }
        let mut unplaced_items: Vec<ItemIdx> = vec![];
        let mut placed_items: Vec<ItemIdx> = vec![];
        let mut additional_items: Vec<ItemIdx> = vec![];

        for &item in &state.item_precedence {
            let remaining = state.items_remaining[item];
            if remaining == 0 {
                continue;
            }
            if self.settings.progression_rate() == ProgressionRate::Slow
                || remaining == self.pool.counts[item]
            {
                unplaced_items.push(item);
            } else {
                // With Uniform and Fast progression, items placed before go in last priority:
                placed_items.push(item);
            }
            for _ in 1..remaining {
                additional_items.push(item);
            }
        }

        let cnt_different_items_remaining = unplaced_items.len() + placed_items.len();
        let mut remaining_items: Vec<ItemIdx> = unplaced_items;
        remaining_items.extend(placed_items);
        remaining_items.extend(additional_items);

        if attempt_num > 0 && num_key_items_to_select - 1 + attempt_num >= cnt_different_items_remaining
        {
            return None;
        }

        // The first `k - 1` key items follow the precedence order; the last one varies across
        // attempts, looking for a choice that opens up new locations.
        let mut key_items_to_place: Vec<ItemIdx> =
            remaining_items[0..(num_key_items_to_select - 1)].to_vec();
        key_items_to_place.push(*remaining_items.get(num_key_items_to_select - 1 + attempt_num)?);
        Some(key_items_to_place)
    }

    fn provides_progression(
        &self,
        old_state: &RandomizationState,
        new_state: &mut RandomizationState,
        key_items: &[ItemIdx],
        filler_items: &[ItemIdx],
    ) -> bool {
        new_state
            .global_state
            .collect_all(key_items.iter().chain(filler_items).copied());
        self.update_reachability(new_state);

        let all_reachable = new_state
            .item_location_state
            .iter()
            .all(|x| x.reachable_step.is_some());
        let gives_expansion = all_reachable
            || std::iter::zip(&new_state.item_location_state, &old_state.item_location_state)
                .any(|(n, o)| n.reachable_step.is_some() && o.reachable_step.is_none());
        gives_expansion || new_state.win_reachable
    }

    fn multi_attempt_select_items<R: Rng>(
        &self,
        attempt_num_rando: usize,
        state: &RandomizationState,
        num_open: usize,
        num_excluded: usize,
        rng: &mut R,
    ) -> (SelectItemsOutput, RandomizationState) {
        let num_key_items_to_select = self.determine_key_item_count(state, num_open);
        let selected_filler_items = self.select_filler_items(state, num_excluded, rng);

        let mut new_state_filler = state.clone();
        new_state_filler.step_num += 1;
        for &item in &selected_filler_items {
            new_state_filler.items_remaining[item] -= 1;
        }

        let mut attempt_num = 0;
        let mut selected_key_items = self
            .select_key_items(&new_state_filler, num_key_items_to_select, attempt_num)
            .unwrap_or_default();

        loop {
            let mut new_state = new_state_filler.clone();
            for &item in &selected_key_items {
                new_state.items_remaining[item] -= 1;
            }

            if self.provides_progression(
                state,
                &mut new_state,
                &selected_key_items,
                &selected_filler_items,
            ) {
                let selection = SelectItemsOutput {
                    key_items: selected_key_items,
                    filler_items: selected_filler_items,
                };
                return (selection, new_state);
            }

            attempt_num += 1;
            match self.select_key_items(&new_state_filler, num_key_items_to_select, attempt_num) {
                Some(items) => selected_key_items = items,
                None => {
                    info!("[attempt {attempt_num_rando}] Continuing with last-ditch effort after exhausting key item placement attempts");
                    let selection = SelectItemsOutput {
                        key_items: selected_key_items,
                        filler_items: selected_filler_items,
                    };
                    return (selection, new_state);
                }
            }
        }
    }

    fn place_items(
        &self,
        attempt_num_rando: usize,
        state: &mut RandomizationState,
        open_locations: &[LocationIdx],
        excluded_locations: &[LocationIdx],
        selection: &SelectItemsOutput,
    ) {
        info!(
            "[attempt {attempt_num_rando}] Placing {:?}, {:?}",
            selection
                .key_items
                .iter()
                .map(|&x| self.game_data.item_name(x))
                .collect::<Vec<_>>(),
            selection
                .filler_items
                .iter()
                .map(|&x| self.game_data.item_name(x))
                .collect::<Vec<_>>()
        );
        // Key items go to open locations, junk to reachable excluded ones. Open locations left
        // over stay empty for later steps.
        let placements = open_locations
            .iter()
            .zip(&selection.key_items)
            .chain(excluded_locations.iter().zip(&selection.filler_items));
        for (&loc, &item) in placements {
            let loc_state = &mut state.item_location_state[loc];
            loc_state.placed_item = Some(item);
            loc_state.collected = true;
        }
    }

    fn step<R: Rng>(
        &self,
        attempt_num_rando: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<bool, FillError> {
        self.collect_placed_items(state);
        if self.num_key_items_remaining(state) == 0 {
            return Ok(true);
        }

        let mut open_locations: Vec<LocationIdx> = vec![];
        let mut excluded_locations: Vec<LocationIdx> = vec![];
        for (loc, loc_state) in state.item_location_state.iter().enumerate() {
            if loc_state.placed_item.is_some() || loc_state.reachable_step.is_none() {
                continue;
            }
            if self.settings.is_excluded(loc) {
                excluded_locations.push(loc);
            } else {
                open_locations.push(loc);
            }
        }
        open_locations.shuffle(rng);
        excluded_locations.shuffle(rng);
        if open_locations.is_empty() {
            return Err(FillError::Deadlock);
        }
        if excluded_locations.len() > self.num_junk_remaining(state) {
            return Err(FillError::ExclusionConflict);
        }

        let (selection, mut new_state) = self.multi_attempt_select_items(
            attempt_num_rando,
            state,
            open_locations.len(),
            excluded_locations.len(),
            rng,
        );
        self.place_items(
            attempt_num_rando,
            &mut new_state,
            &open_locations,
            &excluded_locations,
            &selection,
        );
        *state = new_state;
        Ok(false)
    }

    fn finish<R: Rng>(&self, attempt_num_rando: usize, state: &mut RandomizationState, rng: &mut R) {
        let mut remaining_items: Vec<ItemIdx> = vec![];
        for (item, &cnt) in state.items_remaining.iter().enumerate() {
            remaining_items.extend(std::iter::repeat(item).take(cnt));
        }
        info!(
            "[attempt {attempt_num_rando}] Finishing with {} junk item(s)",
            remaining_items.len()
        );
        remaining_items.shuffle(rng);
        let mut remaining_items = remaining_items.into_iter();
        for loc_state in &mut state.item_location_state {
            if loc_state.placed_item.is_none() {
                loc_state.placed_item = remaining_items.next();
            }
        }
        state.items_remaining.fill(0);
    }

    // Whether the game can be won with `reward_items` at the boss locations, assuming every
    // shuffled item is already held.
    fn rewards_obtainable(&self, state: &RandomizationState, reward_items: &[ItemIdx]) -> bool {
        let mut assumed = state.clone();
        for (&loc, &item) in self.pool.reward_locations.iter().zip(reward_items) {
            assumed.item_location_state[loc].placed_item = Some(item);
        }
        for (item, &cnt) in self.pool.counts.iter().enumerate() {
            assumed
                .global_state
                .collect_all(std::iter::repeat(item).take(cnt));
        }
        self.collect_placed_items(&mut assumed);
        assumed.win_reachable
    }

    fn place_fixed_items<R: Rng>(
        &self,
        attempt_num_rando: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) {
        for &(loc, item) in &self.pool.fixed {
            state.item_location_state[loc].placed_item = Some(item);
        }

        let mut reward_items = self.pool.reward_items.clone();
        if self.settings.dungeon_reward_shuffle() != DungeonRewardShuffle::Vanilla {
            let shuffled = (0..MAX_REWARD_SHUFFLES).find_map(|_| {
                let mut candidate = self.pool.reward_items.clone();
                candidate.shuffle(rng);
                self.rewards_obtainable(state, &candidate).then_some(candidate)
            });
            match shuffled {
                Some(items) => reward_items = items,
                None => info!(
                    "[attempt {attempt_num_rando}] No winnable dungeon reward shuffle found, keeping vanilla rewards"
                ),
            }
        }
        for (&loc, item) in self.pool.reward_locations.iter().zip(reward_items) {
            state.item_location_state[loc].placed_item = Some(item);
        }
    }

    fn get_item_precedence<R: Rng>(&self, rng: &mut R) -> Vec<ItemIdx> {
        let mut item_precedence: Vec<ItemIdx> = (0..self.game_data.items.len())
            .filter(|&i| self.is_key_item(i) && self.pool.counts[i] > 0)
            .collect();
        item_precedence.shuffle(rng);
        item_precedence
    }

    fn initial_state<R: Rng>(&self, attempt_num_rando: usize, rng: &mut R) -> RandomizationState {
        let initial_item_location_state = ItemLocationState {
            placed_item: None,
            collected: false,
            reachable_step: None,
        };
        let item_precedence = self.get_item_precedence(rng);
        info!(
            "[attempt {attempt_num_rando}] Item precedence: {:?}",
            item_precedence
                .iter()
                .map(|&x| self.game_data.item_name(x))
                .collect::<Vec<_>>()
        );
        let mut state = RandomizationState {
            step_num: 1,
            item_precedence,
            item_location_state: vec![initial_item_location_state; self.game_data.locations.len()],
            items_remaining: self.pool.counts.clone(),
            global_state: GlobalState::new(self.game_data),
            win_reachable: false,
        };
        self.place_fixed_items(attempt_num_rando, &mut state, rng);
        state
    }

    pub fn randomize<R: Rng>(&self, attempt_num_rando: usize, rng: &mut R) -> Result<Overrides, FillError> {
        let mut state = self.initial_state(attempt_num_rando, rng);

        loop {
            let done = self.step(attempt_num_rando, &mut state, rng)?;
            let cnt_collected = state.item_location_state.iter().filter(|x| x.collected).count();
            let cnt_placed = state
                .item_location_state
                .iter()
                .filter(|x| x.placed_item.is_some())
                .count();
            let cnt_reachable = state
                .item_location_state
                .iter()
                .filter(|x| x.reachable_step.is_some())
                .count();
            info!("[attempt {attempt_num_rando}] step={0}, reachable={cnt_reachable}, placed={cnt_placed}, collected={cnt_collected}", state.step_num);
            if done {
                break;
            }
        }

        if !state.win_reachable {
            return Err(FillError::NotBeatable);
        }
        self.finish(attempt_num_rando, &mut state, rng);
        let overrides = state
            .item_location_state
            .iter()
            .enumerate()
            .filter_map(|(loc, x)| x.placed_item.map(|item| (loc, item)))
            .collect();
        Ok(overrides)
    }
}
