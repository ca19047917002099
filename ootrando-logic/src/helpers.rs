use crate::Inventory;
use ootrando_game::{GameData, RewardKind};

pub fn count_rewards(inventory: &Inventory, game_data: &GameData, kind: RewardKind) -> u8 {
    game_data
        .items
        .iter()
        .enumerate()
        .filter(|(i, x)| x.reward == Some(kind) && inventory.count(*i) > 0)
        .count() as u8
}

pub fn count_stones(inventory: &Inventory, game_data: &GameData) -> u8 {
    count_rewards(inventory, game_data, RewardKind::Stone)
}

pub fn count_medallions(inventory: &Inventory, game_data: &GameData) -> u8 {
    count_rewards(inventory, game_data, RewardKind::Medallion)
}

pub fn has_named(inventory: &Inventory, game_data: &GameData, name: &str) -> bool {
    match game_data.item_isv.index_by_key.get(name) {
        Some(&idx) => inventory.count(idx) > 0,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rewards() {
        let game_data = GameData::load_builtin().unwrap();
        let mut inventory = Inventory::new(game_data.items.len());
        assert_eq!(count_stones(&inventory, &game_data), 0);
        for name in ["Kokiri Emerald", "Goron Ruby", "Forest Medallion"] {
            inventory.items[game_data.item_idx(name).unwrap()] += 1;
        }
        assert_eq!(count_stones(&inventory, &game_data), 2);
        assert_eq!(count_medallions(&inventory, &game_data), 1);
        assert!(has_named(&inventory, &game_data, "Goron Ruby"));
        assert!(!has_named(&inventory, &game_data, "Light Arrows"));
        assert!(!has_named(&inventory, &game_data, "No Such Item"));
    }
}
