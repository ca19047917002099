pub mod helpers;

use ootrando_game::{GameData, ItemIdx};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Age {
    Child,
    Adult,
}

impl Age {
    pub const ALL: [Age; 2] = [Age::Child, Age::Adult];

    pub fn index(self) -> usize {
        match self {
            Age::Child => 0,
            Age::Adult => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    // Number of copies held, indexed by ItemIdx. Progressive items count their upgrades here.
    pub items: Vec<u8>,
}

impl Inventory {
    pub fn new(num_items: usize) -> Self {
        Inventory {
            items: vec![0; num_items],
        }
    }

    pub fn count(&self, item: ItemIdx) -> u8 {
        self.items[item]
    }

    pub fn has(&self, item: ItemIdx, count: u8) -> bool {
        self.items[item] >= count
    }
}

#[derive(Clone, Debug)]
pub struct GlobalState {
    pub inventory: Inventory,
}

impl GlobalState {
    pub fn new(game_data: &GameData) -> Self {
        GlobalState {
            inventory: Inventory::new(game_data.items.len()),
        }
    }

    pub fn collect(&mut self, item: ItemIdx) {
        self.inventory.items[item] = self.inventory.items[item].saturating_add(1);
    }

    pub fn collect_all<I: IntoIterator<Item = ItemIdx>>(&mut self, items: I) {
        for item in items {
            self.collect(item);
        }
    }
}
