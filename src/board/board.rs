use std::collections::BTreeMap;

use derive_getters::{Dissolve, Getters};

use crate::{
    board::mesadata::{AccessMesadata, Mesadata},
    node::{
        item::{Item, ItemId},
        NodeArena, NodeError,
    },
};

/// Committed board: the root node of an arena plus layer and net names.
#[derive(Debug, Clone, Getters, Dissolve)]
pub struct Board {
    arena: NodeArena,
    mesadata: Mesadata,
}

impl Board {
    pub fn new(mesadata: Mesadata) -> Self {
        Self {
            arena: NodeArena::new(mesadata.layer_count()),
            mesadata,
        }
    }

    pub fn from_parts(arena: NodeArena, mesadata: Mesadata) -> Self {
        Self { arena, mesadata }
    }

    pub fn add_item(&mut self, item: Item) -> Result<ItemId, NodeError> {
        let root = self.arena.root();
        self.arena.add(root, item)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, NodeError> {
        let root = self.arena.root();
        self.arena.remove(root, id)
    }

    pub fn items(&self) -> Result<BTreeMap<ItemId, &Item>, NodeError> {
        self.arena.items(self.arena.root())
    }

    pub fn item(&self, id: ItemId) -> Result<Option<&Item>, NodeError> {
        self.arena.item(self.arena.root(), id)
    }

    pub fn layer_count(&self) -> usize {
        self.arena.layer_count()
    }
}
