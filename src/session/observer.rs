use std::collections::BTreeSet;

use crate::{
    node::{
        item::{GetMaybeNet, ItemId},
        obstacle::Obstacle,
    },
    router::placer::PlacementObserver,
    session::history::Transaction,
};

/// What a commit changed on the board. Connectivity and rule checking start from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: Vec<ItemId>,
    pub removed: Vec<ItemId>,
    /// Nets of every added or removed item.
    pub nets: BTreeSet<usize>,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl From<&Transaction> for CommitSummary {
    fn from(transaction: &Transaction) -> Self {
        Self {
            added: transaction.added.iter().map(|(id, _)| *id).collect(),
            removed: transaction.removed.iter().map(|(id, _)| *id).collect(),
            nets: transaction
                .added
                .iter()
                .chain(transaction.removed.iter())
                .filter_map(|(_, item)| item.maybe_net())
                .collect(),
        }
    }
}

/// Notified whenever the committed board changes, by a finished gesture, undo or redo.
pub trait BoardObserver {
    fn on_commit(&mut self, summary: &CommitSummary);
}

#[derive(Debug, Default)]
pub struct EmptyObserver;

impl BoardObserver for EmptyObserver {
    fn on_commit(&mut self, _summary: &CommitSummary) {}
}

impl PlacementObserver for EmptyObserver {
    fn on_shove(&mut self, _item: ItemId, _replacement: &[ItemId], _depth: usize) {}
    fn on_mark_obstacle(&mut self, _obstacles: &[Obstacle]) {}
}
