//! Undo/redo history. Every committed gesture is recorded as the items it removed from the
//! board and the items it added, so that it can be reverted and reapplied without rerouting.

use derive_getters::{Dissolve, Getters};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{
    item::{Item, ItemId},
    Delta,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no previous transaction")]
    NoPreviousTransaction,
    #[error("no next transaction")]
    NoNextTransaction,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub removed: Vec<(ItemId, Item)>,
    pub added: Vec<(ItemId, Item)>,
}

impl Transaction {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// The transaction that reverts this one.
    pub fn inverse(&self) -> Self {
        Self {
            removed: self.added.clone(),
            added: self.removed.clone(),
        }
    }
}

impl From<Delta> for Transaction {
    fn from(delta: Delta) -> Self {
        Self {
            removed: delta.removed,
            added: delta.added,
        }
    }
}

#[derive(Debug, Default, Clone, Getters, Dissolve, Serialize, Deserialize)]
pub struct History {
    done: Vec<Transaction>,
    undone: Vec<Transaction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new transaction. Whatever was undone before can no longer be redone.
    pub fn do_(&mut self, transaction: Transaction) {
        self.done.push(transaction);
        self.undone.clear();
    }

    pub fn undo(&mut self) -> Result<(), HistoryError> {
        let Some(transaction) = self.done.pop() else {
            return Err(HistoryError::NoPreviousTransaction);
        };

        self.undone.push(transaction);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), HistoryError> {
        let Some(transaction) = self.undone.pop() else {
            return Err(HistoryError::NoNextTransaction);
        };

        self.done.push(transaction);
        Ok(())
    }

    pub fn last_done(&self) -> Result<&Transaction, HistoryError> {
        self.done.last().ok_or(HistoryError::NoPreviousTransaction)
    }

    pub fn last_undone(&self) -> Result<&Transaction, HistoryError> {
        self.undone.last().ok_or(HistoryError::NoNextTransaction)
    }
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;
    use crate::node::item::SegItem;

    fn transaction(id: u64) -> Transaction {
        Transaction {
            removed: vec![],
            added: vec![(
                ItemId(id),
                Item::Seg(SegItem {
                    from: point! {x: 0, y: 0},
                    to: point! {x: 10, y: 0},
                    width: 2,
                    layer: 0,
                    maybe_net: Some(0),
                    locked: false,
                }),
            )],
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new();
        assert_eq!(history.undo(), Err(HistoryError::NoPreviousTransaction));

        history.do_(transaction(1));
        history.do_(transaction(2));
        history.undo().unwrap();

        assert_eq!(history.last_done().unwrap(), &transaction(1));
        assert_eq!(history.last_undone().unwrap(), &transaction(2));

        history.redo().unwrap();
        assert_eq!(history.redo(), Err(HistoryError::NoNextTransaction));
        assert_eq!(history.done().len(), 2);
    }

    #[test]
    fn test_new_transaction_drops_redo() {
        let mut history = History::new();
        history.do_(transaction(1));
        history.undo().unwrap();
        history.do_(transaction(2));

        assert!(history.undone().is_empty());
        assert_eq!(history.last_done().unwrap().inverse().removed[0].0, ItemId(2));
    }
}
