use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    board::{
        mesadata::{AccessMesadata, Mesadata},
        Board,
    },
    node::{
        item::{GetMaybeNet, Item},
        rules::ClearanceRules,
        NodeError,
    },
};

#[derive(Error, Debug)]
pub enum DesignError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error("item #{index} is on net {net}, but only {net_count} nets are named")]
    UnknownNet {
        index: usize,
        net: usize,
        net_count: usize,
    },
}

/// JSON description of a board: layer stack, net names, clearance rules and items.
///
/// Layers and nets are referred to by their position in `layers` and `nets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDesign {
    pub layers: Vec<String>,
    #[serde(default)]
    pub nets: Vec<String>,
    #[serde(default)]
    pub rules: ClearanceRules,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl BoardDesign {
    pub fn load(reader: impl Read) -> Result<Self, DesignError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DesignError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write(&self, writer: impl Write) -> Result<(), DesignError> {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }

    pub fn make_board(&self) -> Result<Board, DesignError> {
        let mut board = Board::new(Mesadata::new(&self.layers, &self.nets));

        for (index, item) in self.items.iter().enumerate() {
            if let Some(net) = item.maybe_net() {
                if net >= self.nets.len() {
                    return Err(DesignError::UnknownNet {
                        index,
                        net,
                        net_count: self.nets.len(),
                    });
                }
            }

            board.add_item(item.clone())?;
        }

        Ok(board)
    }

    /// Describes the committed state of `board`. Items come out in id order.
    pub fn from_board(board: &Board, rules: ClearanceRules) -> Result<Self, DesignError> {
        Ok(Self {
            layers: board.mesadata().layernames(),
            nets: board.mesadata().netnames(),
            rules,
            items: board.items()?.into_values().cloned().collect(),
        })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"{
        "layers": ["F.Cu", "B.Cu"],
        "nets": ["GND", "SIG"],
        "rules": {"clearance": 5},
        "items": [
            {
                "kind": "seg",
                "from": {"x": 0, "y": 0},
                "to": {"x": 100, "y": 0},
                "width": 10,
                "layer": 0,
                "maybe_net": 1
            },
            {
                "kind": "via",
                "pos": {"x": 100, "y": 0},
                "diameter": 20,
                "drill": 10,
                "layers": {"start": 0, "end": 1},
                "maybe_net": 1
            }
        ]
    }"#;

    #[test]
    fn test_load_board() {
        let design = BoardDesign::from_json(BOARD).unwrap();
        let board = design.make_board().unwrap();

        assert_eq!(board.layer_count(), 2);
        assert_eq!(board.items().unwrap().len(), 2);
        assert_eq!(board.mesadata().netname_net("SIG"), Some(1));
        assert_eq!(design.rules.clearance, 5);
    }

    #[test]
    fn test_unknown_net() {
        let mut design = BoardDesign::from_json(BOARD).unwrap();
        design.nets.pop();

        assert!(matches!(
            design.make_board(),
            Err(DesignError::UnknownNet { index: 0, net: 1, .. })
        ));
    }

    #[test]
    fn test_saved_board_loads_back() {
        let design = BoardDesign::from_json(BOARD).unwrap();
        let board = design.make_board().unwrap();

        let mut json = vec![];
        BoardDesign::from_board(&board, design.rules.clone())
            .unwrap()
            .write(&mut json)
            .unwrap();

        let reloaded = BoardDesign::load(json.as_slice()).unwrap();
        assert_eq!(reloaded, design);
    }
}
