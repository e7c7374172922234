#![allow(dead_code)]

use std::fs::File;
use std::io::BufReader;

use geo::point;
use petgraph::unionfind::UnionFind;
use pnsroute::{
    board::{design::BoardDesign, mesadata::Mesadata, Board},
    math::{Circle, Point},
    geometry::primitive::DotShape,
    node::{
        item::{GetAnchors, GetLayers, GetMaybeNet, Item, ItemId, LayerRange, PadItem, SegItem},
        obstacle::Obstacle,
        rules::AccessRules,
        NodeArena, NodeHandle,
    },
    router::placer::PlacementObserver,
    session::{
        command::Command,
        observer::{BoardObserver, CommitSummary},
    },
};

pub fn seg(from: Point, to: Point, width: i64, layer: usize, net: usize) -> Item {
    Item::Seg(SegItem {
        from,
        to,
        width,
        layer,
        maybe_net: Some(net),
        locked: false,
    })
}

pub fn locked_seg(from: Point, to: Point, width: i64, layer: usize, net: usize) -> Item {
    Item::Seg(SegItem {
        from,
        to,
        width,
        layer,
        maybe_net: Some(net),
        locked: true,
    })
}

pub fn pad(pos: Point, r: i64, layers: LayerRange, net: usize) -> Item {
    Item::Pad(PadItem {
        pos,
        shape: DotShape {
            circle: Circle { pos, r },
        }
        .into(),
        layers,
        maybe_net: Some(net),
        drill: None,
    })
}

/// Board with layers `L0`, `L1`, ... and nets `N0`, `N1`, ...
pub fn make_board(layer_count: usize, net_count: usize, items: Vec<Item>) -> (Board, Vec<ItemId>) {
    let layernames: Vec<String> = (0..layer_count).map(|layer| format!("L{}", layer)).collect();
    let netnames: Vec<String> = (0..net_count).map(|net| format!("N{}", net)).collect();
    let mut board = Board::new(Mesadata::new(&layernames, &netnames));

    let ids = items
        .into_iter()
        .map(|item| board.add_item(item).unwrap())
        .collect();

    (board, ids)
}

pub fn load_design(filename: &str) -> BoardDesign {
    let design_file = File::open(filename).unwrap();
    BoardDesign::load(BufReader::new(design_file)).unwrap()
}

pub fn load_commands(filename: &str) -> Vec<Command> {
    let commands_file = File::open(filename).unwrap();
    serde_json::from_reader(BufReader::new(commands_file)).unwrap()
}

/// Asserts that no two items visible from `node` are closer than their clearance.
pub fn assert_clearances(arena: &NodeArena, node: NodeHandle, rules: &impl AccessRules) {
    for (id, item) in arena.items(node).unwrap() {
        let violations: Vec<Obstacle> = arena
            .query(node, item, rules)
            .unwrap()
            .into_iter()
            .filter(|obstacle| obstacle.item != id)
            .collect();

        dbg!(id, &violations);
        assert!(violations.is_empty());
    }
}

/// Asserts that copper runs from an item anchored at `from` to an item anchored at `to`.
pub fn assert_connected(arena: &NodeArena, node: NodeHandle, net: usize, from: Point, to: Point) {
    let items = arena.items(node).unwrap();
    let ids: Vec<ItemId> = items.keys().copied().collect();
    let position = |id: ItemId| ids.binary_search(&id).unwrap();

    let mut unionfind = UnionFind::new(ids.len());

    for (id, item) in &items {
        if item.maybe_net() != Some(net) {
            continue;
        }

        for anchor in item.anchors() {
            for joined in arena.joined(node, anchor, item.layers(), net).unwrap() {
                unionfind.union(position(*id), position(joined));
            }
        }
    }

    let anchored_at = |p: Point| {
        items
            .iter()
            .find(|(_, item)| item.maybe_net() == Some(net) && item.has_anchor(p))
            .map(|(id, _)| position(*id))
            .unwrap()
    };

    assert_eq!(
        unionfind.find(anchored_at(from)),
        unionfind.find(anchored_at(to))
    );
}

pub fn origin() -> Point {
    point! {x: 0, y: 0}
}

/// Observer that keeps everything it is told.
#[derive(Debug, Default)]
pub struct Recorder {
    pub commits: Vec<CommitSummary>,
    pub shoves: Vec<(ItemId, usize)>,
    pub marked: Vec<ItemId>,
}

impl BoardObserver for Recorder {
    fn on_commit(&mut self, summary: &CommitSummary) {
        self.commits.push(summary.clone());
    }
}

impl PlacementObserver for Recorder {
    fn on_shove(&mut self, item: ItemId, _replacement: &[ItemId], depth: usize) {
        self.shoves.push((item, depth));
    }

    fn on_mark_obstacle(&mut self, obstacles: &[Obstacle]) {
        self.marked
            .extend(obstacles.iter().map(|obstacle| obstacle.item));
    }
}
