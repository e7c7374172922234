use std::collections::{BTreeMap, BTreeSet};

use contracts::debug_ensures;
use rstar::AABB;
use thiserror::Error;

use crate::{
    geometry::{shape::AccessShape, with_rtree::RtreeIndex},
    math::Point,
    node::{
        item::{GetLayers, GetMaybeNet, Item, ItemId, LayerRange, MakeShape},
        obstacle::{self, Obstacle},
        rules::AccessRules,
    },
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    #[error("node {0:?} no longer exists")]
    StaleHandle(NodeHandle),
    #[error("item {0:?} does not exist in this node")]
    NoSuchItem(ItemId),
    #[error("item {0:?} already exists in this node")]
    ItemExists(ItemId),
    #[error("layer {layer} is outside of the {layer_count}-layer stack")]
    NoSuchLayer { layer: usize, layer_count: usize },
    #[error("root node cannot be committed or discarded")]
    RootNode,
    #[error("node {0:?} has branches of its own and cannot be committed")]
    NotALeaf(NodeHandle),
    #[error("item {0:?} was changed in the parent after branching")]
    Conflict(ItemId),
}

/// Generation-checked reference to a node of a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    parent: Option<usize>,
    children: Vec<usize>,
    added: BTreeMap<ItemId, Item>,
    removed: BTreeSet<ItemId>,
    index: RtreeIndex<ItemId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    maybe_node: Option<NodeData>,
}

/// Items added and removed by a node relative to its parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    pub removed: Vec<(ItemId, Item)>,
    pub added: Vec<(ItemId, Item)>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Arena of delta-chained nodes. The root holds the committed board; every other node records
/// only what it adds to and removes from its parent, and every lookup resolves through the
/// chain to the nearest node that says something about the item.
#[derive(Debug, Clone)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeHandle,
    next_item_id: u64,
    layer_count: usize,
}

fn item_envelope(item: &Item) -> AABB<[i64; 3]> {
    let layers = item.layers();
    item.shape().envelope_3d(0, layers.start, layers.end)
}

impl NodeArena {
    pub fn new(layer_count: usize) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                maybe_node: Some(NodeData::default()),
            }],
            free: vec![],
            root: NodeHandle {
                index: 0,
                generation: 0,
            },
            next_item_id: 0,
            layer_count,
        }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn contains_node(&self, node: NodeHandle) -> bool {
        self.data(node).is_ok()
    }

    pub fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, NodeError> {
        Ok(self.data(node)?.parent.map(|index| self.handle(index)))
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn data(&self, node: NodeHandle) -> Result<&NodeData, NodeError> {
        self.slots
            .get(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.maybe_node.as_ref())
            .ok_or(NodeError::StaleHandle(node))
    }

    fn data_mut(&mut self, node: NodeHandle) -> Result<&mut NodeData, NodeError> {
        self.slots
            .get_mut(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.maybe_node.as_mut())
            .ok_or(NodeError::StaleHandle(node))
    }

    /// Nodes from `node` up to the root.
    fn chain(&self, node: NodeHandle) -> Result<Vec<&NodeData>, NodeError> {
        let mut current = self.data(node)?;
        let mut chain = vec![current];

        while let Some(parent) = current.parent {
            current = self.slots[parent]
                .maybe_node
                .as_ref()
                .ok_or(NodeError::StaleHandle(self.handle(parent)))?;
            chain.push(current);
        }

        Ok(chain)
    }

    fn validate_layers(&self, item: &Item) -> Result<(), NodeError> {
        let layers = item.layers();

        if layers.end >= self.layer_count {
            return Err(NodeError::NoSuchLayer {
                layer: layers.end,
                layer_count: self.layer_count,
            });
        }

        Ok(())
    }

    /// Number of items visible from `node`, zero for a stale handle.
    pub fn len(&self, node: NodeHandle) -> usize {
        self.items(node).map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, node: NodeHandle) -> bool {
        self.len(node) == 0
    }

    #[debug_ensures(ret.is_ok() -> self.len(node) == old(self.len(node)) + 1)]
    pub fn add(&mut self, node: NodeHandle, item: Item) -> Result<ItemId, NodeError> {
        let id = ItemId(self.next_item_id);
        self.add_with_id(node, id, item)?;
        Ok(id)
    }

    /// Inserts an item under a given id, as when restoring a removed item on undo.
    #[debug_ensures(ret.is_ok() -> self.len(node) == old(self.len(node)) + 1)]
    pub fn add_with_id(&mut self, node: NodeHandle, id: ItemId, item: Item) -> Result<(), NodeError> {
        self.validate_layers(&item)?;

        if self.item(node, id)?.is_some() {
            return Err(NodeError::ItemExists(id));
        }

        let envelope = item_envelope(&item);
        let data = self.data_mut(node)?;
        data.index.insert(envelope, id);
        data.added.insert(id, item);
        self.next_item_id = self.next_item_id.max(id.0 + 1);

        Ok(())
    }

    #[debug_ensures(ret.is_ok() -> self.len(node) == old(self.len(node)) - 1)]
    pub fn remove(&mut self, node: NodeHandle, id: ItemId) -> Result<Item, NodeError> {
        let item = self.item(node, id)?.cloned().ok_or(NodeError::NoSuchItem(id))?;
        let data = self.data_mut(node)?;

        if data.added.remove(&id).is_some() {
            data.index.remove(item_envelope(&item), id);
        } else {
            data.removed.insert(id);
        }

        Ok(item)
    }

    /// Current state of an item as seen from `node`.
    pub fn item(&self, node: NodeHandle, id: ItemId) -> Result<Option<&Item>, NodeError> {
        for data in self.chain(node)? {
            if let Some(item) = data.added.get(&id) {
                return Ok(Some(item));
            }

            if data.removed.contains(&id) {
                return Ok(None);
            }
        }

        Ok(None)
    }

    pub fn items(&self, node: NodeHandle) -> Result<BTreeMap<ItemId, &Item>, NodeError> {
        let mut items = BTreeMap::new();
        let mut removed = BTreeSet::new();

        for data in self.chain(node)? {
            for (id, item) in &data.added {
                if !removed.contains(id) {
                    items.entry(*id).or_insert(item);
                }
            }

            removed.extend(data.removed.iter().copied());
        }

        Ok(items)
    }

    /// Ids of the items visible from `node` whose bounding boxes intersect `envelope`.
    pub fn locate(
        &self,
        node: NodeHandle,
        envelope: &AABB<[i64; 3]>,
    ) -> Result<Vec<ItemId>, NodeError> {
        let mut found = BTreeSet::new();
        let mut removed = BTreeSet::new();

        for data in self.chain(node)? {
            found.extend(
                data.index
                    .locate_in_envelope_intersecting(envelope)
                    .filter(|id| !removed.contains(id)),
            );
            removed.extend(data.removed.iter().copied());
        }

        Ok(found.into_iter().collect())
    }

    /// Every item visible from `node` that `candidate` violates clearance with, deepest
    /// penetration first.
    pub fn query(
        &self,
        node: NodeHandle,
        candidate: &Item,
        rules: &impl AccessRules,
    ) -> Result<Vec<Obstacle>, NodeError> {
        let layers = candidate.layers();
        let envelope = candidate.shape().envelope_3d(
            obstacle::query_margin(candidate, rules),
            layers.start,
            layers.end,
        );

        let mut obstacles = vec![];

        for id in self.locate(node, &envelope)? {
            let Some(item) = self.item(node, id)? else {
                continue;
            };

            if let Some(collision) = obstacle::collision(candidate, item, rules) {
                obstacles.push(Obstacle {
                    item: id,
                    maybe_net: item.maybe_net(),
                    layers: item.layers(),
                    clearance: collision.clearance,
                    distance: collision.distance,
                });
            }
        }

        obstacles.sort_by(|a, b| b.penetration().total_cmp(&a.penetration()));
        Ok(obstacles)
    }

    /// Items of `net` on `layers` having an anchor exactly at `point`.
    pub fn joined(
        &self,
        node: NodeHandle,
        point: Point,
        layers: LayerRange,
        net: usize,
    ) -> Result<Vec<ItemId>, NodeError> {
        let envelope = AABB::from_corners(
            [point.x(), point.y(), layers.start as i64],
            [point.x(), point.y(), layers.end as i64],
        );

        let mut joined = vec![];

        for id in self.locate(node, &envelope)? {
            let Some(item) = self.item(node, id)? else {
                continue;
            };

            if item.maybe_net() == Some(net)
                && item.layers().overlaps(&layers)
                && item.has_anchor(point)
            {
                joined.push(id);
            }
        }

        Ok(joined)
    }

    pub fn branch(&mut self, node: NodeHandle) -> Result<NodeHandle, NodeError> {
        self.data(node)?;

        let child = NodeData {
            parent: Some(node.index),
            ..Default::default()
        };

        let index = if let Some(index) = self.free.pop() {
            self.slots[index].maybe_node = Some(child);
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                maybe_node: Some(child),
            });
            self.slots.len() - 1
        };

        self.data_mut(node)?.children.push(index);
        Ok(self.handle(index))
    }

    /// What `node` changes relative to its parent.
    pub fn delta(&self, node: NodeHandle) -> Result<Delta, NodeError> {
        let data = self.data(node)?;
        let parent = data.parent.map(|index| self.handle(index));
        let mut delta = Delta::default();

        if let Some(parent) = parent {
            for id in &data.removed {
                if let Some(item) = self.item(parent, *id)? {
                    delta.removed.push((*id, item.clone()));
                }
            }
        }

        delta.added = data
            .added
            .iter()
            .map(|(id, item)| (*id, item.clone()))
            .collect();

        Ok(delta)
    }

    /// Merges a leaf node into its parent. The node and all of its siblings are invalidated.
    #[debug_ensures(ret.is_ok() -> !self.contains_node(child))]
    pub fn commit(&mut self, child: NodeHandle) -> Result<NodeHandle, NodeError> {
        let data = self.data(child)?;
        let parent = data.parent.map(|index| self.handle(index)).ok_or(NodeError::RootNode)?;

        if !data.children.is_empty() {
            return Err(NodeError::NotALeaf(child));
        }

        for id in &data.removed {
            if self.item(parent, *id)?.is_none() {
                return Err(NodeError::Conflict(*id));
            }
        }

        for id in data.added.keys() {
            if !data.removed.contains(id) && self.item(parent, *id)?.is_some() {
                return Err(NodeError::Conflict(*id));
            }
        }

        let data = self.take(child)?;

        for id in data.removed {
            let parent_data = self.data_mut(parent)?;

            if let Some(item) = parent_data.added.remove(&id) {
                parent_data.index.remove(item_envelope(&item), id);
            } else {
                parent_data.removed.insert(id);
            }
        }

        let parent_data = self.data_mut(parent)?;

        for (id, item) in data.added {
            parent_data.index.insert(item_envelope(&item), id);
            parent_data.added.insert(id, item);
        }

        for sibling in std::mem::take(&mut parent_data.children) {
            self.drop_subtree(sibling);
        }

        Ok(parent)
    }

    /// Drops `node` together with every node branched from it.
    pub fn discard(&mut self, node: NodeHandle) -> Result<(), NodeError> {
        let parent = self.data(node)?.parent.ok_or(NodeError::RootNode)?;

        if let Some(parent_data) = self.slots[parent].maybe_node.as_mut() {
            parent_data.children.retain(|index| *index != node.index);
        }

        self.drop_subtree(node.index);
        Ok(())
    }

    /// Drops every node branched from `node`, leaving `node` itself as it is.
    #[debug_ensures(ret.is_ok() -> self.len(node) == old(self.len(node)))]
    pub fn discard_branches(&mut self, node: NodeHandle) -> Result<(), NodeError> {
        let children = std::mem::take(&mut self.data_mut(node)?.children);

        for child in children {
            self.drop_subtree(child);
        }

        Ok(())
    }

    /// Detaches a leaf from its parent and frees its slot, returning its data.
    fn take(&mut self, node: NodeHandle) -> Result<NodeData, NodeError> {
        if let Some(parent) = self.data(node)?.parent {
            if let Some(parent_data) = self.slots[parent].maybe_node.as_mut() {
                parent_data.children.retain(|index| *index != node.index);
            }
        }

        let data = self.slots[node.index]
            .maybe_node
            .take()
            .ok_or(NodeError::StaleHandle(node))?;
        self.release(node.index);
        Ok(data)
    }

    fn drop_subtree(&mut self, index: usize) {
        let mut stack = vec![index];

        while let Some(index) = stack.pop() {
            if let Some(data) = self.slots[index].maybe_node.take() {
                stack.extend(data.children);
                self.release(index);
            }
        }
    }

    fn release(&mut self, index: usize) {
        self.slots[index].generation += 1;
        self.free.push(index);
    }

    /// Entries of the node's own spatial index, sorted, for comparing index states.
    pub fn index_entries(&self, node: NodeHandle) -> Result<Vec<([i64; 3], [i64; 3], ItemId)>, NodeError> {
        let mut entries: Vec<_> = self
            .data(node)?
            .index
            .iter()
            .map(|(aabb, id)| (aabb.lower(), aabb.upper(), id))
            .collect();
        entries.sort();
        Ok(entries)
    }
}
