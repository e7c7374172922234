use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::shape::MeasureLength,
    math::{self, Point, Segment},
    node::{
        item::{GetLayers, Item, ItemId, LayerRange, SegItem},
        obstacle::Obstacle,
        rules::AccessRules,
        NodeArena, NodeError, NodeHandle,
    },
    router::settings::CornerMode,
};

/// Polyline trace on a single layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub points: Vec<Point>,
    pub layer: usize,
    pub width: i64,
    pub maybe_net: Option<usize>,
}

impl Line {
    pub fn new(points: Vec<Point>, layer: usize, width: i64, maybe_net: Option<usize>) -> Self {
        let mut line = Self {
            points,
            layer,
            width,
            maybe_net,
        };
        line.simplify();
        line
    }

    /// Path from `from` to `to` as the corner mode allows it to be drawn directly.
    pub fn direct(
        from: Point,
        to: Point,
        corner_mode: CornerMode,
        layer: usize,
        width: i64,
        maybe_net: Option<usize>,
    ) -> Self {
        let points = match corner_mode {
            CornerMode::Free => vec![from, to],
            CornerMode::Mitered45 => mitered_path(from, to),
        };

        Self::new(points, layer, width, maybe_net)
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| Segment::new(*a, *b))
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Drops repeated points and the middle point of every collinear triple.
    pub fn simplify(&mut self) {
        self.points.dedup();

        let mut i = 1;

        while i + 1 < self.points.len() {
            let (a, b, c) = (self.points[i - 1], self.points[i], self.points[i + 1]);

            if math::cross_product(b - a, c - b) == 0 {
                self.points.remove(i);
                self.points.dedup();
                i = i.saturating_sub(1).max(1);
            } else {
                i += 1;
            }
        }
    }

    pub fn is_octilinear(&self) -> bool {
        self.segments().all(|seg| is_octilinear(&seg))
    }

    pub fn seg_item(&self, seg: &Segment) -> Item {
        Item::Seg(SegItem {
            from: seg.a,
            to: seg.b,
            width: self.width,
            layer: self.layer,
            maybe_net: self.maybe_net,
            locked: false,
        })
    }

    pub fn seg_items(&self) -> Vec<Item> {
        self.segments().map(|seg| self.seg_item(&seg)).collect()
    }

    /// Items in `node` the line violates clearance with, one entry per item.
    pub fn obstacles(
        &self,
        arena: &NodeArena,
        node: NodeHandle,
        rules: &impl AccessRules,
    ) -> Result<Vec<Obstacle>, NodeError> {
        let mut obstacles: BTreeMap<ItemId, Obstacle> = BTreeMap::new();

        for item in self.seg_items() {
            for obstacle in arena.query(node, &item, rules)? {
                match obstacles.get(&obstacle.item) {
                    Some(known) if known.penetration() >= obstacle.penetration() => (),
                    _ => {
                        obstacles.insert(obstacle.item, obstacle);
                    }
                }
            }
        }

        let mut obstacles: Vec<Obstacle> = obstacles.into_values().collect();
        obstacles.sort_by(|a, b| b.penetration().total_cmp(&a.penetration()));
        Ok(obstacles)
    }

    /// Adds the line's segments to `node`.
    pub fn add_to(&self, arena: &mut NodeArena, node: NodeHandle) -> Result<Vec<ItemId>, NodeError> {
        self.seg_items()
            .into_iter()
            .map(|item| arena.add(node, item))
            .collect()
    }
}

impl MeasureLength for Line {
    fn length(&self) -> f64 {
        self.segments().map(|seg| seg.length()).sum()
    }
}

pub fn is_octilinear(seg: &Segment) -> bool {
    let d = seg.b - seg.a;
    d.x() == 0 || d.y() == 0 || d.x().abs() == d.y().abs()
}

/// Diagonal run followed by a straight one.
fn mitered_path(from: Point, to: Point) -> Vec<Point> {
    let d = to - from;

    if is_octilinear(&Segment::new(from, to)) {
        return vec![from, to];
    }

    let diagonal = d.x().abs().min(d.y().abs());
    let corner = Point::new(
        from.x() + d.x().signum() * diagonal,
        from.y() + d.y().signum() * diagonal,
    );

    vec![from, corner, to]
}

/// Chain of same-net segments joined end to end, as a shove moves them together.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledLine {
    pub items: Vec<ItemId>,
    pub line: Line,
}

/// Follows the segment `seed` through its joints in both directions. A joint is crossed only
/// when exactly one other segment of the same width meets there and nothing else does.
pub fn assemble_line(
    arena: &NodeArena,
    node: NodeHandle,
    seed: ItemId,
) -> Result<AssembledLine, NodeError> {
    let Some(Item::Seg(seed_seg)) = arena.item(node, seed)?.cloned() else {
        return Err(NodeError::NoSuchItem(seed));
    };

    let mut visited = BTreeSet::from([seed]);
    let mut ids = vec![seed];
    let mut points = vec![seed_seg.from, seed_seg.to];

    for forward in [true, false] {
        loop {
            let tip = if forward { points[points.len() - 1] } else { points[0] };
            let Some((next_id, next_point)) =
                next_in_chain(arena, node, &seed_seg, tip, &visited)?
            else {
                break;
            };

            visited.insert(next_id);

            if forward {
                ids.push(next_id);
                points.push(next_point);
            } else {
                ids.insert(0, next_id);
                points.insert(0, next_point);
            }
        }
    }

    let line = Line {
        points,
        layer: seed_seg.layer,
        width: seed_seg.width,
        maybe_net: seed_seg.maybe_net,
    };

    Ok(AssembledLine { items: ids, line })
}

fn next_in_chain(
    arena: &NodeArena,
    node: NodeHandle,
    seed: &SegItem,
    tip: Point,
    visited: &BTreeSet<ItemId>,
) -> Result<Option<(ItemId, Point)>, NodeError> {
    let Some(net) = seed.maybe_net else {
        return Ok(None);
    };

    let joined: Vec<ItemId> = arena
        .joined(node, tip, LayerRange::single(seed.layer), net)?
        .into_iter()
        .filter(|id| !visited.contains(id))
        .collect();

    // Vias and pads are joined too, so a line ending on one stops here.
    let [next] = joined.as_slice() else {
        return Ok(None);
    };
    let next = *next;

    let Some(item) = arena.item(node, next)? else {
        return Ok(None);
    };

    let Item::Seg(seg) = item else {
        return Ok(None);
    };

    if seg.width != seed.width || seg.locked || seg.layers() != seed.layers() {
        return Ok(None);
    }

    let other_end = if seg.from == tip { seg.to } else { seg.from };

    Ok(Some((next, other_end)))
}
