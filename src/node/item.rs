use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        poly::PolyShape,
        primitive::{ArcShape, DotShape, SegShape},
        shape::Shape,
    },
    math::{Circle, Point},
};

/// Identifier of an item, unique across every node of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Inclusive range of copper layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRange {
    pub start: usize,
    pub end: usize,
}

impl LayerRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            start: from.min(to),
            end: from.max(to),
        }
    }

    pub fn single(layer: usize) -> Self {
        Self::new(layer, layer)
    }

    pub fn overlaps(&self, other: &LayerRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, layer: usize) -> bool {
        self.start <= layer && layer <= self.end
    }

    /// Lowest layer shared with `other`.
    pub fn first_common(&self, other: &LayerRange) -> Option<usize> {
        self.overlaps(other).then(|| self.start.max(other.start))
    }
}

#[enum_dispatch]
pub trait GetLayers {
    fn layers(&self) -> LayerRange;
}

#[enum_dispatch]
pub trait GetMaybeNet {
    fn maybe_net(&self) -> Option<usize>;
}

#[enum_dispatch]
pub trait MakeShape {
    fn shape(&self) -> Shape;
}

#[enum_dispatch]
pub trait GetAnchors {
    /// Points other items of the same net connect to.
    fn anchors(&self) -> Vec<Point>;
}

#[enum_dispatch]
pub trait GetLocked {
    fn locked(&self) -> bool;
}

macro_rules! impl_single_layer_item {
    ($item_struct:ident) => {
        impl GetLayers for $item_struct {
            fn layers(&self) -> LayerRange {
                LayerRange::single(self.layer)
            }
        }

        impl GetMaybeNet for $item_struct {
            fn maybe_net(&self) -> Option<usize> {
                self.maybe_net
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegItem {
    pub from: Point,
    pub to: Point,
    pub width: i64,
    pub layer: usize,
    pub maybe_net: Option<usize>,
    #[serde(default)]
    pub locked: bool,
}

impl_single_layer_item!(SegItem);

impl MakeShape for SegItem {
    fn shape(&self) -> Shape {
        SegShape {
            from: self.from,
            to: self.to,
            width: self.width,
        }
        .into()
    }
}

impl GetAnchors for SegItem {
    fn anchors(&self) -> Vec<Point> {
        vec![self.from, self.to]
    }
}

impl GetLocked for SegItem {
    fn locked(&self) -> bool {
        self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcItem {
    pub arc: ArcShape,
    pub layer: usize,
    pub maybe_net: Option<usize>,
    #[serde(default)]
    pub locked: bool,
}

impl_single_layer_item!(ArcItem);

impl MakeShape for ArcItem {
    fn shape(&self) -> Shape {
        self.arc.into()
    }
}

impl GetAnchors for ArcItem {
    fn anchors(&self) -> Vec<Point> {
        vec![self.arc.start_point(), self.arc.end_point()]
    }
}

impl GetLocked for ArcItem {
    fn locked(&self) -> bool {
        self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaItem {
    pub pos: Point,
    pub diameter: i64,
    pub drill: i64,
    pub layers: LayerRange,
    pub maybe_net: Option<usize>,
    #[serde(default)]
    pub locked: bool,
}

impl GetLayers for ViaItem {
    fn layers(&self) -> LayerRange {
        self.layers
    }
}

impl GetMaybeNet for ViaItem {
    fn maybe_net(&self) -> Option<usize> {
        self.maybe_net
    }
}

impl MakeShape for ViaItem {
    fn shape(&self) -> Shape {
        DotShape {
            circle: Circle {
                pos: self.pos,
                r: self.diameter / 2,
            },
        }
        .into()
    }
}

impl GetAnchors for ViaItem {
    fn anchors(&self) -> Vec<Point> {
        vec![self.pos]
    }
}

impl GetLocked for ViaItem {
    fn locked(&self) -> bool {
        self.locked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadItem {
    pub pos: Point,
    pub shape: Shape,
    pub layers: LayerRange,
    pub maybe_net: Option<usize>,
    #[serde(default)]
    pub drill: Option<i64>,
}

impl GetLayers for PadItem {
    fn layers(&self) -> LayerRange {
        self.layers
    }
}

impl GetMaybeNet for PadItem {
    fn maybe_net(&self) -> Option<usize> {
        self.maybe_net
    }
}

impl MakeShape for PadItem {
    fn shape(&self) -> Shape {
        self.shape.clone()
    }
}

impl GetAnchors for PadItem {
    fn anchors(&self) -> Vec<Point> {
        vec![self.pos]
    }
}

impl GetLocked for PadItem {
    fn locked(&self) -> bool {
        true
    }
}

/// Copper zone outline, or a keepout when it has no net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneItem {
    pub outline: Vec<Point>,
    pub layer: usize,
    pub maybe_net: Option<usize>,
}

impl_single_layer_item!(ZoneItem);

impl MakeShape for ZoneItem {
    fn shape(&self) -> Shape {
        PolyShape {
            outline: self.outline.clone(),
        }
        .into()
    }
}

impl GetAnchors for ZoneItem {
    fn anchors(&self) -> Vec<Point> {
        vec![]
    }
}

impl GetLocked for ZoneItem {
    fn locked(&self) -> bool {
        true
    }
}

#[enum_dispatch(GetLayers, GetMaybeNet, MakeShape, GetAnchors, GetLocked)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Seg(SegItem),
    Arc(ArcItem),
    Via(ViaItem),
    Pad(PadItem),
    Zone(ZoneItem),
}

impl Item {
    /// Whether shoving may displace this item.
    pub fn is_movable(&self) -> bool {
        matches!(self, Item::Seg(seg) if !seg.locked)
    }

    /// Drilled hole, subject to hole clearance on top of copper clearance.
    pub fn hole(&self) -> Option<Shape> {
        let (pos, drill) = match self {
            Item::Via(via) => (via.pos, via.drill),
            Item::Pad(pad) => (pad.pos, pad.drill?),
            _ => return None,
        };

        (drill > 0).then(|| {
            DotShape {
                circle: Circle {
                    pos,
                    r: drill / 2,
                },
            }
            .into()
        })
    }

    pub fn has_anchor(&self, p: Point) -> bool {
        self.anchors().contains(&p)
    }

    pub fn as_seg(&self) -> Option<&SegItem> {
        match self {
            Item::Seg(seg) => Some(seg),
            _ => None,
        }
    }
}
