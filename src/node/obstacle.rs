use crate::node::{
    item::{GetLayers, GetMaybeNet, Item, ItemId, LayerRange, MakeShape},
    rules::{AccessRules, Conditions},
};

/// Item found too close to a candidate during a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub item: ItemId,
    pub maybe_net: Option<usize>,
    pub layers: LayerRange,
    /// Required gap.
    pub clearance: i64,
    /// Actual gap, zero when the shapes overlap.
    pub distance: f64,
}

impl Obstacle {
    /// How far the actual gap falls short of the required one.
    pub fn penetration(&self) -> f64 {
        (self.clearance as f64 - self.distance).max(0.0)
    }
}

/// Clearance violated between two items and the gap actually found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub clearance: i64,
    pub distance: f64,
}

pub fn same_net(item1: &Item, item2: &Item) -> bool {
    matches!((item1.maybe_net(), item2.maybe_net()), (Some(net1), Some(net2)) if net1 == net2)
}

/// Whether two items violate clearance. Items of the same net never do; items without a net,
/// keepouts among them, collide with everything they overlap in layers with.
pub fn collision(item1: &Item, item2: &Item, rules: &impl AccessRules) -> Option<Collision> {
    if same_net(item1, item2) {
        return None;
    }

    let (layers1, layers2) = (item1.layers(), item2.layers());
    let first = layers1.first_common(&layers2)?;
    let last = layers1.end.min(layers2.end);

    let clearance = (first..=last)
        .map(|layer| {
            rules.clearance(
                &Conditions {
                    maybe_net: item1.maybe_net(),
                    maybe_layer: Some(layer),
                },
                &Conditions {
                    maybe_net: item2.maybe_net(),
                    maybe_layer: Some(layer),
                },
            )
        })
        .max()
        .unwrap_or(0);

    let shape1 = item1.shape();
    let shape2 = item2.shape();

    if shape1.collides(&shape2, clearance) {
        return Some(Collision {
            clearance,
            distance: shape1.distance(&shape2),
        });
    }

    let hole_clearance = rules.hole_clearance(
        &Conditions {
            maybe_net: item1.maybe_net(),
            maybe_layer: Some(first),
        },
        &Conditions {
            maybe_net: item2.maybe_net(),
            maybe_layer: Some(first),
        },
    );

    for (hole, shape) in [(item1.hole(), &shape2), (item2.hole(), &shape1)] {
        if let Some(hole) = hole {
            if hole.collides(shape, hole_clearance) {
                return Some(Collision {
                    clearance: hole_clearance,
                    distance: hole.distance(shape),
                });
            }
        }
    }

    None
}

/// Largest clearance an item may need against anything, for sizing spatial queries.
pub fn query_margin(item: &Item, rules: &impl AccessRules) -> i64 {
    rules.largest_clearance(item.maybe_net()).max(0) + 1
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;
    use crate::{
        geometry::poly::PolyShape,
        node::{
            item::{SegItem, ViaItem, ZoneItem},
            rules::ClearanceRules,
        },
    };

    fn seg(y: i64, net: usize) -> Item {
        Item::Seg(SegItem {
            from: point! {x: 0, y: y},
            to: point! {x: 100, y: y},
            width: 10,
            layer: 0,
            maybe_net: Some(net),
            locked: false,
        })
    }

    #[test]
    fn test_same_net_never_collides() {
        let rules = ClearanceRules::uniform(5);

        assert!(collision(&seg(0, 1), &seg(5, 1), &rules).is_none());
        assert!(collision(&seg(0, 1), &seg(5, 2), &rules).is_some());
        // Gap of exactly 5.
        assert!(collision(&seg(0, 1), &seg(15, 2), &rules).is_none());
    }

    #[test]
    fn test_keepout_collides_with_every_net() {
        let rules = ClearanceRules::uniform(0);
        let keepout = Item::Zone(ZoneItem {
            outline: PolyShape::rect(point! {x: 40, y: -40}, point! {x: 60, y: 40}).outline,
            layer: 0,
            maybe_net: None,
        });

        assert!(collision(&keepout, &seg(0, 1), &rules).is_some());
        assert!(collision(&seg(0, 7), &keepout, &rules).is_some());
    }

    #[test]
    fn test_hole_clearance() {
        let rules = ClearanceRules {
            clearance: 5,
            hole_clearance: 40,
            ..Default::default()
        };
        let via = Item::Via(ViaItem {
            pos: point! {x: 50, y: 50},
            diameter: 20,
            drill: 10,
            layers: LayerRange::new(0, 1),
            maybe_net: Some(3),
            locked: false,
        });

        // Copper gap is 50 - 10 - 5 = 35, hole gap is 50 - 5 - 5 = 40.
        assert!(collision(&via, &seg(0, 1), &rules).is_none());
        // Copper gap 34, still clear; hole gap 39 is not.
        let collision = collision(&via, &seg(1, 1), &rules).unwrap();
        assert_eq!(collision.clearance, 40);
    }
}
