use enum_dispatch::enum_dispatch;
use rstar::{Envelope, AABB};
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        hull::Hull,
        poly::PolyShape,
        primitive::{ArcShape, Capsule, DotShape, SegShape},
    },
    math::{self, Point},
};

#[enum_dispatch]
pub trait MeasureLength {
    fn length(&self) -> f64;
}

#[enum_dispatch]
pub trait AccessShape: MeasureLength {
    fn center(&self) -> Point;
    fn contains_point(&self, p: Point) -> bool;
    fn bbox(&self, margin: i64) -> AABB<[i64; 2]>;

    /// Decomposition into thick segments. Every point of the shape outside of its region
    /// lies within one of them.
    fn capsules(&self) -> Vec<Capsule>;

    /// Filled interior, for shapes that have one.
    fn region(&self) -> Option<&[Point]> {
        None
    }

    /// Convex octagon containing every point closer than `margin` to the shape.
    fn hull(&self, margin: i64) -> Hull;

    fn envelope_3d(&self, margin: i64, first_layer: usize, last_layer: usize) -> AABB<[i64; 3]> {
        let envelope = self.bbox(margin);
        AABB::from_corners(
            [envelope.lower()[0], envelope.lower()[1], first_layer as i64],
            [envelope.upper()[0], envelope.upper()[1], last_layer as i64],
        )
    }
}

#[enum_dispatch(MeasureLength, AccessShape)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Dot(DotShape),
    Seg(SegShape),
    Arc(ArcShape),
    Poly(PolyShape),
}

impl Shape {
    /// Whether the gap between the two shapes is smaller than `clearance`.
    ///
    /// A gap of exactly `clearance` does not collide. The test is symmetric.
    pub fn collides(&self, other: &Shape, clearance: i64) -> bool {
        let clearance = clearance.max(0);

        if !self.bbox(clearance).intersects(&other.bbox(0)) {
            return false;
        }

        let capsules = self.capsules();
        let other_capsules = other.capsules();

        for capsule in &capsules {
            for other_capsule in &other_capsules {
                if math::segments_closer(
                    &capsule.seg,
                    &other_capsule.seg,
                    capsule.width + other_capsule.width + 2 * clearance,
                ) {
                    return true;
                }
            }
        }

        Self::region_swallows(self.region(), &other_capsules)
            || Self::region_swallows(other.region(), &capsules)
    }

    /// Smallest gap between the two shapes, zero when they overlap.
    pub fn distance(&self, other: &Shape) -> f64 {
        let capsules = self.capsules();
        let other_capsules = other.capsules();

        if Self::region_swallows(self.region(), &other_capsules)
            || Self::region_swallows(other.region(), &capsules)
        {
            return 0.0;
        }

        let mut distance = f64::INFINITY;

        for capsule in &capsules {
            for other_capsule in &other_capsules {
                let gap = math::segment_distance(&capsule.seg, &other_capsule.seg)
                    - (capsule.width + other_capsule.width) as f64 / 2.0;
                distance = distance.min(gap);
            }
        }

        distance.max(0.0)
    }

    fn region_swallows(region: Option<&[Point]>, capsules: &[Capsule]) -> bool {
        let Some(region) = region else {
            return false;
        };

        capsules
            .iter()
            .any(|capsule| math::point_in_polygon(capsule.seg.a, region))
    }
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;
    use crate::math::Circle;

    fn seg(x1: i64, y1: i64, x2: i64, y2: i64, width: i64) -> Shape {
        SegShape {
            from: point! {x: x1, y: y1},
            to: point! {x: x2, y: y2},
            width,
        }
        .into()
    }

    #[test]
    fn test_clearance_boundary_is_not_a_collision() {
        // Centerlines 20 apart, half widths 5 + 5, so the gap is exactly 10.
        let a = seg(0, 0, 100, 0, 10);
        let b = seg(0, 20, 100, 20, 10);

        assert!(!a.collides(&b, 10));
        assert!(!b.collides(&a, 10));
        assert!(a.collides(&b, 11));
        assert!(b.collides(&a, 11));
        assert_eq!(a.distance(&b), 10.0);
    }

    #[test]
    fn test_dot_seg_symmetry() {
        let dot: Shape = DotShape {
            circle: Circle {
                pos: point! {x: 50, y: 30},
                r: 10,
            },
        }
        .into();
        let track = seg(0, 0, 100, 0, 10);

        // Gap is 30 - 10 - 5 = 15.
        assert!(!dot.collides(&track, 15));
        assert!(!track.collides(&dot, 15));
        assert!(dot.collides(&track, 16));
        assert!(track.collides(&dot, 16));
    }

    #[test]
    fn test_poly_swallows_track() {
        let poly: Shape = PolyShape {
            outline: vec![
                point! {x: -100, y: -100},
                point! {x: 100, y: -100},
                point! {x: 100, y: 100},
                point! {x: -100, y: 100},
            ],
        }
        .into();
        let track = seg(-10, 0, 10, 0, 2);

        assert!(poly.collides(&track, 0));
        assert!(track.collides(&poly, 0));
        assert_eq!(poly.distance(&track), 0.0);
    }
}
