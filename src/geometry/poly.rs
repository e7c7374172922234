use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        hull::Hull,
        primitive::{self, Capsule},
        shape::{AccessShape, MeasureLength},
    },
    math::{self, Point},
};

/// Filled simple polygon. The outline is implicitly closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyShape {
    pub outline: Vec<Point>,
}

impl PolyShape {
    pub fn rect(lower: Point, upper: Point) -> Self {
        Self {
            outline: vec![
                lower,
                Point::new(upper.x(), lower.y()),
                upper,
                Point::new(lower.x(), upper.y()),
            ],
        }
    }
}

impl MeasureLength for PolyShape {
    fn length(&self) -> f64 {
        math::polygon_edges(&self.outline)
            .map(|edge| edge.length())
            .sum()
    }
}

impl AccessShape for PolyShape {
    fn center(&self) -> Point {
        if self.outline.is_empty() {
            return Point::new(0, 0);
        }

        let sum = self
            .outline
            .iter()
            .fold(Point::new(0, 0), |sum, p| sum + *p);
        sum / self.outline.len() as i64
    }

    fn contains_point(&self, p: Point) -> bool {
        math::point_in_polygon(p, &self.outline)
    }

    fn bbox(&self, margin: i64) -> AABB<[i64; 2]> {
        primitive::bbox_of(self.outline.iter().copied(), margin)
    }

    fn capsules(&self) -> Vec<Capsule> {
        math::polygon_edges(&self.outline)
            .map(|seg| Capsule { seg, width: 0 })
            .collect()
    }

    fn region(&self) -> Option<&[Point]> {
        (self.outline.len() >= 3).then_some(&self.outline[..])
    }

    fn hull(&self, margin: i64) -> Hull {
        Hull::octagonal(&self.outline, margin)
    }
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;

    #[test]
    fn test_bbox_grows_by_margin() {
        let poly = PolyShape {
            outline: vec![
                point! {x: 0, y: 0},
                point! {x: 40, y: -10},
                point! {x: 30, y: 25},
            ],
        };

        assert_eq!(poly.bbox(0), AABB::from_corners([0, -10], [40, 25]));
        assert_eq!(poly.bbox(5), AABB::from_corners([-5, -15], [45, 30]));
    }
}
