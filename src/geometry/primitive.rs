use std::f64::consts::PI;

use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        hull::Hull,
        shape::{AccessShape, MeasureLength},
    },
    math::{self, Circle, Point, Segment},
};

/// Largest deviation, in board units, allowed between an arc and the chords it is sampled into.
pub const ARC_TOLERANCE: i64 = 100;

const MAX_ARC_CHORDS: usize = 64;

/// Segment thickened by `width`, i.e. every point closer than `width / 2` to `seg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capsule {
    pub seg: Segment,
    pub width: i64,
}

pub(crate) fn bbox_of(points: impl IntoIterator<Item = Point>, margin: i64) -> AABB<[i64; 2]> {
    let mut lower = [i64::MAX, i64::MAX];
    let mut upper = [i64::MIN, i64::MIN];

    for p in points {
        lower = [lower[0].min(p.x()), lower[1].min(p.y())];
        upper = [upper[0].max(p.x()), upper[1].max(p.y())];
    }

    AABB::from_corners(
        [lower[0] - margin, lower[1] - margin],
        [upper[0] + margin, upper[1] + margin],
    )
}

fn half_up(width: i64) -> i64 {
    (width + 1) / 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotShape {
    pub circle: Circle,
}

impl MeasureLength for DotShape {
    fn length(&self) -> f64 {
        0.0
    }
}

impl AccessShape for DotShape {
    fn center(&self) -> Point {
        self.circle.pos
    }

    fn contains_point(&self, p: Point) -> bool {
        math::squared_length(p - self.circle.pos) <= self.circle.r as i128 * self.circle.r as i128
    }

    fn bbox(&self, margin: i64) -> AABB<[i64; 2]> {
        bbox_of([self.circle.pos], self.circle.r + margin)
    }

    fn capsules(&self) -> Vec<Capsule> {
        vec![Capsule {
            seg: Segment::new(self.circle.pos, self.circle.pos),
            width: 2 * self.circle.r,
        }]
    }

    fn hull(&self, margin: i64) -> Hull {
        Hull::octagonal(&[self.circle.pos], self.circle.r + margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegShape {
    pub from: Point,
    pub to: Point,
    pub width: i64,
}

impl SegShape {
    pub fn segment(&self) -> Segment {
        Segment::new(self.from, self.to)
    }
}

impl MeasureLength for SegShape {
    fn length(&self) -> f64 {
        math::euclidean_distance(self.from, self.to)
    }
}

impl AccessShape for SegShape {
    fn center(&self) -> Point {
        (self.from + self.to) / 2
    }

    fn contains_point(&self, p: Point) -> bool {
        2.0 * math::point_segment_distance(p, &self.segment()) <= self.width as f64
    }

    fn bbox(&self, margin: i64) -> AABB<[i64; 2]> {
        bbox_of([self.from, self.to], half_up(self.width) + margin)
    }

    fn capsules(&self) -> Vec<Capsule> {
        vec![Capsule {
            seg: self.segment(),
            width: self.width,
        }]
    }

    fn hull(&self, margin: i64) -> Hull {
        Hull::octagonal(&[self.from, self.to], half_up(self.width) + margin)
    }
}

/// Circular arc track. `angle` is the signed sweep in radians, positive counterclockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcShape {
    pub center: Point,
    pub radius: i64,
    pub start_angle: f64,
    pub angle: f64,
    pub width: i64,
}

impl ArcShape {
    pub fn start_point(&self) -> Point {
        math::polar_point(self.center, self.radius, self.start_angle)
    }

    pub fn end_point(&self) -> Point {
        math::polar_point(self.center, self.radius, self.start_angle + self.angle)
    }

    pub fn spans_angle(&self, angle: f64) -> bool {
        if self.angle >= 0.0 {
            math::normalize_angle(angle - self.start_angle) <= self.angle
        } else {
            math::normalize_angle(self.start_angle - angle) <= -self.angle
        }
    }

    /// Chord endpoints together with the largest distance between a chord and the arc.
    ///
    /// The deviation includes one unit for rounding the chord endpoints to the grid.
    pub fn chords(&self) -> (Vec<Point>, i64) {
        let sweep = self.angle.abs().min(2.0 * PI);
        let radius = self.radius.max(1) as f64;

        let count = if self.radius <= ARC_TOLERANCE {
            1
        } else {
            let max_step = 2.0 * (1.0 - ARC_TOLERANCE as f64 / radius).acos();
            ((sweep / max_step).ceil() as usize).clamp(1, MAX_ARC_CHORDS)
        };

        let step = self.angle / count as f64;
        let sagitta = radius * (1.0 - (step.abs() / 2.0).cos());
        let points = (0..=count)
            .map(|i| math::polar_point(self.center, self.radius, self.start_angle + step * i as f64))
            .collect();

        (points, sagitta.ceil() as i64 + 1)
    }
}

impl MeasureLength for ArcShape {
    fn length(&self) -> f64 {
        self.angle.abs() * self.radius as f64
    }
}

impl AccessShape for ArcShape {
    fn center(&self) -> Point {
        math::polar_point(self.center, self.radius, self.start_angle + self.angle / 2.0)
    }

    fn contains_point(&self, p: Point) -> bool {
        let d = math::euclidean_distance(p, self.center);
        let half_width = self.width as f64 / 2.0;

        (d - self.radius as f64).abs() <= half_width
            && self.spans_angle(math::vector_angle(p - self.center))
    }

    fn bbox(&self, margin: i64) -> AABB<[i64; 2]> {
        let (points, deviation) = self.chords();
        bbox_of(points, half_up(self.width) + deviation + margin)
    }

    fn capsules(&self) -> Vec<Capsule> {
        let (points, deviation) = self.chords();

        points
            .windows(2)
            .map(|pair| Capsule {
                seg: Segment::new(pair[0], pair[1]),
                width: self.width + 2 * deviation,
            })
            .collect()
    }

    fn hull(&self, margin: i64) -> Hull {
        let (points, deviation) = self.chords();
        Hull::octagonal(&points, half_up(self.width) + deviation + margin)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use geo::point;

    use super::*;
    use crate::geometry::shape::Shape;

    #[test]
    fn test_arc_endpoints_and_length() {
        let arc = ArcShape {
            center: point! {x: 0, y: 0},
            radius: 1000,
            start_angle: 0.0,
            angle: FRAC_PI_2,
            width: 10,
        };

        assert_eq!(arc.start_point(), point! {x: 1000, y: 0});
        assert_eq!(arc.end_point(), point! {x: 0, y: 1000});
        assert!((arc.length() - 1000.0 * FRAC_PI_2).abs() < 1e-9);
        assert!(arc.contains_point(point! {x: 707, y: 707}));
        assert!(!arc.contains_point(point! {x: -707, y: -707}));
    }

    #[test]
    fn test_arc_collision_is_conservative() {
        let arc: Shape = ArcShape {
            center: point! {x: 0, y: 0},
            radius: 100_000,
            start_angle: 0.0,
            angle: FRAC_PI_2,
            width: 1000,
        }
        .into();
        // Midpoint of the arc lies at (70711, 70711); the edge of this dot sits about 4500
        // outside the arc's outer edge along the bisector.
        let dot: Shape = DotShape {
            circle: Circle {
                pos: point! {x: 74600, y: 74600},
                r: 500,
            },
        }
        .into();

        assert!(dot.collides(&arc, 5000));
        assert!(arc.collides(&dot, 5000));
        assert!(!dot.collides(&arc, 3000));
    }
}
