use std::f64::consts::TAU;

use geo::point;
use serde::{Deserialize, Serialize};

/// Board coordinate. Components are integer board units, nanometres by convention.
pub type Point = geo::Point<i64>;

/// Largest absolute coordinate value for which every predicate below stays exact.
pub const COORD_LIMIT: i64 = 1 << 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub pos: Point,
    pub r: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn length(&self) -> f64 {
        euclidean_distance(self.a, self.b)
    }
}

pub fn dot_product(v1: Point, v2: Point) -> i128 {
    v1.x() as i128 * v2.x() as i128 + v1.y() as i128 * v2.y() as i128
}

pub fn cross_product(v1: Point, v2: Point) -> i128 {
    v1.x() as i128 * v2.y() as i128 - v1.y() as i128 * v2.x() as i128
}

pub fn seq_cross_product(start: Point, stop: Point, reference: Point) -> i128 {
    cross_product(stop - start, reference - stop)
}

pub fn squared_length(v: Point) -> i128 {
    dot_product(v, v)
}

pub fn euclidean_distance(p1: Point, p2: Point) -> f64 {
    (squared_length(p2 - p1) as f64).sqrt()
}

pub fn vector_angle(v: Point) -> f64 {
    (v.y() as f64).atan2(v.x() as f64)
}

/// Whether `v` lies within the counterclockwise sweep from `from` to `to`.
pub fn between_vectors(v: Point, from: Point, to: Point) -> bool {
    let cross = cross_product(from, to);

    if cross >= 0 {
        cross_product(from, v) >= 0 && cross_product(v, to) >= 0
    } else {
        cross_product(from, v) >= 0 || cross_product(v, to) >= 0
    }
}

pub fn polar_point(center: Point, r: i64, angle: f64) -> Point {
    point! {
        x: center.x() + (r as f64 * angle.cos()).round() as i64,
        y: center.y() + (r as f64 * angle.sin()).round() as i64,
    }
}

pub fn normalize_angle(angle: f64) -> f64 {
    let angle = angle % TAU;

    if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}

fn orientation(a: Point, b: Point, c: Point) -> i128 {
    cross_product(b - a, c - a).signum()
}

fn on_segment(p: Point, seg: &Segment) -> bool {
    p.x() >= seg.a.x().min(seg.b.x())
        && p.x() <= seg.a.x().max(seg.b.x())
        && p.y() >= seg.a.y().min(seg.b.y())
        && p.y() <= seg.a.y().max(seg.b.y())
}

/// Exact test whether two closed segments share at least one point.
pub fn segments_intersect(seg1: &Segment, seg2: &Segment) -> bool {
    let o1 = orientation(seg1.a, seg1.b, seg2.a);
    let o2 = orientation(seg1.a, seg1.b, seg2.b);
    let o3 = orientation(seg2.a, seg2.b, seg1.a);
    let o4 = orientation(seg2.a, seg2.b, seg1.b);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == 0 && on_segment(seg2.a, seg1))
        || (o2 == 0 && on_segment(seg2.b, seg1))
        || (o3 == 0 && on_segment(seg1.a, seg2))
        || (o4 == 0 && on_segment(seg1.b, seg2))
}

/// Exact test of `2 * distance(p, seg) < twice_gap`.
///
/// Distances are compared doubled so that half widths never need rounding.
pub fn point_segment_closer(p: Point, seg: &Segment, twice_gap: i64) -> bool {
    if twice_gap <= 0 {
        return false;
    }

    let limit = twice_gap as i128 * twice_gap as i128;
    let v = seg.b - seg.a;
    let w = p - seg.a;
    let t = dot_product(w, v);
    let len2 = squared_length(v);

    if t <= 0 || len2 == 0 {
        return 4 * squared_length(w) < limit;
    }

    if t >= len2 {
        return 4 * squared_length(p - seg.b) < limit;
    }

    let cross = cross_product(v, w);
    // 4 * cross^2 / len2 < limit, kept in integers.
    4 * cross * cross < limit * len2
}

/// Exact test of `2 * distance(seg1, seg2) < twice_gap`.
pub fn segments_closer(seg1: &Segment, seg2: &Segment, twice_gap: i64) -> bool {
    if twice_gap <= 0 {
        return false;
    }

    segments_intersect(seg1, seg2)
        || point_segment_closer(seg1.a, seg2, twice_gap)
        || point_segment_closer(seg1.b, seg2, twice_gap)
        || point_segment_closer(seg2.a, seg1, twice_gap)
        || point_segment_closer(seg2.b, seg1, twice_gap)
}

pub fn point_segment_distance(p: Point, seg: &Segment) -> f64 {
    let v = seg.b - seg.a;
    let w = p - seg.a;
    let t = dot_product(w, v);
    let len2 = squared_length(v);

    if t <= 0 || len2 == 0 {
        return euclidean_distance(p, seg.a);
    }

    if t >= len2 {
        return euclidean_distance(p, seg.b);
    }

    (cross_product(v, w) as f64).abs() / (len2 as f64).sqrt()
}

pub fn segment_distance(seg1: &Segment, seg2: &Segment) -> f64 {
    if segments_intersect(seg1, seg2) {
        return 0.0;
    }

    point_segment_distance(seg1.a, seg2)
        .min(point_segment_distance(seg1.b, seg2))
        .min(point_segment_distance(seg2.a, seg1))
        .min(point_segment_distance(seg2.b, seg1))
}

/// Proper crossing point of two segments, rounded to the integer grid, together with the
/// parameter along `seg1` at which it occurs. Collinear overlaps yield `None`.
pub fn segment_intersection(seg1: &Segment, seg2: &Segment) -> Option<(Point, f64)> {
    let r = seg1.b - seg1.a;
    let s = seg2.b - seg2.a;
    let denom = cross_product(r, s);

    if denom == 0 {
        return None;
    }

    let qp = seg2.a - seg1.a;
    let t_num = cross_product(qp, s);
    let u_num = cross_product(qp, r);

    let in_range = |num: i128| {
        if denom > 0 {
            num >= 0 && num <= denom
        } else {
            num <= 0 && num >= denom
        }
    };

    if !in_range(t_num) || !in_range(u_num) {
        return None;
    }

    let t = t_num as f64 / denom as f64;
    let p = point! {
        x: seg1.a.x() + (r.x() as f64 * t).round() as i64,
        y: seg1.a.y() + (r.y() as f64 * t).round() as i64,
    };

    Some((p, t))
}

/// Boundary-inclusive point-in-polygon test by winding number.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut winding = 0;

    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let edge = Segment::new(a, b);

        if orientation(a, b, p) == 0 && on_segment(p, &edge) {
            return true;
        }

        if a.y() <= p.y() {
            if b.y() > p.y() && orientation(a, b, p) > 0 {
                winding += 1;
            }
        } else if b.y() <= p.y() && orientation(a, b, p) < 0 {
            winding -= 1;
        }
    }

    winding != 0
}

pub fn polygon_edges(polygon: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    (0..polygon.len()).map(move |i| Segment::new(polygon[i], polygon[(i + 1) % polygon.len()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_segment_closer_boundary() {
        let seg = Segment::new(point! {x: 0, y: 0}, point! {x: 100, y: 0});

        // Distance 10, limit 10: equal is not closer.
        assert!(!point_segment_closer(point! {x: 50, y: 10}, &seg, 20));
        assert!(point_segment_closer(point! {x: 50, y: 9}, &seg, 20));
        // Beyond the end the distance is measured to the endpoint.
        assert!(!point_segment_closer(point! {x: 106, y: 8}, &seg, 20));
        assert!(point_segment_closer(point! {x: 105, y: 8}, &seg, 20));
    }

    #[test]
    fn test_segments_intersect() {
        let seg1 = Segment::new(point! {x: 0, y: 0}, point! {x: 10, y: 10});
        let seg2 = Segment::new(point! {x: 0, y: 10}, point! {x: 10, y: 0});
        let seg3 = Segment::new(point! {x: 20, y: 20}, point! {x: 30, y: 30});
        let seg4 = Segment::new(point! {x: 10, y: 10}, point! {x: 30, y: 10});

        assert!(segments_intersect(&seg1, &seg2));
        assert!(!segments_intersect(&seg1, &seg3));
        assert!(segments_intersect(&seg1, &seg4));
    }

    #[test]
    fn test_segment_intersection_point() {
        let seg1 = Segment::new(point! {x: 0, y: 0}, point! {x: 100, y: 0});
        let seg2 = Segment::new(point! {x: 40, y: -10}, point! {x: 40, y: 10});

        let (p, t) = segment_intersection(&seg1, &seg2).unwrap();
        assert_eq!(p, point! {x: 40, y: 0});
        assert!((t - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            point! {x: 0, y: 0},
            point! {x: 10, y: 0},
            point! {x: 10, y: 10},
            point! {x: 0, y: 10},
        ];

        assert!(point_in_polygon(point! {x: 5, y: 5}, &square));
        assert!(point_in_polygon(point! {x: 10, y: 5}, &square));
        assert!(!point_in_polygon(point! {x: 11, y: 5}, &square));
    }
}
