use std::{cmp::Ordering, f64::consts::SQRT_2};

use itertools::Itertools;

use crate::math::{self, Point, Segment};

/// Convex polygon with counterclockwise vertices, used as the boundary a path walks along
/// to get around an obstacle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hull {
    vertices: Vec<Point>,
}

/// Point where a path segment crosses a hull edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub edge: usize,
    pub point: Point,
    pub t: f64,
}

impl Hull {
    /// Chamfered bounding box of `points` grown by `margin` in every direction, including the
    /// two diagonals. Contains every point closer than `margin` to the convex hull of `points`.
    pub fn octagonal(points: &[Point], margin: i64) -> Self {
        let diagonal_margin = (margin as f64 * SQRT_2).ceil() as i64;

        let x0 = points.iter().map(|p| p.x()).min().unwrap_or(0) - margin;
        let x1 = points.iter().map(|p| p.x()).max().unwrap_or(0) + margin;
        let y0 = points.iter().map(|p| p.y()).min().unwrap_or(0) - margin;
        let y1 = points.iter().map(|p| p.y()).max().unwrap_or(0) + margin;
        let s0 = points.iter().map(|p| p.x() + p.y()).min().unwrap_or(0) - diagonal_margin;
        let s1 = points.iter().map(|p| p.x() + p.y()).max().unwrap_or(0) + diagonal_margin;
        let d0 = points.iter().map(|p| p.x() - p.y()).min().unwrap_or(0) - diagonal_margin;
        let d1 = points.iter().map(|p| p.x() - p.y()).max().unwrap_or(0) + diagonal_margin;

        let mut vertices = vec![];

        // Bottom right corner, cut by x - y = d1.
        if x1 - y0 <= d1 {
            vertices.push(Point::new(x1, y0));
        } else {
            vertices.push(Point::new((d1 + y0).max(x0), y0));
            vertices.push(Point::new(x1, (x1 - d1).min(y1)));
        }

        // Top right corner, cut by x + y = s1.
        if x1 + y1 <= s1 {
            vertices.push(Point::new(x1, y1));
        } else {
            vertices.push(Point::new(x1, (s1 - x1).max(y0)));
            vertices.push(Point::new((s1 - y1).max(x0), y1));
        }

        // Top left corner, cut by x - y = d0.
        if x0 - y1 >= d0 {
            vertices.push(Point::new(x0, y1));
        } else {
            vertices.push(Point::new((y1 + d0).min(x1), y1));
            vertices.push(Point::new(x0, (x0 - d0).max(y0)));
        }

        // Bottom left corner, cut by x + y = s0.
        if x0 + y0 >= s0 {
            vertices.push(Point::new(x0, y0));
        } else {
            vertices.push(Point::new(x0, (s0 - x0).min(y1)));
            vertices.push(Point::new((s0 - y0).min(x1), y0));
        }

        vertices.dedup();

        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        // Bottom left corner is emitted last; rotate it to the front so the edges run
        // counterclockwise starting from the bottom edge.
        if let Some(last) = vertices.pop() {
            vertices.insert(0, last);
        }

        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        math::polygon_edges(&self.vertices)
    }

    /// Whether `p` lies in the interior, not on the boundary.
    pub fn contains_strictly(&self, p: Point) -> bool {
        self.vertices.len() >= 3
            && self
                .edges()
                .all(|edge| math::cross_product(edge.b - edge.a, p - edge.a) > 0)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.vertices.len() >= 3
            && self
                .edges()
                .all(|edge| math::cross_product(edge.b - edge.a, p - edge.a) >= 0)
    }

    pub fn crossings(&self, seg: &Segment) -> Vec<Crossing> {
        self.edges()
            .enumerate()
            .filter_map(|(edge, hull_edge)| {
                math::segment_intersection(seg, &hull_edge)
                    .map(|(point, t)| Crossing { edge, point, t })
            })
            .collect()
    }

    /// Hull vertices passed when travelling along the boundary from `entry` to `exit`.
    pub fn walk(&self, entry: &Crossing, exit: &Crossing, ccw: bool) -> Vec<Point> {
        let n = self.vertices.len();
        let edge_dir = self.vertices[(entry.edge + 1) % n] - self.vertices[entry.edge];
        let ahead = math::dot_product(exit.point - entry.point, edge_dir);
        let mut walked = vec![];

        if ccw {
            if entry.edge == exit.edge && ahead >= 0 {
                return walked;
            }

            let mut k = (entry.edge + 1) % n;

            loop {
                walked.push(self.vertices[k]);

                if k == exit.edge {
                    break;
                }

                k = (k + 1) % n;
            }
        } else {
            if entry.edge == exit.edge && ahead <= 0 {
                return walked;
            }

            let stop = (exit.edge + 1) % n;
            let mut k = entry.edge;

            loop {
                walked.push(self.vertices[k]);

                if k == stop {
                    break;
                }

                k = (k + n - 1) % n;
            }
        }

        walked
    }
}

/// Reroutes the part of `path` that passes through `hull` along the hull's boundary,
/// counterclockwise or clockwise.
///
/// Returns `None` when an endpoint of the path lies inside the hull, since no detour can
/// then avoid it.
pub fn walk_around(path: &[Point], hull: &Hull, ccw: bool) -> Option<Vec<Point>> {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return None;
    };

    if hull.contains_strictly(*first) || hull.contains_strictly(*last) {
        return None;
    }

    let mut crossings: Vec<(usize, Crossing)> = path
        .iter()
        .tuple_windows()
        .enumerate()
        .flat_map(|(i, (a, b))| {
            hull.crossings(&Segment::new(*a, *b))
                .into_iter()
                .map(move |crossing| (i, crossing))
        })
        .collect();

    if crossings.is_empty() {
        return Some(path.to_vec());
    }

    crossings.sort_by(|(i1, c1), (i2, c2)| {
        i1.cmp(i2)
            .then(c1.t.partial_cmp(&c2.t).unwrap_or(Ordering::Equal))
    });

    let (entry_seg, entry) = crossings[0];
    let (exit_seg, exit) = crossings[crossings.len() - 1];

    // Only touching the boundary.
    if entry_seg == exit_seg && entry.point == exit.point {
        return Some(path.to_vec());
    }

    let mut walked = path[..=entry_seg].to_vec();
    walked.push(entry.point);
    walked.extend(hull.walk(&entry, &exit, ccw));
    walked.push(exit.point);
    walked.extend_from_slice(&path[exit_seg + 1..]);
    walked.dedup();

    Some(walked)
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;

    #[test]
    fn test_octagon_around_point() {
        let hull = Hull::octagonal(&[point! {x: 0, y: 0}], 10);

        assert_eq!(hull.vertices().len(), 8);
        assert_eq!(hull.vertices()[0], point! {x: -5, y: -10});
        assert!(hull.contains_strictly(point! {x: 0, y: 0}));
        assert!(hull.contains_strictly(point! {x: 9, y: 0}));
        assert!(!hull.contains_strictly(point! {x: 10, y: 0}));
        assert!(!hull.contains(point! {x: 10, y: 10}));

        // Every vertex is at least `margin` away from the enclosed point.
        for vertex in hull.vertices() {
            assert!(math::euclidean_distance(*vertex, point! {x: 0, y: 0}) >= 10.0);
        }
    }

    #[test]
    fn test_hull_is_counterclockwise() {
        let hull = Hull::octagonal(&[point! {x: 0, y: -30}, point! {x: 0, y: 30}], 12);

        for (a, b, c) in hull.vertices().iter().circular_tuple_windows() {
            assert!(math::cross_product(*b - *a, *c - *b) > 0);
        }
    }

    #[test]
    fn test_walk_around_both_ways() {
        let hull = Hull::octagonal(&[point! {x: 50, y: 0}], 10);
        let path = [point! {x: 0, y: 0}, point! {x: 100, y: 0}];

        let ccw = walk_around(&path, &hull, true).unwrap();
        let cw = walk_around(&path, &hull, false).unwrap();

        assert_eq!(ccw.first(), Some(&point! {x: 0, y: 0}));
        assert_eq!(ccw.last(), Some(&point! {x: 100, y: 0}));
        assert!(ccw.iter().all(|p| p.y() <= 0));
        assert!(cw.iter().all(|p| p.y() >= 0));
        assert!(ccw.iter().all(|p| !hull.contains_strictly(*p)));
        assert!(cw.iter().all(|p| !hull.contains_strictly(*p)));
    }

    #[test]
    fn test_walk_around_refuses_endpoint_inside() {
        let hull = Hull::octagonal(&[point! {x: 0, y: 0}], 10);
        let path = [point! {x: 0, y: 0}, point! {x: 100, y: 0}];

        assert!(walk_around(&path, &hull, true).is_none());
    }
}
