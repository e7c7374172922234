use std::{cmp::Ordering, ops::ControlFlow};

use log::trace;

use crate::{
    geometry::{
        hull::{self, Hull},
        shape::{AccessShape, MeasureLength},
    },
    math::Segment,
    node::{
        item::MakeShape, obstacle::Obstacle, rules::AccessRules, NodeArena, NodeError,
        NodeHandle,
    },
    router::line::Line,
    stepper::{Abort, Step},
};

pub struct WalkaroundContext<'a, R: AccessRules> {
    pub arena: &'a NodeArena,
    pub node: NodeHandle,
    pub rules: &'a R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Walking,
    Clear,
    Stuck,
}

#[derive(Debug, Clone)]
struct Candidate {
    ccw: bool,
    line: Line,
    progress: Progress,
    violations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkaroundOutcome {
    pub line: Line,
    /// Whether the line keeps clearance from everything.
    pub clear: bool,
    pub violations: usize,
}

/// Walks a path around the obstacles it runs into, following their hulls counterclockwise
/// and clockwise at the same time. Each step takes both directions one obstacle further.
#[derive(Debug, Clone)]
pub struct Walkaround {
    candidates: [Candidate; 2],
    iteration: usize,
    max_iterations: usize,
}

/// Margin a line of `width` must keep from an obstacle's shape, with one unit of slack for
/// rounding hull crossings to the grid.
pub fn hull_margin(clearance: i64, width: i64) -> i64 {
    clearance + (width + 1) / 2 + 1
}

impl Walkaround {
    pub fn new(line: Line, max_iterations: usize) -> Self {
        let candidate = |ccw| Candidate {
            ccw,
            line: line.clone(),
            progress: Progress::Walking,
            violations: usize::MAX,
        };

        Self {
            candidates: [candidate(true), candidate(false)],
            iteration: 0,
            max_iterations,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    fn advance<R: AccessRules>(
        candidate: &mut Candidate,
        context: &WalkaroundContext<R>,
    ) -> Result<(), NodeError> {
        let obstacles = candidate
            .line
            .obstacles(context.arena, context.node, context.rules)?;
        candidate.violations = obstacles.len();

        if obstacles.is_empty() {
            candidate.progress = Progress::Clear;
            return Ok(());
        }

        let Some(hull) = Self::first_hull(&candidate.line, &obstacles, context)? else {
            candidate.progress = Progress::Stuck;
            return Ok(());
        };

        let Some(points) = hull::walk_around(&candidate.line.points, &hull, candidate.ccw) else {
            candidate.progress = Progress::Stuck;
            return Ok(());
        };

        let walked = Line::new(
            points,
            candidate.line.layer,
            candidate.line.width,
            candidate.line.maybe_net,
        );

        if walked == candidate.line {
            candidate.progress = Progress::Stuck;
        } else {
            trace!(
                "walked {} around hull, {} segments now",
                if candidate.ccw { "ccw" } else { "cw" },
                walked.segment_count()
            );
            candidate.line = walked;
        }

        Ok(())
    }

    /// Hull of the obstacle the line enters first. `None` when a line end sits inside one.
    fn first_hull<R: AccessRules>(
        line: &Line,
        obstacles: &[Obstacle],
        context: &WalkaroundContext<R>,
    ) -> Result<Option<Hull>, NodeError> {
        let segments: Vec<Segment> = line.segments().collect();
        let mut first: Option<((usize, f64), Hull)> = None;

        for obstacle in obstacles {
            let Some(item) = context.arena.item(context.node, obstacle.item)? else {
                continue;
            };
            let hull = item
                .shape()
                .hull(hull_margin(obstacle.clearance, line.width));

            let ends_inside = [line.start(), line.end()]
                .into_iter()
                .flatten()
                .any(|p| hull.contains_strictly(p));

            if ends_inside {
                return Ok(None);
            }

            let entry = segments.iter().enumerate().find_map(|(i, seg)| {
                hull.crossings(seg)
                    .into_iter()
                    .map(|crossing| crossing.t)
                    .min_by(f64::total_cmp)
                    .map(|t| (i, t))
            });

            let Some(entry) = entry else {
                continue;
            };

            let earlier = match &first {
                None => true,
                Some((known, _)) => {
                    entry.0 < known.0 || (entry.0 == known.0 && entry.1 < known.1)
                }
            };

            if earlier {
                first = Some((entry, hull));
            }
        }

        Ok(first.map(|(_, hull)| hull))
    }

    fn rank(a: &Candidate, b: &Candidate) -> Ordering {
        let blocked = |c: &Candidate| c.progress != Progress::Clear;

        blocked(a)
            .cmp(&blocked(b))
            .then(a.violations.cmp(&b.violations))
            .then(a.line.segment_count().cmp(&b.line.segment_count()))
            .then(a.line.length().total_cmp(&b.line.length()))
    }

    fn best(&self) -> WalkaroundOutcome {
        // Stable: on a full tie the counterclockwise candidate is kept.
        let best = self
            .candidates
            .iter()
            .min_by(|a, b| Self::rank(a, b))
            .unwrap_or(&self.candidates[0]);

        WalkaroundOutcome {
            line: best.line.clone(),
            clear: best.progress == Progress::Clear,
            violations: best.violations,
        }
    }
}

impl<'a, R: AccessRules> Step<WalkaroundContext<'a, R>, WalkaroundOutcome> for Walkaround {
    type Error = NodeError;

    fn step(
        &mut self,
        context: &mut WalkaroundContext<'a, R>,
    ) -> Result<ControlFlow<WalkaroundOutcome>, NodeError> {
        let walking = self
            .candidates
            .iter()
            .any(|candidate| candidate.progress == Progress::Walking);

        if !walking || self.iteration >= self.max_iterations {
            return Ok(ControlFlow::Break(self.abort(context)));
        }

        self.iteration += 1;

        for candidate in self.candidates.iter_mut() {
            if candidate.progress == Progress::Walking {
                Self::advance(candidate, context)?;
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}

impl<'a, R: AccessRules> Abort<WalkaroundContext<'a, R>, WalkaroundOutcome> for Walkaround {
    fn abort(&mut self, context: &mut WalkaroundContext<'a, R>) -> WalkaroundOutcome {
        for candidate in self.candidates.iter_mut() {
            if candidate.progress == Progress::Walking {
                candidate.violations = candidate
                    .line
                    .obstacles(context.arena, context.node, context.rules)
                    .map(|obstacles| obstacles.len())
                    .unwrap_or(usize::MAX);

                if candidate.violations == 0 {
                    candidate.progress = Progress::Clear;
                }
            }
        }

        self.best()
    }
}
