use std::{collections::BTreeSet, ops::ControlFlow};

use log::{debug, trace};

use crate::{
    geometry::{
        hull,
        shape::{AccessShape, MeasureLength},
    },
    node::{
        item::{Item, ItemId, MakeShape},
        rules::AccessRules,
        NodeArena, NodeError, NodeHandle,
    },
    router::{
        line::{self, Line},
        placer::PlacementObserver,
        walkaround,
    },
    stepper::{Abort, Step},
};

pub struct ShoveContext<'a, R: AccessRules, O: PlacementObserver + ?Sized> {
    pub arena: &'a mut NodeArena,
    pub node: NodeHandle,
    pub rules: &'a R,
    pub observer: &'a mut O,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoveFailure {
    /// Obstacle that neither can be moved nor can move the item it collides with.
    Blocked(ItemId),
    DepthExceeded,
    IterationLimit,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoveOutcome {
    Shoved {
        /// Items created in place of the displaced ones.
        items: Vec<ItemId>,
        depth: usize,
    },
    Failed(ShoveFailure),
}

/// Pushes movable traces away from a set of pushers, cascading into whatever the displaced
/// traces run into next. Every step handles one collision of one pusher.
#[derive(Debug, Clone)]
pub struct Shove {
    stack: Vec<(ItemId, usize)>,
    fixed: BTreeSet<ItemId>,
    shoved: Vec<ItemId>,
    max_depth: usize,
    max_iterations: usize,
    iteration: usize,
    depth_reached: usize,
}

impl Shove {
    /// `pushers` must already be in the node and stay where they are.
    pub fn new(pushers: &[ItemId], max_depth: usize, max_iterations: usize) -> Self {
        Self {
            stack: pushers.iter().rev().map(|id| (*id, 0)).collect(),
            fixed: pushers.iter().copied().collect(),
            shoved: vec![],
            max_depth,
            max_iterations,
            iteration: 0,
            depth_reached: 0,
        }
    }

    pub fn depth_reached(&self) -> usize {
        self.depth_reached
    }

    fn is_movable(&self, arena: &NodeArena, node: NodeHandle, id: ItemId) -> Result<bool, NodeError> {
        Ok(!self.fixed.contains(&id)
            && arena
                .item(node, id)?
                .is_some_and(|item| item.is_movable()))
    }

    /// Moves the line containing `victim` out of `pusher`'s way. `None` when neither way
    /// around works, as when an end of the line lies too close to the pusher.
    fn shove_line<R: AccessRules, O: PlacementObserver + ?Sized>(
        context: &mut ShoveContext<R, O>,
        victim: ItemId,
        pusher: &Item,
        clearance: i64,
    ) -> Result<Option<Vec<ItemId>>, NodeError> {
        let assembled = line::assemble_line(context.arena, context.node, victim)?;
        let hull = pusher
            .shape()
            .hull(walkaround::hull_margin(clearance, assembled.line.width));

        let mut best: Option<(usize, f64, Line)> = None;

        for ccw in [true, false] {
            let Some(points) = hull::walk_around(&assembled.line.points, &hull, ccw) else {
                continue;
            };

            let moved = Line::new(
                points,
                assembled.line.layer,
                assembled.line.width,
                assembled.line.maybe_net,
            );

            if moved.points == assembled.line.points {
                continue;
            }

            let violations = moved
                .obstacles(context.arena, context.node, context.rules)?
                .len();
            let length = moved.length();

            let better = match &best {
                None => true,
                Some((best_violations, best_length, _)) => {
                    violations < *best_violations
                        || (violations == *best_violations && length < *best_length)
                }
            };

            if better {
                best = Some((violations, length, moved));
            }
        }

        let Some((_, _, moved)) = best else {
            return Ok(None);
        };

        for id in &assembled.items {
            context.arena.remove(context.node, *id)?;
        }

        Ok(Some(moved.add_to(context.arena, context.node)?))
    }

    fn finish_shoved(&self, arena: &NodeArena, node: NodeHandle) -> ShoveOutcome {
        let items = self
            .shoved
            .iter()
            .copied()
            .filter(|id| matches!(arena.item(node, *id), Ok(Some(_))))
            .collect();

        ShoveOutcome::Shoved {
            items,
            depth: self.depth_reached,
        }
    }
}

impl<'a, R: AccessRules, O: PlacementObserver + ?Sized> Step<ShoveContext<'a, R, O>, ShoveOutcome>
    for Shove
{
    type Error = NodeError;

    fn step(
        &mut self,
        context: &mut ShoveContext<'a, R, O>,
    ) -> Result<ControlFlow<ShoveOutcome>, NodeError> {
        let Some((pusher, depth)) = self.stack.pop() else {
            return Ok(ControlFlow::Break(
                self.finish_shoved(context.arena, context.node),
            ));
        };

        if self.iteration >= self.max_iterations {
            debug!("shove gave up after {} iterations", self.iteration);
            return Ok(ControlFlow::Break(ShoveOutcome::Failed(
                ShoveFailure::IterationLimit,
            )));
        }

        self.iteration += 1;

        // Stale: already replaced by an earlier shove.
        let Some(pusher_item) = context.arena.item(context.node, pusher)?.cloned() else {
            return Ok(ControlFlow::Continue(()));
        };

        let obstacles = context
            .arena
            .query(context.node, &pusher_item, context.rules)?;

        let Some(obstacle) = obstacles.first() else {
            return Ok(ControlFlow::Continue(()));
        };

        let (victim, moving_item, clearance) =
            if self.is_movable(context.arena, context.node, obstacle.item)? {
                (obstacle.item, pusher_item, obstacle.clearance)
            } else if self.is_movable(context.arena, context.node, pusher)? {
                // The pusher itself was shoved earlier and ran into something that stays put.
                let Some(obstacle_item) = context.arena.item(context.node, obstacle.item)?.cloned()
                else {
                    return Ok(ControlFlow::Continue(()));
                };
                (pusher, obstacle_item, obstacle.clearance)
            } else {
                debug!("shove blocked by {:?}", obstacle.item);
                return Ok(ControlFlow::Break(ShoveOutcome::Failed(
                    ShoveFailure::Blocked(obstacle.item),
                )));
            };

        if depth + 1 > self.max_depth {
            debug!("shove depth limit {} reached", self.max_depth);
            return Ok(ControlFlow::Break(ShoveOutcome::Failed(
                ShoveFailure::DepthExceeded,
            )));
        }

        let Some(moved) = Self::shove_line(context, victim, &moving_item, clearance)? else {
            debug!("cannot shove {:?} out of the way", victim);
            return Ok(ControlFlow::Break(ShoveOutcome::Failed(
                ShoveFailure::Blocked(victim),
            )));
        };

        trace!("shoved {:?} at depth {}, {} segments", victim, depth + 1, moved.len());
        context.observer.on_shove(victim, &moved, depth + 1);
        self.depth_reached = self.depth_reached.max(depth + 1);

        // Look at the pusher again once the moved line has settled.
        self.stack.push((pusher, depth));
        self.stack
            .extend(moved.iter().rev().map(|id| (*id, depth + 1)));
        self.shoved.extend(moved);

        Ok(ControlFlow::Continue(()))
    }
}

impl<'a, R: AccessRules, O: PlacementObserver + ?Sized> Abort<ShoveContext<'a, R, O>, ShoveOutcome>
    for Shove
{
    fn abort(&mut self, _context: &mut ShoveContext<'a, R, O>) -> ShoveOutcome {
        ShoveOutcome::Failed(ShoveFailure::TimedOut)
    }
}
