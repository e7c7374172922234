use log::debug;

use crate::{
    math::Point,
    node::{
        item::{Item, ItemId, LayerRange},
        obstacle::Obstacle,
        rules::AccessRules,
        NodeArena, NodeError, NodeHandle,
    },
    router::{
        line::{self, AssembledLine, Line},
        placer::{self, Placement, PlacementObserver, PlacerState},
        settings::{RouterMode, RouterSettings},
        time_limit::TimeLimit,
    },
};

/// Translates one segment of an existing trace with the cursor, dragging its neighbours along.
#[derive(Debug, Clone)]
pub struct Dragger {
    base: NodeHandle,
    head_node: Option<NodeHandle>,
    original: AssembledLine,
    index: usize,
    grab: Point,
    anchored_start: bool,
    anchored_end: bool,
    state: PlacerState,
}

impl Dragger {
    /// `item` must be an unlocked track segment.
    pub fn new(
        arena: &mut NodeArena,
        node: NodeHandle,
        item: ItemId,
        grab: Point,
    ) -> Result<Self, NodeError> {
        let original = line::assemble_line(arena, node, item)?;
        let index = original
            .items
            .iter()
            .position(|id| *id == item)
            .ok_or(NodeError::NoSuchItem(item))?;

        let anchored = |p: Option<Point>| -> Result<bool, NodeError> {
            let (Some(p), Some(net)) = (p, original.line.maybe_net) else {
                return Ok(false);
            };

            Ok(arena
                .joined(node, p, LayerRange::single(original.line.layer), net)?
                .iter()
                .any(|id| !original.items.contains(id)))
        };

        let anchored_start = anchored(original.line.start())?;
        let anchored_end = anchored(original.line.end())?;
        let base = arena.branch(node)?;

        Ok(Self {
            base,
            head_node: None,
            original,
            index,
            grab,
            anchored_start,
            anchored_end,
            state: PlacerState::Routing,
        })
    }

    pub fn state(&self) -> PlacerState {
        self.state
    }

    pub fn original(&self) -> &AssembledLine {
        &self.original
    }

    /// The assembled line with the dragged segment moved by `delta`. Ends attached to something
    /// else stay put and are reconnected by a jog.
    pub fn dragged_line(&self, delta: Point) -> Line {
        let p = &self.original.line.points;
        let k = self.index;
        let last = p.len() - 1;

        let mut points = p[..k].to_vec();

        if k == 0 && self.anchored_start {
            points.push(p[0]);
        }

        points.push(p[k] + delta);
        points.push(p[k + 1] + delta);

        if k + 1 == last && self.anchored_end {
            points.push(p[last]);
        }

        points.extend_from_slice(&p[k + 2..]);

        Line::new(
            points,
            self.original.line.layer,
            self.original.line.width,
            self.original.line.maybe_net,
        )
    }

    fn rebranch(&mut self, arena: &mut NodeArena) -> Result<NodeHandle, NodeError> {
        if let Some(head_node) = self.head_node.take() {
            arena.discard(head_node)?;
        }

        let head_node = arena.branch(self.base)?;

        for id in &self.original.items {
            arena.remove(head_node, *id)?;
        }

        self.head_node = Some(head_node);
        Ok(head_node)
    }

    /// Drags to a new cursor position. Collisions are shoved aside in shove mode and marked in
    /// the other modes.
    pub fn drag_to<R: AccessRules, O: PlacementObserver + ?Sized>(
        &mut self,
        arena: &mut NodeArena,
        cursor: Point,
        rules: &R,
        settings: &RouterSettings,
        observer: &mut O,
    ) -> Result<Placement, NodeError> {
        let time_limit = TimeLimit::from_millis(settings.time_limit_ms);
        let line = self.dragged_line(cursor - self.grab);

        let head_node = self.rebranch(arena)?;
        let obstacles = line.obstacles(arena, head_node, rules)?;

        if obstacles.is_empty() {
            line.add_to(arena, head_node)?;
            return Ok(self.placement(line, PlacerState::Routing, vec![], vec![], false));
        }

        let mut timed_out = time_limit.expired();

        if settings.mode == RouterMode::Shove && !timed_out {
            let pushers = line.add_to(arena, head_node)?;
            let (shoved, shove_timed_out) = placer::run_shove(
                arena,
                head_node,
                &pushers,
                rules,
                settings,
                &time_limit,
                observer,
            )?;
            timed_out |= shove_timed_out;

            if let Some(shoved) = shoved {
                debug!("drag shoved {} items", shoved.len());
                return Ok(self.placement(line, PlacerState::Shove, vec![], shoved, timed_out));
            }

            self.rebranch(arena)?;
        }

        let head_node = self.current_node();
        line.add_to(arena, head_node)?;
        let violations = line.obstacles(arena, head_node, rules)?;
        observer.on_mark_obstacle(&violations);

        Ok(self.placement(line, PlacerState::MarkObstacle, violations, vec![], timed_out))
    }

    fn placement(
        &mut self,
        line: Line,
        state: PlacerState,
        violations: Vec<Obstacle>,
        shoved: Vec<ItemId>,
        timed_out: bool,
    ) -> Placement {
        self.state = state;

        Placement {
            line,
            state,
            violations,
            shoved,
            timed_out,
        }
    }

    pub fn current_node(&self) -> NodeHandle {
        self.head_node.unwrap_or(self.base)
    }

    pub fn finish(mut self, arena: &mut NodeArena) -> Result<NodeHandle, NodeError> {
        if let Some(head_node) = self.head_node.take() {
            arena.commit(head_node)?;
        }

        Ok(self.base)
    }

    pub fn cancel(self, arena: &mut NodeArena) -> Result<(), NodeError> {
        arena.discard(self.base)
    }

    pub fn is_draggable(item: &Item) -> bool {
        item.is_movable()
    }
}
