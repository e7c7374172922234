use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    math::Point,
    node::{
        item::{Item, ItemId, LayerRange, ViaItem},
        obstacle::Obstacle,
        rules::AccessRules,
        NodeArena, NodeError, NodeHandle,
    },
    router::{
        line::Line,
        optimizer::{Optimizer, OptimizerContext},
        settings::{RouterMode, RouterSettings},
        shove::{Shove, ShoveContext, ShoveOutcome},
        time_limit::TimeLimit,
        walkaround::{Walkaround, WalkaroundContext},
    },
    stepper::StepWithin,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacerState {
    /// No line is being placed.
    #[default]
    Idle,
    /// The head follows the cursor directly.
    Routing,
    Walkaround,
    Shove,
    /// The line is placed in violation of the reported obstacles.
    MarkObstacle,
}

/// Result of placing the head for one cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub line: Line,
    pub state: PlacerState,
    pub violations: Vec<Obstacle>,
    /// Items put in place of the traces that were pushed aside.
    pub shoved: Vec<ItemId>,
    pub timed_out: bool,
}

impl Placement {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

pub trait PlacementObserver {
    fn on_shove(&mut self, item: ItemId, replacement: &[ItemId], depth: usize);
    fn on_mark_obstacle(&mut self, obstacles: &[Obstacle]);
}

#[derive(Debug, Default)]
pub struct EmptyPlacementObserver;

impl PlacementObserver for EmptyPlacementObserver {
    fn on_shove(&mut self, _item: ItemId, _replacement: &[ItemId], _depth: usize) {}
    fn on_mark_obstacle(&mut self, _obstacles: &[Obstacle]) {}
}

/// Ways of resolving a collision, tried in order until one yields a valid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Shove,
    Walkaround,
    MarkObstacles,
}

impl Strategy {
    pub fn chain(mode: RouterMode) -> &'static [Strategy] {
        match mode {
            RouterMode::Shove => &[Strategy::Shove, Strategy::Walkaround, Strategy::MarkObstacles],
            RouterMode::Walkaround => &[Strategy::Walkaround, Strategy::MarkObstacles],
            RouterMode::MarkObstacles => &[Strategy::MarkObstacles],
        }
    }
}

/// Runs a shove from `pushers`, which must already be in `node`. A successful shove is
/// double-checked against the node: a pusher left colliding turns it into a failure.
pub fn run_shove<R: AccessRules, O: PlacementObserver + ?Sized>(
    arena: &mut NodeArena,
    node: NodeHandle,
    pushers: &[ItemId],
    rules: &R,
    settings: &RouterSettings,
    time_limit: &TimeLimit,
    observer: &mut O,
) -> Result<(Option<Vec<ItemId>>, bool), NodeError> {
    let mut shove = Shove::new(pushers, settings.shove_max_depth, settings.shove_iterations);
    let (outcome, timed_out) = shove.finish_within(
        &mut ShoveContext {
            arena: &mut *arena,
            node,
            rules,
            observer: &mut *observer,
        },
        time_limit,
    )?;

    let ShoveOutcome::Shoved { items, depth } = outcome else {
        debug!("shove failed: {:?}", outcome);
        return Ok((None, timed_out));
    };

    for pusher in pushers {
        if let Some(item) = arena.item(node, *pusher)? {
            if !arena.query(node, item, rules)?.is_empty() {
                debug!("shove left {:?} in violation", pusher);
                return Ok((None, timed_out));
            }
        }
    }

    debug!("shoved {} items, depth {}", items.len(), depth);
    Ok((Some(items), timed_out))
}

/// Places a new trace from a fixed origin towards the cursor.
///
/// All work happens in a branch of the node the placer was started on: fixed pieces (earlier
/// heads ended by a via) go into `base`, and the head of the current cursor position goes into
/// a child of it that is thrown away on every move.
#[derive(Debug, Clone)]
pub struct LinePlacer {
    base: NodeHandle,
    head_node: Option<NodeHandle>,
    origin: Point,
    layer: usize,
    width: i64,
    net: usize,
    head: Line,
    head_items: Vec<ItemId>,
    vias: Vec<ItemId>,
    state: PlacerState,
}

impl LinePlacer {
    pub fn new(
        arena: &mut NodeArena,
        node: NodeHandle,
        origin: Point,
        layer: usize,
        width: i64,
        net: usize,
    ) -> Result<Self, NodeError> {
        if layer >= arena.layer_count() {
            return Err(NodeError::NoSuchLayer {
                layer,
                layer_count: arena.layer_count(),
            });
        }

        let base = arena.branch(node)?;

        Ok(Self {
            base,
            head_node: None,
            origin,
            layer,
            width,
            net,
            head: Line::new(vec![origin], layer, width, Some(net)),
            head_items: vec![],
            vias: vec![],
            state: PlacerState::Routing,
        })
    }

    pub fn state(&self) -> PlacerState {
        self.state
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn net(&self) -> usize {
        self.net
    }

    pub fn head(&self) -> &Line {
        &self.head
    }

    pub fn head_items(&self) -> &[ItemId] {
        &self.head_items
    }

    pub fn vias(&self) -> &[ItemId] {
        &self.vias
    }

    /// Node holding everything placed so far, head included.
    pub fn current_node(&self) -> NodeHandle {
        self.head_node.unwrap_or(self.base)
    }

    fn rebranch(&mut self, arena: &mut NodeArena) -> Result<NodeHandle, NodeError> {
        if let Some(head_node) = self.head_node.take() {
            arena.discard(head_node)?;
        }

        let head_node = arena.branch(self.base)?;
        self.head_node = Some(head_node);
        Ok(head_node)
    }

    /// Places the head for a new cursor position. Whatever the previous position shoved is
    /// forgotten first.
    pub fn move_to<R: AccessRules, O: PlacementObserver + ?Sized>(
        &mut self,
        arena: &mut NodeArena,
        cursor: Point,
        rules: &R,
        settings: &RouterSettings,
        observer: &mut O,
    ) -> Result<Placement, NodeError> {
        let time_limit = TimeLimit::from_millis(settings.time_limit_ms);
        let direct = Line::direct(
            self.origin,
            cursor,
            settings.corner_mode,
            self.layer,
            self.width,
            Some(self.net),
        );

        let head_node = self.rebranch(arena)?;
        let obstacles = direct.obstacles(arena, head_node, rules)?;

        if obstacles.is_empty() {
            return self.place(arena, direct, PlacerState::Routing, vec![], false);
        }

        if time_limit.expired() {
            return self.mark(arena, direct, true, rules, observer);
        }

        let mut fallback = direct.clone();
        let mut timed_out = false;

        for strategy in Strategy::chain(settings.mode) {
            match strategy {
                Strategy::Shove => {
                    let head_node = self.rebranch(arena)?;
                    let pushers = direct.add_to(arena, head_node)?;
                    let (shoved, shove_timed_out) = run_shove(
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
                        self.head = direct.clone();
                        self.head_items = pushers;
                        self.state = PlacerState::Shove;

                        return Ok(Placement {
                            line: direct,
                            state: PlacerState::Shove,
                            violations: vec![],
                            shoved,
                            timed_out,
                        });
                    }
                }
                Strategy::Walkaround => {
                    let head_node = self.rebranch(arena)?;
                    let (outcome, walk_timed_out) = Walkaround::new(
                        direct.clone(),
                        settings.walkaround_iterations,
                    )
                    .finish_within(
                        &mut WalkaroundContext {
                            arena: &*arena,
                            node: head_node,
                            rules,
                        },
                        &time_limit,
                    )?;
                    timed_out |= walk_timed_out;

                    if !outcome.clear {
                        fallback = outcome.line;
                        continue;
                    }

                    let mut line = outcome.line;

                    if settings.optimize {
                        let (optimized, optimize_timed_out) =
                            Optimizer::new(line.clone(), settings.corner_mode).finish_within(
                                &mut OptimizerContext {
                                    arena: &*arena,
                                    node: head_node,
                                    rules,
                                },
                                &time_limit,
                            )?;
                        timed_out |= optimize_timed_out;
                        line = optimized;
                    }

                    return self.place(arena, line, PlacerState::Walkaround, vec![], timed_out);
                }
                Strategy::MarkObstacles => {
                    return self.mark(arena, fallback, timed_out, rules, observer);
                }
            }
        }

        self.mark(arena, fallback, timed_out, rules, observer)
    }

    fn place(
        &mut self,
        arena: &mut NodeArena,
        line: Line,
        state: PlacerState,
        violations: Vec<Obstacle>,
        timed_out: bool,
    ) -> Result<Placement, NodeError> {
        let head_node = match self.head_node {
            Some(head_node) => head_node,
            None => self.rebranch(arena)?,
        };

        self.head_items = line.add_to(arena, head_node)?;
        self.head = line.clone();
        self.state = state;

        Ok(Placement {
            line,
            state,
            violations,
            shoved: vec![],
            timed_out,
        })
    }

    fn mark<R: AccessRules, O: PlacementObserver + ?Sized>(
        &mut self,
        arena: &mut NodeArena,
        line: Line,
        timed_out: bool,
        rules: &R,
        observer: &mut O,
    ) -> Result<Placement, NodeError> {
        let head_node = self.rebranch(arena)?;
        let violations = line.obstacles(arena, head_node, rules)?;

        if !violations.is_empty() {
            observer.on_mark_obstacle(&violations);
        }

        self.place(arena, line, PlacerState::MarkObstacle, violations, timed_out)
    }

    /// Fixes the current head, drops a via at its end and continues on `layer`.
    pub fn switch_layer<R: AccessRules, O: PlacementObserver + ?Sized>(
        &mut self,
        arena: &mut NodeArena,
        layer: usize,
        rules: &R,
        settings: &RouterSettings,
        observer: &mut O,
    ) -> Result<Placement, NodeError> {
        if layer >= arena.layer_count() {
            return Err(NodeError::NoSuchLayer {
                layer,
                layer_count: arena.layer_count(),
            });
        }

        let pos = self.head.end().unwrap_or(self.origin);

        if let Some(head_node) = self.head_node.take() {
            arena.commit(head_node)?;
        }

        let via = Item::Via(ViaItem {
            pos,
            diameter: settings.via_diameter,
            drill: settings.via_drill,
            layers: LayerRange::new(self.layer, layer),
            maybe_net: Some(self.net),
            locked: false,
        });

        let violations = arena.query(self.base, &via, rules)?;
        self.vias.push(arena.add(self.base, via)?);

        if !violations.is_empty() {
            observer.on_mark_obstacle(&violations);
        }

        debug!("via at {:?}, continuing on layer {}", pos, layer);

        self.origin = pos;
        self.layer = layer;
        self.head = Line::new(vec![pos], layer, self.width, Some(self.net));
        self.head_items.clear();
        self.state = if violations.is_empty() {
            PlacerState::Routing
        } else {
            PlacerState::MarkObstacle
        };

        Ok(Placement {
            line: self.head.clone(),
            state: self.state,
            violations,
            shoved: vec![],
            timed_out: false,
        })
    }

    /// Switches to the opposite outer layer: from the top layer to the bottom one, from any
    /// other layer to the top one.
    pub fn place_via<R: AccessRules, O: PlacementObserver + ?Sized>(
        &mut self,
        arena: &mut NodeArena,
        rules: &R,
        settings: &RouterSettings,
        observer: &mut O,
    ) -> Result<Placement, NodeError> {
        let layer_count = arena.layer_count();

        if layer_count < 2 {
            return Err(NodeError::NoSuchLayer {
                layer: 1,
                layer_count,
            });
        }

        let layer = if self.layer == 0 { layer_count - 1 } else { 0 };
        self.switch_layer(arena, layer, rules, settings, observer)
    }

    /// Folds the head into the base node and hands the base over for committing.
    pub fn finish(mut self, arena: &mut NodeArena) -> Result<NodeHandle, NodeError> {
        if let Some(head_node) = self.head_node.take() {
            arena.commit(head_node)?;
        }

        Ok(self.base)
    }

    pub fn cancel(self, arena: &mut NodeArena) -> Result<(), NodeError> {
        arena.discard(self.base)
    }
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;
    use crate::{
        geometry::shape::MeasureLength,
        node::{item::SegItem, rules::ClearanceRules},
        router::settings::CornerMode,
    };

    fn settings(mode: RouterMode) -> RouterSettings {
        RouterSettings {
            mode,
            time_limit_ms: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_direct_in_empty_board() {
        let mut arena = NodeArena::new(1);
        let root = arena.root();
        let rules = ClearanceRules::uniform(5);
        let mut placer = LinePlacer::new(&mut arena, root, point! {x: 0, y: 0}, 0, 2, 1).unwrap();

        let placement = placer
            .move_to(
                &mut arena,
                point! {x: 100, y: 0},
                &rules,
                &settings(RouterMode::Shove),
                &mut EmptyPlacementObserver,
            )
            .unwrap();

        assert_eq!(placement.state, PlacerState::Routing);
        assert_eq!(placement.line.segment_count(), 1);
        assert_eq!(placement.line.length(), 100.0);
        assert!(arena.is_empty(root));
        assert_eq!(arena.len(placer.current_node()), 1);
    }

    #[test]
    fn test_moves_replace_each_other() {
        let mut arena = NodeArena::new(1);
        let root = arena.root();
        let rules = ClearanceRules::uniform(5);
        let mut placer = LinePlacer::new(&mut arena, root, point! {x: 0, y: 0}, 0, 2, 1).unwrap();
        let settings = RouterSettings {
            corner_mode: CornerMode::Mitered45,
            ..settings(RouterMode::Walkaround)
        };

        for x in [30, 60, 90] {
            placer
                .move_to(
                    &mut arena,
                    point! {x: x, y: 20},
                    &rules,
                    &settings,
                    &mut EmptyPlacementObserver,
                )
                .unwrap();
        }

        assert_eq!(placer.head().end(), Some(point! {x: 90, y: 20}));
        assert_eq!(arena.len(placer.current_node()), 2);

        let node = placer.finish(&mut arena).unwrap();
        arena.commit(node).unwrap();
        assert_eq!(arena.len(root), 2);
    }

    #[test]
    fn test_mark_obstacles_places_in_violation() {
        let mut arena = NodeArena::new(1);
        let root = arena.root();
        let obstacle = arena
            .add(
                root,
                Item::Seg(SegItem {
                    from: point! {x: 50, y: -30},
                    to: point! {x: 50, y: 30},
                    width: 10,
                    layer: 0,
                    maybe_net: Some(2),
                    locked: false,
                }),
            )
            .unwrap();
        let rules = ClearanceRules::uniform(5);
        let mut placer = LinePlacer::new(&mut arena, root, point! {x: 0, y: 0}, 0, 2, 1).unwrap();

        let placement = placer
            .move_to(
                &mut arena,
                point! {x: 100, y: 0},
                &rules,
                &settings(RouterMode::MarkObstacles),
                &mut EmptyPlacementObserver,
            )
            .unwrap();

        assert_eq!(placement.state, PlacerState::MarkObstacle);
        assert_eq!(placement.line.segment_count(), 1);
        assert_eq!(placement.violations.len(), 1);
        assert_eq!(placement.violations[0].item, obstacle);
    }

    #[test]
    fn test_via_switches_layer() {
        let mut arena = NodeArena::new(2);
        let root = arena.root();
        let rules = ClearanceRules::uniform(5);
        let settings = RouterSettings {
            via_diameter: 20,
            via_drill: 10,
            ..settings(RouterMode::Shove)
        };
        let mut placer = LinePlacer::new(&mut arena, root, point! {x: 0, y: 0}, 0, 2, 1).unwrap();

        placer
            .move_to(&mut arena, point! {x: 100, y: 0}, &rules, &settings, &mut EmptyPlacementObserver)
            .unwrap();
        let placement = placer
            .place_via(&mut arena, &rules, &settings, &mut EmptyPlacementObserver)
            .unwrap();
        assert_eq!(placement.state, PlacerState::Routing);
        assert_eq!(placer.layer(), 1);

        let placement = placer
            .move_to(&mut arena, point! {x: 100, y: 100}, &rules, &settings, &mut EmptyPlacementObserver)
            .unwrap();
        assert_eq!(placement.line.layer, 1);
        assert_eq!(placement.line.start(), Some(point! {x: 100, y: 0}));

        let node = placer.finish(&mut arena).unwrap();
        // Top segment, via, bottom segment.
        assert_eq!(arena.len(node), 3);
        assert_eq!(
            arena
                .joined(node, point! {x: 100, y: 0}, LayerRange::new(0, 1), 1)
                .unwrap()
                .len(),
            3
        );
    }
}
