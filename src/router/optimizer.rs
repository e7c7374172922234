use std::ops::ControlFlow;

use log::trace;

use crate::{
    math::Segment,
    node::{rules::AccessRules, NodeArena, NodeError, NodeHandle},
    router::{
        line::{self, Line},
        settings::CornerMode,
    },
    stepper::{Abort, Step},
};

pub struct OptimizerContext<'a, R: AccessRules> {
    pub arena: &'a NodeArena,
    pub node: NodeHandle,
    pub rules: &'a R,
}

/// Cuts corners off a line for as long as the shortcut stays clear of everything in the node.
/// Each step is one pass over all corners; the optimizer stops after a pass changes nothing,
/// so optimizing its own output is a no-op.
#[derive(Debug, Clone)]
pub struct Optimizer {
    line: Line,
    corner_mode: CornerMode,
    passes: usize,
}

impl Optimizer {
    pub fn new(line: Line, corner_mode: CornerMode) -> Self {
        Self {
            line,
            corner_mode,
            passes: 0,
        }
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    fn shortcut_allowed<R: AccessRules>(
        &self,
        shortcut: &Segment,
        context: &OptimizerContext<R>,
    ) -> Result<bool, NodeError> {
        if self.corner_mode == CornerMode::Mitered45 && !line::is_octilinear(shortcut) {
            return Ok(false);
        }

        let item = self.line.seg_item(shortcut);
        Ok(context.arena.query(context.node, &item, context.rules)?.is_empty())
    }
}

impl<'a, R: AccessRules> Step<OptimizerContext<'a, R>, Line> for Optimizer {
    type Error = NodeError;

    fn step(&mut self, context: &mut OptimizerContext<'a, R>) -> Result<ControlFlow<Line>, NodeError> {
        let before = self.line.points.clone();
        self.passes += 1;
        self.line.simplify();

        let mut i = 1;

        while i + 1 < self.line.points.len() {
            let shortcut = Segment::new(self.line.points[i - 1], self.line.points[i + 1]);

            if self.shortcut_allowed(&shortcut, context)? {
                self.line.points.remove(i);
            } else {
                i += 1;
            }
        }

        self.line.simplify();
        trace!(
            "optimizer pass {}: {} -> {} points",
            self.passes,
            before.len(),
            self.line.points.len()
        );

        if self.line.points == before {
            Ok(ControlFlow::Break(self.line.clone()))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }
}

impl<'a, R: AccessRules> Abort<OptimizerContext<'a, R>, Line> for Optimizer {
    fn abort(&mut self, _context: &mut OptimizerContext<'a, R>) -> Line {
        self.line.clone()
    }
}
