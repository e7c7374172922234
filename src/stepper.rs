use std::ops::ControlFlow;

use crate::router::time_limit::TimeLimit;

pub trait Step<Ctx, B, C = ()> {
    type Error;

    fn step(&mut self, context: &mut Ctx) -> Result<ControlFlow<B, C>, Self::Error>;

    fn finish(&mut self, context: &mut Ctx) -> Result<B, Self::Error> {
        loop {
            if let ControlFlow::Break(outcome) = self.step(context)? {
                return Ok(outcome);
            }
        }
    }
}

/// Stops an unfinished stepper, yielding the best outcome it has reached so far.
pub trait Abort<Ctx, B> {
    fn abort(&mut self, context: &mut Ctx) -> B;
}

pub trait StepWithin<Ctx, B, C = ()>: Step<Ctx, B, C> + Abort<Ctx, B> {
    /// Steps until done or until `time_limit` runs out. The limit is polled before every step,
    /// so an already expired limit performs no work at all.
    fn finish_within(
        &mut self,
        context: &mut Ctx,
        time_limit: &TimeLimit,
    ) -> Result<(B, bool), Self::Error> {
        loop {
            if time_limit.expired() {
                return Ok((self.abort(context), true));
            }

            if let ControlFlow::Break(outcome) = self.step(context)? {
                return Ok((outcome, false));
            }
        }
    }
}

impl<Ctx, B, C, S: Step<Ctx, B, C> + Abort<Ctx, B>> StepWithin<Ctx, B, C> for S {}
