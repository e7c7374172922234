//! Interactive push-and-shove trace router for printed circuit boards.

pub mod board;
pub mod geometry;
pub mod math;
pub mod node;
pub mod router;
pub mod session;
pub mod stepper;
