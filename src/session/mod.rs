//! Router session: runs routing and dragging gestures on trial branches of the board and
//! commits them into it, keeping an undo history of what every commit changed.

pub mod command;
pub mod history;
pub mod observer;
mod session;

pub use session::*;
