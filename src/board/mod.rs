//! Board the router starts from: the committed items together with the names of layers and
//! nets, and the JSON description boards are loaded from and saved to.

mod board;
pub mod design;
pub mod mesadata;

pub use board::*;
