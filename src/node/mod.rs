pub mod item;
mod node;
pub mod obstacle;
pub mod rules;

pub use node::*;
