pub mod hull;
pub mod poly;
pub mod primitive;
pub mod shape;
pub mod with_rtree;
