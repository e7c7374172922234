pub mod dragger;
pub mod line;
pub mod optimizer;
pub mod placer;
pub mod settings;
pub mod shove;
pub mod time_limit;
pub mod walkaround;
