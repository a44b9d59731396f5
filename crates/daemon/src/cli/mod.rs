pub mod args;
pub mod op;
pub mod ops;

pub use ops::{AddRoom, Daemon, Health, Id, Init, Version};
