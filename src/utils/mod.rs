//! File system helpers shared by the live-state and CLI layers.

pub mod fs;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir};
