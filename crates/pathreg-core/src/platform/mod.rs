//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live in this module rather
//! than in the registry code.
//!
//! - `paths` - where the shared store lives by default
//! - `files` - file identity checks used by the lock

pub mod files;
pub mod paths;

pub use files::{remove_held_file, same_file};
pub use paths::{default_store_base, registry_config_dir};
