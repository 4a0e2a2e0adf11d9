//! pathreg - remembers which file each UUID was last seen in.
//!
//! A small persistent registry shared by every process of an application.
//! Access is serialized twice: a [`Gate`] orders the threads of one process
//! and an advisory [`FileLock`] orders the processes. The store itself is a
//! SQLite database opened per operation.
//!
//! The registry is a best-effort cache over files that can always be
//! rescanned, so its public operations never fail. Stale locks left by a
//! crashed or hung holder and store files that no longer open are recovered
//! from automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use pathreg::{JsonProfileSource, Registry, RegistrySettings, ScanSettings};
//!
//! let registry = Registry::new(RegistrySettings::platform_default()?);
//!
//! registry.register("1b4e28ba-2fa1-11d2-883f-0016d3cca427", "/roasts/monday.alog");
//! let path = registry.lookup("1b4e28ba-2fa1-11d2-883f-0016d3cca427");
//!
//! let source = JsonProfileSource::new("/roasts");
//! let report = registry.scan_directory(None, &source, &ScanSettings::default());
//! println!("{} profiles registered", report.registered.len());
//! # Ok::<(), pathreg::RegistryError>(())
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod lock;
pub mod outcome;
pub mod platform;
pub mod registry;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use config::{RegistryConfig, RegistrySettings, ScanConfig, ScanSettings, StoreCleanup};
pub use error::{FailureKind, RegistryError, Result};
pub use gate::{Gate, GateGuard};
pub use lock::FileLock;
pub use outcome::{Outcome, Recovery};
pub use registry::Registry;
pub use scan::{JsonProfileSource, ProfileSource, ScanReport};
pub use store::{Entry, UuidStore};
