//! Converge Core - idempotent project environment reconciliation
//!
//! Given a desired description of a project environment (name, path, database
//! backend, configuration entries) the core:
//! - Probes whether the environment exists and what its store holds
//! - Computes the minimal set of configuration writes
//! - Creates or updates the environment through an [`EnvironmentEngine`]
//! - Reports whether anything changed
//!
//! Running it twice with the same input converges to a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use converge_core::{ConfigEntry, DesiredParams, Reconciler};
//!
//! let params = DesiredParams::new("tracker", "/srv/tracker")
//!     .with_entry(ConfigEntry::new("logging", "log_type", "file")?);
//!
//! let reconciler = Reconciler::new(engine);
//! let result = reconciler.run(params)?;
//! println!("changed: {}", result.changed);
//! ```
//!
//! # Limitations
//! No locking against concurrent runs on the same path, and no rollback when
//! an update fails part way.

pub mod connection;
pub mod delta;
pub mod engine;
pub mod error;
pub mod phase;
pub mod prober;
pub mod reconciler;
pub mod types;

pub use connection::{build_connection_string, connection_entry, CONNECTION_OPTION, CONNECTION_SECTION};
pub use delta::compute_delta;
pub use engine::EnvironmentEngine;
pub use error::{EngineError, ErrorKind, LookupError, ReconcileError, Stage};
pub use phase::Phase;
pub use prober::{CurrentValue, StateProber};
pub use reconciler::{Plan, Reconciler};
pub use types::{
    Backend, ConfigEntry, ConnectionParams, DesiredParams, DesiredState, ProjectIdentity,
    ReconciliationResult,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
