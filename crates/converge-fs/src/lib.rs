//! Converge FS - filesystem project environment engine
//!
//! Implements [`converge_core::EnvironmentEngine`] over plain directories:
//! a version marker identifies an environment and a TOML file holds its
//! configuration store.

#![allow(missing_docs)]

pub mod engine;
pub mod layout;
pub mod store;

pub use engine::{FsEngine, FsHandle};
pub use layout::{Layout, FORMAT_VERSION, MARKER_FILE};
pub use store::ConfigStore;
