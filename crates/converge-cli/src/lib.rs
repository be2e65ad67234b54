//! Converge CLI - command-line front end
//!
//! Subcommands:
//! - `apply`: create or update an environment, print the result as JSON
//! - `check`: report pending writes without touching the environment
//! - `show`: read one configuration value
//!
//! Failures print `{"failed": true, "kind": ..., "msg": ...}` and exit with
//! status 1.

#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod manifest;
pub mod output;

pub use cli::{build_cli, params_from_matches, PASSWORD_ENV};
pub use commands::dispatch;
pub use output::{CheckReport, Failure, ShowReport};
