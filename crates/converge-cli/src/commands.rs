//! Subcommand handlers
//!
//! Each handler is generic over the engine so it can run against a test
//! double; [`dispatch`] wires them to the filesystem engine.

use crate::cli::params_from_matches;
use crate::output::{CheckReport, ShowReport};
use anyhow::{bail, Result};
use clap::ArgMatches;
use converge_core::{
    CurrentValue, DesiredParams, EngineError, EnvironmentEngine, ReconcileError,
    ReconciliationResult, Reconciler, Stage, StateProber,
};
use converge_fs::FsEngine;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Reconcile the environment towards `params`
///
/// # Errors
/// Any [`ReconcileError`] from the run
pub fn apply<E: EnvironmentEngine>(
    engine: E,
    params: DesiredParams,
) -> Result<ReconciliationResult, ReconcileError> {
    Reconciler::new(engine).run(params)
}

/// Compute what [`apply`] would write
///
/// # Errors
/// Invalid parameters or a failed probe
pub fn check<E: EnvironmentEngine>(
    engine: E,
    params: DesiredParams,
) -> Result<CheckReport, ReconcileError> {
    let desired = params.resolve()?;
    let plan = Reconciler::new(engine).plan(&desired)?;
    Ok(plan.into())
}

/// Read one stored value
///
/// # Errors
/// The path is not an environment, its store is missing, or the engine fails
pub fn show<E: EnvironmentEngine>(
    engine: &E,
    path: &Path,
    section: &str,
    option: &str,
) -> Result<ShowReport, ReconcileError> {
    let prober = StateProber::new(engine);
    if !prober.exists(path)? {
        return Err(ReconcileError::engine(
            Stage::Probe,
            EngineError::NotAnEnvironment(path.to_path_buf()),
        ));
    }
    let value = match prober.current_value(path, section, option)? {
        CurrentValue::Present(value) => Some(value),
        CurrentValue::Absent => None,
    };
    Ok(ShowReport {
        path: path.to_path_buf(),
        section: section.to_string(),
        option: option.to_string(),
        value,
    })
}

/// Run the selected subcommand against the filesystem engine
///
/// # Errors
/// Whatever the subcommand reports
pub fn dispatch(matches: &ArgMatches) -> Result<Value> {
    let engine = FsEngine::new();
    let value = match matches.subcommand() {
        Some(("apply", args)) => serde_json::to_value(apply(engine, params_from_matches(args)?)?)?,
        Some(("check", args)) => serde_json::to_value(check(engine, params_from_matches(args)?)?)?,
        Some(("show", args)) => {
            let (Some(path), Some(section), Some(option)) = (
                args.get_one::<PathBuf>("path"),
                args.get_one::<String>("section"),
                args.get_one::<String>("option"),
            ) else {
                bail!("show needs --path, --section and --option");
            };
            serde_json::to_value(show(&engine, path, section, option)?)?
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    };
    Ok(value)
}
