//! Command-line definition

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use converge_core::{Backend, ConfigEntry, DesiredParams};
use std::path::PathBuf;

/// Environment variable read for `--password`
pub const PASSWORD_ENV: &str = "CONVERGE_DB_PASSWORD";

/// Build the `converge` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("converge")
        .version(converge_core::VERSION)
        .about("Idempotent reconciliation of project environments")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More log output on stderr (repeatable)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON lines")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(desired_state_args(
            Command::new("apply").about("Create or update an environment to match the desired state"),
        ))
        .subcommand(desired_state_args(
            Command::new("check").about("Report the writes apply would perform, without writing"),
        ))
        .subcommand(
            Command::new("show")
                .about("Read one configuration value from an environment")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Environment directory")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(Arg::new("section").long("section").required(true))
                .arg(Arg::new("option").long("option").required(true)),
        )
}

fn desired_state_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("manifest")
            .short('m')
            .long("manifest")
            .help("Desired state file (.toml, .yaml or .json); flags override it")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(Arg::new("name").long("name").help("Project name"))
    .arg(
        Arg::new("path")
            .long("path")
            .help("Absolute environment directory")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        Arg::new("backend")
            .long("backend")
            .help("Database backend")
            .value_parser(["sqlite", "mysql", "postgresql"]),
    )
    .arg(Arg::new("host").long("host").help("Database host"))
    .arg(Arg::new("user").long("user").help("Database user"))
    .arg(
        Arg::new("password")
            .long("password")
            .help("Database password")
            .env(PASSWORD_ENV)
            .hide_env_values(true),
    )
    .arg(Arg::new("database-name").long("database-name").help("Database name"))
    .arg(
        Arg::new("set")
            .short('s')
            .long("set")
            .value_name("SECTION.OPTION=VALUE")
            .help("Configuration entry (repeatable, applied in order)")
            .action(ArgAction::Append),
    )
}

/// Collect desired parameters from a manifest and flags
///
/// Flags replace manifest fields; `--set` entries follow the manifest's.
///
/// # Errors
/// Unreadable manifest or malformed `--set` entry
pub fn params_from_matches(args: &ArgMatches) -> Result<DesiredParams> {
    let mut params = match args.get_one::<PathBuf>("manifest") {
        Some(manifest) => crate::manifest::load(manifest)?,
        None => DesiredParams::default(),
    };

    if let Some(name) = args.get_one::<String>("name") {
        params.name.clone_from(name);
    }
    if let Some(path) = args.get_one::<PathBuf>("path") {
        params.path.clone_from(path);
    }
    if let Some(backend) = args.get_one::<String>("backend") {
        params.backend = backend.parse::<Backend>()?;
    }
    let optional = [
        ("host", &mut params.host),
        ("user", &mut params.user),
        ("password", &mut params.password),
        ("database-name", &mut params.database_name),
    ];
    for (id, field) in optional {
        if let Some(value) = args.get_one::<String>(id) {
            *field = Some(value.clone());
        }
    }
    for raw in args.get_many::<String>("set").into_iter().flatten() {
        params.config.push(raw.parse::<ConfigEntry>()?);
    }

    Ok(params)
}
