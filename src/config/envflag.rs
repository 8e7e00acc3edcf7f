//! Command-line parsing supplemented by environment variables.
//!
//! Every long flag maps to an environment variable: upper-cased, with `-`,
//! `.` and `/` replaced by `_` (`--log-level` ↔ `LOG_LEVEL`). A flag given on
//! the command line always wins; otherwise a non-empty variable is applied,
//! split on `,` with each piece set in order.

use std::collections::HashMap;

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches};

use crate::config::ConfigError;

/// Environment variable name for a long flag.
pub fn env_name(flag: &str) -> String {
    flag.to_uppercase().replace(['-', '.', '/'], "_")
}

/// Parse `NAME=value` entries, as produced by the process environment.
pub fn parse_environ(environ: &[String]) -> Result<HashMap<String, String>, ConfigError> {
    environ
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| ConfigError::Env {
                    entry: entry.clone(),
                })
        })
        .collect()
}

/// Parse `args` (including the program name) into `P`, filling flags absent
/// from the command line from `environ`.
pub fn parse<P>(args: &[String], environ: &[String]) -> Result<P, ConfigError>
where
    P: CommandFactory + FromArgMatches,
{
    let env = parse_environ(environ)?;
    // Later occurrences replace earlier ones, matching repeated `Set` calls.
    let command = P::command().args_override_self(true);
    // First pass only finds what the command line set. Requirements are
    // checked on the merged list, since the environment may satisfy them.
    let lenient = command
        .clone()
        .mut_args(|arg| arg.required(false))
        .subcommand_required(false)
        .ignore_errors(true);
    let cli = lenient.try_get_matches_from(args)?;

    let from_env = env_args(&command, &cli, &env);
    if !from_env.is_empty() {
        tracing::trace!(args = ?from_env, "Flags supplied from environment");
    }

    // Env-derived flags go right after the program name so a trailing `--`
    // or positional arguments are left untouched.
    let mut merged = Vec::with_capacity(args.len() + from_env.len());
    merged.extend(args.iter().take(1).cloned());
    merged.extend(from_env);
    merged.extend(args.iter().skip(1).cloned());

    let matches = command.try_get_matches_from(&merged)?;
    Ok(P::from_arg_matches(&matches)?)
}

fn env_args(command: &clap::Command, cli: &ArgMatches, env: &HashMap<String, String>) -> Vec<String> {
    let mut out = Vec::new();

    for arg in command.get_arguments() {
        let Some(long) = arg.get_long() else {
            continue;
        };
        if matches!(arg.get_action(), ArgAction::Help | ArgAction::Version) {
            continue;
        }
        if cli.value_source(arg.get_id().as_str()) == Some(ValueSource::CommandLine) {
            continue;
        }

        let Some(value) = env.get(&env_name(long)).filter(|v| !v.is_empty()) else {
            continue;
        };

        match arg.get_action() {
            ArgAction::SetTrue | ArgAction::SetFalse => {
                if value.eq_ignore_ascii_case("true") || value == "1" {
                    out.push(format!("--{long}"));
                }
            }
            _ => out.extend(value.split(',').map(|piece| format!("--{long}={piece}"))),
        }
    }

    out
}
