//! Command-line interface parsing and configuration.
//!
//! This module handles parsing command-line arguments and converting them
//! into overrides for the file configuration.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command-line arguments for the room client.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for outgoing sends per second
    pub send_rate: Option<u32>,
    /// Optional override for state sync passes per second
    pub serialization_rate: Option<u32>,
}

impl CliArgs {
    /// Parses the process arguments, exiting with a usage message on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn command() -> Command {
        Command::new("Roomloop")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Frame-driven multiplayer room client")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("send-rate")
                    .long("send-rate")
                    .value_name("HZ")
                    .help("Outgoing sends per second")
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                Arg::new("serialization-rate")
                    .long("serialization-rate")
                    .value_name("HZ")
                    .help("State sync passes per second")
                    .value_parser(value_parser!(u32)),
            )
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            send_rate: matches.get_one::<u32>("send-rate").copied(),
            serialization_rate: matches.get_one::<u32>("serialization-rate").copied(),
        }
    }
}
