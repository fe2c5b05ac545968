/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

//! vCatch SMTP catcher
//!
//! An SMTP server for development and testing: every message it receives is captured in
//! memory instead of being delivered, and can be relayed on demand to a real server.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use vcatch_config::Config;
use vcatch_server::socket_bind_anyhow;

///
pub mod tracing_subscriber;

///
#[derive(Debug, PartialEq, Eq, clap::Parser)]
#[clap(about, author)]
pub struct Args {
    /// Print the version and exit.
    #[clap(short, long, action)]
    pub version: bool,

    /// Path of the vCatch configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Make the server stop after a delay (human readable format)
    #[clap(short, long, value_parser)]
    pub timeout: Option<humantime::Duration>,
}

///
#[derive(Debug, PartialEq, Eq, clap::Subcommand)]
pub enum Commands {
    /// Show the loaded config (as serialized json format)
    ConfigShow,
    /// Show the difference between the loaded config and the default one
    ConfigDiff,
}

/// Read the configuration at `path`, the default one if `None`.
///
/// # Errors
///
/// * the file cannot be read
/// * see [`Config::from_toml`] and [`Config::ensure`]
pub fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    path.map_or_else(
        || Config::ensure(Config::default()),
        |path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read file '{path}'"))?;
            Config::from_toml(&content).with_context(|| format!("Cannot parse the configuration '{path}'"))
        },
    )
}

/// Line by line difference between the default configuration and `config`, both
/// serialized as pretty json.
///
/// # Errors
///
/// * one of the configuration cannot be serialized
pub fn config_diff(config: &Config) -> anyhow::Result<Vec<String>> {
    let loaded_config = serde_json::to_string_pretty(config)?;
    let default_config = serde_json::to_string_pretty(&Config::ensure(Config::default())?)?;

    Ok(diff::lines(&default_config, &loaded_config)
        .into_iter()
        .map(|line| match line {
            diff::Result::Left(left) => format!("-\x1b[0;31m{left}\x1b[0m"),
            diff::Result::Both(same, _) => format!(" {same}"),
            diff::Result::Right(right) => format!("+\x1b[0;32m{right}\x1b[0m"),
        })
        .collect())
}

/// Bind the clear-text and the tunneled listeners of `[server.interfaces]`.
///
/// # Errors
///
/// * one of the address cannot be bound
pub fn bind_sockets(
    config: &Config,
) -> anyhow::Result<(Vec<std::net::TcpListener>, Vec<std::net::TcpListener>)> {
    let interfaces = &config.server.interfaces;
    Ok((
        interfaces
            .addr
            .iter()
            .map(socket_bind_anyhow)
            .collect::<anyhow::Result<Vec<_>>>()?,
        interfaces
            .addr_submissions
            .iter()
            .map(socket_bind_anyhow)
            .collect::<anyhow::Result<Vec<_>>>()?,
    ))
}
