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

use vcatch_config::Config;

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
    };
}

/// Directory and file name prefix of the rolling log file.
fn log_file(filepath: &std::path::Path) -> anyhow::Result<(&std::path::Path, &str)> {
    if filepath.extension().is_none() {
        return Ok((filepath, "vcatch"));
    }

    match (
        filepath.parent(),
        filepath.file_name().and_then(std::ffi::OsStr::to_str),
    ) {
        (Some(directory), Some(file_name)) => Ok((directory, file_name)),
        _ => anyhow::bail!(
            "filepath for server logs at {filepath:?} does not have a parent or is not valid"
        ),
    }
}

/// Initialize the tracing subsystem, the logs are written to a daily rolling file if
/// `[server.logs] filepath` is set, to the standard output otherwise.
///
/// # Errors
///
/// * The logs path in the configuration file are invalid.
/// * Failed to initialize the tracing subsystem.
pub fn initialize(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let subscriber = tracing_subscriber::registry().with({
        let mut e = tracing_subscriber::EnvFilter::default();
        for i in &config.server.logs.level {
            e = e.add_directive(i.clone());
        }
        e
    });

    #[cfg(feature = "tokio_console")]
    let subscriber = subscriber.with(console_subscriber::spawn());

    if let Some(filepath) = &config.server.logs.filepath {
        let (directory, file_name) = log_file(filepath)?;
        subscriber
            .with(
                get_fmt!()
                    .with_ansi(false)
                    .with_writer(tracing_appender::rolling::daily(directory, file_name)),
            )
            .try_init()
    } else {
        subscriber
            .with(get_fmt!().with_writer(std::io::stdout).with_ansi(true))
            .try_init()
    }
    .map_err(|e| anyhow::anyhow!("{e}"))
}
