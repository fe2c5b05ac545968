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

use vcatch::{bind_sockets, config_diff, load_config, tracing_subscriber, Args, Commands};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("ERROR: {err}");
        err.chain().skip(1).for_each(|cause| eprintln!("because: {cause}"));
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    if args.version {
        println!(
            "{} v{}\ncommit: {}",
            clap::crate_name!(),
            clap::crate_version!(),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;

    if let Some(command) = args.command {
        match command {
            Commands::ConfigShow => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Commands::ConfigDiff => {
                for line in config_diff(&config)? {
                    println!("{line}");
                }
            }
        }
        return Ok(());
    }

    let sockets = bind_sockets(&config)?;

    tracing_subscriber::initialize(&config)?;
    tracing::info!(
        version = clap::crate_version!(),
        domain = %config.server.domain,
        "Starting vCatch."
    );

    vcatch_server::start_runtime(config, sockets, args.timeout.map(Into::into))
}
