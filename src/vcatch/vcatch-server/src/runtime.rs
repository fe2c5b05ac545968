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

use crate::{store::InMemoryStore, Server};
use anyhow::Context;
use vcatch_config::Config;
extern crate alloc;

/// Reason of the end of the runtime.
#[derive(Debug)]
enum Stop {
    Signal,
    Timeout,
}

fn init_runtime<F>(
    sender: tokio::sync::mpsc::Sender<anyhow::Result<()>>,
    name: impl Into<String>,
    worker_thread_count: usize,
    future: F,
) -> anyhow::Result<std::thread::JoinHandle<()>>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let name = name.into();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_thread_count)
        .enable_all()
        .thread_name(format!("{name}-child"))
        .build()?;

    std::thread::Builder::new()
        .name(format!("{name}-main"))
        .spawn(move || {
            let name_rt = name.clone();
            let result = runtime.block_on(async move {
                tracing::info!(name = %name_rt, "Runtime started successfully.");
                future.await
            });

            if sender.blocking_send(result).is_err() {
                tracing::error!(%name, "Runtime result dropped.");
            }
        })
        .map_err(anyhow::Error::new)
}

/// Start the `vCatch` server's runtime, until a `SIGTERM`, a `SIGINT` or the `timeout`.
///
/// The connections in progress are given `[server] shutdown_grace_period` to finish.
///
/// # Errors
///
/// * the runtime or the signal handler cannot be initialized
/// * the server failed to start, see [`Server::new`] and [`Server::listen_and_serve`]
#[allow(clippy::module_name_repetitions)]
pub fn start_runtime(
    config: Config,
    sockets: (Vec<std::net::TcpListener>, Vec<std::net::TcpListener>),
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let mut done = tokio::sync::mpsc::channel::<anyhow::Result<()>>(1);
    let worker_threads = config.server.system.worker_threads;

    let store = alloc::sync::Arc::new(InMemoryStore::new(config.server.store.message_count_max));
    let server =
        alloc::sync::Arc::new(Server::new(config, store).context("could not build the server")?);

    let (stop_sender, mut stop_receiver) = tokio::sync::mpsc::channel::<()>(1);
    let mut signals = signal_hook::iterator::Signals::new([
        // Send by `systemctl stop` (and then sending `SIGKILL`)
        signal_hook::consts::SIGTERM,
        // Ctrl+C on a terminal
        signal_hook::consts::SIGINT,
    ])?;
    let signals_handle = signals.handle();
    let _signal_handler = std::thread::spawn(move || {
        for sig in signals.forever() {
            tracing::warn!(signal = sig, "Stopping vCatch server.");
            if stop_sender.blocking_send(()).is_err() {
                return;
            }
        }
    });

    let _receiver = init_runtime(done.0, "receiver", worker_threads, async move {
        let mut serve = {
            let server = alloc::sync::Arc::clone(&server);
            tokio::spawn(async move { server.listen_and_serve(sockets).await })
        };

        let deadline = async {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        let stop = tokio::select! {
            Some(()) = stop_receiver.recv() => Stop::Signal,
            () = deadline => Stop::Timeout,
            result = &mut serve => {
                return result.context("the server panicked")?;
            }
        };

        tracing::info!(reason = ?stop, "Stopping the server.");
        server.shutdown();
        serve.await.context("the server panicked")??;
        Ok(())
    })?;

    let result = done
        .1
        .blocking_recv()
        .unwrap_or_else(|| Err(anyhow::anyhow!("the receiver runtime stopped unexpectedly")));
    signals_handle.close();

    if let Err(error) = &result {
        tracing::error!(%error, "Receiver failure.");
    }
    result
}
