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

use vcatch_common::auth::Mechanism;
use vcatch_config::{field::ExtensionKind, Config};

/// Get a config for local test
///
/// The default extensions are enabled, without TLS and without relay.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test() -> Config {
    let mut config = Config::default();
    config.server.domain = "testserver.com".to_string();
    config.server.system.worker_threads = 2;
    config.server.interfaces.addr = vec!["127.0.0.1:0".parse().unwrap()];
    config.server.logs.level = vec!["vcatch=trace".parse().unwrap()];

    Config::ensure(config).unwrap()
}

/// [`local_test`] with `[server.tls]` set and STARTTLS advertised after SIZE.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn with_tls() -> Config {
    let mut config = Config::from_toml(&format!(
        r#"
[server]
domain = "testserver.com"
extensions = ["SIZE", "STARTTLS", "8BITMIME", "PIPELINING", "SMTPUTF8", "AUTH"]

[server.system]
worker_threads = 2

[server.interfaces]
addr = ["127.0.0.1:0"]

[server.tls]
certificate = "{cert}"
private_key = "{key}"
handshake_timeout = "500ms"
"#,
        cert = crate::get_tls_file::certificate_path().display(),
        key = crate::get_tls_file::private_key_path().display(),
    ))
    .unwrap();
    config.server.logs.level = vec!["vcatch=trace".parse().unwrap()];
    config
}

/// [`local_test`] with `AUTH` as the only extension, and the authentication required.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn with_auth(mechanisms: impl IntoIterator<Item = Mechanism>) -> Config {
    let mut config = local_test();
    config.server.extensions = vec![ExtensionKind::Auth];
    config.server.smtp.auth.require_authentication = true;
    config.server.smtp.auth.mechanisms = mechanisms.into_iter().collect();

    Config::ensure(config).unwrap()
}
