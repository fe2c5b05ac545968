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

//! vCatch server
//!
//! Accept the SMTP clients, run the command dialogue of each connection, and hand the
//! captured messages to the storage.

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
#![allow(clippy::module_name_repetitions)]

mod context;
mod runtime;
mod server;

/// Storage of the captured messages kept in memory.
pub mod store;

mod receiver {
    pub mod connection;
    pub mod verb;
    pub mod verbs;
}

/// ESMTP extensions, and the verbs they contribute.
pub mod extension {
    mod auth;
    mod eight_bit_mime;
    mod pipelining;
    mod size;
    mod smtp_utf8;
    mod starttls;
    mod traits;

    pub use auth::Auth;
    pub use eight_bit_mime::EightBitMime;
    pub use pipelining::Pipelining;
    pub use size::Size;
    pub use smtp_utf8::SmtpUtf8;
    pub use starttls::{upgrade_tls, StartTls, TlsRequired};
    pub use traits::{build_extensions, Activation, Extension};
}

pub use context::ServerContext;
pub use receiver::connection::Connection;
pub use receiver::verb::{Flow, Resolution, Verb, VerbEntry, VerbMap};
pub use receiver::verbs::register_builtins;
pub use runtime::start_runtime;
pub use server::{socket_bind_anyhow, Server};
