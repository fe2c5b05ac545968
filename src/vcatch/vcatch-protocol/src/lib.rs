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

//! vCatch protocol implementation
//!
//! Low level part of the SMTP server: the transport handle of a connection, the line
//! reader keeping its buffer across a transport upgrade, and the parsing of the commands.

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

mod command;
mod connection_kind;
mod encoding;
mod error;
mod error_counter;
mod reader;
mod transport;

pub use command::{
    AuthArgs, ClientName, Command, HeloArgs, MailFromArgs, MailParameter, ParseArgsError,
    RcptToArgs, UnparsedArgs,
};
pub use connection_kind::ConnectionKind;
pub use encoding::Encoding;
pub use error::Error;
pub use error_counter::{ErrorCounter, ErrorSeverity};
pub use reader::Reader;
pub use transport::{AsyncIo, BoxedIo, Transport};

/// Maximum length of a command line, CRLF excluded.
///
/// Defined in [RFC5321](https://www.rfc-editor.org/rfc/rfc5321#section-4.5.3.1.4)
pub const COMMAND_LINE_MAX: usize = 510;

/// Maximum length of a text line of the message, CRLF excluded.
///
/// Defined in [RFC5321](https://www.rfc-editor.org/rfc/rfc5321#section-4.5.3.1.6)
pub const TEXT_LINE_MAX: usize = 998;
