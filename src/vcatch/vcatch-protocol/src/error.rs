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

/// Error while processing the TCP/IP stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The line is longer than expected, it has been discarded up to its CRLF.
    #[error("buffer is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// No line received before the deadline.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),
    /// The peer closed the connection, or the transport has been closed locally.
    #[error("connection closed")]
    Closed,
    /// The transport cannot be replaced while bytes are waiting in the read buffer.
    #[error("{0} bytes are buffered, the transport cannot be replaced")]
    BufferNotEmpty(usize),
    /// The buffer cannot be decoded with the required encoding.
    #[error("{0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Other IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Does the error leave the connection usable ?
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufferTooLong { .. } | Self::Utf8(_))
    }
}
