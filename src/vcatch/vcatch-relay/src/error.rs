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

/// Failure of the delivery to one recipient.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The reverse path or the recipient cannot be used by the outbound client.
    #[error("invalid envelope: {0}")]
    Envelope(String),
    /// The outbound SMTP transaction failed.
    #[error("{0}")]
    Transport(anyhow::Error),
    /// The MX lookup failed.
    #[error("failed to get mx records for '{domain}': {error}")]
    Resolve {
        ///
        domain: String,
        ///
        error: trust_dns_resolver::error::ResolveError,
    },
    /// The domain published a null MX record, it does not accept messages.
    ///
    /// See <https://datatracker.ietf.org/doc/html/rfc7505>
    #[error("null mx record found for '{0}'")]
    NoMxRecord(String),
}
