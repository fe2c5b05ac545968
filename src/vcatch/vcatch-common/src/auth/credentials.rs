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

/// The credentials send by the client, not necessarily the right one
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize, strum::Display)]
#[strum(serialize_all = "PascalCase")]
pub enum Credentials {
    /// identity and secret in clear (PLAIN, LOGIN)
    Verify {
        ///
        authid: String,
        ///
        authpass: String,
    },
    /// CRAM-MD5 answer to the challenge of the server
    Challenge {
        ///
        authid: String,
        /// hex digest of the challenge keyed by the secret
        digest: String,
    },
    /// token send by anonymous mechanism
    AnonymousToken {
        /// [ email / 1*255TCHAR ]
        token: String,
    },
}

impl Credentials {
    /// Identity claimed by the client.
    #[must_use]
    pub fn identity(&self) -> &str {
        match self {
            Self::Verify { authid, .. } | Self::Challenge { authid, .. } => authid,
            Self::AnonymousToken { token } => token,
        }
    }
}
