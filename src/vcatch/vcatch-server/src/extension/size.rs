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

use crate::{extension::Extension, Connection};
use vcatch_common::{CodeID, Session};
use vcatch_config::field::ExtensionKind;
use vcatch_protocol::MailParameter;

/// Message size declaration.
///
/// See <https://datatracker.ietf.org/doc/html/rfc1870>
#[derive(Debug)]
pub struct Size {
    message_size_limit: usize,
}

impl Size {
    ///
    #[must_use]
    pub const fn new(message_size_limit: usize) -> Self {
        Self { message_size_limit }
    }
}

impl Extension for Size {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::Size
    }

    fn capability(&self, _: &Session) -> Option<String> {
        Some(format!("SIZE {}", self.message_size_limit))
    }

    fn handles_mail_parameter(&self, keyword: &str) -> bool {
        keyword == "SIZE"
    }

    fn on_mail_parameter(&self, conn: &mut Connection, param: &MailParameter) -> Result<(), CodeID> {
        let declared = param
            .value
            .as_deref()
            .and_then(|value| value.parse::<usize>().ok())
            .ok_or(CodeID::SyntaxErrorParams)?;

        if declared > self.message_size_limit {
            tracing::info!(
                declared,
                limit = self.message_size_limit,
                "Declared size exceeds the limit."
            );
            return Err(CodeID::MessageSizeExceeded);
        }

        conn.message_mut()
            .ok_or(CodeID::BadSequence)?
            .set_declared_size(declared)
            .map_err(|_| CodeID::BadSequence)
    }
}
