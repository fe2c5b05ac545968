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
use vcatch_common::{BodyType, CodeID, Session};
use vcatch_config::field::ExtensionKind;
use vcatch_protocol::MailParameter;

/// 8bit-MIME transport.
///
/// See <https://datatracker.ietf.org/doc/html/rfc6152>
#[derive(Debug)]
pub struct EightBitMime;

impl Extension for EightBitMime {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::EightBitMime
    }

    fn capability(&self, _: &Session) -> Option<String> {
        Some(self.kind().to_string())
    }

    fn handles_mail_parameter(&self, keyword: &str) -> bool {
        keyword == "BODY"
    }

    fn on_mail_parameter(&self, conn: &mut Connection, param: &MailParameter) -> Result<(), CodeID> {
        let body_type = param
            .value
            .as_deref()
            .and_then(|value| value.parse::<BodyType>().ok())
            .ok_or(CodeID::SyntaxErrorParams)?;

        conn.message_mut()
            .ok_or(CodeID::BadSequence)?
            .set_body_type(body_type)
            .map_err(|_| CodeID::BadSequence)
    }
}
