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
use vcatch_protocol::{Encoding, MailParameter};

/// Internationalized email.
///
/// Once negotiated, the commands are decoded as UTF-8.
///
/// See <https://datatracker.ietf.org/doc/html/rfc6531>
#[derive(Debug)]
pub struct SmtpUtf8;

impl Extension for SmtpUtf8 {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::SmtpUtf8
    }

    fn capability(&self, _: &Session) -> Option<String> {
        Some(self.kind().to_string())
    }

    fn handles_mail_parameter(&self, keyword: &str) -> bool {
        keyword == "SMTPUTF8"
    }

    fn on_mail_parameter(&self, conn: &mut Connection, param: &MailParameter) -> Result<(), CodeID> {
        if param.value.is_some() {
            return Err(CodeID::SyntaxErrorParams);
        }

        conn.switch_reader_encoding(Encoding::Utf8);
        conn.message_mut()
            .ok_or(CodeID::BadSequence)?
            .set_utf8()
            .map_err(|_| CodeID::BadSequence)
    }

    fn on_negotiated(&self, conn: &mut Connection) {
        conn.set_default_encoding(Encoding::Utf8);
    }
}
