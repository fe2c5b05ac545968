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

use crate::extension::Extension;
use vcatch_common::Session;
use vcatch_config::field::ExtensionKind;

/// Command pipelining, only advertised: the commands are always read from a buffer kept
/// across the reads, so a batch of commands is processed in order.
///
/// See <https://datatracker.ietf.org/doc/html/rfc2920>
#[derive(Debug)]
pub struct Pipelining;

impl Extension for Pipelining {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::Pipelining
    }

    fn capability(&self, _: &Session) -> Option<String> {
        Some(self.kind().to_string())
    }
}
