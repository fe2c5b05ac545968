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

use crate::{
    config::field::{ExtensionKind, FieldServerSMTP},
    Config,
};
use vcatch_common::CodeID;

impl Config {
    /// Check the consistency of the configuration, and fill the missing replies.
    ///
    /// # Errors
    ///
    /// * an extension or a listener needs a section which is missing
    pub fn ensure(mut config: Self) -> anyhow::Result<Self> {
        let has = |kind| config.server.extensions.contains(&kind);

        anyhow::ensure!(
            config.server.system.worker_threads != 0,
            "Worker threads cannot be set to 0"
        );
        anyhow::ensure!(
            !config.server.interfaces.addr.is_empty()
                || !config.server.interfaces.addr_submissions.is_empty(),
            "No interface to listen on"
        );
        anyhow::ensure!(
            config.server.tls.is_some() || !has(ExtensionKind::StartTls),
            "The extension STARTTLS is enabled, but the section [server.tls] is missing"
        );
        anyhow::ensure!(
            config.server.tls.is_some() || config.server.interfaces.addr_submissions.is_empty(),
            "Listeners on 'addr_submissions' require the section [server.tls]"
        );
        anyhow::ensure!(
            !config.server.smtp.auth.require_authentication || has(ExtensionKind::Auth),
            "Authentication is required, but the extension AUTH is disabled"
        );
        anyhow::ensure!(
            !has(ExtensionKind::Auth) || !config.server.smtp.auth.mechanisms.is_empty(),
            "The extension AUTH is enabled without any mechanism"
        );
        anyhow::ensure!(
            config.server.message_size_limit != 0,
            "The message size limit cannot be 0"
        );
        anyhow::ensure!(
            config.server.store.message_count_max != 0,
            "The store must keep at least one message"
        );

        let mut seen = std::collections::HashSet::new();
        config.server.extensions.retain(|i| seen.insert(*i));

        let domain = config.server.domain.clone();
        let reply_codes = &mut config.server.smtp.codes;

        for key in <CodeID as strum::IntoEnumIterator>::iter() {
            let reply = reply_codes
                .remove(&key)
                .unwrap_or_else(|| FieldServerSMTP::default_reply(key));
            reply_codes.insert(key, reply.map_text(|line| line.replace("{domain}", &domain)));
        }

        Ok(config)
    }
}
