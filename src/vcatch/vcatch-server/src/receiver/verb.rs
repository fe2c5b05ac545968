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
    extension::{Activation, Extension},
    Connection,
};
use vcatch_common::Session;
use vcatch_protocol::{Error, UnparsedArgs};
extern crate alloc;

/// What the connection does once a verb returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// The connection is over (QUIT, or a fatal limit).
    Close,
    /// The verb succeeded and its extension must now act on the connection.
    Activated(Activation),
}

/// Handler of one SMTP command.
#[async_trait::async_trait]
pub trait Verb: Send + Sync {
    /// Upper-case keyword of the command.
    fn keyword(&self) -> &'static str;

    /// Is this handler the one to run in the current state of the session ?
    fn is_applicable(&self, session: &Session) -> bool;

    /// Process the command, write exactly one final reply.
    ///
    /// # Errors
    ///
    /// * the transport failed, the connection is over
    async fn execute(&self, conn: &mut Connection, args: UnparsedArgs) -> Result<Flow, Error>;
}

/// A candidate handler of a keyword, and the extension which contributed it.
#[derive(Clone)]
pub struct VerbEntry {
    ///
    pub verb: alloc::sync::Arc<dyn Verb>,
    /// `None` for the built-in verbs.
    pub owner: Option<alloc::sync::Arc<dyn Extension>>,
}

impl std::fmt::Debug for VerbEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerbEntry")
            .field("keyword", &self.verb.keyword())
            .field("owner", &self.owner.as_ref().map(|owner| owner.kind()))
            .finish()
    }
}

/// Outcome of [`VerbMap::resolve`].
#[derive(Debug)]
pub enum Resolution<'a> {
    /// The first candidate applicable to the session.
    Found(&'a VerbEntry),
    /// The keyword is known, but no candidate is applicable now.
    BadSequence,
    /// No candidate is registered for the keyword.
    Unknown,
}

/// Registry of the verbs, shared by every connection once the server is built.
///
/// The candidates of a keyword are tried in order, the built-in verbs are registered
/// first, and an extension must [`VerbMap::shadow`] a keyword to take precedence.
#[derive(Debug, Clone, Default)]
pub struct VerbMap {
    entries: Vec<VerbEntry>,
}

impl VerbMap {
    /// Append a candidate, tried after the ones already registered for its keyword.
    pub fn register(
        &mut self,
        verb: alloc::sync::Arc<dyn Verb>,
        owner: Option<alloc::sync::Arc<dyn Extension>>,
    ) {
        self.entries.push(VerbEntry { verb, owner });
    }

    /// Prepend a candidate, tried before the ones already registered for its keyword.
    pub fn shadow(
        &mut self,
        verb: alloc::sync::Arc<dyn Verb>,
        owner: Option<alloc::sync::Arc<dyn Extension>>,
    ) {
        self.entries.insert(0, VerbEntry { verb, owner });
    }

    /// Find the handler of `keyword` for the current state of `session`.
    #[must_use]
    pub fn resolve(&self, keyword: &str, session: &Session) -> Resolution<'_> {
        let mut known = false;
        for entry in self
            .entries
            .iter()
            .filter(|entry| entry.verb.keyword().eq_ignore_ascii_case(keyword))
        {
            if entry.verb.is_applicable(session) {
                return Resolution::Found(entry);
            }
            known = true;
        }

        if known {
            Resolution::BadSequence
        } else {
            Resolution::Unknown
        }
    }

    /// Keywords registered, in order of first registration.
    #[must_use]
    pub fn keywords(&self) -> Vec<&'static str> {
        let mut keywords = self
            .entries
            .iter()
            .map(|entry| entry.verb.keyword())
            .collect::<Vec<_>>();
        let mut seen = std::collections::HashSet::new();
        keywords.retain(|keyword| seen.insert(*keyword));
        keywords
    }
}
