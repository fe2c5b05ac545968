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

use crate::Address;

/// Outcome of the delivery to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RelayOutcome {
    /// accepted by the upstream server
    Success {
        ///
        #[serde(with = "time::serde::rfc3339")]
        relayed_at: time::OffsetDateTime,
    },
    /// the delivery attempt failed
    Failure {
        /// error returned by the outbound client
        error: String,
    },
}

impl RelayOutcome {
    ///
    #[must_use]
    pub fn success_now() -> Self {
        Self::Success {
            relayed_at: time::OffsetDateTime::now_utc(),
        }
    }

    ///
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A successful relay, as persisted next to the stored message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayRecord {
    ///
    pub recipient: Address,
    ///
    #[serde(with = "time::serde::rfc3339")]
    pub relayed_at: time::OffsetDateTime,
}

/// Result of one relay of a message, one entry per effective recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayResult {
    outcomes: std::collections::HashMap<Address, RelayOutcome>,
}

impl RelayResult {
    /// Record the outcome of `recipient`, replacing any previous one.
    pub fn insert(&mut self, recipient: Address, outcome: RelayOutcome) {
        self.outcomes.insert(recipient, outcome);
    }

    /// Has at least one recipient been relayed successfully ?
    #[must_use]
    pub fn was_relayed(&self) -> bool {
        self.outcomes.values().any(RelayOutcome::is_success)
    }

    /// Outcome of every recipient.
    #[must_use]
    pub const fn outcomes(&self) -> &std::collections::HashMap<Address, RelayOutcome> {
        &self.outcomes
    }

    ///
    #[must_use]
    pub fn get(&self, recipient: &Address) -> Option<&RelayOutcome> {
        self.outcomes.get(recipient)
    }

    ///
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    ///
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful deliveries, to be persisted by the caller.
    #[must_use]
    pub fn records(&self) -> Vec<RelayRecord> {
        let mut records = self
            .outcomes
            .iter()
            .filter_map(|(recipient, outcome)| match outcome {
                RelayOutcome::Success { relayed_at } => Some(RelayRecord {
                    recipient: recipient.clone(),
                    relayed_at: *relayed_at,
                }),
                RelayOutcome::Failure { .. } => None,
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        records
    }

    /// Failed deliveries, sorted by recipient.
    #[must_use]
    pub fn failures(&self) -> Vec<(&Address, &str)> {
        let mut failures = self
            .outcomes
            .iter()
            .filter_map(|(recipient, outcome)| match outcome {
                RelayOutcome::Failure { error } => Some((recipient, error.as_str())),
                RelayOutcome::Success { .. } => None,
            })
            .collect::<Vec<_>>();
        failures.sort_by(|a, b| a.0.cmp(b.0));
        failures
    }

    /// Human readable list of the failures: `"<rcpt>: <error>"` separated by a blank line.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        self.failures()
            .into_iter()
            .map(|(recipient, error)| format!("{recipient}: {error}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
