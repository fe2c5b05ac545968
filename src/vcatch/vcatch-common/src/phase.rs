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

/// Position of a connection in the mail transaction.
#[derive(
    Debug,
    Eq,
    PartialEq,
    Hash,
    Copy,
    Clone,
    Ord,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// After TCP/IP socket has been accepted
    Connected,
    /// After receiving HELO/EHLO, or once a transaction is over
    Greeted,
    /// After receiving MAIL FROM command
    HasSender,
    /// After at least one accepted RCPT TO command
    HasRecipients,
    /// Between the 354 reply and the terminating "."
    ReceivingData,
}

/// A transition refused by [`Phase::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot go from phase '{from}' to '{to}'")]
pub struct PhaseError {
    /// current phase
    pub from: Phase,
    /// requested phase
    pub to: Phase,
}

impl Phase {
    /// Is a mail transaction started (MAIL FROM accepted) ?
    #[must_use]
    pub const fn in_transaction(self) -> bool {
        matches!(
            self,
            Self::HasSender | Self::HasRecipients | Self::ReceivingData
        )
    }

    /// Compute the next phase, enforcing the order of the transaction.
    ///
    /// Going back to [`Phase::Greeted`] is always legal (RSET, end of DATA, HELO/EHLO),
    /// and [`Phase::Connected`] is never reachable again.
    ///
    /// # Errors
    ///
    /// * `to` is not reachable from `self`
    pub const fn advance(self, to: Self) -> Result<Self, PhaseError> {
        match (self, to) {
            (_, Self::Greeted)
            | (Self::Greeted, Self::HasSender)
            | (Self::HasSender | Self::HasRecipients, Self::HasRecipients)
            | (Self::HasRecipients, Self::ReceivingData) => Ok(to),
            (from, to) => Err(PhaseError { from, to }),
        }
    }
}
