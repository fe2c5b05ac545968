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

/// Identifier of the replies the server can send, each one resolved into a [`crate::Reply`]
/// by the configuration.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde_with::DeserializeFromStr,
    serde_with::SerializeDisplay,
    strum::EnumString,
    strum::EnumVariantNames,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
pub enum CodeID {
    //
    // Specials Messages
    //
    /// First message sent by the server
    Greetings,
    ///
    Help,
    ///
    Closing,
    /// Reply to HELO
    Helo,
    ///
    DataStart,
    /// Reply to VRFY
    CannotVerify,
    //
    // SessionStatus
    //
    /// Accepted
    Ok,
    ///
    Failure,
    ///
    MailboxUnavailable,
    //
    // Parsing Command
    //
    ///
    UnrecognizedCommand,
    ///
    SyntaxErrorParams,
    ///
    ParameterUnimplemented,
    ///
    Unimplemented,
    ///
    BadSequence,
    ///
    LineTooLong,
    //
    // Resources
    //
    ///
    MessageSizeExceeded,
    ///
    TooManyRecipients,
    ///
    ConnectionMaxReached,
    ///
    TooManyError,
    ///
    Timeout,
    ///
    ShuttingDown,
    //
    // TLS extension
    //
    ///
    TlsGoAhead,
    ///
    TlsNotAvailable,
    ///
    TlsRequired,
    /// Bytes were sent after STARTTLS, before the handshake
    PipelinedStartTls,
    //
    // Auth extension
    //
    ///
    AuthSucceeded,
    ///
    AuthMechNotSupported,
    ///
    AuthClientCanceled,
    ///
    AuthMechanismMustBeEncrypted,
    ///
    AuthInvalidCredentials,
    ///
    AuthRequired,
    ///
    AuthErrorDecode64,
}
