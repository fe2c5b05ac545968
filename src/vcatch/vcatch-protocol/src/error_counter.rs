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

use vcatch_common::ReplyCode;

/// What the connection must do after an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// the reply is not an error, or the count is below the soft threshold
    None,
    /// delay the reply
    Soft,
    /// reply `TooManyError` and close the connection
    Hard,
}

/// Count the error replies (4xx and 5xx) sent on a connection.
#[derive(Debug, Clone)]
pub struct ErrorCounter {
    /// Number of error replies sent.
    pub error_count: i64,
    /// Past this count, [`ErrorSeverity::Soft`]. `-1` to disable.
    pub threshold_soft_error: i64,
    /// Past this count, [`ErrorSeverity::Hard`]. `-1` to disable.
    pub threshold_hard_error: i64,
}

impl ErrorCounter {
    ///
    #[must_use]
    pub const fn new(threshold_soft_error: i64, threshold_hard_error: i64) -> Self {
        Self {
            error_count: 0,
            threshold_soft_error,
            threshold_hard_error,
        }
    }

    /// Account `code`, and return the action to take.
    pub fn record(&mut self, code: &ReplyCode) -> ErrorSeverity {
        if !code.is_error() {
            return ErrorSeverity::None;
        }
        self.error_count += 1;

        if self.threshold_hard_error != -1 && self.error_count >= self.threshold_hard_error {
            ErrorSeverity::Hard
        } else if self.threshold_soft_error != -1 && self.error_count >= self.threshold_soft_error
        {
            ErrorSeverity::Soft
        } else {
            ErrorSeverity::None
        }
    }
}
