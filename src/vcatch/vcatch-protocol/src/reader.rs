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

use crate::Error;
use tokio::io::AsyncReadExt;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

/// Split a byte source in CRLF terminated lines.
///
/// The buffer is owned by the reader and not by the source, the bytes read ahead
/// (pipelined commands) survive a replacement of the source.
#[derive(Debug)]
pub struct Reader {
    buffer: bytes::BytesMut,
    additional_reserve: usize,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    ///
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: bytes::BytesMut::with_capacity(80),
            additional_reserve: 100,
        }
    }

    /// Number of bytes read from the source but not consumed yet.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Read the next line, CRLF stripped.
    ///
    /// # Errors
    ///
    /// * [`Error::BufferTooLong`] the line is longer than `max_length`, it is consumed
    ///   up to its CRLF, and the next call returns the following line
    /// * [`Error::Closed`] the source reached the end of file before a complete line
    /// * [`Error::Io`] reading the source failed
    pub async fn read_line<R>(&mut self, source: &mut R, max_length: usize) -> Result<Vec<u8>, Error>
    where
        R: tokio::io::AsyncRead + Unpin + ?Sized,
    {
        let mut discarded = 0;

        loop {
            if let Some(pos) = find(&self.buffer, b"\r\n") {
                let mut line = self.buffer.split_to(pos + 2);
                line.truncate(pos);

                let got = discarded + pos;
                if got > max_length {
                    return Err(Error::BufferTooLong {
                        expected: max_length,
                        got,
                    });
                }
                return Ok(line.to_vec());
            }

            // the line is already too long, drop what has been read but a trailing '\r'
            if self.buffer.len() > max_length + 1 {
                let keep = usize::from(self.buffer.last() == Some(&b'\r'));
                let dropped = self.buffer.len() - keep;
                discarded += dropped;
                drop(self.buffer.split_to(dropped));
            }

            self.buffer.reserve(self.additional_reserve);
            let read_size = source.read_buf(&mut self.buffer).await?;
            if read_size == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        remaining = self.buffer.len(),
                        "Connection closed in the middle of a line."
                    );
                    self.buffer.clear();
                }
                return Err(Error::Closed);
            }
        }
    }
}
