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

use crate::{Error, Reader};
use tokio::io::AsyncWriteExt;

/// A bidirectional byte stream: a TCP socket, a TLS stream over it, or a mock.
pub trait AsyncIo: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}

impl<T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> AsyncIo for T {}

/// Type erased [`AsyncIo`], the type of the stream does not change when it is upgraded.
pub type BoxedIo = Box<dyn AsyncIo>;

/// Transport handle of one connection.
///
/// It owns the underlying stream and the read buffer. The stream is only replaced by
/// [`Transport::apply_filter`], and only when nothing is buffered.
pub struct Transport {
    io: Option<BoxedIo>,
    reader: Reader,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("closed", &self.io.is_none())
            .field("reader", &self.reader)
            .finish()
    }
}

impl Transport {
    ///
    #[must_use]
    pub fn new(io: impl AsyncIo + 'static) -> Self {
        Self::from_boxed(Box::new(io))
    }

    ///
    #[must_use]
    pub fn from_boxed(io: BoxedIo) -> Self {
        Self {
            io: Some(io),
            reader: Reader::new(),
        }
    }

    /// Has the transport been closed, or lost during an upgrade ?
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.io.is_none()
    }

    /// Are some bytes of the client waiting to be processed ?
    #[must_use]
    pub fn has_buffered(&self) -> bool {
        self.reader.buffered() != 0
    }

    /// Read one CRLF terminated line, CRLF stripped.
    ///
    /// # Errors
    ///
    /// * see [`Reader::read_line`]
    /// * [`Error::Closed`] if the transport is closed
    pub async fn read_line(&mut self, max_length: usize) -> Result<Vec<u8>, Error> {
        let io = self.io.as_mut().ok_or(Error::Closed)?;
        self.reader.read_line(io, max_length).await
    }

    /// Write and flush `buffer`.
    ///
    /// # Errors
    ///
    /// * [`Error::Closed`] if the transport is closed
    /// * [`Error::Io`] writing failed
    pub async fn write_all(&mut self, buffer: &[u8]) -> Result<(), Error> {
        let io = self.io.as_mut().ok_or(Error::Closed)?;
        io.write_all(buffer).await?;
        io.flush().await?;
        Ok(())
    }

    /// Replace the stream by the one produced by `filter(stream)`, and return the
    /// value produced along with it.
    ///
    /// If `filter` fails the stream is lost and the transport is closed.
    ///
    /// # Errors
    ///
    /// * [`Error::BufferNotEmpty`] some bytes have been read ahead, nothing is replaced
    /// * [`Error::Closed`] if the transport is closed
    /// * [`Error::Io`] returned by `filter`
    pub async fn apply_filter<F, Fut, T>(&mut self, filter: F) -> Result<T, Error>
    where
        F: FnOnce(BoxedIo) -> Fut + Send,
        Fut: std::future::Future<Output = std::io::Result<(BoxedIo, T)>> + Send,
    {
        if self.has_buffered() {
            return Err(Error::BufferNotEmpty(self.reader.buffered()));
        }
        let io = self.io.take().ok_or(Error::Closed)?;
        let (io, output) = filter(io).await?;
        self.io = Some(io);
        Ok(output)
    }

    /// Flush and shut down the stream, idempotent.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] the shutdown failed, the transport is closed anyway
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        if let Some(mut io) = self.io.take() {
            io.flush().await?;
            io.shutdown().await?;
        }
        Ok(())
    }
}
