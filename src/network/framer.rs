// src/network/framer.rs
//! Message framing over an ordered byte channel without a length prefix.
//!
//! Bytes are read in chunks into an accumulation buffer and a [`FrameDecoder`]
//! is asked after every read whether the buffer now starts with a complete
//! message. Bytes past the end of a decoded message stay buffered and are
//! served to the next `read_frame` call.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::error::FrameError;
use crate::core::crypto::serialization::{decode_value, WireDecode};
use crate::network::error::SessionError;

pub type Result<T> = std::result::Result<T, FrameError>;

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;
pub const DEFAULT_MAX_CHUNKS: usize = 20;

/// How many read attempts a single `read_frame` call may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBudget {
    Bounded(usize),
    /// Read until a message completes, the peer closes, or the size limit trips.
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_message_size: usize,
    pub chunk_size: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Detects message boundaries in an accumulation buffer.
pub trait FrameDecoder {
    type Item;

    /// `Ok(None)` when more bytes are needed, otherwise the message and the
    /// number of bytes it consumed from the front of `buf`.
    fn decode(&mut self, buf: &[u8]) -> Result<Option<(Self::Item, usize)>>;

    /// Last attempt once the peer has closed its side.
    fn decode_eof(&mut self, buf: &[u8]) -> Result<Option<(Self::Item, usize)>> {
        self.decode(buf)
    }
}

/// One JSON document per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentDecoder;

impl DocumentDecoder {
    fn parse(buf: &[u8], at_eof: bool) -> Result<Option<(Value, usize)>> {
        let mut stream = serde_json::Deserializer::from_slice(buf).into_iter::<Value>();
        match stream.next() {
            None => Ok(None),
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                // a bare number touching the end of the buffer may still be growing
                if value.is_number() && consumed == buf.len() && !at_eof {
                    return Ok(None);
                }
                Ok(Some((value, consumed)))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(FrameError::Malformed(e.to_string())),
        }
    }
}

impl FrameDecoder for DocumentDecoder {
    type Item = Value;

    fn decode(&mut self, buf: &[u8]) -> Result<Option<(Value, usize)>> {
        Self::parse(buf, false)
    }

    fn decode_eof(&mut self, buf: &[u8]) -> Result<Option<(Value, usize)>> {
        Self::parse(buf, true)
    }
}

/// Framed, optionally time-limited view of a byte channel.
pub struct Framer<S> {
    stream: S,
    buffer: Vec<u8>,
    limits: FrameLimits,
    timeout: Option<Duration>,
    last_frame_len: usize,
}

impl<S> Framer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, limits: FrameLimits) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            limits,
            timeout: None,
            last_frame_len: 0,
        }
    }

    /// Fails every subsequent read or write that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Applies new limits to subsequent reads; already buffered bytes are kept.
    pub fn set_limits(&mut self, limits: FrameLimits) {
        self.limits = limits;
    }

    /// Bytes received but not yet returned as part of a message.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn read_frame<D: FrameDecoder>(&mut self, decoder: &mut D, budget: ReadBudget) -> Result<D::Item> {
        if let Some(item) = self.take(decoder, false)? {
            return Ok(item);
        }

        let mut chunk = vec![0u8; self.limits.chunk_size];
        let mut reads = 0usize;
        loop {
            if let ReadBudget::Bounded(max_chunks) = budget {
                if reads >= max_chunks {
                    debug!(reads, buffered = self.buffer.len(), "read budget exhausted");
                    return Err(FrameError::BudgetExhausted { chunks: max_chunks });
                }
            }

            let n = self.read_chunk(&mut chunk).await?;
            reads += 1;

            if n == 0 {
                let received = self.buffer.len();
                if received > 0 {
                    if let Some(item) = self.take(decoder, true)? {
                        return Ok(item);
                    }
                }
                return Err(FrameError::ChannelClosed { received });
            }

            self.buffer.extend_from_slice(&chunk[..n]);
            if self.buffer.len() > self.limits.max_message_size {
                return Err(FrameError::Overflow {
                    limit: self.limits.max_message_size,
                });
            }

            if let Some(item) = self.take(decoder, false)? {
                trace!(reads, "frame complete");
                return Ok(item);
            }
            trace!(reads, buffered = self.buffer.len(), "incomplete frame, waiting for more data");
        }
    }

    /// Reads one JSON document and decodes it as a `T` over `Z_q`.
    /// Returns the value together with the document's size in bytes.
    pub async fn read_value<T: WireDecode>(&mut self, q: u64, budget: ReadBudget) -> std::result::Result<(T, usize), SessionError> {
        let document = self.read_frame(&mut DocumentDecoder, budget).await?;
        Ok((decode_value(&document, q)?, self.last_frame_len))
    }

    pub async fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| FrameError::Timeout(limit))??,
            None => write.await?,
        }
        Ok(())
    }

    /// Closes the write side of the channel.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn read_chunk(&mut self, chunk: &mut [u8]) -> Result<usize> {
        match self.timeout {
            Some(limit) => Ok(tokio::time::timeout(limit, self.stream.read(chunk))
                .await
                .map_err(|_| FrameError::Timeout(limit))??),
            None => Ok(self.stream.read(chunk).await?),
        }
    }

    fn take<D: FrameDecoder>(&mut self, decoder: &mut D, at_eof: bool) -> Result<Option<D::Item>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let decoded = if at_eof {
            decoder.decode_eof(&self.buffer)?
        } else {
            decoder.decode(&self.buffer)?
        };
        Ok(decoded.map(|(item, consumed)| {
            self.buffer.drain(..consumed);
            self.last_frame_len = consumed;
            item
        }))
    }
}
