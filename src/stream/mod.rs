//! Sequencing of [`ChunkCodec`] calls behind push and pull streaming interfaces.
//!
//! A [`StreamAdapter`] owns exactly one codec and feeds it one chunk at a time. Output chunk
//! *i* depends only on input chunks `0..=i`; the adaptor never looks ahead and never queues
//! more than the single call in flight, so a slow consumer stalls the producer.

mod decoder;

pub use self::decoder::DecodeStream;

use crate::{
    codec::{Chunk, ChunkCodec},
    error::{CodecError, Result},
};
use bytes::{Bytes, BytesMut};
use futures_core::stream::Stream;
use std::{fmt, io, mem};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};

/// Size of the chunks [`StreamAdapter::pipe`] reads from its source.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

enum State {
    Active(Box<dyn ChunkCodec>),
    Finished,
    Poisoned,
}

/// Wraps one codec into a sequential transform stage.
///
/// Any codec failure poisons the adaptor: the codec is torn down (a subprocess has exited by
/// then), the error is returned once and every later call fails with [`CodecError::Closed`].
/// Dropping the adaptor releases the codec, which for a subprocess means killing it.
pub struct StreamAdapter {
    state: State,
}

impl fmt::Debug for StreamAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Active(_) => "Active",
            State::Finished => "Finished",
            State::Poisoned => "Poisoned",
        };
        f.debug_struct("StreamAdapter").field("state", &state).finish()
    }
}

impl StreamAdapter {
    /// Creates an adaptor taking exclusive ownership of `codec`.
    pub fn new(codec: impl ChunkCodec + 'static) -> Self {
        Self::from_boxed(Box::new(codec))
    }

    /// Creates an adaptor from an already boxed codec.
    pub fn from_boxed(codec: Box<dyn ChunkCodec>) -> Self {
        Self {
            state: State::Active(codec),
        }
    }

    /// Whether the adaptor still accepts chunks.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// Feeds the next input chunk, returning the output it completes (possibly empty).
    pub async fn transform(&mut self, chunk: impl Into<Chunk>) -> Result<Bytes> {
        let chunk = chunk.into();
        let codec = match &mut self.state {
            State::Active(codec) => codec,
            State::Finished | State::Poisoned => return Err(CodecError::Closed),
        };

        tracing::trace!(?chunk, "transform");
        match codec.consume(chunk).await {
            Ok(output) => Ok(output),
            Err(err) => {
                tracing::debug!(%err, "codec failed, poisoning adaptor");
                if let State::Active(codec) = mem::replace(&mut self.state, State::Poisoned) {
                    codec.abort().await;
                }
                Err(err)
            }
        }
    }

    /// Signals end of input, returning the codec's final flush.
    ///
    /// Must be called exactly once after the last chunk; the codec is destroyed either way.
    pub async fn finalize(&mut self) -> Result<Bytes> {
        match mem::replace(&mut self.state, State::Finished) {
            State::Active(codec) => codec.finish().await.map_err(|err| {
                tracing::debug!(%err, "codec failed to finish");
                err
            }),
            State::Finished | State::Poisoned => Err(CodecError::Closed),
        }
    }

    /// Turns this adaptor into a [`Stream`] of decoded bytes pulling from `input`.
    pub fn decode_stream<S, C>(self, input: S) -> DecodeStream<S>
    where
        S: Stream<Item = io::Result<C>>,
        C: Into<Chunk>,
    {
        DecodeStream::new(input, self)
    }

    /// Drives everything readable from `reader` through the adaptor into `writer`.
    ///
    /// Returns the number of decoded bytes written. Output carried by a
    /// [`CodecError::ProcessFailed`] is written before the error is returned. The writer is
    /// flushed but not shut down.
    pub async fn pipe<R, W>(self, reader: R, writer: W) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.pipe_with_chunk_size(reader, writer, DEFAULT_CHUNK_SIZE)
            .await
    }

    /// Like [`pipe`](StreamAdapter::pipe), reading the source `chunk_size` bytes at a time.
    pub async fn pipe_with_chunk_size<R, W>(
        mut self,
        mut reader: R,
        mut writer: W,
        chunk_size: usize,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let chunk_size = chunk_size.max(1);
        let mut written = 0;

        loop {
            let mut buf = BytesMut::with_capacity(chunk_size);
            if reader.read_buf(&mut buf).await? == 0 {
                break;
            }
            let output = self.transform(buf.freeze()).await?;
            writer.write_all(&output).await?;
            written += output.len() as u64;
        }

        let output = match self.finalize().await {
            Ok(output) => output,
            Err(mut err) => {
                let output = err.take_output();
                writer.write_all(&output).await?;
                writer.flush().await?;
                return Err(err);
            }
        };
        writer.write_all(&output).await?;
        writer.flush().await?;
        written += output.len() as u64;

        Ok(written)
    }
}

const _: () = {
    use crate::util::_assert_send;

    _assert_send::<StreamAdapter>();
};
