use crate::{
    codec::{Chunk, ChunkCodec},
    error::Result,
};
use bytes::Bytes;
use futures_core::future::BoxFuture;
use std::future::ready;

/// The identity codec: every chunk is emitted unchanged as soon as it arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough {
    total: u64,
}

impl PassThrough {
    /// Creates a new pass-through codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes forwarded so far.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl ChunkCodec for PassThrough {
    fn consume(&mut self, chunk: Chunk) -> BoxFuture<'_, Result<Bytes>> {
        self.total += chunk.len() as u64;
        tracing::trace!(?chunk, total = self.total, "pass through");
        Box::pin(ready(Ok(chunk.into_bytes())))
    }

    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin(ready(Ok(Bytes::new())))
    }
}
