//! The chunk-fed decoder contract and the in-process codecs implementing it.
//!
//! A codec value *is* its decoding state: it is created by the codec's constructor, mutated by
//! every [`ChunkCodec::consume`] call and destroyed by [`ChunkCodec::finish`], which takes it
//! by value so it cannot be used afterwards.

use crate::error::Result;
use bytes::Bytes;
use futures_core::future::BoxFuture;
use std::fmt;

#[cfg(feature = "bzip2")]
mod bzip2;
mod pass_through;

#[cfg(feature = "bzip2")]
#[cfg_attr(docsrs, doc(cfg(feature = "bzip2")))]
pub use self::bzip2::BzDecoder;
pub use self::pass_through::PassThrough;

/// One piece of an encoded byte stream.
///
/// The optional encoding hint is carried for display only and never affects decoding.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    data: Bytes,
    encoding: Option<String>,
}

impl Chunk {
    /// Creates a chunk without an encoding hint.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            encoding: None,
        }
    }

    /// Attaches an encoding hint, such as `"buffer"` or `"utf8"`.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// The chunk's bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The display-only encoding hint, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Number of bytes in this chunk.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether this chunk carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the chunk returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("len", &self.data.len())
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(data: &'static [u8]) -> Self {
        Self::new(data)
    }
}

impl From<&'static str> for Chunk {
    fn from(data: &'static str) -> Self {
        Self::new(data).with_encoding("utf8")
    }
}

/// Something that turns encoded byte chunks into decoded byte chunks, given enough chunks.
///
/// Calls on one codec are strictly sequential: the `&mut self` receiver of
/// [`consume`](ChunkCodec::consume) means a second chunk cannot be fed while the first is
/// still in flight.
pub trait ChunkCodec: Send {
    /// Feeds one chunk, returning whatever output it completes.
    ///
    /// The codec may withhold bytes it cannot decode yet and return an empty buffer; withheld
    /// input is kept for the next call. Fails with [`Malformed`](crate::CodecError::Malformed)
    /// when the accumulated input cannot be a prefix of the encoded format.
    fn consume(&mut self, chunk: Chunk) -> BoxFuture<'_, Result<Bytes>>;

    /// Signals end of input, flushing anything still withheld and destroying the codec.
    ///
    /// Fails with [`Truncated`](crate::CodecError::Truncated) when the input stopped in the
    /// middle of an encoded unit.
    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<Bytes>>;

    /// Releases the codec after a failed [`consume`](ChunkCodec::consume).
    ///
    /// The returned future completes once every resource the codec holds is gone; for a child
    /// process that means it has exited. In-process codecs have nothing to wait for.
    fn abort(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(std::future::ready(()))
    }
}

impl<C: ChunkCodec + ?Sized> ChunkCodec for Box<C> {
    fn consume(&mut self, chunk: Chunk) -> BoxFuture<'_, Result<Bytes>> {
        C::consume(&mut **self, chunk)
    }

    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<Bytes>> {
        C::finish(*self)
    }

    fn abort(self: Box<Self>) -> BoxFuture<'static, ()> {
        C::abort(*self)
    }
}
