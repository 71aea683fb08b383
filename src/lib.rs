//! Adaptors between chunk-fed decoders and asynchronous byte pipelines.
//!
//! A decoder is anything implementing [`ChunkCodec`]: it is fed encoded chunks one at a time
//! and returns whatever decoded output each chunk completes, then flushes the remainder at end
//! of input. A [`StreamAdapter`] sequences those calls behind a push interface
//! ([`transform`](StreamAdapter::transform) / [`finalize`](StreamAdapter::finalize)), a pull
//! [`Stream`](futures_core::Stream) ([`decode_stream`](StreamAdapter::decode_stream)) or a
//! reader-to-writer [`pipe`](StreamAdapter::pipe).
//!
//! Backends are interchangeable: an in-process codec and an external process speaking over
//! stdin/stdout are driven identically, and [`bench::Benchmark`] times them against each other.
//!
//! ```no_run
//! # async fn run() -> decode_adapters::Result<()> {
//! use decode_adapters::{codec::PassThrough, StreamAdapter};
//!
//! let mut adapter = StreamAdapter::new(PassThrough::new());
//! assert_eq!(adapter.transform("AB").await?, "AB");
//! assert_eq!(adapter.transform("CD").await?, "CD");
//! assert!(adapter.finalize().await?.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Organization
//!
//!  Feature | Does
//! ---------|------
#![cfg_attr(
    feature = "bzip2",
    doc = "`bzip2` | [`BzDecoder`](crate::codec::BzDecoder), an in-process bzip2 decoder"
)]
#![cfg_attr(
    not(feature = "bzip2"),
    doc = "`bzip2` (*inactive*) | `BzDecoder`, an in-process bzip2 decoder"
)]
#![cfg_attr(
    feature = "process",
    doc = "`process` | [`ProcessDecoder`](crate::process::ProcessDecoder), a child process as a decoder"
)]
#![cfg_attr(
    not(feature = "process"),
    doc = "`process` (*inactive*) | `ProcessDecoder`, a child process as a decoder"
)]
//!
//! Both are enabled by default.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_copy_implementations,
    missing_debug_implementations
)]
#![cfg_attr(not(all(feature = "bzip2", feature = "process")), allow(unused))]

pub mod bench;
pub mod codec;
mod error;
#[cfg(feature = "process")]
#[cfg_attr(docsrs, doc(cfg(feature = "process")))]
pub mod process;
pub mod stream;
mod util;

pub use crate::{
    codec::{Chunk, ChunkCodec},
    error::{CodecError, Result},
    stream::StreamAdapter,
};
