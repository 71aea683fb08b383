#![allow(dead_code)] // Different tests use a different subset of functions

mod input_stream;

pub use self::input_stream::InputStream;

use bytes::Bytes;
use decode_adapters::{Chunk, Result, StreamAdapter};
use futures::{
    pin_mut,
    stream::{Stream, TryStreamExt as _},
};
use std::io::Read;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .without_time()
        .with_ansi(false)
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn read_to_vec(mut read: impl Read) -> Vec<u8> {
    let mut output = vec![];
    read.read_to_end(&mut output).unwrap();
    output
}

pub fn bzip2_compress(bytes: &[u8]) -> Vec<u8> {
    use bzip2::{read::BzEncoder, Compression};
    read_to_vec(BzEncoder::new(bytes, Compression::fast()))
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random()).collect()
}

/// Feeds every chunk through `adapter` then finalizes it, concatenating all outputs.
pub async fn decode_all<I>(adapter: &mut StreamAdapter, chunks: I) -> Result<Vec<u8>>
where
    I: IntoIterator,
    I::Item: Into<Chunk>,
{
    let mut output = vec![];
    for chunk in chunks {
        output.extend_from_slice(&adapter.transform(chunk).await?);
    }
    output.extend_from_slice(&adapter.finalize().await?);
    Ok(output)
}

pub async fn stream_to_vec(stream: impl Stream<Item = Result<Bytes>>) -> Result<Vec<u8>> {
    pin_mut!(stream);
    let mut output = vec![];
    while let Some(bytes) = stream.try_next().await? {
        assert!(!bytes.is_empty(), "decode streams skip empty outputs");
        output.extend_from_slice(&bytes);
    }
    Ok(output)
}
