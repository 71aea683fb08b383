#![no_main]
use libfuzzer_sys::fuzz_target;

use bytes::Bytes;
use decode_adapters::{codec::BzDecoder, StreamAdapter};
use futures::stream::TryStreamExt as _;
use futures_test::stream::StreamTestExt as _;
use std::io::Read as _;

fuzz_target!(|data: (Vec<u8>, Vec<u8>)| {
    let (expected, splits) = data;
    let mut compressed = vec![];
    bzip2::read::BzEncoder::new(&expected[..], bzip2::Compression::fast())
        .read_to_end(&mut compressed)
        .unwrap();

    // Each split byte is the length of the next chunk, the remainder forms the last chunk.
    let mut chunks = vec![];
    let mut rest = Bytes::from(compressed);
    for len in splits {
        let len = usize::from(len).min(rest.len());
        chunks.push(rest.split_to(len));
    }
    chunks.push(rest);

    futures::executor::block_on(async move {
        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>))
            .interleave_pending();
        let decoded: Vec<Bytes> = StreamAdapter::new(BzDecoder::new())
            .decode_stream(stream)
            .try_collect()
            .await
            .unwrap();
        let decoded: Vec<u8> = decoded.iter().flat_map(|b| b.iter().copied()).collect();
        assert_eq!(expected, decoded);
    });
});
