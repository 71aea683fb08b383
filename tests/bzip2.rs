use decode_adapters::{codec::BzDecoder, CodecError, StreamAdapter};
use ntest::timeout;

mod utils;

use utils::InputStream;

#[tokio::test]
async fn hello_world_in_one_chunk() {
    let compressed = utils::bzip2_compress(b"hello world");
    let mut adapter = StreamAdapter::new(BzDecoder::new());

    // The decoder may hold output back until `finalize`, only the concatenation matters.
    let mut output = adapter.transform(compressed).await.unwrap().to_vec();
    output.extend_from_slice(&adapter.finalize().await.unwrap());

    assert_eq!(output, b"hello world");
}

#[tokio::test]
async fn byte_at_a_time() {
    let input = b"the quick brown fox jumps over the lazy dog".repeat(10);
    let compressed = utils::bzip2_compress(&input);
    let chunks = InputStream::chunked(&compressed, 1);

    let output = utils::decode_all(&mut StreamAdapter::new(BzDecoder::new()), chunks.chunks())
        .await
        .unwrap();

    assert_eq!(output, input);
}

#[tokio::test]
async fn long_random_input() {
    let input = [utils::random_bytes(32_768), utils::random_bytes(32_768)].concat();
    let compressed = utils::bzip2_compress(&input);

    let output = utils::decode_all(
        &mut StreamAdapter::new(BzDecoder::new()),
        InputStream::chunked(&compressed, 1000).chunks(),
    )
    .await
    .unwrap();

    assert_eq!(output, input);
}

#[tokio::test]
async fn highly_compressible_input_overflows_output_buffer() {
    let input = vec![b'z'; 1 << 20];
    let compressed = utils::bzip2_compress(&input);

    let output = utils::decode_all(&mut StreamAdapter::new(BzDecoder::new()), vec![compressed])
        .await
        .unwrap();

    assert_eq!(output.len(), input.len());
    assert_eq!(output, input);
}

#[tokio::test]
async fn empty_input_is_truncated() {
    let mut adapter = StreamAdapter::new(BzDecoder::new());
    assert!(matches!(
        adapter.finalize().await,
        Err(CodecError::Truncated)
    ));

    let mut adapter = StreamAdapter::new(BzDecoder::new());
    assert!(adapter.transform(Vec::new()).await.unwrap().is_empty());
    assert!(matches!(
        adapter.finalize().await,
        Err(CodecError::Truncated)
    ));
}

#[tokio::test]
async fn compressed_empty_input() {
    let compressed = utils::bzip2_compress(&[]);

    let output = utils::decode_all(&mut StreamAdapter::new(BzDecoder::new()), vec![compressed])
        .await
        .unwrap();

    assert!(output.is_empty());
}

#[tokio::test]
async fn truncated_input() {
    let compressed = utils::bzip2_compress(&utils::random_bytes(10_000));
    let cut = &compressed[..compressed.len() - 10];

    let mut adapter = StreamAdapter::new(BzDecoder::new());
    adapter.transform(cut.to_vec()).await.unwrap();

    assert!(matches!(adapter.finalize().await, Err(CodecError::Truncated)));
}

#[tokio::test]
async fn malformed_input_poisons_adapter() {
    let mut adapter = StreamAdapter::new(BzDecoder::new());

    let result = adapter.transform(&b"definitely not bzip2 data"[..]).await;
    assert!(matches!(result, Err(CodecError::Malformed(_))), "{:?}", result);

    assert!(!adapter.is_active());
    assert!(matches!(
        adapter.transform(utils::bzip2_compress(b"ok")).await,
        Err(CodecError::Closed)
    ));
    assert!(matches!(adapter.finalize().await, Err(CodecError::Closed)));
}

#[tokio::test]
async fn concatenated_streams() {
    let compressed = [
        utils::bzip2_compress(b"hello "),
        utils::bzip2_compress(b"world"),
    ]
    .concat();

    let output = utils::decode_all(
        &mut StreamAdapter::new(BzDecoder::new()),
        InputStream::chunked(&compressed, 7).chunks(),
    )
    .await
    .unwrap();

    assert_eq!(output, b"hello world");
}

#[tokio::test]
async fn single_member_rejects_trailing_stream() {
    let compressed = [
        utils::bzip2_compress(b"hello "),
        utils::bzip2_compress(b"world"),
    ]
    .concat();

    let mut adapter = StreamAdapter::new(BzDecoder::new().multiple_members(false));
    let result = adapter.transform(compressed).await;

    assert!(matches!(result, Err(CodecError::Malformed(_))), "{:?}", result);
}

#[tokio::test]
async fn truncated_second_member() {
    let second = utils::bzip2_compress(b"world");
    let compressed = [utils::bzip2_compress(b"hello "), second[..second.len() / 2].to_vec()].concat();

    let mut adapter = StreamAdapter::new(BzDecoder::new());
    let output = adapter.transform(compressed).await.unwrap();

    assert_eq!(output, "hello ");
    assert!(matches!(adapter.finalize().await, Err(CodecError::Truncated)));
}

#[tokio::test]
async fn decode_stream() {
    let input = utils::random_bytes(20_000);
    let compressed = InputStream::chunked(&utils::bzip2_compress(&input), 333);

    let stream = StreamAdapter::new(BzDecoder::new()).decode_stream(compressed.stream());
    let output = utils::stream_to_vec(stream).await.unwrap();

    assert_eq!(output, input);
}

#[tokio::test]
async fn decode_stream_ends_after_error() {
    use futures::StreamExt as _;

    let compressed = InputStream::from(vec![b"BZh9 but then garbage".to_vec()]);
    let mut stream = StreamAdapter::new(BzDecoder::new()).decode_stream(compressed.stream());

    assert!(matches!(stream.next().await, Some(Err(CodecError::Malformed(_)))));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn pipe() {
    let input = utils::random_bytes(100_000);
    let compressed = utils::bzip2_compress(&input);
    let mut output = Vec::new();

    let written = StreamAdapter::new(BzDecoder::new())
        .pipe_with_chunk_size(&compressed[..], &mut output, 512)
        .await
        .unwrap();

    assert_eq!(written, input.len() as u64);
    assert_eq!(output, input);
}

#[test]
#[timeout(5000)]
fn usable_without_tokio() {
    let compressed = utils::bzip2_compress(b"no runtime needed");
    let mut adapter = StreamAdapter::new(BzDecoder::new());

    let output = futures::executor::block_on(utils::decode_all(&mut adapter, vec![compressed]));

    assert_eq!(output.unwrap(), b"no runtime needed");
}
