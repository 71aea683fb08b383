use decode_adapters::{
    bench::{Benchmark, Corpus},
    codec::{BzDecoder, PassThrough},
    process::{ProcessDecoder, ProcessSpec},
    Result, StreamAdapter,
};

use std::io::Read as _;

// Run this example by running the following in the terminal:
// ```
// cargo run --example bunzip2_bench -- [path/to/file.bz2]
// ```
// Without a path a synthetic corpus is generated. The `bzip2` variant needs the `bzip2` tool on
// `PATH`; if it is missing that variant is reported as failed and the others still run.

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    // Passing chunks straight through.
    let mut adapter = StreamAdapter::new(PassThrough::new());
    for chunk in ["hello", "world"] {
        let output = adapter.transform(chunk).await?;
        println!("{:?}", String::from_utf8_lossy(&output));
    }
    adapter.finalize().await?;

    // Decoding a small bzip2 stream.
    let hello = compress(b"hello world");
    let mut adapter = StreamAdapter::new(BzDecoder::new());
    let mut output = adapter.transform(hello).await?.to_vec();
    output.extend_from_slice(&adapter.finalize().await?);
    println!("{:?}", String::from_utf8_lossy(&output));

    // In-process decoder against the `bzip2` tool.
    let compressed = match std::env::args_os().nth(1) {
        Some(path) => std::fs::read(path)?,
        None => compress(&synthetic(32 << 20)),
    };
    let corpus = Corpus::from_bytes(compressed, 64 * 1024);

    let report = Benchmark::new()
        .variant("in-process", || Ok(StreamAdapter::new(BzDecoder::new())))
        .variant("bzip2 -d -c", || {
            Ok(StreamAdapter::new(ProcessDecoder::spawn(
                &ProcessSpec::bunzip2(),
            )?))
        })
        .variant("pass-through", || Ok(StreamAdapter::new(PassThrough::new())))
        .run(&corpus)
        .await;

    print!("{}", report);

    Ok(())
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut compressed = vec![];
    bzip2::read::BzEncoder::new(data, bzip2::Compression::default())
        .read_to_end(&mut compressed)
        .expect("compressing from memory cannot fail");
    compressed
}

fn synthetic(len: usize) -> Vec<u8> {
    let words = ["alpha ", "beta ", "gamma ", "delta\n", "epsilon ", "zeta "];
    words
        .iter()
        .cycle()
        .enumerate()
        .flat_map(|(i, word)| {
            let word = word.as_bytes();
            word.iter().copied().chain(if i % 7 == 0 { Some(b'!') } else { None })
        })
        .take(len)
        .collect()
}
