//! Timing interchangeable decoder backends against one another.
//!
//! Every registered variant decodes the same read-only [`Corpus`], one after the other, and
//! its wall-clock time is returned as data in a [`Report`]. The timer covers the variant's
//! factory call (so a subprocess's launch is included), every chunk, and the final flush.

use crate::{
    error::{CodecError, Result},
    stream::StreamAdapter,
};
use bytes::Bytes;
use std::{
    fmt,
    time::{Duration, Instant},
};

/// An input corpus already split into the chunks fed to each variant.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<Bytes>,
}

impl Corpus {
    /// Splits `data` into chunks of `chunk_size` bytes (the last one may be shorter).
    pub fn from_bytes(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        let mut data = data.into();
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::with_capacity(data.len() / chunk_size + 1);
        while !data.is_empty() {
            let at = chunk_size.min(data.len());
            chunks.push(data.split_to(at));
        }
        Self { chunks }
    }

    /// Uses the given chunking as is.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// The chunks, in feeding order.
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Total number of bytes across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Whether the corpus carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Factory = Box<dyn Fn() -> Result<StreamAdapter> + Send + Sync>;

struct Variant {
    name: String,
    factory: Factory,
}

/// An ordered set of named decoder variants to time.
#[derive(Default)]
pub struct Benchmark {
    variants: Vec<Variant>,
}

impl fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.variants.iter().map(|variant| &variant.name))
            .finish()
    }
}

impl Benchmark {
    /// Creates an empty benchmark.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variant; `factory` builds a fresh adaptor for each run.
    pub fn variant<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<StreamAdapter> + Send + Sync + 'static,
    {
        self.variants.push(Variant {
            name: name.into(),
            factory: Box::new(factory),
        });
        self
    }

    /// Runs each variant once over `corpus`, sequentially and in registration order.
    ///
    /// A failing variant is recorded in the report and does not stop the others.
    pub async fn run(&self, corpus: &Corpus) -> Report {
        let mut measurements = Vec::with_capacity(self.variants.len());

        for variant in &self.variants {
            let start = Instant::now();
            let result = run_variant(&variant.factory, corpus).await;
            let elapsed = start.elapsed();

            let outcome = match result {
                Ok(bytes_out) => {
                    tracing::info!(variant = %variant.name, ?elapsed, bytes_out, "variant finished");
                    Ok(Sample { elapsed, bytes_out })
                }
                Err(err) => {
                    tracing::warn!(variant = %variant.name, ?elapsed, %err, "variant failed");
                    Err(err)
                }
            };

            measurements.push(Measurement {
                name: variant.name.clone(),
                outcome,
            });
        }

        Report { measurements }
    }
}

async fn run_variant(factory: &Factory, corpus: &Corpus) -> Result<u64> {
    // A failed `transform` has torn the codec down and `finalize` waits for the codec to end,
    // so nothing of this variant is still running when the next one starts.
    let mut adapter = factory()?;
    let mut bytes_out = 0;

    for chunk in corpus.chunks() {
        bytes_out += adapter.transform(chunk.clone()).await?.len() as u64;
    }
    bytes_out += adapter.finalize().await?.len() as u64;

    Ok(bytes_out)
}

/// Timing of one successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Wall-clock time from adaptor creation to the end of the final flush.
    pub elapsed: Duration,
    /// Decoded bytes produced.
    pub bytes_out: u64,
}

/// The outcome of one variant.
#[derive(Debug)]
pub struct Measurement {
    /// Name the variant was registered under.
    pub name: String,
    /// Its timing, or the error that stopped it.
    pub outcome: Result<Sample, CodecError>,
}

impl Measurement {
    /// Elapsed time, if the variant succeeded.
    pub fn elapsed(&self) -> Option<Duration> {
        self.outcome.as_ref().ok().map(|sample| sample.elapsed)
    }
}

/// Per-variant results, in registration order.
#[derive(Debug)]
pub struct Report {
    measurements: Vec<Measurement>,
}

impl Report {
    /// All measurements, in registration order.
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// `(name, elapsed)` pairs for the successful variants, in registration order.
    pub fn durations(&self) -> Vec<(&str, Duration)> {
        self.measurements
            .iter()
            .filter_map(|m| m.elapsed().map(|elapsed| (m.name.as_str(), elapsed)))
            .collect()
    }

    /// Successful variants, fastest first.
    pub fn ranking(&self) -> Vec<&Measurement> {
        let mut ranked: Vec<_> = self
            .measurements
            .iter()
            .filter(|m| m.outcome.is_ok())
            .collect();
        ranked.sort_by_key(|m| m.elapsed());
        ranked
    }

    /// Looks up a measurement by variant name.
    pub fn get(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fastest = self.ranking().first().and_then(|m| m.elapsed());

        for m in &self.measurements {
            match &m.outcome {
                Ok(sample) => {
                    write!(f, "{}: {:?} ({} bytes)", m.name, sample.elapsed, sample.bytes_out)?;
                    if let Some(fastest) = fastest.filter(|fastest| !fastest.is_zero()) {
                        let ratio = sample.elapsed.as_secs_f64() / fastest.as_secs_f64();
                        write!(f, " {:.2}x", ratio)?;
                    }
                    writeln!(f)?;
                }
                Err(err) => writeln!(f, "{}: failed: {}", m.name, err)?,
            }
        }

        Ok(())
    }
}
