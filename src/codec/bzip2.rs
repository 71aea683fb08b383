use crate::{
    codec::{Chunk, ChunkCodec},
    error::{CodecError, Result},
    util::PartialBuffer,
};
use bytes::{Bytes, BytesMut};
use bzip2::{Decompress, Status};
use futures_core::future::BoxFuture;
use std::{fmt, future::ready, io};

const OUTPUT_BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside a member, possibly before its first byte.
    Decoding,
    /// The last member ended and no further bytes have arrived.
    Done,
}

/// An in-process bzip2 decoder, or decompressor.
///
/// Concatenated bzip2 streams are decoded back to back, as the `bzip2` tool does; see
/// [`BzDecoder::multiple_members`].
pub struct BzDecoder {
    decompress: Decompress,
    multiple_members: bool,
    state: State,
}

impl fmt::Debug for BzDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BzDecoder {{total_in: {}, total_out: {}, state: {:?}}}",
            self.decompress.total_in(),
            self.decompress.total_out(),
            self.state,
        )
    }
}

impl Default for BzDecoder {
    fn default() -> Self {
        Self {
            decompress: Decompress::new(false),
            multiple_members: true,
            state: State::Decoding,
        }
    }
}

impl BzDecoder {
    /// Creates a new decoder, ready for the first byte of a bzip2 stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bytes following the end of a bzip2 stream start another stream.
    ///
    /// When disabled, any bytes after the first stream are rejected as malformed.
    pub fn multiple_members(mut self, enabled: bool) -> Self {
        self.multiple_members = enabled;
        self
    }

    fn reinit(&mut self) {
        self.decompress = Decompress::new(false);
        self.state = State::Decoding;
    }

    fn decode(
        &mut self,
        input: &mut PartialBuffer<&[u8]>,
        output: &mut PartialBuffer<&mut [u8]>,
    ) -> Result<Status> {
        let prior_in = self.decompress.total_in();
        let prior_out = self.decompress.total_out();

        let status = self
            .decompress
            .decompress(input.unwritten(), output.unwritten_mut())
            .map_err(CodecError::malformed)?;

        input.advance((self.decompress.total_in() - prior_in) as usize);
        output.advance((self.decompress.total_out() - prior_out) as usize);

        Ok(status)
    }

    fn decode_chunk(&mut self, chunk: &[u8]) -> Result<Bytes> {
        let mut input = PartialBuffer::new(chunk);
        let mut decoded = BytesMut::new();
        let mut buffer = vec![0; OUTPUT_BUFFER_SIZE];

        loop {
            if self.state == State::Done {
                if input.unwritten().is_empty() {
                    break;
                }
                if !self.multiple_members {
                    return Err(CodecError::malformed(
                        "trailing bytes after end of bzip2 stream",
                    ));
                }
                self.reinit();
            }

            let consumed = input.written().len();
            let mut output = PartialBuffer::new(&mut buffer[..]);
            let status = self.decode(&mut input, &mut output)?;
            decoded.extend_from_slice(output.written());

            match status {
                // The stream's end has been met, anything left over belongs to the next member.
                Status::StreamEnd => self.state = State::Done,

                Status::Ok => {
                    if !made_progress(consumed, &input, &output)? {
                        break;
                    }
                }

                Status::MemNeeded => return Err(io::Error::other("out of memory").into()),

                // Only reported by compression.
                status => {
                    return Err(CodecError::malformed(format!(
                        "unexpected decompression status {:?}",
                        status
                    )))
                }
            }
        }

        Ok(decoded.freeze())
    }

    fn finish_stream(&self) -> Result<Bytes> {
        // Without an end marker the stream is incomplete, even when no byte of it arrived.
        if self.state == State::Decoding {
            return Err(CodecError::Truncated);
        }
        Ok(Bytes::new())
    }
}

/// Whether decoding should go on after a call that returned `Status::Ok`.
///
/// Stops once the input is used up and the output buffer has room left. A call that neither
/// consumed input nor produced output while input remains would loop forever, so it fails.
fn made_progress(
    consumed: usize,
    input: &PartialBuffer<&[u8]>,
    output: &PartialBuffer<&mut [u8]>,
) -> Result<bool> {
    if output.is_full() {
        return Ok(true);
    }
    if input.unwritten().is_empty() {
        return Ok(false);
    }
    if input.written().len() == consumed && output.written().is_empty() {
        return Err(CodecError::malformed("bzip2 decoder made no progress"));
    }
    Ok(true)
}

impl ChunkCodec for BzDecoder {
    fn consume(&mut self, chunk: Chunk) -> BoxFuture<'_, Result<Bytes>> {
        let result = self.decode_chunk(chunk.data());
        tracing::trace!(?chunk, decoder = ?self, "bzip2 consume");
        Box::pin(ready(result))
    }

    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin(ready(self.finish_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::made_progress;
    use crate::{error::CodecError, util::PartialBuffer};

    #[test]
    fn stalled_call_is_an_error() {
        let data = [1, 2, 3];
        let input = PartialBuffer::new(&data[..]);
        let mut buffer = [0; 4];
        let output = PartialBuffer::new(&mut buffer[..]);

        assert!(matches!(
            made_progress(0, &input, &output),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn progress_decides_whether_to_continue() {
        let data = [1, 2, 3];
        let mut input = PartialBuffer::new(&data[..]);
        let mut buffer = [0; 4];
        let mut output = PartialBuffer::new(&mut buffer[..]);

        // Output without consuming input is still progress.
        output.advance(1);
        assert!(made_progress(0, &input, &output).unwrap());

        input.advance(3);
        assert!(!made_progress(0, &input, &output).unwrap());

        output.advance(3);
        assert!(made_progress(3, &input, &output).unwrap());
    }
}
