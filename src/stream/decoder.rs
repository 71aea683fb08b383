use crate::{
    codec::Chunk,
    error::{CodecError, Result},
    stream::StreamAdapter,
};
use bytes::Bytes;
use futures_core::{future::BoxFuture, stream::Stream};
use pin_project_lite::pin_project;
use std::{
    fmt, io, mem,
    pin::Pin,
    task::{Context, Poll},
};

type Step = BoxFuture<'static, (StreamAdapter, Result<Bytes>)>;

enum State {
    Reading(StreamAdapter),
    Decoding(Step),
    Finishing(BoxFuture<'static, Result<Bytes>>),
    Failed(CodecError),
    Done,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(adapter) => f.debug_tuple("Reading").field(adapter).finish(),
            Self::Decoding(_) => f.write_str("Decoding"),
            Self::Finishing(_) => f.write_str("Finishing"),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Self::Done => f.write_str("Done"),
        }
    }
}

pin_project! {
    /// A [`Stream`] of decoded bytes produced by a [`StreamAdapter`] pulling from an input
    /// stream.
    ///
    /// The next input chunk is only polled once the previous output has been handed to the
    /// consumer. Empty outputs are skipped. After the first error the stream ends.
    #[derive(Debug)]
    pub struct DecodeStream<S> {
        #[pin]
        input: S,
        state: State,
    }
}

impl<S> DecodeStream<S> {
    pub(crate) fn new(input: S, adapter: StreamAdapter) -> Self {
        Self {
            input,
            state: State::Reading(adapter),
        }
    }

    /// Acquires a reference to the underlying input stream.
    pub fn get_ref(&self) -> &S {
        &self.input
    }

    /// Acquires a mutable reference to the underlying input stream.
    ///
    /// Note that care must be taken to avoid tampering with the state of the stream which may
    /// otherwise confuse the decoding.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.input
    }

    /// Consumes this stream returning the underlying input stream.
    ///
    /// Any codec still held is dropped, killing a subprocess if there is one.
    pub fn into_inner(self) -> S {
        self.input
    }
}

impl<S, C> Stream for DecodeStream<S>
where
    S: Stream<Item = io::Result<C>>,
    C: Into<Chunk>,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes>>> {
        let mut this = self.project();

        loop {
            match mem::replace(this.state, State::Done) {
                State::Reading(mut adapter) => match this.input.as_mut().poll_next(cx) {
                    Poll::Pending => {
                        *this.state = State::Reading(adapter);
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(chunk))) => {
                        let chunk: Chunk = chunk.into();
                        *this.state = State::Decoding(Box::pin(async move {
                            let result = adapter.transform(chunk).await;
                            (adapter, result)
                        }));
                    }
                    Poll::Ready(Some(Err(err))) => {
                        return Poll::Ready(Some(Err(CodecError::Io(err))));
                    }
                    Poll::Ready(None) => {
                        *this.state = State::Finishing(Box::pin(async move {
                            adapter.finalize().await
                        }));
                    }
                },

                State::Decoding(mut step) => {
                    let (adapter, result) = match step.as_mut().poll(cx) {
                        Poll::Ready(ready) => ready,
                        Poll::Pending => {
                            *this.state = State::Decoding(step);
                            return Poll::Pending;
                        }
                    };
                    match result {
                        Ok(output) => {
                            *this.state = State::Reading(adapter);
                            if !output.is_empty() {
                                return Poll::Ready(Some(Ok(output)));
                            }
                        }
                        Err(err) => return Poll::Ready(Some(Err(err))),
                    }
                }

                State::Finishing(mut finish) => {
                    let result = match finish.as_mut().poll(cx) {
                        Poll::Ready(ready) => ready,
                        Poll::Pending => {
                            *this.state = State::Finishing(finish);
                            return Poll::Pending;
                        }
                    };
                    match result {
                        Ok(output) if output.is_empty() => return Poll::Ready(None),
                        Ok(output) => return Poll::Ready(Some(Ok(output))),
                        Err(mut err) => {
                            let output = err.take_output();
                            if output.is_empty() {
                                return Poll::Ready(Some(Err(err)));
                            }
                            *this.state = State::Failed(err);
                            return Poll::Ready(Some(Ok(output)));
                        }
                    }
                }

                State::Failed(err) => return Poll::Ready(Some(Err(err))),

                State::Done => return Poll::Ready(None),
            }
        }
    }
}
