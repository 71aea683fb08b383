pub const fn _assert_send<T: Send>() {}
pub const fn _assert_sync<T: Sync>() {}

/// A buffer with a cursor splitting it into a processed and an unprocessed part.
///
/// For input buffers the processed part is what the codec consumed, for output buffers it is
/// what the codec produced.
#[derive(Debug)]
pub(crate) struct PartialBuffer<B: AsRef<[u8]>> {
    buffer: B,
    index: usize,
}

impl<B: AsRef<[u8]>> PartialBuffer<B> {
    pub(crate) fn new(buffer: B) -> Self {
        Self { buffer, index: 0 }
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.index]
    }

    pub(crate) fn unwritten(&self) -> &[u8] {
        &self.buffer.as_ref()[self.index..]
    }

    pub(crate) fn advance(&mut self, amount: usize) {
        self.index += amount;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.index == self.buffer.as_ref().len()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PartialBuffer<B> {
    pub(crate) fn unwritten_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[self.index..]
    }
}

#[cfg(test)]
mod tests {
    use super::PartialBuffer;

    #[test]
    fn advance_moves_bytes_between_halves() {
        let mut buf = PartialBuffer::new([1u8, 2, 3]);
        buf.advance(2);
        assert_eq!(buf.written(), &[1, 2]);
        assert_eq!(buf.unwritten(), &[3]);
        assert!(!buf.is_full());
        buf.advance(1);
        assert!(buf.is_full());
    }
}
