use std::io::{Result, Write};

/// Forwards writes to `inner` while hashing and counting the bytes.
pub struct HashingForward<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
    pub counted: u64,
}

impl<W: Write> HashingForward<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            counted: 0,
        }
    }

    pub fn into_parts(self) -> (W, blake3::Hash, u64) {
        (self.inner, self.hasher.finalize(), self.counted)
    }
}

impl<W: Write> Write for HashingForward<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        // only what the sink accepted
        self.hasher.update(&buf[..n]);
        self.counted += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
