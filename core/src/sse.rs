//! Incremental decoder for the double-newline framed event stream.
//!
//! Network reads are not aligned to frame boundaries: one frame may arrive
//! split across several chunks, and one chunk may carry several frames. The
//! decoder buffers bytes until a `\n\n` terminator is seen and only then
//! yields the complete frame, so callers never observe a partial frame.

use memchr::memmem;

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every frame completed by it, in
    /// arrival order. A trailing partial stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = memmem::find(&self.buf, b"\n\n") {
            let frame: Vec<u8> = self.buf.drain(..pos + 2).collect();
            frames.push(String::from_utf8_lossy(&frame[..pos]).into_owned());
        }
        frames
    }

    /// Called when the source is exhausted. Buffered bytes at that point
    /// belong to a frame that can no longer be completed; they are dropped,
    /// not treated as an error. Returns how many bytes were discarded.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buf.len();
        if dropped > 0 {
            tracing::debug!("dropping {dropped} bytes of unterminated trailing frame");
            self.buf.clear();
        }
        dropped
    }
}
