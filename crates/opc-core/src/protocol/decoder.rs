//! Incremental OPC frame decoder.
//!
//! TCP is a *stream* protocol: a single read may return part of a header,
//! the tail of one payload, or anything in between.  [`FrameDecoder`] keeps
//! the partial state for one connection and reassembles complete frames no
//! matter how the bytes were split.
//!
//! # State machine
//!
//! ```text
//!            4 header bytes,            declared payload bytes
//!            length > 0                 received
//! AwaitingHeader ──────────▶ AwaitingPayload ──────────▶ frame, back to AwaitingHeader
//!       │
//!       └── 4 header bytes, length == 0 ──▶ frame, back to AwaitingHeader
//! ```
//!
//! The payload buffer is allocated once at 65536 bytes, the most the 16-bit
//! length field can declare, and reused for every frame.
//!
//! # Two ways to feed bytes
//!
//! - **Zero-copy**: read straight into [`FrameDecoder::read_buf`] and report
//!   the count with [`FrameDecoder::commit`].  The window never spans a frame
//!   boundary, so one read completes at most one frame.
//! - **From a chunk**: [`FrameDecoder::feed`] copies from a caller buffer and
//!   stops at the first completed frame.

use tracing::trace;

use crate::protocol::frame::{Frame, FrameHeader, HEADER_LEN, PAYLOAD_CAPACITY};

/// Where the decoder is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Collecting the 4-byte header; `received` bytes so far.
    AwaitingHeader { received: usize },
    /// Collecting `expected` payload bytes; `received` so far.
    AwaitingPayload { expected: usize, received: usize },
}

/// Per-connection frame reassembly state.
pub struct FrameDecoder {
    header: [u8; HEADER_LEN],
    header_len: usize,
    payload: Box<[u8]>,
    payload_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder awaiting its first header.
    pub fn new() -> Self {
        Self {
            header: [0; HEADER_LEN],
            header_len: 0,
            payload: vec![0; PAYLOAD_CAPACITY].into_boxed_slice(),
            payload_len: 0,
        }
    }

    /// Discards any partial frame.
    pub fn reset(&mut self) {
        self.header_len = 0;
        self.payload_len = 0;
    }

    /// Current position within the frame being assembled.
    pub fn state(&self) -> DecoderState {
        if self.header_len < HEADER_LEN {
            DecoderState::AwaitingHeader {
                received: self.header_len,
            }
        } else {
            DecoderState::AwaitingPayload {
                expected: self.expected_payload_len(),
                received: self.payload_len,
            }
        }
    }

    /// Returns `true` if no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        self.header_len == 0
    }

    /// The buffer window the next read should fill.
    ///
    /// While awaiting the header this is the rest of the header; afterwards it
    /// is the rest of the declared payload.  The window is never empty, so a
    /// zero-byte read into it always means end of stream.
    pub fn read_buf(&mut self) -> &mut [u8] {
        if self.header_len < HEADER_LEN {
            &mut self.header[self.header_len..]
        } else {
            let expected = self.expected_payload_len();
            &mut self.payload[self.payload_len..expected]
        }
    }

    /// Records that `n` bytes were written into [`read_buf`](Self::read_buf).
    ///
    /// Returns the frame if those bytes completed it; the decoder is then
    /// already reset for the next frame.  Counts larger than the window are
    /// clamped to it.
    pub fn commit(&mut self, n: usize) -> Option<Frame<'_>> {
        if self.advance(n) {
            Some(self.take_frame())
        } else {
            None
        }
    }

    /// Copies bytes from `input` until one frame completes or `input` runs out.
    ///
    /// Returns how many bytes were consumed and the completed frame, if any.
    /// Bytes after a completed frame are left for the next call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use opc_core::{FrameDecoder, Pixel};
    ///
    /// let mut decoder = FrameDecoder::new();
    /// let (used, frame) = decoder.feed(&[1, 1, 0, 3, 10]);
    /// assert_eq!(used, 5);
    /// assert!(frame.is_none());
    ///
    /// let (used, frame) = decoder.feed(&[20, 30]);
    /// assert_eq!(used, 2);
    /// assert_eq!(frame.unwrap().pixels(), &[Pixel::new(10, 20, 30)]);
    /// ```
    pub fn feed(&mut self, input: &[u8]) -> (usize, Option<Frame<'_>>) {
        let mut consumed = 0;
        while consumed < input.len() {
            let window = self.read_buf();
            let n = window.len().min(input.len() - consumed);
            window[..n].copy_from_slice(&input[consumed..consumed + n]);
            consumed += n;
            if self.advance(n) {
                return (consumed, Some(self.take_frame()));
            }
        }
        (consumed, None)
    }

    /// Feeds a whole chunk, invoking `on_frame` for every frame it completes.
    ///
    /// Returns the number of frames completed.
    pub fn decode_all<F>(&mut self, input: &[u8], mut on_frame: F) -> usize
    where
        F: FnMut(Frame<'_>),
    {
        let mut rest = input;
        let mut frames = 0;
        while !rest.is_empty() {
            let (used, frame) = self.feed(rest);
            if let Some(frame) = frame {
                on_frame(frame);
                frames += 1;
            }
            rest = &rest[used..];
        }
        frames
    }

    fn expected_payload_len(&self) -> usize {
        u16::from_be_bytes([self.header[2], self.header[3]]) as usize
    }

    /// Moves the fill counters forward; `true` when a frame is complete.
    fn advance(&mut self, n: usize) -> bool {
        if self.header_len < HEADER_LEN {
            self.header_len += n.min(HEADER_LEN - self.header_len);
            // A zero-length payload completes with the header.
            self.header_len == HEADER_LEN && self.expected_payload_len() == 0
        } else {
            let expected = self.expected_payload_len();
            self.payload_len += n.min(expected - self.payload_len);
            self.payload_len == expected
        }
    }

    fn take_frame(&mut self) -> Frame<'_> {
        let header = FrameHeader::from_bytes(self.header);
        let len = header.payload_len as usize;
        self.reset();
        trace!(
            address = header.address,
            command = u8::from(header.command),
            len,
            "frame complete"
        );
        Frame {
            address: header.address,
            command: header.command,
            payload: &self.payload[..len],
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("state", &self.state())
            .finish()
    }
}
