use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{decode_frame, Frame, MAGIC};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;

/// Accumulates transport notification fragments and extracts complete,
/// checksum-valid frames in arrival order.
///
/// The transport may split or coalesce frames arbitrarily; corrupted runs
/// are skipped by scanning for the next start-of-frame marker rather than
/// tearing the session down.
#[derive(Debug)]
pub struct Reassembler {
    buf: BytesMut,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append newly arrived transport bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract every complete frame currently buffered.
    ///
    /// Stops at the first incomplete frame, leaving its bytes buffered for
    /// the next `feed`. Invalid data (bad marker, bad length, checksum
    /// mismatch) triggers a byte-by-byte scan to the next marker.
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match decode_frame(&self.buf) {
                Ok(Some((frame, consumed))) => {
                    self.buf.advance(consumed);
                    frames.push(frame);
                }
                Ok(None) => break,
                Err(err) => {
                    let discarded = self.resync();
                    debug!(error = %err, discarded, "frame desynchronized, scanned to next marker");
                }
            }
        }
        frames
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop all buffered bytes (session teardown).
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Skip the current byte and advance to the next start-of-frame marker,
    /// or empty the buffer if none remains. Returns the discard count.
    fn resync(&mut self) -> usize {
        let skip = self.buf[1..]
            .iter()
            .position(|&b| b == MAGIC)
            .map(|pos| pos + 1)
            .unwrap_or(self.buf.len());
        self.buf.advance(skip);
        skip
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn sample(seq: u16) -> Frame {
        Frame::request(0x1D, 0x02, seq, Bytes::from(format!("payload-{seq}")))
    }

    #[test]
    fn whole_frame_in_one_feed() {
        let mut reassembler = Reassembler::new();
        reassembler.feed(&wire(&[sample(1)]));

        let frames = reassembler.drain();
        assert_eq!(frames, vec![sample(1)]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn one_byte_at_a_time() {
        let expected = [sample(1), sample(2), sample(3)];
        let stream = wire(&expected);

        let mut reassembler = Reassembler::new();
        let mut frames = Vec::new();
        for byte in stream {
            reassembler.feed(&[byte]);
            frames.extend(reassembler.drain());
        }
        assert_eq!(frames, expected);
    }

    #[test]
    fn arbitrary_partitions_yield_identical_sequence() {
        let expected = [sample(10), sample(11)];
        let stream = wire(&expected);

        for chunk_size in [1, 2, 3, 5, 7, 16, stream.len()] {
            let mut reassembler = Reassembler::new();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                reassembler.feed(chunk);
                frames.extend(reassembler.drain());
            }
            assert_eq!(frames, expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn coalesced_frames_in_single_notification() {
        let expected = [sample(1), sample(2), sample(3), sample(4)];
        let mut reassembler = Reassembler::new();
        reassembler.feed(&wire(&expected));
        assert_eq!(reassembler.drain(), expected);
    }

    #[test]
    fn resync_after_corrupted_run() {
        let valid = sample(5);
        let mut stream = vec![0x13, 0x37, 0xFF, 0x00, 0x42];
        stream.extend_from_slice(&wire(&[valid.clone()]));

        let mut reassembler = Reassembler::new();
        reassembler.feed(&stream);
        assert_eq!(reassembler.drain(), vec![valid]);
    }

    #[test]
    fn resync_after_checksum_corruption() {
        let first = sample(1);
        let second = sample(2);
        let mut stream = wire(&[first]);
        stream[14] ^= 0xFF; // corrupt the first frame's payload
        stream.extend_from_slice(&wire(&[second.clone()]));
        // Trailing idle bytes so a spurious marker inside the corrupted
        // frame's checksum bytes cannot stall the scan at end-of-buffer.
        stream.extend_from_slice(&[0u8; 1024]);

        let mut reassembler = Reassembler::new();
        reassembler.feed(&stream);
        assert_eq!(reassembler.drain(), vec![second]);
    }

    #[test]
    fn spurious_markers_in_garbage_are_skipped() {
        // Two bogus markers, each with an undersized length field, before a
        // real frame.
        let valid = sample(9);
        let mut stream = vec![0xAA, 0x02, 0x00, 0xAA, 0x03, 0x00];
        stream.extend_from_slice(&wire(&[valid.clone()]));

        let mut reassembler = Reassembler::new();
        reassembler.feed(&stream);
        assert_eq!(reassembler.drain(), vec![valid]);
    }

    #[test]
    fn plausible_length_garbage_recovers_via_checksum() {
        // A bogus marker whose length field spans into the real frame: the
        // header checksum rejects it and the scan lands on the real marker.
        let valid = sample(9);
        let mut stream = vec![0xAA, 0x14, 0x00, 0xDE];
        stream.extend_from_slice(&wire(&[valid.clone()]));

        let mut reassembler = Reassembler::new();
        reassembler.feed(&stream);
        assert_eq!(reassembler.drain(), vec![valid]);
    }

    #[test]
    fn garbage_only_empties_buffer() {
        let mut reassembler = Reassembler::new();
        reassembler.feed(&[0x01, 0x02, 0x03, 0x04]);
        assert!(reassembler.drain().is_empty());
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn incomplete_tail_stays_buffered() {
        let stream = wire(&[sample(1)]);
        let (head, tail) = stream.split_at(stream.len() - 3);

        let mut reassembler = Reassembler::new();
        reassembler.feed(head);
        assert!(reassembler.drain().is_empty());
        assert_eq!(reassembler.buffered(), head.len());

        reassembler.feed(tail);
        assert_eq!(reassembler.drain(), vec![sample(1)]);
    }

    #[test]
    fn clear_discards_buffered_bytes() {
        let mut reassembler = Reassembler::new();
        reassembler.feed(&wire(&[sample(1)])[..5]);
        reassembler.clear();
        assert_eq!(reassembler.buffered(), 0);
        assert!(reassembler.drain().is_empty());
    }

    #[test]
    fn arrival_order_preserved_across_corruption() {
        let frames = [sample(1), sample(2), sample(3)];
        let mut stream = wire(&frames[..1]);
        stream.push(0x00); // stray byte between frames
        stream.extend_from_slice(&wire(&frames[1..]));

        let mut reassembler = Reassembler::new();
        reassembler.feed(&stream);
        assert_eq!(reassembler.drain(), frames);
    }
}
