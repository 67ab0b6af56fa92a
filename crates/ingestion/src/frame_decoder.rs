//! COBS frame reassembly for the ring notification stream.
//!
//! BLE notifications split frames arbitrarily, so bytes are accumulated in a
//! bounded buffer until the zero delimiter arrives. A frame that fills the
//! buffer before its delimiter is dropped and the decoder resynchronizes on
//! the next delimiter.

use std::ops::Deref;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::metrics::IngestionMetrics;
use crate::ring_codec::SENSOR_FRAME_LEN;

/// Reassembly capacity used by the ring firmware.
pub const DEFAULT_FRAME_CAPACITY: usize = 256;

/// COBS frame delimiter.
pub const FRAME_DELIMITER: u8 = 0;

/// A decoded frame, delimiter and overhead byte removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    bytes: Bytes,
}

impl DecodedFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl Deref for DecodedFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Incremental COBS decoder.
///
/// Owns its buffer; one instance per ring session.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    capacity: usize,
    metrics: Arc<IngestionMetrics>,
}

impl FrameDecoder {
    pub fn new(capacity: usize) -> Self {
        Self::with_metrics(capacity, Arc::new(IngestionMetrics::new()))
    }

    pub fn with_metrics(capacity: usize, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            metrics,
        }
    }

    /// Feed one transport chunk; returns every frame it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedFrame> {
        self.metrics.record_bytes(chunk.len());
        let mut frames = Vec::new();

        for &byte in chunk {
            self.buf.put_u8(byte);

            if self.buf.len() >= self.capacity {
                debug!(
                    capacity = self.capacity,
                    "frame buffer overflow, discarding partial frame"
                );
                self.metrics.record_overflow();
                self.buf.clear();
                continue;
            }

            if byte != FRAME_DELIMITER {
                continue;
            }

            let encoded = self.buf.split();
            match cobs_decode(&encoded) {
                Some(decoded) => {
                    if decoded.len() != SENSOR_FRAME_LEN {
                        debug!(len = decoded.len(), "frame of unexpected length");
                        self.metrics.record_unexpected_length();
                    }
                    trace!(len = decoded.len(), "frame decoded");
                    self.metrics.record_frame();
                    frames.push(DecodedFrame {
                        bytes: decoded.freeze(),
                    });
                }
                None => self.metrics.record_empty_frame(),
            }
        }

        frames
    }

    /// Drop any partially accumulated frame.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

/// Decode one COBS frame, trailing delimiter included.
///
/// The first byte is the distance to the next encoded zero; each byte found at
/// that distance is itself the next distance and is replaced by zero in the
/// output. The decoded length is always `encoded.len() - 2`. Returns `None`
/// for a bare delimiter.
pub fn cobs_decode(encoded: &[u8]) -> Option<BytesMut> {
    if encoded.len() < 2 {
        return None;
    }

    let body = &encoded[1..encoded.len() - 1];
    let mut out = BytesMut::with_capacity(body.len());
    let mut last_jump = 0usize;
    let mut jump = encoded[0] as usize;

    for (offset, &byte) in body.iter().enumerate() {
        let i = offset + 1;
        if i == last_jump + jump {
            out.put_u8(0);
            last_jump = i;
            jump = byte as usize;
        } else {
            out.put_u8(byte);
        }
    }

    Some(out)
}

/// Encode a payload as one COBS frame, trailing delimiter included.
///
/// Payloads shorter than 254 bytes never produce a 0xFF code block, which is
/// the only range the decoder above handles.
pub fn cobs_encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    let mut code_idx = 0;
    let mut code = 1u8;
    out.push(0);

    for &byte in payload {
        if byte == 0 {
            out[code_idx] = code;
            code_idx = out.len();
            out.push(0);
            code = 1;
        } else {
            out.push(byte);
            code += 1;
            if code == 0xFF {
                out[code_idx] = code;
                code_idx = out.len();
                out.push(0);
                code = 1;
            }
        }
    }

    out[code_idx] = code;
    out.push(FRAME_DELIMITER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_decode_known_frame() {
        // 11 00 22 -> 02 11 02 22 00
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        let frames = decoder.feed(&[0x02, 0x11, 0x02, 0x22, 0x00]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0x11, 0x00, 0x22]);
    }

    #[test]
    fn test_round_trip_random_payloads() {
        let mut rng = rand::rng();
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);

        for len in 1..=253usize {
            let payload: Vec<u8> = (0..len)
                .map(|_| if rng.random_bool(0.2) { 0 } else { rng.random() })
                .collect();
            let encoded = cobs_encode(&payload);
            assert_eq!(encoded.len(), payload.len() + 2);

            let frames = decoder.feed(&encoded);
            assert_eq!(frames.len(), 1, "len {len}");
            assert_eq!(frames[0].as_bytes(), payload.as_slice(), "len {len}");
            assert_eq!(decoder.pending_len(), 0);
        }
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let payload: Vec<u8> = (0..109u8).collect();
        let encoded = cobs_encode(&payload);
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);

        let mut frames = Vec::new();
        for chunk in encoded.chunks(20) {
            frames.extend(decoder.feed(chunk));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), payload.as_slice());
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut wire = cobs_encode(b"one");
        wire.extend(cobs_encode(b"two"));

        let frames = FrameDecoder::new(DEFAULT_FRAME_CAPACITY).feed(&wire);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), b"one");
        assert_eq!(frames[1].as_bytes(), b"two");
    }

    #[test]
    fn test_overflow_self_heals() {
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        let garbage = vec![0x55u8; 2 * DEFAULT_FRAME_CAPACITY];
        assert!(decoder.feed(&garbage).is_empty());

        let frames = decoder.feed(&cobs_encode(b"valid"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), b"valid");

        let snap = decoder.metrics().snapshot();
        assert_eq!(snap.overflow_discards, 2);
        assert_eq!(snap.frames_decoded, 1);
    }

    #[test]
    fn test_runaway_tail_only_corrupts_one_frame() {
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        assert!(decoder.feed(&[0x55u8; 300]).is_empty());

        // The leftover tail merges with the next delimited frame.
        let first = decoder.feed(&cobs_encode(b"lost"));
        assert_eq!(first.len(), 1);
        assert_ne!(first[0].as_bytes(), b"lost");

        let second = decoder.feed(&cobs_encode(b"kept"));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].as_bytes(), b"kept");
    }

    #[test]
    fn test_payload_reaching_capacity_is_discarded() {
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        let payload = vec![7u8; 254];
        assert!(decoder.feed(&cobs_encode(&payload)).is_empty());
        assert_eq!(decoder.metrics().snapshot().overflow_discards, 1);

        let frames = decoder.feed(&cobs_encode(b"next"));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_bare_delimiter_yields_nothing() {
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        assert!(decoder.feed(&[0, 0, 0]).is_empty());
        assert_eq!(decoder.metrics().snapshot().empty_frames, 3);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut decoder = FrameDecoder::new(DEFAULT_FRAME_CAPACITY);
        decoder.feed(&[0x04, 0x01, 0x02]);
        assert_eq!(decoder.pending_len(), 3);
        decoder.reset();
        assert_eq!(decoder.pending_len(), 0);

        let frames = decoder.feed(&cobs_encode(&[9, 9]));
        assert_eq!(frames[0].as_bytes(), &[9, 9]);
    }
}
