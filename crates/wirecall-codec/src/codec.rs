use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use bytes::BufMut;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::trace;

use wirecall_proto::{Handshake, RequestEnvelope, ResponseEnvelope, WireFormat};

use crate::error::{CodecError, Result};
use crate::frame;
use crate::pool::{BufferPool, DEFAULT_ACQUIRE_TIMEOUT};

/// Encoder/decoder for one negotiated connection.
///
/// The handshake fixes format, compression, and numeric spelling for the
/// whole call; both directions of the exchange use the same settings. All
/// serialization scratch space comes from the shared [`BufferPool`], so a
/// codec never allocates per-call wire buffers of its own.
pub struct EnvelopeCodec {
    handshake: Handshake,
    pool: Arc<BufferPool>,
    max_frame: usize,
    acquire_timeout: Duration,
}

impl EnvelopeCodec {
    pub fn new(handshake: Handshake, pool: Arc<BufferPool>) -> Self {
        Self {
            handshake,
            pool,
            max_frame: frame::DEFAULT_MAX_FRAME,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Write the fixed preamble that opens every call. Always uncompressed
    /// and format-independent.
    pub fn write_handshake<W: Write>(&self, out: &mut W) -> Result<()> {
        frame::write_preamble(&self.handshake, out)?;
        out.flush()?;
        Ok(())
    }

    /// Read the preamble from an incoming call and build a codec speaking
    /// whatever the caller negotiated.
    pub fn accept<R: Read>(input: &mut R, pool: Arc<BufferPool>) -> Result<Self> {
        let handshake = frame::read_preamble(input)?;
        Ok(Self::new(handshake, pool))
    }

    pub fn write_request<W: Write>(&self, request: &RequestEnvelope, out: &mut W) -> Result<()> {
        self.write_envelope(out, |w| match self.handshake.format {
            WireFormat::Binary => ciborium::ser::into_writer(request, w)
                .map_err(|e| CodecError::BinaryEncode(e.to_string())),
            WireFormat::Text => {
                let json = crate::text::request_to_json(request, self.handshake.numeric_text);
                serde_json::to_writer(w, &json)?;
                Ok(())
            }
        })
    }

    pub fn read_request<R: Read>(&self, input: &mut R) -> Result<RequestEnvelope> {
        self.read_envelope(input, |payload| match self.handshake.format {
            WireFormat::Binary => ciborium::de::from_reader(payload)
                .map_err(|e| CodecError::BinaryDecode(e.to_string())),
            WireFormat::Text => {
                let json: serde_json::Value = serde_json::from_reader(payload)?;
                crate::text::request_from_json(&json)
            }
        })
    }

    pub fn write_response<W: Write>(&self, response: &ResponseEnvelope, out: &mut W) -> Result<()> {
        self.write_envelope(out, |w| match self.handshake.format {
            WireFormat::Binary => ciborium::ser::into_writer(response, w)
                .map_err(|e| CodecError::BinaryEncode(e.to_string())),
            WireFormat::Text => {
                let json = crate::text::response_to_json(response, self.handshake.numeric_text);
                serde_json::to_writer(w, &json)?;
                Ok(())
            }
        })
    }

    pub fn read_response<R: Read>(&self, input: &mut R) -> Result<ResponseEnvelope> {
        self.read_envelope(input, |payload| match self.handshake.format {
            WireFormat::Binary => ciborium::de::from_reader(payload)
                .map_err(|e| CodecError::BinaryDecode(e.to_string())),
            WireFormat::Text => {
                let json: serde_json::Value = serde_json::from_reader(payload)?;
                crate::text::response_from_json(&json)
            }
        })
    }

    fn write_envelope<W, F>(&self, out: &mut W, encode: F) -> Result<()>
    where
        W: Write,
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        // One pooled buffer per envelope, even when compressing: the
        // serializer streams straight through the deflater into the lease,
        // so a saturated pool never has calls holding two buffers.
        let mut lease = self.pool.acquire(self.acquire_timeout)?;
        if self.handshake.compressed {
            let mut encoder = ZlibEncoder::new((&mut *lease).writer(), Compression::default());
            encode(&mut encoder)?;
            encoder.finish()?;
            trace!(packed = lease.len(), "envelope compressed");
        } else {
            let mut writer = (&mut *lease).writer();
            encode(&mut writer)?;
        }
        frame::write_frame(&lease, out, self.max_frame)?;
        out.flush()?;
        Ok(())
    }

    fn read_envelope<R, T, F>(&self, input: &mut R, decode: F) -> Result<T>
    where
        R: Read,
        F: FnOnce(&mut dyn Read) -> Result<T>,
    {
        let mut lease = self.pool.acquire(self.acquire_timeout)?;
        frame::read_frame_into(input, &mut lease, self.max_frame)?;

        if self.handshake.compressed {
            // Inflate lazily out of the held buffer instead of staging the
            // plain bytes in a second lease.
            let mut decoder = ZlibDecoder::new(&lease[..]);
            trace!(packed = lease.len(), "inflating envelope");
            decode(&mut decoder)
        } else {
            let mut payload = &lease[..];
            decode(&mut payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use wirecall_proto::{Failure, Session, Status, Value};

    use super::*;

    fn codec(format: WireFormat, compressed: bool, numeric: bool) -> EnvelopeCodec {
        let pool = Arc::new(BufferPool::new(8));
        EnvelopeCodec::new(Handshake::new(format, compressed, numeric), pool)
    }

    fn sample_request() -> RequestEnvelope {
        RequestEnvelope::new(
            "A1B2".to_string(),
            Session::new("alice", "token-7", "billing"),
            Some(vec![Value::Int(2), Value::Int(3)]),
        )
    }

    #[test]
    fn request_roundtrip_all_modes() {
        for format in [WireFormat::Binary, WireFormat::Text] {
            for compressed in [false, true] {
                let codec = codec(format, compressed, true);
                let request = sample_request();

                let mut wire = Vec::new();
                codec.write_request(&request, &mut wire).unwrap();
                let decoded = codec.read_request(&mut Cursor::new(wire)).unwrap();
                assert_eq!(decoded, request);
            }
        }
    }

    #[test]
    fn response_roundtrip_error_status() {
        let codec = codec(WireFormat::Binary, true, false);
        let response =
            ResponseEnvelope::failed(Failure::remote_invocation("boom").with_detail("stack"));

        let mut wire = Vec::new();
        codec.write_response(&response, &mut wire).unwrap();
        let decoded = codec.read_response(&mut Cursor::new(wire)).unwrap();
        assert_eq!(decoded.status, Status::Error);
        assert_eq!(decoded, response);
    }

    #[test]
    fn handshake_travels_ahead_of_the_request() {
        let sender = codec(WireFormat::Text, true, true);
        let mut wire = Vec::new();
        sender.write_handshake(&mut wire).unwrap();
        sender.write_request(&sample_request(), &mut wire).unwrap();

        let pool = Arc::new(BufferPool::new(8));
        let mut input = Cursor::new(wire);
        let receiver = EnvelopeCodec::accept(&mut input, pool).unwrap();
        assert_eq!(receiver.handshake(), sender.handshake());

        let decoded = receiver.read_request(&mut input).unwrap();
        assert_eq!(decoded, sample_request());
    }

    #[test]
    fn compression_shrinks_repetitive_payloads() {
        let request = RequestEnvelope::new(
            "A1B2".to_string(),
            Session::anonymous(),
            Some(vec![Value::Str("ha".repeat(4096))]),
        );

        let mut raw = Vec::new();
        codec(WireFormat::Text, false, true)
            .write_request(&request, &mut raw)
            .unwrap();
        let mut packed = Vec::new();
        codec(WireFormat::Text, true, true)
            .write_request(&request, &mut packed)
            .unwrap();

        assert!(packed.len() < raw.len());
    }

    #[test]
    fn pool_buffers_come_back_after_each_call() {
        let pool = Arc::new(BufferPool::new(4));
        let codec = EnvelopeCodec::new(
            Handshake::new(WireFormat::Binary, true, false),
            Arc::clone(&pool),
        );

        let mut wire = Vec::new();
        codec.write_request(&sample_request(), &mut wire).unwrap();
        codec.read_request(&mut Cursor::new(wire)).unwrap();
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn compressed_call_holds_a_single_pooled_buffer() {
        // With only one buffer in the pool, a second acquire during the
        // same call would time out instead of completing.
        let pool = Arc::new(BufferPool::new(1));
        let codec = EnvelopeCodec::new(
            Handshake::new(WireFormat::Binary, true, false),
            Arc::clone(&pool),
        )
        .with_acquire_timeout(Duration::from_millis(200));

        let mut wire = Vec::new();
        codec.write_request(&sample_request(), &mut wire).unwrap();
        let decoded = codec.read_request(&mut Cursor::new(wire)).unwrap();
        assert_eq!(decoded, sample_request());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn oversized_envelope_rejected() {
        let codec = codec(WireFormat::Binary, false, true).with_max_frame(16);
        let request = RequestEnvelope::new(
            "A1B2".to_string(),
            Session::anonymous(),
            Some(vec![Value::Bytes(vec![0u8; 256])]),
        );

        let mut wire = Vec::new();
        let err = codec.write_request(&request, &mut wire).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { .. }));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let codec = codec(WireFormat::Text, false, true);
        let mut wire = Vec::new();
        frame::write_frame(b"not json at all", &mut wire, frame::DEFAULT_MAX_FRAME).unwrap();

        let err = codec.read_request(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
