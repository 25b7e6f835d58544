use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;

use wirecall_proto::{Handshake, WireFormat};

use crate::error::{CodecError, Result};

/// Handshake preamble: magic (2) + version (1) + format (1) + compressed (1)
/// + numeric (1) = 6 bytes.
pub const PREAMBLE_SIZE: usize = 6;

/// Magic bytes: "WC" (0x57 0x43).
pub const MAGIC: [u8; 2] = [0x57, 0x43];

/// Wire protocol version carried in every preamble.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default maximum envelope frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Write the fixed handshake preamble. Never compressed or format-encoded;
/// this is the one record the server can read before it knows anything
/// about the call.
pub fn write_preamble<W: Write>(handshake: &Handshake, out: &mut W) -> Result<()> {
    let bytes = [
        MAGIC[0],
        MAGIC[1],
        PROTOCOL_VERSION,
        handshake.format.code(),
        u8::from(handshake.compressed),
        u8::from(handshake.numeric_text),
    ];
    out.write_all(&bytes)?;
    Ok(())
}

/// Read and validate the handshake preamble.
pub fn read_preamble<R: Read>(input: &mut R) -> Result<Handshake> {
    let mut bytes = [0u8; PREAMBLE_SIZE];
    read_exact(input, &mut bytes)?;

    if bytes[0..2] != MAGIC {
        return Err(CodecError::InvalidMagic);
    }
    if bytes[2] != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(bytes[2]));
    }
    let format = WireFormat::from_code(bytes[3])
        .ok_or_else(|| CodecError::InvalidHandshake(format!("unknown format code {}", bytes[3])))?;
    let compressed = flag(bytes[4], "compressed")?;
    let numeric_text = flag(bytes[5], "numeric")?;

    Ok(Handshake::new(format, compressed, numeric_text))
}

/// Write one length-prefixed envelope frame: u32 LE length + payload.
pub fn write_frame<W: Write>(payload: &[u8], out: &mut W, max_frame: usize) -> Result<()> {
    if payload.len() > max_frame {
        return Err(CodecError::FrameTooLarge {
            size: payload.len(),
            max: max_frame,
        });
    }
    out.write_all(&(payload.len() as u32).to_le_bytes())?;
    out.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed envelope frame into `buf` (cleared first).
///
/// The length is validated against `max_frame` before any payload
/// allocation happens.
pub fn read_frame_into<R: Read>(input: &mut R, buf: &mut BytesMut, max_frame: usize) -> Result<()> {
    let mut len_bytes = [0u8; 4];
    read_exact(input, &mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > max_frame {
        return Err(CodecError::FrameTooLarge {
            size: len,
            max: max_frame,
        });
    }

    buf.clear();
    buf.resize(len, 0);
    read_exact(input, &mut buf[..len])?;
    Ok(())
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            CodecError::ConnectionClosed
        } else {
            CodecError::Io(err)
        }
    })
}

fn flag(byte: u8, field: &str) -> Result<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidHandshake(format!(
            "{field} flag must be 0 or 1, got {other}"
        ))),
    }
}
