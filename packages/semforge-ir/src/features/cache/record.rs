//! Framed binary record layout for L2 entries.
//!
//! Fixed 26-byte header, then the payload:
//!
//! | offset | field          | size | encoding        |
//! |--------|----------------|------|-----------------|
//! | 0      | magic          | 4    | ASCII tag       |
//! | 4      | schema version | 2    | big-endian u16  |
//! | 6      | payload length | 4    | big-endian u32  |
//! | 10     | checksum       | 16   | Blake3-128      |
//! | 26     | payload        | N    | msgpack (tuple) |
//!
//! Payloads are msgpack in tuple/array form (no field names) so the
//! encoding stays compact and deterministic.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Cursor;

use super::error::{CacheError, CacheResult};
use super::types::Hash128;

/// Header size in bytes.
pub const HEADER_LEN: usize = 26;

/// Encode a value into a framed record.
pub fn encode_record<T: Serialize>(magic: [u8; 4], schema: u16, value: &T) -> CacheResult<Vec<u8>> {
    let payload =
        rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    if payload.len() > u32::MAX as usize {
        return Err(CacheError::Serialization(format!(
            "payload too large: {} bytes",
            payload.len()
        )));
    }
    let checksum = Hash128::compute(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&magic);
    out.write_u16::<BigEndian>(schema)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    out.write_u32::<BigEndian>(payload.len() as u32)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    out.extend_from_slice(checksum.as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Validate framing and decode the payload.
///
/// Returns `Corrupt` on magic/length/checksum mismatch, `SchemaMismatch` on
/// a version header from another schema. Both mean the record must be
/// deleted and the read treated as a miss.
pub fn decode_record<T: DeserializeOwned>(
    bytes: &[u8],
    magic: [u8; 4],
    schema: u16,
) -> CacheResult<T> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheError::Corrupt(format!(
            "record truncated: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0..4] != magic {
        return Err(CacheError::Corrupt("magic mismatch".into()));
    }

    let mut cursor = Cursor::new(&bytes[4..HEADER_LEN]);
    let found_schema = cursor
        .read_u16::<BigEndian>()
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;
    if found_schema != schema {
        return Err(CacheError::SchemaMismatch {
            found: found_schema,
            expected: schema,
        });
    }

    let payload_len = cursor
        .read_u32::<BigEndian>()
        .map_err(|e| CacheError::Corrupt(e.to_string()))? as usize;
    if bytes.len() != HEADER_LEN + payload_len {
        return Err(CacheError::Corrupt(format!(
            "payload length mismatch: header says {}, have {}",
            payload_len,
            bytes.len() - HEADER_LEN
        )));
    }

    let mut checksum = [0u8; 16];
    checksum.copy_from_slice(&bytes[10..26]);
    let payload = &bytes[HEADER_LEN..];
    if Hash128::compute(payload) != Hash128::from_bytes(checksum) {
        return Err(CacheError::Corrupt("checksum mismatch".into()));
    }

    rmp_serde::from_slice(payload).map_err(|e| CacheError::Deserialization(e.to_string()))
}
