// src/job/codec.rs

//! Binary encoding of [`BuildResult`] for cache files.
//!
//! Layout (all integers little-endian `u16`):
//!
//! ```text
//! artifact_len artifact_bytes
//! dep_count
//! dep_len dep_bytes        (dep_count times)
//! ```
//!
//! Cache files hold this encoding behind a gzip stream. Decoding never
//! checks that the artifact exists.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::time::SystemTime;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::errors::CodecError;
use crate::job::BuildResult;

fn write_u16(out: &mut impl Write, value: usize, err: CodecError) -> Result<(), CodecError> {
    let value = u16::try_from(value).map_err(|_| err)?;
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_str(out: &mut impl Write, s: &str) -> Result<(), CodecError> {
    write_u16(out, s.len(), CodecError::StringTooLong { len: s.len() })?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn read_u16(input: &mut impl Read) -> Result<u16, CodecError> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_str(input: &mut impl Read) -> Result<String, CodecError> {
    let len = read_u16(input)? as usize;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Write the uncompressed encoding of `result`.
pub fn encode(result: &BuildResult, out: &mut impl Write) -> Result<(), CodecError> {
    write_str(out, result.artifact())?;

    let deps = result.buildtime_dependencies();
    write_u16(
        out,
        deps.len(),
        CodecError::TooManyEntries { count: deps.len() },
    )?;
    for dep in deps {
        write_str(out, dep)?;
    }
    Ok(())
}

/// Read an uncompressed encoding, stamping the result with `timestamp`.
///
/// A truncated stream fails with an `UnexpectedEof` I/O error.
pub fn decode(input: &mut impl Read, timestamp: SystemTime) -> Result<BuildResult, CodecError> {
    let artifact = read_str(input)?;
    let count = read_u16(input)?;
    let mut deps = BTreeSet::new();
    for _ in 0..count {
        deps.insert(read_str(input)?);
    }
    Ok(BuildResult::unchecked(artifact, deps, timestamp))
}

/// Gzip-compressed encoding, as stored in cache files.
pub fn encode_compressed(result: &BuildResult) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encode(result, &mut encoder)?;
    Ok(encoder.finish()?)
}

/// Decompress a whole cache stream into memory, then decode it.
///
/// The stream must hold exactly one encoding; leftover bytes are an error.
pub fn decode_compressed(
    input: impl Read,
    timestamp: SystemTime,
) -> Result<BuildResult, CodecError> {
    let mut decoder = GzDecoder::new(input);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;

    let mut rest = raw.as_slice();
    let result = decode(&mut rest, timestamp)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes { count: rest.len() });
    }
    Ok(result)
}
