// src/state/wire.rs

//! Primitive read/write helpers for the persistent form.
//!
//! All counts and ids are little-endian `u32`; strings are a `u32` byte
//! length followed by UTF-8 bytes.

use std::io::{Read, Write};

use crate::errors::{StateError, StateResult};

pub(crate) fn write_u32(out: &mut dyn Write, value: u32) -> StateResult<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u32(input: &mut dyn Read) -> StateResult<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Write a collection length, refusing lengths the format cannot represent.
pub(crate) fn write_len(out: &mut dyn Write, len: usize) -> StateResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| StateError::Malformed(format!("collection too large to persist: {len}")))?;
    write_u32(out, len)
}

pub(crate) fn write_str(out: &mut dyn Write, s: &str) -> StateResult<()> {
    write_len(out, s.len())?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

pub(crate) fn read_str(input: &mut dyn Read) -> StateResult<String> {
    let len = read_u32(input)? as u64;
    let mut buf = Vec::new();
    input.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(StateError::Malformed(
            "unexpected end of data in string".to_string(),
        ));
    }
    String::from_utf8(buf)
        .map_err(|_| StateError::Malformed("invalid UTF-8 in string".to_string()))
}

/// Consume a string without materialising it.
pub(crate) fn skip_str(input: &mut dyn Read) -> StateResult<()> {
    let len = read_u32(input)? as u64;
    let skipped = std::io::copy(&mut input.take(len), &mut std::io::sink())?;
    if skipped != len {
        return Err(StateError::Malformed(
            "unexpected end of data in string".to_string(),
        ));
    }
    Ok(())
}
