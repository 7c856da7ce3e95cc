//! Fixed-width little-endian primitives for the index persistence format.
//!
//! A truncated stream surfaces as [`Error::IndexCorrupted`]; any other
//! read/write failure propagates as [`Error::Io`].

use std::io::{Read, Write};

use crate::{Error, Result};

pub(crate) fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_exact<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::IndexCorrupted("truncated index stream".to_string())
        } else {
            Error::Io(e)
        }
    })?;
    Ok(buf)
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(read_exact::<R, 8>(r)?))
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    Ok(i32::from_le_bytes(read_exact::<R, 4>(r)?))
}

pub(crate) fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    Ok(f32::from_le_bytes(read_exact::<R, 4>(r)?))
}

/// Reads a `u64` that must fit in `usize` (counts, dimensions, layers).
pub(crate) fn read_len<R: Read>(r: &mut R, what: &str) -> Result<usize> {
    let v = read_u64(r)?;
    usize::try_from(v).map_err(|_| Error::IndexCorrupted(format!("{what} {v} overflows usize")))
}
