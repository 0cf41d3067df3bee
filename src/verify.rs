use crate::codec::REC_LEN;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Outcome of [`quick_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickCheck {
    pub label: u8,
    pub pixel_bytes: usize,
}

/// Read the first record of a split file back.
///
/// Only a "did this get written at all" probe: nothing past the first record
/// is looked at.
pub fn quick_check(path: &Path) -> Result<QuickCheck> {
    let file = File::open(path).map_err(Error::io(path))?;
    let mut buf = Vec::with_capacity(REC_LEN);
    file.take(REC_LEN as u64)
        .read_to_end(&mut buf)
        .map_err(Error::io(path))?;

    if buf.len() != REC_LEN {
        return Err(Error::TruncatedFile {
            path: path.to_path_buf(),
            expected: REC_LEN,
            actual: buf.len(),
        });
    }

    let check = QuickCheck {
        label: buf[0],
        pixel_bytes: buf[1..].len(),
    };
    tracing::info!(
        "[check] first label={}, first image bytes={}",
        check.label,
        check.pixel_bytes
    );
    Ok(check)
}
