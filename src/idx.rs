use crate::codec::{IMG_H, IMG_SIZE, IMG_W};
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

pub const IMG_MAGIC: u32 = 2051;
pub const LBL_MAGIC: u32 = 2049;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdxKind {
    Images,
    Labels,
}

impl IdxKind {
    pub fn magic(self) -> u32 {
        match self {
            IdxKind::Images => IMG_MAGIC,
            IdxKind::Labels => LBL_MAGIC,
        }
    }

    /// magic + count, plus rows + cols for images
    pub fn header_len(self) -> u64 {
        match self {
            IdxKind::Images => 16,
            IdxKind::Labels => 8,
        }
    }

    pub fn item_len(self) -> u64 {
        match self {
            IdxKind::Images => IMG_SIZE as u64,
            IdxKind::Labels => 1,
        }
    }
}

/// Header of a validated IDX file: right magic, 28x28 images, and a body
/// holding exactly `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdxHeader {
    pub kind: IdxKind,
    pub count: u32,
}

impl IdxHeader {
    pub fn read(path: &Path, kind: IdxKind) -> Result<IdxHeader> {
        let mut file = File::open(path).map_err(Error::io(path))?;
        let file_len = file.metadata().map_err(Error::io(path))?.len();

        let magic = file
            .read_u32::<BigEndian>()
            .map_err(|e| header_error(path, e))?;
        if magic != kind.magic() {
            return Err(Error::MalformedDataset(format!(
                "{path:?}: expected magic number {} got {magic}",
                kind.magic()
            )));
        }
        let count = file
            .read_u32::<BigEndian>()
            .map_err(|e| header_error(path, e))?;

        if kind == IdxKind::Images {
            let rows = file
                .read_u32::<BigEndian>()
                .map_err(|e| header_error(path, e))?;
            let cols = file
                .read_u32::<BigEndian>()
                .map_err(|e| header_error(path, e))?;
            if (rows as usize, cols as usize) != (IMG_H, IMG_W) {
                return Err(Error::MalformedDataset(format!(
                    "{path:?}: expected {IMG_H}x{IMG_W} images got {rows}x{cols}"
                )));
            }
        }

        let header = IdxHeader { kind, count };
        let expected_len = kind.header_len() + header.body_len();
        if file_len != expected_len {
            return Err(Error::MalformedDataset(format!(
                "{path:?}: {count} items need {expected_len} bytes, file has {file_len}"
            )));
        }
        Ok(header)
    }

    pub fn body_len(&self) -> u64 {
        self.count as u64 * self.kind.item_len()
    }

    /// Read everything after the header.
    pub fn read_body(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path).map_err(Error::io(path))?;
        file.seek(SeekFrom::Start(self.kind.header_len()))
            .map_err(Error::io(path))?;
        let mut body = Vec::with_capacity(self.body_len() as usize);
        file.read_to_end(&mut body).map_err(Error::io(path))?;
        Ok(body)
    }
}

fn header_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::MalformedDataset(format!("{path:?}: file too short for an IDX header"))
    } else {
        Error::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}
