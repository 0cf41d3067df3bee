use crate::codec::{Sample, IMG_H, IMG_SIZE, IMG_W, REC_LEN};
use crate::error::{Error, Result};
use ndarray::prelude::*;
use std::fs;
use std::path::Path;

/// A split file loaded fully into memory.
#[derive(Debug, Clone)]
pub struct RecFile {
    labels: Vec<u8>,    // [N]
    images: Array3<u8>, // (N, h, w)
}

impl RecFile {
    /// Load and decode every record of `path`.
    /// The file size has to be a whole number of records.
    pub fn load(path: &Path) -> Result<RecFile> {
        let bytes = fs::read(path).map_err(Error::io(path))?;
        if bytes.len() % REC_LEN != 0 {
            return Err(Error::MisalignedFile {
                path: path.to_path_buf(),
                size: bytes.len() as u64,
                record_len: REC_LEN,
            });
        }

        let n = bytes.len() / REC_LEN;
        let mut labels = Vec::with_capacity(n);
        let mut images = Vec::with_capacity(n * IMG_SIZE);
        for record in bytes.chunks_exact(REC_LEN) {
            labels.push(record[0]);
            images.extend_from_slice(&record[1..]);
        }
        let images = Array3::from_shape_vec((n, IMG_H, IMG_W), images)?;
        tracing::debug!("[load] {}: {n} records", path.display());

        Ok(RecFile { labels, images })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn images(&self) -> ArrayView3<'_, u8> {
        self.images.view()
    }

    pub fn sample(&self, index: usize) -> Option<Sample> {
        let label = *self.labels.get(index)?;
        let pixels = self.images.index_axis(Axis(0), index).to_owned();
        Some(Sample::new(label as i64, pixels))
    }

    /// Iterate over the records in file order, `batch_size` at a time.
    ///
    /// Images come out flattened to `(batch, 784)` and scaled to `[0, 1]`.
    /// The last batch is shorter unless `drop_last` is set, in which case it is skipped.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn batches(&self, batch_size: usize, drop_last: bool) -> Batches<'_> {
        assert!(batch_size > 0, "batch_size must be positive");
        Batches {
            file: self,
            batch_size,
            drop_last,
            cursor: 0,
        }
    }
}

pub struct Batches<'a> {
    file: &'a RecFile,
    batch_size: usize,
    drop_last: bool,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = (Array2<f32>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.file.len();
        if self.cursor >= n {
            return None;
        }

        let remain = n - self.cursor;
        let b = if remain < self.batch_size {
            if self.drop_last {
                return None;
            }
            remain
        } else {
            self.batch_size
        };

        let start = self.cursor;
        let images = &self.file.images;
        let x = Array2::from_shape_fn((b, IMG_SIZE), |(i, k)| {
            images[[start + i, k / IMG_W, k % IMG_W]] as f32 / 255.0
        });
        let y = self.file.labels[start..start + b].to_vec();

        self.cursor += b;
        Some((x, y))
    }
}
