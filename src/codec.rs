use crate::error::ValidationError;
use ndarray::prelude::*;

pub const IMG_H: usize = 28;
pub const IMG_W: usize = 28;
pub const IMG_SIZE: usize = IMG_H * IMG_W; // 784
/// Label (1 byte) + Image (28 * 28 bytes)
pub const REC_LEN: usize = 1 + IMG_SIZE; // 785
/// Ten digit classes.
pub const MAX_LABEL: u8 = 9;

/// One labeled image as handed over by a data source.
///
/// The label is kept wide so that out-of-range values coming from a source
/// surface as validation errors instead of being wrapped by a cast.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label: i64,
    pub pixels: Array2<u8>, // (h, w)
}

impl Sample {
    pub fn new(label: i64, pixels: Array2<u8>) -> Sample {
        Sample { label, pixels }
    }

    /// Build a sample from wider intensity values, keeping only the low 8 bits
    /// of each cell. Intensities are not re-ranged.
    pub fn from_wide(label: i64, pixels: &Array2<i32>) -> Sample {
        Sample {
            label,
            pixels: pixels.mapv(|p| p as u8),
        }
    }

    pub fn encode(&self) -> Result<[u8; REC_LEN], ValidationError> {
        encode(self.label, self.pixels.view())
    }
}

/// Encode one (label, image) pair into a fixed-length record.
///
/// Byte 0 is the label, bytes 1..=784 the image in row-major order. The logical
/// row-major order is used regardless of the memory layout of `pixels`.
pub fn encode(label: i64, pixels: ArrayView2<u8>) -> Result<[u8; REC_LEN], ValidationError> {
    let mut record = [0u8; REC_LEN];
    encode_into(label, pixels, &mut record)?;
    Ok(record)
}

/// Same as [`encode`], writing into a caller-owned buffer.
/// `out` is left untouched when validation fails.
pub fn encode_into(
    label: i64,
    pixels: ArrayView2<u8>,
    out: &mut [u8; REC_LEN],
) -> Result<(), ValidationError> {
    let label = validate_label(label)?;
    if pixels.dim() != (IMG_H, IMG_W) {
        return Err(ValidationError::ShapeMismatch {
            expected: (IMG_H, IMG_W),
            actual: pixels.dim(),
        });
    }

    out[0] = label;
    for (dst, &p) in out[1..].iter_mut().zip(pixels.iter()) {
        *dst = p;
    }
    Ok(())
}

fn validate_label(label: i64) -> Result<u8, ValidationError> {
    if (0..=MAX_LABEL as i64).contains(&label) {
        Ok(label as u8)
    } else {
        Err(ValidationError::LabelOutOfRange {
            label,
            max: MAX_LABEL,
        })
    }
}

/// Decode one record back into a sample.
pub fn decode(record: &[u8; REC_LEN]) -> Sample {
    let pixels = Array2::from_shape_fn((IMG_H, IMG_W), |(r, c)| record[1 + r * IMG_W + c]);
    Sample {
        label: record[0] as i64,
        pixels,
    }
}
