pub mod codec;
pub mod convert;
pub mod error;
pub mod idx;
pub mod reader;
pub mod source;
pub mod verify;
pub mod writer;

pub use codec::{decode, encode, Sample, IMG_H, IMG_SIZE, IMG_W, MAX_LABEL, REC_LEN};
pub use error::{Error, Result, ValidationError};
