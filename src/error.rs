use std::path::PathBuf;

/// A sample that cannot be encoded into a record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("label out of range: {label} (expected 0..={max})")]
    LabelOutOfRange { label: i64, max: u8 },

    #[error("unexpected image shape: {actual:?} (expected {expected:?})")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// Main library error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("split `{split}`, sample {index}: {source}")]
    Validation {
        split: String,
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("split `{split}`: size mismatch for {path:?}: {actual} vs {expected} bytes")]
    Integrity {
        split: String,
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("quick check: {path:?} is too small, read {actual} of {expected} bytes")]
    TruncatedFile {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("split `{split}`: data source reports {actual} samples, expected {expected}")]
    SplitSize {
        split: String,
        expected: usize,
        actual: usize,
    },

    #[error("{path:?}: size {size} is not a multiple of the record length ({record_len})")]
    MisalignedFile {
        path: PathBuf,
        size: u64,
        record_len: usize,
    },

    #[error("dataset file missing: {path:?}")]
    MissingDataset { path: PathBuf },

    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
