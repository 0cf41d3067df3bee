use crate::error::{Error, Result};
use crate::source::{DataSource, Split, MNIST_TEST_LEN, MNIST_TRAIN_LEN};
use crate::verify::{quick_check, QuickCheck};
use crate::writer::{write_split, WriteOptions, WriteReport};
use serde::Serialize;
use std::path::PathBuf;

/// Number of samples each split must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedSizes {
    pub train: usize,
    pub test: usize,
}

impl ExpectedSizes {
    pub const MNIST: ExpectedSizes = ExpectedSizes {
        train: MNIST_TRAIN_LEN as usize,
        test: MNIST_TEST_LEN as usize,
    };

    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train,
            Split::Test => self.test,
        }
    }
}

impl Default for ExpectedSizes {
    fn default() -> Self {
        ExpectedSizes::MNIST
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub out_dir: PathBuf,
    pub expected: ExpectedSizes,
    /// Read the first record of every written file back.
    pub quick_check: bool,
    pub write: WriteOptions,
}

impl ConvertConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> ConvertConfig {
        ConvertConfig {
            out_dir: out_dir.into(),
            expected: ExpectedSizes::default(),
            quick_check: true,
            write: WriteOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    #[serde(flatten)]
    pub report: WriteReport,
    pub check: Option<QuickCheck>,
}

/// Write `train.rec` then `test.rec` into `cfg.out_dir`.
///
/// Both split sizes are checked against `cfg.expected` before anything is
/// written. Any error stops the run; files already written are kept.
pub fn convert(source: &dyn DataSource, cfg: &ConvertConfig) -> Result<Vec<SplitOutcome>> {
    let mut splits = Vec::with_capacity(Split::ALL.len());
    for split in Split::ALL {
        let samples = source.get_split(split)?;
        tracing::info!("[load] {split} samples: {}", samples.len);
        let expected = cfg.expected.get(split);
        if samples.len != expected {
            return Err(Error::SplitSize {
                split: split.name().to_string(),
                expected,
                actual: samples.len,
            });
        }
        splits.push((split, samples));
    }

    let mut outcomes = Vec::with_capacity(splits.len());
    for (split, samples) in splits {
        let path = cfg.out_dir.join(split.file_name());
        let report = write_split(split.name(), samples.samples, &path, &cfg.write)?;
        // The source must yield as many samples as it announced.
        if report.records != samples.len {
            return Err(Error::SplitSize {
                split: split.name().to_string(),
                expected: samples.len,
                actual: report.records,
            });
        }
        outcomes.push(SplitOutcome {
            report,
            check: None,
        });
    }

    if cfg.quick_check {
        for outcome in &mut outcomes {
            outcome.check = Some(quick_check(&outcome.report.path)?);
        }
    }

    Ok(outcomes)
}
