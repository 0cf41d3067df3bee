use crate::codec::{Sample, IMG_H, IMG_SIZE, IMG_W};
use crate::error::{Error, Result};
use crate::idx::{IdxHeader, IdxKind};
use mnist::MnistBuilder;
use ndarray::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// File name of the split inside the output directory, e.g. `train.rec`.
    pub fn file_name(self) -> String {
        format!("{}.rec", self.name())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The samples of one split, in the order the source produces them.
pub struct SplitSamples<'a> {
    /// Number of samples the source reports for this split.
    pub len: usize,
    pub samples: Box<dyn Iterator<Item = Result<Sample>> + 'a>,
}

/// Where the samples come from. Download and caching are the source's business.
pub trait DataSource {
    fn get_split(&self, split: Split) -> Result<SplitSamples<'_>>;
}

/// Fixture source holding every split in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    splits: HashMap<Split, Vec<Sample>>,
}

impl InMemorySource {
    pub fn new() -> InMemorySource {
        InMemorySource::default()
    }

    pub fn with_split(mut self, split: Split, samples: Vec<Sample>) -> InMemorySource {
        self.splits.insert(split, samples);
        self
    }
}

impl DataSource for InMemorySource {
    fn get_split(&self, split: Split) -> Result<SplitSamples<'_>> {
        let samples: &[Sample] = self.splits.get(&split).map(Vec::as_slice).unwrap_or(&[]);
        Ok(SplitSamples {
            len: samples.len(),
            samples: Box::new(samples.iter().cloned().map(Ok::<Sample, Error>)),
        })
    }
}

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

pub const MNIST_TRAIN_LEN: u32 = 60_000;
pub const MNIST_TEST_LEN: u32 = 10_000;

/// MNIST read from the four IDX files of a local directory.
///
/// This uses the ubyte files in `data_dir`, the same layout the `mnist` crate
/// expects. Fetching them is left to the user.
pub struct MnistSource {
    trn_img: Vec<u8>, // 60,000 * 784 bytes (28x28 images flattened)
    trn_lbl: Vec<u8>, // 60,000 labels
    tst_img: Vec<u8>, // 10,000 * 784 bytes
    tst_lbl: Vec<u8>, // 10,000 labels
}

impl MnistSource {
    /// Validate the IDX headers in `data_dir`, then load all four files.
    ///
    /// The split sizes come from the file headers, so a short split surfaces
    /// as a size mismatch in `convert` rather than inside the loader.
    pub fn load(data_dir: &Path) -> Result<MnistSource> {
        for file in [TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS] {
            let path = data_dir.join(file);
            if !path.is_file() {
                return Err(Error::MissingDataset { path });
            }
        }
        let trn = split_headers(data_dir, Split::Train, TRAIN_IMAGES, TRAIN_LABELS)?;
        let tst = split_headers(data_dir, Split::Test, TEST_IMAGES, TEST_LABELS)?;

        tracing::info!("[load] Loading MNIST from {}", data_dir.display());
        if (trn.0.count, tst.0.count) != (MNIST_TRAIN_LEN, MNIST_TEST_LEN) {
            // The mnist crate only accepts the canonical split sizes.
            tracing::warn!(
                "[load] train/test sizes {}/{} are non-standard, reading IDX bodies directly",
                trn.0.count,
                tst.0.count
            );
            return MnistSource::from_raw(
                trn.0.read_body(&data_dir.join(TRAIN_IMAGES))?,
                trn.1.read_body(&data_dir.join(TRAIN_LABELS))?,
                tst.0.read_body(&data_dir.join(TEST_IMAGES))?,
                tst.1.read_body(&data_dir.join(TEST_LABELS))?,
            );
        }

        let base_path = data_dir.to_str().ok_or_else(|| {
            Error::MalformedDataset(format!("data directory {data_dir:?} is not valid UTF-8"))
        })?;
        let mnist = MnistBuilder::new()
            .label_format_digit()
            .base_path(base_path)
            .training_set_length(MNIST_TRAIN_LEN)
            .validation_set_length(0)
            .test_set_length(MNIST_TEST_LEN)
            .finalize();

        MnistSource::from_raw(mnist.trn_img, mnist.trn_lbl, mnist.tst_img, mnist.tst_lbl)
    }

    /// Build a source from already flattened images and labels.
    pub fn from_raw(
        trn_img: Vec<u8>,
        trn_lbl: Vec<u8>,
        tst_img: Vec<u8>,
        tst_lbl: Vec<u8>,
    ) -> Result<MnistSource> {
        for (split, img, lbl) in [
            (Split::Train, &trn_img, &trn_lbl),
            (Split::Test, &tst_img, &tst_lbl),
        ] {
            if img.len() != lbl.len() * IMG_SIZE {
                return Err(Error::MalformedDataset(format!(
                    "split `{split}`: {} image bytes for {} labels",
                    img.len(),
                    lbl.len()
                )));
            }
        }
        Ok(MnistSource {
            trn_img,
            trn_lbl,
            tst_img,
            tst_lbl,
        })
    }

    fn split_data(&self, split: Split) -> (&[u8], &[u8]) {
        match split {
            Split::Train => (&self.trn_img, &self.trn_lbl),
            Split::Test => (&self.tst_img, &self.tst_lbl),
        }
    }
}

/// Image and label headers of one split; both must announce the same count.
fn split_headers(
    data_dir: &Path,
    split: Split,
    images: &str,
    labels: &str,
) -> Result<(IdxHeader, IdxHeader)> {
    let img = IdxHeader::read(&data_dir.join(images), IdxKind::Images)?;
    let lbl = IdxHeader::read(&data_dir.join(labels), IdxKind::Labels)?;
    if img.count != lbl.count {
        return Err(Error::MalformedDataset(format!(
            "split `{split}`: {} images but {} labels",
            img.count, lbl.count
        )));
    }
    Ok((img, lbl))
}

impl DataSource for MnistSource {
    fn get_split(&self, split: Split) -> Result<SplitSamples<'_>> {
        let (images, labels) = self.split_data(split);
        let samples = labels
            .iter()
            .zip(images.chunks_exact(IMG_SIZE))
            .map(|(&label, pixels)| -> Result<Sample> {
                let pixels = ArrayView2::from_shape((IMG_H, IMG_W), pixels)?;
                Ok(Sample::new(label as i64, pixels.to_owned()))
            });
        Ok(SplitSamples {
            len: labels.len(),
            samples: Box::new(samples),
        })
    }
}

