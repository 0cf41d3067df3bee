use crate::codec::{self, Sample, REC_LEN};
use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Every how many records a progress line is logged.
const LOG_EVERY: usize = 5000;

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Draw a progress bar on stderr.
    pub progress: bool,
    /// Write to `<out>.tmp` and rename it over `<out>` once the size check passed.
    pub atomic: bool,
}

/// What `write_split` produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub split: String,
    pub path: PathBuf,
    pub records: usize,
    pub record_len: usize,
    pub total_bytes: u64,
}

impl fmt::Display for WriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} recs, {} B/rec, total {:.2} MB",
            display_name(&self.path),
            self.records,
            self.record_len,
            self.total_bytes as f64 / 1024.0 / 1024.0
        )
    }
}

/// Write one split as back-to-back records to `out_path`.
///
/// Samples are written in the order they come. The first sample that fails
/// validation aborts the write; whatever was written so far stays on disk.
/// Once the file is closed its size must be exactly `records * REC_LEN`.
pub fn write_split<I>(
    split: &str,
    samples: I,
    out_path: &Path,
    opts: &WriteOptions,
) -> Result<WriteReport>
where
    I: IntoIterator<Item = Result<Sample>>,
{
    let samples = samples.into_iter();

    let Some(file_name) = out_path.file_name() else {
        return Err(Error::Io {
            path: out_path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"),
        });
    };

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tracing::info!("[prep] Creating directory: {}", parent.display());
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }

    let write_path = if opts.atomic {
        tmp_path(out_path, file_name)
    } else {
        out_path.to_path_buf()
    };

    let pb = progress_bar(split, &write_path, samples.size_hint(), opts.progress);
    tracing::info!(
        "[write] Starting to write {} records to {}",
        samples.size_hint().0,
        display_name(out_path)
    );

    let written = write_records(split, samples, &write_path, &pb);
    match written {
        Ok(_) => pb.finish(),
        Err(_) => pb.abandon(),
    }
    let records = written?;

    let expected = records as u64 * REC_LEN as u64;
    let actual = fs::metadata(&write_path)
        .map_err(Error::io(&write_path))?
        .len();
    if actual != expected {
        return Err(Error::Integrity {
            split: split.to_string(),
            path: write_path,
            expected,
            actual,
        });
    }

    if opts.atomic {
        fs::rename(&write_path, out_path).map_err(Error::io(out_path))?;
    }

    let report = WriteReport {
        split: split.to_string(),
        path: out_path.to_path_buf(),
        records,
        record_len: REC_LEN,
        total_bytes: actual,
    };
    tracing::info!("[write] {report}");
    Ok(report)
}

/// Encode and write every sample, returning how many records were written.
/// The file is closed before this returns, on every path.
fn write_records<I>(split: &str, samples: I, path: &Path, pb: &ProgressBar) -> Result<usize>
where
    I: Iterator<Item = Result<Sample>>,
{
    let file = File::create(path).map_err(Error::io(path))?;
    let mut w = BufWriter::new(file);
    let mut record = [0u8; REC_LEN];
    let mut count = 0;

    for (index, sample) in samples.enumerate() {
        let sample = sample?;
        codec::encode_into(sample.label, sample.pixels.view(), &mut record).map_err(
            |source| Error::Validation {
                split: split.to_string(),
                index,
                source,
            },
        )?;
        w.write_all(&record).map_err(Error::io(path))?;

        count += 1;
        pb.inc(1);
        if count % LOG_EVERY == 0 {
            tracing::debug!("[write] {split}: wrote {count} records");
        }
    }

    let file = w.into_inner().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(Error::io(path))?;
    tracing::debug!("[write] {split}: wrote {count} records, done");
    Ok(count)
}

fn progress_bar(
    split: &str,
    path: &Path,
    size_hint: (usize, Option<usize>),
    enabled: bool,
) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = match size_hint {
        (lower, Some(upper)) if lower == upper => ProgressBar::new(upper as u64),
        _ => ProgressBar::no_length(),
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("Writing {split} ({})", display_name(path)));
    pb
}

fn tmp_path(out_path: &Path, file_name: &OsStr) -> PathBuf {
    let mut name = file_name.to_os_string();
    name.push(".tmp");
    out_path.with_file_name(name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
