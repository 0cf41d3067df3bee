use mnist_rec::codec::{Sample, IMG_H, IMG_W, REC_LEN};
use mnist_rec::writer::{write_split, WriteOptions, WriteReport};
use mnist_rec::{Error, ValidationError};
use ndarray::prelude::*;
use rand::{distributions::Uniform, thread_rng, Rng};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn ok_samples(samples: &[Sample]) -> impl Iterator<Item = mnist_rec::Result<Sample>> + '_ {
    samples.iter().cloned().map(Ok::<_, Error>)
}

fn write_default(split: &str, samples: &[Sample], path: &Path) -> mnist_rec::Result<WriteReport> {
    write_split(split, ok_samples(samples), path, &WriteOptions::default())
}

fn three_samples() -> Vec<Sample> {
    vec![
        Sample::new(0, Array2::zeros((IMG_H, IMG_W))),
        Sample::new(9, Array2::from_elem((IMG_H, IMG_W), 255)),
        Sample::new(
            5,
            Array2::from_shape_fn((IMG_H, IMG_W), |(r, c)| ((r * IMG_W + c) % 256) as u8),
        ),
    ]
}

fn random_samples(n: usize) -> Vec<Sample> {
    let mut rng = thread_rng();
    let pixels = Uniform::new_inclusive(0u8, 255u8);
    let labels = Uniform::new_inclusive(0i64, 9i64);
    (0..n)
        .map(|_| {
            let grid = Array2::from_shape_simple_fn((IMG_H, IMG_W), || rng.sample(pixels));
            Sample::new(rng.sample(labels), grid)
        })
        .collect()
}

#[test]
fn three_sample_split_layout() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let samples = three_samples();

    let report = write_default("train", &samples, &path)?;

    assert_eq!(report.split, "train");
    assert_eq!(report.records, 3);
    assert_eq!(report.record_len, 785);
    assert_eq!(report.total_bytes, 2355);

    let bytes = fs::read(&path)?;
    assert_eq!(bytes.len(), 2355);
    assert_eq!(bytes[0], 0);
    assert_eq!(bytes[785], 9);
    assert_eq!(bytes[1570], 5);
    assert!(bytes[1..785].iter().all(|&p| p == 0));
    assert!(bytes[786..1570].iter().all(|&p| p == 255));
    for k in 0..784 {
        assert_eq!(bytes[1571 + k], (k % 256) as u8);
    }
    Ok(())
}

#[test]
fn empty_split_gives_empty_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("test.rec");

    let report = write_default("test", &[], &path)?;

    assert_eq!(report.records, 0);
    assert_eq!(report.total_bytes, 0);
    assert_eq!(fs::metadata(&path)?.len(), 0);
    Ok(())
}

#[test]
fn every_record_decodes_back_to_its_sample() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let samples = random_samples(50);

    write_default("train", &samples, &path)?;

    let bytes = fs::read(&path)?;
    assert_eq!(bytes.len(), samples.len() * REC_LEN);
    for (i, sample) in samples.iter().enumerate() {
        let record = &bytes[i * REC_LEN..(i + 1) * REC_LEN];
        assert_eq!(record[0] as i64, sample.label);
        let grid = ArrayView2::from_shape((IMG_H, IMG_W), &record[1..])?;
        assert_eq!(grid, sample.pixels);
    }
    Ok(())
}

#[test]
fn rewriting_is_byte_identical() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let samples = random_samples(20);

    write_default("train", &samples, &path)?;
    let first = fs::read(&path)?;
    write_default("train", &samples, &path)?;
    let second = fs::read(&path)?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn existing_content_is_truncated() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    fs::write(&path, vec![42u8; 10 * REC_LEN])?;

    let samples = three_samples();
    write_default("train", &samples[..1], &path)?;

    assert_eq!(fs::metadata(&path)?.len(), REC_LEN as u64);
    Ok(())
}

#[test]
fn missing_parent_directories_are_created() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("a").join("b").join("train.rec");

    write_default("train", &three_samples(), &path)?;
    // A second run into the now existing directory is fine too.
    write_default("train", &three_samples(), &path)?;

    assert_eq!(fs::metadata(&path)?.len(), 3 * REC_LEN as u64);
    Ok(())
}

#[test]
fn bad_label_aborts_and_leaves_partial_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let mut samples = three_samples();
    samples[1].label = 10;

    let err = write_default("train", &samples, &path).unwrap_err();

    match err {
        Error::Validation {
            split,
            index,
            source,
        } => {
            assert_eq!(split, "train");
            assert_eq!(index, 1);
            assert_eq!(source, ValidationError::LabelOutOfRange { label: 10, max: 9 });
        }
        other => panic!("unexpected error: {other}"),
    }
    // Only the first record made it, and no partial record.
    assert_eq!(fs::metadata(&path)?.len(), REC_LEN as u64);
    Ok(())
}

#[test]
fn bad_shape_aborts_the_write() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("test.rec");
    let mut samples = three_samples();
    samples.insert(0, Sample::new(1, Array2::zeros((28, 27))));

    let err = write_default("test", &samples, &path).unwrap_err();

    assert!(matches!(
        err,
        Error::Validation {
            index: 0,
            source: ValidationError::ShapeMismatch { .. },
            ..
        }
    ));
    assert_eq!(fs::metadata(&path)?.len(), 0);
    Ok(())
}

#[test]
fn source_errors_propagate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let samples = three_samples();
    let failing = ok_samples(&samples[..2])
        .chain(std::iter::once(Err(Error::MalformedDataset("boom".into()))));

    let err = write_split("train", failing, &path, &WriteOptions::default()).unwrap_err();

    assert!(matches!(err, Error::MalformedDataset(_)));
    assert_eq!(fs::metadata(&path)?.len(), 2 * REC_LEN as u64);
    Ok(())
}

#[test]
fn atomic_write_renames_into_place() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let opts = WriteOptions {
        atomic: true,
        ..Default::default()
    };

    let report = write_split("train", ok_samples(&three_samples()), &path, &opts)?;

    assert_eq!(report.path, path);
    assert_eq!(fs::metadata(&path)?.len(), 2355);
    assert!(!dir.path().join("train.rec.tmp").exists());
    Ok(())
}

#[test]
fn failed_atomic_write_keeps_previous_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("train.rec");
    let opts = WriteOptions {
        atomic: true,
        ..Default::default()
    };
    write_split("train", ok_samples(&three_samples()), &path, &opts)?;
    let before = fs::read(&path)?;

    let mut samples = three_samples();
    samples[2].label = -1;
    assert!(write_split("train", ok_samples(&samples), &path, &opts).is_err());

    assert_eq!(fs::read(&path)?, before);
    // The partial temp file stays behind.
    assert_eq!(
        fs::metadata(dir.path().join("train.rec.tmp"))?.len(),
        2 * REC_LEN as u64
    );
    Ok(())
}

#[test]
fn report_display_matches_log_format() {
    let report = WriteReport {
        split: "train".into(),
        path: "out/train.rec".into(),
        records: 60_000,
        record_len: REC_LEN,
        total_bytes: 60_000 * REC_LEN as u64,
    };
    assert_eq!(
        report.to_string(),
        "train.rec: 60000 recs, 785 B/rec, total 44.92 MB"
    );
}

#[test]
fn output_path_without_file_name_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("sub").join("..");
    let opts = WriteOptions {
        atomic: true,
        ..Default::default()
    };

    let err = write_split("train", ok_samples(&three_samples()), &path, &opts).unwrap_err();

    match err {
        Error::Io { path: p, source } => {
            assert_eq!(p, path);
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing was created, neither the parent nor a stray temp file.
    assert!(!dir.path().join("sub").exists());
    assert!(!dir.path().join(".tmp").exists());
    Ok(())
}
