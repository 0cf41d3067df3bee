//! Runs the built binary end to end.

use mnist_rec::codec::{Sample, IMG_H, IMG_W};
use mnist_rec::writer::{write_split, WriteOptions};
use mnist_rec::Error;
use ndarray::Array2;
use std::process::Command;
use tempfile::tempdir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mnist_rec"))
}

#[test]
fn inspect_prints_record_count() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("test.rec");
    let samples = vec![
        Sample::new(6, Array2::from_elem((IMG_H, IMG_W), 1)),
        Sample::new(1, Array2::zeros((IMG_H, IMG_W))),
    ];
    let samples = samples.into_iter().map(Ok::<_, Error>);
    write_split("test", samples, &path, &WriteOptions::default())?;

    let output = bin().arg("inspect").arg(&path).output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("N=2 samples"), "stdout: {stdout}");
    assert!(stdout.contains("record 0: label=6"), "stdout: {stdout}");
    Ok(())
}

#[test]
fn inspect_fails_on_misaligned_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("bad.rec");
    std::fs::write(&path, [0u8; 10])?;

    let output = bin().arg("inspect").arg(&path).output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("not a multiple"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn convert_without_dataset_exits_non_zero() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("out");

    let output = bin()
        .args(["convert", "--no-progress", "--out"])
        .arg(&out)
        .arg("--data-dir")
        .arg(dir.path().join("missing"))
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("dataset file missing"), "stderr: {stderr}");
    assert!(!out.join("train.rec").exists());
    Ok(())
}

#[test]
fn convert_requires_an_output_directory() -> Result<(), Box<dyn std::error::Error>> {
    let output = bin().arg("convert").env_remove("MNIST_REC_OUT").output()?;
    assert!(!output.status.success());
    Ok(())
}
