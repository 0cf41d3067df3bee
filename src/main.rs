use mnist_rec::convert::{convert, ConvertConfig};
use mnist_rec::reader::RecFile;
use mnist_rec::source::MnistSource;
use mnist_rec::writer::WriteOptions;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write train.rec and test.rec into an output directory
    Convert {
        /// Output directory
        #[arg(long, env = "MNIST_REC_OUT")]
        out: PathBuf,
        /// Directory holding the four MNIST ubyte files
        #[arg(long, env = "MNIST_DATA_DIR", default_value = "data/")]
        data_dir: PathBuf,
        /// Skip reading the first record of each file back
        #[arg(long)]
        no_check: bool,
        /// Write through a temporary file renamed into place
        #[arg(long)]
        atomic: bool,
        #[arg(long)]
        no_progress: bool,
        /// Print the write reports as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Load a .rec file and print its first records
    Inspect {
        path: PathBuf,
        #[arg(long, default_value_t = 3)]
        records: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mnist_rec=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            out,
            data_dir,
            no_check,
            atomic,
            no_progress,
            json,
        } => {
            let mut cfg = ConvertConfig::new(out);
            cfg.quick_check = !no_check;
            cfg.write = WriteOptions {
                progress: !no_progress,
                atomic,
            };
            if let Err(e) = run_convert(&data_dir, &cfg, json) {
                eprintln!("Error during conversion: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Inspect { path, records } => {
            if let Err(e) = run_inspect(&path, records) {
                eprintln!("Error inspecting {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }
}

fn run_convert(
    data_dir: &Path,
    cfg: &ConvertConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("[init] Output directory: {}", resolved(&cfg.out_dir).display());

    let source = MnistSource::load(data_dir)?;
    let outcomes = convert(&source, cfg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            println!("{}", outcome.report);
        }
    }
    println!(
        "[done] Successfully saved binary files to {}",
        resolved(&cfg.out_dir).display()
    );
    Ok(())
}

fn run_inspect(path: &Path, records: usize) -> Result<(), Box<dyn std::error::Error>> {
    let file = RecFile::load(path)?;
    println!("[load] {}", path.display());
    println!("  N={} samples", file.len());

    for i in 0..records.min(file.len()) {
        let Some(sample) = file.sample(i) else { break };
        let lit = sample.pixels.iter().filter(|&&p| p > 0).count();
        let mean =
            sample.pixels.iter().map(|&p| p as f32).sum::<f32>() / sample.pixels.len() as f32;
        println!(
            "  record {i}: label={} lit_pixels={lit} mean={mean:.2}",
            sample.label
        );
    }
    Ok(())
}

fn resolved(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}
