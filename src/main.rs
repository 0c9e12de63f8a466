//! Command-line wrapper around the feature-extraction engine.
//!
//! Reads a raw little-endian signed 16-bit mono PCM file, evaluates the
//! requested feature recipes over it and writes each feature's buffers to
//! `<output>/<name>.bin` as 32-bit floats. Recipes come from repeated
//! `--feature` flags, a TOML configuration file, or both. On failure a
//! single `category: message` line goes to stderr and the exit code is
//! non-zero.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;

use sfe::{EngineConfig, SfeError, TransformTree};

#[derive(Parser)]
#[command(name = "sfe", about = "Extracts sound features from raw PCM audio.")]
struct Cli {
    /// Raw 16-bit little-endian mono PCM input file.
    input: PathBuf,

    /// Sampling rate of the input in Hz.
    #[arg(long, default_value_t = 16000)]
    rate: u32,

    /// Feature recipe, e.g. "Energy[Window(type=rectangular),Energy]".
    /// May be repeated.
    #[arg(long = "feature")]
    features: Vec<String>,

    /// TOML configuration file with a `features` list and an optional
    /// `[engine]` table.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write the extracted feature buffers into.
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Write a DOT graph of the transform tree to this path.
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the per-transform execution time report.
    #[arg(long)]
    time_report: bool,

    /// Validate every transform's output buffers.
    #[arg(long)]
    validate: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    sampling_rate: Option<u32>,
    features: Vec<String>,
    engine: EngineConfig,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<SfeError>() {
                Some(sfe) => eprintln!("{}: {}", sfe.category(), sfe),
                None => eprintln!("Error: {error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file_config: FileConfig = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => FileConfig::default(),
    };

    let mut recipes = file_config.features;
    recipes.extend(cli.features.iter().cloned());
    if recipes.is_empty() {
        anyhow::bail!("no features requested; pass --feature or a --config file");
    }

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    if bytes.len() % 2 != 0 {
        anyhow::bail!("input holds {} bytes, not a whole number of samples", bytes.len());
    }
    let waveform: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let rate = file_config.sampling_rate.unwrap_or(cli.rate);

    let mut engine_config = file_config.engine;
    engine_config.validate_output |= cli.validate;
    let mut engine = TransformTree::with_config(waveform.len(), rate, engine_config)?;
    for recipe in &recipes {
        engine.add_feature_from_text(recipe)?;
    }
    engine.prepare_for_execution()?;
    info!(
        "prepared {} features over {} samples at {} Hz",
        engine.features().len(),
        waveform.len(),
        rate
    );

    let results = engine.execute(&waveform)?;

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    for (name, buffers) in &results {
        let path = cli.output.join(format!("{name}.bin"));
        let mut file = fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for i in 0..buffers.count() {
            for value in buffers.values(i) {
                file.write_all(&value.to_le_bytes())?;
            }
        }
        println!(
            "{name}: {} buffers of {} values -> {}",
            buffers.count(),
            buffers.values(0).len(),
            path.display()
        );
    }

    if cli.time_report {
        let report = engine.time_report();
        if let Some(total) = report.get("Total") {
            println!("Total: {:.3} ms", total / 1e6);
        }
        let mut shares: Vec<_> = report
            .iter()
            .filter(|(class, _)| class.as_str() != "Total")
            .collect();
        shares.sort_by(|a, b| b.1.total_cmp(a.1));
        for (class, share) in shares {
            println!("{:>7.2}% {}", share * 100.0, class);
        }
    }

    if let Some(dot) = &cli.dot {
        engine.dump_dot(dot)?;
        info!("wrote transform graph to {}", dot.display());
    }
    Ok(())
}
