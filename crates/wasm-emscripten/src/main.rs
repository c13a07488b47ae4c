use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wasm_emscripten::{finalize, FinalizeOptions};

/// wasm-emscripten-finalize: prepare a linked WebAssembly module for the
/// Emscripten JavaScript runtime and print its metadata record.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input WebAssembly binary (.wasm)
    input: PathBuf,

    /// Write the metadata record to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Bytes of static data reserved above the data segments
    #[arg(long, default_value_t = 0)]
    static_bump: u32,

    /// Function to run before `main` (repeatable, kept in order)
    #[arg(long = "initializer")]
    initializers: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(input = %cli.input.display(), "finalizing");

    let wasm_bytes =
        fs::read(&cli.input).with_context(|| format!("failed to read {}", cli.input.display()))?;

    let options = FinalizeOptions {
        static_bump: cli.static_bump,
        initializers: cli.initializers,
        ..Default::default()
    };

    let finalized = finalize(&wasm_bytes, &options).context("finalization failed")?;

    if let Some(output_path) = cli.output {
        fs::write(&output_path, &finalized.metadata)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        info!(output = %output_path.display(), "wrote metadata");
    } else {
        print!("{}", finalized.metadata);
    }

    Ok(())
}
