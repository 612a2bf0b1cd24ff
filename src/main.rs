//! raster-cache - command-line front end.
//!
//! Probes, thumbnails and re-encodes images, and can walk a batch of files
//! through the bounded cache to report its statistics.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raster_cache::{
    config::{BatchConfig, Cli, Command, CompressConfig, ProbeConfig, ThumbnailConfig},
    FsStorage, ImageDecoder, ImageEncoder, ImageSource, ImageStore, OutputFormat, PixelFormat,
    SampleFactor, Storage,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Probe(config) => run_probe(config),
        Command::Thumbnail(config) => run_thumbnail(config),
        Command::Compress(config) => run_compress(config),
        Command::Batch(config) => run_batch(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "raster_cache=debug"
    } else {
        "raster_cache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Probe Command
// =============================================================================

fn run_probe(config: ProbeConfig) -> ExitCode {
    let decoder = ImageDecoder::new();
    let source = ImageSource::path(&config.input);

    let dimensions = match decoder.probe(&source) {
        Ok(dimensions) => dimensions,
        Err(e) => {
            error!("Failed to probe {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let json = serde_json::json!({
            "path": config.input.display().to_string(),
            "width": dimensions.width,
            "height": dimensions.height,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}: {}", config.input.display(), dimensions);
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Thumbnail Command
// =============================================================================

fn run_thumbnail(config: ThumbnailConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let format = match config.format {
        Some(format) => format,
        None => match OutputFormat::from_path(&config.output) {
            Ok(format) => format,
            Err(e) => {
                error!("Cannot infer output format: {} (use --format)", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let decoder = ImageDecoder::new().with_max_decode_bytes(config.decode.max_decode_bytes);
    let source = ImageSource::path(&config.input);

    let thumb = match decoder.thumbnail(
        &source,
        config.decode.max_width,
        config.decode.max_height,
        config.decode.pixel_format,
    ) {
        Ok(thumb) => thumb,
        Err(e) => {
            error!("Failed to decode {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Decoded {} as {} ({} KiB in memory)",
        thumb.dimensions(),
        thumb.format(),
        thumb.byte_size() / 1024
    );

    let encoder = ImageEncoder::new();
    match encoder.save_to_path(&thumb, format, config.quality, &FsStorage, &config.output) {
        Ok(written) => {
            info!("Wrote {} bytes to {}", written, config.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to save {}: {}", config.output.display(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Compress Command
// =============================================================================

fn run_compress(config: CompressConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let decoder = ImageDecoder::new();
    let source = ImageSource::path(&config.input);

    let buffer = match decoder.decode(&source, SampleFactor::ONE, PixelFormat::FullColorWithAlpha) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("Failed to decode {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let encoder = ImageEncoder::new();
    let compressed = match encoder.compress(&buffer, config.format, config.quality) {
        Ok(compressed) => compressed,
        Err(e) => {
            error!("Failed to encode: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} {} -> {} bytes ({} at quality {})",
        config.input.display(),
        compressed.dimensions,
        compressed.data.len(),
        compressed.format,
        config.quality
    );

    if let Some(ref output) = config.output {
        if let Err(e) = FsStorage.write_bytes(output, &compressed.data) {
            error!("Failed to write {}: {}", output.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote {}", output.display());
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Batch Command
// =============================================================================

fn run_batch(config: BatchConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut store = ImageStore::from_config(&config.store_config());
    let mut failures = 0usize;

    for pass in 1..=config.passes {
        info!("Pass {}/{}", pass, config.passes);

        for input in &config.inputs {
            let key = input.display().to_string();
            let source = ImageSource::path(input);

            match store.load(&key, &source, config.decode.max_width, config.decode.max_height) {
                Ok(Some(buffer)) => info!("  {} -> {}", key, buffer.dimensions()),
                Ok(None) => warn!("  {} is larger than the cache, not retained", key),
                Err(e) => {
                    failures += 1;
                    error!("  {}: {}", key, e);
                }
            }
        }
    }

    match serde_json::to_string_pretty(&store.stats()) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to serialize cache stats: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
