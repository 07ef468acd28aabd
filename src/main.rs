//! wsi-deepzoom - Deep Zoom tiling for whole-slide images.
//!
//! This binary inspects slides and prints Deep Zoom metadata.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_deepzoom::{
    config::{Cli, Command, CoordsConfig, DziConfig, InfoConfig},
    parse_tile_path, DeepZoomGenerator, ImageSlide, SlideInfo, SlideSource,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.into_command() {
        Command::Info(config) => run_info(config),
        Command::Dzi(config) => run_dzi(config),
        Command::Coords(config) => run_coords(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_deepzoom=debug"
    } else {
        "wsi_deepzoom=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_generator(
    path: &std::path::Path,
    tile_size: u32,
    overlap: u32,
    limit_bounds: bool,
) -> Option<DeepZoomGenerator<ImageSlide>> {
    let slide = match ImageSlide::open(path) {
        Ok(slide) => slide,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            return None;
        }
    };
    match DeepZoomGenerator::new(slide, tile_size, overlap, limit_bounds) {
        Ok(dz) => Some(dz),
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = config.options;
    let Some(dz) = open_generator(
        &config.slide,
        options.tile_size,
        options.overlap,
        options.limit_bounds,
    ) else {
        return ExitCode::FAILURE;
    };

    let name = config.slide.display().to_string();
    let report = match SlideInfo::collect(name, &dz, config.color_mode) {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to read slide metadata: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report);
    }

    if let Some(ref path) = config.thumbnail {
        let size = (config.thumbnail_size, config.thumbnail_size);
        let saved = dz
            .source()
            .get_thumbnail(size)
            .map_err(|e| e.to_string())
            .and_then(|thumb| thumb.save(path).map_err(|e| e.to_string()));
        match saved {
            Ok(()) => info!("Wrote thumbnail to {}", path.display()),
            Err(e) => {
                error!("Failed to write thumbnail: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Dzi Command
// =============================================================================

fn run_dzi(config: DziConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = config.options;
    let Some(dz) = open_generator(
        &config.slide,
        options.tile_size,
        options.overlap,
        options.limit_bounds,
    ) else {
        return ExitCode::FAILURE;
    };

    println!("{}", dz.get_dzi(config.format.extension()));
    ExitCode::SUCCESS
}

// =============================================================================
// Coords Command
// =============================================================================

fn run_coords(config: CoordsConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(tile) = parse_tile_path(&config.tile) else {
        error!(
            "Malformed tile path '{}' (expected {{level}}/{{col}}_{{row}}.{{jpeg|png}})",
            config.tile
        );
        return ExitCode::FAILURE;
    };

    let options = config.options;
    let Some(dz) = open_generator(
        &config.slide,
        options.tile_size,
        options.overlap,
        options.limit_bounds,
    ) else {
        return ExitCode::FAILURE;
    };

    let result = dz
        .checked_address(tile.level, tile.col, tile.row)
        .and_then(|(level, address)| Ok((level, address, dz.get_tile_info(level, address)?)));
    let (level, address, info) = match result {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "level {} tile ({}, {}): read ({}, {}) at slide level {}, {}x{} -> {}x{}",
        level,
        address.0,
        address.1,
        info.location.0,
        info.location.1,
        info.level,
        info.size.0,
        info.size.1,
        info.output_size.0,
        info.output_size.1
    );

    if config.render {
        match dz.get_tile(level, address) {
            Ok(rendered) => {
                let (width, height) = rendered.dimensions();
                println!("rendered {}x{} {}", width, height, tile.format);
            }
            Err(e) => {
                error!("Failed to render tile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
