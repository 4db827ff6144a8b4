use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sharedimg_cache::{
    CacheConfig, CacheStats, CountingBlitter, DecodeState, ImageSource, Point, Rect,
    SharedImageCache, DEFAULT_HEADER_PROBE_SIZE,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "sharedimg-cli")]
#[command(about = "Shared image cache CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the detected format of each image.
    Identify {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print machine-readable image metadata.
    Info {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Draw every image once through a bounded cache and print its statistics.
    Simulate {
        /// Pixel budget (0 = unlimited). Overrides the configuration.
        #[arg(long)]
        limit: Option<usize>,
        /// TOML cache configuration.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct IdentifyOutput {
    path: String,
    format: String,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    format: String,
    width: u32,
    height: u32,
    state: &'static str,
}

#[derive(Debug, Serialize)]
struct SimulateOutput {
    memory_limit: usize,
    memory_used: usize,
    entry_count: usize,
    decoded_count: usize,
    hits: u64,
    misses: u64,
    decodes: u64,
    evictions: u64,
    decode_failures: u64,
    hit_rate: f64,
    pixels_drawn: u64,
    entries: Vec<EntryOutput>,
}

#[derive(Debug, Serialize)]
struct EntryOutput {
    path: String,
    state: &'static str,
    width: u32,
    height: u32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Identify { files } => run_identify(&files),
        Commands::Info { files } => run_info(&files),
        Commands::Simulate { limit, config, files } => {
            run_simulate(limit, config.as_deref(), &files)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_identify(files: &[PathBuf]) -> Result<()> {
    let cache = SharedImageCache::default();
    let mut payload = Vec::with_capacity(files.len());

    for file in files {
        ensure_image_exists(file)?;
        let header = ImageSource::new(cache_name(file)?, file, None)
            .read_header(DEFAULT_HEADER_PROBE_SIZE)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let decoder = cache.identify(&header);
        payload.push(IdentifyOutput {
            path: file.display().to_string(),
            format: decoder.name().to_string(),
        });
    }

    print_json(&payload)
}

fn run_info(files: &[PathBuf]) -> Result<()> {
    let cache = SharedImageCache::default();
    let mut payload = Vec::with_capacity(files.len());

    for file in files {
        let path = resolve_image(file)?;
        let handle = cache.get_file(cache_name(&path)?);
        let size = cache.measure(&handle);

        payload.push(InfoOutput {
            path: file.display().to_string(),
            format: cache.format(&handle).unwrap_or_default(),
            width: size.width,
            height: size.height,
            state: state_label(cache.state(&handle)),
        });
    }

    print_json(&payload)
}

fn run_simulate(limit: Option<usize>, config: Option<&Path>, files: &[PathBuf]) -> Result<()> {
    let mut config = match config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CacheConfig::from_env().context("invalid cache environment")?,
    };
    if let Some(limit) = limit {
        config.memory_limit = limit;
    }

    let cache = SharedImageCache::new(config);
    let mut blitter = CountingBlitter::default();
    let mut handles = Vec::with_capacity(files.len());

    for file in files {
        let path = resolve_image(file)?;
        let handle = cache.get_file(cache_name(&path)?);
        let size = cache.measure(&handle);
        let dest = Rect::new(0, 0, size.width, size.height);
        if !cache.draw(&handle, dest, Point::ORIGIN, &mut blitter) {
            log::warn!("could not draw {}", file.display());
        }
        handles.push((file, handle));
    }

    let entries = handles
        .iter()
        .map(|(file, handle)| {
            let size = cache.dimensions(handle).unwrap_or_default();
            EntryOutput {
                path: file.display().to_string(),
                state: state_label(cache.state(handle)),
                width: size.width,
                height: size.height,
            }
        })
        .collect();

    let stats: CacheStats = cache.stats();
    let payload = SimulateOutput {
        memory_limit: stats.memory_limit,
        memory_used: stats.memory_used,
        entry_count: stats.entry_count,
        decoded_count: stats.decoded_count,
        hits: stats.hits,
        misses: stats.misses,
        decodes: stats.decodes,
        evictions: stats.evictions,
        decode_failures: stats.decode_failures,
        hit_rate: stats.hit_rate(),
        pixels_drawn: blitter.pixels,
        entries,
    };

    print_json(&payload)
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

fn state_label(state: Option<DecodeState>) -> &'static str {
    state.map_or("destroyed", |state| state.as_str())
}

fn cache_name(path: &Path) -> Result<&str> {
    path.to_str().with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

/// Absolute path of an existing image. Relative arguments are taken from the
/// working directory, never from the cache root.
fn resolve_image(path: &Path) -> Result<PathBuf> {
    ensure_image_exists(path)?;
    path.canonicalize().with_context(|| format!("failed to resolve {}", path.display()))
}

fn ensure_image_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
