//! Command-line inspector for comic archives.
//!
//! Lists pages in reading order, dumps a page's encoded bytes, or pushes a
//! page through the page cache to check it decodes.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use comicz::{Cli, ComicArchive, PageCache};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = cli.reader_config();
    let archive = Arc::new(ComicArchive::open_with(&cli.file, &config.archive).await?);

    let result = if let Some(index) = cli.pipe {
        pipe_page(&archive, index).await
    } else if let Some(index) = cli.inspect {
        let cache = PageCache::new(archive.clone(), &config.cache);
        let result = inspect_page(&cache, index, &cli).await;
        cache.clear().await;
        result
    } else if cli.list || cli.verbose {
        list_pages(&archive, cli.verbose);
        Ok(())
    } else {
        if !cli.is_very_quiet() {
            println!(
                "{}: {} archive, {} pages",
                archive.source(),
                archive.format(),
                archive.page_count()
            );
        }
        Ok(())
    };

    archive.close().await;
    result
}

/// Route library logs to stderr, at a level picked from `-v`/`-q`.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.is_quiet() {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the log subscriber")?;
    Ok(())
}

/// Write a page's still-encoded bytes to stdout.
async fn pipe_page(archive: &ComicArchive, index: usize) -> Result<()> {
    let data = archive.extract(index).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&data).await?;
    stdout.flush().await?;
    Ok(())
}

/// Load one page through the cache, report it and optionally save it.
async fn inspect_page(cache: &PageCache, index: usize, cli: &Cli) -> Result<()> {
    let raster = cache
        .get_page(index)
        .await
        .map_err(|e| anyhow::anyhow!("{e}: {}", e.cause))?;

    if !cli.is_very_quiet() {
        let (target_w, target_h) = cache.target_size();
        println!(
            "page {}: {}x{} (cache target {}x{}, {})",
            index,
            raster.width(),
            raster.height(),
            target_w,
            target_h,
            format_size(raster.byte_len() as u64)
        );
    }

    if let Some(ref output) = cli.output {
        let image = Arc::unwrap_or_clone(raster).into_image();
        image
            .save(output)
            .with_context(|| format!("failed to write {output}"))?;
        if !cli.is_quiet() {
            println!("  saved: {output}");
        }
    }

    Ok(())
}

/// Print pages in reading order, optionally with sizes and totals.
fn list_pages(archive: &ComicArchive, verbose: bool) {
    if verbose {
        println!("{:>5}  {:>10}  {:>10}  {:>5}  Name", "Page", "Length", "Size", "Cmpr");
        println!("{}", "-".repeat(60));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;

    for (index, entry) in archive.entries().iter().enumerate() {
        if verbose {
            println!(
                "{:>5}  {:>10}  {:>10}  {}  {}",
                index,
                entry.uncompressed_size,
                entry.compressed_size,
                ratio(entry.compressed_size, entry.uncompressed_size),
                entry.name
            );
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
        } else {
            println!("{}", entry.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(60));
        println!(
            "{:>5}  {:>10}  {:>10}  {}  {} pages ({})",
            "",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            archive.page_count(),
            format_size(total_uncompressed)
        );
    }
}

/// Percentage saved by compression, right-aligned to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
