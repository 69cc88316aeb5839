use clap::Parser;

use crate::config::{ArchiveConfig, CacheConfig, ReaderConfig};

#[derive(Parser, Debug)]
#[command(name = "comicz")]
#[command(version)]
#[command(about = "Inspect and extract pages from CBZ/CBR comic archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  comicz -l issue.cbz              list pages in reading order\n  \
  comicz -p 0 issue.cbr > p.jpg    write the first page's image bytes to stdout\n  \
  comicz -i 3 -o p4.png issue.cbz  decode and scale page index 3, save as PNG")]
pub struct Cli {
    /// CBZ/CBR (or ZIP/RAR) file
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List pages (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes, and log progress
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write the raw image bytes of page INDEX to stdout
    #[arg(short = 'p', value_name = "INDEX", conflicts_with = "inspect")]
    pub pipe: Option<usize>,

    /// Decode page INDEX through the page cache and report its size
    #[arg(short = 'i', value_name = "INDEX")]
    pub inspect: Option<usize>,

    /// Save the page decoded with -i as a PNG
    #[arg(short = 'o', value_name = "OUT", requires = "inspect")]
    pub output: Option<String>,

    /// Display width; pages are cached at 1.5x this
    #[arg(long, default_value_t = crate::config::DEFAULT_DISPLAY_WIDTH)]
    pub width: u32,

    /// Display height; pages are cached at 1.5x this
    #[arg(long, default_value_t = crate::config::DEFAULT_DISPLAY_HEIGHT)]
    pub height: u32,

    /// Maximum number of pages read from the archive
    #[arg(long, value_name = "N", default_value_t = crate::config::DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe.is_some()
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            archive: ArchiveConfig {
                max_pages: self.max_pages,
                ..ArchiveConfig::default()
            },
            cache: CacheConfig::for_display(self.width, self.height),
        }
    }
}
