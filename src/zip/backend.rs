use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result, bail};
use flate2::Crc;
use flate2::read::DeflateDecoder;
use tracing::{debug, warn};

use crate::archive::{ContainerEntry, DirectoryBuilder, Locator};
use crate::io::SharedReader;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Zip-style container: enumerates the central directory once and extracts
/// entries by name.
pub struct ZipBackend {
    parser: ZipParser,
    by_name: HashMap<String, ZipFileEntry>,
}

impl ZipBackend {
    /// Parse the central directory, feeding every entry to `builder` until it
    /// reports the page cap has been reached.
    pub async fn open(reader: SharedReader, builder: &mut DirectoryBuilder) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let files = parser.list_files().await?;
        debug!(entries = files.len(), "read zip central directory");

        let mut by_name = HashMap::with_capacity(files.len());
        for file in files {
            if file.is_directory {
                continue;
            }
            // Pages are found again by name, so only the first of a name is a page
            if by_name.contains_key(&file.file_name) {
                warn!(name = %file.file_name, "skipping duplicate entry");
                continue;
            }
            let flow = builder.push(ContainerEntry {
                name: file.file_name.clone(),
                compressed_size: file.compressed_size,
                uncompressed_size: file.uncompressed_size,
                is_directory: false,
                locator: Locator::Name(file.file_name.clone()),
            });
            by_name.insert(file.file_name.clone(), file);
            if flow.is_break() {
                break;
            }
        }

        Ok(Self { parser, by_name })
    }

    /// Inflate the entry called `name`, which must hold exactly `expected_size` bytes.
    pub async fn extract(&self, name: &str, expected_size: u64, max_size: u64) -> Result<Vec<u8>> {
        let entry = self
            .by_name
            .get(name)
            .with_context(|| format!("{name} is not in the central directory"))?;

        if entry.is_encrypted() {
            bail!("entry is encrypted");
        }
        if entry.uncompressed_size == 0 {
            bail!("entry is empty");
        }
        if entry.uncompressed_size != expected_size {
            bail!(
                "entry size changed: directory says {}, archive says {}",
                expected_size,
                entry.uncompressed_size
            );
        }
        if entry.uncompressed_size > max_size {
            bail!(
                "entry is {} bytes, above the {} byte limit",
                entry.uncompressed_size,
                max_size
            );
        }

        let data_offset = self.parser.data_offset(entry).await?;
        if data_offset.saturating_add(entry.compressed_size) > self.parser.reader().size() {
            bail!("entry data runs past the end of the archive");
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => {
                if entry.compressed_size != entry.uncompressed_size {
                    bail!("stored entry has mismatched sizes");
                }
                raw
            }
            CompressionMethod::Deflate => inflate(&raw, entry.uncompressed_size)?,
            CompressionMethod::Unknown(method) => {
                bail!("unsupported compression method {}", method)
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!(
                "CRC mismatch: expected {:08x}, computed {:08x}",
                entry.crc32,
                crc.sum()
            );
        }

        Ok(data)
    }
}

fn inflate(raw: &[u8], expected: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected as usize);
    DeflateDecoder::new(raw)
        .take(expected + 1)
        .read_to_end(&mut out)
        .context("corrupt deflate stream")?;
    if out.len() as u64 != expected {
        bail!("inflated to {} bytes, expected {}", out.len(), expected);
    }
    Ok(out)
}
