use anyhow::{Context, Result, bail};
use flate2::Crc;
use tracing::debug;

use crate::archive::{ContainerEntry, DirectoryBuilder, Locator};
use crate::io::SharedReader;

use super::parser::RarParser;
use super::unpack::unpack;

/// Rar-style container: scans block headers once at open, then extracts by
/// seeking straight to a recorded header offset and unpacking the data area
/// that follows it.
pub struct RarBackend {
    parser: RarParser,
}

impl RarBackend {
    pub async fn open(reader: SharedReader, builder: &mut DirectoryBuilder) -> Result<Self> {
        let parser = RarParser::open(reader).await?;
        let mut seen = 0usize;
        parser
            .scan(|offset, header| {
                seen += 1;
                builder.push(ContainerEntry {
                    name: header.name,
                    compressed_size: header.packed_size,
                    uncompressed_size: header.unpacked_size,
                    is_directory: header.is_directory,
                    locator: Locator::Offset(offset),
                })
            })
            .await?;
        debug!(version = ?parser.version(), entries = seen, "scanned rar headers");

        Ok(Self { parser })
    }

    /// Read the entry whose header starts at `offset`.
    ///
    /// The header is parsed again from disk on every call and must still
    /// describe `name` with `expected_size` bytes.
    pub async fn extract(
        &self,
        offset: u64,
        name: &str,
        expected_size: u64,
        max_size: u64,
    ) -> Result<Vec<u8>> {
        let header = self.parser.read_file_header(offset).await?;

        if header.name != name {
            bail!(
                "header at offset {} names {}, expected {}",
                offset,
                header.name,
                name
            );
        }
        if header.encrypted {
            bail!("entry is encrypted");
        }
        if header.split {
            bail!("entry spans multiple volumes");
        }
        if header.size_unknown || header.unpacked_size == 0 {
            bail!("entry is empty or has no recorded size");
        }
        if header.unpacked_size != expected_size {
            bail!(
                "entry size changed: directory says {}, archive says {}",
                expected_size,
                header.unpacked_size
            );
        }
        if header.unpacked_size > max_size {
            bail!(
                "entry is {} bytes, above the {} byte limit",
                header.unpacked_size,
                max_size
            );
        }
        if header.solid {
            bail!("entry is solid and depends on the entries before it");
        }
        if header.is_stored() && header.packed_size != header.unpacked_size {
            bail!("stored entry has mismatched sizes");
        }
        if header.data_offset.saturating_add(header.packed_size) > self.parser.reader().size() {
            bail!("entry data runs past the end of the archive");
        }

        let mut packed = vec![0u8; header.packed_size as usize];
        self.parser
            .reader()
            .read_exact_at(header.data_offset, &mut packed)
            .await?;

        let expected_crc = header.crc32;
        let data = if header.is_stored() {
            packed
        } else {
            let version = self.parser.version();
            tokio::task::spawn_blocking(move || unpack(version, &header, &packed))
                .await
                .context("unpack task failed")??
        };

        if let Some(expected) = expected_crc {
            let mut crc = Crc::new();
            crc.update(&data);
            if crc.sum() != expected {
                bail!(
                    "CRC mismatch: expected {:08x}, computed {:08x}",
                    expected,
                    crc.sum()
                );
            }
        }

        Ok(data)
    }
}
