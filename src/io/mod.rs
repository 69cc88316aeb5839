mod local;
mod memory;

pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Trait for random access reading from a container source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely from `offset`, failing on a short read.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                bail!(
                    "unexpected end of data at offset {} (wanted {} more bytes)",
                    offset + filled as u64,
                    buf.len() - filled
                );
            }
            filled += n;
        }
        Ok(())
    }
}

/// Reader shared between an archive and its backend.
pub type SharedReader = Arc<dyn ReadAt>;
