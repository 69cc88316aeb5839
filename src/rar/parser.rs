//! Block-header scanner for Rar-style containers.
//!
//! RAR archives have no central directory: the only way to list them is to
//! walk the chain of block headers from the signature onwards, hopping over
//! each block's data area. The scanner records the byte offset of every file
//! header so a page can later be re-read with one positional read instead of
//! another walk.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::ops::ControlFlow;

use anyhow::{Context, Result, bail};
use flate2::Crc;

use crate::io::SharedReader;

use super::structures::*;

/// What the scanner found at one offset.
enum BlockKind {
    File(RarFileHeader),
    EncryptedHeaders,
    End,
    Other,
}

struct Block {
    kind: BlockKind,
    next_offset: u64,
}

pub struct RarParser {
    reader: SharedReader,
    size: u64,
    version: RarVersion,
}

impl RarParser {
    /// Check the signature and remember which header layout to expect.
    pub async fn open(reader: SharedReader) -> Result<Self> {
        let size = reader.size();
        let mut prefix = [0u8; 8];
        let n = prefix.len().min(size as usize);
        reader.read_exact_at(0, &mut prefix[..n]).await?;
        let version = RarVersion::detect(&prefix[..n]).context("Not a RAR archive")?;
        Ok(Self {
            reader,
            size,
            version,
        })
    }

    pub fn version(&self) -> RarVersion {
        self.version
    }

    pub fn reader(&self) -> &SharedReader {
        &self.reader
    }

    /// Walk every block, handing each file header and its offset to `visit`
    /// until it breaks or the archive ends.
    pub async fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(u64, RarFileHeader) -> ControlFlow<()> + Send,
    {
        let mut offset = self.version.signature_len();
        while offset.saturating_add(v4::BLOCK_PREFIX as u64) <= self.size {
            let block = self
                .read_block(offset)
                .await
                .with_context(|| format!("block at offset {offset}"))?;
            match block.kind {
                BlockKind::File(header) => {
                    if visit(offset, header).is_break() {
                        break;
                    }
                }
                BlockKind::EncryptedHeaders => bail!("archive headers are encrypted"),
                BlockKind::End => break,
                BlockKind::Other => {}
            }
            if block.next_offset <= offset {
                bail!("block at offset {} does not advance", offset);
            }
            offset = block.next_offset;
        }
        Ok(())
    }

    /// Re-read the file header stored at `offset`.
    pub async fn read_file_header(&self, offset: u64) -> Result<RarFileHeader> {
        if offset < self.version.signature_len() || offset >= self.size {
            bail!("offset {} is outside the archive", offset);
        }
        match self.read_block(offset).await?.kind {
            BlockKind::File(header) => Ok(header),
            _ => bail!("no file header at offset {}", offset),
        }
    }

    async fn read_block(&self, offset: u64) -> Result<Block> {
        match self.version {
            RarVersion::Rar4 => self.read_block_v4(offset).await,
            RarVersion::Rar5 => self.read_block_v5(offset).await,
        }
    }

    async fn read_block_v4(&self, offset: u64) -> Result<Block> {
        let mut prefix = [0u8; v4::BLOCK_PREFIX + 4];
        let avail = prefix.len().min((self.size - offset) as usize);
        self.reader
            .read_exact_at(offset, &mut prefix[..avail])
            .await?;

        let mut cursor = Cursor::new(&prefix[..avail]);
        let _crc = cursor.read_u16::<LittleEndian>()?;
        let block_type = cursor.read_u8()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let head_size = cursor.read_u16::<LittleEndian>()? as u64;
        if head_size < v4::BLOCK_PREFIX as u64 {
            bail!("block header size {} is too small", head_size);
        }
        let add_size = if flags & v4::LONG_BLOCK != 0 {
            cursor.read_u32::<LittleEndian>()? as u64
        } else {
            0
        };

        let block = match block_type {
            v4::FILE_HEADER => {
                let mut header = vec![0u8; head_size as usize];
                self.reader
                    .read_exact_at(offset, &mut header)
                    .await
                    .context("file header is truncated")?;
                let file = parse_file_v4(offset, flags, &header)?;
                Block {
                    next_offset: file.data_offset.saturating_add(file.packed_size),
                    kind: BlockKind::File(file),
                }
            }
            v4::ARCHIVE_HEADER if flags & v4::ARCHIVE_PASSWORD != 0 => Block {
                kind: BlockKind::EncryptedHeaders,
                next_offset: offset.saturating_add(head_size),
            },
            v4::END_OF_ARCHIVE => Block {
                kind: BlockKind::End,
                next_offset: offset.saturating_add(head_size),
            },
            _ => Block {
                kind: BlockKind::Other,
                next_offset: offset
                    .checked_add(head_size)
                    .and_then(|end| end.checked_add(add_size))
                    .context("block size overflows")?,
            },
        };
        Ok(block)
    }

    async fn read_block_v5(&self, offset: u64) -> Result<Block> {
        let mut prefix = [0u8; v5::MAX_PREFIX];
        let avail = prefix.len().min((self.size - offset) as usize);
        self.reader
            .read_exact_at(offset, &mut prefix[..avail])
            .await?;

        let mut cursor = Cursor::new(&prefix[..avail]);
        let header_crc = cursor.read_u32::<LittleEndian>()?;
        let header_size = read_vint(&mut cursor)?;
        if header_size == 0 || header_size > v5::MAX_HEADER_SIZE {
            bail!("implausible header size {}", header_size);
        }
        let size_field = &prefix[4..cursor.position() as usize];
        let header_start = offset + cursor.position();
        let data_offset = header_start
            .checked_add(header_size)
            .filter(|end| *end <= self.size)
            .context("header runs past the end of the archive")?;

        let mut header = vec![0u8; header_size as usize];
        self.reader.read_exact_at(header_start, &mut header).await?;

        let mut crc = Crc::new();
        crc.update(size_field);
        crc.update(&header);
        if crc.sum() != header_crc {
            bail!("header CRC mismatch");
        }

        let mut cursor = Cursor::new(header.as_slice());
        let header_type = read_vint(&mut cursor)?;
        let flags = read_vint(&mut cursor)?;
        let extra_size = if flags & v5::HEADER_HAS_EXTRA != 0 {
            read_vint(&mut cursor)?
        } else {
            0
        };
        let data_size = if flags & v5::HEADER_HAS_DATA != 0 {
            read_vint(&mut cursor)?
        } else {
            0
        };
        let next_offset = data_offset
            .checked_add(data_size)
            .context("data size overflows")?;

        let kind = match header_type {
            v5::FILE_HEADER => BlockKind::File(parse_file_v5(
                &header,
                cursor.position() as usize,
                flags,
                extra_size,
                data_offset,
                data_size,
            )?),
            v5::ENCRYPTION_HEADER => BlockKind::EncryptedHeaders,
            v5::END_OF_ARCHIVE => BlockKind::End,
            _ => BlockKind::Other,
        };
        Ok(Block { kind, next_offset })
    }
}

fn parse_file_v4(offset: u64, flags: u16, header: &[u8]) -> Result<RarFileHeader> {
    if header.len() < v4::FILE_FIXED {
        bail!("file header is {} bytes, too short", header.len());
    }

    // The stored CRC covers the header from the type byte onwards
    let mut crc = Crc::new();
    crc.update(&header[2..]);
    let stored_crc = u16::from_le_bytes([header[0], header[1]]);
    if (crc.sum() & 0xffff) as u16 != stored_crc {
        bail!("file header CRC mismatch");
    }

    let mut cursor = Cursor::new(&header[v4::BLOCK_PREFIX..]);
    let pack_low = cursor.read_u32::<LittleEndian>()? as u64;
    let unpack_low = cursor.read_u32::<LittleEndian>()? as u64;
    let _host_os = cursor.read_u8()?;
    let file_crc = cursor.read_u32::<LittleEndian>()?;
    let _mtime = cursor.read_u32::<LittleEndian>()?;
    let unpack_version = cursor.read_u8()?;
    let method = cursor.read_u8()?;
    let name_size = cursor.read_u16::<LittleEndian>()? as usize;
    let _attributes = cursor.read_u32::<LittleEndian>()?;
    let (pack_high, unpack_high) = if flags & v4::FILE_LARGE != 0 {
        (
            cursor.read_u32::<LittleEndian>()? as u64,
            cursor.read_u32::<LittleEndian>()? as u64,
        )
    } else {
        (0, 0)
    };

    let mut name = vec![0u8; name_size];
    cursor
        .read_exact(&mut name)
        .context("file name runs past the header")?;
    // Unicode names follow a NUL after the legacy name
    if flags & v4::FILE_UNICODE != 0 {
        if let Some(nul) = name.iter().position(|&b| b == 0) {
            name.truncate(nul);
        }
    }

    Ok(RarFileHeader {
        name: normalize_name(&name),
        packed_size: pack_high << 32 | pack_low,
        unpacked_size: unpack_high << 32 | unpack_low,
        data_offset: offset + header.len() as u64,
        crc32: Some(file_crc),
        method: method.wrapping_sub(v4::METHOD_STORE),
        unpack_version,
        dictionary_size: v4::dictionary_size(flags),
        solid: flags & v4::FILE_SOLID != 0,
        is_directory: flags & v4::FILE_DICTIONARY_MASK == v4::FILE_DICTIONARY_MASK,
        encrypted: flags & v4::FILE_ENCRYPTED != 0,
        split: flags & (v4::FILE_SPLIT_BEFORE | v4::FILE_SPLIT_AFTER) != 0,
        size_unknown: false,
    })
}

fn parse_file_v5(
    header: &[u8],
    body_start: usize,
    flags: u64,
    extra_size: u64,
    data_offset: u64,
    data_size: u64,
) -> Result<RarFileHeader> {
    let extra_start = (header.len() as u64)
        .checked_sub(extra_size)
        .filter(|start| *start >= body_start as u64)
        .context("extra area is larger than the header")? as usize;

    let mut cursor = Cursor::new(&header[..extra_start]);
    cursor.set_position(body_start as u64);
    let file_flags = read_vint(&mut cursor)?;
    let unpacked_size = read_vint(&mut cursor)?;
    let _attributes = read_vint(&mut cursor)?;
    if file_flags & v5::FILE_HAS_MTIME != 0 {
        let _mtime = cursor.read_u32::<LittleEndian>()?;
    }
    let crc32 = if file_flags & v5::FILE_HAS_CRC != 0 {
        Some(cursor.read_u32::<LittleEndian>()?)
    } else {
        None
    };
    let compression = v5::CompressionInfo::parse(read_vint(&mut cursor)?);
    let _host_os = read_vint(&mut cursor)?;
    let name_len = read_vint(&mut cursor)? as usize;
    if name_len > extra_start {
        bail!("file name length {} exceeds the header", name_len);
    }
    let mut name = vec![0u8; name_len];
    cursor
        .read_exact(&mut name)
        .context("file name runs past the header")?;

    Ok(RarFileHeader {
        name: normalize_name(&name),
        packed_size: data_size,
        unpacked_size,
        data_offset,
        crc32,
        method: compression.method,
        unpack_version: compression.algorithm,
        dictionary_size: compression.dictionary_size,
        solid: compression.solid,
        is_directory: file_flags & v5::FILE_DIRECTORY != 0,
        encrypted: has_encryption_record(&header[extra_start..])?,
        split: flags & (v5::HEADER_SPLIT_BEFORE | v5::HEADER_SPLIT_AFTER) != 0,
        size_unknown: file_flags & v5::FILE_SIZE_UNKNOWN != 0,
    })
}

fn has_encryption_record(extra: &[u8]) -> Result<bool> {
    let mut cursor = Cursor::new(extra);
    while (cursor.position() as usize) < extra.len() {
        let record_size = read_vint(&mut cursor)?;
        let record_start = cursor.position();
        let record_end = record_start
            .checked_add(record_size)
            .filter(|end| *end <= extra.len() as u64)
            .context("extra record runs past the header")?;
        if read_vint(&mut cursor)? == v5::EXTRA_ENCRYPTION {
            return Ok(true);
        }
        cursor.set_position(record_end);
    }
    Ok(false)
}
