use byteorder::ReadBytesExt;
use std::io::Cursor;

use anyhow::{Result, bail};

/// RAR 1.5 - 4.x marker block
pub const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";
/// RAR 5.0 signature
pub const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";

/// Container generation, decided from the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RarVersion {
    Rar4,
    Rar5,
}

impl RarVersion {
    pub fn detect(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(RAR5_SIGNATURE) {
            Some(RarVersion::Rar5)
        } else if prefix.starts_with(RAR4_SIGNATURE) {
            Some(RarVersion::Rar4)
        } else {
            None
        }
    }

    pub fn signature_len(&self) -> u64 {
        match self {
            RarVersion::Rar4 => RAR4_SIGNATURE.len() as u64,
            RarVersion::Rar5 => RAR5_SIGNATURE.len() as u64,
        }
    }
}

/// RAR4 block types and flags
pub mod v4 {
    /// Fixed part shared by every block: CRC, type, flags, size
    pub const BLOCK_PREFIX: usize = 7;
    /// Fixed fields of a file header, up to and including the attributes
    pub const FILE_FIXED: usize = BLOCK_PREFIX + 25;

    pub const ARCHIVE_HEADER: u8 = 0x73;
    pub const FILE_HEADER: u8 = 0x74;
    pub const END_OF_ARCHIVE: u8 = 0x7b;

    /// Block carries a 32-bit ADD_SIZE after the header size
    pub const LONG_BLOCK: u16 = 0x8000;
    /// Archive header: block headers are encrypted
    pub const ARCHIVE_PASSWORD: u16 = 0x0080;

    pub const FILE_SPLIT_BEFORE: u16 = 0x0001;
    pub const FILE_SPLIT_AFTER: u16 = 0x0002;
    pub const FILE_ENCRYPTED: u16 = 0x0004;
    pub const FILE_SOLID: u16 = 0x0010;
    /// Dictionary size field; all bits set marks a directory
    pub const FILE_DICTIONARY_MASK: u16 = 0x00e0;
    pub const FILE_LARGE: u16 = 0x0100;
    pub const FILE_UNICODE: u16 = 0x0200;

    pub const METHOD_STORE: u8 = 0x30;

    /// Dictionary size encoded in the file flags: 64 KiB doubled per step.
    pub fn dictionary_size(flags: u16) -> u64 {
        (64 * 1024) << ((flags & FILE_DICTIONARY_MASK) >> 5)
    }
}

/// RAR5 header types and flags
pub mod v5 {
    /// CRC32 plus the longest possible header-size vint
    pub const MAX_PREFIX: usize = 4 + 10;
    /// Upper bound the format places on a single header
    pub const MAX_HEADER_SIZE: u64 = 2 * 1024 * 1024;

    pub const MAIN_HEADER: u64 = 1;
    pub const FILE_HEADER: u64 = 2;
    pub const ENCRYPTION_HEADER: u64 = 4;
    pub const END_OF_ARCHIVE: u64 = 5;

    pub const HEADER_HAS_EXTRA: u64 = 0x0001;
    pub const HEADER_HAS_DATA: u64 = 0x0002;
    pub const HEADER_SPLIT_BEFORE: u64 = 0x0008;
    pub const HEADER_SPLIT_AFTER: u64 = 0x0010;

    pub const FILE_DIRECTORY: u64 = 0x0001;
    pub const FILE_HAS_MTIME: u64 = 0x0002;
    pub const FILE_HAS_CRC: u64 = 0x0004;
    pub const FILE_SIZE_UNKNOWN: u64 = 0x0008;

    /// Extra area record marking file data as encrypted
    pub const EXTRA_ENCRYPTION: u64 = 0x01;

    pub const METHOD_STORE: u8 = 0;

    /// Decoded compression information field of a file header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompressionInfo {
        /// 0 for RAR 5.0 streams, 1 for RAR 7.0
        pub algorithm: u8,
        pub solid: bool,
        pub method: u8,
        pub dictionary_size: u64,
    }

    impl CompressionInfo {
        pub fn parse(raw: u64) -> Self {
            let algorithm = (raw & 0x3f) as u8;
            let power = ((raw >> 10) & 0x1f) as u32;
            let dictionary_size = if algorithm == 1 {
                let fraction = (raw >> 15) & 0x1f;
                (fraction + 32) << (power + 12)
            } else {
                (128 * 1024) << power.min(15)
            };
            Self {
                algorithm,
                solid: raw & 0x40 != 0,
                method: ((raw >> 7) & 0x07) as u8,
                dictionary_size,
            }
        }
    }
}

/// A file entry as described by its block header.
#[derive(Debug, Clone)]
pub struct RarFileHeader {
    pub name: String,
    pub packed_size: u64,
    pub unpacked_size: u64,
    /// Absolute offset of the first data byte
    pub data_offset: u64,
    pub crc32: Option<u32>,
    /// Compression method normalised so that 0 means stored
    pub method: u8,
    /// RAR4: the version needed to unpack (15, 20, 26, 29, ...).
    /// RAR5: the algorithm field of the compression information.
    pub unpack_version: u8,
    pub dictionary_size: u64,
    /// Compressed against the previous entry's data
    pub solid: bool,
    pub is_directory: bool,
    pub encrypted: bool,
    pub split: bool,
    pub size_unknown: bool,
}

impl RarFileHeader {
    pub fn is_stored(&self) -> bool {
        self.method == 0
    }
}

/// Read a RAR5 variable-length integer: 7 bits per byte, low bits first.
pub fn read_vint(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        let byte = cursor.read_u8()?;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    bail!("Variable-length integer is longer than 10 bytes")
}

/// Entry names use `\` on archives created on Windows.
pub fn normalize_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\\', "/")
}
