//! Decompression of one non-solid RAR data area.

use anyhow::{Context, Result, anyhow, bail};
use rars::codec::rar50::{DecodeMode, Unpack50Decoder};
use rars::codec::{rar13, rar20, rar29};

use super::structures::{RarFileHeader, RarVersion};

/// Decode `packed` into exactly `header.unpacked_size` bytes.
pub fn unpack(version: RarVersion, header: &RarFileHeader, packed: &[u8]) -> Result<Vec<u8>> {
    let size = usize::try_from(header.unpacked_size).context("entry does not fit in memory")?;

    let decoded = match version {
        RarVersion::Rar4 => match header.unpack_version {
            15 => rar13::unpack15_decode(packed, size),
            20 | 26 => rar20::unpack20_decode(packed, size),
            v if v >= 29 => rar29::unpack29_decode(packed, size),
            v => bail!("unknown unpack version {}", v),
        },
        RarVersion::Rar5 => {
            if header.unpack_version > 1 {
                bail!("unknown compression algorithm {}", header.unpack_version);
            }
            let dictionary = usize::try_from(header.dictionary_size)
                .context("dictionary does not fit in memory")?;
            Unpack50Decoder::new().decode_member_with_dictionary(
                packed,
                header.unpack_version,
                size,
                dictionary,
                false,
                DecodeMode::Lz,
            )
        }
    };

    let data = decoded.map_err(|e| anyhow!("corrupt compressed data: {e}"))?;
    if data.len() != size {
        bail!("unpacked to {} bytes, expected {}", data.len(), size);
    }
    Ok(data)
}
