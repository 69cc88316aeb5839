#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use comicz::{DecodeError, ImageCrateDecoder, PageDecoder, Raster};
use flate2::Crc;
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A solid-colour PNG.
pub fn png_page(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

pub enum Method {
    Stored,
    Deflated,
}

/// Build a CBZ in memory. Names ending in `/` become directory entries.
pub fn cbz(entries: &[(&str, &[u8], Method)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        let method = match method {
            Method::Stored => zip::CompressionMethod::Stored,
            Method::Deflated => zip::CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// CBZ with every entry stored.
pub fn stored_cbz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: Vec<_> = entries
        .iter()
        .map(|(name, data)| (*name, *data, Method::Stored))
        .collect();
    cbz(&entries)
}

/// CBZ of `count` PNG pages named `page1.png`, `page2.png`, ...
pub fn png_cbz(count: usize, width: u32, height: u32) -> Vec<u8> {
    let pages: Vec<(String, Vec<u8>)> = (1..=count)
        .map(|i| (format!("page{i}.png"), png_page(width, height, i as u8)))
        .collect();
    let entries: Vec<(&str, &[u8])> = pages
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    stored_cbz(&entries)
}

/// Write `data` to a temporary file with the given name.
pub fn write_temp(name: &str, data: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    (dir, path)
}

fn crc32(parts: &[&[u8]]) -> u32 {
    let mut crc = Crc::new();
    for part in parts {
        crc.update(part);
    }
    crc.sum()
}

pub fn vint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// One entry of a hand-assembled RAR archive.
pub struct RarEntry<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    /// 0 = store; anything else marks the entry as compressed
    pub method: u8,
    pub directory: bool,
}

impl<'a> RarEntry<'a> {
    pub fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            method: 0,
            directory: false,
        }
    }
}

fn rar5_block(header: &[u8]) -> Vec<u8> {
    let size = vint(header.len() as u64);
    let mut block = crc32(&[&size, header]).to_le_bytes().to_vec();
    block.extend_from_slice(&size);
    block.extend_from_slice(header);
    block
}

fn rar5_file(entry: &RarEntry<'_>, extra: &[u8]) -> Vec<u8> {
    let data: &[u8] = if entry.directory { &[] } else { entry.data };
    let mut flags = 0u64;
    if !extra.is_empty() {
        flags |= 0x0001;
    }
    if !data.is_empty() {
        flags |= 0x0002;
    }
    let mut header = vint(2);
    header.extend(vint(flags));
    if !extra.is_empty() {
        header.extend(vint(extra.len() as u64));
    }
    if !data.is_empty() {
        header.extend(vint(data.len() as u64));
    }
    let file_flags = if entry.directory { 0x0001 } else { 0x0004 };
    header.extend(vint(file_flags));
    header.extend(vint(data.len() as u64));
    header.extend(vint(0x20));
    if !entry.directory {
        header.extend(crc32(&[data]).to_le_bytes());
    }
    header.extend(vint((entry.method as u64) << 7));
    header.extend(vint(0));
    header.extend(vint(entry.name.len() as u64));
    header.extend_from_slice(entry.name.as_bytes());
    header.extend_from_slice(extra);

    let mut block = rar5_block(&header);
    block.extend_from_slice(data);
    block
}

/// RAR 5.0 archive with a main header, the given entries and an end header.
pub fn rar5(entries: &[RarEntry<'_>]) -> Vec<u8> {
    let mut out = b"Rar!\x1a\x07\x01\x00".to_vec();
    out.extend(rar5_block(&[1, 0, 0]));
    for entry in entries {
        out.extend(rar5_file(entry, &[]));
    }
    out.extend(rar5_block(&[5, 0, 0]));
    out
}

/// RAR 5.0 archive of one entry whose header carries `extra` as its extra area.
pub fn rar5_with_extra(entry: RarEntry<'_>, extra: &[u8]) -> Vec<u8> {
    let mut out = b"Rar!\x1a\x07\x01\x00".to_vec();
    out.extend(rar5_block(&[1, 0, 0]));
    out.extend(rar5_file(&entry, extra));
    out.extend(rar5_block(&[5, 0, 0]));
    out
}

/// Real compressed RAR archive written by the `rars` encoder.
pub fn packed_rar(version: rars::ArchiveVersion, solid: bool, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = rars::Builder::new(version).solid(solid);
    for (name, data) in entries {
        builder
            .add_bytes(name.as_bytes().to_vec(), data.to_vec(), None, None)
            .unwrap();
    }
    builder.to_bytes().unwrap()
}

/// RAR 5.0 archive whose headers are encrypted.
pub fn rar5_encrypted() -> Vec<u8> {
    let mut out = b"Rar!\x1a\x07\x01\x00".to_vec();
    // Encryption header: version 0, no flags, KDF count, 16-byte salt
    let mut header = vec![4, 0, 0, 0, 15];
    header.extend_from_slice(&[0xab; 16]);
    out.extend(rar5_block(&header));
    out.extend_from_slice(&[0u8; 64]);
    out
}

fn rar4_block(block_type: u8, flags: u16, body: &[u8]) -> Vec<u8> {
    let head_size = (7 + body.len()) as u16;
    let mut tail = vec![block_type];
    tail.extend(flags.to_le_bytes());
    tail.extend(head_size.to_le_bytes());
    tail.extend_from_slice(body);
    let crc = (crc32(&[&tail]) & 0xffff) as u16;
    let mut block = crc.to_le_bytes().to_vec();
    block.extend(tail);
    block
}

/// RAR 1.5-4.x archive with the given entries, stored with Windows paths.
pub fn rar4(entries: &[RarEntry<'_>]) -> Vec<u8> {
    let mut out = b"Rar!\x1a\x07\x00".to_vec();
    out.extend(rar4_block(0x73, 0, &[0; 6]));

    for entry in entries {
        let data: &[u8] = if entry.directory { &[] } else { entry.data };
        let name = entry.name.replace('/', "\\");
        let mut flags = 0x8000u16;
        if entry.directory {
            flags |= 0x00e0;
        }

        let mut body = Vec::new();
        body.extend((data.len() as u32).to_le_bytes());
        body.extend((data.len() as u32).to_le_bytes());
        body.push(2);
        body.extend(crc32(&[data]).to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(29);
        body.push(0x30 + entry.method);
        body.extend((name.len() as u16).to_le_bytes());
        body.extend(0x20u32.to_le_bytes());
        body.extend_from_slice(name.as_bytes());

        out.extend(rar4_block(0x74, flags, &body));
        out.extend_from_slice(data);
    }

    out.extend(rar4_block(0x7b, 0x4000, &[]));
    out
}

/// Decoder that counts how often it runs.
#[derive(Default)]
pub struct CountingDecoder {
    decodes: AtomicUsize,
}

impl CountingDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl PageDecoder for CountingDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Raster, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        ImageCrateDecoder.decode(bytes)
    }
}

/// Decoder that takes `delay` per page and records how many decodes ever
/// overlapped, and which pages (by shade) it decoded.
pub struct SlowDecoder {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    shades: Mutex<Vec<u8>>,
}

impl SlowDecoder {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            shades: Mutex::new(Vec::new()),
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Shade of every page decoded so far, in decode order.
    pub fn decoded(&self) -> Vec<u8> {
        self.shades.lock().unwrap().clone()
    }
}

impl PageDecoder for SlowDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Raster, DecodeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let result = ImageCrateDecoder.decode(bytes);
        if let Ok(raster) = &result {
            if let Some([shade, ..]) = raster.pixel(0, 0) {
                self.shades.lock().unwrap().push(shade);
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
