//! Zip-style (CBZ) container backend.
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 records, header signatures)
//! - [`parser`]: locating and walking the central directory
//! - [`backend`]: page enumeration and extraction by entry name
//!
//! Supports the STORED and DEFLATE methods and ZIP64 archives. Encrypted and
//! multi-disk archives are not supported.

mod backend;
mod parser;
mod structures;

pub use backend::ZipBackend;
