//! Rar-style (CBR) container backend.
//!
//! Both the RAR 1.5-4.x and RAR 5.0 header layouts are recognised. Pages are
//! located by the byte offset of their file header, recorded during a single
//! linear scan at open time. Extraction re-reads and re-validates that header
//! every time rather than trusting any state left over from earlier reads.
//!
//! Stored entries are read as-is. Compressed entries are unpacked with the
//! `rars` codecs: RAR 1.5, 2.0, 2.9 (LZ and PPMd) and RAR 5.0/7.0 streams.
//! Solid entries cannot be unpacked on their own, so they fail extraction.
//! Encrypted headers fail the open; encrypted, split or solid entries fail
//! only their own extraction.

mod backend;
mod parser;
mod structures;
mod unpack;

pub use backend::RarBackend;
