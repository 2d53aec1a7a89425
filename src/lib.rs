//! A library for updating ZIP archives in place.
//!
//! An [`Updater`] opens an archive that already exists on a seekable
//! read/write store and appends new entries or overwrites existing ones
//! without the decompress–reconstruct–recompress round trip: entry payloads
//! already in the file are left untouched, and only the central directory and
//! the trailer are rewritten when the updater is closed. Archives prefixed
//! with non-ZIP data (such as self-extracting scripts) and ZIP64 archives are
//! handled transparently.
//!
//! The [`ZipArchive`] reader complements the updater for inspection and
//! extraction of entry data.
//!
//! ```
//! use std::io::{Cursor, Write};
//!
//! // Start a fresh archive and add an entry.
//! let mut updater = zipup::Updater::create(Cursor::new(Vec::new()))?;
//! let mut file = updater.append("greeting.txt")?;
//! file.write_all(b"Hello, world!")?;
//! file.finish()?;
//! updater.close()?;
//!
//! // Reopen it for updating: replace the entry with new content.
//! let mut updater = zipup::Updater::new(updater.into_inner())?;
//! let offset = updater.last_header_offset()?;
//! let mut file = updater.append_at("greeting.txt", offset)?;
//! file.write_all(b"Goodbye, world!")?;
//! file.finish()?;
//! updater.close()?;
//!
//! let mut archive = zipup::ZipArchive::new(updater.into_inner())?;
//! assert_eq!(archive.by_name("greeting.txt")?.read_to_end()?, b"Goodbye, world!");
//! # Ok::<(), zipup::ZipError>(())
//! ```

#![warn(missing_docs)]

pub mod compression;
mod crc32;
pub mod read;
pub mod result;
mod spec;
pub mod types;
pub mod update;
mod utils;

pub use crate::compression::{CompressionMethod, Encoder};
pub use crate::read::{ZipArchive, ZipFile};
pub use crate::result::{ZipError, ZipResult};
pub use crate::types::{DateTime, FileHeader};
pub use crate::update::{
    AppendMode, AppendTarget, CompressorFactory, CountWriter, Directory, EntryWriter, Truncate,
    Updater,
};
