//! In-place updates of existing ZIP archives.
//!
//! [`Updater`] attaches to a seekable read/write store holding a ZIP archive
//! and appends or overwrites entries without rewriting the rest of the file.
//! Only the central directory and the trailer are rebuilt, on
//! [`Updater::close`].

use crate::compression::{CompressionMethod, Compressor, Encoder};
use crate::crc32::Crc32Writer;
use crate::read::{directory_counts, read_central_header};
use crate::result::{ZipError, ZipResult};
use crate::spec;
use crate::types::{needs_utf8_encoding, Entry, FileHeader};
use crate::utils::{ReadLE, WriteLE};
use std::collections::HashMap;
use std::io::{self, prelude::*};

/// Writer that tracks the logical write position.
///
/// Every header offset recorded in the index comes from this counter, never
/// from seek queries against the backing store.
#[derive(Debug)]
pub struct CountWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountWriter<W> {
    fn new(inner: W) -> Self {
        CountWriter { inner, count: 0 }
    }

    /// Current logical position, relative to the archive base.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn set_count(&mut self, count: u64) {
        self.count = count;
    }

    fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Backing stores whose length can be cut back.
///
/// Overwriting an entry with a smaller replacement leaves stale bytes past
/// the rewritten trailer; they must be dropped or a reader scanning backward
/// would find the old trailer instead of the new one.
pub trait Truncate {
    /// Shortens the store to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Truncate for io::Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

impl Truncate for io::Cursor<&mut Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

impl<T: Truncate + ?Sized> Truncate for &mut T {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }
}

/// Factory for a registered compression method.
///
/// The factory receives the archive's counted sink and the entry's
/// compression level, and returns an [`Encoder`] that compresses into that
/// sink. [`CountWriter::count`] on the sink is how the number of compressed
/// bytes becomes observable.
pub type CompressorFactory<F> = Box<
    dyn for<'a> Fn(
            &'a mut CountWriter<F>,
            Option<u32>,
        ) -> io::Result<Box<dyn Encoder<&'a mut CountWriter<F>> + 'a>>
        + 'static,
>;

/// How `append_header` picks the position of the new entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AppendMode {
    /// Append after the existing entries; nothing is replaced.
    KeepOriginal,
    /// Replace the entry carrying the same name, shadowing it and every entry
    /// that follows it. Without a name match this appends at the tail.
    Overwrite,
}

/// Target position of `append_header_at`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AppendTarget {
    /// The current insertion point, just past the last surviving entry.
    Tail,
    /// The local header offset of an existing entry, relative to the archive
    /// base. Offsets past the insertion point are rejected.
    Offset(u64),
}

/// Read-only view of one index entry, as returned by [`Updater::directory`].
#[derive(Clone, Debug)]
pub struct Directory {
    name: String,
    mode: u32,
    offset: u64,
}

impl Directory {
    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unix mode bits, or 0 when the entry does not carry any.
    pub fn unix_mode(&self) -> u32 {
        self.mode
    }

    /// Offset of the entry's local file header, relative to the archive base.
    pub fn header_offset(&self) -> u64 {
        self.offset
    }
}

/// Updates an existing ZIP archive in place.
///
/// New entries are appended at the tail (over the old central directory) or
/// at the offset of an existing entry, which replaces it. A fresh central
/// directory and trailer are written by [`Updater::close`]; until that
/// completes the archive on disk is not valid.
///
/// ```
/// use std::io::{Cursor, Write};
///
/// let mut updater = zipup::Updater::create(Cursor::new(Vec::new()))?;
/// let mut file = updater.append("hello.txt")?;
/// file.write_all(b"Hello, world!")?;
/// file.finish()?;
/// updater.close()?;
/// # Ok::<(), zipup::ZipError>(())
/// ```
pub struct Updater<F: Read + Write + Seek + Truncate> {
    inner: CountWriter<F>,
    dir: Vec<Entry>,
    compressors: HashMap<u16, CompressorFactory<F>>,
    comment: Vec<u8>,
    closed: bool,
    base_offset: u64,
    dir_offset: u64,
    initial_len: u64,
}

impl<F: Read + Write + Seek + Truncate> Updater<F> {
    /// Attaches to an existing archive, making it ready for appending.
    ///
    /// The whole central directory is parsed into memory and every entry name
    /// is validated. The updater owns the store until it is closed; the store
    /// must not be touched from outside in between.
    pub fn new(mut inner: F) -> ZipResult<Updater<F>> {
        let (footer, cde_start_pos) = spec::CentralDirectoryEnd::find_and_parse(&mut inner)?;

        if footer.disk_number != footer.disk_with_central_directory {
            return Err(ZipError::UnsupportedArchive(
                "Support for multi-disk files is not implemented",
            ));
        }

        let initial_len = inner.seek(io::SeekFrom::End(0))?;
        let counts = directory_counts(&mut inner, &footer, cde_start_pos)?;

        let capacity = if counts.number_of_files > cde_start_pos / spec::LOCAL_FILE_HEADER_LEN {
            0
        } else {
            counts.number_of_files as usize
        };
        let mut dir = Vec::with_capacity(capacity);

        inner.seek(io::SeekFrom::Start(
            counts.base_offset + counts.directory_offset,
        ))?;

        // The trailer's record count is truncated to 16 bits, so read headers
        // until a bad one turns up and only fail if the count modulo 2^16
        // disagrees with what was read.
        let err = loop {
            match read_central_header(&mut inner) {
                Ok(entry) => dir.push(entry),
                Err(e @ ZipError::InvalidArchive(_)) => break e,
                Err(ZipError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break ZipError::Io(e)
                }
                Err(e) => return Err(e),
            }
        };
        if dir.len() as u16 != counts.number_of_files as u16 {
            return Err(err);
        }

        for entry in &dir {
            validate_name(&entry.header.name)?;
        }

        inner.seek(io::SeekFrom::Start(
            counts.base_offset + counts.directory_offset,
        ))?;
        let mut inner = CountWriter::new(inner);
        inner.set_count(counts.directory_offset);

        Ok(Updater {
            inner,
            dir,
            compressors: HashMap::new(),
            comment: footer.zip_file_comment,
            closed: false,
            base_offset: counts.base_offset,
            dir_offset: counts.directory_offset,
            initial_len,
        })
    }

    /// Starts an updater over a store that holds no archive yet.
    ///
    /// This is the degenerate open: an empty index with the insertion point
    /// at position zero. Closing without appends produces a valid empty
    /// archive.
    pub fn create(mut inner: F) -> ZipResult<Updater<F>> {
        let initial_len = inner.seek(io::SeekFrom::End(0))?;
        inner.seek(io::SeekFrom::Start(0))?;

        Ok(Updater {
            inner: CountWriter::new(inner),
            dir: Vec::new(),
            compressors: HashMap::new(),
            comment: Vec::new(),
            closed: false,
            base_offset: 0,
            dir_offset: 0,
            initial_len,
        })
    }

    /// Snapshot of the current index, in the order entries will appear in the
    /// rewritten central directory.
    pub fn directory(&self) -> Vec<Directory> {
        self.dir
            .iter()
            .map(|entry| Directory {
                name: entry.header.name.clone(),
                mode: entry.header.unix_mode().unwrap_or(0),
                offset: entry.offset,
            })
            .collect()
    }

    /// Length of the non-ZIP prefix in front of the archive proper, e.g. a
    /// self-extraction script. Zero for plain archives.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// The current insertion point for tail appends, relative to the archive
    /// base. This is also where the central directory will be written.
    pub fn dir_offset(&self) -> u64 {
        self.dir_offset
    }

    /// Offset of the last index entry's local header.
    pub fn last_header_offset(&self) -> ZipResult<u64> {
        match self.dir.last() {
            Some(entry) => Ok(entry.offset),
            None => Err(ZipError::InvalidArchive("archive has no entries")),
        }
    }

    /// Byte range of the last entry's payload, as recorded in its local
    /// header: the payload's start offset and the 32-bit compressed size
    /// field. Entries finalized through a data descriptor store zero there.
    pub fn last_file_offset(&mut self) -> ZipResult<(u64, u64)> {
        let offset = self.last_header_offset()?;
        let position = self.inner.count();

        let file = self.inner.get_mut();
        file.seek(io::SeekFrom::Start(self.base_offset + offset))?;
        if file.read_u32()? != spec::LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ZipError::InvalidArchive("Invalid local file header"));
        }
        // versions, flags, method, mod time and date, crc32
        let mut skipped = [0; 14];
        file.read_exact(&mut skipped)?;
        let compressed_size = file.read_u32()? as u64;
        let _uncompressed_size = file.read_u32()?;
        let file_name_length = file.read_u16()? as u64;
        let extra_field_length = file.read_u16()? as u64;

        file.seek(io::SeekFrom::Start(self.base_offset + position))?;
        Ok((
            offset + spec::LOCAL_FILE_HEADER_LEN + file_name_length + extra_field_length,
            compressed_size,
        ))
    }

    /// Registers a compressor factory for a method id, overriding any
    /// built-in codec with the same id for subsequent appends.
    pub fn register_compressor(&mut self, method: CompressionMethod, factory: CompressorFactory<F>) {
        self.compressors.insert(method.into(), factory);
    }

    fn has_compressor(&self, method: CompressionMethod) -> bool {
        self.compressors.contains_key(&u16::from(method)) || method.is_supported()
    }

    /// Sets the archive comment emitted with the trailer on close.
    pub fn set_comment(&mut self, comment: String) -> ZipResult<()> {
        self.set_raw_comment(comment.into_bytes())
    }

    /// Sets the raw bytes of the archive comment. The comment is typically
    /// expected to be encoded in UTF-8.
    pub fn set_raw_comment(&mut self, comment: Vec<u8>) -> ZipResult<()> {
        if comment.len() > spec::ZIP64_ENTRY_THR {
            return Err(ZipError::CommentTooLong);
        }
        self.comment = comment;
        Ok(())
    }

    /// The archive comment as currently held in memory.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Appends a file at the tail with the default compression method.
    ///
    /// The name must be a relative path with forward slashes; a trailing
    /// slash creates a directory entry. The returned writer must be finished
    /// before the updater can be used again.
    pub fn append<S: Into<String>>(&mut self, name: S) -> ZipResult<EntryWriter<'_, F>> {
        self.append_header_at(FileHeader::new(name), AppendTarget::Tail)
    }

    /// Appends a file at the offset of an existing entry, replacing it. See
    /// [`AppendTarget::Offset`].
    pub fn append_at<S: Into<String>>(
        &mut self,
        name: S,
        offset: u64,
    ) -> ZipResult<EntryWriter<'_, F>> {
        self.append_header_at(FileHeader::new(name), AppendTarget::Offset(offset))
    }

    /// Appends a file described by `header`, either strictly at the tail or
    /// replacing the entry of the same name.
    pub fn append_header(
        &mut self,
        header: FileHeader,
        mode: AppendMode,
    ) -> ZipResult<EntryWriter<'_, F>> {
        let target = match mode {
            AppendMode::KeepOriginal => AppendTarget::Tail,
            AppendMode::Overwrite => {
                match self.dir.iter().find(|e| e.header.name == header.name) {
                    Some(entry) => AppendTarget::Offset(entry.offset),
                    None => AppendTarget::Tail,
                }
            }
        };
        self.append_header_at(header, target)
    }

    /// Appends a file described by `header` at an explicit target position.
    ///
    /// The updater takes ownership of the header and may mutate its fields.
    /// An offset target shadows the entry written there and every entry after
    /// it: the index is truncated and the replacement becomes the new last
    /// entry. The replacement's size is unconstrained.
    pub fn append_header_at(
        &mut self,
        mut fh: FileHeader,
        target: AppendTarget,
    ) -> ZipResult<EntryWriter<'_, F>> {
        let is_dir = fh.is_dir();
        if !is_dir && !self.has_compressor(fh.method) {
            return Err(ZipError::UnsupportedAlgorithm(fh.method.into()));
        }
        validate_name(&fh.name)?;

        let offset = match target {
            AppendTarget::Tail => self.dir_offset,
            AppendTarget::Offset(offset) => {
                if offset > self.dir_offset {
                    return Err(ZipError::InvalidArchive(
                        "append offset beyond central directory",
                    ));
                }
                offset
            }
        };

        // Everything at or past the target is shadowed by the replacement.
        if let Some(idx) = self.dir.iter().position(|e| e.offset >= offset) {
            self.dir.truncate(idx);
        }

        self.inner
            .get_mut()
            .seek(io::SeekFrom::Start(self.base_offset + offset))?;
        self.inner.set_count(offset);

        // CP-437 is the official fallback encoding for names and comments, so
        // the UTF-8 flag is only set when a field actually needs multibyte
        // encoding and the caller did not opt out.
        if fh.non_utf8 {
            fh.flags &= !0x800;
        } else if needs_utf8_encoding(&fh.name) || needs_utf8_encoding(&fh.comment) {
            fh.flags |= 0x800;
        }

        fh.creator_version = fh.creator_version & 0xff00 | spec::VERSION_NEEDED_DEFAULT;
        fh.reader_version = spec::VERSION_NEEDED_DEFAULT;

        #[cfg(feature = "time")]
        if let Some(modified) = fh.modified {
            // The MS-DOS pair is derived from the timestamp as given, without
            // normalizing to UTC: legacy readers interpret it in local time,
            // so the timezone the caller picked is retained.
            fh.last_modified_time = modified.try_into().unwrap_or_default();

            let mut block = [0u8; 9];
            let mut eb = &mut block[..];
            eb.write_u16(spec::EXTENDED_TIMESTAMP_ID)?;
            eb.write_u16(5)?;
            eb.write_u8(1)?; // only the modification time is present
            eb.write_u32(modified.unix_timestamp().max(0) as u32)?;
            fh.extra.extend_from_slice(&block);
        }

        if is_dir {
            // Size fields must be truly zero for directories, which only
            // Store guarantees; nothing follows the header.
            fh.method = CompressionMethod::STORE;
            fh.flags &= !0x8;
            fh.crc32 = 0;
            fh.compressed_size = 0;
            fh.uncompressed_size = 0;
        } else {
            fh.flags |= 0x8; // sizes go into a trailing data descriptor
        }

        self.dir.push(Entry { header: fh, offset });

        let Updater {
            inner,
            dir,
            compressors,
            dir_offset,
            ..
        } = self;
        let entry = dir.last_mut().unwrap();

        write_local_header(inner, &entry.header)?;
        let data_start = inner.count();

        let sink = if is_dir {
            EntrySink::Directory(inner)
        } else if let Some(factory) = compressors.get(&u16::from(entry.header.method)) {
            EntrySink::Custom(factory(inner, entry.header.compression_level)?)
        } else {
            EntrySink::Builtin(
                entry
                    .header
                    .method
                    .compress(inner, entry.header.compression_level),
            )
        };

        Ok(EntryWriter {
            writer: CountWriter::new(Crc32Writer::new(sink)),
            entry,
            dir_offset,
            data_start,
        })
    }

    /// Flushes the backing store.
    ///
    /// This does not make the archive valid; only [`Updater::close`] does.
    pub fn flush(&mut self) -> ZipResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Writes the central directory and the archive trailer, then flushes the
    /// store and drops any stale bytes past the new end.
    ///
    /// Closing twice is an error.
    pub fn close(&mut self) -> ZipResult<()> {
        if self.closed {
            return Err(ZipError::ClosedTwice);
        }
        self.closed = true;

        {
            let Updater {
                inner,
                dir,
                comment,
                ..
            } = &mut *self;

            let start = inner.count();
            for entry in dir.iter_mut() {
                write_central_header(inner, entry)?;
            }
            let end = inner.count();

            let records = dir.len() as u64;
            let size = end - start;
            let offset = start;

            if records >= spec::ZIP64_ENTRY_THR as u64
                || size >= spec::ZIP64_BYTES_THR
                || offset >= spec::ZIP64_BYTES_THR
            {
                spec::Zip64CentralDirectoryEnd {
                    version_made_by: spec::VERSION_NEEDED_ZIP64,
                    version_needed_to_extract: spec::VERSION_NEEDED_ZIP64,
                    disk_number: 0,
                    disk_with_central_directory: 0,
                    number_of_files_on_this_disk: records,
                    number_of_files: records,
                    central_directory_size: size,
                    central_directory_offset: offset,
                }
                .write_to(inner)?;

                spec::Zip64CentralDirectoryEndLocator {
                    disk_with_central_directory: 0,
                    end_of_central_directory_offset: end,
                    number_of_disks: 1,
                }
                .write_to(inner)?;
            }

            // Sentinel values in the regular record signal that the ZIP64
            // values are authoritative.
            let records_16 = records.min(spec::ZIP64_ENTRY_THR as u64) as u16;
            spec::CentralDirectoryEnd {
                disk_number: 0,
                disk_with_central_directory: 0,
                number_of_files_on_this_disk: records_16,
                number_of_files: records_16,
                central_directory_size: size.min(spec::ZIP64_BYTES_THR) as u32,
                central_directory_offset: offset.min(spec::ZIP64_BYTES_THR) as u32,
                zip_file_comment: comment.clone(),
            }
            .write_to(inner)?;
        }

        let end = self.base_offset + self.inner.count();
        if end < self.initial_len {
            self.inner.get_mut().truncate(end)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Unwraps the backing store.
    ///
    /// The archive is only valid if [`Updater::close`] completed beforehand.
    pub fn into_inner(self) -> F {
        self.inner.into_inner()
    }
}

// Names must be slash-separated relative paths; the format specification
// calls for forward slashes, so any backslash is considered insecure.
fn validate_name(name: &str) -> ZipResult<()> {
    if name.is_empty() {
        // The format permits an empty file name field.
        return Ok(());
    }
    if name.contains('\\') || name.starts_with('/') || name.split('/').any(|part| part == "..") {
        return Err(ZipError::InsecurePath);
    }
    Ok(())
}

fn write_local_header<W: Write>(writer: &mut W, header: &FileHeader) -> ZipResult<()> {
    if header.name.len() > spec::ZIP64_ENTRY_THR {
        return Err(ZipError::InvalidArchive("file name too long"));
    }
    if header.extra.len() > spec::ZIP64_ENTRY_THR {
        return Err(ZipError::InvalidArchive("extra data too long"));
    }

    writer.write_u32(spec::LOCAL_FILE_HEADER_SIGNATURE)?;
    writer.write_u16(header.reader_version)?;
    writer.write_u16(header.flags)?;
    writer.write_u16(header.method.into())?;
    writer.write_u16(header.last_modified_time.timepart())?;
    writer.write_u16(header.last_modified_time.datepart())?;
    if header.flags & 0x8 != 0 {
        // Unknown until the data descriptor is written.
        writer.write_u32(0)?;
        writer.write_u32(0)?;
        writer.write_u32(0)?;
    } else {
        writer.write_u32(header.crc32)?;
        writer.write_u32(header.compressed_size as u32)?;
        writer.write_u32(header.uncompressed_size as u32)?;
    }
    writer.write_u16(header.name.len() as u16)?;
    writer.write_u16(header.extra.len() as u16)?;
    writer.write_all(header.name.as_bytes())?;
    writer.write_all(&header.extra)?;
    Ok(())
}

fn write_central_header<W: Write>(writer: &mut W, entry: &mut Entry) -> ZipResult<()> {
    let zip64 = entry.header.is_zip64() || entry.offset >= spec::ZIP64_BYTES_THR;
    if zip64 {
        // Refresh the ZIP64 block in place of whatever an earlier rewrite
        // left behind, so repeated update cycles stay canonical.
        strip_zip64_extra(&mut entry.header.extra);

        let mut block = [0u8; 28];
        let mut eb = &mut block[..];
        eb.write_u16(spec::ZIP64_EXTRA_FIELD_ID)?;
        eb.write_u16(24)?;
        eb.write_u64(entry.header.uncompressed_size)?;
        eb.write_u64(entry.header.compressed_size)?;
        eb.write_u64(entry.offset)?;
        entry.header.extra.extend_from_slice(&block);
    }

    let header = &entry.header;
    if header.comment.len() > spec::ZIP64_ENTRY_THR {
        return Err(ZipError::InvalidArchive("entry comment too long"));
    }

    writer.write_u32(spec::CENTRAL_DIRECTORY_HEADER_SIGNATURE)?;
    writer.write_u16(header.creator_version)?;
    writer.write_u16(header.reader_version)?;
    writer.write_u16(header.flags)?;
    writer.write_u16(header.method.into())?;
    writer.write_u16(header.last_modified_time.timepart())?;
    writer.write_u16(header.last_modified_time.datepart())?;
    writer.write_u32(header.crc32)?;
    if zip64 {
        // Sentinels; the authoritative sizes live in the extra block.
        writer.write_u32(u32::MAX)?;
        writer.write_u32(u32::MAX)?;
    } else {
        writer.write_u32(header.compressed_size as u32)?;
        writer.write_u32(header.uncompressed_size as u32)?;
    }
    writer.write_u16(header.name.len() as u16)?;
    writer.write_u16(header.extra.len() as u16)?;
    writer.write_u16(header.comment.len() as u16)?;
    writer.write_u16(0)?; // disk number start
    writer.write_u16(0)?; // internal file attributes
    writer.write_u32(header.external_attrs)?;
    if entry.offset >= spec::ZIP64_BYTES_THR {
        writer.write_u32(u32::MAX)?;
    } else {
        writer.write_u32(entry.offset as u32)?;
    }
    writer.write_all(header.name.as_bytes())?;
    writer.write_all(&header.extra)?;
    writer.write_all(header.comment.as_bytes())?;
    Ok(())
}

// Drops any existing ZIP64 block; a fresh one is appended at every rewrite.
fn strip_zip64_extra(extra: &mut Vec<u8>) {
    let mut out = Vec::with_capacity(extra.len());
    let mut rest = &extra[..];
    while rest.len() >= 4 {
        let kind = u16::from_le_bytes([rest[0], rest[1]]);
        let len = u16::from_le_bytes([rest[2], rest[3]]) as usize;
        if rest.len() < 4 + len {
            break; // malformed tail, keep it verbatim
        }
        if kind != spec::ZIP64_EXTRA_FIELD_ID {
            out.extend_from_slice(&rest[..4 + len]);
        }
        rest = &rest[4 + len..];
    }
    out.extend_from_slice(rest);
    *extra = out;
}

enum EntrySink<'a, F: Write> {
    Builtin(Compressor<&'a mut CountWriter<F>>),
    Custom(Box<dyn Encoder<&'a mut CountWriter<F>> + 'a>),
    Directory(&'a mut CountWriter<F>),
}

impl<'a, F: Write> EntrySink<'a, F> {
    fn finish(self) -> io::Result<&'a mut CountWriter<F>> {
        match self {
            EntrySink::Builtin(compressor) => compressor.finish(),
            EntrySink::Custom(encoder) => encoder.finish(),
            EntrySink::Directory(inner) => Ok(inner),
        }
    }
}

impl<F: Write> Write for EntrySink<'_, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EntrySink::Builtin(w) => w.write(buf),
            EntrySink::Custom(w) => w.write(buf),
            EntrySink::Directory(_) => {
                if buf.is_empty() {
                    Ok(0)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "directory entries take no data",
                    ))
                }
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EntrySink::Builtin(w) => w.flush(),
            EntrySink::Custom(w) => w.flush(),
            EntrySink::Directory(w) => w.flush(),
        }
    }
}

/// Streaming writer for one appended entry.
///
/// Raw bytes written here run through the CRC32 accumulator and the entry's
/// codec into the archive. [`EntryWriter::finish`] completes the entry; the
/// writer mutably borrows the updater, so no second entry can be started and
/// the archive cannot be closed while one is outstanding.
pub struct EntryWriter<'a, F: Write> {
    writer: CountWriter<Crc32Writer<EntrySink<'a, F>>>,
    entry: &'a mut Entry,
    dir_offset: &'a mut u64,
    data_start: u64,
}

impl<F: Write> EntryWriter<'_, F> {
    /// Completes the entry: flushes the codec, writes the data descriptor and
    /// records the payload's CRC32 and sizes on the index.
    pub fn finish(self) -> ZipResult<()> {
        let EntryWriter {
            writer,
            entry,
            dir_offset,
            data_start,
        } = self;

        let uncompressed_size = writer.count();
        let crc_writer = writer.into_inner();
        let crc32 = crc_writer.finalize();
        let inner = crc_writer.into_inner().finish()?;

        if entry.header.is_dir() {
            // No payload and no descriptor; the header said it all.
            *dir_offset = inner.count();
            return Ok(());
        }

        let compressed_size = inner.count() - data_start;
        let header = &mut entry.header;
        header.crc32 = crc32;
        header.compressed_size = compressed_size;
        header.uncompressed_size = uncompressed_size;

        inner.write_u32(spec::DATA_DESCRIPTOR_SIGNATURE)?;
        inner.write_u32(crc32)?;
        if header.is_zip64() {
            header.reader_version = spec::VERSION_NEEDED_ZIP64;
            inner.write_u64(compressed_size)?;
            inner.write_u64(uncompressed_size)?;
        } else {
            inner.write_u32(compressed_size as u32)?;
            inner.write_u32(uncompressed_size as u32)?;
        }

        *dir_offset = inner.count();
        Ok(())
    }
}

impl<F: Write> Write for EntryWriter<'_, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
