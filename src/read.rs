//! Types for reading ZIP archives

use crate::compression::Decompressor;
use crate::crc32::Crc32Reader;
use crate::result::{ZipError, ZipResult};
use crate::spec;
use crate::types::{DateTime, Entry, FileHeader};
use crate::utils::ReadLE;
use std::collections::HashMap;
use std::io::{self, prelude::*};

/// Values of the archive trailer after ZIP64 resolution.
pub(crate) struct DirectoryCounts {
    /// Length of whatever non-ZIP data is prepended to the archive.
    pub(crate) base_offset: u64,
    /// Start of the central directory, relative to `base_offset`.
    pub(crate) directory_offset: u64,
    pub(crate) number_of_files: u64,
}

/// Resolves the trailer: probes for a ZIP64 locator just before the
/// end-of-central-directory record, takes the 64-bit values when one is
/// present, and derives the base offset of prefixed archives.
pub(crate) fn directory_counts<R: Read + Seek>(
    reader: &mut R,
    footer: &spec::CentralDirectoryEnd,
    cde_start_pos: u64,
) -> ZipResult<DirectoryCounts> {
    // The ZIP64 locator, if present, sits immediately before the standard
    // footer.
    let locator = if cde_start_pos >= spec::ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_LEN {
        reader.seek(io::SeekFrom::Start(
            cde_start_pos - spec::ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_LEN,
        ))?;
        match spec::Zip64CentralDirectoryEndLocator::parse(reader) {
            Ok(locator) => Some(locator),
            // No ZIP64 locator; a plain archive.
            Err(ZipError::InvalidArchive(_)) => None,
            Err(e) => return Err(e),
        }
    } else {
        None
    };

    match locator {
        None => {
            // Archives with data prepended record offsets that are all too
            // small. The shift is the difference between where the central
            // directory should have ended and where the footer actually is.
            let base_offset = cde_start_pos
                .checked_sub(footer.central_directory_size as u64)
                .and_then(|x| x.checked_sub(footer.central_directory_offset as u64))
                .ok_or(ZipError::InvalidArchive(
                    "Invalid central directory size or offset",
                ))?;

            Ok(DirectoryCounts {
                base_offset,
                directory_offset: footer.central_directory_offset as u64,
                number_of_files: footer.number_of_files_on_this_disk as u64,
            })
        }
        Some(locator) => {
            if locator.disk_with_central_directory != 0 || locator.number_of_disks > 1 {
                return Err(ZipError::UnsupportedArchive(
                    "Support for multi-disk files is not implemented",
                ));
            }

            // The locator records where the ZIP64 footer should be, but with
            // prepended data the actual position is shifted by an unknown
            // amount; search forward from the nominal position.
            let search_upper_bound = cde_start_pos
                .checked_sub(
                    spec::ZIP64_CENTRAL_DIRECTORY_END_LEN
                        + spec::ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_LEN,
                )
                .ok_or(ZipError::InvalidArchive(
                    "File cannot contain ZIP64 central directory end",
                ))?;
            let (footer64, base_offset) = spec::Zip64CentralDirectoryEnd::find_and_parse(
                reader,
                locator.end_of_central_directory_offset,
                search_upper_bound,
            )?;

            if footer64.disk_number != footer64.disk_with_central_directory {
                return Err(ZipError::UnsupportedArchive(
                    "Support for multi-disk files is not implemented",
                ));
            }

            Ok(DirectoryCounts {
                base_offset,
                directory_offset: footer64.central_directory_offset,
                number_of_files: footer64.number_of_files,
            })
        }
    }
}

/// Parses one central directory record into an index entry.
///
/// The entry's offset is the value stored in the record (relative to the
/// archive base), after ZIP64 resolution.
pub(crate) fn read_central_header<R: Read>(reader: &mut R) -> ZipResult<Entry> {
    if reader.read_u32()? != spec::CENTRAL_DIRECTORY_HEADER_SIGNATURE {
        return Err(ZipError::InvalidArchive("Invalid Central Directory header"));
    }

    let creator_version = reader.read_u16()?;
    let reader_version = reader.read_u16()?;
    let flags = reader.read_u16()?;
    let method = reader.read_u16()?.into();
    let last_mod_time = reader.read_u16()?;
    let last_mod_date = reader.read_u16()?;
    let crc32 = reader.read_u32()?;
    let mut compressed_size = reader.read_u32()? as u64;
    let mut uncompressed_size = reader.read_u32()? as u64;
    let file_name_length = reader.read_u16()? as usize;
    let extra_field_length = reader.read_u16()? as usize;
    let file_comment_length = reader.read_u16()? as usize;
    let _disk_number = reader.read_u16()?;
    let _internal_attributes = reader.read_u16()?;
    let external_attrs = reader.read_u32()?;
    let mut offset = reader.read_u32()? as u64;

    let mut file_name_raw = vec![0; file_name_length];
    reader.read_exact(&mut file_name_raw)?;
    let mut extra = vec![0; extra_field_length];
    reader.read_exact(&mut extra)?;
    let mut file_comment_raw = vec![0; file_comment_length];
    reader.read_exact(&mut file_comment_raw)?;

    match parse_zip64_extra(&extra, &mut uncompressed_size, &mut compressed_size, &mut offset) {
        // A short or malformed extra field is ignored, as other readers do.
        Ok(()) | Err(ZipError::Io(..)) => {}
        Err(e) => return Err(e),
    }

    let header = FileHeader {
        name: String::from_utf8_lossy(&file_name_raw).into_owned(),
        method,
        compression_level: None,
        flags,
        non_utf8: false,
        creator_version,
        reader_version,
        last_modified_time: DateTime::from_msdos(last_mod_date, last_mod_time),
        #[cfg(feature = "time")]
        modified: None,
        crc32,
        compressed_size,
        uncompressed_size,
        external_attrs,
        extra,
        comment: String::from_utf8_lossy(&file_comment_raw).into_owned(),
    };

    Ok(Entry { header, offset })
}

/// Replaces sentinel sizes and offsets with the 64-bit values from the ZIP64
/// extended information extra field, when one is present.
fn parse_zip64_extra(
    extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    offset: &mut u64,
) -> ZipResult<()> {
    let mut reader = io::Cursor::new(extra);

    while (reader.position() as usize) < extra.len() {
        let kind = reader.read_u16()?;
        let len = reader.read_u16()?;
        let mut len_left = len as i64;
        if kind == spec::ZIP64_EXTRA_FIELD_ID {
            // Fields are only present when the corresponding 32-bit value is
            // the sentinel, in this fixed order.
            if *uncompressed_size == spec::ZIP64_BYTES_THR {
                *uncompressed_size = reader.read_u64()?;
                len_left -= 8;
            }
            if *compressed_size == spec::ZIP64_BYTES_THR {
                *compressed_size = reader.read_u64()?;
                len_left -= 8;
            }
            if *offset == spec::ZIP64_BYTES_THR {
                *offset = reader.read_u64()?;
                len_left -= 8;
            }
        }
        if len_left > 0 {
            reader.seek(io::SeekFrom::Current(len_left))?;
        }
    }
    Ok(())
}

/// ZIP archive reader.
///
/// Entries are collected from the central directory record once, on open;
/// local file headers are only consulted to locate payload data.
///
/// ```no_run
/// use std::io::prelude::*;
/// fn list_zip_contents(reader: impl BufRead + Seek) -> zipup::ZipResult<()> {
///     let mut zip = zipup::ZipArchive::new(reader)?;
///
///     for i in 0..zip.len() {
///         let file = zip.by_index(i)?;
///         println!("Filename: {}", file.name());
///     }
///
///     Ok(())
/// }
/// ```
pub struct ZipArchive<R> {
    reader: R,
    files: Vec<Entry>,
    names_map: HashMap<String, usize>,
    base_offset: u64,
    comment: Vec<u8>,
}

impl<R: BufRead + Seek> ZipArchive<R> {
    /// Read a ZIP archive, collecting the files it contains
    pub fn new(mut reader: R) -> ZipResult<ZipArchive<R>> {
        let (footer, cde_start_pos) = spec::CentralDirectoryEnd::find_and_parse(&mut reader)?;

        if footer.disk_number != footer.disk_with_central_directory {
            return Err(ZipError::UnsupportedArchive(
                "Support for multi-disk files is not implemented",
            ));
        }

        let counts = directory_counts(&mut reader, &footer, cde_start_pos)?;

        // A malformed record count can be absurdly large; don't trust it for
        // preallocation unless the file could actually hold that many headers.
        let file_capacity = if counts.number_of_files > cde_start_pos / spec::LOCAL_FILE_HEADER_LEN
        {
            0
        } else {
            counts.number_of_files as usize
        };

        let mut files = Vec::with_capacity(file_capacity);
        let mut names_map = HashMap::with_capacity(file_capacity);

        reader.seek(io::SeekFrom::Start(
            counts.base_offset + counts.directory_offset,
        ))?;
        for _ in 0..counts.number_of_files {
            let entry = read_central_header(&mut reader)?;
            names_map.insert(entry.header.name.clone(), files.len());
            files.push(entry);
        }

        Ok(ZipArchive {
            reader,
            files,
            names_map,
            base_offset: counts.base_offset,
            comment: footer.zip_file_comment,
        })
    }

    /// Number of files contained in this zip.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this zip archive contains no files
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the offset from the beginning of the underlying reader that this
    /// zip begins at, in bytes.
    ///
    /// Normally this value is zero, but if the zip has arbitrary data
    /// prepended to it, then this value will be the size of that prepended
    /// data.
    pub fn offset(&self) -> u64 {
        self.base_offset
    }

    /// Get the comment of the zip archive.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Returns an iterator over all the file and directory names in this
    /// archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.names_map.keys().map(|s| s.as_str())
    }

    /// Search for a file entry by name
    pub fn by_name(&mut self, name: &str) -> ZipResult<ZipFile<'_, R>> {
        let index = match self.names_map.get(name) {
            Some(index) => *index,
            None => return Err(ZipError::FileNotFound),
        };
        self.by_index(index)
    }

    /// Get a contained file by index
    pub fn by_index(&mut self, file_number: usize) -> ZipResult<ZipFile<'_, R>> {
        let entry = self.files.get(file_number).ok_or(ZipError::FileNotFound)?;

        Ok(ZipFile {
            entry,
            base_offset: self.base_offset,
            reader: &mut self.reader,
        })
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// A single file entry of an archive.
pub struct ZipFile<'a, R> {
    entry: &'a Entry,
    base_offset: u64,
    reader: &'a mut R,
}

/// Methods for retrieving information on zip files
impl<R> ZipFile<'_, R> {
    /// Get the name of the file
    pub fn name(&self) -> &str {
        &self.entry.header.name
    }

    /// Get the comment of the file
    pub fn comment(&self) -> &str {
        &self.entry.header.comment
    }

    /// Get the compression method used to store the file
    pub fn compression_method(&self) -> crate::compression::CompressionMethod {
        self.entry.header.method
    }

    /// Get the size of the file, in bytes, in the archive
    pub fn compressed_size(&self) -> u64 {
        self.entry.header.compressed_size
    }

    /// Get the size of the file, in bytes, when uncompressed
    pub fn size(&self) -> u64 {
        self.entry.header.uncompressed_size
    }

    /// Get the time the file was last modified
    pub fn last_modified(&self) -> DateTime {
        self.entry.header.last_modified_time
    }

    /// Returns whether the file is actually a directory
    pub fn is_dir(&self) -> bool {
        self.entry.header.is_dir()
    }

    /// Returns whether the file is a regular file
    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Get unix mode for the file
    pub fn unix_mode(&self) -> Option<u32> {
        self.entry.header.unix_mode()
    }

    /// Get the CRC32 hash of the original file
    pub fn crc32(&self) -> u32 {
        self.entry.header.crc32
    }

    /// Get the extra data of the zip header for this file
    pub fn extra_data(&self) -> &[u8] {
        &self.entry.header.extra
    }

    /// Get the starting offset of the local header for this file, relative to
    /// the archive base.
    pub fn header_offset(&self) -> u64 {
        self.entry.offset
    }
}

impl<'a, R> ZipFile<'a, R>
where
    R: BufRead + Seek,
{
    /// Positions the reader at the first byte of the entry's payload by
    /// decoding the local file header's variable-length fields.
    fn seek_to_data(&mut self) -> ZipResult<()> {
        self.reader.seek(io::SeekFrom::Start(
            self.base_offset + self.entry.offset,
        ))?;
        if self.reader.read_u32()? != spec::LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ZipError::InvalidArchive("Invalid local file header"));
        }

        let mut fixed = [0; 22];
        self.reader.read_exact(&mut fixed)?;
        let file_name_length = self.reader.read_u16()? as i64;
        let extra_field_length = self.reader.read_u16()? as i64;
        self.reader
            .seek(io::SeekFrom::Current(file_name_length + extra_field_length))?;
        Ok(())
    }

    /// Returns a reader that decompresses the payload and validates its CRC32.
    pub fn reader(mut self) -> ZipResult<ZipFileReader<'a>> {
        let header = &self.entry.header;
        if !header.method.is_supported() {
            return Err(ZipError::UnsupportedArchive(
                "Compression method not supported",
            ));
        }

        self.seek_to_data()?;

        let limited = (self.reader as &mut dyn BufRead).take(header.compressed_size);
        let inner = header.method.decompress(limited);
        Ok(ZipFileReader {
            reader: Crc32Reader::new(inner, header.crc32),
        })
    }

    /// Returns a reader over the raw, still-compressed payload bytes.
    pub fn raw_reader(mut self) -> ZipResult<io::Take<&'a mut dyn BufRead>> {
        let compressed_size = self.entry.header.compressed_size;
        self.seek_to_data()?;
        Ok((self.reader as &mut dyn BufRead).take(compressed_size))
    }

    /// Decompresses the whole payload into memory.
    pub fn read_to_end(self) -> ZipResult<Vec<u8>> {
        let mut content = Vec::with_capacity(self.entry.header.uncompressed_size as usize);
        let mut reader = self.reader()?;
        reader.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// A decompressing, CRC-validating reader over one entry's payload.
pub struct ZipFileReader<'a> {
    reader: Crc32Reader<Decompressor<io::Take<&'a mut dyn BufRead>>>,
}

impl io::Read for ZipFileReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.reader.read_to_end(buf)
    }

    fn read_to_string(&mut self, buf: &mut String) -> io::Result<usize> {
        self.reader.read_to_string(buf)
    }
}
