//! Wire-format structures at the tail of a ZIP archive.

use crate::result::{ZipError, ZipResult};
use crate::utils::{ReadLE, WriteLE};
use std::io;
use std::io::prelude::*;

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
pub const CENTRAL_DIRECTORY_HEADER_SIGNATURE: u32 = 0x02014b50;
pub const CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06054b50;
pub const ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06064b50;
pub const ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE: u32 = 0x07064b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;

pub const LOCAL_FILE_HEADER_LEN: u64 = 30;
pub const CENTRAL_DIRECTORY_END_LEN: u64 = 22;
pub const ZIP64_CENTRAL_DIRECTORY_END_LEN: u64 = 56;
pub const ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_LEN: u64 = 20;

/// Any size or offset at or above this value is stored as the 0xFFFFFFFF
/// sentinel with the real value in a ZIP64 record.
pub const ZIP64_BYTES_THR: u64 = u32::MAX as u64;
/// Entry counts at or above this value use the 0xFFFF sentinel.
pub const ZIP64_ENTRY_THR: usize = u16::MAX as usize;

pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;
/// Info-ZIP "extended timestamp" extra field.
pub const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

pub const VERSION_NEEDED_DEFAULT: u16 = 20;
pub const VERSION_NEEDED_ZIP64: u16 = 45;

#[derive(Debug)]
pub struct CentralDirectoryEnd {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub number_of_files_on_this_disk: u16,
    pub number_of_files: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub zip_file_comment: Vec<u8>,
}

impl CentralDirectoryEnd {
    pub fn parse<T: Read>(reader: &mut T) -> ZipResult<CentralDirectoryEnd> {
        if reader.read_u32()? != CENTRAL_DIRECTORY_END_SIGNATURE {
            return Err(ZipError::InvalidArchive("Invalid digital signature header"));
        }
        let disk_number = reader.read_u16()?;
        let disk_with_central_directory = reader.read_u16()?;
        let number_of_files_on_this_disk = reader.read_u16()?;
        let number_of_files = reader.read_u16()?;
        let central_directory_size = reader.read_u32()?;
        let central_directory_offset = reader.read_u32()?;
        let zip_file_comment_length = reader.read_u16()? as usize;
        let mut zip_file_comment = vec![0; zip_file_comment_length];
        reader.read_exact(&mut zip_file_comment)?;

        Ok(CentralDirectoryEnd {
            disk_number,
            disk_with_central_directory,
            number_of_files_on_this_disk,
            number_of_files,
            central_directory_size,
            central_directory_offset,
            zip_file_comment,
        })
    }

    /// Searches backward from the end of the reader for the end-of-central-directory
    /// record. Returns the record and the position its signature was found at.
    ///
    /// The record may be preceded by up to 65535 bytes of archive comment, so
    /// the search covers the last `comment_max + 22` bytes of the file.
    pub fn find_and_parse<T: Read + Seek>(reader: &mut T) -> ZipResult<(CentralDirectoryEnd, u64)> {
        let file_length = reader.seek(io::SeekFrom::End(0))?;
        if file_length < CENTRAL_DIRECTORY_END_LEN {
            return Err(ZipError::InvalidArchive("Invalid zip header"));
        }

        let search_lower_bound =
            file_length.saturating_sub(CENTRAL_DIRECTORY_END_LEN + u16::MAX as u64);
        let mut pos = file_length - CENTRAL_DIRECTORY_END_LEN;
        loop {
            reader.seek(io::SeekFrom::Start(pos))?;
            if reader.read_u32()? == CENTRAL_DIRECTORY_END_SIGNATURE {
                reader.seek(io::SeekFrom::Start(pos))?;
                let cde = CentralDirectoryEnd::parse(reader)?;
                return Ok((cde, pos));
            }
            if pos == search_lower_bound {
                return Err(ZipError::InvalidArchive(
                    "Could not find central directory end",
                ));
            }
            pos -= 1;
        }
    }

    pub fn write_to<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32(CENTRAL_DIRECTORY_END_SIGNATURE)?;
        writer.write_u16(self.disk_number)?;
        writer.write_u16(self.disk_with_central_directory)?;
        writer.write_u16(self.number_of_files_on_this_disk)?;
        writer.write_u16(self.number_of_files)?;
        writer.write_u32(self.central_directory_size)?;
        writer.write_u32(self.central_directory_offset)?;
        writer.write_u16(self.zip_file_comment.len() as u16)?;
        writer.write_all(&self.zip_file_comment)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Zip64CentralDirectoryEndLocator {
    pub disk_with_central_directory: u32,
    pub end_of_central_directory_offset: u64,
    pub number_of_disks: u32,
}

impl Zip64CentralDirectoryEndLocator {
    pub fn parse<T: Read>(reader: &mut T) -> ZipResult<Zip64CentralDirectoryEndLocator> {
        if reader.read_u32()? != ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE {
            return Err(ZipError::InvalidArchive(
                "Invalid zip64 locator digital signature header",
            ));
        }
        let disk_with_central_directory = reader.read_u32()?;
        let end_of_central_directory_offset = reader.read_u64()?;
        let number_of_disks = reader.read_u32()?;

        Ok(Zip64CentralDirectoryEndLocator {
            disk_with_central_directory,
            end_of_central_directory_offset,
            number_of_disks,
        })
    }

    pub fn write_to<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32(ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE)?;
        writer.write_u32(self.disk_with_central_directory)?;
        writer.write_u64(self.end_of_central_directory_offset)?;
        writer.write_u32(self.number_of_disks)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Zip64CentralDirectoryEnd {
    pub version_made_by: u16,
    pub version_needed_to_extract: u16,
    pub disk_number: u32,
    pub disk_with_central_directory: u32,
    pub number_of_files_on_this_disk: u64,
    pub number_of_files: u64,
    pub central_directory_size: u64,
    pub central_directory_offset: u64,
}

impl Zip64CentralDirectoryEnd {
    /// Searches forward from `nominal_offset` (the position recorded in the
    /// locator) for the ZIP64 end-of-central-directory record. The distance
    /// between the nominal and actual position is the length of whatever data
    /// is prepended to the archive.
    pub fn find_and_parse<T: Read + Seek>(
        reader: &mut T,
        nominal_offset: u64,
        search_upper_bound: u64,
    ) -> ZipResult<(Zip64CentralDirectoryEnd, u64)> {
        let mut pos = nominal_offset;
        while pos <= search_upper_bound {
            reader.seek(io::SeekFrom::Start(pos))?;
            if reader.read_u32()? == ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE {
                let archive_offset = pos - nominal_offset;

                let _record_size = reader.read_u64()?;
                let version_made_by = reader.read_u16()?;
                let version_needed_to_extract = reader.read_u16()?;
                let disk_number = reader.read_u32()?;
                let disk_with_central_directory = reader.read_u32()?;
                let number_of_files_on_this_disk = reader.read_u64()?;
                let number_of_files = reader.read_u64()?;
                let central_directory_size = reader.read_u64()?;
                let central_directory_offset = reader.read_u64()?;

                return Ok((
                    Zip64CentralDirectoryEnd {
                        version_made_by,
                        version_needed_to_extract,
                        disk_number,
                        disk_with_central_directory,
                        number_of_files_on_this_disk,
                        number_of_files,
                        central_directory_size,
                        central_directory_offset,
                    },
                    archive_offset,
                ));
            }
            pos += 1;
        }
        Err(ZipError::InvalidArchive(
            "Could not find ZIP64 central directory end",
        ))
    }

    pub fn write_to<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32(ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE)?;
        // record length, minus the signature and this length field
        writer.write_u64(ZIP64_CENTRAL_DIRECTORY_END_LEN - 12)?;
        writer.write_u16(self.version_made_by)?;
        writer.write_u16(self.version_needed_to_extract)?;
        writer.write_u32(self.disk_number)?;
        writer.write_u32(self.disk_with_central_directory)?;
        writer.write_u64(self.number_of_files_on_this_disk)?;
        writer.write_u64(self.number_of_files)?;
        writer.write_u64(self.central_directory_size)?;
        writer.write_u64(self.central_directory_offset)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn sample_end(comment: &[u8]) -> CentralDirectoryEnd {
        CentralDirectoryEnd {
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_files_on_this_disk: 3,
            number_of_files: 3,
            central_directory_size: 138,
            central_directory_offset: 501,
            zip_file_comment: comment.to_vec(),
        }
    }

    #[test]
    fn end_record_roundtrip() {
        let mut buf = Vec::new();
        sample_end(b"").write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, CENTRAL_DIRECTORY_END_LEN);

        let (parsed, pos) = CentralDirectoryEnd::find_and_parse(&mut Cursor::new(buf)).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(parsed.number_of_files, 3);
        assert_eq!(parsed.central_directory_size, 138);
        assert_eq!(parsed.central_directory_offset, 501);
    }

    #[test]
    fn end_record_found_behind_comment_and_junk() {
        let mut buf = vec![0x50, 0x4b, 0x17, 0x2a, 0x00];
        let junk = buf.len() as u64;
        sample_end(b"with comment").write_to(&mut buf).unwrap();

        let (parsed, pos) = CentralDirectoryEnd::find_and_parse(&mut Cursor::new(buf)).unwrap();
        assert_eq!(pos, junk);
        assert_eq!(parsed.zip_file_comment, b"with comment");
    }

    #[test]
    fn end_record_missing() {
        let buf = vec![0u8; 1024];
        assert!(matches!(
            CentralDirectoryEnd::find_and_parse(&mut Cursor::new(buf)),
            Err(crate::result::ZipError::InvalidArchive(_))
        ));
    }

    #[test]
    fn zip64_end_found_past_nominal_offset() {
        let end = Zip64CentralDirectoryEnd {
            version_made_by: VERSION_NEEDED_ZIP64,
            version_needed_to_extract: VERSION_NEEDED_ZIP64,
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_files_on_this_disk: 70000,
            number_of_files: 70000,
            central_directory_size: 0x1_0000_0000,
            central_directory_offset: 0x2_0000_0000,
        };
        let mut buf = vec![0xeeu8; 10];
        end.write_to(&mut buf).unwrap();

        // Nominal offset 0 with ten bytes of prefix.
        let (parsed, archive_offset) =
            Zip64CentralDirectoryEnd::find_and_parse(&mut Cursor::new(buf), 0, 32).unwrap();
        assert_eq!(archive_offset, 10);
        assert_eq!(parsed.number_of_files, 70000);
        assert_eq!(parsed.central_directory_offset, 0x2_0000_0000);
    }
}
