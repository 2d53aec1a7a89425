//! Types that represent an entry's metadata within a ZIP archive.

use crate::compression::CompressionMethod;
use crate::result::DateTimeRangeError;

/// System of origin, taken from the high byte of the "version made by" field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum System {
    /// MS-DOS or OS/2
    Dos = 0,
    /// Unix
    Unix = 3,
    /// Any other value
    Unknown,
}

impl System {
    pub(crate) fn from_u8(system: u8) -> System {
        match system {
            0 => System::Dos,
            3 => System::Unix,
            _ => System::Unknown,
        }
    }
}

/// An MS-DOS timestamp, with two-second resolution.
///
/// This is the representation stored in local and central file headers. Years
/// before 1980 and after 2107 cannot be represented.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Default for DateTime {
    /// Constructs an 'default' datetime of 1980-01-01 00:00:00
    fn default() -> DateTime {
        DateTime {
            year: 1980,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    /// Converts an msdos (u16, u16) pair to a DateTime object
    pub fn from_msdos(datepart: u16, timepart: u16) -> DateTime {
        let seconds = (timepart & 0b0000000000011111) << 1;
        let minutes = (timepart & 0b0000011111100000) >> 5;
        let hours = (timepart & 0b1111100000000000) >> 11;
        let days = datepart & 0b0000000000011111;
        let months = (datepart & 0b0000000111100000) >> 5;
        let years = (datepart & 0b1111111000000000) >> 9;

        DateTime {
            year: years + 1980,
            month: months as u8,
            day: days as u8,
            hour: hours as u8,
            minute: minutes as u8,
            second: seconds as u8,
        }
    }

    /// Constructs a DateTime from a specific date and time
    ///
    /// The bounds are:
    /// * year: [1980, 2107]
    /// * month: [1, 12]
    /// * day: [1, 31]
    /// * hour: [0, 23]
    /// * minute: [0, 59]
    /// * second: [0, 60]
    pub fn from_date_and_time(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<DateTime, DateTimeRangeError> {
        if (1980..=2107).contains(&year)
            && (1..=12).contains(&month)
            && (1..=31).contains(&day)
            && hour <= 23
            && minute <= 59
            && second <= 60
        {
            Ok(DateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
            })
        } else {
            Err(DateTimeRangeError)
        }
    }

    /// Gets the time portion of this datetime in the msdos representation
    pub fn timepart(&self) -> u16 {
        ((self.second as u16) >> 1) | ((self.minute as u16) << 5) | ((self.hour as u16) << 11)
    }

    /// Gets the date portion of this datetime in the msdos representation
    pub fn datepart(&self) -> u16 {
        (self.day as u16) | ((self.month as u16) << 5) | ((self.year - 1980) << 9)
    }

    /// Get the year. There is no epoch, i.e. 2018 will be returned as 2018.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Get the month, where 1 = january and 12 = december
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Get the day
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Get the hour
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Get the minute
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Get the second
    pub fn second(&self) -> u8 {
        self.second
    }
}

#[cfg(feature = "time")]
impl TryFrom<time::OffsetDateTime> for DateTime {
    type Error = DateTimeRangeError;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        DateTime::from_date_and_time(
            dt.year().try_into().map_err(|_| DateTimeRangeError)?,
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }
}

/// Metadata of a single archive entry.
///
/// This is both the record parsed out of an existing central directory and
/// the per-entry configuration passed to the append operations. Appending
/// takes the header by value; the updater owns it afterwards and may mutate
/// its fields (flags, versions, sizes, extra data).
#[derive(Clone, Debug)]
pub struct FileHeader {
    /// Name of the entry: a relative path with `/` separators. A trailing `/`
    /// marks a directory entry. Backslashes are rejected.
    pub name: String,

    /// Compression method for the entry's payload.
    ///
    /// The default is `CompressionMethod::DEFLATE` when the deflate feature is
    /// enabled, `CompressionMethod::STORE` otherwise.
    pub method: CompressionMethod,

    /// Compression level passed to the codec. `None` selects the codec's
    /// default level.
    pub compression_level: Option<u32>,

    /// General purpose bit flags. Bit 0x800 (UTF-8) and bit 0x8 (data
    /// descriptor) are managed by the updater.
    pub flags: u16,

    /// Forces the UTF-8 flag to stay cleared even when the name or comment
    /// requires multibyte encoding.
    pub non_utf8: bool,

    /// Full "version made by" field; the high byte is the creator system.
    pub creator_version: u16,

    /// Minimum ZIP version needed to extract the entry.
    pub reader_version: u16,

    /// Modification timestamp in MS-DOS representation.
    pub last_modified_time: DateTime,

    /// High resolution modification timestamp.
    ///
    /// When set it takes precedence over `last_modified_time` and is also
    /// written as an Info-ZIP extended timestamp extra field. It is not
    /// normalized to UTC: legacy readers interpret the MS-DOS fields in local
    /// time, so the timezone the caller picked is retained.
    #[cfg(feature = "time")]
    pub modified: Option<time::OffsetDateTime>,

    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,

    /// Size of the payload as stored in the archive.
    pub compressed_size: u64,

    /// Size of the payload once decompressed.
    pub uncompressed_size: u64,

    /// External attributes; for Unix creators the file mode lives in the high
    /// 16 bits.
    pub external_attrs: u32,

    /// Raw extra field data. ZIP64 and extended timestamp blocks are appended
    /// here as needed; anything else is carried verbatim.
    pub extra: Vec<u8>,

    /// Entry comment.
    pub comment: String,
}

impl Default for FileHeader {
    fn default() -> FileHeader {
        let method = if cfg!(feature = "deflate") {
            CompressionMethod::DEFLATE
        } else {
            CompressionMethod::STORE
        };

        FileHeader {
            name: String::new(),
            method,
            compression_level: None,
            flags: 0,
            non_utf8: false,
            creator_version: crate::spec::VERSION_NEEDED_DEFAULT,
            reader_version: crate::spec::VERSION_NEEDED_DEFAULT,
            last_modified_time: DateTime::default(),
            #[cfg(feature = "time")]
            modified: None,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attrs: 0,
            extra: Vec::new(),
            comment: String::new(),
        }
    }
}

impl FileHeader {
    /// Creates a header for `name` with the default compression method.
    pub fn new<S: Into<String>>(name: S) -> FileHeader {
        FileHeader {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the entry is a directory, i.e. its name ends with `/`.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Whether any size field of this entry requires ZIP64 encoding.
    pub fn is_zip64(&self) -> bool {
        self.compressed_size >= crate::spec::ZIP64_BYTES_THR
            || self.uncompressed_size >= crate::spec::ZIP64_BYTES_THR
    }

    /// System that produced the entry.
    pub fn system(&self) -> System {
        System::from_u8((self.creator_version >> 8) as u8)
    }

    /// Stores a full Unix mode (e.g. `0o100644`, `0o40755`) in the external
    /// attributes and marks the entry as created on Unix.
    pub fn set_unix_mode(&mut self, mode: u32) {
        self.creator_version = (System::Unix as u16) << 8 | (self.creator_version & 0xff);
        self.external_attrs = mode << 16;
        if self.is_dir() {
            self.external_attrs |= 0x10;
        }
        if mode & 0o200 == 0 {
            // no owner write permission: also set the MS-DOS read-only bit
            self.external_attrs |= 0x01;
        }
    }

    /// Unix mode of the entry, if one can be derived from the external
    /// attributes.
    pub fn unix_mode(&self) -> Option<u32> {
        if self.external_attrs == 0 {
            return None;
        }

        match self.system() {
            System::Unix => Some(self.external_attrs >> 16),
            System::Dos => {
                // Interpret the DOS directory and read-only bits.
                let mut mode = if 0x10 & self.external_attrs != 0 {
                    0o40777
                } else {
                    0o100666
                };
                if 0x01 & self.external_attrs != 0 {
                    mode &= 0o100444 | 0o40444;
                }
                Some(mode)
            }
            _ => None,
        }
    }
}

/// An index record: the entry's metadata plus the position of its local file
/// header, relative to the archive base.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) header: FileHeader,
    pub(crate) offset: u64,
}

/// True when encoding `s` needs more than the printable ASCII subset that is
/// shared between CP-437 and UTF-8, so the UTF-8 flag must be set for readers
/// to decode it correctly.
pub(crate) fn needs_utf8_encoding(s: &str) -> bool {
    s.chars().any(|c| !('\x20'..='\x7d').contains(&c) || c == '\\')
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn datetime_default() {
        let dt = DateTime::default();
        assert_eq!(dt.timepart(), 0);
        assert_eq!(dt.datepart(), 0b0000000000100001);
    }

    #[test]
    fn datetime_msdos_roundtrip() {
        let dt = DateTime::from_date_and_time(2018, 8, 15, 20, 45, 6).unwrap();
        let rt = DateTime::from_msdos(dt.datepart(), dt.timepart());
        assert_eq!((rt.year(), rt.month(), rt.day()), (2018, 8, 15));
        assert_eq!((rt.hour(), rt.minute(), rt.second()), (20, 45, 6));
    }

    #[test]
    fn datetime_bounds() {
        assert!(DateTime::from_date_and_time(1979, 1, 1, 0, 0, 0).is_err());
        assert!(DateTime::from_date_and_time(2108, 1, 1, 0, 0, 0).is_err());
        assert!(DateTime::from_date_and_time(2000, 13, 1, 0, 0, 0).is_err());
        assert!(DateTime::from_date_and_time(2000, 1, 1, 24, 0, 0).is_err());
        assert!(DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).is_ok());
        assert!(DateTime::from_date_and_time(2107, 12, 31, 23, 59, 60).is_ok());
    }

    #[cfg(feature = "time")]
    #[test]
    fn datetime_from_time_crate() {
        use time::macros::datetime;

        let dt = DateTime::try_from(datetime!(2020-02-29 12:34:56 UTC)).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2020, 2, 29));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (12, 34, 56));

        assert!(DateTime::try_from(datetime!(1970-01-01 0:00 UTC)).is_err());
    }

    #[test]
    fn utf8_detection() {
        assert!(!needs_utf8_encoding("ascii/name.txt"));
        assert!(needs_utf8_encoding("こんにちわ"));
        assert!(needs_utf8_encoding("tab\tseparated"));
        // a backslash is representable but unsafe to leave ambiguous
        assert!(needs_utf8_encoding("dir\\name"));
        // 0x7e and up are not part of the shared subset
        assert!(needs_utf8_encoding("~tilde"));
    }

    #[test]
    fn unix_mode_roundtrip() {
        let mut header = FileHeader::new("setuid");
        header.set_unix_mode(0o4755 | 0o100000);
        assert_eq!(header.system(), System::Unix);
        assert_eq!(header.unix_mode(), Some(0o104755));
    }
}
