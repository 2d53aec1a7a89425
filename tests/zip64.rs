use std::io::Cursor;
use zipup::{AppendMode, CompressionMethod, FileHeader, Updater, ZipArchive};

// An archive holding the maximum 16-bit entry count must grow a ZIP64
// trailer, with the sentinel counts in the regular end record.
#[test]
fn many_entries_use_zip64_trailer() {
    let mut updater = Updater::create(Cursor::new(Vec::new())).unwrap();
    for i in 0..0xffffu32 {
        let header = FileHeader {
            name: format!("e{i:05x}"),
            method: CompressionMethod::STORE,
            ..Default::default()
        };
        let file = updater
            .append_header(header, AppendMode::KeepOriginal)
            .unwrap();
        file.finish().unwrap();
    }
    updater.close().unwrap();
    let bytes = updater.into_inner().into_inner();

    let n = bytes.len();
    let eocd = &bytes[n - 22..];
    assert_eq!(&eocd[..4], &[0x50, 0x4b, 0x05, 0x06]);
    assert_eq!(&eocd[8..10], &[0xff, 0xff]);
    assert_eq!(&eocd[10..12], &[0xff, 0xff]);

    let locator = &bytes[n - 22 - 20..n - 22];
    assert_eq!(&locator[..4], &[0x50, 0x4b, 0x06, 0x07]);
    let end64 = &bytes[n - 22 - 20 - 56..n - 22 - 20];
    assert_eq!(&end64[..4], &[0x50, 0x4b, 0x06, 0x06]);

    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 0xffff);
    assert_eq!(archive.by_index(0x1234).unwrap().name(), "e01234");
    assert_eq!(archive.by_index(0xfffe).unwrap().name(), "e0fffe");
}
