use quickcheck_macros::quickcheck;
use std::io::{Cursor, Write};
use zipup::{AppendMode, AppendTarget, CompressionMethod, FileHeader, Updater, ZipArchive};

fn store_header(name: String) -> FileHeader {
    FileHeader {
        name,
        method: CompressionMethod::STORE,
        ..Default::default()
    }
}

// Any sequence of appends, overwrites of the last entry and comment updates,
// followed by a close, must produce an archive the reader accepts, with
// exactly the surviving entries.
#[quickcheck]
fn random_update_sequences_stay_readable(ops: Vec<(u8, Vec<u8>)>) -> bool {
    let mut updater = Updater::create(Cursor::new(Vec::new())).unwrap();
    let mut expected: Vec<(String, Vec<u8>)> = Vec::new();
    let mut comment = Vec::new();
    let mut serial = 0usize;

    for (op, data) in ops {
        match op % 3 {
            0 => {
                let name = format!("file-{serial}");
                serial += 1;
                let mut file = updater
                    .append_header(store_header(name.clone()), AppendMode::KeepOriginal)
                    .unwrap();
                file.write_all(&data).unwrap();
                file.finish().unwrap();
                expected.push((name, data));
            }
            1 => {
                if expected.is_empty() {
                    continue;
                }
                let offset = updater.last_header_offset().unwrap();
                let name = format!("file-{serial}");
                serial += 1;
                let mut file = updater
                    .append_header_at(store_header(name.clone()), AppendTarget::Offset(offset))
                    .unwrap();
                file.write_all(&data).unwrap();
                file.finish().unwrap();
                expected.pop();
                expected.push((name, data));
            }
            _ => {
                if updater.set_raw_comment(data.clone()).is_ok() {
                    comment = data;
                }
            }
        }
    }

    updater.close().unwrap();
    let mut archive = ZipArchive::new(updater.into_inner()).unwrap();

    if archive.len() != expected.len() || archive.comment() != &comment[..] {
        return false;
    }
    for (i, (name, data)) in expected.iter().enumerate() {
        let file = archive.by_index(i).unwrap();
        if file.name() != name.as_str() {
            return false;
        }
        if archive.by_index(i).unwrap().read_to_end().unwrap() != *data {
            return false;
        }
    }
    true
}

// A closed archive reopened as an updater and closed again without any
// mutation must re-parse to the same index.
#[quickcheck]
fn reopen_without_mutation_preserves_entries(bodies: Vec<Vec<u8>>) -> bool {
    let mut updater = Updater::create(Cursor::new(Vec::new())).unwrap();
    for (i, body) in bodies.iter().enumerate() {
        let mut file = updater
            .append_header(store_header(format!("entry-{i}")), AppendMode::KeepOriginal)
            .unwrap();
        file.write_all(body).unwrap();
        file.finish().unwrap();
    }
    updater.close().unwrap();
    let first = updater.into_inner().into_inner();

    let mut updater = Updater::new(Cursor::new(first.clone())).unwrap();
    updater.close().unwrap();
    let second = updater.into_inner().into_inner();

    first == second
}
