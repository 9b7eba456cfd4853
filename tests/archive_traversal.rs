use std::fs;
use std::path::Path;
use tempfile::tempdir;
use unifs::{Options, UnifsError, extract_archive, list_archive};

// Record builders matching the on-disk layout, so entries the writer would
// never emit can be tested.

fn header(kind: u8, path: &str) -> Vec<u8> {
    let mut bytes = vec![kind];
    bytes.extend_from_slice(&0o644u32.to_le_bytes());
    bytes.extend_from_slice(&0i64.to_le_bytes());
    bytes.extend_from_slice(&(path.len() as u16).to_le_bytes());
    bytes.extend_from_slice(path.as_bytes());
    bytes
}

fn file_record(path: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = header(1, path);
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(payload);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    bytes.extend_from_slice(&hasher.finalize().to_le_bytes());
    bytes
}

fn symlink_record(path: &str, target: &str) -> Vec<u8> {
    let mut bytes = header(2, path);
    bytes.extend_from_slice(&(target.len() as u16).to_le_bytes());
    bytes.extend_from_slice(target.as_bytes());
    bytes
}

fn archive_of(records: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"UNIFSAR1");
    for record in records {
        bytes.extend_from_slice(record);
    }
    bytes.push(0xFF);
    bytes
}

fn write_archive(dir: &Path, bytes: &[u8]) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join("hostile.ufa");
    fs::write(&path, bytes)?;
    Ok(path)
}

fn assert_traversal(err: anyhow::Error) {
    assert!(
        matches!(
            err.downcast_ref::<UnifsError>(),
            Some(UnifsError::PathTraversal { .. })
        ),
        "unexpected error: {err:#}"
    );
}

#[test]
fn parent_escapes_abort_extraction() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let bytes = archive_of(&[file_record("../evil.txt", b"pwned")]);
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    assert_traversal(extract_archive(&archive, &out, &Options::DEFAULT).unwrap_err());
    assert!(
        !work.path().join("evil.txt").exists(),
        "nothing may land outside the extraction root"
    );
    Ok(())
}

#[test]
fn absolute_entry_paths_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let bytes = archive_of(&[file_record("/tmp/evil.txt", b"pwned")]);
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    assert_traversal(extract_archive(&archive, &out, &Options::DEFAULT).unwrap_err());
    Ok(())
}

#[test]
fn escape_after_clean_entries_still_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let bytes = archive_of(&[
        file_record("ok.txt", b"fine"),
        file_record("a/../../evil.txt", b"pwned"),
    ]);
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    assert_traversal(extract_archive(&archive, &out, &Options::DEFAULT).unwrap_err());
    // Extraction is first-failure-aborts; the clean entry already landed.
    assert_eq!(fs::read_to_string(out.join("ok.txt"))?, "fine");
    assert!(!work.path().join("evil.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn planted_symlink_ancestor_cannot_redirect_writes() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let outside = work.path().join("outside");
    fs::create_dir(&outside)?;

    // First record plants a link pointing outside the root; the second
    // writes through it with a path that passes the lexical check.
    let bytes = archive_of(&[
        symlink_record("exit", outside.to_str().unwrap()),
        file_record("exit/evil.txt", b"pwned"),
    ]);
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    assert_traversal(extract_archive(&archive, &out, &Options::DEFAULT).unwrap_err());
    assert!(
        !outside.join("evil.txt").exists(),
        "payload must not follow the planted link"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn symlink_squatting_on_a_file_slot_is_replaced() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let outside = work.path().join("outside");
    fs::create_dir(&outside)?;
    let hijack = outside.join("hijack.txt");

    // The link sits exactly where the file record will be written.
    let bytes = archive_of(&[
        symlink_record("evil", hijack.to_str().unwrap()),
        file_record("evil", b"contents"),
    ]);
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    extract_archive(&archive, &out, &Options::DEFAULT)?;

    assert!(!hijack.exists(), "open must not write through the link");
    let slot = out.join("evil");
    assert!(!fs::symlink_metadata(&slot)?.file_type().is_symlink());
    assert_eq!(fs::read_to_string(&slot)?, "contents");
    Ok(())
}

#[test]
fn overflowing_declared_size_is_malformed() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let mut bytes = archive_of(&[]);
    bytes.pop(); // drop the end marker; the bogus record replaces it
    let mut record = header(1, "huge.bin");
    record.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.extend_from_slice(&record);
    bytes.push(0xFF);
    let archive = write_archive(work.path(), &bytes)?;

    let err = list_archive(&archive).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UnifsError>(),
        Some(UnifsError::Malformed { .. })
    ));
    Ok(())
}

#[test]
fn bad_magic_is_rejected_up_front() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let archive = work.path().join("noise.ufa");
    fs::write(&archive, b"ZIPZIP00rest of the noise")?;

    let err = list_archive(&archive).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UnifsError>(),
        Some(UnifsError::Malformed { .. })
    ));
    Ok(())
}

#[test]
fn truncated_archive_is_malformed() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let mut bytes = archive_of(&[file_record("ok.txt", b"fine")]);
    bytes.truncate(bytes.len() - 6); // chop the crc and end marker
    let archive = write_archive(work.path(), &bytes)?;

    let err = list_archive(&archive).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UnifsError>(),
        Some(UnifsError::Malformed { .. })
    ));
    Ok(())
}

#[test]
fn corrupted_payload_fails_its_crc() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let mut bytes = archive_of(&[file_record("ok.txt", b"fine")]);
    // Flip a payload byte; the stored crc no longer matches.
    let flip = bytes.len() - 7;
    bytes[flip] ^= 0xFF;
    let archive = write_archive(work.path(), &bytes)?;
    let out = work.path().join("out");

    let err = extract_archive(&archive, &out, &Options::DEFAULT).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UnifsError>(),
        Some(UnifsError::Malformed { .. })
    ));
    Ok(())
}
