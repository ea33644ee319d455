use crate::error::ExtractError;
use crate::extraction::*;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing the given files
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options = ::zip::write::FileOptions::default()
        .compression_method(::zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Relative path -> contents for every file under `root`
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            (rel, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}

const GKG_ROW: &[u8] = b"20250724144500-0\t20250724144500\t1\texample.com\thttps://example.com/a\n";

// ---------------------------------------------------------------------------
// ZipExtractor
// ---------------------------------------------------------------------------

#[test]
fn test_extract_single_entry() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("20250724144500.gkg.csv.zip");
    create_zip_archive(&archive, &[("20250724144500.gkg.csv", GKG_ROW)]);

    let dest = temp_dir.path().join("csv_en");
    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("20250724144500.gkg.csv")]);
    assert_eq!(std::fs::read(&files[0]).unwrap(), GKG_ROW);
}

#[test]
fn test_extract_creates_nested_directories() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", b"a"), ("sub/b.csv", b"b")]);

    let dest = temp_dir.path().join("out");
    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(std::fs::read(dest.join("sub/b.csv")).unwrap(), b"b");
}

#[test]
fn test_extract_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW)]);

    let dest = temp_dir.path().join("out");
    ZipExtractor::extract(&archive, &dest).unwrap();

    let names: Vec<String> = snapshot(&dest).into_keys().collect();
    assert_eq!(names, vec!["a.csv".to_string()]);
}

#[test]
fn test_extract_twice_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW), ("b.csv", b"second")]);

    let dest = temp_dir.path().join("out");
    ZipExtractor::extract(&archive, &dest).unwrap();
    let first = snapshot(&dest);

    ZipExtractor::extract(&archive, &dest).unwrap();
    let second = snapshot(&dest);

    assert_eq!(first, second);
}

#[test]
fn test_extract_overwrites_stale_output() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW)]);

    let dest = temp_dir.path().join("out");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("a.csv"), b"partial").unwrap();

    ZipExtractor::extract(&archive, &dest).unwrap();
    assert_eq!(std::fs::read(dest.join("a.csv")).unwrap(), GKG_ROW);
}

#[test]
fn test_extract_garbage_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bad.zip");
    std::fs::write(&archive, b"this is not a zip archive").unwrap();

    let err = ZipExtractor::extract(&archive, &temp_dir.path().join("out")).unwrap_err();
    assert!(matches!(err, ExtractError::Corrupt { .. }), "got {err:?}");
}

#[test]
fn test_extract_truncated_archive_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW)]);

    // Drop the central directory
    let bytes = std::fs::read(&archive).unwrap();
    std::fs::write(&archive, &bytes[..bytes.len() / 2]).unwrap();

    let err = ZipExtractor::extract(&archive, &temp_dir.path().join("out")).unwrap_err();
    assert!(matches!(err, ExtractError::Corrupt { .. }), "got {err:?}");
}

#[test]
fn test_extract_missing_archive_is_open_error() {
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("out");
    let err = ZipExtractor::extract(&temp_dir.path().join("missing.zip"), &dest).unwrap_err();

    match err {
        ExtractError::Open { source, .. } => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        other => panic!("expected Open, got {other:?}"),
    }
    assert!(!dest.exists());
}

#[test]
fn test_failed_entry_write_removes_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW)]);

    // A non-empty directory at the entry's path makes the final rename fail
    let dest = temp_dir.path().join("out");
    std::fs::create_dir_all(dest.join("a.csv")).unwrap();
    std::fs::write(dest.join("a.csv/keep"), b"x").unwrap();

    let err = ZipExtractor::extract(&archive, &dest).unwrap_err();

    assert!(matches!(err, ExtractError::Write { .. }), "got {err:?}");
    assert!(!dest.join("a.csv.tmp").exists());
    let names: Vec<String> = snapshot(&dest).into_keys().collect();
    assert_eq!(names, vec!["a.csv/keep".to_string()]);
}

// ---------------------------------------------------------------------------
// extract_archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_extract_archive_runs_off_runtime() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("a.zip");
    create_zip_archive(&archive, &[("a.csv", GKG_ROW)]);

    let dest = temp_dir.path().join("out");
    let files = extract_archive(&archive, &dest).await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(dest.join("a.csv").is_file());
}
