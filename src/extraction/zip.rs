use crate::error::ExtractError;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Unpack every file entry of `archive_path` into `dest_path`
    ///
    /// Each entry is written to a temporary sibling and renamed into place,
    /// so an output file is either absent or complete. Existing files are
    /// overwritten, which makes repeated extraction of the same archive
    /// converge to the same directory contents. Entries whose names escape
    /// `dest_path` are skipped.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let file = File::open(archive_path).map_err(|source| ExtractError::Open {
            archive: archive_path.to_path_buf(),
            source,
        })?;

        std::fs::create_dir_all(dest_path).map_err(|source| ExtractError::Write {
            path: dest_path.to_path_buf(),
            source,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Corrupt {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| ExtractError::Corrupt {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry {}: {}", i, e),
            })?;

            if let Some(path) = Self::extract_entry(entry, dest_path, archive_path)? {
                extracted_files.push(path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }

    fn extract_entry(
        mut entry: zip::read::ZipFile<'_>,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>, ExtractError> {
        let file_path = match entry.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(name = entry.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|source| ExtractError::Write {
                path: file_path.clone(),
                source,
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExtractError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = temp_sibling(&file_path);
        let result = copy_entry(&mut entry, &tmp_path, archive_path).and_then(|()| {
            std::fs::rename(&tmp_path, &file_path).map_err(|source| ExtractError::Write {
                path: file_path.clone(),
                source,
            })
        });

        if let Err(e) = result {
            if let Err(cleanup) = std::fs::remove_file(&tmp_path)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = ?tmp_path, error = %cleanup, "failed to remove partial entry");
            }
            return Err(e);
        }

        Ok(Some(file_path))
    }
}

/// Copy an entry's decompressed bytes, keeping decode and write failures apart
fn copy_entry(
    entry: &mut impl Read,
    tmp_path: &Path,
    archive_path: &Path,
) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::Write {
        path: tmp_path.to_path_buf(),
        source,
    };

    let mut out = BufWriter::new(File::create(tmp_path).map_err(write_err)?);
    let mut buf = vec![0u8; COPY_BUF_SIZE];

    loop {
        let n = entry.read(&mut buf).map_err(|e| ExtractError::Corrupt {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to decompress entry: {}", e),
        })?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(write_err)?;
    }

    out.flush().map_err(write_err)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
