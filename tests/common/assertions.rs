//! Filesystem assertions for the output tree

use std::collections::BTreeMap;
use std::path::Path;

/// Relative path -> contents for every file under `root`
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    if !root.exists() {
        return BTreeMap::new();
    }
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
                .replace('\\', "/");
            (rel, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}

/// Assert no `.part` or `.tmp` files remain anywhere under `root`
pub fn assert_no_temp_files(root: &Path) {
    let leftovers: Vec<String> = snapshot(root)
        .into_keys()
        .filter(|name| name.ends_with(".part") || name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
}
