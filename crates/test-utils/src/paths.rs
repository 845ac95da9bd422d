//! Locating optional test data and scratch directories.

use std::path::{Path, PathBuf};

/// Environment variable naming an extra directory of test rasters.
pub const TEST_DATA_ENV: &str = "TEST_DATA_DIR";

/// In-repo directories searched by [`find_test_file`], relative to the workspace root.
const TESTDATA_DIRS: [&str; 3] = [
    "crates/elevation/testdata",
    "services/tile-proxy/testdata",
    "testdata",
];

/// The workspace root, two levels above this crate.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Find a test file by name.
///
/// `$TEST_DATA_DIR` is searched first, then the in-repo testdata directories.
/// Real DEMs are large and usually absent, so callers should skip rather than
/// fail on `None` (see `require_test_file!`).
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let root = workspace_root();
    std::env::var_os(TEST_DATA_ENV)
        .map(PathBuf::from)
        .into_iter()
        .chain(TESTDATA_DIRS.iter().map(|dir| root.join(dir)))
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// A scratch directory, removed when dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("terrain-test-")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").is_file(), "{:?}", root);
        assert!(root.join("crates").join("test-utils").is_dir());
    }

    #[test]
    fn test_missing_file() {
        assert!(find_test_file("no-such-raster-7f3a.tif").is_none());
    }

    #[test]
    fn test_temp_dir_is_removed() {
        let dir = temp_test_dir();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }
}
