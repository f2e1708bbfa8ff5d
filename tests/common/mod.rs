#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Fixture reports shipped with the test suite
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    /// Valid under every profile; three records
    pub fn strict_full(&self) -> PathBuf {
        self.fixtures_dir.join("strict_full.xml")
    }

    /// Rejected by the strict profile only
    pub fn relaxed_only(&self) -> PathBuf {
        self.fixtures_dir.join("relaxed_only.xml")
    }

    /// Accepted by the minimal profile only
    pub fn minimal_only(&self) -> PathBuf {
        self.fixtures_dir.join("minimal_only.xml")
    }

    pub fn read(&self, path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write `contents` to `dir/name`, creating parent directories
pub fn create_test_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}
