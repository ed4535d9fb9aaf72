#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use alveograph::{Catalog, CatalogConfig};
use tempfile::TempDir;

pub const COOEE: &str = "http://localhost:3000/catalog/cooee";
pub const MITCHEL_DELBRIDGE: &str = "http://localhost:3000/catalog/mitcheldelbridge";

pub fn item(identifier: &str) -> String {
    format!("{COOEE}/items/{identifier}")
}

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

/// Read-only catalog over the checked-in corpus.
pub fn fixture_catalog() -> Catalog {
    Catalog::open(CatalogConfig::new(fixture_dir())).expect("attach fixture corpus")
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("create dir");
    for entry in fs::read_dir(from).expect("read dir") {
        let entry = entry.expect("entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("copy file");
        }
    }
}

/// Writable copy of the corpus; the directory lives as long as the guard.
pub fn scratch_corpus() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    copy_tree(&fixture_dir(), dir.path());
    dir
}

pub fn scratch_catalog(dir: &TempDir) -> Catalog {
    Catalog::open(CatalogConfig::new(dir.path())).expect("attach scratch corpus")
}
