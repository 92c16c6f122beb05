use std::fs;
use tempfile::TempDir;


pub(crate) const DEMO_INPUT_DIR: &str = "./demos/input";

/// A scratch copy of the demo input tables that a test may edit or delete from.
pub(crate) fn copy_demo_input() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in fs::read_dir(DEMO_INPUT_DIR).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
    }
    dir
}
