use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes through a synced sibling temp file, then renames it over `path`.
/// Readers see either the old contents or the new ones, never a partial file.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    let result = stage(&staging, bytes).and_then(|()| commit(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn stage(staging: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(staging)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn commit(staging: &Path, path: &Path) -> io::Result<()> {
    match fs::rename(staging, path) {
        Ok(()) => Ok(()),
        // Some platforms refuse to rename over an existing file.
        Err(_) if path.exists() => {
            fs::remove_file(path)?;
            fs::rename(staging, path)
        }
        Err(error) => Err(error),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("write"));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn write_replaces_existing_file_and_leaves_no_staging_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("nested").join("state.json");
        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        assert!(!staging_path(&path).exists());
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn staging_file_sits_next_to_target() {
        let path = Path::new("/data/saves/world.json");
        let staging = staging_path(path);
        assert_eq!(staging.parent(), path.parent());
        assert!(staging
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("world.json.") && name.ends_with(".tmp")));
    }
}
