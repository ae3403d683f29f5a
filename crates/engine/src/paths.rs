use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const ROOT_ENV_VAR: &str = "PETRIFY_ROOT";

const DEFS_RELATIVE: [&str; 2] = ["assets", "things.xml"];
const SAVES_RELATIVE: [&str; 2] = ["cache", "saves"];

/// Filesystem layout for one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    /// Replaces the built-in thing defs when the file exists.
    pub defs_file: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    /// Derives the layout under `root` and ensures the saves directory exists.
    pub fn under(root: PathBuf) -> Result<Self, PathsError> {
        let defs_file = DEFS_RELATIVE.iter().fold(root.clone(), |path, part| path.join(part));
        let saves_dir = SAVES_RELATIVE
            .iter()
            .fold(root.clone(), |path, part| path.join(part));
        fs::create_dir_all(&saves_dir).map_err(|source| PathsError::CreateDir {
            path: saves_dir.clone(),
            source,
        })?;
        Ok(Self {
            root,
            defs_file,
            saves_dir,
        })
    }
}

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("PETRIFY_ROOT points at {path}, which has no Cargo.toml next to crates/ or assets/")]
    BadOverride { path: PathBuf },
    #[error(
        "no project root above {searched:?}; set PETRIFY_ROOT to the directory holding Cargo.toml"
    )]
    NotFound { searched: Vec<PathBuf> },
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves the project root from `PETRIFY_ROOT`, else the working directory,
/// else the executable's directory.
pub fn resolve_app_paths() -> Result<AppPaths, PathsError> {
    let starts = [
        env::current_dir().ok(),
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf)),
    ];
    let root = locate_root(env::var_os(ROOT_ENV_VAR), starts.into_iter().flatten())?;
    AppPaths::under(root)
}

fn locate_root(
    override_root: Option<OsString>,
    starts: impl IntoIterator<Item = PathBuf>,
) -> Result<PathBuf, PathsError> {
    if let Some(raw) = override_root.filter(|raw| !raw.is_empty()) {
        let path = canonical(Path::new(&raw));
        return if looks_like_root(&path) {
            Ok(path)
        } else {
            Err(PathsError::BadOverride { path })
        };
    }

    let mut searched = Vec::new();
    for start in starts {
        if let Some(found) = start.ancestors().find(|dir| looks_like_root(dir)) {
            return Ok(canonical(found));
        }
        searched.push(start);
    }
    Err(PathsError::NotFound { searched })
}

fn looks_like_root(dir: &Path) -> bool {
    dir.join("Cargo.toml").is_file() && ["crates", "assets"].iter().any(|sub| dir.join(sub).is_dir())
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn fake_root() -> TempDir {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        temp
    }

    #[test]
    fn root_needs_manifest_and_a_content_dir() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("crates")).expect("crates");
        assert!(!looks_like_root(temp.path()));
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(looks_like_root(temp.path()));
    }

    #[test]
    fn search_walks_up_from_nested_start() {
        let root = fake_root();
        let nested = root.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");
        let found = locate_root(None, [nested]).expect("root");
        assert_eq!(found, canonical(root.path()));
    }

    #[test]
    fn bad_override_is_reported_without_searching() {
        let root = fake_root();
        let elsewhere = TempDir::new().expect("elsewhere");
        let err = locate_root(
            Some(elsewhere.path().as_os_str().to_owned()),
            [root.path().to_path_buf()],
        )
        .expect_err("override should win");
        assert!(matches!(err, PathsError::BadOverride { .. }));
    }

    #[test]
    fn empty_override_falls_back_to_search() {
        let root = fake_root();
        let found = locate_root(Some(OsString::new()), [root.path().to_path_buf()]).expect("root");
        assert_eq!(found, canonical(root.path()));
    }

    #[test]
    fn layout_creates_saves_dir() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::under(temp.path().to_path_buf()).expect("paths");
        assert!(paths.saves_dir.is_dir());
        assert_eq!(paths.defs_file, temp.path().join("assets").join("things.xml"));
    }
}
