use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use walkdir::WalkDir;

/// List the Flyway scripts under `dir`, sorted by path.
///
/// Counts versioned (`V<version>__<description>.sql`) and repeatable
/// (`R__<description>.sql`) scripts; anything else is ignored.
pub fn discover_migrations(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("migrations directory not found: {}", dir.display());
    }

    let mut scripts: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(is_script))
        .map(|e| e.into_path())
        .collect();

    scripts.sort();
    Ok(scripts)
}

fn is_script(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".sql") else {
        return false;
    };
    if let Some(rest) = stem.strip_prefix("R__") {
        return !rest.is_empty();
    }
    match stem.strip_prefix('V').and_then(|s| s.split_once("__")) {
        Some((version, description)) => !version.is_empty() && !description.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_names() {
        assert!(is_script("V1__create_stuff.sql"));
        assert!(is_script("V2_1__add_index.sql"));
        assert!(is_script("R__refresh_views.sql"));
        assert!(!is_script("V__missing_version.sql"));
        assert!(!is_script("V1_no_separator.sql"));
        assert!(!is_script("V1__create.txt"));
        assert!(!is_script("README.md"));
        assert!(!is_script("U1__undo.sql"));
    }

    #[test]
    fn discovers_nested_scripts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("V2__second.sql"), "select 2;").unwrap();
        std::fs::write(dir.path().join("V1__first.sql"), "select 1;").unwrap();
        std::fs::write(nested.join("R__view.sql"), "select 3;").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = discover_migrations(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["V1__first.sql", "V2__second.sql", "R__view.sql"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(discover_migrations(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn bundled_fixtures_are_discoverable() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/postgres");
        assert_eq!(discover_migrations(&dir).unwrap().len(), 2);
    }
}
