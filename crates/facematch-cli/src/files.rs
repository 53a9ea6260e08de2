use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files under `root`, sorted by name. Symlinks are followed.
///
/// `depth` counts directory levels below `root`: `Some(0)` lists files
/// directly inside it, `Some(1)` files one subdirectory down, and so on.
/// `None` lists every file at any depth.
pub fn list_files(root: &Path, depth: Option<usize>) -> Result<Vec<PathBuf>, walkdir::Error> {
    let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
    let walker = match depth {
        Some(d) => walker.min_depth(d + 1).max_depth(d + 1),
        None => walker.min_depth(1),
    };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b.jpg"), b"").unwrap();
        fs::write(root.join("a.jpg"), b"").unwrap();
        fs::create_dir_all(root.join("family/dad")).unwrap();
        fs::write(root.join("family/mom.jpg"), b"").unwrap();
        fs::write(root.join("family/dad/dad1.jpg"), b"").unwrap();
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_top_level_only() {
        let dir = tree();
        let files = list_files(dir.path(), Some(0)).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_exact_depth() {
        let dir = tree();
        let files = list_files(dir.path(), Some(1)).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["family/mom.jpg"]);
        let files = list_files(dir.path(), Some(2)).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["family/dad/dad1.jpg"]);
    }

    #[test]
    fn test_all_depths() {
        let dir = tree();
        let files = list_files(dir.path(), None).unwrap();
        assert_eq!(files.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_listed() {
        let dir = tree();
        let elsewhere = tempfile::tempdir().unwrap();
        let target = elsewhere.path().join("linked.jpg");
        fs::write(&target, b"").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("c.jpg")).unwrap();

        let files = list_files(dir.path(), Some(0)).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        assert!(list_files(Path::new("/nonexistent/photos"), Some(0)).is_err());
    }
}
