//
// workspace.rs
//
// Workspace folder helpers: display labels and file search
//

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::highlight::DocumentId;

/// Directories never searched when resolving a file name.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Upper bound on matches returned by [`find_files`].
const MAX_MATCHES: usize = 32;

/// Label shown for `document`: relative to the first root containing it,
/// the full id otherwise.
pub fn relative_label(document: &DocumentId, roots: &[PathBuf]) -> String {
    let path = Path::new(document.as_str());
    roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| relative.display().to_string())
        .unwrap_or_else(|| document.to_string())
}

/// Whether `document` names a file ending in the path `name`.
///
/// Matching is per path component, so `b.txt` matches `/a/b.txt` but not
/// `/a/bb.txt`.
pub fn ends_with(document: &DocumentId, name: &str) -> bool {
    !name.is_empty() && Path::new(document.as_str()).ends_with(name)
}

/// Walk `roots` for files whose path ends with `name`.
///
/// Blocking; run it on a blocking thread.
pub fn find_files(roots: &[PathBuf], name: &str) -> Vec<PathBuf> {
    if name.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for root in roots {
        log::trace!("Searching {} for {}", root.display(), name);
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|dir| SKIPPED_DIRS.contains(&dir)))
            });

        for entry in walker.flatten() {
            if entry.file_type().is_file() && entry.path().ends_with(name) {
                matches.push(entry.into_path());
                if matches.len() >= MAX_MATCHES {
                    return matches;
                }
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_relative_label_strips_root() {
        let roots = vec![PathBuf::from("/work/project")];
        let doc = DocumentId::new("/work/project/src/main.rs");
        assert_eq!(
            relative_label(&doc, &roots),
            Path::new("src/main.rs").display().to_string()
        );
    }

    #[test]
    fn test_relative_label_outside_roots() {
        let roots = vec![PathBuf::from("/work/project")];
        let doc = DocumentId::new("/elsewhere/notes.txt");
        assert_eq!(relative_label(&doc, &roots), "/elsewhere/notes.txt");
        assert_eq!(relative_label(&doc, &[]), "/elsewhere/notes.txt");
    }

    #[test]
    fn test_ends_with_is_component_wise() {
        let doc = DocumentId::new("/a/b.txt");
        assert!(ends_with(&doc, "b.txt"));
        assert!(ends_with(&doc, "a/b.txt"));
        assert!(!ends_with(&DocumentId::new("/a/bb.txt"), "b.txt"));
        assert!(!ends_with(&doc, ""));
    }

    #[test]
    fn test_find_files_skips_build_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("src/nested/lib.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("target/debug/lib.rs"), "").unwrap();
        fs::write(root.join("src/other.rs"), "").unwrap();

        let found = find_files(&[root.to_path_buf()], "nested/lib.rs");
        assert_eq!(found, vec![root.join("src/nested/lib.rs")]);

        let found = find_files(&[root.to_path_buf()], "lib.rs");
        assert_eq!(found.len(), 1);
        assert!(find_files(&[root.to_path_buf()], "missing.rs").is_empty());
    }
}
