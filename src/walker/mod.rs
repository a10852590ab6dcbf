//! Directory walker: lazy, fail-fast discovery of input files
//!
//! Walks a subtree depth-first in directory-listing order and yields every
//! regular file whose base name matches the glob. A root that is itself a file
//! is yielded at depth 0 without consulting the pattern.

mod glob;

pub use glob::GlobPattern;

use crate::errors::WalkError;
use jwalk::{DirEntryIter, Parallelism, WalkDir};
use std::path::{Path, PathBuf};

/// A discovered input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    pub path: PathBuf,
    /// 0 for a single-file root, otherwise the depth below the root
    pub depth: usize,
}

/// Iterator over matching files under a root
///
/// The first directory that cannot be listed is yielded as an error and the
/// iterator ends there.
pub struct DirectoryWalker {
    state: WalkState,
    pattern: GlobPattern,
}

enum WalkState {
    Single(Option<FilePath>),
    Tree(DirEntryIter<((), ())>),
    Failed(Option<WalkError>),
    Done,
}

/// Start walking `root`; an unreadable root is reported as the first item
#[must_use]
pub fn walk(root: &Path, pattern: GlobPattern) -> DirectoryWalker {
    let state = match std::fs::metadata(root) {
        Ok(meta) if meta.is_file() => WalkState::Single(Some(FilePath {
            path: root.to_path_buf(),
            depth: 0,
        })),
        Ok(_) => WalkState::Tree(
            WalkDir::new(root)
                .parallelism(Parallelism::Serial)
                .sort(false)
                .skip_hidden(false)
                .follow_links(false)
                .into_iter(),
        ),
        Err(source) => WalkState::Failed(Some(WalkError::Stat {
            path: root.to_path_buf(),
            source,
        })),
    };

    DirectoryWalker { state, pattern }
}

impl DirectoryWalker {
    /// End the walk at the first directory that cannot be listed
    fn abort(&mut self, path: PathBuf, reason: String) -> WalkError {
        tracing::error!(path = %path.display(), error = %reason, "Directory walk aborted");
        self.state = WalkState::Done;
        WalkError::ReadDir { path, reason }
    }

    fn next_in_tree(&mut self) -> Option<Result<FilePath, WalkError>> {
        let WalkState::Tree(entries) = &mut self.state else {
            return None;
        };

        for entry in entries.by_ref() {
            match entry {
                Ok(entry) => {
                    // jwalk reports an unlistable directory on the entry itself
                    if let Some(e) = entry.read_children_error.as_ref() {
                        let reason = e.to_string();
                        return Some(Err(self.abort(entry.path(), reason)));
                    }
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy();
                    if self.pattern.matches(&name) {
                        return Some(Ok(FilePath {
                            path: entry.path(),
                            depth: entry.depth,
                        }));
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(Err(self.abort(path, e.to_string())));
                }
            }
        }

        self.state = WalkState::Done;
        None
    }
}

impl Iterator for DirectoryWalker {
    type Item = Result<FilePath, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            WalkState::Single(file) => {
                let file = file.take();
                self.state = WalkState::Done;
                file.map(Ok)
            }
            WalkState::Failed(err) => {
                let err = err.take();
                self.state = WalkState::Done;
                err.map(Err)
            }
            WalkState::Tree(_) => self.next_in_tree(),
            WalkState::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn single_file_root_ignores_pattern() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dump.json");
        fs::write(&file, b"{}").expect("write");

        let found: Vec<FilePath> = walk(&file, GlobPattern::new("*.xml").expect("glob"))
            .collect::<Result<_, _>>()
            .expect("walk");

        assert_eq!(found, vec![FilePath { path: file, depth: 0 }]);
    }

    #[test]
    fn missing_root_yields_one_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut walker = walk(&dir.path().join("nope"), GlobPattern::new("*").expect("glob"));

        assert!(matches!(walker.next(), Some(Err(WalkError::Stat { .. }))));
        assert!(walker.next().is_none());
    }

    #[test]
    fn hidden_files_are_visited() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join(".cache")).expect("mkdir");
        fs::write(dir.path().join(".cache/a.xml"), b"").expect("write");

        let found: Vec<FilePath> = walk(dir.path(), GlobPattern::new("*.xml").expect("glob"))
            .collect::<Result<_, _>>()
            .expect("walk");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].depth, 2);
    }
}
