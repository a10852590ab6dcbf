mod common;

use anyhow::Result;
use kodegen_tools_searchbench::errors::WalkError;
use kodegen_tools_searchbench::walker::{self, GlobPattern};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tempfile::TempDir;

fn walk_names(root: &std::path::Path, pattern: &str) -> Result<BTreeSet<PathBuf>> {
    let pattern = GlobPattern::new(pattern)?;
    let mut found = BTreeSet::new();
    for entry in walker::walk(root, pattern) {
        let entry = entry?;
        found.insert(entry.path.strip_prefix(root)?.to_path_buf());
    }
    Ok(found)
}

#[test]
fn matches_base_names_at_any_depth() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    std::fs::create_dir_all(root.join("a/b/c"))?;
    for rel in ["top.xml", "a/one.xml", "a/b/two.txt", "a/b/c/three.xml", "a/xml"] {
        std::fs::write(root.join(rel), "x")?;
    }
    // A directory whose name matches is not a file
    std::fs::create_dir_all(root.join("dir.xml"))?;

    let found = walk_names(root, "*.xml")?;
    let expected: BTreeSet<PathBuf> = ["top.xml", "a/one.xml", "a/b/c/three.xml"]
        .into_iter()
        .map(PathBuf::from)
        .collect();
    assert_eq!(found, expected);
    Ok(())
}

#[test]
fn single_file_root_ignores_pattern() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("dump.bz2");
    std::fs::write(&file, "x")?;

    let entries: Vec<_> = walker::walk(&file, GlobPattern::new("*.xml")?)
        .collect::<Result<_, WalkError>>()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, file);
    assert_eq!(entries[0].depth, 0);
    Ok(())
}

#[test]
fn missing_root_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let mut walk = walker::walk(&dir.path().join("nope"), GlobPattern::new("*")?);
    assert!(matches!(walk.next(), Some(Err(WalkError::Stat { .. }))));
    assert!(walk.next().is_none());
    Ok(())
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_ends_the_walk() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("a.xml"), "x")?;
    std::fs::create_dir_all(dir.path().join("locked"))?;
    std::fs::write(dir.path().join("locked/b.xml"), "x")?;
    let Some(_locked) = common::LockedDir::lock(&dir.path().join("locked"))? else {
        // Privileged users can list any directory
        return Ok(());
    };

    let items: Vec<_> = walker::walk(dir.path(), GlobPattern::new("*.xml")?).collect();
    let last = items.last().expect("walk yields at least the error");
    match last {
        Err(WalkError::ReadDir { path, .. }) => assert!(path.ends_with("locked")),
        other => panic!("expected a ReadDir error, got {other:?}"),
    }
    assert_eq!(items.iter().filter(|i| i.is_err()).count(), 1);
    assert!(
        items
            .iter()
            .flatten()
            .all(|f| !f.path.ends_with("locked/b.xml"))
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn unreadable_root_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().join("root");
    let Some(_locked) = common::LockedDir::lock(&root)? else {
        return Ok(());
    };

    let items: Vec<_> = walker::walk(&root, GlobPattern::new("*")?).collect();
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(WalkError::ReadDir { .. })));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn walker_emits_exactly_matching_files(
        files in prop::collection::btree_set(
            ("(d[0-3]/){0,3}", "[a-z]{1,6}", prop::sample::select(vec!["xml", "txt", "bz2"])),
            0..20,
        )
    ) {
        let dir = TempDir::new().unwrap();
        let mut expected = BTreeSet::new();
        for (prefix, stem, ext) in &files {
            let rel = PathBuf::from(format!("{prefix}{stem}.{ext}"));
            let path = dir.path().join(&rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "x").unwrap();
            if *ext == "xml" {
                expected.insert(rel);
            }
        }

        let found = walk_names(dir.path(), "*.xml").unwrap();
        prop_assert_eq!(found, expected);
    }
}
