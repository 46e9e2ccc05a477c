use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use passdrv_core::SecretError;

/// Map a secret ID to a file path strictly inside `root`.
///
/// Containment is checked component-wise on normalised paths, so a sibling such
/// as `/store-old` never passes for root `/store`. The target itself (if present)
/// and the existing directories along the way are canonicalized so symlinks
/// cannot lead outside the root.
pub fn resolve_secret_path(root: &Path, id: &str) -> Result<PathBuf, SecretError> {
    let invalid = || SecretError::invalid_key(id);

    if root.as_os_str().is_empty() || id.is_empty() {
        return Err(invalid());
    }
    let id_path = Path::new(id);
    if id_path.has_root() || id_path.is_absolute() {
        return Err(invalid());
    }

    let root = base_root(root).ok_or_else(invalid)?;
    let candidate = normalize(&root.join(id_path)).ok_or_else(invalid)?;
    if candidate == root || !candidate.starts_with(&root) {
        return Err(invalid());
    }

    // Deepest existing ancestor must still resolve inside the root.
    let existing = candidate
        .ancestors()
        .skip(1)
        .take_while(|p| p.starts_with(&root))
        .find(|p| p.exists());
    if let Some(existing) = existing {
        let real = fs::canonicalize(existing).map_err(|_| invalid())?;
        if !real.starts_with(&root) {
            return Err(invalid());
        }
    }

    // The target may itself be a symlink; a dangling one is rejected too.
    if fs::symlink_metadata(&candidate).is_ok() {
        let real = fs::canonicalize(&candidate).map_err(|_| invalid())?;
        if real == root || !real.starts_with(&root) {
            return Err(invalid());
        }
    }

    Ok(candidate)
}

fn base_root(root: &Path) -> Option<PathBuf> {
    match fs::canonicalize(root) {
        Ok(real) => Some(real),
        Err(_) => std::path::absolute(root).ok().and_then(|abs| normalize(&abs)),
    }
}

/// Fold `.` and `..` lexically. `None` if `..` would climb above the filesystem root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("store");
        fs::create_dir_all(&root).expect("create root");
        let root = fs::canonicalize(root).expect("canonical root");
        (dir, root)
    }

    #[test]
    fn nested_ids_resolve_under_root() {
        let (_dir, root) = store();
        let path = resolve_secret_path(&root, "web/github").expect("resolve");
        assert_eq!(path, root.join("web").join("github"));
    }

    #[test]
    fn inner_dot_segments_are_folded() {
        let (_dir, root) = store();
        let path = resolve_secret_path(&root, "web/./../db").expect("resolve");
        assert_eq!(path, root.join("db"));
    }

    #[test]
    fn traversal_out_of_root_is_rejected() {
        let (_dir, root) = store();
        for id in ["../../etc/passwd", "..", "web/../../x", "../store-old/secret"] {
            let err = resolve_secret_path(&root, id).expect_err(id);
            assert_eq!(err, SecretError::invalid_key(id));
        }
    }

    #[test]
    fn root_itself_is_not_a_secret() {
        let (_dir, root) = store();
        for id in ["", ".", "web/.."] {
            let err = resolve_secret_path(&root, id).expect_err(id);
            assert!(matches!(err, SecretError::InvalidKey { .. }));
        }
    }

    #[test]
    fn absolute_ids_are_rejected() {
        let (_dir, root) = store();
        let inside = root.join("x").to_string_lossy().into_owned();
        let err = resolve_secret_path(&root, &inside).expect_err("absolute");
        assert!(matches!(err, SecretError::InvalidKey { .. }));
    }

    #[test]
    fn empty_root_is_rejected() {
        let err = resolve_secret_path(Path::new(""), "web").expect_err("empty root");
        assert!(matches!(err, SecretError::InvalidKey { .. }));
    }

    #[test]
    fn missing_root_is_checked_lexically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = fs::canonicalize(dir.path()).expect("canonical");
        let root = real.join("not-created");
        let path = resolve_secret_path(&root, "a/b").expect("resolve");
        assert_eq!(path, root.join("a").join("b"));
        assert!(resolve_secret_path(&root, "../outside").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_cannot_escape() {
        let (dir, root) = store();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).expect("outside");
        std::os::unix::fs::symlink(&outside, root.join("link")).expect("symlink");

        for id in ["link/secret", "link/new/secret"] {
            let err = resolve_secret_path(&root, id).expect_err(id);
            assert!(matches!(err, SecretError::InvalidKey { .. }));
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_secret_file_cannot_escape() {
        let (dir, root) = store();
        let outside = dir.path().join("outside-secret");
        fs::write(&outside, "outside!").expect("outside file");
        std::os::unix::fs::symlink(&outside, root.join("leak")).expect("symlink");
        std::os::unix::fs::symlink(dir.path().join("gone"), root.join("dangling"))
            .expect("dangling symlink");
        std::os::unix::fs::symlink(&root, root.join("self")).expect("self symlink");

        for id in ["leak", "dangling", "self"] {
            let err = resolve_secret_path(&root, id).expect_err(id);
            assert_eq!(err, SecretError::invalid_key(id));
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_root_is_allowed() {
        let (_dir, root) = store();
        fs::write(root.join("real"), "x").expect("real file");
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).expect("symlink");

        let path = resolve_secret_path(&root, "alias").expect("resolve");
        assert_eq!(path, root.join("alias"));
    }
}
