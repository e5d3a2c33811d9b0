//! Turning a staging directory tree into a [`Listfile`] (`spec.md` §4.4.4).

use std::path::Path;

use portsmith_core::error::Error;
use portsmith_status::{ListEntry, Listfile};
use walkdir::WalkDir;

/// Walk `staging_root` and build a listfile naming every directory, regular
/// file, and symlink relative to it, in install order (a directory always
/// precedes the entries it contains, since `WalkDir` visits top-down).
pub fn listfile_from_tree(staging_root: &Path) -> portsmith_core::Result<Listfile> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(staging_root).sort_by_file_name().min_depth(1) {
        let entry = entry.map_err(|e| Error::io(staging_root, std::io::Error::other(e.to_string())))?;
        let relative = entry.path().strip_prefix(staging_root).unwrap_or(entry.path()).to_string_lossy().replace('\\', "/");
        if entry.path_is_symlink() {
            entries.push(ListEntry::symlink(relative));
        } else if entry.file_type().is_dir() {
            entries.push(ListEntry::dir(relative));
        } else {
            entries.push(ListEntry::file(relative));
        }
    }
    Ok(Listfile::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directories_precede_their_contents() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("include/zlib")).unwrap();
        std::fs::write(dir.path().join("include/zlib/zlib.h"), b"").unwrap();
        std::fs::write(dir.path().join("lib.txt"), b"").unwrap();

        let listfile = listfile_from_tree(dir.path()).unwrap();
        let paths: Vec<_> = listfile.entries().iter().map(|e| e.path.as_str()).collect();
        let include_pos = paths.iter().position(|p| *p == "include").unwrap();
        let header_pos = paths.iter().position(|p| *p == "include/zlib/zlib.h").unwrap();
        assert!(include_pos < header_pos);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recorded_as_symlinks() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("libz.so.1"), b"").unwrap();
        std::os::unix::fs::symlink("libz.so.1", dir.path().join("libz.so")).unwrap();

        let listfile = listfile_from_tree(dir.path()).unwrap();
        let link = listfile.entries().iter().find(|e| e.path == "libz.so").unwrap();
        assert!(link.is_symlink());
    }
}
