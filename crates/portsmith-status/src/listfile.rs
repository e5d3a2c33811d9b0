//! Per-package file manifests (`info/<spec>_<version>_<triplet>.list`).
//!
//! A listfile is the authoritative record of what a package put on disk;
//! removal walks it in reverse so files are deleted before the directories
//! that contained them, and conflict detection is just a reverse index over
//! every installed package's listfile.

use std::path::{Path, PathBuf};

use portsmith_core::PackageSpec;

use crate::error::StatusError;

/// What kind of filesystem entry a [`ListEntry`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory, kept so empty directories a package owns are removed
    /// too, but only when no other entry still needs them.
    Dir,
    /// A symlink, recorded separately from a regular file so removal never
    /// tries to read through it as one.
    Symlink,
}

/// One line of a listfile: a path relative to the installed root, and the
/// kind of entry it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Path relative to the installed tree root.
    pub path: String,
    /// The entry's kind.
    pub kind: EntryKind,
}

impl ListEntry {
    /// A regular-file entry.
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    /// A directory entry.
    #[must_use]
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    /// A symlink entry.
    #[must_use]
    pub fn symlink(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Symlink,
        }
    }

    /// Whether this entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Whether this entry is a symlink.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// The manifest of everything one package installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listfile {
    entries: Vec<ListEntry>,
}

impl Listfile {
    /// An empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from entries in install order (directories before
    /// the files they contain).
    #[must_use]
    pub fn from_entries(entries: Vec<ListEntry>) -> Self {
        Self { entries }
    }

    /// Entries in install order.
    #[must_use]
    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// Entries in the order they should be deleted: files and directories
    /// reversed, so a directory is only removed after everything it
    /// contained.
    pub fn removal_order(&self) -> impl Iterator<Item = &ListEntry> {
        self.entries.iter().rev()
    }

    /// The canonical on-disk filename for `spec`'s listfile, relative to the
    /// `info/` directory.
    #[must_use]
    pub fn file_name(spec: &PackageSpec, version: &str) -> String {
        format!("{}_{}_{}.list", spec.name(), version, spec.triplet())
    }

    /// Render to the newline-separated on-disk text form: one relative path
    /// per line, directories suffixed with `/` and symlinks with `@`.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.path);
            match entry.kind {
                EntryKind::Dir if !entry.path.ends_with('/') => out.push('/'),
                EntryKind::Symlink if !entry.path.ends_with('@') => out.push('@'),
                _ => {}
            }
            out.push('\n');
        }
        out
    }

    /// Parse a listfile from its on-disk text form.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                if let Some(dir) = line.strip_suffix('/') {
                    ListEntry::dir(dir)
                } else if let Some(link) = line.strip_suffix('@') {
                    ListEntry::symlink(link)
                } else {
                    ListEntry::file(line)
                }
            })
            .collect();
        Self { entries }
    }

    /// Write this manifest to `info_dir/<file_name>`.
    pub fn write(&self, info_dir: &Path, spec: &PackageSpec, version: &str) -> crate::Result<()> {
        let path = info_dir.join(Self::file_name(spec, version));
        std::fs::write(&path, self.to_text()).map_err(|e| StatusError::io(path, e))
    }

    /// Read a manifest from `info_dir/<file_name>`.
    pub fn read(info_dir: &Path, spec: &PackageSpec, version: &str) -> crate::Result<Self> {
        let path = info_dir.join(Self::file_name(spec, version));
        let text = std::fs::read_to_string(&path).map_err(|e| StatusError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Remove `info_dir/<file_name>` once the package itself has been removed.
    pub fn delete(info_dir: &Path, spec: &PackageSpec, version: &str) -> crate::Result<()> {
        let path = info_dir.join(Self::file_name(spec, version));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StatusError::io(path, e)),
        }
    }
}

/// Check every path in `incoming` against the paths already owned by
/// `installed`, returning the first conflict found.
///
/// `installed` pairs an owning package's canonical name with its listfile.
/// Directory entries never conflict with each other; two packages both
/// claiming the same regular-file or symlink path is a conflict.
pub fn check_conflicts(
    incoming_name: &str,
    incoming: &Listfile,
    installed: &[(String, &Listfile)],
) -> Option<StatusError> {
    for entry in &incoming.entries {
        if entry.is_dir() {
            continue;
        }
        for (owner, owned) in installed {
            if owner == incoming_name {
                continue;
            }
            if owned.entries.iter().any(|e| !e.is_dir() && e.path == entry.path) {
                return Some(StatusError::FileConflicts {
                    name: incoming_name.to_string(),
                    owner: owner.clone(),
                    path: PathBuf::from(&entry.path),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let lf = Listfile::from_entries(vec![
            ListEntry::dir("include/zlib"),
            ListEntry::file("include/zlib/zlib.h"),
            ListEntry::symlink("lib/libz.so"),
            ListEntry::file("lib/libz.a"),
        ]);
        let text = lf.to_text();
        assert_eq!(Listfile::parse(&text), lf);
    }

    #[test]
    fn symlinks_conflict_like_regular_files() {
        let owned = Listfile::from_entries(vec![ListEntry::symlink("lib/libz.so")]);
        let incoming = Listfile::from_entries(vec![ListEntry::symlink("lib/libz.so")]);
        let conflict = check_conflicts("zlib2", &incoming, &[("zlib".to_string(), &owned)]);
        assert!(matches!(conflict, Some(StatusError::FileConflicts { .. })));
    }

    #[test]
    fn removal_order_is_reversed() {
        let lf = Listfile::from_entries(vec![
            ListEntry::dir("include"),
            ListEntry::file("include/a.h"),
        ]);
        let order: Vec<_> = lf.removal_order().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["include/a.h", "include"]);
    }

    #[test]
    fn detects_file_conflicts_but_not_directory_overlap() {
        let owned = Listfile::from_entries(vec![
            ListEntry::dir("include"),
            ListEntry::file("include/zlib.h"),
        ]);
        let incoming = Listfile::from_entries(vec![
            ListEntry::dir("include"),
            ListEntry::file("include/zlib.h"),
        ]);
        let conflict = check_conflicts("zlib2", &incoming, &[("zlib".to_string(), &owned)]);
        assert!(matches!(conflict, Some(StatusError::FileConflicts { .. })));
    }

    #[test]
    fn no_conflict_against_its_own_prior_listfile() {
        let owned = Listfile::from_entries(vec![ListEntry::file("lib/libz.a")]);
        let incoming = owned.clone();
        let conflict = check_conflicts("zlib", &incoming, &[("zlib".to_string(), &owned)]);
        assert!(conflict.is_none());
    }
}
