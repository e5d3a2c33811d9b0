//! `StatusDatabase` — load, collapse, and crash-safe mutation of the
//! installed-tree log (`spec.md` §4.4).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use portsmith_core::PackageSpec;
use tracing::{debug, trace};

use crate::error::StatusError;
use crate::types::StatusParagraph;

const STATUS_FILE: &str = "status";
const UPDATES_DIR: &str = "updates";

fn key_of(p: &StatusParagraph) -> (PackageSpec, String) {
    p.key()
}

/// An ordered collection of [`StatusParagraph`]s keyed by (package spec,
/// feature), backed by an append-only on-disk log.
///
/// Later paragraphs for the same key always override earlier ones; the
/// in-memory map only ever holds the collapsed, most-recent view. All
/// mutation goes through [`StatusDatabase::append`], which durably records
/// the paragraph before the caller makes any corresponding file-tree change.
#[derive(Debug)]
pub struct StatusDatabase {
    root: PathBuf,
    paragraphs: RwLock<BTreeMap<(PackageSpec, String), StatusParagraph>>,
    next_update: RwLock<u64>,
}

impl StatusDatabase {
    /// Load the database from `root` (the installed tree's `vcpkg/`
    /// directory), reading `status` then every `updates/<NNNNN>` file in
    /// numerically sorted order, without touching disk further.
    pub fn load(root: impl Into<PathBuf>) -> crate::Result<Self> {
        let root = root.into();
        let mut paragraphs = BTreeMap::new();

        let status_path = root.join(STATUS_FILE);
        if status_path.exists() {
            apply_log_file(&status_path, &mut paragraphs)?;
        }

        let updates_dir = root.join(UPDATES_DIR);
        let mut update_numbers = Vec::new();
        if updates_dir.exists() {
            for entry in fs::read_dir(&updates_dir).map_err(|e| StatusError::io(&updates_dir, e))? {
                let entry = entry.map_err(|e| StatusError::io(&updates_dir, e))?;
                if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
                    update_numbers.push(n);
                }
            }
        }
        update_numbers.sort_unstable();
        for n in &update_numbers {
            apply_log_file(&updates_dir.join(format!("{n:05}")), &mut paragraphs)?;
        }

        let next_update = update_numbers.last().map_or(0, |n| n + 1);
        debug!(count = paragraphs.len(), updates = update_numbers.len(), "loaded status database");

        Ok(Self {
            root,
            paragraphs: RwLock::new(paragraphs),
            next_update: RwLock::new(next_update),
        })
    }

    /// Load, then rewrite `status` with the collapsed view and remove the
    /// consumed `updates/` files, under the same write lock used by
    /// [`StatusDatabase::append`].
    pub fn load_collapse(root: impl Into<PathBuf>) -> crate::Result<Self> {
        let db = Self::load(root)?;
        db.collapse()?;
        Ok(db)
    }

    /// Rewrite `status` from the current in-memory view and delete every
    /// consumed `updates/<NNNNN>` file. Pure: the collapsed text contains
    /// exactly the most-recent paragraph per key, in key order.
    pub fn collapse(&self) -> crate::Result<()> {
        let paragraphs = self.paragraphs.read();
        let mut text = String::new();
        for p in paragraphs.values() {
            text.push_str(&p.to_paragraph().to_text());
        }
        drop(paragraphs);

        write_atomic(&self.root.join(STATUS_FILE), &text)?;

        let updates_dir = self.root.join(UPDATES_DIR);
        if updates_dir.exists() {
            for entry in fs::read_dir(&updates_dir).map_err(|e| StatusError::io(&updates_dir, e))? {
                let entry = entry.map_err(|e| StatusError::io(&updates_dir, e))?;
                let path = entry.path();
                if path.file_name().and_then(|n| n.to_str()).and_then(|s| s.parse::<u64>().ok()).is_some() {
                    fs::remove_file(&path).map_err(|e| StatusError::io(&path, e))?;
                }
            }
        }
        trace!("collapsed status database");
        Ok(())
    }

    /// The current paragraph for `(spec, feature)`, if any.
    #[must_use]
    pub fn get(&self, spec: &PackageSpec, feature: &str) -> Option<StatusParagraph> {
        self.paragraphs.read().get(&(spec.clone(), feature.to_string())).cloned()
    }

    /// Whether `(spec, feature)` is currently in the one visible
    /// (want=install, state=installed) state.
    #[must_use]
    pub fn is_installed(&self, spec: &PackageSpec, feature: &str) -> bool {
        self.get(spec, feature).is_some_and(|p| p.is_visible())
    }

    /// Every visible paragraph for `spec`, `core` first.
    #[must_use]
    pub fn installed_features(&self, spec: &PackageSpec) -> Vec<StatusParagraph> {
        let mut out: Vec<_> = self
            .paragraphs
            .read()
            .values()
            .filter(|p| &p.package.spec == spec && p.is_visible())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.package.feature.cmp(&b.package.feature));
        out
    }

    /// All visible paragraphs across every package, in key order.
    #[must_use]
    pub fn all_installed(&self) -> Vec<StatusParagraph> {
        self.paragraphs.read().values().filter(|p| p.is_visible()).cloned().collect()
    }

    /// Durably append `paragraph` to the update log, then apply it to the
    /// in-memory view. Must be called before any corresponding file-tree
    /// change the paragraph describes, per §4.4.3's write ordering.
    pub fn append(&self, paragraph: StatusParagraph) -> crate::Result<()> {
        let mut next = self.next_update.write();
        let n = *next;
        let updates_dir = self.root.join(UPDATES_DIR);
        fs::create_dir_all(&updates_dir).map_err(|e| StatusError::io(&updates_dir, e))?;
        let path = updates_dir.join(format!("{n:05}"));
        write_atomic(&path, &paragraph.to_paragraph().to_text())?;
        *next = n + 1;
        drop(next);

        self.paragraphs.write().insert(key_of(&paragraph), paragraph);
        Ok(())
    }
}

fn apply_log_file(
    path: &Path,
    paragraphs: &mut BTreeMap<(PackageSpec, String), StatusParagraph>,
) -> crate::Result<()> {
    let text = fs::read_to_string(path).map_err(|e| StatusError::io(path, e))?;
    let records = portsmith_core::Paragraph::parse_all(&text)
        .map_err(|e| StatusError::Malformed(e.to_string()))?;
    for record in &records {
        let sp = StatusParagraph::from_paragraph(record)?;
        paragraphs.insert(sp.key(), sp);
    }
    Ok(())
}

/// Write `text` to `path` via a temp file plus rename, so a crash mid-write
/// never leaves a half-written log entry for [`StatusDatabase::load`] to
/// trip over.
fn write_atomic(path: &Path, text: &str) -> crate::Result<()> {
    let parent = path.parent().ok_or_else(|| StatusError::Malformed(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| StatusError::io(parent, e))?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(|e| StatusError::io(&tmp, e))?;
        file.write_all(text.as_bytes()).map_err(|e| StatusError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StatusError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| StatusError::io(path, e))?;

    let dir = fs::File::open(parent).map_err(|e| StatusError::io(parent, e))?;
    dir.sync_all().map_err(|e| StatusError::io(parent, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsmith_core::{Triplet, Version, CORE_FEATURE};
    use tempfile::TempDir;

    use crate::types::BinaryParagraph;

    fn paragraph(name: &str, feature: &str) -> StatusParagraph {
        StatusParagraph::installed(BinaryParagraph {
            spec: PackageSpec::new(name, Triplet::new("x64-linux")),
            version: Version::new("1.0", 0),
            feature: feature.to_string(),
            dependencies: Vec::new(),
            abi_tag: None,
        })
    }

    #[test]
    fn append_then_load_sees_the_paragraph() {
        let dir = TempDir::new().unwrap();
        let db = StatusDatabase::load(dir.path()).unwrap();
        db.append(paragraph("zlib", CORE_FEATURE)).unwrap();

        let reloaded = StatusDatabase::load(dir.path()).unwrap();
        assert!(reloaded.is_installed(&PackageSpec::new("zlib", Triplet::new("x64-linux")), CORE_FEATURE));
    }

    #[test]
    fn later_paragraph_for_same_key_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let db = StatusDatabase::load(dir.path()).unwrap();
        let spec = PackageSpec::new("zlib", Triplet::new("x64-linux"));
        db.append(StatusParagraph::half_installed(BinaryParagraph {
            spec: spec.clone(),
            version: Version::new("1.0", 0),
            feature: CORE_FEATURE.to_string(),
            dependencies: Vec::new(),
            abi_tag: None,
        }))
        .unwrap();
        assert!(!db.is_installed(&spec, CORE_FEATURE));

        db.append(paragraph("zlib", CORE_FEATURE)).unwrap();
        assert!(db.is_installed(&spec, CORE_FEATURE));
    }

    #[test]
    fn collapse_removes_update_files_and_preserves_view() {
        let dir = TempDir::new().unwrap();
        let db = StatusDatabase::load(dir.path()).unwrap();
        db.append(paragraph("zlib", CORE_FEATURE)).unwrap();
        db.append(paragraph("bzip2", CORE_FEATURE)).unwrap();
        db.collapse().unwrap();

        let updates_dir = dir.path().join(UPDATES_DIR);
        let remaining: Vec<_> = fs::read_dir(&updates_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_str().and_then(|s| s.parse::<u64>().ok()).is_some())
            .collect();
        assert!(remaining.is_empty());

        let reloaded = StatusDatabase::load(dir.path()).unwrap();
        assert_eq!(reloaded.all_installed().len(), 2);
    }
}
