//! Archive packing (`spec.md` §4.3.4): a built package directory becomes a
//! single zstd-compressed blob, keyed by ABI tag rather than by the
//! archive's own content hash.
//!
//! The format is a flat sequence of entries — not zip or tar, since neither
//! crate is part of this workspace's stack — but it answers the same
//! question §4.3.4 cares about: two archives for the same tag must
//! decompress to byte-identical trees. Every entry carries the sha-512 of
//! its own bytes, checked on extraction, so a truncated or tampered archive
//! is caught as [`Error::CacheCorrupt`] rather than silently producing a
//! short read.

use std::fs;
use std::io::Read;
use std::path::Path;

use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{hash_bytes, Result};
use tracing::debug;
use walkdir::WalkDir;

const MAGIC: &[u8; 4] = b"PSC1";

/// One file's relative path and the sha-512 of its contents, as recorded by
/// [`pack_directory`] and handed back by [`unpack_archive`] so the caller
/// (the executor) can diff it against a listfile.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    pub entries: Vec<(String, String)>,
}

impl ArchiveManifest {
    /// The relative paths this archive restored, in the order they were
    /// written.
    #[must_use]
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }
}

/// Pack every regular file under `root` into a single compressed archive,
/// paths relative to `root` and sorted for determinism.
pub fn pack_directory(root: &Path) -> Result<Vec<u8>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::io(root, std::io::Error::other(e.to_string())))?;
        if entry.file_type().is_file() {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    let mut body = Vec::new();
    body.extend_from_slice(MAGIC);
    write_u32(&mut body, paths.len() as u32);
    for path in &paths {
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        let digest = hash_bytes(&data);
        write_string(&mut body, &relative);
        write_string(&mut body, &digest);
        write_u32(&mut body, data.len() as u32);
        body.extend_from_slice(&data);
    }

    let compressed = zstd::encode_all(body.as_slice(), 3).map_err(|e| {
        Error::CacheCorrupt { code: ErrorCode::CacheCorrupt, abi_tag: String::new(), backend: "pack".to_string(), message: e.to_string() }
    })?;
    debug!(files = paths.len(), bytes = compressed.len(), "packed archive");
    Ok(compressed)
}

/// Decompress `data` (as produced by [`pack_directory`]) and write every
/// file under `dest`, verifying each entry's sha-512 as it's written.
pub fn unpack_archive(data: &[u8], dest: &Path, abi_tag: &str, backend: &str) -> Result<ArchiveManifest> {
    let corrupt = |message: String| Error::CacheCorrupt {
        code: ErrorCode::CacheCorrupt,
        abi_tag: abi_tag.to_string(),
        backend: backend.to_string(),
        message,
    };

    let mut decoder = zstd::Decoder::new(data).map_err(|e| corrupt(e.to_string()))?;
    let mut body = Vec::new();
    decoder.read_to_end(&mut body).map_err(|e| corrupt(e.to_string()))?;

    let mut cursor = 0usize;
    let magic = read_bytes(&body, &mut cursor, 4, &corrupt)?;
    if magic != MAGIC.as_slice() {
        return Err(corrupt("bad magic".to_string()));
    }
    let count = read_u32(&body, &mut cursor, &corrupt)?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let relative = read_string(&body, &mut cursor, &corrupt)?;
        let expected_digest = read_string(&body, &mut cursor, &corrupt)?;
        let len = read_u32(&body, &mut cursor, &corrupt)? as usize;
        let file_bytes = read_bytes(&body, &mut cursor, len, &corrupt)?;

        let actual_digest = hash_bytes(file_bytes);
        if actual_digest != expected_digest {
            return Err(corrupt(format!("checksum mismatch for {relative}")));
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&target, file_bytes).map_err(|e| Error::io(&target, e))?;
        entries.push((relative, actual_digest));
    }

    Ok(ArchiveManifest { entries })
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_u32(buf, value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}

fn read_bytes<'a>(
    body: &'a [u8],
    cursor: &mut usize,
    len: usize,
    corrupt: &impl Fn(String) -> Error,
) -> Result<&'a [u8]> {
    let end = cursor.checked_add(len).ok_or_else(|| corrupt("length overflow".to_string()))?;
    let slice = body.get(*cursor..end).ok_or_else(|| corrupt("truncated archive".to_string()))?;
    *cursor = end;
    Ok(slice)
}

fn read_u32(body: &[u8], cursor: &mut usize, corrupt: &impl Fn(String) -> Error) -> Result<u32> {
    let bytes = read_bytes(body, cursor, 4, corrupt)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_string(body: &[u8], cursor: &mut usize, corrupt: &impl Fn(String) -> Error) -> Result<String> {
    let len = read_u32(body, cursor, corrupt)? as usize;
    let bytes = read_bytes(body, cursor, len, corrupt)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_a_directory_tree() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("lib")).unwrap();
        fs::write(src.path().join("lib/libfoo.a"), b"static archive contents").unwrap();
        fs::write(src.path().join("include.h"), b"#pragma once").unwrap();

        let archive = pack_directory(src.path()).unwrap();

        let dest = TempDir::new().unwrap();
        let manifest = unpack_archive(&archive, dest.path(), "abitag", "local").unwrap();

        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(fs::read(dest.path().join("lib/libfoo.a")).unwrap(), b"static archive contents");
        assert_eq!(fs::read(dest.path().join("include.h")).unwrap(), b"#pragma once");
    }

    #[test]
    fn tampered_archive_is_reported_corrupt() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();
        let mut archive = pack_directory(src.path()).unwrap();
        let last = archive.len() - 1;
        archive[last] ^= 0xFF;

        let dest = TempDir::new().unwrap();
        let result = unpack_archive(&archive, dest.path(), "abitag", "local");
        assert!(result.is_err());
    }
}
