//! Content fingerprinting with ignore-rule filtering and binary detection.

use std::collections::HashMap;
use std::path::Path;

use csm_domain::ports::IgnorePredicate;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Curated extensions treated as binary regardless of content, covering the
/// categories: archives, images, media, compiled
/// artifacts, databases, compressed formats, DB journals, ML weights, fonts,
/// and environment/secret files with binary-ish payloads.
const BINARY_EXTENSIONS: &[&str] = &[
    // archives / compressed
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "tgz",
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff",
    // media
    "mp3", "mp4", "wav", "avi", "mov", "mkv", "flac", "ogg",
    // compiled artifacts
    "o", "so", "dll", "dylib", "exe", "class", "pyc", "bin",
    // databases
    "db", "sqlite", "sqlite3",
    // db journals
    "wal", "shm", "journal",
    // ML weights
    "safetensors", "pt", "pth", "onnx", "h5", "ckpt",
    // fonts
    "ttf", "otf", "woff", "woff2",
];

/// Null-byte / non-ASCII scan window.
const BINARY_SCAN_WINDOW: usize = 8 * 1024;
/// Files larger than this are always treated as binary (never hashed/diffed).
const MAX_TEXT_FILE_SIZE: u64 = 1024 * 1024;

/// `true` if `path` should be treated as binary: never hashed, never diffed.
pub fn is_binary_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if BINARY_EXTENSIONS
            .iter()
            .any(|b| b.eq_ignore_ascii_case(ext))
        {
            return true;
        }
    }

    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if metadata.len() > MAX_TEXT_FILE_SIZE {
        return true;
    }

    let Ok(bytes) = std::fs::read(path) else {
        return false;
    };
    let window = &bytes[..bytes.len().min(BINARY_SCAN_WINDOW)];
    if window.contains(&0) {
        return true;
    }
    if std::str::from_utf8(&bytes).is_err() {
        let non_ascii = bytes.iter().filter(|&&b| b > 127).count();
        let ratio = non_ascii as f64 / bytes.len().max(1) as f64;
        if ratio > 0.30 {
            return true;
        }
    }
    false
}

/// SHA-256 over `dir`, filtered by `ignore`, skipping binary files.
///
/// Unreadable files are logged and skipped, never propagated. The returned map is order-independent.
pub fn fingerprint_dir(dir: &Path, ignore: &IgnorePredicate) -> HashMap<String, String> {
    let mut hashes = HashMap::new();

    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        if entry.path() == dir {
            return true;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            return true;
        };
        !ignore(rel, entry.file_type().is_dir())
    });

    for entry in walker.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if ignore(rel, false) {
            continue;
        }
        if is_binary_file(entry.path()) {
            continue;
        }
        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                let mut hasher = Sha256::new();
                hasher.update(&bytes);
                let digest = hex::encode(hasher.finalize());
                hashes.insert(rel.to_string_lossy().replace('\\', "/"), digest);
            }
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
            }
        }
    }

    hashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn no_ignore() -> IgnorePredicate {
        Arc::new(|_, _| false)
    }

    #[test]
    fn hashes_text_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')").unwrap();
        let hashes = fingerprint_dir(dir.path(), &no_ignore());
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key("main.py"));
    }

    #[test]
    fn skips_binary_by_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2, 3]).unwrap();
        let hashes = fingerprint_dir(dir.path(), &no_ignore());
        assert!(hashes.is_empty());
    }

    #[test]
    fn skips_null_byte_content() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("weird.dat"), [b'a', 0, b'b']).unwrap();
        assert!(is_binary_file(&dir.path().join("weird.dat")));
    }

    #[test]
    fn respects_ignore_predicate() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target").join("artifact.txt"), "x").unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')").unwrap();
        let ignore: IgnorePredicate = Arc::new(|p: &Path, is_dir: bool| {
            is_dir && p.to_string_lossy().starts_with("target")
        });
        let hashes = fingerprint_dir(dir.path(), &ignore);
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key("main.py"));
    }

    #[test]
    fn deterministic_across_runs() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "same content").unwrap();
        let first = fingerprint_dir(dir.path(), &no_ignore());
        let second = fingerprint_dir(dir.path(), &no_ignore());
        assert_eq!(first, second);
    }
}
