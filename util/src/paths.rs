use crate::config::AppConfig;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Extension carried by every cache blob.
pub const CACHE_EXTENSION: &str = "cached";

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Resolve a configured root. Relative values are taken against current_dir().
pub fn absolute_root(root: &str) -> PathBuf {
    let p = PathBuf::from(root);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Global cache root (absolute), from `AppConfig::cache_root`.
pub fn cache_root() -> PathBuf {
    absolute_root(&AppConfig::global().cache_root)
}

/// Global source dump root (absolute), from `AppConfig::source_root`.
pub fn source_root() -> PathBuf {
    absolute_root(&AppConfig::global().source_root)
}

/// Cache blob for one course: {root}/course_{course_id}.cached
pub fn course_cache_path(root: &Path, course_id: &str) -> PathBuf {
    root.join(format!("course_{course_id}.{CACHE_EXTENSION}"))
}

/// Raw dump directory for one course: {root}/{course_id}
pub fn course_source_dir(root: &Path, course_id: &str) -> PathBuf {
    root.join(course_id)
}

/// True when `path` names a cache blob (by extension).
pub fn is_cache_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == CACHE_EXTENSION)
}
