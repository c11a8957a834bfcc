use crate::config::AppConfig;
use tempfile::TempDir;

/// Creates a unique temporary directory and points `AppConfig::cache_root`
/// at its absolute path for the duration of the test. The directory is
/// automatically cleaned up when the returned `TempDir` is dropped.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
/// Tests using this touch global state and should run `#[serial]`.
pub fn setup_test_cache_root() -> TempDir {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    AppConfig::set_cache_root(abs.to_string_lossy().into_owned());
    tmp
}

/// Same as [`setup_test_cache_root`] for the raw dump directory.
pub fn setup_test_source_root() -> TempDir {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    AppConfig::set_source_root(abs.to_string_lossy().into_owned());
    tmp
}
