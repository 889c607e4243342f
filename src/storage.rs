//! Flat-file storage
//!
//! Owns the source (upload) and export (download) directories. Source
//! names are resolved strictly inside the upload directory; export names
//! carry a random suffix so that repeated exports never overwrite one
//! another.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload and download directories plus the file-name rules for both
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    upload_dir: PathBuf,
    download_dir: PathBuf,
    allowed_extensions: Vec<String>,
}

impl FileStore {
    /// Create a store over explicit directories
    pub fn new(upload_dir: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            download_dir: download_dir.into(),
            allowed_extensions: vec!["csv".to_string(), "tsv".to_string(), "txt".to_string()],
        }
    }

    /// Create a store from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.upload_dir, &config.download_dir)
            .with_allowed_extensions(config.allowed_extensions.clone())
    }

    /// Replace the accepted source extensions
    #[must_use]
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Source directory
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Export directory
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Create both directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)?;
        fs::create_dir_all(&self.download_dir)?;
        Ok(())
    }

    /// Whether `name` has an accepted source extension
    pub fn is_allowed(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Path of a source file inside the upload directory.
    ///
    /// Rejects names that could escape the directory and names without an
    /// accepted extension. Does not check that the file exists.
    pub fn resolve_source(&self, name: &str) -> Result<PathBuf> {
        let name = checked_name(name)?;
        if !self.is_allowed(name) {
            return Err(Error::invalid_request(format!(
                "file type not allowed: '{name}' (allowed: {})",
                self.allowed_extensions.join(", ")
            )));
        }
        Ok(self.upload_dir.join(name))
    }

    /// Path of a previously exported file inside the download directory
    pub fn resolve_export(&self, name: &str) -> Result<PathBuf> {
        let path = self.download_dir.join(checked_name(name)?);
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }

    /// Save uploaded bytes as a source file, returning its path
    pub fn store_upload(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.resolve_source(&sanitize_file_name(name))?;
        fs::create_dir_all(&self.upload_dir)?;
        fs::write(&path, contents)?;
        tracing::info!("Stored upload {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }

    /// A fresh, collision-resistant export path:
    /// `<download_dir>/<sanitized base>_<uuid>.csv`
    pub fn export_path(&self, base: &str) -> PathBuf {
        let base = sanitize_file_name(base);
        let base = if base.is_empty() { "export".to_string() } else { base };
        self.download_dir
            .join(format!("{base}_{}.csv", Uuid::new_v4()))
    }
}

/// Reject empty names, path separators, parent references and absolute
/// paths
fn checked_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::missing_parameter("file name"));
    }
    if trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
        || Path::new(trimmed).is_absolute()
    {
        return Err(Error::invalid_request(format!(
            "file name '{trimmed}' must not contain a path"
        )));
    }
    Ok(trimmed)
}

/// Reduce a name to ASCII letters, digits, `.`, `_` and `-`
pub fn sanitize_file_name(name: &str) -> String {
    let mapped: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut cleaned = mapped.trim_matches(|c| c == '.' || c == '_').to_string();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use test_case::test_case;

    fn store() -> FileStore {
        FileStore::new("/srv/in", "/srv/out")
    }

    #[test]
    fn test_resolve_source() {
        assert_eq!(
            store().resolve_source("people.csv").unwrap(),
            PathBuf::from("/srv/in/people.csv")
        );
        assert!(store().resolve_source("PEOPLE.TSV").is_ok());
    }

    #[test_case("../etc/passwd.csv" ; "parent")]
    #[test_case("nested/people.csv" ; "separator")]
    #[test_case("/abs/people.csv" ; "absolute")]
    #[test_case("a\\b.csv" ; "backslash")]
    fn test_resolve_source_rejects_paths(name: &str) {
        let err = store().resolve_source(name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_resolve_source_rejects_extension() {
        let err = store().resolve_source("data.parquet").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("csv, tsv, txt"));

        let err = store().resolve_source("  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_custom_extensions() {
        let store = store().with_allowed_extensions(vec![".PSV".to_string()]);
        assert!(store.is_allowed("data.psv"));
        assert!(!store.is_allowed("data.csv"));
    }

    #[test_case("people export", "people_export")]
    #[test_case("../../x", "x")]
    #[test_case("ok-name_1.csv", "ok-name_1.csv")]
    #[test_case("données", "donn_es")]
    fn test_sanitize_file_name(input: &str, expected: &str) {
        assert_eq!(sanitize_file_name(input), expected);
    }

    #[test]
    fn test_export_path_is_unique() {
        let store = store();
        let first = store.export_path("people_export");
        let second = store.export_path("people_export");

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/srv/out")));
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("people_export_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_store_upload_and_resolve_export() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("in"), dir.path().join("out"));
        store.ensure_dirs().unwrap();

        let path = store.store_upload("my data.csv", b"a,b\n1,2\n").unwrap();
        assert_eq!(path, dir.path().join("in").join("my_data.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");

        let export = store.export_path("t_export");
        fs::write(&export, "a\n").unwrap();
        let name = export.file_name().unwrap().to_str().unwrap();
        assert_eq!(store.resolve_export(name).unwrap(), export);
        assert_eq!(
            store.resolve_export("missing.csv").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
