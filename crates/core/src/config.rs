//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Nothing in this crate reads environment variables while handling a
//! request.

use crate::codes::{CodeKind, CodeList};
use crate::constants::{
    DEFAULT_CID_CODES_PATH, DEFAULT_DATA_DIR, DEFAULT_TUSS_CODES_PATH, RecordKind,
};
use crate::error::{LaudoError, LaudoResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    data_dir: PathBuf,
    cid_codes_path: Option<PathBuf>,
    tuss_codes_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `None` code-list paths fall back to the shipped defaults, which may be absent.
    pub fn new(
        data_dir: PathBuf,
        cid_codes_path: Option<PathBuf>,
        tuss_codes_path: Option<PathBuf>,
    ) -> LaudoResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(LaudoError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self {
            data_dir,
            cid_codes_path,
            tuss_codes_path,
        })
    }

    /// Builds a config from raw environment values (`LAUDO_DATA_DIR`, `LAUDO_CID_CODES`,
    /// `LAUDO_TUSS_CODES`). Blank values count as unset.
    pub fn from_env_values(
        data_dir: Option<String>,
        cid_codes: Option<String>,
        tuss_codes: Option<String>,
    ) -> LaudoResult<Self> {
        fn set(value: Option<String>) -> Option<PathBuf> {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| PathBuf::from(v.trim()))
        }

        Self::new(
            set(data_dir).unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            set(cid_codes),
            set(tuss_codes),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one table of the store.
    pub fn table_dir(&self, kind: RecordKind) -> PathBuf {
        self.data_dir.join(kind.dir_name())
    }

    /// Reference-list file for `kind`, configured or default.
    pub fn code_list_path(&self, kind: CodeKind) -> &Path {
        let (configured, default) = match kind {
            CodeKind::Cid => (&self.cid_codes_path, DEFAULT_CID_CODES_PATH),
            CodeKind::Tuss => (&self.tuss_codes_path, DEFAULT_TUSS_CODES_PATH),
        };
        configured.as_deref().unwrap_or(Path::new(default))
    }

    fn code_list_is_configured(&self, kind: CodeKind) -> bool {
        match kind {
            CodeKind::Cid => self.cid_codes_path.is_some(),
            CodeKind::Tuss => self.tuss_codes_path.is_some(),
        }
    }
}

/// Both reference lists, loaded once and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct CodeLists {
    cid: Arc<CodeList>,
    tuss: Arc<CodeList>,
}

impl CodeLists {
    pub fn new(cid: CodeList, tuss: CodeList) -> Self {
        Self {
            cid: Arc::new(cid),
            tuss: Arc::new(tuss),
        }
    }

    /// Loads the lists named by `cfg`.
    ///
    /// A missing default file yields an empty list and a warning, so the service still starts
    /// without reference data. A file that was configured explicitly must exist.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::FileRead`] for an unreadable configured file and
    /// [`LaudoError::CodeList`] for a file that does not parse.
    pub fn load(cfg: &CoreConfig) -> LaudoResult<Self> {
        Ok(Self::new(
            load_one(cfg, CodeKind::Cid)?,
            load_one(cfg, CodeKind::Tuss)?,
        ))
    }

    pub fn get(&self, kind: CodeKind) -> &CodeList {
        match kind {
            CodeKind::Cid => &self.cid,
            CodeKind::Tuss => &self.tuss,
        }
    }
}

fn load_one(cfg: &CoreConfig, kind: CodeKind) -> LaudoResult<CodeList> {
    let path = cfg.code_list_path(kind);
    if !path.exists() && !cfg.code_list_is_configured(kind) {
        tracing::warn!(
            "{} code list not found at {}; searches will return nothing",
            kind.label(),
            path.display()
        );
        return Ok(CodeList::default());
    }
    CodeList::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_data_dir_is_rejected() {
        let err = CoreConfig::new(PathBuf::new(), None, None).expect_err("empty dir");
        assert!(matches!(err, LaudoError::InvalidInput(_)));
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        let cfg = CoreConfig::from_env_values(None, Some("  ".into()), None).expect("cfg");
        assert_eq!(cfg.data_dir(), Path::new(DEFAULT_DATA_DIR));
        assert_eq!(
            cfg.code_list_path(CodeKind::Cid),
            Path::new(DEFAULT_CID_CODES_PATH)
        );
        assert_eq!(
            cfg.table_dir(RecordKind::Report),
            Path::new(DEFAULT_DATA_DIR).join("reports")
        );
    }

    #[test]
    fn missing_default_lists_load_empty() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = CoreConfig::new(dir.path().to_path_buf(), None, None).expect("cfg");
        // Defaults are relative paths; the test binary runs from the crate dir where they are absent.
        if cfg.code_list_path(CodeKind::Cid).exists() {
            return;
        }
        let lists = CodeLists::load(&cfg).expect("defaults may be missing");
        assert!(lists.get(CodeKind::Cid).is_empty());
    }

    #[test]
    fn missing_configured_list_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = CoreConfig::new(
            dir.path().to_path_buf(),
            Some(dir.path().join("nope.json")),
            None,
        )
        .expect("cfg");
        assert!(matches!(
            CodeLists::load(&cfg),
            Err(LaudoError::FileRead(_))
        ));
    }

    #[test]
    fn configured_lists_are_loaded() {
        let dir = TempDir::new().expect("tempdir");
        let cid = dir.path().join("cid.json");
        let tuss = dir.path().join("tuss.json");
        fs::write(&cid, r#"[{"code": "J18.9", "description": "J18.9 - Pneumonia"}]"#).unwrap();
        fs::write(&tuss, "[]").unwrap();

        let cfg = CoreConfig::new(dir.path().to_path_buf(), Some(cid), Some(tuss)).expect("cfg");
        let lists = CodeLists::load(&cfg).expect("load");
        assert_eq!(lists.get(CodeKind::Cid).len(), 1);
        assert!(lists.get(CodeKind::Tuss).is_empty());
    }
}
