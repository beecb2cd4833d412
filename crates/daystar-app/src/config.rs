// Configuration loading and parsing (sheets.toml, credentials.toml).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use daystar_sheets::rows::ColumnNames;
use daystar_sheets::source::DEFAULT_API_BASE_URL;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub sheets: SheetsConfig,
    pub export: ExportConfig,
    pub columns: ColumnNames,
    pub credentials: CredentialsConfig,
    /// Directory the config was loaded from; relative paths resolve here.
    pub base_dir: PathBuf,
}

impl Config {
    /// Export directory, resolved against `base_dir` when relative.
    pub fn export_dir(&self) -> PathBuf {
        let dir = Path::new(&self.export.dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        }
    }
}

// ---------------------------------------------------------------------------
// sheets.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire sheets.toml file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetsFile {
    sheets: SheetsConfig,
    #[serde(default)]
    export: ExportConfig,
    #[serde(default)]
    columns: ColumnNames,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub default_tab: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_export_dir() -> String {
    "data".to_string()
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialsConfig")
            .field("access_token", &mask(&self.access_token))
            .field("api_key", &mask(&self.api_key))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/sheets.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- sheets.toml (required) ---
    let sheets_path = config_dir.join("sheets.toml");
    let sheets_text = read_file(&sheets_path)?;
    let sheets_file: SheetsFile =
        toml::from_str(&sheets_text).map_err(|e| ConfigError::ParseError {
            path: sheets_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        sheets: sheets_file.sheets,
        export: sheets_file.export,
        columns: sheets_file.columns,
        credentials,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Config files seeded from `defaults/` on first run. `credentials.toml` is
/// never seeded: it only exists as `credentials.toml.example`.
const SEEDED_FILES: &[&str] = &["sheets.toml"];

/// Copy each seeded file from `defaults/` into `config/` unless the user
/// already has one. Returns the files that were written.
///
/// A project without `defaults/` is fine as long as `config/` exists.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(vec![]);
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither defaults/ nor config/ directory found in {}; \
                 run from the project root or pass --base-dir",
                base_dir.display()
            ),
        });
    }

    let mut seeded = Vec::new();
    for name in SEEDED_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        seed_file(&source, &target)?;
        info!(path = %target.display(), "created config file from defaults");
        seeded.push(target);
    }

    Ok(seeded)
}

fn seed_file(source: &Path, target: &Path) -> Result<(), ConfigError> {
    let fail = |action: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {e}", path.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| fail("create", dir, e))?;
    }
    let text = std::fs::read_to_string(source).map_err(|e| fail("read", source, e))?;
    std::fs::write(target, text).map_err(|e| fail("write", target, e))
}

/// Load config relative to `base_dir` (or the current directory), copying
/// default config files into place first.
pub fn load_config(base_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let base_dir = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
            path: PathBuf::from("."),
        })?,
    };
    ensure_config_files(&base_dir)?;
    load_config_from(&base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let required: &[(&str, &str)] = &[
        ("sheets.spreadsheet_id", config.sheets.spreadsheet_id.as_str()),
        ("sheets.default_tab", config.sheets.default_tab.as_str()),
        ("export.dir", config.export.dir.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: field.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let base = &config.sheets.api_base_url;
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return Err(ConfigError::ValidationError {
            field: "sheets.api_base_url".into(),
            message: format!("must be an http(s) URL, got {base:?}"),
        });
    }

    let mut seen = HashSet::new();
    for (field, header) in config.columns.fields() {
        let header = header.trim();
        if header.is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("columns.{field}"),
                message: "must not be empty".into(),
            });
        }
        if !seen.insert(header.to_ascii_lowercase()) {
            return Err(ConfigError::ValidationError {
                field: format!("columns.{field}"),
                message: format!("header {header:?} is already used by another column"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Helper: returns the path to the daystar-app crate root
    /// (works whether `cargo test` runs from the crate root or repo root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/daystar-app/defaults").exists() {
            cwd.join("crates/daystar-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir with `config/` holding the default sheets.toml, with
    /// `edit` applied to its text.
    fn temp_config(name: &str, edit: impl Fn(String) -> String) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let text = fs::read_to_string(project_root().join("defaults/sheets.toml")).unwrap();
        fs::write(config_dir.join("sheets.toml"), edit(text)).unwrap();
        tmp
    }

    fn expect_validation_field(tmp: &Path, expected: &str) {
        let err = load_config_from(tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_default_config() {
        let tmp = temp_config("daystar_config_defaults", |t| t);

        let config = load_config_from(&tmp).expect("should load default config");
        assert_eq!(config.sheets.spreadsheet_id, "replace-with-your-spreadsheet-id");
        assert_eq!(config.sheets.default_tab, "actions");
        assert_eq!(config.sheets.api_base_url, "https://sheets.googleapis.com");
        assert_eq!(config.export.dir, "data");
        assert_eq!(config.export_dir(), tmp.join("data"));
        assert_eq!(config.columns, ColumnNames::default());
        assert!(config.credentials.access_token.is_none());
        assert!(config.credentials.api_key.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = std::env::temp_dir().join("daystar_config_minimal");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("sheets.toml"),
            "[sheets]\nspreadsheet_id = \"abc\"\ndefault_tab = \"log\"\n\n[columns]\nactual = \"Done\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load minimal config");
        assert_eq!(config.sheets.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.export.dir, "data");
        assert_eq!(config.columns.actual, "Done");
        assert_eq!(config.columns.target, "target");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn absolute_export_dir_is_kept() {
        let tmp = temp_config("daystar_config_abs_export", |t| {
            t.replace("dir = \"data\"", "dir = \"/var/tmp/daystar-export\"")
        });
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.export_dir(), PathBuf::from("/var/tmp/daystar-export"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_is_loaded() {
        let tmp = temp_config("daystar_config_with_creds", |t| t);
        fs::write(
            tmp.join("config/credentials.toml"),
            "access_token = \"ya29.test-token\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load with credentials.toml");
        assert_eq!(config.credentials.access_token.as_deref(), Some("ya29.test-token"));
        assert!(config.credentials.api_key.is_none());

        let dbg = format!("{:?}", config.credentials);
        assert!(!dbg.contains("ya29.test-token"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_spreadsheet_id() {
        let tmp = temp_config("daystar_config_empty_id", |t| {
            t.replace(
                "spreadsheet_id = \"replace-with-your-spreadsheet-id\"",
                "spreadsheet_id = \"  \"",
            )
        });
        expect_validation_field(&tmp, "sheets.spreadsheet_id");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_default_tab() {
        let tmp = temp_config("daystar_config_empty_tab", |t| {
            t.replace("default_tab = \"actions\"", "default_tab = \"\"")
        });
        expect_validation_field(&tmp, "sheets.default_tab");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_api_base() {
        let tmp = temp_config("daystar_config_bad_base", |t| {
            t.replace("https://sheets.googleapis.com", "ftp://example.com")
        });
        expect_validation_field(&tmp, "sheets.api_base_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_duplicate_column_headers() {
        let tmp = temp_config("daystar_config_dup_columns", |t| {
            t.replace("target = \"target\"", "target = \"Actual\"")
        });
        expect_validation_field(&tmp, "columns.target");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_keys() {
        let tmp = temp_config("daystar_config_unknown_key", |t| {
            t.replace("[export]", "[export]\nformat = \"xlsx\"")
        });
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("sheets.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_sheets_toml() {
        let tmp = std::env::temp_dir().join("daystar_config_missing_sheets");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("sheets.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_credentials_toml() {
        let tmp = temp_config("daystar_config_bad_creds", |t| t);
        fs::write(tmp.join("config/credentials.toml"), "access_token = [[[").unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("credentials.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("daystar_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            project_root().join("defaults/sheets.toml"),
            defaults_dir.join("sheets.toml"),
        )
        .unwrap();
        fs::copy(
            project_root().join("defaults/credentials.toml.example"),
            defaults_dir.join("credentials.toml.example"),
        )
        .unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/sheets.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run copies nothing and keeps edits.
        fs::write(tmp.join("config/sheets.toml"), "# custom\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/sheets.toml")).unwrap(),
            "# custom\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_reports_missing_default() {
        let tmp = std::env::temp_dir().join("daystar_config_missing_default");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("failed to read"), "message: {message}");
                assert!(message.contains("sheets.toml"), "message: {message}");
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_accepts_config_without_defaults() {
        let tmp = std::env::temp_dir().join("daystar_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        assert!(ensure_config_files(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("daystar_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_config_with_base_dir_copies_then_loads() {
        let tmp = std::env::temp_dir().join("daystar_config_load_base_dir");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/sheets.toml"),
            tmp.join("defaults/sheets.toml"),
        )
        .unwrap();

        let config = load_config(Some(&tmp)).expect("should load after copying defaults");
        assert_eq!(config.base_dir, tmp);
        assert!(tmp.join("config/sheets.toml").exists());

        let _ = fs::remove_dir_all(&tmp);
    }
}
