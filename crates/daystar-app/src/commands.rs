// Logic behind the small one-shot commands (`rate`, `stars`, `check`).

use std::path::Path;

use daystar_core::{validate_stars, ActionMeasurement, MeasurementModel, ScoreError, StarInput};

use crate::config::Config;
use crate::credentials::{resolve_auth_with, CredentialsError, ENV_SERVICE_ACCOUNT_VAR};

/// Score one measurement given on the command line.
pub fn rate(
    model: MeasurementModel,
    actual: i64,
    target: i64,
    upper_limit: Option<i64>,
) -> Result<u8, ScoreError> {
    ActionMeasurement {
        model,
        actual,
        target,
        upper_limit,
    }
    .score()
}

/// Normalise a star value typed on the command line.
pub fn stars(value: &str) -> Result<u8, ScoreError> {
    validate_stars(&StarInput::from(value))
}

/// Lines printed by `daystar check`. Secrets are never included; only the
/// kind of credential and where it came from.
pub fn check_report<F>(config: &Config, dotenv: Option<&Path>, env: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut lines = vec![
        format!("Config: {}", config.base_dir.join("config/sheets.toml").display()),
        format!("Spreadsheet: {}", config.sheets.spreadsheet_id),
        format!("Default tab: {}", config.sheets.default_tab),
        format!("API base URL: {}", config.sheets.api_base_url),
        format!("Export dir: {}", config.export_dir().display()),
    ];

    lines.push(match dotenv {
        Some(path) => format!(".env: {}", path.display()),
        None => ".env: not found".to_string(),
    });

    lines.push(match env(ENV_SERVICE_ACCOUNT_VAR) {
        Some(path) => {
            let state = if Path::new(path.trim()).is_file() {
                "file found"
            } else {
                "file missing"
            };
            format!("{ENV_SERVICE_ACCOUNT_VAR} = {path} ({state})")
        }
        None => format!("{ENV_SERVICE_ACCOUNT_VAR} = (unset)"),
    });

    lines.push(match resolve_auth_with(&config.credentials, env) {
        Ok(resolved) => format!(
            "Credentials: {} from {}",
            resolved.credential.kind(),
            resolved.source
        ),
        Err(CredentialsError::Missing) => format!("Credentials: none ({})", CredentialsError::Missing),
        Err(e) => format!("Credentials: error: {e}"),
    });

    lines
}
