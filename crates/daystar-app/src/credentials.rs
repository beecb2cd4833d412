// Resolve Sheets API credentials from the environment, a service-account key
// file, or credentials.toml.

use std::fmt;
use std::path::{Path, PathBuf};

use daystar_sheets::source::SheetsAuth;
use thiserror::Error;
use tracing::debug;

use crate::config::CredentialsConfig;

/// OAuth access token for the Sheets API, checked before anything else.
pub const ENV_TOKEN_VAR: &str = "DAYSTAR_SHEETS_TOKEN";

/// Sheets API key, checked after the token.
pub const ENV_API_KEY_VAR: &str = "DAYSTAR_SHEETS_API_KEY";

/// Path to a Google service-account JSON key, checked before credentials.toml.
pub const ENV_SERVICE_ACCOUNT_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Scope requested when exchanging a service-account key for a token.
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(
        "no Google Sheets credentials found; set {} or {} or {}, or add access_token / api_key to config/credentials.toml",
        ENV_TOKEN_VAR,
        ENV_API_KEY_VAR,
        ENV_SERVICE_ACCOUNT_VAR
    )]
    Missing,

    #[error(
        "service account file not found: {path} (from ${}; check your .env)",
        ENV_SERVICE_ACCOUNT_VAR
    )]
    ServiceAccountFileMissing { path: PathBuf },

    #[error("failed to load service account key {path}: {source}")]
    ServiceAccountKey {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("token request for service account {path} failed: {source}")]
    TokenRequest {
        path: PathBuf,
        source: yup_oauth2::Error,
    },

    #[error("token response for service account {path} carried no access token")]
    EmptyToken { path: PathBuf },
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    EnvToken,
    EnvApiKey,
    ServiceAccount,
    FileToken,
    FileApiKey,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::EnvToken => write!(f, "${ENV_TOKEN_VAR}"),
            CredentialSource::EnvApiKey => write!(f, "${ENV_API_KEY_VAR}"),
            CredentialSource::ServiceAccount => write!(f, "${ENV_SERVICE_ACCOUNT_VAR}"),
            CredentialSource::FileToken => f.write_str("credentials.toml access_token"),
            CredentialSource::FileApiKey => f.write_str("credentials.toml api_key"),
        }
    }
}

/// A credential before any network exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent to the Sheets API as-is.
    Ready(SheetsAuth),
    /// Service-account key file, exchanged for a bearer token on use.
    ServiceAccountKey(PathBuf),
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Ready(auth) => auth.kind(),
            Credential::ServiceAccountKey(_) => "service account",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedAuth {
    pub credential: Credential,
    pub source: CredentialSource,
}

impl ResolvedAuth {
    /// Turn the credential into request auth, minting a token from the
    /// service-account key when needed.
    pub async fn into_sheets_auth(self) -> Result<SheetsAuth, CredentialsError> {
        match self.credential {
            Credential::Ready(auth) => Ok(auth),
            Credential::ServiceAccountKey(path) => service_account_token(&path).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Pick the credential to use, in order: env token, env API key,
/// `GOOGLE_APPLICATION_CREDENTIALS` key file, file token, file API key.
/// Blank values are ignored. A key-file variable pointing at a missing file
/// is an error rather than a fall-through.
pub fn resolve_auth(file: &CredentialsConfig) -> Result<ResolvedAuth, CredentialsError> {
    resolve_auth_with(file, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_auth_with<F>(
    file: &CredentialsConfig,
    env: F,
) -> Result<ResolvedAuth, CredentialsError>
where
    F: Fn(&str) -> Option<String>,
{
    let ready = |value: Option<String>, source: CredentialSource| {
        let value = non_blank(value)?;
        let auth = match source {
            CredentialSource::EnvApiKey | CredentialSource::FileApiKey => SheetsAuth::ApiKey(value),
            _ => SheetsAuth::BearerToken(value),
        };
        Some(ResolvedAuth {
            credential: Credential::Ready(auth),
            source,
        })
    };

    if let Some(found) = ready(env(ENV_TOKEN_VAR), CredentialSource::EnvToken)
        .or_else(|| ready(env(ENV_API_KEY_VAR), CredentialSource::EnvApiKey))
    {
        return Ok(found);
    }

    if let Some(path) = non_blank(env(ENV_SERVICE_ACCOUNT_VAR)) {
        let path = PathBuf::from(path);
        if !path.is_file() {
            return Err(CredentialsError::ServiceAccountFileMissing { path });
        }
        return Ok(ResolvedAuth {
            credential: Credential::ServiceAccountKey(path),
            source: CredentialSource::ServiceAccount,
        });
    }

    ready(file.access_token.clone(), CredentialSource::FileToken)
        .or_else(|| ready(file.api_key.clone(), CredentialSource::FileApiKey))
        .ok_or(CredentialsError::Missing)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn service_account_token(path: &Path) -> Result<SheetsAuth, CredentialsError> {
    let key_error = |source| CredentialsError::ServiceAccountKey {
        path: path.to_path_buf(),
        source,
    };

    let key = yup_oauth2::read_service_account_key(path)
        .await
        .map_err(key_error)?;
    let authenticator = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(key_error)?;

    debug!(path = %path.display(), "requesting service account token");
    let token = authenticator
        .token(&[SHEETS_READONLY_SCOPE])
        .await
        .map_err(|e| CredentialsError::TokenRequest {
            path: path.to_path_buf(),
            source: e,
        })?;

    token
        .token()
        .map(|t| SheetsAuth::BearerToken(t.to_string()))
        .ok_or_else(|| CredentialsError::EmptyToken {
            path: path.to_path_buf(),
        })
}

// ---------------------------------------------------------------------------
// .env
// ---------------------------------------------------------------------------

/// Load `<base_dir>/.env`, or the nearest `.env` from the current directory
/// upwards when no base dir is given. Variables already set in the process
/// win. Returns the file loaded, or `None` when there is none.
pub fn load_dotenv(base_dir: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match base_dir {
        Some(dir) => {
            let path = dir.join(".env");
            dotenvy::from_path(&path).map(|()| path)
        }
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
