use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api.dhan.co/v2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_CLIENT_ID: &str = "DHAN_CLIENT_ID";
const ENV_ACCESS_TOKEN: &str = "DHAN_ACCESS_TOKEN";
const ENV_BASE_URL: &str = "DHAN_BASE_URL";

/// Credentials and connection settings for the Dhan API.
///
/// Constructed once at startup and handed to the client by value; nothing
/// reads credentials from ambient state after that.
#[derive(Debug, Clone)]
pub struct DhanConfig {
    pub client_id: String,
    pub access_token: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credential {0}: set it in the config file or environment")]
    MissingCredential(&'static str),
    #[error("credential {0} looks like a placeholder, supply a real value")]
    PlaceholderCredential(&'static str),
    #[error("credential {0} contains characters that cannot be sent in a header")]
    MalformedCredential(&'static str),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// On-disk shape of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileConfig {
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl DhanConfig {
    /// Build a config from explicit credentials, applying defaults and
    /// rejecting empty or placeholder values.
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let client_id = validate_credential("client_id", client_id.into())?;
        let access_token = validate_credential("access_token", access_token.into())?;
        Ok(Self {
            client_id,
            access_token,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Resolve configuration from an optional TOML file, with the
    /// environment filling any gaps.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        Self::from_parts(file, |name| std::env::var(name).ok())
    }

    pub(crate) fn from_parts(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = file
            .client_id
            .or_else(|| env(ENV_CLIENT_ID))
            .ok_or(ConfigError::MissingCredential("client_id"))?;
        let access_token = file
            .access_token
            .or_else(|| env(ENV_ACCESS_TOKEN))
            .ok_or(ConfigError::MissingCredential("access_token"))?;

        let mut config = Self::new(client_id, access_token)?;
        if let Some(base_url) = file.base_url.or_else(|| env(ENV_BASE_URL)) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = file.timeout_secs {
            config.timeout_secs = timeout;
        }
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn validate_credential(name: &'static str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::MissingCredential(name));
    }
    if is_placeholder(&value) {
        return Err(ConfigError::PlaceholderCredential(name));
    }
    Ok(value)
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.to_lowercase();
    lowered.contains("your_")
        || lowered.contains("your-")
        || lowered.contains("placeholder")
        || lowered == "changeme"
        || lowered == "token"
        || lowered == "..."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let config = DhanConfig::new("1000000001", "eyJhbGciOi.example.token").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_empty_credential_rejected() {
        assert!(matches!(
            DhanConfig::new("", "real-token"),
            Err(ConfigError::MissingCredential("client_id"))
        ));
        assert!(matches!(
            DhanConfig::new("1000000001", "   "),
            Err(ConfigError::MissingCredential("access_token"))
        ));
    }

    #[test]
    fn test_placeholder_credential_rejected() {
        assert!(matches!(
            DhanConfig::new("1000000001", "your_access_token_here"),
            Err(ConfigError::PlaceholderCredential("access_token"))
        ));
        assert!(matches!(
            DhanConfig::new("YOUR_CLIENT_ID", "real-token"),
            Err(ConfigError::PlaceholderCredential("client_id"))
        ));
    }

    #[test]
    fn test_file_overrides_env() {
        let file: FileConfig = toml::from_str(
            r#"
            client_id = "1000000001"
            access_token = "file-token"
            base_url = "https://sandbox.dhan.co/v2/"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        let config = DhanConfig::from_parts(file, |name| match name {
            ENV_ACCESS_TOKEN => Some("env-token".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.access_token, "file-token");
        // Trailing slash is normalized away so path joins stay clean.
        assert_eq!(config.base_url, "https://sandbox.dhan.co/v2");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_env_fills_missing_fields() {
        let config = DhanConfig::from_parts(FileConfig::default(), |name| match name {
            ENV_CLIENT_ID => Some("1000000001".to_string()),
            ENV_ACCESS_TOKEN => Some("env-token".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.client_id, "1000000001");
        assert_eq!(config.access_token, "env-token");
    }

    #[test]
    fn test_missing_everywhere_is_fatal() {
        let result = DhanConfig::from_parts(FileConfig::default(), |_| None);
        assert!(matches!(result, Err(ConfigError::MissingCredential(_))));
    }
}
