//! Resolution of API keys from config, a key file or the environment.
//!
//! Sources are tried in order: the literal value from the config file,
//! then the contents of `api_key_file`, then the named environment
//! variable. Empty values count as not configured.

use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key configured (set api_key, api_key_file or api_key_env)")]
    NoSourceProvided,

    #[error("Failed to read key file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file '{path}' is empty")]
    EmptyFile { path: PathBuf },

    #[error("Environment variable '{name}' is not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' is not valid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Resolves a secret, first non-empty source wins.
///
/// A configured file that cannot be read is an error even when an
/// environment variable is also configured.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    if let Some(value) = non_empty(direct) {
        return Ok(SecretString::from(value.trim().to_string()));
    }

    if let Some(path) = non_empty(file_path) {
        let path = expand_home(path);
        let content = fs::read_to_string(&path).map_err(|source| SecretError::FileRead {
            path: path.clone(),
            source,
        })?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SecretError::EmptyFile { path });
        }
        return Ok(SecretString::from(content.to_string()));
    }

    if let Some(name) = non_empty(env_var) {
        return match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(SecretString::from(value.trim().to_string()))
            }
            Ok(_) | Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expands a leading `~` or `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}
