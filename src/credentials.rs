//! Loading of API secrets from a YAML file.
//!
//! The file is a flat mapping, for example:
//!
//! ```yaml
//! mastodon_client_id: TODO_ENTER_YOURS
//! mastodon_client_secret: TODO_ENTER_YOURS
//! mastodon_access_token: TODO_ENTER_YOURS
//! ```

use crate::error::AppError;
use serde_yml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Keys a Mastodon bot cannot run without.
pub const MASTODON_KEYS: &[&str] = &[
    "mastodon_client_id",
    "mastodon_client_secret",
    "mastodon_access_token",
];

/// Named secrets, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Credentials {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Credentials {
    /// Reads `path` and checks that every key in `required` is present.
    ///
    /// Scalar values are kept as strings; `null` values count as missing.
    ///
    /// # Errors
    ///
    /// `AppError::MissingCredentials` naming all absent keys, or an I/O / YAML
    /// error if the file cannot be read or parsed.
    pub fn load(path: &Path, required: &[&str]) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text, path, required)
    }

    fn from_yaml_str(text: &str, path: &Path, required: &[&str]) -> Result<Self, AppError> {
        let document: Value = serde_yml::from_str(text)?;
        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            _ => return Err(AppError::InvalidCredentials(path.to_path_buf())),
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            let Some(key) = key.as_str() else { continue };
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            values.insert(key.to_string(), value);
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|key| !values.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingCredentials {
                path: path.to_path_buf(),
                missing,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`Credentials::get`] for keys already checked by [`Credentials::load`].
    pub fn require(&self, key: &str) -> Result<&str, AppError> {
        self.get(key).ok_or_else(|| AppError::MissingCredentials {
            path: self.path.clone(),
            missing: vec![key.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Credentials, AppError> {
        Credentials::from_yaml_str(text, &PathBuf::from("test.yaml"), MASTODON_KEYS)
    }

    #[test]
    fn loads_complete_file() {
        let creds = parse(
            "mastodon_client_id: abc\nmastodon_client_secret: def\nmastodon_access_token: ghi\n",
        )
        .unwrap();
        assert_eq!(creds.get("mastodon_client_id"), Some("abc"));
        assert_eq!(creds.get("mastodon_access_token"), Some("ghi"));
    }

    #[test]
    fn numeric_values_become_strings() {
        let creds = parse(
            "mastodon_client_id: 12345\nmastodon_client_secret: def\nmastodon_access_token: ghi\n",
        )
        .unwrap();
        assert_eq!(creds.get("mastodon_client_id"), Some("12345"));
    }

    #[test]
    fn reports_every_missing_key() {
        let err = parse("mastodon_client_id: abc\n").unwrap_err();
        match err {
            AppError::MissingCredentials { missing, .. } => {
                assert_eq!(
                    missing,
                    vec!["mastodon_client_secret", "mastodon_access_token"]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_value_counts_as_missing() {
        let err = parse(
            "mastodon_client_id: abc\nmastodon_client_secret:\nmastodon_access_token: ghi\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingCredentials { ref missing, .. } if missing == &["mastodon_client_secret"]
        ));
    }

    #[test]
    fn rejects_non_mapping_document() {
        let err = parse("- just\n- a\n- list\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::load(&dir.path().join("nope.yaml"), MASTODON_KEYS).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
