//! Layered configuration for a sync run.
//!
//! Values are merged from, in increasing priority:
//!
//! - a configuration file (see [`discover`]),
//! - environment variables prefixed with `BLOBSYNC_`,
//! - explicit overrides, usually command-line flags.
//!
//! The merged [`Config`] is then validated into a [`SyncRequest`].

pub mod error;

use crate::error::{ErrorKind, Result};
use blobsync_sync::SyncRequest;
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "BLOBSYNC_";
/// File names looked up in the working directory, in order.
pub const LOCAL_FILE_NAMES: [&str; 4] = ["blobsync.toml", "blobsync.yaml", "blobsync.yml", "blobsync.json"];

/// Unvalidated configuration as merged from all sources.
///
/// Unset fields are skipped when serialized, so a `Config` used as an
/// override layer only replaces what it actually sets.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl Config {
    /// Loads the configuration relative to the current working directory.
    pub fn load(explicit: Option<&Path>, overrides: &Config) -> Result<Self> {
        Self::load_from(Path::new("."), explicit, overrides)
    }

    /// Loads the configuration, looking for local configuration files in
    /// `dir` instead of the working directory.
    pub fn load_from(dir: &Path, explicit: Option<&Path>, overrides: &Config) -> Result<Self> {
        let file = discover(dir, explicit)?;
        match &file {
            Some(path) => tracing::debug!(path = %path.display(), "Using configuration file"),
            None => tracing::debug!("No configuration file found"),
        }
        figment(file.as_deref(), overrides)?
            .extract::<Self>()
            .or_raise(|| ErrorKind::Extract)
    }

    /// Validates required values and builds the request for a sync run.
    pub fn into_request(self) -> Result<SyncRequest> {
        let connection_string = required(self.connection_string, "connection_string")?;
        let container_name = required(self.container_name, "container_name")?;
        let content_type = required(self.content_type, "content_type")?;
        if self.files.is_empty() {
            tracing::warn!(container = %container_name, "No files configured; only the container will be provisioned");
        }
        Ok(SyncRequest::new(connection_string, container_name, content_type, self.files)
            .with_container_permission(self.container_permission)
            .with_content_encoding(self.content_encoding)
            .with_dry_run(self.dry_run.unwrap_or_default()))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("connection_string", &self.connection_string.as_ref().map(|_| "<redacted>"))
            .field("container_name", &self.container_name)
            .field("container_permission", &self.container_permission)
            .field("content_type", &self.content_type)
            .field("content_encoding", &self.content_encoding)
            .field("files", &self.files)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value.filter(|value| !value.trim().is_empty()).ok_or_raise(|| ErrorKind::Invalid(field))
}

/// Finds the configuration file to read, if any.
///
/// An explicit path must exist. Otherwise the first of [`LOCAL_FILE_NAMES`]
/// present in `dir` is used, then `config.toml` in the platform's
/// configuration directory for `blobsync`.
pub fn discover(dir: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(local) = LOCAL_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file()) {
        return Ok(Some(local));
    }
    Ok(ProjectDirs::from("", "", "blobsync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.is_file()))
}

/// Builds the layered provider chain without extracting it.
pub fn figment(file: Option<&Path>, overrides: &Config) -> Result<Figment> {
    let mut figment = Figment::new();
    if let Some(path) = file {
        figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX)).merge(Serialized::defaults(overrides)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    const TOML: &str = r#"
        connection_string = "UseDevelopmentStorage=true"
        container_name = "from-file"
        content_type = "text/html"
        container_permission = "Blob"
        files = ["dist/index.html", "dist/app.js"]
    "#;

    #[test]
    fn test_file_only() {
        Jail::expect_with(|jail| {
            jail.create_file("blobsync.toml", TOML)?;
            let request = Config::load_from(jail.directory(), None, &Config::default())
                .unwrap()
                .into_request()
                .unwrap();
            assert_eq!(request.container_name, "from-file");
            assert_eq!(request.container_permission.as_deref(), Some("Blob"));
            assert_eq!(request.files, vec![PathBuf::from("dist/index.html"), PathBuf::from("dist/app.js")]);
            assert_eq!(request.content_encoding, None);
            assert!(!request.dry_run);
            Ok(())
        });
    }

    #[test]
    fn test_layer_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file("blobsync.toml", TOML)?;
            jail.set_env("BLOBSYNC_CONTAINER_NAME", "from-env");
            jail.set_env("BLOBSYNC_CONTENT_TYPE", "text/plain");
            jail.set_env("BLOBSYNC_CONTENT_ENCODING", "gzip");
            let overrides = Config {
                content_type: Some("text/css".to_string()),
                files: vec![PathBuf::from("site.css")],
                dry_run: Some(true),
                ..Config::default()
            };
            let config = Config::load_from(jail.directory(), None, &overrides).unwrap();
            assert_eq!(config.container_name.as_deref(), Some("from-env"));
            assert_eq!(config.content_type.as_deref(), Some("text/css"));
            assert_eq!(config.content_encoding.as_deref(), Some("gzip"));
            assert_eq!(config.connection_string.as_deref(), Some("UseDevelopmentStorage=true"));
            assert_eq!(config.files, vec![PathBuf::from("site.css")]);
            assert_eq!(config.dry_run, Some(true));
            Ok(())
        });
    }

    #[test]
    fn test_unset_overrides_keep_lower_layers() {
        Jail::expect_with(|jail| {
            jail.create_file("blobsync.toml", TOML)?;
            let config = Config::load_from(jail.directory(), None, &Config::default()).unwrap();
            assert_eq!(config.files.len(), 2);
            assert_eq!(config.dry_run, None);
            Ok(())
        });
    }

    #[test]
    fn test_local_file_order() {
        Jail::expect_with(|jail| {
            jail.create_file("blobsync.yaml", "container_name: from-yaml\n")?;
            jail.create_file("blobsync.json", r#"{"container_name": "from-json"}"#)?;
            let config = Config::load_from(jail.directory(), None, &Config::default()).unwrap();
            assert_eq!(config.container_name.as_deref(), Some("from-yaml"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_wins_over_local() {
        Jail::expect_with(|jail| {
            jail.create_file("blobsync.toml", TOML)?;
            jail.create_file("deploy.json", r#"{"container_name": "explicit"}"#)?;
            let explicit = jail.directory().join("deploy.json");
            let config = Config::load_from(jail.directory(), Some(&explicit), &Config::default()).unwrap();
            assert_eq!(config.container_name.as_deref(), Some("explicit"));
            assert_eq!(config.connection_string, None);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(dir.path(), Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobsync.ini");
        std::fs::write(&path, "container_name = site").unwrap();
        let err = Config::load_from(dir.path(), Some(&path), &Config::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobsync.toml");
        std::fs::write(&path, "files = 12").unwrap();
        let err = Config::load_from(dir.path(), Some(&path), &Config::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extract));
    }

    fn complete() -> Config {
        Config {
            connection_string: Some("UseDevelopmentStorage=true".to_string()),
            container_name: Some("site".to_string()),
            content_type: Some("text/html".to_string()),
            files: vec![PathBuf::from("index.html")],
            ..Config::default()
        }
    }

    #[rstest]
    #[case::connection_string(Config { connection_string: None, ..complete() }, "connection_string")]
    #[case::container_name(Config { container_name: Some(String::new()), ..complete() }, "container_name")]
    #[case::content_type(Config { content_type: Some("  ".to_string()), ..complete() }, "content_type")]
    fn test_required_fields(#[case] config: Config, #[case] field: &str) {
        let err = config.into_request().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(name) if *name == field));
    }

    #[test]
    fn test_optional_fields_pass_through() {
        let config = Config {
            container_permission: Some("Container".to_string()),
            content_encoding: Some("br".to_string()),
            dry_run: Some(true),
            ..complete()
        };
        let request = config.into_request().unwrap();
        assert_eq!(request.container_permission.as_deref(), Some("Container"));
        assert_eq!(request.content_encoding.as_deref(), Some("br"));
        assert!(request.dry_run);
    }

    #[test]
    fn test_empty_file_list_is_accepted() {
        let request = Config { files: Vec::new(), ..complete() }.into_request().unwrap();
        assert!(request.files.is_empty());
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let config = Config {
            connection_string: Some("AccountName=a;AccountKey=c2VjcmV0".to_string()),
            ..Config::default()
        };
        assert!(!format!("{config:?}").contains("c2VjcmV0"));
    }
}
