//! Configuration loading and parsing for `find-bzs.toml` files.
//!
//! Every setting has a default, so the file is optional. Command line flags
//! override whatever the file provides.
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    error::{FindBzsError, Result},
    forge::config::{DEFAULT_API_URL, DEFAULT_FORGE_HOST},
    formatter::LinkStyle,
};

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "find-bzs.toml";
/// Default Bugzilla instance.
pub const DEFAULT_TRACKER_URL: &str = "https://bugzilla.redhat.com";
/// Only bugs in this product are searched by default.
pub const DEFAULT_PRODUCT: &str = "Red Hat Ceph Storage";
/// Default downstream package name.
pub const DEFAULT_PACKAGE: &str = "ceph-ansible";
/// Default RPM dist tag.
pub const DEFAULT_DIST_TAG: &str = "el7cp";
/// Environment variable holding the Bugzilla API key.
pub const TRACKER_KEY_ENV_VAR: &str = "BUGZILLA_API_KEY";
/// Bugzilla API key file name under the home directory.
pub const DEFAULT_TRACKER_KEY_FILE: &str = ".bugzillatoken";

/// Forge connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Forge host recognized in remote URLs.
    pub host: String,
    /// REST API base URL.
    pub api_url: String,
    /// Remotes tried in order when determining the project.
    pub remotes: Vec<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FORGE_HOST.into(),
            api_url: DEFAULT_API_URL.into(),
            remotes: vec!["origin".into(), "upstream".into()],
        }
    }
}

/// Issue tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Bugzilla base URL.
    pub url: String,
    /// Product searched for external tracker matches.
    pub product: String,
    /// Keep CLOSED bugs (default: false)
    pub include_closed: bool,
    /// Browse link style (default: single)
    pub link_style: LinkStyle,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TRACKER_URL.into(),
            product: DEFAULT_PRODUCT.into(),
            include_closed: false,
            link_style: LinkStyle::default(),
        }
    }
}

/// Downstream packaging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Downstream package name.
    pub name: String,
    /// RPM dist tag, e.g. `el7cp`.
    pub dist_tag: String,
    /// Changelog author; falls back to git `user.name`.
    pub author: Option<String>,
    /// Changelog email; falls back to git `user.email`.
    pub email: Option<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PACKAGE.into(),
            dist_tag: DEFAULT_DIST_TAG.into(),
            author: None,
            email: None,
        }
    }
}

/// Complete `find-bzs.toml` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forge: ForgeConfig,
    pub tracker: TrackerConfig,
    pub package: PackageConfig,
    /// Search response cache directory; defaults to the user cache dir.
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load an explicit config file, or `find-bzs.toml` in `dir` when it
    /// exists, or the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            let content = fs::read_to_string(path).map_err(|err| {
                FindBzsError::configuration(format!(
                    "unable to read {}: {err}",
                    path.display()
                ))
            })?;
            return Ok(toml::from_str(&content)?);
        }

        let path = dir.join(DEFAULT_CONFIG_FILE);

        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!("loading configuration from {}", path.display());
                Ok(toml::from_str(&content)?)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{DEFAULT_CONFIG_FILE} not found: using defaults");
                Ok(Config::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Parse a token file: at most one line that is neither blank nor a `#`
/// comment.
pub fn parse_token(content: &str, source: &str) -> Result<Option<String>> {
    let mut token = None;

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if token.is_some() {
            return Err(FindBzsError::configuration(format!(
                "too many lines in {source}"
            )));
        }

        token = Some(line.to_string());
    }

    Ok(token)
}

/// Read a secret from `path`, falling back to the `env_var` environment
/// variable when the file does not exist.
pub fn load_secret(path: &Path, env_var: &str) -> Result<Option<SecretString>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let source = path.display().to_string();
            Ok(parse_token(&content, &source)?.map(SecretString::from))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} not found: checking {env_var}", path.display());
            Ok(std::env::var(env_var)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(|value| SecretString::from(value.trim().to_string())))
        }
        Err(err) => Err(err.into()),
    }
}

/// `~/<name>`, when a home directory is known.
pub fn home_file(name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(name))
}
