//! Configuration for the forge connection.
use secrecy::SecretString;

/// Forge host whose remotes and external tracker URLs are recognized.
pub const DEFAULT_FORGE_HOST: &str = "github.com";
/// Base URL of the forge REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com/";
/// Environment variable consulted when no token file exists.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
/// Token file name under the home directory.
pub const DEFAULT_TOKEN_FILE: &str = ".githubtoken";

/// Base URL of the forge web UI on `host`, e.g. `https://github.com/`.
///
/// Bugzilla external tracker URLs contain this string.
pub fn web_url(host: &str) -> String {
    format!("https://{host}/")
}

/// Remote forge connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// REST API base URL, with a trailing slash.
    pub api_url: String,
    /// Access token for authentication.
    pub token: SecretString,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: SecretString::from("".to_string()),
        }
    }
}
