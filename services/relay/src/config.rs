//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Provider credentials (CLIENT_ID, CLIENT_SECRET) come only from the
//! environment, never from the TOML, so secrets cannot leak through a
//! checked-in config file. REDIRECT_URI from the environment overrides
//! the TOML value.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use common::Secret;
use serde::Deserialize;

/// Fully resolved service configuration: file contents plus the
/// environment-sourced credentials.
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub credentials: Credentials,
}

/// Shape of the TOML file itself (credentials deliberately absent).
#[derive(Debug, Deserialize)]
struct FileConfig {
    server: ServerConfig,
    #[serde(default)]
    provider: ProviderConfig,
    storage: StorageConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Fortnox endpoint settings
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Trailing path segment of every proxied resource URL. The
    /// original integration pinned this to "3"; kept configurable.
    #[serde(default = "default_resource_id")]
    pub resource_id: String,
    /// Outbound calls per second against the Fortnox API
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Overridable via the REDIRECT_URI env var
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Store and diagnostics paths
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub store_path: PathBuf,
    /// JSON dump of the last successful provider response; omit to disable
    #[serde(default)]
    pub dump_path: Option<PathBuf>,
}

/// Provider application credentials, resolved from the environment.
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token_endpoint: default_token_endpoint(),
            api_base: default_api_base(),
            resource_id: default_resource_id(),
            rate_limit: default_rate_limit(),
            redirect_uri: None,
        }
    }
}

fn default_token_endpoint() -> String {
    fortnox_auth::TOKEN_ENDPOINT.to_owned()
}

fn default_api_base() -> String {
    fortnox_auth::API_BASE.to_owned()
}

fn default_resource_id() -> String {
    String::from("3")
}

fn default_rate_limit() -> u32 {
    4
}

fn default_max_connections() -> usize {
    1000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    ///
    /// CLIENT_ID and CLIENT_SECRET are required. The redirect URI is
    /// taken from REDIRECT_URI when set, otherwise from the TOML; one of
    /// the two must be present.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&contents)?;

        for (field, url) in [
            ("token_endpoint", &file.provider.token_endpoint),
            ("api_base", &file.provider.api_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{field} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if file.provider.rate_limit == 0 {
            return Err(common::Error::Config(
                "rate_limit must be greater than 0".into(),
            ));
        }

        if file.provider.resource_id.is_empty() {
            return Err(common::Error::Config("resource_id must not be empty".into()));
        }

        if file.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        let client_id =
            std::env::var("CLIENT_ID").map_err(|_| common::Error::Env("CLIENT_ID".into()))?;
        let client_secret = std::env::var("CLIENT_SECRET")
            .map(Secret::new)
            .map_err(|_| common::Error::Env("CLIENT_SECRET".into()))?;
        let redirect_uri = std::env::var("REDIRECT_URI")
            .ok()
            .or_else(|| file.provider.redirect_uri.clone())
            .ok_or_else(|| common::Error::Env("REDIRECT_URI".into()))?;

        Ok(Self {
            server: file.server,
            provider: file.provider,
            storage: file.storage,
            credentials: Credentials {
                client_id,
                client_secret,
                redirect_uri,
            },
        })
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("fortnox-relay.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables,
    /// preventing data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    unsafe fn set_required_credentials() {
        unsafe {
            set_env("CLIENT_ID", "8VurtMGDTeAI");
            set_env("CLIENT_SECRET", "yFKwme8LEQ");
            set_env("REDIRECT_URI", "https://example.org/activation");
        }
    }

    unsafe fn clear_credentials() {
        unsafe {
            remove_env("CLIENT_ID");
            remove_env("CLIENT_SECRET");
            remove_env("REDIRECT_URI");
        }
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:1000"

[storage]
store_path = "relay-store.json"
dump_path = "tmp/dump.json"
"#
    }

    fn write_config(dir_name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config_applies_provider_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let path = write_config("fortnox-relay-test-valid", valid_toml());
        unsafe { set_required_credentials() };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr.port(), 1000);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(
            config.provider.token_endpoint,
            "https://apps.fortnox.se/oauth-v1/token"
        );
        assert_eq!(config.provider.api_base, "https://api.fortnox.se/3");
        assert_eq!(config.provider.resource_id, "3");
        assert_eq!(config.provider.rate_limit, 4);
        assert_eq!(config.storage.store_path, PathBuf::from("relay-store.json"));
        assert_eq!(config.credentials.client_id, "8VurtMGDTeAI");
        assert_eq!(config.credentials.client_secret.expose(), "yFKwme8LEQ");
        assert_eq!(config.credentials.redirect_uri, "https://example.org/activation");

        unsafe { clear_credentials() };
    }

    #[test]
    fn missing_client_id_is_an_env_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let path = write_config("fortnox-relay-test-no-id", valid_toml());
        unsafe {
            clear_credentials();
            set_env("CLIENT_SECRET", "secret");
            set_env("REDIRECT_URI", "https://example.org/activation");
        }

        let result = Config::load(&path);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("CLIENT_ID"), "got: {err}");

        unsafe { clear_credentials() };
    }

    #[test]
    fn redirect_uri_env_overrides_toml() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml = r#"
[server]
listen_addr = "127.0.0.1:1000"

[provider]
redirect_uri = "https://file.example/activation"

[storage]
store_path = "relay-store.json"
"#;
        let path = write_config("fortnox-relay-test-redirect", toml);
        unsafe { set_required_credentials() };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.credentials.redirect_uri, "https://example.org/activation");

        // Without the env var, the TOML value is used
        unsafe { remove_env("REDIRECT_URI") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.credentials.redirect_uri, "https://file.example/activation");

        unsafe { clear_credentials() };
    }

    #[test]
    fn redirect_uri_absent_everywhere_is_an_env_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let path = write_config("fortnox-relay-test-no-redirect", valid_toml());
        unsafe {
            clear_credentials();
            set_env("CLIENT_ID", "id");
            set_env("CLIENT_SECRET", "secret");
        }

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("REDIRECT_URI"), "got: {err}");

        unsafe { clear_credentials() };
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml = r#"
[server]
listen_addr = "127.0.0.1:1000"

[provider]
rate_limit = 0

[storage]
store_path = "relay-store.json"
"#;
        let path = write_config("fortnox-relay-test-zero-rate", toml);
        unsafe { set_required_credentials() };

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("rate_limit"), "got: {err}");

        unsafe { clear_credentials() };
    }

    #[test]
    fn api_base_without_scheme_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml = r#"
[server]
listen_addr = "127.0.0.1:1000"

[provider]
api_base = "api.fortnox.se/3"

[storage]
store_path = "relay-store.json"
"#;
        let path = write_config("fortnox-relay-test-bad-base", toml);
        unsafe { set_required_credentials() };

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("api_base"), "got: {err}");

        unsafe { clear_credentials() };
    }

    #[test]
    fn empty_resource_id_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml = r#"
[server]
listen_addr = "127.0.0.1:1000"

[provider]
resource_id = ""

[storage]
store_path = "relay-store.json"
"#;
        let path = write_config("fortnox-relay-test-empty-rid", toml);
        unsafe { set_required_credentials() };

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("resource_id"), "got: {err}");

        unsafe { clear_credentials() };
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Config::load(Path::new("/nonexistent/fortnox-relay.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let path = write_config("fortnox-relay-test-bad-toml", "not valid {{{{ toml");
        let result = Config::load(&path);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        assert_eq!(
            Config::resolve_path(Some("/cli/wins.toml")),
            PathBuf::from("/cli/wins.toml")
        );
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn resolve_path_env_then_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("fortnox-relay.toml"));
    }
}
