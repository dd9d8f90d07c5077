//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults.
//! The access token is loaded from VK_ACCESS_TOKEN or `auth.token_file`,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vk_api::{ApiConfig, TransportConfig};

/// Default config file name, looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "vk-call.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: TransportConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Access token source
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
    /// File holding the access token; re-read on re-authentication
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Defaults plus environment, for runs without a config file.
    pub fn from_env() -> common::Result<Self> {
        Config::default().finish()
    }

    fn finish(mut self) -> common::Result<Self> {
        self.api.validate()?;
        self.http.validate()?;
        self.resolve_token()?;
        Ok(self)
    }

    /// Token resolution order:
    /// 1. VK_ACCESS_TOKEN env var
    /// 2. token_file path from config
    fn resolve_token(&mut self) -> common::Result<()> {
        if let Ok(token) = std::env::var("VK_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.auth.access_token = Some(Secret::new(token));
                return Ok(());
            }
        }
        if let Some(ref token_file) = self.auth.token_file {
            let token = std::fs::read_to_string(token_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read token_file {}: {e}",
                    token_file.display()
                ))
            })?;
            let token = token.trim().to_owned();
            if !token.is_empty() {
                self.auth.access_token = Some(Secret::new(token));
            }
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg or VK_CALL_CONFIG env var.
    ///
    /// Returns `None` when neither is given and the default file is absent.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("VK_CALL_CONFIG") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("vk-call.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("VK_ACCESS_TOKEN") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
version = "5.131"
rate_limit_retry_ms = 400

[http]
timeout_secs = 10
cookies = false
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.version, "5.131");
        assert_eq!(config.api.rate_limit_retry_ms, 400);
        assert_eq!(config.api.base_url, "https://api.vk.com/method");
        assert_eq!(config.http.timeout_secs, 10);
        assert!(!config.http.cookies);
        assert!(config.auth.access_token.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("VK_ACCESS_TOKEN") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.version, "5.0");
        assert_eq!(config.api.auth_poll_interval_ms, 1000);
        assert!(config.http.cookies);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/vk-call.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"api.vk.com/method\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nauth_poll_interval_ms = 0\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_token_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        unsafe { set_env("VK_ACCESS_TOKEN", "vk1.a.env") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.auth.access_token.as_ref().unwrap().expose(),
            "vk1.a.env"
        );
        unsafe { remove_env("VK_ACCESS_TOKEN") };
    }

    #[test]
    fn test_token_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("VK_ACCESS_TOKEN") };
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "vk1.a.file\n").unwrap();
        let path = write_config(
            &dir,
            &format!("[auth]\ntoken_file = \"{}\"\n", token_path.display()),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.auth.access_token.as_ref().unwrap().expose(),
            "vk1.a.file"
        );
        assert_eq!(config.auth.token_file.as_deref(), Some(token_path.as_path()));
    }

    #[test]
    fn test_env_takes_precedence_over_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "vk1.a.file").unwrap();
        let path = write_config(
            &dir,
            &format!("[auth]\ntoken_file = \"{}\"\n", token_path.display()),
        );

        unsafe { set_env("VK_ACCESS_TOKEN", "vk1.a.env") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.auth.access_token.as_ref().unwrap().expose(),
            "vk1.a.env"
        );
        unsafe { remove_env("VK_ACCESS_TOKEN") };
    }

    #[test]
    fn test_missing_token_file_is_config_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("VK_ACCESS_TOKEN") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[auth]\ntoken_file = \"/nonexistent/token\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("token_file"), "got: {err}");
    }

    #[test]
    fn test_resolve_path_prefers_cli() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("VK_CALL_CONFIG", "/etc/vk/from-env.toml") };
        assert_eq!(
            Config::resolve_path(Some("/tmp/cli.toml")),
            Some(PathBuf::from("/tmp/cli.toml"))
        );
        assert_eq!(
            Config::resolve_path(None),
            Some(PathBuf::from("/etc/vk/from-env.toml"))
        );
        unsafe { remove_env("VK_CALL_CONFIG") };
    }
}
