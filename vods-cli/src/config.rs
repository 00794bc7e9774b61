use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use vods_engine::{DiscoveryConfig, ProxyConfig};

use crate::error::{AppError, Result};

const CONFIG_DIR_NAME: &str = "vods";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings read from the optional TOML file. Command-line flags win.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// CDN origins in probe order; empty means the built-in list
    pub domains: Vec<String>,
    pub output_dir: PathBuf,
    /// Manifest probe timeout in seconds
    pub timeout: u64,
    /// Segment liveness check timeout in seconds
    pub segment_timeout: u64,
    pub connect_timeout: u64,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub use_system_proxy: bool,
    /// Default validation concurrency for `recover`; 0 disables validation
    pub filter_invalid: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = DiscoveryConfig::default();
        Self {
            domains: Vec::new(),
            output_dir: PathBuf::from("Downloads"),
            timeout: engine.probe_timeout.as_secs(),
            segment_timeout: engine.segment_check_timeout.as_secs(),
            connect_timeout: engine.connect_timeout.as_secs(),
            user_agent: None,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
            use_system_proxy: engine.use_system_proxy,
            filter_invalid: 0,
        }
    }
}

impl AppConfig {
    /// Loads `path` if given (it must exist), otherwise the per-user config
    /// file if there is one, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Applies the global command-line overrides.
    pub fn with_overrides(
        mut self,
        timeout: Option<u64>,
        proxy: Option<String>,
        proxy_username: Option<String>,
        proxy_password: Option<String>,
    ) -> Self {
        if let Some(timeout) = timeout {
            self.timeout = timeout;
            self.segment_timeout = timeout;
        }
        if proxy.is_some() {
            self.proxy = proxy;
            self.proxy_username = proxy_username;
            self.proxy_password = proxy_password;
        }
        self
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        let mut config = DiscoveryConfig {
            probe_timeout: Duration::from_secs(self.timeout),
            segment_check_timeout: Duration::from_secs(self.segment_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            use_system_proxy: self.use_system_proxy,
            ..DiscoveryConfig::default()
        };
        if !self.domains.is_empty() {
            config.domains = self.domains.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(url) = &self.proxy {
            let mut proxy = ProxyConfig::new(url.clone());
            if let (Some(username), Some(password)) = (&self.proxy_username, &self.proxy_password)
            {
                proxy = proxy.with_auth(username.clone(), password.clone());
            }
            config.proxy = Some(proxy);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.discovery_config().domains,
            DiscoveryConfig::default().domains
        );
    }

    #[test]
    fn file_values_reach_engine_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
domains = ["https://a.example/", "https://b.example"]
output_dir = "/tmp/vods"
timeout = 3
proxy = "socks5://127.0.0.1:1080"
proxy_username = "u"
proxy_password = "p"
filter_invalid = 16
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.filter_invalid, 16);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/vods"));

        let engine = config.discovery_config();
        assert_eq!(engine.probe_timeout, Duration::from_secs(3));
        assert_eq!(
            engine.normalized_domains(),
            vec!["https://a.example/", "https://b.example/"]
        );
        let proxy = engine.proxy.unwrap();
        assert_eq!(proxy.url, "socks5://127.0.0.1:1080");
        assert_eq!(proxy.username.as_deref(), Some("u"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeot = 3").unwrap();
        assert!(matches!(
            AppConfig::load(Some(file.path())),
            Err(AppError::ConfigParse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load(Some(&dir.path().join("nope.toml"))),
            Err(AppError::ConfigRead { .. })
        ));
    }

    #[test]
    fn flags_override_file() {
        let config = AppConfig {
            proxy: Some("http://old:1".into()),
            ..AppConfig::default()
        }
        .with_overrides(Some(2), Some("http://new:2".into()), None, None);
        assert_eq!(config.timeout, 2);
        assert_eq!(config.segment_timeout, 2);
        assert_eq!(config.proxy.as_deref(), Some("http://new:2"));
    }
}
