use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use tracing::{debug, info};

use crate::error::DiscoveryError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// CDN origins known to host archived VOD renditions, in probe priority order.
pub const DEFAULT_DOMAINS: &[&str] = &[
    "https://vod-secure.twitch.tv/",
    "https://vod-metro.twitch.tv/",
    "https://vod-pop-secure.twitch.tv/",
    "https://d2e2de1etea730.cloudfront.net/",
    "https://dqrpb9wgowsf5.cloudfront.net/",
    "https://ds0h3roq6wcgc.cloudfront.net/",
    "https://d2nvs31859zcd8.cloudfront.net/",
    "https://d2aba1wr3818hz.cloudfront.net/",
    "https://d3c27h4odz752x.cloudfront.net/",
    "https://dgeft87wbj63p.cloudfront.net/",
    "https://d1m7jfoe9zdc1j.cloudfront.net/",
    "https://d3vd9lfkzbru3h.cloudfront.net/",
    "https://d2vjef5jvl6bfs.cloudfront.net/",
    "https://d1ymi26ma8va5x.cloudfront.net/",
    "https://d1mhjrowxxagfy.cloudfront.net/",
    "https://ddacn6pr5v0tl.cloudfront.net/",
    "https://d3aqoihi2n8ty8.cloudfront.net/",
];

/// Outbound proxy for probe requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// `http://`, `https://`, `socks5://` or `socks5h://` URL. A bare
    /// `host:port` is treated as an HTTP proxy.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn build(&self) -> Result<Proxy, DiscoveryError> {
        let url = if self.url.contains("://") {
            self.url.clone()
        } else {
            format!("http://{}", self.url)
        };
        let mut proxy = Proxy::all(&url).map_err(|e| {
            DiscoveryError::configuration(format!("invalid proxy URL `{}`: {e}", self.url))
        })?;
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            proxy = proxy.basic_auth(username, password);
        }
        Ok(proxy)
    }
}

/// Configurable options for discovery and segment validation.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Candidate CDN origins, each ending in `/`
    pub domains: Vec<String>,

    /// Timeout for a single manifest probe
    pub probe_timeout: Duration,

    /// Timeout for a single segment liveness check
    pub segment_check_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    /// Maximum idle connections to keep per host. Probes against the same CDN
    /// reuse pooled connections after the first inline attempt.
    pub pool_max_idle_per_host: usize,

    /// Duration to keep idle connections alive before closing
    pub pool_idle_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            domains: DEFAULT_DOMAINS.iter().map(|d| (*d).to_owned()).collect(),
            probe_timeout: Duration::from_secs(10),
            segment_check_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DiscoveryConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

impl DiscoveryConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );
        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        default_headers
    }

    /// Domains normalised to end in `/`, since candidate URLs are built by concatenation.
    pub fn normalized_domains(&self) -> Vec<String> {
        self.domains
            .iter()
            .map(|domain| {
                if domain.ends_with('/') {
                    domain.clone()
                } else {
                    format!("{domain}/")
                }
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.probe_timeout.is_zero() {
            return Err(DiscoveryError::configuration(
                "probe timeout must be greater than zero",
            ));
        }
        if self.segment_check_timeout.is_zero() {
            return Err(DiscoveryError::configuration(
                "segment check timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Create the shared reqwest Client used by every probe.
pub fn create_client(config: &DiscoveryConfig) -> Result<Client, DiscoveryError> {
    install_rustls_provider();

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(config.pool_idle_timeout)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(reqwest::redirect::Policy::limited(10));

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        client_builder = client_builder.proxy(proxy_config.build()?);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy for probes");
    } else if config.use_system_proxy {
        debug!("Using system proxy settings for probes");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for probes");
    }

    client_builder.build().map_err(DiscoveryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_domains_are_normalized() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.domains.len(), DEFAULT_DOMAINS.len());
        assert_eq!(config.normalized_domains(), config.domains);
    }

    #[test]
    fn missing_trailing_slash_is_added() {
        let config = DiscoveryConfig {
            domains: vec!["https://a".into(), "https://b/".into()],
            ..Default::default()
        };
        assert_eq!(config.normalized_domains(), vec!["https://a/", "https://b/"]);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = DiscoveryConfig {
            probe_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::Configuration { .. })
        ));
    }

    #[test]
    fn bare_proxy_host_is_accepted() {
        assert!(ProxyConfig::new("127.0.0.1:8080").build().is_ok());
        assert!(
            ProxyConfig::new("socks5://127.0.0.1:1080")
                .with_auth("u", "p")
                .build()
                .is_ok()
        );
    }
}
