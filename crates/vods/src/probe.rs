// Reachability Probe: single-candidate existence checks over a shared HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::candidate::Candidate;
use crate::error::DiscoveryError;

/// The one network capability the engine needs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, returning the status and, for 200 responses, the body.
    async fn get(&self, url: &str, timeout: Duration) -> Result<(StatusCode, Bytes), DiscoveryError>;

    /// Status-only variant used for liveness checks.
    async fn status(&self, url: &str, timeout: Duration) -> Result<StatusCode, DiscoveryError> {
        self.get(url, timeout).await.map(|(status, _)| status)
    }
}

/// reqwest-backed transport. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<(StatusCode, Bytes), DiscoveryError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok((status, Bytes::new()));
        }
        let body = response.bytes().await?;
        Ok((status, body))
    }

    async fn status(&self, url: &str, timeout: Duration) -> Result<StatusCode, DiscoveryError> {
        // Body is never read; dropping the response releases the connection.
        let response = self.client.get(url).timeout(timeout).send().await?;
        Ok(response.status())
    }
}

/// A reachable manifest and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub candidate: Candidate,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct ReachabilityProbe {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Fetches the candidate's manifest. Only HTTP 200 counts as found.
    pub async fn probe(
        &self,
        candidate: Candidate,
        token: &CancellationToken,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let url = candidate.index_dvr_url();
        let (status, body) = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DiscoveryError::Cancelled),
            response = self.transport.get(&url, self.timeout) => response?,
        };

        if status != StatusCode::OK {
            trace!(%url, %status, "Candidate miss");
            return Err(DiscoveryError::http_status(status, url));
        }

        trace!(%url, size = body.len(), "Candidate hit");
        Ok(DiscoveryResult { candidate, body })
    }

    /// Whether `url` currently answers 200. Transport failures and
    /// cancellation count as not live.
    pub async fn is_live(&self, url: &str, token: &CancellationToken) -> bool {
        let status = tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            status = self.transport.status(url, self.timeout) => status,
        };
        match status {
            Ok(status) => status == StatusCode::OK,
            Err(e) => {
                trace!(%url, error = %e, "Liveness check failed");
                false
            }
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedTransport;
    use crate::metadata::VideoMetadata;
    use chrono::DateTime;

    fn candidate() -> Candidate {
        let meta = VideoMetadata::new("foo", "1", DateTime::from_timestamp(0, 0).unwrap());
        Candidate::new("https://a/", meta)
    }

    #[tokio::test]
    async fn probe_returns_body_on_200() {
        let transport = ScriptedTransport::new();
        transport.respond(&candidate().index_dvr_url(), StatusCode::OK, "#EXTM3U\n");
        let probe = ReachabilityProbe::new(Arc::new(transport), Duration::from_secs(1));

        let result = probe
            .probe(candidate(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.candidate, candidate());
        assert_eq!(result.body, Bytes::from_static(b"#EXTM3U\n"));
    }

    #[tokio::test]
    async fn probe_treats_other_status_as_miss() {
        let transport = ScriptedTransport::new();
        transport.respond(&candidate().index_dvr_url(), StatusCode::FORBIDDEN, "");
        let probe = ReachabilityProbe::new(Arc::new(transport), Duration::from_secs(1));

        let err = probe
            .probe(candidate(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_probe_miss());
    }

    #[tokio::test]
    async fn probe_stops_when_cancelled() {
        let transport = ScriptedTransport::new();
        transport.hang(&candidate().index_dvr_url());
        let probe = ReachabilityProbe::new(Arc::new(transport), Duration::from_secs(60));
        let token = CancellationToken::new();
        token.cancel();

        let err = probe.probe(candidate(), &token).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Cancelled));
    }

    #[tokio::test]
    async fn liveness_requires_200() {
        let transport = ScriptedTransport::new();
        transport.respond("https://a/live.ts", StatusCode::OK, "");
        transport.respond("https://a/gone.ts", StatusCode::FORBIDDEN, "");
        let probe = ReachabilityProbe::new(Arc::new(transport), Duration::from_secs(1));
        let token = CancellationToken::new();

        assert!(probe.is_live("https://a/live.ts", &token).await);
        assert!(!probe.is_live("https://a/gone.ts", &token).await);
        assert!(!probe.is_live("https://a/unscripted.ts", &token).await);
    }
}
