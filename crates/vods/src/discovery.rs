use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::candidate::{CandidateGroup, build_candidate_space};
use crate::config::{DiscoveryConfig, create_client};
use crate::error::DiscoveryError;
use crate::metadata::VideoMetadata;
use crate::probe::{DiscoveryResult, HttpTransport, ReachabilityProbe, Transport};
use crate::race::{first_success, first_success_concurrent};

/// Searches the candidate space for a reachable manifest.
///
/// All domains are raced against each other at once; inside each domain the
/// time offsets are raced again, offset 0 inline first. A domain stuck on a
/// slow offset never holds back the others. Whichever probe answers 200
/// first wins and everything still in flight is cancelled.
#[derive(Clone)]
pub struct Discoverer {
    probe: ReachabilityProbe,
    segment_check_timeout: Duration,
}

impl Discoverer {
    pub fn new(transport: Arc<dyn Transport>, config: &DiscoveryConfig) -> Self {
        Self {
            probe: ReachabilityProbe::new(transport, config.probe_timeout),
            segment_check_timeout: config.segment_check_timeout,
        }
    }

    /// Builds the shared HTTP client from `config` and wraps it.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let client = create_client(config)?;
        Ok(Self::new(Arc::new(HttpTransport::new(client)), config))
    }

    pub fn probe(&self) -> &ReachabilityProbe {
        &self.probe
    }

    /// Probe sharing this discoverer's transport, tuned for segment liveness checks.
    pub fn segment_probe(&self) -> ReachabilityProbe {
        self.probe.with_timeout(self.segment_check_timeout)
    }

    #[instrument(
        skip(self, metadata, domains, token),
        fields(streamer = %metadata.streamer_name, video_id = %metadata.video_id),
        level = "debug"
    )]
    pub async fn discover<S: AsRef<str>>(
        &self,
        metadata: &VideoMetadata,
        domains: &[S],
        window_seconds: u32,
        token: &CancellationToken,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let groups: Vec<CandidateGroup> = build_candidate_space(metadata, domains, window_seconds)
            .into_iter()
            .filter(|group| !group.candidates.is_empty())
            .collect();
        let attempted: usize = groups.iter().map(|group| group.candidates.len()).sum();
        if attempted == 0 {
            return Err(DiscoveryError::EmptyCandidateSpace);
        }

        debug!(
            domains = groups.len(),
            window_seconds, attempted, "Probing candidate space"
        );

        let probe = self.probe.clone();
        let result = first_success_concurrent(groups, token, move |group, group_token| {
            let probe = probe.clone();
            async move {
                let domain = group.domain;
                let outcome = first_success(group.candidates, &group_token, move |candidate, t| {
                    let probe = probe.clone();
                    async move { probe.probe(candidate, &t).await }
                })
                .await;
                if let Err(e) = &outcome {
                    debug!(%domain, error = %e, "Domain exhausted");
                }
                outcome
            }
        })
        .await;

        match result {
            Ok(found) => {
                info!(
                    domain = %found.candidate.domain,
                    path = %found.candidate.path,
                    "Found manifest"
                );
                Ok(found)
            }
            Err(DiscoveryError::NoValidCandidate { .. }) => {
                Err(DiscoveryError::NoValidCandidate { attempted })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::test_utils::ScriptedTransport;
    use chrono::DateTime;
    use reqwest::StatusCode;

    const DOMAINS: [&str; 2] = ["https://a/", "https://b/"];

    fn meta() -> VideoMetadata {
        VideoMetadata::new("foo", "123", DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    fn discoverer(transport: ScriptedTransport) -> Discoverer {
        Discoverer::new(Arc::new(transport), &DiscoveryConfig::default())
    }

    #[tokio::test]
    async fn finds_the_only_reachable_candidate() {
        let expected = Candidate::new("https://b/", meta().with_offset(1));
        let transport = ScriptedTransport::new();
        transport.respond(&expected.index_dvr_url(), StatusCode::OK, "#EXTM3U\n");

        let found = discoverer(transport)
            .discover(&meta(), &DOMAINS, 2, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.candidate, expected);
        assert_eq!(&found.body[..], b"#EXTM3U\n");
    }

    #[tokio::test]
    async fn inline_offset_wins_without_further_requests_on_its_domain() {
        let first = Candidate::new("https://a/", meta());
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(&first.index_dvr_url(), StatusCode::OK, "#EXTM3U\n");
        let discoverer = Discoverer::new(transport.clone(), &DiscoveryConfig::default());

        let found = discoverer
            .discover(&meta(), &DOMAINS, 60, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.candidate, first);
        let on_a: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|url| url.starts_with("https://a/"))
            .collect();
        assert_eq!(on_a, vec![first.index_dvr_url()]);
    }

    #[tokio::test]
    async fn stalled_domain_does_not_hold_back_the_next() {
        let stalled = Candidate::new("https://a/", meta());
        let winner = Candidate::new("https://b/", meta());
        let transport = Arc::new(ScriptedTransport::new());
        transport.hang(&stalled.index_dvr_url());
        transport.respond(&winner.index_dvr_url(), StatusCode::OK, "#EXTM3U\n");
        let discoverer = Discoverer::new(transport.clone(), &DiscoveryConfig::default());

        let started = tokio::time::Instant::now();
        let found = tokio::time::timeout(
            Duration::from_secs(5),
            discoverer.discover(&meta(), &DOMAINS, 2, &CancellationToken::new()),
        )
        .await
        .expect("domain b waited for domain a")
        .unwrap();
        assert_eq!(found.candidate, winner);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(transport.requests().contains(&stalled.index_dvr_url()));
    }

    #[tokio::test]
    async fn exhausted_space_reports_every_candidate() {
        let err = discoverer(ScriptedTransport::new())
            .discover(&meta(), &DOMAINS, 3, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoValidCandidate { attempted: 6 }));
    }

    #[tokio::test]
    async fn zero_window_is_an_empty_space() {
        let err = discoverer(ScriptedTransport::new())
            .discover(&meta(), &DOMAINS, 0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyCandidateSpace));

        let no_domains: [&str; 0] = [];
        let err = discoverer(ScriptedTransport::new())
            .discover(&meta(), &no_domains, 5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyCandidateSpace));
    }

    #[tokio::test]
    async fn winner_on_later_domain_cancels_hanging_offsets() {
        let winner = Candidate::new("https://b/", meta().with_offset(2));
        let transport = ScriptedTransport::new();
        for offset in 1..4 {
            let slow_miss = Candidate::new("https://a/", meta().with_offset(offset));
            transport.respond_after(
                &slow_miss.index_dvr_url(),
                Duration::from_millis(10),
                StatusCode::NOT_FOUND,
                "",
            );
        }
        let hanging = Candidate::new("https://b/", meta().with_offset(3));
        transport.hang(&hanging.index_dvr_url());
        transport.respond_after(
            &winner.index_dvr_url(),
            Duration::from_millis(20),
            StatusCode::OK,
            "#EXTM3U\n",
        );

        let found = discoverer(transport)
            .discover(&meta(), &DOMAINS, 4, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.candidate, winner);
    }

    #[tokio::test]
    async fn cancelled_search_reports_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let err = discoverer(ScriptedTransport::new())
            .discover(&meta(), &DOMAINS, 2, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Cancelled));
    }
}
