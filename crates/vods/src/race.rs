// First-Success Racer: run probes concurrently, keep the first success, abandon the rest.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::DiscoveryError;

/// Probes `items` and returns the first successful result.
///
/// The first item is awaited inline before anything else is started, so the
/// most likely candidate reuses the pooled connection without paying for a
/// burst of concurrent dials. If it fails, every remaining item is spawned as
/// its own task. The first `Ok` wins; the remaining tasks see their token
/// cancelled and are dropped at their next await point without being joined.
///
/// Each probe receives a token that is cancelled once the race is decided, so
/// a probe may itself run a nested race over a sub-space.
///
/// Returns [`DiscoveryError::EmptyCandidateSpace`] for no items,
/// [`DiscoveryError::NoValidCandidate`] when every probe failed and
/// [`DiscoveryError::Cancelled`] if `token` fires first.
pub async fn first_success<T, R, F, Fut>(
    items: Vec<T>,
    token: &CancellationToken,
    probe: F,
) -> Result<R, DiscoveryError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, DiscoveryError>> + Send + 'static,
{
    race(items, token, probe, true).await
}

/// Like [`first_success`] but spawns every item at once.
///
/// Used where one item may be slow to fail (a whole nested race) and must
/// not hold back the others.
pub async fn first_success_concurrent<T, R, F, Fut>(
    items: Vec<T>,
    token: &CancellationToken,
    probe: F,
) -> Result<R, DiscoveryError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, DiscoveryError>> + Send + 'static,
{
    race(items, token, probe, false).await
}

async fn race<T, R, F, Fut>(
    items: Vec<T>,
    token: &CancellationToken,
    probe: F,
    inline_first: bool,
) -> Result<R, DiscoveryError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, DiscoveryError>> + Send + 'static,
{
    let attempted = items.len();
    if attempted == 0 {
        return Err(DiscoveryError::EmptyCandidateSpace);
    }
    if token.is_cancelled() {
        return Err(DiscoveryError::Cancelled);
    }

    let race_token = token.child_token();
    let mut items = items.into_iter();

    if inline_first && let Some(first) = items.next() {
        let inline = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DiscoveryError::Cancelled),
            result = probe(first, race_token.clone()) => result,
        };
        match inline {
            Ok(value) => {
                race_token.cancel();
                return Ok(value);
            }
            Err(e) => trace!(error = %e, "Inline attempt failed, racing the rest"),
        }
    }

    let mut tasks = JoinSet::new();
    for item in items {
        let probe = probe.clone();
        let task_token = race_token.clone();
        tasks.spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => None,
                result = probe(item, task_token.clone()) => Some(result),
            }
        });
    }

    let outcome = loop {
        let joined = tokio::select! {
            biased;
            _ = token.cancelled() => break Err(DiscoveryError::Cancelled),
            joined = tasks.join_next() => joined,
        };

        match joined {
            None => break Err(DiscoveryError::NoValidCandidate { attempted }),
            Some(Ok(Some(Ok(value)))) => break Ok(value),
            Some(Ok(Some(Err(e)))) => trace!(error = %e, "Attempt failed"),
            Some(Ok(None)) => {}
            Some(Err(e)) => warn!(error = %e, "Probe task did not complete"),
        }
    };

    race_token.cancel();
    tasks.detach_all();
    outcome
}
