// Bounded Segment Validator: liveness-check many segments with a fixed worker budget.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::DiscoveryError;
use crate::playlist::Playlist;
use crate::probe::ReachabilityProbe;

/// Running count emitted after every checked segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationProgress {
    pub processed: usize,
    pub valid: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Indices reported live, ascending.
    pub valid_indices: Vec<usize>,
    pub processed: usize,
    pub total: usize,
    /// Set when the token fired before every index was checked.
    pub cancelled: bool,
}

impl ValidationReport {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Checks every URL with `min(concurrency, urls.len())` workers pulling
/// indices from a shared cursor, and returns the live indices in original order.
///
/// Cancelling `token` stops workers from taking new indices; whatever was
/// already reported is returned with `cancelled` set. A partial report must
/// not be used as if it were complete.
pub async fn validate_indices<F, Fut>(
    urls: Vec<String>,
    concurrency: usize,
    checker: F,
    token: &CancellationToken,
    on_progress: Option<ProgressCallback>,
) -> Result<ValidationReport, DiscoveryError>
where
    F: Fn(String, CancellationToken) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    if concurrency == 0 {
        return Err(DiscoveryError::configuration(
            "validation concurrency must be at least 1",
        ));
    }

    let urls: Arc<[String]> = urls.into();
    let total = urls.len();
    let workers = concurrency.min(total);
    let cursor = Arc::new(AtomicUsize::new(0));
    let (report_tx, mut report_rx) = mpsc::channel::<(usize, bool)>(workers.max(1) * 2);

    debug!(total, workers, "Starting segment validation");

    let mut tasks = JoinSet::new();
    for worker in 0..workers {
        let urls = Arc::clone(&urls);
        let cursor = Arc::clone(&cursor);
        let report_tx = report_tx.clone();
        let checker = checker.clone();
        let token = token.clone();
        tasks.spawn(async move {
            while !token.is_cancelled() {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(url) = urls.get(index) else {
                    break;
                };
                let valid = checker(url.clone(), token.clone()).await;
                if token.is_cancelled() {
                    // The check may have been cut short; its answer is not trustworthy.
                    break;
                }
                if report_tx.send((index, valid)).await.is_err() {
                    break;
                }
            }
            trace!(worker, "Validation worker finished");
        });
    }
    drop(report_tx);

    let mut valid_indices = Vec::new();
    let mut processed = 0usize;
    while let Some((index, valid)) = report_rx.recv().await {
        processed += 1;
        if valid {
            valid_indices.push(index);
        }
        trace!(processed, total, index, valid, "Segment checked");
        if let Some(callback) = &on_progress {
            callback(ValidationProgress {
                processed,
                valid: valid_indices.len(),
                total,
            });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Validation worker did not complete");
        }
    }

    valid_indices.sort_unstable();
    let cancelled = token.is_cancelled() && processed < total;

    info!(
        valid = valid_indices.len(),
        processed, total, cancelled, "Segment validation finished"
    );

    Ok(ValidationReport {
        valid_indices,
        processed,
        total,
        cancelled,
    })
}

/// Narrows a playlist to the segments that are still being served.
#[derive(Clone)]
pub struct SegmentValidator {
    probe: ReachabilityProbe,
    concurrency: usize,
    on_progress: Option<ProgressCallback>,
}

impl SegmentValidator {
    pub fn new(probe: ReachabilityProbe, concurrency: usize) -> Self {
        Self {
            probe,
            concurrency,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// All-or-nothing: a cancelled or otherwise incomplete run is an error,
    /// never a silently shortened playlist. Zero live segments is `Ok` here.
    pub async fn validate(
        &self,
        playlist: &Playlist,
        token: &CancellationToken,
    ) -> Result<Playlist, DiscoveryError> {
        let urls = playlist
            .segments()
            .iter()
            .map(|segment| segment.uri.clone())
            .collect();
        let probe = self.probe.clone();
        let report = validate_indices(
            urls,
            self.concurrency,
            move |url, token| {
                let probe = probe.clone();
                async move { probe.is_live(&url, &token).await }
            },
            token,
            self.on_progress.clone(),
        )
        .await?;

        if !report.is_complete() {
            if report.cancelled {
                return Err(DiscoveryError::Cancelled);
            }
            return Err(DiscoveryError::ValidationIncomplete {
                processed: report.processed,
                total: report.total,
            });
        }

        Ok(playlist.retain_indices(&report.valid_indices))
    }
}
