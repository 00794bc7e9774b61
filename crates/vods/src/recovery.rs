use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::candidate::Candidate;
use crate::discovery::Discoverer;
use crate::error::DiscoveryError;
use crate::metadata::VideoMetadata;
use crate::playlist::{Playlist, process_playlist};
use crate::source::SearchPlan;
use crate::validate::{ProgressCallback, SegmentValidator};

/// A recovered, self-contained playlist and where it was found.
#[derive(Debug, Clone)]
pub struct RecoveredPlaylist {
    pub candidate: Candidate,
    /// Metadata the winning path was derived from; it differs from the
    /// search start by the matched offset.
    pub metadata: VideoMetadata,
    pub playlist: Playlist,
    /// Segment count before validation.
    pub total_segments: usize,
}

/// Discover, post-process and optionally validate in one call.
#[derive(Clone)]
pub struct Recovery {
    discoverer: Discoverer,
    domains: Vec<String>,
    filter_invalid: Option<usize>,
    on_progress: Option<ProgressCallback>,
}

impl Recovery {
    pub fn new(discoverer: Discoverer, domains: Vec<String>) -> Self {
        Self {
            discoverer,
            domains,
            filter_invalid: None,
            on_progress: None,
        }
    }

    /// Drop segments the CDN no longer serves, checking `concurrency` at a time.
    pub fn with_filter_invalid(mut self, concurrency: usize) -> Self {
        self.filter_invalid = Some(concurrency);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub async fn run(
        &self,
        plan: &SearchPlan,
        token: &CancellationToken,
    ) -> Result<RecoveredPlaylist, DiscoveryError> {
        let found = self
            .discoverer
            .discover(&plan.metadata, &self.domains, plan.window_seconds, token)
            .await?;
        info!(url = %found.candidate.index_dvr_url(), "Found valid url");

        let metadata = found.candidate.metadata().clone();
        let mut playlist = process_playlist(&found.body, &found.candidate)?;
        let total_segments = playlist.len();

        if let Some(concurrency) = self.filter_invalid {
            let mut validator = SegmentValidator::new(self.discoverer.segment_probe(), concurrency);
            if let Some(callback) = &self.on_progress {
                validator = validator.with_progress(callback.clone());
            }
            playlist = validator.validate(&playlist, token).await?;
            info!(
                valid = playlist.len(),
                total = total_segments,
                "Filtered invalid segments"
            );
            if playlist.is_empty() {
                warn!(total = total_segments, "No segment is still served");
                return Err(DiscoveryError::ZeroValidSegments);
            }
        }

        Ok(RecoveredPlaylist {
            candidate: found.candidate,
            metadata,
            playlist,
            total_segments,
        })
    }
}
