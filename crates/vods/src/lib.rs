//! Recovery engine for expired VOD manifests.
//!
//! Public metadata (streamer, video id, approximate start time) is expanded
//! into a space of candidate CDN locations, the space is raced for the first
//! reachable manifest, and the manifest is rewritten into a self-contained
//! playlist whose segments can optionally be checked for liveness.

pub mod candidate;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metadata;
pub mod playlist;
pub mod probe;
pub mod race;
pub mod recovery;
pub mod source;
pub mod validate;

#[cfg(test)]
mod test_utils;

pub use candidate::{Candidate, CandidateGroup, build_candidate_space};
pub use config::{DEFAULT_DOMAINS, DiscoveryConfig, ProxyConfig, create_client};
pub use discovery::Discoverer;
pub use error::DiscoveryError;
pub use metadata::{PathIdentifier, VideoMetadata};
pub use playlist::{Playlist, process_playlist, rewrite_playlist};
pub use probe::{DiscoveryResult, HttpTransport, ReachabilityProbe, Transport};
pub use race::{first_success, first_success_concurrent};
pub use recovery::{RecoveredPlaylist, Recovery};
pub use source::{ManualMetadata, MetadataSource, SearchPlan};
pub use validate::{
    ProgressCallback, SegmentValidator, ValidationProgress, ValidationReport, validate_indices,
};
