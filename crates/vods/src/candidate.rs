// Candidate space: every (domain, time offset) pair a VOD might be stored under.

use url::Url;

use crate::error::DiscoveryError;
use crate::metadata::{PathIdentifier, VideoMetadata};

/// Manifest file name under a candidate's `chunked/` rendition.
pub const INDEX_DVR: &str = "index-dvr.m3u8";

/// One hypothesised storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// CDN origin with trailing slash, e.g. `https://d1m7jfoe9zdc1j.cloudfront.net/`
    pub domain: String,
    pub path: PathIdentifier,
    /// The offset metadata `path` was derived from.
    metadata: VideoMetadata,
}

impl Candidate {
    pub fn new(domain: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            domain: domain.into(),
            path: metadata.path_identifier(),
            metadata,
        }
    }

    /// Base every relative playlist entry is resolved against.
    pub fn chunked_base(&self) -> String {
        format!("{}{}/chunked/", self.domain, self.path)
    }

    pub fn index_dvr_url(&self) -> String {
        format!("{}{INDEX_DVR}", self.chunked_base())
    }

    pub fn segment_url(&self, uri: &str) -> String {
        format!("{}{uri}", self.chunked_base())
    }

    /// Recovers a candidate from any URL under a VOD directory, e.g.
    /// `https://host/{identifier}/storyboards/1600104857-info.json`.
    pub fn from_url(input: &str) -> Result<Self, DiscoveryError> {
        let url = Url::parse(input)
            .map_err(|e| DiscoveryError::invalid_path(input, format!("not a URL: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| DiscoveryError::invalid_path(input, "URL has no host"))?;
        let domain = match url.port() {
            Some(port) => format!("{}://{host}:{port}/", url.scheme()),
            None => format!("{}://{host}/", url.scheme()),
        };
        let first_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| DiscoveryError::invalid_path(input, "URL has no path"))?;

        // Only the path is known here, so the metadata has to be parsed back.
        let path = PathIdentifier::from_raw(first_segment)?;
        let metadata = path.to_metadata()?;
        Ok(Self {
            domain,
            path,
            metadata,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

/// All time-offset variants for one domain, most likely (offset 0) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    pub domain: String,
    pub candidates: Vec<Candidate>,
}

/// Expands `metadata` into one group per domain, each holding `window_seconds`
/// candidates for offsets `0..window_seconds`.
///
/// Domain order is the caller's priority and is kept as given, duplicates included.
pub fn build_candidate_space<S: AsRef<str>>(
    metadata: &VideoMetadata,
    domains: &[S],
    window_seconds: u32,
) -> Vec<CandidateGroup> {
    let offsets: Vec<(VideoMetadata, PathIdentifier)> = (0..i64::from(window_seconds))
        .map(|offset| {
            let shifted = metadata.with_offset(offset);
            let path = shifted.path_identifier();
            (shifted, path)
        })
        .collect();

    domains
        .iter()
        .map(|domain| {
            let domain = domain.as_ref();
            CandidateGroup {
                domain: domain.to_owned(),
                candidates: offsets
                    .iter()
                    .map(|(shifted, path)| Candidate {
                        domain: domain.to_owned(),
                        path: path.clone(),
                        metadata: shifted.clone(),
                    })
                    .collect(),
            }
        })
        .collect()
}
