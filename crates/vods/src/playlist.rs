// Playlist Post-Processor: decode the discovered manifest and make it self-contained.

use std::time::Duration;

use m3u8_rs::{MediaPlaylist, MediaSegment};
use tracing::debug;

use crate::candidate::Candidate;
use crate::error::DiscoveryError;

const UNMUTED_MARKER: &str = "unmuted";
const MUTED_SUFFIX: &str = "-muted.ts";

/// A decoded media playlist whose segment URIs are absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    inner: MediaPlaylist,
}

impl Playlist {
    pub fn from_media_playlist(inner: MediaPlaylist) -> Self {
        Self { inner }
    }

    pub fn segments(&self) -> &[MediaSegment] {
        &self.inner.segments
    }

    pub fn len(&self) -> usize {
        self.inner.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.segments.is_empty()
    }

    pub fn media_playlist(&self) -> &MediaPlaylist {
        &self.inner
    }

    pub fn into_media_playlist(self) -> MediaPlaylist {
        self.inner
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> Duration {
        let seconds: f64 = self
            .inner
            .segments
            .iter()
            .map(|segment| f64::from(segment.duration))
            .sum();
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Keeps only the segments at `indices`, which must be ascending.
    /// Header fields (target duration, type, end list) are preserved.
    pub fn retain_indices(&self, indices: &[usize]) -> Self {
        let segments = indices
            .iter()
            .filter_map(|&i| self.inner.segments.get(i).cloned())
            .collect();
        Self {
            inner: MediaPlaylist {
                segments,
                ..self.inner.clone()
            },
        }
    }

    /// Serialises back to M3U8 text.
    pub fn encode(&self) -> Result<Vec<u8>, DiscoveryError> {
        let mut out = Vec::new();
        self.inner.write_to(&mut out)?;
        Ok(out)
    }
}

/// Rewrites a rights-restricted `{n}-unmuted.ts` reference to the
/// `{n}-muted.ts` variant the CDN actually serves. References without the
/// marker, or without a hyphen to cut at, are returned unchanged.
pub fn muted_uri(uri: &str) -> String {
    if uri.contains(UNMUTED_MARKER)
        && let Some(hyphen) = uri.find('-')
    {
        return format!("{}{MUTED_SUFFIX}", &uri[..hyphen]);
    }
    uri.to_owned()
}

/// Decodes `body` and rewrites it against the winning `candidate`.
pub fn process_playlist(body: &[u8], candidate: &Candidate) -> Result<Playlist, DiscoveryError> {
    match m3u8_rs::parse_playlist_res(body) {
        Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => Ok(rewrite_playlist(pl, candidate)),
        Ok(m3u8_rs::Playlist::MasterPlaylist(_)) => Err(DiscoveryError::decode(
            "expected a media playlist, got a master playlist",
        )),
        Err(e) => Err(DiscoveryError::decode(e.to_string())),
    }
}

/// Empty entries are dropped, muted names applied, and every reference made
/// absolute against `candidate`.
pub fn rewrite_playlist(mut playlist: MediaPlaylist, candidate: &Candidate) -> Playlist {
    let before = playlist.segments.len();
    playlist
        .segments
        .retain(|segment| !segment.uri.trim().is_empty());
    let dropped = before - playlist.segments.len();

    let mut muted = 0usize;
    for segment in &mut playlist.segments {
        let uri = muted_uri(&segment.uri);
        if uri != segment.uri {
            muted += 1;
        }
        segment.uri = candidate.segment_url(&uri);
    }

    debug!(
        segments = playlist.segments.len(),
        dropped, muted, "Processed discovered playlist"
    );

    Playlist { inner: playlist }
}
