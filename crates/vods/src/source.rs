// Third-party tracker sites the metadata is usually copied from by hand.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;
use crate::metadata::VideoMetadata;

/// Where the streamer name, video id and start time were taken from.
/// Each site prints the start time differently and with a different precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MetadataSource {
    /// twitchtracker.com, second precision
    #[serde(rename = "tt", alias = "twitchtracker")]
    #[cfg_attr(feature = "clap", value(name = "tt", alias = "twitchtracker"))]
    TwitchTracker,
    /// streamscharts.com, minute precision
    #[serde(rename = "sc", alias = "streamscharts")]
    #[cfg_attr(feature = "clap", value(name = "sc", alias = "streamscharts"))]
    StreamsCharts,
    /// sullygnome.com, second precision
    #[serde(rename = "sg", alias = "sullygnome")]
    #[cfg_attr(feature = "clap", value(name = "sg", alias = "sullygnome"))]
    SullyGnome,
}

impl MetadataSource {
    /// `chrono` format of the UTC start time as the site displays it.
    pub fn time_format(self) -> &'static str {
        match self {
            Self::TwitchTracker => "%Y-%m-%d %H:%M:%S",
            Self::StreamsCharts => "%d-%m-%Y %H:%M",
            Self::SullyGnome => "%Y-%m-%dT%H:%M:%SZ",
        }
    }

    /// Seconds of uncertainty in the displayed time.
    pub fn window_seconds(self) -> u32 {
        match self {
            Self::TwitchTracker | Self::SullyGnome => 1,
            Self::StreamsCharts => 60,
        }
    }

    pub fn parse_time(self, input: &str) -> Result<chrono::DateTime<chrono::Utc>, DiscoveryError> {
        NaiveDateTime::parse_from_str(input.trim(), self.time_format())
            .map(|naive| naive.and_utc())
            .map_err(|_| DiscoveryError::InvalidTime {
                input: input.to_owned(),
                format: self.time_format(),
            })
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwitchTracker => write!(f, "twitchtracker"),
            Self::StreamsCharts => write!(f, "streamscharts"),
            Self::SullyGnome => write!(f, "sullygnome"),
        }
    }
}

/// Metadata exactly as typed in from a tracker page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualMetadata {
    pub source: MetadataSource,
    pub streamer_name: String,
    pub video_id: String,
    pub time: String,
}

impl ManualMetadata {
    pub fn resolve(&self) -> Result<VideoMetadata, DiscoveryError> {
        let time = self.source.parse_time(&self.time)?;
        Ok(VideoMetadata::new(
            self.streamer_name.trim(),
            self.video_id.trim(),
            time,
        ))
    }

    /// Plan for this source, or for `window_seconds` when overridden.
    pub fn plan(&self, window_seconds: Option<u32>) -> Result<SearchPlan, DiscoveryError> {
        let metadata = self.resolve()?;
        Ok(match window_seconds {
            Some(window) => SearchPlan::around(&metadata, window),
            None => SearchPlan::for_source(&metadata, self.source),
        })
    }
}

/// Starting metadata and window width handed to discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub metadata: VideoMetadata,
    pub window_seconds: u32,
}

impl SearchPlan {
    /// Searches exactly `window_seconds` offsets from `metadata.time`.
    pub fn exact(metadata: VideoMetadata, window_seconds: u32) -> Self {
        Self {
            metadata,
            window_seconds,
        }
    }

    /// Uses the source's own precision as the window.
    pub fn for_source(metadata: &VideoMetadata, source: MetadataSource) -> Self {
        Self::around(metadata, source.window_seconds())
    }

    /// Covers `window_seconds` seconds from `metadata.time`, plus the second
    /// before it: some manifests are named after the second before the
    /// published start.
    pub fn around(metadata: &VideoMetadata, window_seconds: u32) -> Self {
        Self {
            metadata: metadata.with_offset(-1),
            window_seconds: window_seconds.saturating_add(1),
        }
    }
}
