// Video metadata and the hash-prefixed path identifier the CDN stores VODs under.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use sha1::{Digest, Sha1};

use crate::error::DiscoveryError;

/// Number of hex characters of the SHA-1 digest used as the identifier prefix.
pub const HASH_PREFIX_LEN: usize = 20;

/// What is publicly known about a past broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoMetadata {
    pub streamer_name: String,
    pub video_id: String,
    pub time: DateTime<Utc>,
}

impl VideoMetadata {
    pub fn new(
        streamer_name: impl Into<String>,
        video_id: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            streamer_name: streamer_name.into(),
            video_id: video_id.into(),
            time,
        }
    }

    /// Returns a copy shifted by `seconds` (may be negative).
    pub fn with_offset(&self, seconds: i64) -> Self {
        Self {
            streamer_name: self.streamer_name.clone(),
            video_id: self.video_id.clone(),
            time: self.time + TimeDelta::seconds(seconds),
        }
    }

    /// `{streamer}_{video_id}_{unix_seconds}`, the part of the identifier that gets hashed.
    fn base_path(&self) -> String {
        format!(
            "{}_{}_{}",
            self.streamer_name,
            self.video_id,
            self.time.timestamp()
        )
    }

    pub fn path_identifier(&self) -> PathIdentifier {
        let base = self.base_path();
        let digest = hex::encode(Sha1::digest(base.as_bytes()));
        PathIdentifier(format!("{}_{}", &digest[..HASH_PREFIX_LEN], base))
    }
}

impl fmt::Display for VideoMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.streamer_name,
            self.time.format("%Y-%m-%d_%H:%M:%S"),
            self.video_id
        )
    }
}

/// Path segment addressing a VOD on a CDN domain,
/// e.g. `c5992ececce7bd7d350d_gmhikaru_47198535725_1664038929`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathIdentifier(String);

impl PathIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an identifier taken from a URL after checking it parses.
    pub fn from_raw(raw: impl Into<String>) -> Result<Self, DiscoveryError> {
        let raw = raw.into();
        Self::parse(&raw)?;
        Ok(Self(raw))
    }

    /// Recovers the metadata encoded in an identifier.
    ///
    /// The streamer name is everything between the first underscore and the
    /// second-to-last one, so names containing underscores survive. A video id
    /// containing an underscore does not: its leading part is folded into the
    /// streamer name. The hash prefix is not verified.
    pub fn parse(raw: &str) -> Result<VideoMetadata, DiscoveryError> {
        let underscores: Vec<usize> = raw.match_indices('_').map(|(i, _)| i).collect();
        if underscores.len() < 3 {
            return Err(DiscoveryError::invalid_path(
                raw,
                "expected at least three underscores",
            ));
        }
        let first = underscores[0];
        let second_last = underscores[underscores.len() - 2];
        let last = underscores[underscores.len() - 1];

        let streamer_name = &raw[first + 1..second_last];
        let video_id = &raw[second_last + 1..last];
        let unix_seconds: i64 = raw[last + 1..].parse().map_err(|e| {
            DiscoveryError::invalid_path(raw, format!("trailing unix time is not an integer: {e}"))
        })?;
        let time = DateTime::from_timestamp(unix_seconds, 0)
            .ok_or_else(|| DiscoveryError::invalid_path(raw, "unix time out of range"))?;

        Ok(VideoMetadata::new(streamer_name, video_id, time))
    }

    pub fn to_metadata(&self) -> Result<VideoMetadata, DiscoveryError> {
        Self::parse(&self.0)
    }
}

impl fmt::Display for PathIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(unix: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(unix, 0).unwrap()
    }

    #[test]
    fn identifier_has_hash_prefix_and_base() {
        let meta = VideoMetadata::new("gmhikaru", "47198535725", at(1664038929));
        let id = meta.path_identifier();
        let (prefix, rest) = id.as_str().split_at(HASH_PREFIX_LEN);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(rest, "_gmhikaru_47198535725_1664038929");
    }

    #[test]
    fn identifier_matches_cdn_naming() {
        let meta = VideoMetadata::new("gmhikaru", "47198535725", at(1664038929));
        assert_eq!(
            meta.path_identifier().as_str(),
            "c5992ececce7bd7d350d_gmhikaru_47198535725_1664038929"
        );
    }

    #[test]
    fn identifier_prefix_is_sha1_of_base() {
        let meta = VideoMetadata::new("a", "b", at(0));
        let expected = hex::encode(Sha1::digest(b"a_b_0"));
        assert_eq!(
            meta.path_identifier().as_str(),
            format!("{}_a_b_0", &expected[..20])
        );
    }

    #[test]
    fn parse_known_identifier() {
        let meta = PathIdentifier::parse("c5992ececce7bd7d350d_gmhikaru_47198535725_1664038929")
            .unwrap();
        assert_eq!(
            meta,
            VideoMetadata::new("gmhikaru", "47198535725", at(1664038929))
        );
    }

    #[test]
    fn parse_keeps_underscores_in_streamer_name() {
        let meta = PathIdentifier::parse("c5992ececce7bd7d350d_malek_04_47198535725_1664038929")
            .unwrap();
        assert_eq!(meta.streamer_name, "malek_04");
        assert_eq!(meta.video_id, "47198535725");
    }

    #[test]
    fn parse_misattributes_underscore_in_video_id() {
        let meta = VideoMetadata::new("foo", "12_34", at(1_700_000_000));
        let parsed = meta.path_identifier().to_metadata().unwrap();
        assert_eq!(parsed.streamer_name, "foo_12");
        assert_eq!(parsed.video_id, "34");
        assert_ne!(parsed, meta);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            PathIdentifier::parse("abc_def"),
            Err(DiscoveryError::InvalidPath { .. })
        ));
        assert!(matches!(
            PathIdentifier::parse("abc_foo_123_notatime"),
            Err(DiscoveryError::InvalidPath { .. })
        ));
    }

    #[test]
    fn offset_shifts_both_ways() {
        let meta = VideoMetadata::new("foo", "1", at(100));
        assert_eq!(meta.with_offset(5).time, at(105));
        assert_eq!(meta.with_offset(-1).time, at(99));
        assert_eq!(meta.with_offset(0), meta);
    }

    #[test]
    fn display_renders_start_time() {
        let meta = VideoMetadata::new("foo", "123", at(0));
        assert_eq!(meta.to_string(), "foo_1970-01-01_00:00:00_123");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_identifier_is_deterministic(
            name in "[a-z0-9]{1,25}",
            id in "[0-9]{1,12}",
            unix in 0i64..4_000_000_000,
        ) {
            let meta = VideoMetadata::new(name, id, at(unix));
            prop_assert_eq!(meta.path_identifier(), meta.clone().path_identifier());
        }

        #[test]
        fn prop_roundtrip_without_underscores(
            name in "[a-z0-9]{1,25}",
            id in "[0-9]{1,12}",
            unix in 0i64..4_000_000_000,
        ) {
            let meta = VideoMetadata::new(name, id, at(unix));
            prop_assert_eq!(meta.path_identifier().to_metadata().unwrap(), meta);
        }
    }
}
