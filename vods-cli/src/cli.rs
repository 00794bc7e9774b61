use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use vods_engine::MetadataSource;

#[derive(Parser, Debug)]
#[command(
    name = "vods",
    author,
    version,
    about = "Recover playlists of expired VODs from public stream metadata"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults to <config dir>/vods/config.toml when present)
    #[arg(short, long, global = true, env = "VODS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Proxy for all probe requests (http://, https://, socks5://)
    #[arg(long, global = true, env = "VODS_PROXY")]
    pub proxy: Option<String>,

    /// Proxy username
    #[arg(long, global = true, requires = "proxy")]
    pub proxy_username: Option<String>,

    /// Proxy password
    #[arg(long, global = true, requires = "proxy_username")]
    pub proxy_password: Option<String>,
}

/// Metadata as copied from a tracker page.
#[derive(ClapArgs, Debug, Clone)]
pub struct MetadataArgs {
    /// Site the metadata was taken from; decides the time format and search window
    #[arg(short, long, value_enum)]
    pub source: MetadataSource,

    /// Streamer login name
    #[arg(long)]
    pub streamer: String,

    /// Broadcast id shown by the tracker
    #[arg(long)]
    pub video_id: String,

    /// UTC start time in the site's format, e.g. `2022-09-24 17:02:09` for tt
    #[arg(short, long)]
    pub time: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the manifest of an expired VOD and write it as a local .m3u8
    Recover {
        #[command(flatten)]
        metadata: MetadataArgs,

        /// Drop segments the CDN no longer serves, checking this many at a time (0 disables)
        #[arg(long, value_name = "CONCURRENCY")]
        filter_invalid: Option<usize>,

        /// CDN origin to probe; repeat to replace the configured list
        #[arg(long = "domain", value_name = "URL")]
        domains: Vec<String>,

        /// Search this many seconds from the given time instead of the source's
        /// precision; the second before the given time is always tried too
        #[arg(long)]
        window: Option<u32>,

        /// Directory playlists are written under
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Recover the metadata encoded in a CDN URL (e.g. a storyboard link)
    ParseUrl {
        url: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the path identifier derived from tracker metadata
    Identifier {
        #[command(flatten)]
        metadata: MetadataArgs,
    },
}
