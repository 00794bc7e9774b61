mod cli;
mod config;
mod error;
mod output;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use vods_engine::{
    Candidate, Discoverer, ManualMetadata, ProgressCallback, Recovery, ValidationProgress,
};

use crate::{
    cli::{Args, Commands, MetadataArgs},
    config::AppConfig,
    error::{AppError, Result},
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet)?;

    let config = AppConfig::load(args.config.as_deref())?.with_overrides(
        args.timeout,
        args.proxy,
        args.proxy_username,
        args.proxy_password,
    );

    match args.command {
        Commands::Recover {
            metadata,
            filter_invalid,
            domains,
            window,
            output_dir,
        } => {
            let filter_invalid = filter_invalid.unwrap_or(config.filter_invalid);
            let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let mut engine_config = config.discovery_config();
            if !domains.is_empty() {
                engine_config.domains = domains;
            }

            let plan = manual(&metadata).plan(window)?;

            let discoverer = Discoverer::from_config(&engine_config)?;
            let mut recovery = Recovery::new(discoverer, engine_config.normalized_domains());
            let progress = if filter_invalid > 0 {
                let bar = validation_bar(args.quiet);
                recovery = recovery
                    .with_filter_invalid(filter_invalid)
                    .with_progress(progress_callback(bar.clone()));
                Some(bar)
            } else {
                None
            };

            let token = CancellationToken::new();
            spawn_ctrl_c_handler(token.clone());

            info!(
                streamer = %plan.metadata.streamer_name,
                video_id = %plan.metadata.video_id,
                window = plan.window_seconds,
                "Searching for manifest"
            );
            let recovered = recovery.run(&plan, &token).await;
            if let Some(bar) = &progress {
                bar.finish_and_clear();
            }
            let recovered = recovered?;

            println!("Found valid url {}", recovered.candidate.index_dvr_url());
            if filter_invalid > 0 {
                println!(
                    "{} valid segments out of {}",
                    recovered.playlist.len(),
                    recovered.total_segments
                );
            }
            let path = output::write_playlist(&output_dir, &recovered).await?;
            println!("Wrote {}", path.display());
        }

        Commands::ParseUrl { url, json } => {
            let candidate = Candidate::from_url(&url)?;
            let metadata = candidate.metadata();
            let view = ParsedUrl {
                domain: &candidate.domain,
                path: candidate.path.as_str(),
                streamer: &metadata.streamer_name,
                video_id: &metadata.video_id,
                unix_time: metadata.time.timestamp(),
                utc_time: metadata.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                index_dvr_url: candidate.index_dvr_url(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("Domain:     {}", view.domain);
                println!("Streamer:   {}", view.streamer);
                println!("Video id:   {}", view.video_id);
                println!("Start time: {} ({})", view.utc_time, view.unix_time);
                println!("Manifest:   {}", view.index_dvr_url);
            }
        }

        Commands::Identifier { metadata } => {
            let resolved = manual(&metadata).resolve()?;
            println!("{}", resolved.path_identifier());
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ParsedUrl<'a> {
    domain: &'a str,
    path: &'a str,
    streamer: &'a str,
    video_id: &'a str,
    unix_time: i64,
    utc_time: String,
    index_dvr_url: String,
}

fn manual(args: &MetadataArgs) -> ManualMetadata {
    ManualMetadata {
        source: args.source,
        streamer_name: args.streamer.clone(),
        video_id: args.video_id.clone(),
        time: args.time.clone(),
    }
}

fn validation_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    bar.enable_steady_tick(Duration::from_millis(120));
    match ProgressStyle::with_template(
        "{spinner:.blue} [{bar:30.cyan/white}] {pos}/{len} segments {msg}",
    ) {
        Ok(style) => bar.set_style(style.progress_chars("=> ")),
        Err(e) => warn!(error = %e, "Invalid progress template"),
    }
    bar
}

fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |progress: ValidationProgress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.processed as u64);
        bar.set_message(format!("({} valid)", progress.valid));
    })
}

fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            token.cancel();
        }
    });
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;
    Ok(())
}
